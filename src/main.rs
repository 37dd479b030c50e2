use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing::info;

use minilink::api;
use minilink::config::init_config;
use minilink::services::geoip;
use minilink::services::{RedirectService, ShortenerService};
use minilink::storages::StorageFactory;
use minilink::system::init_logging;
use minilink::utils::{CodeGenerator, RandomCodeGenerator};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let config = init_config();

    // Guard must live until shutdown so buffered log lines are flushed
    let _log_guard = init_logging(config);

    let storage = StorageFactory::create(config)
        .await
        .expect("Failed to create storage");
    info!(
        "Using storage backend: {}",
        storage.get_backend_name().await
    );

    let geoip_provider = geoip::create_provider(config);
    let generator: Arc<dyn CodeGenerator> =
        Arc::new(RandomCodeGenerator::new(config.random_code_length));

    let shortener = ShortenerService::new(
        storage.clone(),
        generator,
        &config.public_url,
        config.random_code_retries,
    );
    let redirect = RedirectService::new(storage.clone(), geoip_provider);

    let bind_address = config.bind_address();
    info!("Starting server at http://{}", bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(shortener.clone()))
            .app_data(web::Data::new(redirect.clone()))
            .configure(api::configure_routes)
    })
    .bind(bind_address)?
    .run()
    .await
}
