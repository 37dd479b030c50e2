//! GeoIP capability
//!
//! Best-effort annotation of visits with a country/city guess. A lookup
//! that fails, times out or is disabled yields `None` and must never affect
//! the redirect outcome.

pub mod external_api;
pub mod null;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::AppConfig;

/// Geographic info for an IP address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoInfo {
    /// ISO 3166-1 alpha-2 country code (e.g. "US")
    pub country: Option<String>,
    pub city: Option<String>,
}

#[async_trait]
pub trait GeoIpLookup: Send + Sync {
    /// Resolve an IP to a location, or `None` on any failure.
    async fn lookup(&self, ip: &str) -> Option<GeoInfo>;

    /// Provider name, for logs.
    fn name(&self) -> &'static str;
}

/// Pick the provider for the current configuration.
pub fn create_provider(config: &AppConfig) -> Arc<dyn GeoIpLookup> {
    let provider: Arc<dyn GeoIpLookup> = if config.geoip_enabled {
        Arc::new(external_api::ExternalApiProvider::new(&config.geoip_api_url))
    } else {
        Arc::new(null::NullProvider)
    };

    info!("GeoIP: initialized with {} provider", provider.name());
    provider
}
