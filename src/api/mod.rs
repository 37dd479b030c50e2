//! HTTP wiring
//!
//! Thin handlers over the shortener and redirect services. The engine owns
//! every invariant; this layer only extracts inputs and maps the error
//! taxonomy onto status codes.

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use tracing::instrument;

use crate::errors::MinilinkError;
use crate::services::{RedirectService, ShortenRequest, ShortenerService};
use crate::structs::{ApiResponse, ErrorResponse, ShortenData, ShortenPayload, VisitContext};
use crate::utils::ip::extract_client_ip;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/shorten", web::post().to(post_shorten))
        .route("/api/stats/{code}", web::get().to(get_stats))
        .route("/go/{code}", web::get().to(handle_redirect))
        .route("/go/{code}", web::head().to(handle_redirect));
}

fn status_for(err: &MinilinkError) -> StatusCode {
    match err {
        MinilinkError::InvalidUrl(_)
        | MinilinkError::InvalidShortcode(_)
        | MinilinkError::DateParse(_) => StatusCode::BAD_REQUEST,
        MinilinkError::ShortcodeTaken(_) => StatusCode::CONFLICT,
        MinilinkError::NotFound(_) => StatusCode::NOT_FOUND,
        MinilinkError::Expired(_) => StatusCode::GONE,
        MinilinkError::Serialization(_)
        | MinilinkError::StoreUnavailable(_)
        | MinilinkError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(err: &MinilinkError) -> HttpResponse {
    HttpResponse::build(status_for(err)).json(ErrorResponse {
        code: err.code(),
        error: err.format_simple(),
    })
}

#[instrument(skip(service), fields(url = %payload.url))]
async fn post_shorten(
    payload: web::Json<ShortenPayload>,
    service: web::Data<ShortenerService>,
) -> impl Responder {
    let payload = payload.into_inner();
    let request = ShortenRequest {
        target: payload.url,
        code: payload.code,
        expires_at: payload.expires_at,
    };

    match service.shorten(request).await {
        Ok(outcome) => HttpResponse::Created().json(ApiResponse {
            code: 0,
            data: ShortenData {
                code: outcome.record.code,
                target: outcome.record.target,
                short_url: outcome.short_url,
                expires_at: outcome.record.expires_at,
            },
        }),
        Err(e) => error_response(&e),
    }
}

#[instrument(skip(req, service), fields(path = %path))]
async fn handle_redirect(
    path: web::Path<String>,
    req: HttpRequest,
    service: web::Data<RedirectService>,
) -> impl Responder {
    let code = path.into_inner();
    let ctx = VisitContext {
        ip: extract_client_ip(&req),
    };

    match service.resolve_and_record(&code, &ctx).await {
        Ok(target) => HttpResponse::TemporaryRedirect()
            .insert_header(("Location", target))
            .finish(),
        Err(MinilinkError::NotFound(_)) => HttpResponse::build(StatusCode::NOT_FOUND)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .insert_header(("Cache-Control", "public, max-age=60"))
            .body("Not Found"),
        Err(MinilinkError::Expired(_)) => HttpResponse::build(StatusCode::GONE)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .insert_header(("Cache-Control", "public, max-age=60"))
            .body("Gone"),
        Err(e) => error_response(&e),
    }
}

#[instrument(skip(service), fields(path = %path))]
async fn get_stats(
    path: web::Path<String>,
    service: web::Data<RedirectService>,
) -> impl Responder {
    let code = path.into_inner();

    match service.get_stats(&code).await {
        Ok(snapshot) => HttpResponse::Ok().json(ApiResponse {
            code: 0,
            data: snapshot,
        }),
        Err(e) => error_response(&e),
    }
}
