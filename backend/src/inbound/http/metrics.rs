//! Prometheus text exposition of the worker's registry.

use actix_web::{HttpResponse, get, web};
use prometheus::{Encoder, Registry, TextEncoder};

/// Render every registered metric family.
#[get("/metrics")]
pub async fn export(registry: web::Data<Registry>) -> HttpResponse {
    let encoder = TextEncoder::new();
    let mut body = Vec::new();
    match encoder.encode(&registry.gather(), &mut body) {
        Ok(()) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(body),
        Err(error) => {
            tracing::warn!(%error, "failed to encode metrics");
            HttpResponse::InternalServerError().finish()
        }
    }
}
