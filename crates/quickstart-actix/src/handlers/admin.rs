use actix_web::{web, HttpResponse, Result};

use crate::AppState;

/// Prometheus scrape endpoint.
pub async fn system_metrics(state: web::Data<AppState>) -> Result<HttpResponse> {
    let buffer = quickstart_observability::encode_prometheus_text(&state.metrics.registry)
        .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer))
}

/// Health check endpoint
pub async fn health() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "mirror_quickstart",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Readiness check endpoint
pub async fn readiness(state: web::Data<AppState>) -> Result<HttpResponse> {
    state
        .credentials
        .healthcheck()
        .await
        .map_err(actix_web::error::ErrorServiceUnavailable)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ready",
        "checks": {
            "database": "ok"
        }
    })))
}
