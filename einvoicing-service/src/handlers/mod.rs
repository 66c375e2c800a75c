//! HTTP handlers for einvoicing-service.

pub mod companies;
pub mod customers;
pub mod invoices;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "einvoicing-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
