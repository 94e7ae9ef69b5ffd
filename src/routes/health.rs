//! Lightweight service health endpoint used for readiness checks and tests.

use rocket::get;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};

/// Basic response payload describing service health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Static status string reporting application readiness.
    pub status: String,
}

/// Health check endpoint returning a trivial JSON payload.
#[get("/health")]
pub fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
