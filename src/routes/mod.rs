// src/routes/mod.rs
pub mod drivers;
pub mod protection;
pub mod scan;
pub mod versions;

use axum::response::Json;
use serde_json::{Value, json};

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "System Revamp service running"
    }))
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "revamp",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub(crate) fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
