// src/routes/versions.rs
use std::collections::BTreeMap;

use axum::extract::State;
use axum::response::Json;
use serde_json::{Value, json};

use crate::AppState;

/// POST /check-versions: body is an object mapping application names to
/// their installed version strings.
pub async fn check_versions(
    State(state): State<AppState>,
    Json(installed): Json<BTreeMap<String, String>>,
) -> Json<Value> {
    let results = state.versions.assess_all(&installed).await;
    Json(json!({ "apps": results }))
}
