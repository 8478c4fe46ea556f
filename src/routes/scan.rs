// src/routes/scan.rs
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::models::ScanSnapshot;
use crate::snapshot::package::{PackageMode, build_offline_package};
use crate::snapshot::compute_delta;
use crate::{AppState, inventory, remediation};

/// GET /scan: plain name/version inventory.
pub async fn scan_system() -> Json<Value> {
    let apps = inventory::collect().await;
    Json(json!({ "apps": apps }))
}

#[derive(Debug, Default, Deserialize)]
pub struct PackageQuery {
    pub mode: Option<String>,
}

/// GET /generate-offline-package: zip of the current inventory (full) or of
/// the changes since the last package (delta). The scan that went into the
/// package becomes the next delta baseline.
pub async fn generate_offline_package(
    State(state): State<AppState>,
    Query(params): Query<PackageQuery>,
) -> Response {
    let mode = PackageMode::from_query(params.mode.as_deref().unwrap_or("full"));

    let apps = inventory::collect().await;
    let previous = state.snapshots.load();
    let delta = compute_delta(&previous.apps, &apps);

    let latest_versions = read_json_or_empty(&state.config.latest_versions_path());
    let missing_drivers = read_json_or_empty(&state.config.missing_drivers_path());
    let generated_at = super::timestamp();

    match build_offline_package(
        mode,
        &apps,
        &delta,
        &latest_versions,
        &missing_drivers,
        &generated_at,
    ) {
        Ok(bytes) => {
            let snapshot = ScanSnapshot { generated_at, apps };
            if let Err(err) = state.snapshots.save(&snapshot) {
                // The package is already built; a failed baseline write only
                // affects the next delta.
                tracing::warn!(%err, "failed to persist scan snapshot");
            }
            (
                [
                    (header::CONTENT_TYPE, "application/zip".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", mode.filename()),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Err(err) => {
            tracing::error!(%err, "offline package build failed");
            Json(json!({ "error": err.to_string() })).into_response()
        }
    }
}

fn read_json_or_empty(path: &std::path::Path) -> Value {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_else(|| json!({}))
}

/// POST /generate-remediation-script: PowerShell script for the requested
/// applications and drivers, served as a download.
pub async fn generate_remediation_script(body: Option<Json<Value>>) -> Response {
    let payload = body.map(|Json(v)| v).unwrap_or(Value::Null);

    let apps = extract_names(payload.get("apps"), "name");
    let drivers = extract_names(payload.get("drivers"), "Driver Name");

    let script = remediation::render_script(&apps, &drivers, &super::timestamp());

    (
        [
            (
                header::CONTENT_TYPE,
                "text/plain; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"system_revamp_remediation.ps1\"".to_string(),
            ),
        ],
        script,
    )
        .into_response()
}

/// Accepts both bare strings and objects carrying the given key.
fn extract_names(value: Option<&Value>, key: &str) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(key).and_then(|v| v.as_str()).or_else(|| item.as_str()))
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_extracted_from_mixed_payloads() {
        let payload = json!({
            "apps": ["Git", {"name": "Dropbox"}, {"other": "x"}, "  "],
            "drivers": [{"Driver Name": "storahci"}, "disk"]
        });
        assert_eq!(
            extract_names(payload.get("apps"), "name"),
            vec!["Git".to_string(), "Dropbox".to_string()]
        );
        assert_eq!(
            extract_names(payload.get("drivers"), "Driver Name"),
            vec!["storahci".to_string(), "disk".to_string()]
        );
    }

    #[test]
    fn missing_sections_extract_to_empty() {
        let payload = json!({});
        assert!(extract_names(payload.get("apps"), "name").is_empty());
        assert!(extract_names(None, "name").is_empty());
    }
}
