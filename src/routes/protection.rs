// src/routes/protection.rs
use std::collections::HashSet;

use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::models::{ThreatStatus, ThreatVerdict};
use crate::{AppState, inventory};

const DEFAULT_MAX_APPS: i64 = 15;
const MAX_APPS_CEILING: i64 = 30;

#[derive(Debug, Default, Deserialize)]
pub struct ProtectionScanRequest {
    /// Optional subset of applications to scan; names or `{name}` objects.
    #[serde(default)]
    pub apps: Option<Vec<Value>>,
    #[serde(default, rename = "maxApps")]
    pub max_apps: Option<i64>,
}

#[derive(Debug, Default, Serialize)]
pub struct ThreatSummary {
    pub malicious: usize,
    pub suspicious: usize,
    pub clean: usize,
    pub unknown: usize,
    pub error: usize,
}

impl ThreatSummary {
    fn tally(results: &[ThreatVerdict]) -> Self {
        let mut summary = Self::default();
        for verdict in results {
            match verdict.status {
                ThreatStatus::Malicious => summary.malicious += 1,
                ThreatStatus::Suspicious => summary.suspicious += 1,
                ThreatStatus::Clean => summary.clean += 1,
                ThreatStatus::Unknown => summary.unknown += 1,
                ThreatStatus::Error => summary.error += 1,
            }
        }
        summary
    }
}

fn requested_names(items: &[Value]) -> HashSet<String> {
    items
        .iter()
        .filter_map(|item| {
            item.get("name")
                .and_then(|v| v.as_str())
                .or_else(|| item.as_str())
        })
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

pub(crate) fn clamp_max_apps(requested: Option<i64>) -> usize {
    requested
        .unwrap_or(DEFAULT_MAX_APPS)
        .clamp(1, MAX_APPS_CEILING) as usize
}

/// POST /protection/scan: enumerate installed applications with resolved
/// executable paths and classify each one.
pub async fn protection_scan(
    State(state): State<AppState>,
    body: Option<Json<ProtectionScanRequest>>,
) -> Json<Value> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let max_apps = clamp_max_apps(request.max_apps);

    let mut installed = inventory::collect_with_paths(&state.resolver).await;

    if let Some(items) = request.apps.as_deref().filter(|items| !items.is_empty()) {
        let requested = requested_names(items);
        installed.retain(|app| {
            let app_name = app.name.trim().to_lowercase();
            requested
                .iter()
                .any(|req| app_name.contains(req) || req.contains(&app_name))
        });
    }

    installed.truncate(max_apps);

    let mut results = Vec::with_capacity(installed.len());
    for app in &installed {
        results.push(state.protection.classify(app).await);
    }

    let summary = ThreatSummary::tally(&results);
    Json(json!({
        "results": results,
        "summary": summary,
        "scannedCount": results.len(),
        "note": "Set VT_API_KEY environment variable to enable live VirusTotal reputation.",
    }))
}

/// GET /protection/debug-key: report credential presence without leaking it.
pub async fn debug_key_state(State(state): State<AppState>) -> Json<Value> {
    let reputation = state.protection.reputation();
    Json(json!({
        "envKeyLen": reputation.env_key().len(),
        "fileKeyLen": reputation.file_key().len(),
        "fallbackPath": reputation.key_file().display().to_string(),
    }))
}
