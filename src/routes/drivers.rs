// src/routes/drivers.rs
use std::collections::HashSet;

use axum::response::Json;
use serde_json::{Value, json};

use crate::drivers;
use crate::models::{DriverRecord, DriverStatus, Impact};

/// GET /drivers: installed driver inventory plus the ranked catalog gaps.
pub async fn list_drivers() -> Json<Value> {
    let installed_names = drivers::scan_installed_drivers().await;
    let installed_lookup: HashSet<String> = installed_names.iter().cloned().collect();

    let installed_records: Vec<DriverRecord> = installed_names
        .into_iter()
        .map(|name| DriverRecord {
            driver_name: name,
            device: "Unknown".to_string(),
            impact: Impact::Low,
            risk_score: 0,
            status: DriverStatus::Installed,
        })
        .collect();

    let missing = drivers::missing_drivers(&installed_lookup);
    let summary = drivers::risk_summary(&missing);

    Json(json!({
        "missingDrivers": missing,
        "installedDrivers": installed_records,
        "riskSummary": summary,
    }))
}
