// src/snapshot/package.rs
//
// Offline update package assembly: a zip built in memory holding the
// manifest, the application listings (full or delta), and the latest
// version / missing driver snapshots from the data directory.

use std::io::{Cursor, Write};

use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::models::{InstalledApplication, InventoryDelta};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageMode {
    Full,
    Delta,
}

impl PackageMode {
    /// Anything that is not explicitly `delta` packages the full inventory.
    pub fn from_query(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "delta" => PackageMode::Delta,
            _ => PackageMode::Full,
        }
    }

    pub fn filename(self) -> &'static str {
        match self {
            PackageMode::Full => "offline_update_package.zip",
            PackageMode::Delta => "offline_delta_package.zip",
        }
    }

    fn label(self) -> &'static str {
        match self {
            PackageMode::Full => "full",
            PackageMode::Delta => "delta",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PackageManifest {
    #[serde(rename = "generatedAt")]
    pub generated_at: String,
    #[serde(rename = "packageMode")]
    pub package_mode: String,
    #[serde(rename = "appCount")]
    pub app_count: usize,
    #[serde(rename = "hasLatestVersions")]
    pub has_latest_versions: bool,
    #[serde(rename = "hasDriverSnapshot")]
    pub has_driver_snapshot: bool,
    #[serde(rename = "deltaChanges")]
    pub delta_changes: usize,
}

fn is_empty_value(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Build the archive bytes. The caller persists the new baseline snapshot
/// once the package is known good.
pub fn build_offline_package(
    mode: PackageMode,
    apps: &[InstalledApplication],
    delta: &InventoryDelta,
    latest_versions: &serde_json::Value,
    missing_drivers: &serde_json::Value,
    generated_at: &str,
) -> Result<Vec<u8>> {
    let manifest = PackageManifest {
        generated_at: generated_at.to_string(),
        package_mode: mode.label().to_string(),
        app_count: apps.len(),
        has_latest_versions: !is_empty_value(latest_versions),
        has_driver_snapshot: !is_empty_value(missing_drivers),
        delta_changes: match mode {
            PackageMode::Delta => delta.total_changes,
            PackageMode::Full => 0,
        },
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut archive = zip::ZipWriter::new(&mut cursor);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut write_member = |archive: &mut zip::ZipWriter<&mut Cursor<Vec<u8>>>,
                                name: &str,
                                value: &serde_json::Value|
         -> Result<()> {
            archive.start_file(name, options)?;
            archive.write_all(serde_json::to_string_pretty(value)?.as_bytes())?;
            Ok(())
        };

        write_member(&mut archive, "manifest.json", &serde_json::to_value(&manifest)?)?;
        match mode {
            PackageMode::Full => {
                write_member(&mut archive, "installed_apps.json", &json!({ "apps": apps }))?;
            }
            PackageMode::Delta => {
                write_member(&mut archive, "delta_apps.json", &serde_json::to_value(delta)?)?;
                write_member(&mut archive, "current_apps.json", &json!({ "apps": apps }))?;
            }
        }
        write_member(&mut archive, "latest_versions.json", latest_versions)?;
        write_member(&mut archive, "missing_drivers.json", missing_drivers)?;
        archive.finish()?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::compute_delta;
    use std::io::Read;

    fn member_names(bytes: &[u8]) -> Vec<String> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        archive.file_names().map(|n| n.to_string()).collect()
    }

    fn read_member(bytes: &[u8], name: &str) -> serde_json::Value {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut member = archive.by_name(name).unwrap();
        let mut raw = String::new();
        member.read_to_string(&mut raw).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn unknown_modes_coerce_to_full() {
        assert_eq!(PackageMode::from_query("delta"), PackageMode::Delta);
        assert_eq!(PackageMode::from_query("DELTA "), PackageMode::Delta);
        assert_eq!(PackageMode::from_query("incremental"), PackageMode::Full);
        assert_eq!(PackageMode::from_query(""), PackageMode::Full);
    }

    #[test]
    fn full_package_contains_the_inventory_listing() {
        let apps = vec![InstalledApplication::new("Git", "2.50.1")];
        let delta = compute_delta(&[], &apps);
        let bytes = build_offline_package(
            PackageMode::Full,
            &apps,
            &delta,
            &json!({"git": "2.50.1"}),
            &json!({}),
            "2026-08-06 12:00:00",
        )
        .unwrap();

        let names = member_names(&bytes);
        assert!(names.contains(&"manifest.json".to_string()));
        assert!(names.contains(&"installed_apps.json".to_string()));
        assert!(!names.contains(&"delta_apps.json".to_string()));

        let manifest = read_member(&bytes, "manifest.json");
        assert_eq!(manifest["packageMode"], "full");
        assert_eq!(manifest["appCount"], 1);
        assert_eq!(manifest["hasLatestVersions"], true);
        assert_eq!(manifest["hasDriverSnapshot"], false);
        assert_eq!(manifest["deltaChanges"], 0);
    }

    #[test]
    fn delta_package_reports_changes_in_the_manifest() {
        let previous = vec![InstalledApplication::new("Git", "2.49.0")];
        let current = vec![InstalledApplication::new("Git", "2.50.1")];
        let delta = compute_delta(&previous, &current);
        let bytes = build_offline_package(
            PackageMode::Delta,
            &current,
            &delta,
            &json!({}),
            &json!({}),
            "2026-08-06 12:00:00",
        )
        .unwrap();

        let names = member_names(&bytes);
        assert!(names.contains(&"delta_apps.json".to_string()));
        assert!(names.contains(&"current_apps.json".to_string()));

        let manifest = read_member(&bytes, "manifest.json");
        assert_eq!(manifest["deltaChanges"], 1);

        let delta_member = read_member(&bytes, "delta_apps.json");
        assert_eq!(delta_member["changed"][0]["currentVersion"], "2.50.1");
    }
}
