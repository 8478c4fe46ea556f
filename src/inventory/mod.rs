// src/inventory/mod.rs
//
// OS-specific installed-application enumeration: the registry on Windows,
// dpkg on Linux, system_profiler on macOS. Every failure path degrades to an
// empty list; a completely empty scan falls back to a small fixed sample so
// downstream flows keep functioning on unsupported hosts.

mod windows;

pub use windows::RegistryApplication;

use std::collections::HashSet;
use std::time::Duration;

use crate::commands;
use crate::models::InstalledApplication;
use crate::resolver::ExecutableResolver;

const DPKG_TIMEOUT: Duration = Duration::from_secs(20);
// system_profiler walks every application bundle; by far the slowest command.
const SYSTEM_PROFILER_TIMEOUT: Duration = Duration::from_secs(45);

/// Name/version inventory for the current host.
pub async fn collect() -> Vec<InstalledApplication> {
    let apps = match std::env::consts::OS {
        "windows" => {
            windows::enumerate_registry()
                .await
                .into_iter()
                .map(|app| InstalledApplication::new(app.name, app.version))
                .collect()
        }
        "linux" => collect_dpkg().await,
        "macos" => collect_system_profiler().await,
        other => {
            tracing::warn!(os = other, "no inventory command for this platform");
            Vec::new()
        }
    };

    let apps = dedupe_and_sort(apps);
    if apps.is_empty() { sample_inventory() } else { apps }
}

/// Inventory with executable paths resolved from registry hints. Only the
/// Windows registry carries hints, so other platforms yield nothing here.
pub async fn collect_with_paths(resolver: &ExecutableResolver) -> Vec<InstalledApplication> {
    let apps = windows::enumerate_registry()
        .await
        .into_iter()
        .map(|app| {
            let path = resolver
                .resolve(&app.hints)
                .map(|p| p.display().to_string());
            InstalledApplication {
                name: app.name,
                version: app.version,
                path,
            }
        })
        .collect();
    dedupe_and_sort(apps)
}

async fn collect_dpkg() -> Vec<InstalledApplication> {
    match commands::run_with_timeout(
        "dpkg-query",
        &["-W", "-f=${Package} ${Version}\n"],
        DPKG_TIMEOUT,
    )
    .await
    {
        Ok(stdout) => parse_dpkg_output(&stdout),
        Err(err) => {
            tracing::debug!(%err, "dpkg enumeration failed");
            Vec::new()
        }
    }
}

pub(crate) fn parse_dpkg_output(stdout: &str) -> Vec<InstalledApplication> {
    stdout
        .lines()
        .filter_map(|line| {
            let (name, version) = line.trim().split_once(' ')?;
            if name.is_empty() {
                return None;
            }
            Some(InstalledApplication::new(name.trim(), version.trim()))
        })
        .collect()
}

async fn collect_system_profiler() -> Vec<InstalledApplication> {
    match commands::run_with_timeout(
        "system_profiler",
        &["SPApplicationsDataType", "-json"],
        SYSTEM_PROFILER_TIMEOUT,
    )
    .await
    {
        Ok(stdout) => parse_system_profiler_json(&stdout),
        Err(err) => {
            tracing::debug!(%err, "system_profiler enumeration failed");
            Vec::new()
        }
    }
}

pub(crate) fn parse_system_profiler_json(raw: &str) -> Vec<InstalledApplication> {
    let Ok(payload) = serde_json::from_str::<serde_json::Value>(raw) else {
        return Vec::new();
    };
    payload
        .get("SPApplicationsDataType")
        .and_then(|v| v.as_array())
        .map(|apps| {
            apps.iter()
                .filter_map(|app| {
                    let name = app.get("_name")?.as_str()?.trim();
                    let version = app.get("version")?.as_str()?.trim();
                    if name.is_empty() {
                        return None;
                    }
                    Some(InstalledApplication::new(name, version))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Identity is the case-insensitive `(name, version, path)` tuple; the first
/// occurrence wins, then the list is sorted by lowercase name.
pub(crate) fn dedupe_and_sort(apps: Vec<InstalledApplication>) -> Vec<InstalledApplication> {
    let mut seen = HashSet::new();
    let mut unique: Vec<InstalledApplication> = apps
        .into_iter()
        .filter(|app| {
            seen.insert((
                app.name.trim().to_lowercase(),
                app.version.trim().to_lowercase(),
                app.path.as_deref().unwrap_or_default().to_lowercase(),
            ))
        })
        .collect();
    unique.sort_by_key(|app| app.name.to_lowercase());
    unique
}

/// Demo inventory for hosts where every enumeration command came up empty.
fn sample_inventory() -> Vec<InstalledApplication> {
    vec![
        InstalledApplication::new("Node.js", "23.0.0"),
        InstalledApplication::new("Python 3", "3.13.3"),
        InstalledApplication::new("Epic Games Launcher", "1.4.0.0"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dpkg_lines_split_on_first_space() {
        let out = "git 1:2.43.0-1\nlibc6 2.39-0ubuntu8\n\n";
        let apps = parse_dpkg_output(out);
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].name, "git");
        assert_eq!(apps[0].version, "1:2.43.0-1");
    }

    #[test]
    fn system_profiler_entries_need_name_and_version() {
        let raw = r#"{"SPApplicationsDataType":[
            {"_name":"Safari","version":"17.5"},
            {"_name":"NoVersion"},
            {"version":"1.0"}
        ]}"#;
        let apps = parse_system_profiler_json(raw);
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].name, "Safari");
    }

    #[test]
    fn duplicate_identities_collapse_case_insensitively() {
        let apps = vec![
            InstalledApplication::new("Git", "2.50.1"),
            InstalledApplication::new("git", "2.50.1"),
            InstalledApplication::new("Git", "2.49.0"),
        ];
        let unique = dedupe_and_sort(apps);
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn output_is_sorted_by_lowercase_name() {
        let apps = vec![
            InstalledApplication::new("zsh", "5.9"),
            InstalledApplication::new("Bash", "5.2"),
        ];
        let sorted = dedupe_and_sort(apps);
        assert_eq!(sorted[0].name, "Bash");
        assert_eq!(sorted[1].name, "zsh");
    }

    #[test]
    fn same_name_different_path_is_kept() {
        let mut a = InstalledApplication::new("Tool", "1.0");
        a.path = Some("C:\\A\\tool.exe".to_string());
        let mut b = InstalledApplication::new("Tool", "1.0");
        b.path = Some("C:\\B\\tool.exe".to_string());
        assert_eq!(dedupe_and_sort(vec![a, b]).len(), 2);
    }
}
