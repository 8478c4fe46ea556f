// src/inventory/windows.rs
//
// Registry-backed application enumeration. Both uninstall hives (native and
// WOW6432Node, machine and user) are read through one PowerShell invocation
// so the service does not need registry bindings of its own.

use std::time::Duration;

use crate::commands;
use crate::resolver::ResolutionHints;

const REGISTRY_TIMEOUT: Duration = Duration::from_secs(20);

const REGISTRY_QUERY: &str = "$paths = \
'HKLM:\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Uninstall\\*',\
'HKLM:\\SOFTWARE\\WOW6432Node\\Microsoft\\Windows\\CurrentVersion\\Uninstall\\*',\
'HKCU:\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Uninstall\\*',\
'HKCU:\\SOFTWARE\\WOW6432Node\\Microsoft\\Windows\\CurrentVersion\\Uninstall\\*'; \
Get-ItemProperty -Path $paths -ErrorAction SilentlyContinue | \
Select-Object DisplayName, DisplayVersion, DisplayIcon, UninstallString, InstallLocation | \
ConvertTo-Json -Compress";

/// One uninstall-key entry: the display name/version plus the hints the
/// executable resolver feeds on.
#[derive(Debug, Clone)]
pub struct RegistryApplication {
    pub name: String,
    pub version: String,
    pub hints: ResolutionHints,
}

pub async fn enumerate_registry() -> Vec<RegistryApplication> {
    match commands::run_with_timeout(
        "powershell",
        &["-NoProfile", "-Command", REGISTRY_QUERY],
        REGISTRY_TIMEOUT,
    )
    .await
    {
        Ok(stdout) => parse_registry_json(&stdout),
        Err(err) => {
            tracing::debug!(%err, "registry enumeration failed");
            Vec::new()
        }
    }
}

/// `ConvertTo-Json` emits a bare object for a single entry and an array
/// otherwise; values that are not strings are ignored.
pub(crate) fn parse_registry_json(raw: &str) -> Vec<RegistryApplication> {
    let Ok(payload) = serde_json::from_str::<serde_json::Value>(raw.trim()) else {
        return Vec::new();
    };

    let entries = match payload {
        serde_json::Value::Array(entries) => entries,
        object @ serde_json::Value::Object(_) => vec![object],
        _ => return Vec::new(),
    };

    entries
        .iter()
        .filter_map(|entry| {
            let field = |key: &str| {
                entry
                    .get(key)
                    .and_then(|v| v.as_str())
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
            };

            let name = field("DisplayName")?;
            let version = field("DisplayVersion").unwrap_or_else(|| "Unknown".to_string());
            let hints = ResolutionHints {
                app_name: name.clone(),
                display_icon: field("DisplayIcon"),
                uninstall_string: field("UninstallString"),
                install_location: field("InstallLocation"),
            };
            Some(RegistryApplication {
                name,
                version,
                hints,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_payloads_keep_named_entries_only() {
        let raw = r#"[
            {"DisplayName":"Git","DisplayVersion":"2.50.1","DisplayIcon":null,
             "UninstallString":"\"C:\\Git\\unins000.exe\"","InstallLocation":"C:\\Git"},
            {"DisplayName":null,"DisplayVersion":"1.0","DisplayIcon":null,
             "UninstallString":null,"InstallLocation":null}
        ]"#;
        let apps = parse_registry_json(raw);
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].name, "Git");
        assert_eq!(apps[0].version, "2.50.1");
        assert_eq!(
            apps[0].hints.uninstall_string.as_deref(),
            Some("\"C:\\Git\\unins000.exe\"")
        );
    }

    #[test]
    fn single_object_payload_is_accepted() {
        let raw = r#"{"DisplayName":"Dropbox","DisplayVersion":null}"#;
        let apps = parse_registry_json(raw);
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].version, "Unknown");
    }

    #[test]
    fn garbage_payload_degrades_to_empty() {
        assert!(parse_registry_json("not json at all").is_empty());
        assert!(parse_registry_json("42").is_empty());
    }
}
