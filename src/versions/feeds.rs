// src/versions/feeds.rs
//
// Live "latest version" sources. Both degrade to `None` on any failure so
// the resolver can fall through to the static table.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;

use crate::commands;

#[async_trait]
pub trait VersionFeed: Send + Sync {
    fn id(&self) -> &'static str;
    async fn latest(&self, package: &str) -> Option<String>;
}

const WINGET_TIMEOUT: Duration = Duration::from_secs(8);

static VERSION_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Version:\s*([^\r\n]+)").unwrap());

/// Package-manager metadata via `winget show`, parsing the `Version:` line
/// out of its free-text output.
pub struct WingetFeed;

#[async_trait]
impl VersionFeed for WingetFeed {
    fn id(&self) -> &'static str {
        "winget"
    }

    async fn latest(&self, package: &str) -> Option<String> {
        let stdout = commands::run_with_timeout(
            "winget",
            &[
                "show",
                "--id",
                package,
                "--exact",
                "--accept-source-agreements",
                "--disable-interactivity",
            ],
            WINGET_TIMEOUT,
        )
        .await
        .map_err(|err| tracing::debug!(%err, package, "winget lookup failed"))
        .ok()?;

        parse_version_line(&stdout)
    }
}

pub(crate) fn parse_version_line(output: &str) -> Option<String> {
    VERSION_LINE_RE
        .captures(output)
        .map(|caps| caps[1].trim().to_string())
        .filter(|version| !version.is_empty())
}

const INDEX_TIMEOUT: Duration = Duration::from_secs(5);

/// Package index metadata, `GET <base>/<name>/json` with the version at
/// `info.version` (the PyPI JSON API shape).
pub struct PackageIndexFeed {
    client: Client,
    api_base: String,
}

impl PackageIndexFeed {
    pub fn new(client: Client, api_base: String) -> Self {
        Self { client, api_base }
    }
}

#[async_trait]
impl VersionFeed for PackageIndexFeed {
    fn id(&self) -> &'static str {
        "package-index"
    }

    async fn latest(&self, package: &str) -> Option<String> {
        let url = format!("{}/{}/json", self.api_base, package);
        let response = self
            .client
            .get(&url)
            .timeout(INDEX_TIMEOUT)
            .send()
            .await
            .map_err(|err| tracing::debug!(%err, package, "package index lookup failed"))
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let payload: serde_json::Value = response.json().await.ok()?;
        payload
            .pointer("/info/version")
            .and_then(|v| v.as_str())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_line_is_extracted_from_free_text() {
        let output = "Found Node.js [OpenJS.NodeJS]\r\nVersion: 24.4.1\r\nPublisher: OpenJS\r\n";
        assert_eq!(parse_version_line(output).as_deref(), Some("24.4.1"));
    }

    #[test]
    fn missing_version_line_yields_none() {
        assert_eq!(parse_version_line("No package found matching input"), None);
    }
}
