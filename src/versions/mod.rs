// src/versions/mod.rs
//
// Latest-version resolution and update risk assessment. Common language
// runtimes go to a live package-manager query first and fall back to the
// static table; dpkg-style python packages go to the package index; anything
// else is answered from the table or reported as Unknown.

mod feeds;

pub use feeds::{PackageIndexFeed, VersionFeed, WingetFeed};

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::models::{RiskLevel, UpdateStatus, VersionAssessment};

const CACHE_TTL: Duration = Duration::from_secs(3600);

const UNKNOWN: &str = "Unknown";

/// Shipped fallback when no `latest_versions.json` is present in the data dir.
static DEFAULT_TABLE: &[(&str, &str)] = &[
    ("node.js", "24.4.1"),
    ("python", "3.13.5"),
    ("java", "21.0.7"),
    ("google chrome", "138.0.7204.97"),
    ("github desktop", "3.4.13"),
    ("git", "2.50.1"),
    ("dropbox", "207.4.5821"),
    ("dbeaver", "25.1.2"),
    ("epic games launcher", "18.11.1"),
    ("go programming language", "1.24.5"),
];

/// Version string parsed into dotted numeric segments. Trailing qualifiers
/// are tolerated (`1.2.3-beta` compares as 1.2.3); comparison pads the
/// shorter side with zeros so `1.2` equals `1.2.0`.
#[derive(Debug, Clone)]
pub struct ParsedVersion {
    segments: Vec<u64>,
}

impl ParsedVersion {
    pub fn major(&self) -> u64 {
        self.segments.first().copied().unwrap_or(0)
    }

    pub fn minor(&self) -> u64 {
        self.segments.get(1).copied().unwrap_or(0)
    }
}

impl Ord for ParsedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for idx in 0..len {
            let a = self.segments.get(idx).copied().unwrap_or(0);
            let b = other.segments.get(idx).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for ParsedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ParsedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ParsedVersion {}

/// Lenient parse: leading `v` tolerated, each dot-separated piece contributes
/// its leading digits, parsing stops at the first piece without any. Returns
/// `None` when not even a leading number is present.
pub fn parse_version(raw: &str) -> Option<ParsedVersion> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    let mut segments = Vec::new();
    for piece in trimmed.split('.') {
        let digits: String = piece.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            break;
        }
        segments.push(digits.parse().ok()?);
        // A qualifier glued to the digits ends the numeric prefix.
        if digits.len() != piece.len() {
            break;
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(ParsedVersion { segments })
    }
}

/// Risk from the version gap; only called when both sides parsed.
pub fn assess_risk(current: &ParsedVersion, latest: &ParsedVersion) -> RiskLevel {
    if current >= latest {
        RiskLevel::Low
    } else if current.major() < latest.major() {
        RiskLevel::High
    } else if current.minor() < latest.minor() {
        RiskLevel::Medium
    } else {
        // Patch-level lag deliberately stays Low.
        RiskLevel::Low
    }
}

fn runtime_winget_id(normalized: &str) -> Option<&'static str> {
    if normalized.contains("python") {
        Some("Python.Python.3")
    } else if normalized.contains("node.js") || normalized.starts_with("node") {
        Some("OpenJS.NodeJS")
    } else if normalized.contains("java") {
        Some("Oracle.JDK.21")
    } else {
        None
    }
}

/// dpkg package names like `python3-requests` map to the index package name.
fn index_package(normalized: &str) -> Option<&str> {
    normalized
        .strip_prefix("python3-")
        .or_else(|| normalized.strip_prefix("python-"))
        .filter(|rest| !rest.is_empty())
}

pub struct VersionService {
    winget: Arc<dyn VersionFeed>,
    index: Arc<dyn VersionFeed>,
    table: HashMap<String, String>,
    cache: TtlCache<String>,
}

impl VersionService {
    pub fn new(
        table: HashMap<String, String>,
        winget: Arc<dyn VersionFeed>,
        index: Arc<dyn VersionFeed>,
    ) -> Self {
        Self {
            winget,
            index,
            table,
            cache: TtlCache::new(CACHE_TTL),
        }
    }

    /// Load the static table from disk, falling back to the shipped defaults.
    /// Keys are normalized to lowercase at load time.
    pub fn load_table(path: &Path) -> HashMap<String, String> {
        let from_disk = std::fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str::<HashMap<String, String>>(&raw).ok());

        match from_disk {
            Some(raw) => raw
                .into_iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
                .collect(),
            None => DEFAULT_TABLE
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Assess every `(name, current version)` pair in the request.
    pub async fn assess_all(&self, installed: &BTreeMap<String, String>) -> Vec<VersionAssessment> {
        let mut results = Vec::with_capacity(installed.len());
        for (name, current) in installed {
            results.push(self.assess(name, current).await);
        }
        results
    }

    pub async fn assess(&self, name: &str, current: &str) -> VersionAssessment {
        let mut latest = self.resolve_latest(name).await;

        let current_parsed = parse_version(current);
        let latest_parsed = if latest == UNKNOWN {
            None
        } else {
            parse_version(&latest)
        };

        let (status, risk_level) = match (&current_parsed, &latest_parsed) {
            (Some(cur), Some(lat)) if cur >= lat => {
                (UpdateStatus::UpToDate, assess_risk(cur, lat))
            }
            (Some(cur), Some(lat)) => (UpdateStatus::UpdateAvailable, assess_risk(cur, lat)),
            _ => {
                // Nothing to compare against; surface the installed version
                // (or N/A) rather than a latest we could not verify.
                latest = if current.trim().to_lowercase() != "unknown" {
                    current.trim().to_string()
                } else {
                    "N/A".to_string()
                };
                (UpdateStatus::Unverified, RiskLevel::Unknown)
            }
        };

        VersionAssessment {
            name: name.to_string(),
            current: current.to_string(),
            latest,
            status,
            risk_level,
        }
    }

    pub async fn resolve_latest(&self, name: &str) -> String {
        let key = name.trim().to_lowercase();
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }
        let latest = self.resolve_uncached(&key).await;
        self.cache.insert(key, latest.clone());
        latest
    }

    async fn resolve_uncached(&self, normalized: &str) -> String {
        // dpkg-style `python3-foo` names are more specific than the bare
        // runtime match below, so they are tested first.
        if let Some(package) = index_package(normalized) {
            if let Some(live) = self.index.latest(package).await {
                return live;
            }
            return self.table_lookup(normalized);
        }

        if let Some(id) = runtime_winget_id(normalized) {
            if let Some(live) = self.winget.latest(id).await {
                return live;
            }
            return self.table_lookup(normalized);
        }

        self.table_lookup(normalized)
    }

    /// Exact key first, then substring containment in either direction.
    fn table_lookup(&self, normalized: &str) -> String {
        if let Some(version) = self.table.get(normalized) {
            return version.clone();
        }
        for (known_name, known_version) in &self.table {
            if known_name.contains(normalized) || normalized.contains(known_name.as_str()) {
                return known_version.clone();
            }
        }
        UNKNOWN.to_string()
    }
}
