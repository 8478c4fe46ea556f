use serde::{Deserialize, Serialize};

/// One installed application as reported by the OS inventory commands.
///
/// `path` is only populated by the protection-oriented collector, which runs
/// the executable resolver over the registry hints. The plain `/scan`
/// inventory carries name and version only, so the field is skipped when
/// absent to keep the wire format identical to what clients already consume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstalledApplication {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl InstalledApplication {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatStatus {
    Clean,
    Suspicious,
    Malicious,
    Unknown,
    Error,
}

/// Per-application classification result. Score and status always come from
/// the classifier's fixed decision table, never from ad-hoc arithmetic.
#[derive(Debug, Clone, Serialize)]
pub struct ThreatVerdict {
    pub name: String,
    pub version: String,
    pub path: Option<String>,
    pub sha256: Option<String>,
    #[serde(rename = "threatStatus")]
    pub status: ThreatStatus,
    #[serde(rename = "threatScore")]
    pub score: u8,
    pub summary: String,
    pub source: String,
    #[serde(rename = "vtLink")]
    pub vt_link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpdateStatus {
    #[serde(rename = "Up-to-date")]
    UpToDate,
    #[serde(rename = "Update Available")]
    UpdateAvailable,
    Unverified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VersionAssessment {
    pub name: String,
    pub current: String,
    pub latest: String,
    pub status: UpdateStatus,
    #[serde(rename = "riskLevel")]
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Impact {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriverStatus {
    Installed,
    Missing,
}

/// Field names follow the legacy driver inventory payload, spaces included.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DriverRecord {
    #[serde(rename = "Driver Name")]
    pub driver_name: String,
    #[serde(rename = "Device")]
    pub device: String,
    #[serde(rename = "Impact")]
    pub impact: Impact,
    #[serde(rename = "RiskScore")]
    pub risk_score: u32,
    #[serde(rename = "Status")]
    pub status: DriverStatus,
}

/// The only persisted state: the application list from the last offline
/// package build, overwritten on every build and read back to compute the
/// next delta.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSnapshot {
    #[serde(rename = "generatedAt", default)]
    pub generated_at: String,
    #[serde(default)]
    pub apps: Vec<InstalledApplication>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChangedApplication {
    pub name: String,
    #[serde(rename = "previousVersion")]
    pub previous_version: String,
    #[serde(rename = "currentVersion")]
    pub current_version: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InventoryDelta {
    pub added: Vec<InstalledApplication>,
    pub removed: Vec<InstalledApplication>,
    pub changed: Vec<ChangedApplication>,
    #[serde(rename = "totalChanges")]
    pub total_changes: usize,
}
