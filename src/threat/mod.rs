// src/threat/mod.rs
//
// Identity and threat classification for resolved executables: streaming
// content hash, reputation lookup, local signature fallback, and the fixed
// status/score decision table.

mod reputation;
mod signature;

pub use reputation::{EngineStats, ReputationClient, ReputationOutcome};
pub use signature::{STATUS_UNKNOWN_ERROR, SignatureChecker};

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::models::{InstalledApplication, ThreatStatus, ThreatVerdict};

const HASH_CHUNK_SIZE: usize = 1024 * 1024;
const REPUTATION_LINK_BASE: &str = "https://www.virustotal.com/gui/file";

const SOURCE_LOCAL: &str = "Local";
const SOURCE_REPUTATION: &str = "VirusTotal";
const SOURCE_COMBINED: &str = "Local + VirusTotal";

/// Streaming SHA-256 of a file, chunked so large installers do not get
/// slurped into memory.
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Map reputation engine counters onto the fixed verdict table.
pub fn verdict_from_stats(stats: &EngineStats) -> (ThreatStatus, u8) {
    if stats.malicious > 0 {
        (ThreatStatus::Malicious, 90)
    } else if stats.suspicious > 0 {
        (ThreatStatus::Suspicious, 70)
    } else if stats.harmless + stats.undetected > 0 {
        (ThreatStatus::Clean, 10)
    } else {
        (ThreatStatus::Unknown, 35)
    }
}

pub struct ThreatClassifier {
    reputation: ReputationClient,
    signatures: SignatureChecker,
}

impl ThreatClassifier {
    pub fn new(reputation: ReputationClient) -> Self {
        Self {
            reputation,
            signatures: SignatureChecker::new(),
        }
    }

    pub fn reputation(&self) -> &ReputationClient {
        &self.reputation
    }

    pub async fn classify(&self, app: &InstalledApplication) -> ThreatVerdict {
        let resolved = app
            .path
            .as_deref()
            .filter(|p| Path::new(p).is_file());
        let Some(file_path) = resolved else {
            return ThreatVerdict {
                name: app.name.clone(),
                version: app.version.clone(),
                path: app.path.clone(),
                sha256: None,
                status: ThreatStatus::Unknown,
                score: 40,
                summary: "Executable path not found.".to_string(),
                source: SOURCE_LOCAL.to_string(),
                vt_link: None,
            };
        };

        let file_hash = match hash_file(Path::new(file_path)) {
            Ok(hash) => hash,
            Err(err) => {
                return ThreatVerdict {
                    name: app.name.clone(),
                    version: app.version.clone(),
                    path: app.path.clone(),
                    sha256: None,
                    status: ThreatStatus::Error,
                    score: 50,
                    summary: format!("Unable to hash file: {}", err),
                    source: SOURCE_LOCAL.to_string(),
                    vt_link: None,
                };
            }
        };

        let vt_link = format!("{}/{}", REPUTATION_LINK_BASE, file_hash);
        let verdict = |status, score, summary: String, source: &str| ThreatVerdict {
            name: app.name.clone(),
            version: app.version.clone(),
            path: app.path.clone(),
            sha256: Some(file_hash.clone()),
            status,
            score,
            summary,
            source: source.to_string(),
            vt_link: Some(vt_link.clone()),
        };

        match self.reputation.lookup(&file_hash).await {
            ReputationOutcome::NoApiKey => {
                let sig_status = self.signatures.status(file_path).await;
                let (status, score, summary) = match sig_status.as_str() {
                    "Valid" => (
                        ThreatStatus::Clean,
                        20,
                        "VT_API_KEY not configured. File has a valid Authenticode signature."
                            .to_string(),
                    ),
                    "NotSigned" | "HashMismatch" => (
                        ThreatStatus::Suspicious,
                        65,
                        format!(
                            "VT_API_KEY not configured. Authenticode status is {}.",
                            sig_status
                        ),
                    ),
                    _ => (
                        ThreatStatus::Unknown,
                        35,
                        format!(
                            "VT_API_KEY not configured. Authenticode status is {}.",
                            sig_status
                        ),
                    ),
                };
                verdict(status, score, summary, SOURCE_COMBINED)
            }
            ReputationOutcome::NotFound => verdict(
                ThreatStatus::Unknown,
                30,
                "Hash not found in VirusTotal.".to_string(),
                SOURCE_REPUTATION,
            ),
            ReputationOutcome::Failed(detail) => verdict(
                ThreatStatus::Error,
                45,
                format!("VirusTotal error: {}", detail),
                SOURCE_REPUTATION,
            ),
            ReputationOutcome::Hit(stats) => {
                let (status, score) = verdict_from_stats(&stats);
                let summary = format!(
                    "Engines: malicious={}, suspicious={}, harmless={}, undetected={}",
                    stats.malicious, stats.suspicious, stats.harmless, stats.undetected
                );
                verdict(status, score, summary, SOURCE_REPUTATION)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(malicious: u32, suspicious: u32, harmless: u32, undetected: u32) -> EngineStats {
        EngineStats {
            malicious,
            suspicious,
            harmless,
            undetected,
        }
    }

    #[test]
    fn any_malicious_engine_is_malicious_90() {
        assert_eq!(
            verdict_from_stats(&stats(1, 0, 60, 0)),
            (ThreatStatus::Malicious, 90)
        );
        assert_eq!(
            verdict_from_stats(&stats(42, 7, 0, 3)),
            (ThreatStatus::Malicious, 90)
        );
    }

    #[test]
    fn suspicious_without_malicious_is_suspicious_70() {
        assert_eq!(
            verdict_from_stats(&stats(0, 2, 10, 5)),
            (ThreatStatus::Suspicious, 70)
        );
    }

    #[test]
    fn harmless_or_undetected_only_is_clean_10() {
        assert_eq!(
            verdict_from_stats(&stats(0, 0, 3, 58)),
            (ThreatStatus::Clean, 10)
        );
        assert_eq!(
            verdict_from_stats(&stats(0, 0, 0, 1)),
            (ThreatStatus::Clean, 10)
        );
    }

    #[test]
    fn all_zero_counters_are_unknown_35() {
        assert_eq!(
            verdict_from_stats(&stats(0, 0, 0, 0)),
            (ThreatStatus::Unknown, 35)
        );
    }

    #[test]
    fn hash_file_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.bin");
        std::fs::write(&path, b"hello").unwrap();
        assert_eq!(
            hash_file(&path).unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test]
    async fn missing_path_is_unknown_40() {
        let client = ReputationClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/files".to_string(),
            "REVAMP_TEST_UNSET_KEY".to_string(),
            std::path::PathBuf::from("/nonexistent/key"),
        );
        let classifier = ThreatClassifier::new(client);
        let app = InstalledApplication::new("Ghost App", "1.0");
        let verdict = classifier.classify(&app).await;
        assert_eq!(verdict.status, ThreatStatus::Unknown);
        assert_eq!(verdict.score, 40);
        assert_eq!(verdict.source, "Local");
        assert!(verdict.sha256.is_none());
    }

    #[tokio::test]
    async fn no_key_and_unknown_signature_is_unknown_35() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("tool.exe");
        std::fs::write(&exe, b"MZ binary").unwrap();

        let client = ReputationClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/files".to_string(),
            "REVAMP_TEST_UNSET_KEY".to_string(),
            dir.path().join("no-key-file"),
        );
        let classifier = ThreatClassifier::new(client);
        let mut app = InstalledApplication::new("Tool", "1.0");
        app.path = Some(exe.display().to_string());

        let verdict = classifier.classify(&app).await;
        // Non-Windows hosts report UnknownError for the signature status.
        if verdict.summary.contains(STATUS_UNKNOWN_ERROR) {
            assert_eq!(verdict.status, ThreatStatus::Unknown);
            assert_eq!(verdict.score, 35);
        }
        assert_eq!(verdict.source, "Local + VirusTotal");
        assert!(verdict.sha256.is_some());
        assert!(
            verdict
                .vt_link
                .as_deref()
                .unwrap()
                .starts_with("https://www.virustotal.com/gui/file/")
        );
    }
}
