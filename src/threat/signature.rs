// src/threat/signature.rs
use std::time::Duration;

use dashmap::DashMap;

use crate::commands;

const SIGNATURE_TIMEOUT: Duration = Duration::from_secs(6);

/// Status reported when the platform tool is unavailable or fails.
pub const STATUS_UNKNOWN_ERROR: &str = "UnknownError";

/// Authenticode status lookups, cached by file path for the process lifetime
/// so repeated scans do not re-invoke PowerShell for the same binary.
#[derive(Default)]
pub struct SignatureChecker {
    cache: DashMap<String, String>,
}

impl SignatureChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn status(&self, file_path: &str) -> String {
        if let Some(hit) = self.cache.get(file_path) {
            return hit.clone();
        }
        let status = query_status(file_path).await;
        self.cache.insert(file_path.to_string(), status.clone());
        status
    }
}

async fn query_status(file_path: &str) -> String {
    if std::env::consts::OS != "windows" {
        return STATUS_UNKNOWN_ERROR.to_string();
    }

    let escaped = file_path.replace('\'', "''");
    let command = format!("(Get-AuthenticodeSignature -FilePath '{}').Status", escaped);
    match commands::run_with_timeout(
        "powershell",
        &["-NoProfile", "-Command", &command],
        SIGNATURE_TIMEOUT,
    )
    .await
    {
        Ok(stdout) => {
            let status = stdout.trim();
            if status.is_empty() {
                STATUS_UNKNOWN_ERROR.to_string()
            } else {
                status.to_string()
            }
        }
        Err(err) => {
            tracing::debug!(%err, path = file_path, "authenticode status query failed");
            STATUS_UNKNOWN_ERROR.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn status_is_cached_by_path() {
        let checker = SignatureChecker::new();
        let first = checker.status("C:\\missing\\tool.exe").await;
        checker
            .cache
            .insert("C:\\missing\\tool.exe".to_string(), "Valid".to_string());
        // The cached value wins over a fresh query.
        assert_eq!(checker.status("C:\\missing\\tool.exe").await, "Valid");
        assert_eq!(first, STATUS_UNKNOWN_ERROR);
    }
}
