// src/threat/reputation.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use dashmap::DashMap;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(15);

/// Engine counters from the reputation service's last analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineStats {
    #[serde(default)]
    pub malicious: u32,
    #[serde(default)]
    pub suspicious: u32,
    #[serde(default)]
    pub harmless: u32,
    #[serde(default)]
    pub undetected: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReputationOutcome {
    /// No credential configured; callers fall back to the local signature check.
    NoApiKey,
    /// The service has never seen this hash.
    NotFound,
    Hit(EngineStats),
    /// Transport error or a non-200/404 status.
    Failed(String),
}

/// Hash-reputation lookups against a VirusTotal-style API. Raw outcomes are
/// cached by hash for the process lifetime; the services are short-lived per
/// scan, so no TTL is needed.
pub struct ReputationClient {
    client: Client,
    api_base: String,
    key_env: String,
    key_file: PathBuf,
    cache: DashMap<String, ReputationOutcome>,
}

impl ReputationClient {
    pub fn new(client: Client, api_base: String, key_env: String, key_file: PathBuf) -> Self {
        Self {
            client,
            api_base,
            key_env,
            key_file,
            cache: DashMap::new(),
        }
    }

    pub fn key_file(&self) -> &Path {
        &self.key_file
    }

    /// Key from the environment variable, trimmed.
    pub fn env_key(&self) -> String {
        std::env::var(&self.key_env)
            .map(|k| k.trim().to_string())
            .unwrap_or_default()
    }

    /// Key from the fallback file, trimmed. Unreadable files count as empty.
    pub fn file_key(&self) -> String {
        std::fs::read_to_string(&self.key_file)
            .map(|k| k.trim().to_string())
            .unwrap_or_default()
    }

    fn api_key(&self) -> Option<String> {
        let env_key = self.env_key();
        if !env_key.is_empty() {
            return Some(env_key);
        }
        let file_key = self.file_key();
        if !file_key.is_empty() {
            return Some(file_key);
        }
        None
    }

    pub async fn lookup(&self, file_hash: &str) -> ReputationOutcome {
        if let Some(hit) = self.cache.get(file_hash) {
            return hit.clone();
        }

        // A missing key is not cached: the operator may configure one while
        // the process is running.
        let Some(api_key) = self.api_key() else {
            return ReputationOutcome::NoApiKey;
        };

        let outcome = self.query(file_hash, &api_key).await;
        self.cache.insert(file_hash.to_string(), outcome.clone());
        outcome
    }

    pub async fn query(&self, file_hash: &str, api_key: &str) -> ReputationOutcome {
        let url = format!("{}/{}", self.api_base, file_hash);
        let response = match self
            .client
            .get(&url)
            .header("x-apikey", api_key)
            .timeout(LOOKUP_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return ReputationOutcome::Failed(err.to_string()),
        };

        match response.status() {
            StatusCode::NOT_FOUND => ReputationOutcome::NotFound,
            StatusCode::OK => match response.json::<serde_json::Value>().await {
                Ok(payload) => {
                    let stats = payload
                        .pointer("/data/attributes/last_analysis_stats")
                        .cloned()
                        .and_then(|value| serde_json::from_value(value).ok())
                        .unwrap_or_default();
                    ReputationOutcome::Hit(stats)
                }
                Err(err) => ReputationOutcome::Failed(format!("invalid payload: {}", err)),
            },
            status => ReputationOutcome::Failed(format!("status {}", status.as_u16())),
        }
    }
}
