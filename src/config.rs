use std::path::PathBuf;

use anyhow::Result;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Base URL of the file-reputation service, `GET <base>/<hash>`.
    pub reputation_api_base: String,
    /// Environment variable the reputation API key is read from.
    pub reputation_key_env: String,
    /// Fallback file consulted when the environment variable is unset.
    pub reputation_key_file: PathBuf,
    /// Base URL of the package metadata index, `GET <base>/<name>/json`.
    pub package_index_base: String,
    /// Directory holding the static version table and driver snapshot files.
    pub data_dir: PathBuf,
    /// Location of the persisted last-scan snapshot.
    pub snapshot_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let home = home::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let data_dir = home.join(".revamp");
        Self {
            port: 8080,
            reputation_api_base: "https://www.virustotal.com/api/v3/files".to_string(),
            reputation_key_env: "VT_API_KEY".to_string(),
            reputation_key_file: home.join(".revamp_vt_api_key"),
            package_index_base: "https://pypi.org/pypi".to_string(),
            snapshot_path: data_dir
                .join("cache")
                .join("offline_packages")
                .join("last_scan_snapshot.json"),
            data_dir,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let data_dir = std::env::var("REVAMP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let snapshot_path = std::env::var("REVAMP_CACHE_DIR")
            .map(|dir| PathBuf::from(dir).join("last_scan_snapshot.json"))
            .unwrap_or_else(|_| {
                data_dir
                    .join("cache")
                    .join("offline_packages")
                    .join("last_scan_snapshot.json")
            });

        let config = Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            reputation_api_base: std::env::var("VT_API_BASE")
                .unwrap_or(defaults.reputation_api_base),
            reputation_key_env: defaults.reputation_key_env,
            reputation_key_file: std::env::var("REVAMP_VT_KEY_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.reputation_key_file),
            package_index_base: std::env::var("PYPI_API_BASE")
                .unwrap_or(defaults.package_index_base),
            data_dir,
            snapshot_path,
        };

        Ok(config)
    }

    pub fn latest_versions_path(&self) -> PathBuf {
        self.data_dir.join("latest_versions.json")
    }

    pub fn missing_drivers_path(&self) -> PathBuf {
        self.data_dir.join("missing_drivers.json")
    }
}
