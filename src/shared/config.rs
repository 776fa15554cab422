//! Application configuration. Store backend, paths, Firestore credentials.

use crate::adapters::firestore::{DEFAULT_FIRESTORE_BASE_URL, FirestoreSettings};
use crate::domain::DomainError;
use crate::usecases::DEFAULT_MAX_CODE_ATTEMPTS;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Collection the clubs tab of the mobile app writes to.
pub const DEFAULT_COLLECTION: &str = "clubs_1";
pub const DEFAULT_SHARE_BASE_URL: &str = "https://snsnextgenservices.com/club";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Where group records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Sqlite,
    Firestore,
}

impl FromStr for StoreBackend {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "sqlite" => Ok(StoreBackend::Sqlite),
            "firestore" => Ok(StoreBackend::Firestore),
            other => Err(DomainError::Config(format!(
                "unknown backend {:?} (expected memory, sqlite or firestore)",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// `memory`, `sqlite` (default) or `firestore`. Read from CLUBDIR_BACKEND.
    #[serde(default)]
    pub backend: Option<String>,
    pub data_dir: Option<String>,
    /// Group collection / logical directory name. Read from CLUBDIR_COLLECTION.
    #[serde(default)]
    pub collection: Option<String>,
    /// Codes tried per create before giving up. Read from CLUBDIR_MAX_CODE_ATTEMPTS.
    #[serde(default)]
    pub max_code_attempts: Option<u32>,
    /// Prefix of share links; the group id is appended. Read from CLUBDIR_SHARE_BASE_URL.
    #[serde(default)]
    pub share_base_url: Option<String>,
    /// Directory for CSV exports (default `{data_dir}/exports`). Read from CLUBDIR_EXPORT_DIR.
    #[serde(default)]
    pub export_dir: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Firestore Configuration
    // ─────────────────────────────────────────────────────────────────────────
    /// Read from CLUBDIR_FIRESTORE_PROJECT_ID.
    #[serde(default)]
    pub firestore_project_id: Option<String>,

    /// Web API key. Read from CLUBDIR_FIRESTORE_API_KEY.
    #[serde(default)]
    pub firestore_api_key: Option<String>,

    /// Bearer token for authenticated rules. Read from CLUBDIR_FIRESTORE_AUTH_TOKEN.
    #[serde(default)]
    pub firestore_auth_token: Option<String>,

    /// Read from CLUBDIR_FIRESTORE_BASE_URL (emulators, proxies).
    #[serde(default)]
    pub firestore_base_url: Option<String>,

    /// Live-update polling period. Read from CLUBDIR_POLL_INTERVAL_MS.
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("CLUBDIR"));
        if let Ok(path) = std::env::var("CLUBDIR_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    pub fn backend(&self) -> Result<StoreBackend, DomainError> {
        self.backend
            .as_deref()
            .map(str::parse::<StoreBackend>)
            .unwrap_or(Ok(StoreBackend::Sqlite))
    }

    pub fn data_dir_or_default(&self) -> PathBuf {
        PathBuf::from(self.data_dir.as_deref().unwrap_or("./data"))
    }

    pub fn collection_or_default(&self) -> String {
        self.collection
            .clone()
            .unwrap_or_else(|| DEFAULT_COLLECTION.to_string())
    }

    /// Defaults to 10; zero is treated as one attempt.
    pub fn max_code_attempts_or_default(&self) -> u32 {
        self.max_code_attempts
            .unwrap_or(DEFAULT_MAX_CODE_ATTEMPTS)
            .max(1)
    }

    pub fn share_base_url_or_default(&self) -> String {
        self.share_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_SHARE_BASE_URL.to_string())
    }

    pub fn export_dir_or_default(&self) -> PathBuf {
        self.export_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.data_dir_or_default().join("exports"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS).max(100))
    }

    /// Settings for the Firestore store. Fails if no project id is configured.
    pub fn firestore_settings(&self) -> Result<FirestoreSettings, DomainError> {
        let project_id = self
            .firestore_project_id
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                DomainError::Config("Set CLUBDIR_FIRESTORE_PROJECT_ID for the firestore backend".into())
            })?;
        Ok(FirestoreSettings {
            base_url: self
                .firestore_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_FIRESTORE_BASE_URL.to_string()),
            project_id,
            collection: self.collection_or_default(),
            api_key: self.firestore_api_key.clone(),
            auth_token: self.firestore_auth_token.clone(),
            poll_interval: self.poll_interval(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.backend().unwrap(), StoreBackend::Sqlite);
        assert_eq!(cfg.collection_or_default(), "clubs_1");
        assert_eq!(cfg.max_code_attempts_or_default(), 10);
        assert_eq!(cfg.export_dir_or_default(), PathBuf::from("./data/exports"));
        assert_eq!(cfg.poll_interval(), Duration::from_millis(2000));
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("Memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!(" firestore ".parse::<StoreBackend>().unwrap(), StoreBackend::Firestore);
        assert!(matches!(
            "postgres".parse::<StoreBackend>(),
            Err(DomainError::Config(_))
        ));
    }

    #[test]
    fn test_firestore_settings_require_project() {
        let mut cfg = AppConfig::default();
        assert!(cfg.firestore_settings().is_err());
        cfg.firestore_project_id = Some("teammates-demo".into());
        cfg.collection = Some("groups_1".into());
        let settings = cfg.firestore_settings().unwrap();
        assert_eq!(settings.project_id, "teammates-demo");
        assert_eq!(settings.collection, "groups_1");
        assert_eq!(settings.base_url, DEFAULT_FIRESTORE_BASE_URL);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let cfg = AppConfig {
            max_code_attempts: Some(0),
            ..Default::default()
        };
        assert_eq!(cfg.max_code_attempts_or_default(), 1);
    }
}
