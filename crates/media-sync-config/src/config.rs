use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::selection::ListSelection;

pub const ENV_IMDB_COOKIE_AT_MAIN: &str = "IMDB_COOKIE_AT_MAIN";
pub const ENV_IMDB_COOKIE_UBID_MAIN: &str = "IMDB_COOKIE_UBID_MAIN";
pub const ENV_IMDB_USER_ID: &str = "IMDB_USER_ID";
pub const ENV_IMDB_LIST_IDS: &str = "IMDB_LIST_IDS";
pub const ENV_TRAKT_CLIENT_ID: &str = "TRAKT_CLIENT_ID";
pub const ENV_TRAKT_CLIENT_SECRET: &str = "TRAKT_CLIENT_SECRET";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("the following settings are missing or empty: {}", .0.join(", "))]
    MissingValues(Vec<String>),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub imdb: ImdbConfig,
    #[serde(default)]
    pub trakt: TraktConfig,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub scheduler: Option<SchedulerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImdbConfig {
    #[serde(default)]
    pub cookie_at_main: String,
    #[serde(default)]
    pub cookie_ubid_main: String,
    /// `scrape` (or empty) resolves the id from the profile page.
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub lists: ListSelection,
}

impl Default for ImdbConfig {
    fn default() -> Self {
        Self {
            cookie_at_main: String::new(),
            cookie_ubid_main: String::new(),
            user_id: default_user_id(),
            lists: ListSelection::All,
        }
    }
}

impl ImdbConfig {
    pub fn resolves_user_id(&self) -> bool {
        self.user_id.trim().is_empty() || self.user_id == "scrape"
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraktConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_true")]
    pub lists: bool,
    #[serde(default = "default_true")]
    pub watchlist: bool,
    #[serde(default = "default_true")]
    pub ratings: bool,
    /// Source list exports fetched in parallel.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            lists: true,
            watchlist: true,
            ratings: true,
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Six-field cron expression (seconds first).
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

fn default_true() -> bool {
    true
}

fn default_user_id() -> String {
    "scrape".to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_schedule() -> String {
    "0 0 */6 * * *".to_string() // Every 6 hours
}

pub fn default_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        schedule: default_schedule(),
        run_on_startup: default_true(),
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the file when it exists, otherwise start from defaults.
    pub fn load_or_default(path: &PathBuf) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Overlay values from the environment. Set-but-empty variables are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(value) = get(ENV_IMDB_COOKIE_AT_MAIN) {
            self.imdb.cookie_at_main = value;
        }
        if let Some(value) = get(ENV_IMDB_COOKIE_UBID_MAIN) {
            self.imdb.cookie_ubid_main = value;
        }
        if let Some(value) = get(ENV_IMDB_USER_ID) {
            self.imdb.user_id = value;
        }
        if let Some(value) = get(ENV_IMDB_LIST_IDS) {
            self.imdb.lists = value.parse().unwrap_or_default();
        }
        if let Some(value) = get(ENV_TRAKT_CLIENT_ID) {
            self.trakt.client_id = value;
        }
        if let Some(value) = get(ENV_TRAKT_CLIENT_SECRET) {
            self.trakt.client_secret = value;
        }
    }

    pub fn apply_process_env(&mut self) {
        self.apply_env_overrides(|key| std::env::var(key).ok());
    }

    /// Check every required value at once so the user can fix them together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("imdb.cookie_at_main", &self.imdb.cookie_at_main),
            ("imdb.cookie_ubid_main", &self.imdb.cookie_ubid_main),
            ("trakt.client_id", &self.trakt.client_id),
            ("trakt.client_secret", &self.trakt.client_secret),
        ];
        let missing: Vec<String> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingValues(missing));
        }

        if self.sync.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sync.concurrency".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    pub fn is_trakt_configured(&self) -> bool {
        !self.trakt.client_id.trim().is_empty() && !self.trakt.client_secret.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    fn complete_config() -> Config {
        Config {
            imdb: ImdbConfig {
                cookie_at_main: "at".to_string(),
                cookie_ubid_main: "ubid".to_string(),
                ..ImdbConfig::default()
            },
            trakt: TraktConfig {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let mut config = complete_config();
        config.imdb.lists = ListSelection::Ids(vec!["ls001".to_string()]);
        config.sync.ratings = false;

        let path = file.path().to_path_buf();
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.trakt.client_id, "id");
        assert_eq!(loaded.imdb.lists, ListSelection::Ids(vec!["ls001".to_string()]));
        assert!(!loaded.sync.ratings);
        assert!(loaded.sync.watchlist);
    }

    #[test]
    fn test_defaults_from_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [imdb]
            cookie_at_main = "a"
            cookie_ubid_main = "b"
            "#,
        )
        .unwrap();
        assert_eq!(config.imdb.user_id, "scrape");
        assert!(config.imdb.resolves_user_id());
        assert!(config.imdb.lists.is_all());
        assert_eq!(config.sync.concurrency, 4);
        assert!(config.scheduler.is_none());
    }

    #[test]
    fn test_validate_reports_every_missing_value() {
        let err = Config::default().validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "the following settings are missing or empty: imdb.cookie_at_main, imdb.cookie_ubid_main, trakt.client_id, trakt.client_secret"
        );
        assert!(complete_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = complete_config();
        config.sync.concurrency = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_IMDB_COOKIE_AT_MAIN, "env-at"),
            (ENV_IMDB_LIST_IDS, "ls1,ls2"),
            (ENV_IMDB_USER_ID, "ur123"),
            (ENV_TRAKT_CLIENT_SECRET, "   "),
        ]
        .into_iter()
        .collect();

        let mut config = complete_config();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.imdb.cookie_at_main, "env-at");
        assert_eq!(config.imdb.cookie_ubid_main, "ubid");
        assert_eq!(config.imdb.user_id, "ur123");
        assert!(!config.imdb.resolves_user_id());
        assert_eq!(config.imdb.lists, ListSelection::Ids(vec!["ls1".to_string(), "ls2".to_string()]));
        assert_eq!(config.trakt.client_secret, "secret");
    }
}
