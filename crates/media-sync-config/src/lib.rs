pub mod config;
pub mod credentials;
pub mod paths;
pub mod selection;

pub use config::{default_scheduler_config, Config, ConfigError, ImdbConfig, SchedulerConfig, SyncSettings, TraktConfig};
pub use credentials::CredentialStore;
pub use paths::{container_base_path, PathManager};
pub use selection::ListSelection;
