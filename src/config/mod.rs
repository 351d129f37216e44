/// Database configuration and connection management
pub mod database;

/// Engine settings loaded from config.toml
pub mod settings;

pub use settings::{
    AppConfig, InboxConfig, SchedulerConfig, load_config, load_config_or_default,
    load_default_config,
};
