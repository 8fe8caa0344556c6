use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::{init_tracing, LogGuard};
pub use settings::Settings;

/// Default location of the optional settings file.
pub const DEFAULT_CONFIG_FILE: &str = "reportdesk.toml";

/// Loads the application settings.
///
/// Sources, lowest precedence first: built-in defaults, the optional TOML file at
/// `config_path`, then the process environment (`MONGO_URI`, `PORT`, ...). The
/// caller is expected to have loaded `.env` into the environment beforehand.
pub fn load_settings(config_path: &Path) -> Result<Settings, ConfigError> {
    load_settings_with_env(config_path, config::Environment::default())
}

/// Same as `load_settings`, with an explicit environment source.
pub fn load_settings_with_env(
    config_path: &Path,
    environment: config::Environment,
) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        // The file is optional: a bare deployment configures everything through the environment.
        .add_source(config::File::from(config_path).required(false))
        // `PORT=` behaves like an unset PORT.
        .add_source(environment.try_parsing(true).ignore_empty(true))
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;
    settings.validate()?;

    Ok(settings)
}
