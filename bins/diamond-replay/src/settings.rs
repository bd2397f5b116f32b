//! Settings loading: optional TOML file, then `DIAMOND_` environment overrides.
//!
//! Nested keys use a double underscore, e.g.
//! `DIAMOND_DETECTOR__SAME_SLOT_THRESHOLD=4`.

use std::path::Path;

use diamond_core::config::Settings;
use diamond_core::error::ConfigError;

pub const ENV_PREFIX: &str = "DIAMOND";

/// Load and validate settings. Missing keys take their defaults.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(
            config::File::from(path)
                .format(config::FileFormat::Toml)
                .required(true),
        );
    }
    let settings: Settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| ConfigError::Source(e.to_string()))?;

    settings.validate()?;
    Ok(settings)
}
