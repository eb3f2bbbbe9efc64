//! Configuration loading for schemagraph.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`<ENV_PREFIX>__SECTION__KEY`)
//! 2. Config file (`<file_prefix>.toml`, optional)
//! 3. Defaults

use serde::de::DeserializeOwned;

use crate::error::CoreError;

/// Default config file prefix (`schemagraph.toml`).
pub const DEFAULT_FILE_PREFIX: &str = "schemagraph";

/// Default environment variable prefix (`SCHEMAGRAPH__NEO4J__URI`).
pub const DEFAULT_ENV_PREFIX: &str = "SCHEMAGRAPH";

/// Load one section of the layered configuration.
///
/// A missing file is fine. A missing section yields `T::default()`; a
/// present but malformed section is an error.
pub fn load_section<T>(file_prefix: &str, env_prefix: &str, section: &str) -> Result<T, CoreError>
where
    T: DeserializeOwned + Default,
{
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix(env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    match cfg.get::<T>(section) {
        Ok(value) => Ok(value),
        Err(config::ConfigError::NotFound(_)) => {
            tracing::debug!(section, "Config section not found, using defaults");
            Ok(T::default())
        }
        Err(e) => Err(e.into()),
    }
}
