//! CLI subcommands.

pub mod operations;
pub mod profile;
pub mod run;

use std::path::Path;

use iqmetrix_dropship_channel::{ChannelConfig, ChannelError, ConfigError, UnknownOperation};
use thiserror::Error;

/// Errors that end a CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    /// The channel profile could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The channel could not be built.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The operation name is not supported.
    #[error(transparent)]
    Operation(#[from] UnknownOperation),

    /// The input could not be read.
    #[error("Failed to read input '{path}': {source}")]
    Input {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The input is not JSON.
    #[error("Input is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The operation ran and reported a failure status.
    #[error("Operation failed with status {0}")]
    Failed(u16),
}

/// Load the channel configuration from `path`, or from the environment.
///
/// Environment overrides apply in both cases.
pub fn load_config(path: Option<&Path>) -> Result<ChannelConfig, ConfigError> {
    match path {
        Some(path) => {
            let mut config = ChannelConfig::from_path(path)?;
            config.apply_env_overrides()?;
            Ok(config)
        }
        None => ChannelConfig::from_env(),
    }
}
