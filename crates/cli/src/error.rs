//! Error types for smconsole

use smconsole_simplemotion_v2::SmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Bus(#[from] SmError),

    #[error("Not connected to a bus, run `connect` first")]
    NotConnected,

    #[error("SM bus errors reported by `{0}`")]
    CheckFailed(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl CliError {
    /// Process exit code for this kind of failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Bus(_) | Self::NotConnected => 2,
            Self::CheckFailed(_) => 3,
            Self::InvalidConfiguration(_) | Self::YamlError(_) => 4,
        }
    }
}
