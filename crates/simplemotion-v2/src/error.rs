//! SimpleMotion V2 error types.

use crate::status::BusStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SmError {
    #[error("Bus transaction failed: {0}")]
    Transport(BusStatus),

    #[error("Bus not available: {0}")]
    BusUnavailable(String),
}

pub type SmResult<T> = Result<T, SmError>;

impl SmError {
    /// Transport bits this failure contributes to a status check.
    ///
    /// Failures that carry no bits of their own count as a communication error.
    pub fn status(&self) -> BusStatus {
        match self {
            Self::Transport(status) if status.is_error() => *status,
            Self::BusUnavailable(_) => BusStatus::NODEVICE,
            Self::Transport(_) => BusStatus::COMMUNICATION,
        }
    }
}
