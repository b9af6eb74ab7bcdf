//! Error kinds (spec §7). Frame-level errors are recovered locally by the
//! engine (drop-and-count, never propagated); this enum exists for the
//! subset of operations spec §7 says DO surface errors: configuration
//! rejection and resource exhaustion, plus the two frame-validation and
//! guard-violation kinds used internally for logging and counters.

use crate::ids::PortId;

#[derive(Debug, thiserror::Error)]
pub enum StpError {
    #[error("invalid BPDU on port {port:?}: {reason}")]
    InvalidBpdu { port: PortId, reason: &'static str },

    #[error("stale BPDU on port {port:?}: message_age {message_age} >= max_age {max_age}")]
    StaleBpdu {
        port: PortId,
        message_age: u8,
        max_age: u8,
    },

    #[error("guard violation on port {port:?}: {reason}")]
    GuardViolation { port: PortId, reason: &'static str },

    #[error("configuration rejected: {reason}")]
    ConfigRejected { reason: String },

    #[error("resource exhausted: {reason}")]
    ResourceExhausted { reason: &'static str },
}

pub type StpResult<T> = Result<T, StpError>;

impl StpError {
    pub fn config_rejected(reason: impl Into<String>) -> Self {
        StpError::ConfigRejected {
            reason: reason.into(),
        }
    }
}
