// ── Core error types ──
//
// User-facing errors from bisecure-core. Consumers never see raw link
// errors: the `From<bisecure_api::Error>` impl folds them into the
// controller's fault taxonomy, and `fault_class()` tells the poller how
// each one is handled.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Link errors ──────────────────────────────────────────────────
    #[error("Device link not ready")]
    LinkNotReady,

    #[error("Gateway session expired -- re-login triggered")]
    Unauthorized,

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Device errors ────────────────────────────────────────────────
    #[error("Device state indeterminate: {message}")]
    StateIndeterminate { message: String },

    #[error("Unexpected device fault: {message}")]
    Unclassified { message: String },

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Group {group_id} not found on gateway")]
    GroupNotFound { group_id: u32 },

    #[error("No actuator registered for group {group_id}")]
    ActuatorNotFound { group_id: u32 },

    #[error("Channel not found: {channel}")]
    ChannelNotFound { channel: String },

    #[error("Gateway reported no groups yet")]
    DiscoveryEmpty,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Controller disposed")]
    Disposed,
}

/// How a fault is treated by the poller and the initialization loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// Precondition not met: work is deferred, nothing is counted.
    LinkNotReady,
    /// Session expired: recovered by re-login, never an actuator fault.
    Unauthorized,
    /// Device answered abnormally: counted against the error budget.
    StateIndeterminate,
    /// Fatal for the actuator, surfaced once, never retried.
    Configuration,
    /// Anything else: annotated, never counted.
    Unclassified,
}

impl CoreError {
    pub fn fault_class(&self) -> FaultClass {
        match self {
            Self::LinkNotReady | Self::DiscoveryEmpty => FaultClass::LinkNotReady,
            Self::Unauthorized => FaultClass::Unauthorized,
            Self::StateIndeterminate { .. } => FaultClass::StateIndeterminate,
            Self::Configuration { .. }
            | Self::GroupNotFound { .. }
            | Self::ActuatorNotFound { .. }
            | Self::ChannelNotFound { .. } => FaultClass::Configuration,
            Self::AuthenticationFailed { .. } | Self::Unclassified { .. } | Self::Disposed => {
                FaultClass::Unclassified
            }
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.fault_class() == FaultClass::Configuration
    }
}

// ── Conversion from link-layer errors ────────────────────────────────

impl From<bisecure_api::Error> for CoreError {
    fn from(err: bisecure_api::Error) -> Self {
        match err {
            bisecure_api::Error::Unauthorized => CoreError::Unauthorized,
            bisecure_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            bisecure_api::Error::NotConnected => CoreError::LinkNotReady,
            bisecure_api::Error::StateIndeterminate { message } => {
                CoreError::StateIndeterminate { message }
            }
            // A malformed answer still means the gateway responded.
            bisecure_api::Error::Protocol { message } => CoreError::StateIndeterminate {
                message: format!("malformed answer: {message}"),
            },
            bisecure_api::Error::Timeout { timeout_ms } => CoreError::Unclassified {
                message: format!("no answer within {timeout_ms}ms"),
            },
            bisecure_api::Error::Io(e) => CoreError::Unclassified {
                message: e.to_string(),
            },
        }
    }
}
