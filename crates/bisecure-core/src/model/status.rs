// ── Gateway and actuator status ──

use std::fmt;

use serde::Serialize;

/// Why an actuator is offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum OfflineReason {
    /// Too many consecutive indeterminate polls.
    ErrorBudgetExceeded,
    /// The group cannot be served with this configuration. Never retried.
    Configuration(String),
    /// The gateway itself is not online.
    BridgeOffline,
}

/// Status of one actuator (one group behind the gateway).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActuatorStatus {
    Initializing,
    Online,
    Offline { reason: OfflineReason },
}

impl ActuatorStatus {
    pub fn offline(reason: OfflineReason) -> Self {
        Self::Offline { reason }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for ActuatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => f.write_str("initializing"),
            Self::Online => f.write_str("online"),
            Self::Offline { reason } => match reason {
                OfflineReason::ErrorBudgetExceeded => f.write_str("offline (error budget exceeded)"),
                OfflineReason::Configuration(msg) => write!(f, "offline (configuration: {msg})"),
                OfflineReason::BridgeOffline => f.write_str("offline (gateway offline)"),
            },
        }
    }
}

/// Status of the gateway session as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum BridgeStatus {
    Initializing,
    Online,
    ConfigurationError(String),
    CommunicationError(String),
    Disposed,
}

impl BridgeStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => f.write_str("initializing"),
            Self::Online => f.write_str("online"),
            Self::ConfigurationError(msg) => write!(f, "configuration error: {msg}"),
            Self::CommunicationError(msg) => write!(f, "communication error: {msg}"),
            Self::Disposed => f.write_str("disposed"),
        }
    }
}
