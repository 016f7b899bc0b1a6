//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use bisecure_config::ConfigError;
use bisecure_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not bring gateway '{gateway}' online: {reason}")]
    #[diagnostic(
        code(bisecure::connection_failed),
        help("Check that the gateway is powered and reachable, then retry with -vv.")
    )]
    ConnectionFailed { gateway: String, reason: String },

    #[error("Gateway session expired")]
    #[diagnostic(
        code(bisecure::session_expired),
        help("A re-login was started. Run the command again.")
    )]
    SessionExpired,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(bisecure::auth_failed),
        help(
            "Verify the gateway user and password.\n\
             Set password_env in your profile or store the password in the keyring."
        )
    )]
    AuthFailed { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(bisecure::not_found),
        help("Run: bisecure {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Actuator for group {group_id} is {status}")]
    #[diagnostic(code(bisecure::actuator_unavailable))]
    ActuatorUnavailable { group_id: u32, status: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(bisecure::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(bisecure::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: bisecure config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(bisecure::config))]
    Config(Box<ConfigError>),

    #[error("Unexpected gateway fault: {message}")]
    #[diagnostic(code(bisecure::device_fault))]
    DeviceFault { message: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not encode output: {0}")]
    #[diagnostic(code(bisecure::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::SessionExpired => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { profile } => Self::ProfileNotFound {
                name: profile,
                available: "(none)".into(),
            },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },

            CoreError::Unauthorized => Self::SessionExpired,

            CoreError::LinkNotReady | CoreError::Disposed => Self::ConnectionFailed {
                gateway: "(current)".into(),
                reason: err.to_string(),
            },

            CoreError::GroupNotFound { group_id } | CoreError::ActuatorNotFound { group_id } => {
                Self::NotFound {
                    resource_type: "group".into(),
                    identifier: group_id.to_string(),
                    list_command: "groups".into(),
                }
            }

            CoreError::ChannelNotFound { channel } => Self::NotFound {
                resource_type: "channel".into(),
                identifier: channel,
                list_command: "status".into(),
            },

            CoreError::DiscoveryEmpty => Self::NotFound {
                resource_type: "group".into(),
                identifier: "(any)".into(),
                list_command: "groups".into(),
            },

            CoreError::Configuration { message } => Self::Validation {
                field: "gateway".into(),
                reason: message,
            },

            CoreError::StateIndeterminate { .. } | CoreError::Unclassified { .. } => {
                Self::DeviceFault {
                    message: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (CoreError::Unauthorized, exit_code::CONNECTION),
            (
                CoreError::AuthenticationFailed {
                    message: "refused".into(),
                },
                exit_code::AUTH,
            ),
            (CoreError::ActuatorNotFound { group_id: 7 }, exit_code::NOT_FOUND),
            (
                CoreError::Configuration {
                    message: "no address".into(),
                },
                exit_code::USAGE,
            ),
            (
                CoreError::Unclassified {
                    message: "boom".into(),
                },
                exit_code::GENERAL,
            ),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }

    #[test]
    fn missing_profile_is_not_found() {
        let err = CliError::from(ConfigError::ProfileNotFound {
            profile: "shed".into(),
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert_eq!(err.to_string(), "Profile 'shed' not found in configuration");
    }
}
