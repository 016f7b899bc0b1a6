use thiserror::Error;

/// Top-level error type for the `bisecure-api` crate.
///
/// Covers every failure a device link can report. `bisecure-core` folds
/// these into its fault taxonomy; callers of the link never see raw
/// socket or framing errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Session ─────────────────────────────────────────────────────
    /// The gateway rejected the request because the session token expired.
    #[error("Unauthorized -- gateway session expired")]
    Unauthorized,

    /// Login was refused (wrong credentials, user locked, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// No session has been established on this link yet, or it was closed.
    #[error("Link not connected")]
    NotConnected,

    // ── Device ──────────────────────────────────────────────────────
    /// The gateway answered, but the reported state cannot be trusted
    /// (error frame, out-of-range position, radio timeout at the door).
    #[error("State indeterminate: {message}")]
    StateIndeterminate { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// No answer within the configured read timeout.
    #[error("Read timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Malformed frame or unexpected command in the answer.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Socket-level failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if the session expired and a re-login should fix it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Returns `true` if the device responded but its state is untrustworthy.
    pub fn is_state_indeterminate(&self) -> bool {
        matches!(self, Self::StateIndeterminate { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::NotConnected => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}
