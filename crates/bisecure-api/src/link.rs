// ── Device link capability set ──
//
// The authenticated request/response session to one gateway. The wire
// protocol and its crypto handshake live behind this trait; the controller
// only ever talks to a `dyn DeviceLink`.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::Error;
use crate::model::{Group, Port, Transition};

/// Capability set consumed from a gateway session.
///
/// Every call may block on the network. Any call except `login` may fail
/// with [`Error::Unauthorized`] once the gateway has expired the session;
/// [`relogin`](Self::relogin) re-establishes it with the credentials from
/// the last successful `login`.
#[async_trait]
pub trait DeviceLink: Send + Sync {
    /// Authenticate. `Ok(false)` means the gateway refused the credentials.
    async fn login(&self, username: &str, password: &SecretString) -> Result<bool, Error>;

    /// End the session on the gateway side.
    async fn logout(&self) -> Result<(), Error>;

    /// Release the underlying socket. The link is unusable afterwards.
    async fn close(&self) -> Result<(), Error>;

    /// Re-establish the session with the stored credentials.
    async fn relogin(&self) -> Result<bool, Error>;

    /// Friendly name configured on the gateway.
    async fn name(&self) -> Result<String, Error>;

    /// All groups in the gateway's order.
    async fn list_groups(&self) -> Result<Vec<Group>, Error>;

    /// Current transition snapshot for `port`.
    async fn get_transition(&self, port: &Port) -> Result<Transition, Error>;

    /// Send one impulse to `port`. The effect depends on the door's motion.
    async fn set_state(&self, port: &Port) -> Result<(), Error>;
}
