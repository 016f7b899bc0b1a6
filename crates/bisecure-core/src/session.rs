// ── Shared gateway session ──
//
// One authenticated link per gateway, shared by every actuator behind it.
// Consumers ask for the link on each use and get `None` while the session
// is not ready. Re-login is coalesced: while one attempt is in flight,
// further triggers are no-ops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;
use bisecure_api::DeviceLink;
use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::error::CoreError;

pub struct GatewaySession {
    link: Arc<dyn DeviceLink>,
    username: String,
    password: SecretString,
    connected: AtomicBool,
    closed: AtomicBool,
    relogin_in_flight: AtomicBool,
    name: ArcSwapOption<String>,
}

impl GatewaySession {
    pub fn new(link: Arc<dyn DeviceLink>, username: String, password: SecretString) -> Self {
        Self {
            link,
            username,
            password,
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            relogin_in_flight: AtomicBool::new(false),
            name: ArcSwapOption::empty(),
        }
    }

    /// Log in with the configured credentials and read the gateway name.
    pub async fn connect(&self) -> Result<(), CoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CoreError::Disposed);
        }
        let accepted = self.link.login(&self.username, &self.password).await?;
        if !accepted {
            return Err(CoreError::AuthenticationFailed {
                message: format!("gateway refused credentials for user '{}'", self.username),
            });
        }
        self.connected.store(true, Ordering::Release);

        match self.link.name().await {
            Ok(name) => {
                info!(gateway = %name, "gateway session established");
                self.name.store(Some(Arc::new(name)));
            }
            Err(e) => debug!(error = %e, "gateway name unavailable"),
        }
        Ok(())
    }

    /// The link, once connected and until closed.
    pub fn link(&self) -> Option<Arc<dyn DeviceLink>> {
        if self.is_ready() {
            Some(Arc::clone(&self.link))
        } else {
            None
        }
    }

    pub fn is_ready(&self) -> bool {
        self.connected.load(Ordering::Acquire) && !self.closed.load(Ordering::Acquire)
    }

    /// Friendly name read from the gateway at connect time.
    pub fn gateway_name(&self) -> Option<String> {
        self.name.load_full().map(|name| name.as_ref().clone())
    }

    /// Start a background re-login unless one is already running.
    ///
    /// Returns `true` when this call started a new attempt.
    pub fn trigger_relogin(self: &Arc<Self>) -> bool {
        if !self.is_ready() {
            return false;
        }
        if self
            .relogin_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("re-login already in flight");
            return false;
        }

        let session = Arc::clone(self);
        tokio::spawn(async move {
            match session.link.relogin().await {
                Ok(true) => info!("gateway session re-established"),
                Ok(false) => warn!("gateway refused re-login"),
                Err(e) => warn!(error = %e, "re-login failed"),
            }
            session.relogin_in_flight.store(false, Ordering::Release);
        });
        true
    }

    pub fn relogin_in_flight(&self) -> bool {
        self.relogin_in_flight.load(Ordering::Acquire)
    }

    /// Log out and release the link. Failures are logged and ignored.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.connected.swap(false, Ordering::AcqRel) {
            if let Err(e) = self.link.logout().await {
                debug!(error = %e, "logout failed");
            }
        }
        if let Err(e) = self.link.close().await {
            debug!(error = %e, "closing link failed");
        }
        info!("gateway session closed");
    }
}
