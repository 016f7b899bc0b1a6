// ── Gateway controller ──
//
// Facade over one gateway: owns the shared session, the actuator registry,
// the polling scheduler and one actuator controller per configured group.
// Consumers drive it through the lifecycle hooks and observe it through
// the channel event broadcast and the status watches.

use std::sync::Arc;

use bisecure_api::DeviceLink;
use dashmap::DashMap;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::actuator::{Actuator, ActuatorContext};
use crate::command::{Command, CommandOutcome};
use crate::config::{GatewayConfig, PollingConfig};
use crate::error::CoreError;
use crate::model::{BridgeStatus, ChannelEvent, ChannelKind, ChannelUid};
use crate::registry::ActuatorRegistry;
use crate::scheduler::PollingScheduler;
use crate::session::GatewaySession;

const EVENT_CHANNEL_SIZE: usize = 256;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`.
#[derive(Clone)]
pub struct GatewayController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: GatewayConfig,
    polling: Arc<PollingConfig>,
    session: Arc<GatewaySession>,
    registry: Arc<ActuatorRegistry>,
    scheduler: Arc<PollingScheduler>,
    actuators: DashMap<u32, Arc<Actuator>>,
    events: broadcast::Sender<ChannelEvent>,
    bridge_status: watch::Sender<BridgeStatus>,
    cancel: CancellationToken,
}

impl GatewayController {
    /// Create a controller over `link`. Does NOT connect -- call
    /// [`initialize()`](Self::initialize) to log in.
    pub fn new(config: GatewayConfig, link: Arc<dyn DeviceLink>) -> Self {
        let cancel = CancellationToken::new();
        let session = Arc::new(GatewaySession::new(
            link,
            config.username.clone(),
            config.password.clone(),
        ));
        let registry = Arc::new(ActuatorRegistry::new(Arc::clone(&session)));
        let scheduler = Arc::new(PollingScheduler::new(&cancel));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (bridge_status, _) = watch::channel(BridgeStatus::Initializing);

        Self {
            inner: Arc::new(ControllerInner {
                polling: Arc::new(config.polling.clone()),
                config,
                session,
                registry,
                scheduler,
                actuators: DashMap::new(),
                events,
                bridge_status,
                cancel,
            }),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Validate the configuration and open the gateway session.
    pub async fn initialize(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Disposed);
        }
        if let Err(e) = self.inner.config.validate() {
            warn!(error = %e, "invalid gateway configuration");
            self.set_bridge_status(BridgeStatus::ConfigurationError(e.to_string()))
                .await;
            return Err(e);
        }

        self.set_bridge_status(BridgeStatus::Initializing).await;
        match self.inner.session.connect().await {
            Ok(()) => {
                self.set_bridge_status(BridgeStatus::Online).await;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "gateway connection failed");
                self.set_bridge_status(BridgeStatus::CommunicationError(e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    /// Register and initialize the actuator for `group_id`. Returns the
    /// existing one when already registered.
    pub async fn add_actuator(&self, group_id: u32) -> Result<Arc<Actuator>, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Disposed);
        }
        if let Some(existing) = self.actuator(group_id) {
            return Ok(existing);
        }

        let ctx = ActuatorContext {
            config: Arc::clone(&self.inner.polling),
            session: Arc::clone(&self.inner.session),
            registry: Arc::clone(&self.inner.registry),
            scheduler: Arc::clone(&self.inner.scheduler),
            events: self.inner.events.clone(),
        };
        let actuator = Actuator::new(group_id, ctx, &self.inner.cancel);
        self.inner.actuators.insert(group_id, Arc::clone(&actuator));
        debug!(group_id, "actuator registered");

        actuator.initialize().await;
        Ok(actuator)
    }

    /// Dispose and forget the actuator for `group_id`.
    pub fn remove_actuator(&self, group_id: u32) -> bool {
        match self.inner.actuators.remove(&group_id) {
            Some((_, actuator)) => {
                actuator.dispose();
                true
            }
            None => false,
        }
    }

    /// Route a command to the actuator owning `channel`.
    ///
    /// Only position channels accept actuation; `Refresh` works on any
    /// channel of the actuator.
    pub async fn handle_command(
        &self,
        channel: &ChannelUid,
        command: Command,
    ) -> Result<CommandOutcome, CoreError> {
        let actuator = self
            .actuator(channel.group_id)
            .ok_or(CoreError::ActuatorNotFound {
                group_id: channel.group_id,
            })?;
        if channel.kind != ChannelKind::Position && command != Command::Refresh {
            return Err(CoreError::ChannelNotFound {
                channel: channel.to_string(),
            });
        }
        actuator.handle_command(channel.port_id, command).await
    }

    /// Stop every timer and retry loop, then close the session.
    pub async fn dispose(&self) {
        if self.inner.cancel.is_cancelled() {
            return;
        }
        self.inner.cancel.cancel();
        self.inner.scheduler.shutdown();

        let actuators: Vec<Arc<Actuator>> = self
            .inner
            .actuators
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();
        for actuator in actuators {
            actuator.dispose();
        }
        self.inner.actuators.clear();

        self.inner.session.close().await;
        let _ = self.inner.bridge_status.send(BridgeStatus::Disposed);
        info!("gateway controller disposed");
    }

    // ── Observers ────────────────────────────────────────────────────

    /// Subscribe to channel updates of every actuator.
    pub fn events(&self) -> broadcast::Receiver<ChannelEvent> {
        self.inner.events.subscribe()
    }

    pub fn bridge_status(&self) -> watch::Receiver<BridgeStatus> {
        self.inner.bridge_status.subscribe()
    }

    pub fn actuator(&self, group_id: u32) -> Option<Arc<Actuator>> {
        self.inner
            .actuators
            .get(&group_id)
            .map(|e| Arc::clone(e.value()))
    }

    /// Registered actuators ordered by group id.
    pub fn actuators(&self) -> Vec<Arc<Actuator>> {
        let mut all: Vec<_> = self
            .inner
            .actuators
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();
        all.sort_by_key(|a| a.group_id());
        all
    }

    pub fn gateway_name(&self) -> Option<String> {
        self.inner.session.gateway_name()
    }

    pub(crate) fn session(&self) -> &Arc<GatewaySession> {
        &self.inner.session
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Publish a bridge status and forward it to every actuator.
    async fn set_bridge_status(&self, status: BridgeStatus) {
        let changed = self.inner.bridge_status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            info!(from = %current, to = %status, "gateway status changed");
            *current = status.clone();
            true
        });
        if !changed {
            return;
        }

        for actuator in self.actuators() {
            actuator.bridge_status_changed(&status).await;
        }
    }
}
