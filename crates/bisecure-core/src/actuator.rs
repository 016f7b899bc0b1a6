// ── Actuator controller ──
//
// One per configured group. Owns the channel set, the polling mode and the
// error budget; everything that touches them runs under the per-actuator
// state lock, so ticks and commands for the same actuator never interleave.
// Polling lives in `poller.rs`, command translation in `command.rs`, and
// the initialization retry loop in `init.rs`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use bisecure_api::Group;
use tokio::sync::{Mutex, broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channels::ChannelSet;
use crate::config::PollingConfig;
use crate::error::CoreError;
use crate::model::{ActuatorStatus, BridgeStatus, ChannelEvent, ChannelUid, ChannelValue, OfflineReason};
use crate::poller::PollingMode;
use crate::registry::ActuatorRegistry;
use crate::scheduler::{PollTarget, PollingScheduler};
use crate::session::GatewaySession;

/// Shared collaborators handed to every actuator of a gateway.
#[derive(Clone)]
pub(crate) struct ActuatorContext {
    pub config: Arc<PollingConfig>,
    pub session: Arc<GatewaySession>,
    pub registry: Arc<ActuatorRegistry>,
    pub scheduler: Arc<PollingScheduler>,
    pub events: broadcast::Sender<ChannelEvent>,
}

/// State guarded by the per-actuator lock.
pub(crate) struct ActuatorState {
    pub group: Option<Group>,
    pub channels: Option<ChannelSet>,
    pub mode: PollingMode,
    pub error_count: u32,
    /// Set while the gateway is offline; ticks and commands back off.
    pub paused: bool,
}

pub struct Actuator {
    pub(crate) group_id: u32,
    pub(crate) ctx: ActuatorContext,
    pub(crate) state: Mutex<ActuatorState>,
    status: watch::Sender<ActuatorStatus>,
    init_attempts: AtomicU32,
    pub(crate) lifetime: CancellationToken,
    pub(crate) self_ref: Weak<Actuator>,
}

impl Actuator {
    pub(crate) fn new(group_id: u32, ctx: ActuatorContext, parent: &CancellationToken) -> Arc<Self> {
        let (status, _) = watch::channel(ActuatorStatus::Initializing);
        let lifetime = parent.child_token();
        Arc::new_cyclic(|self_ref| Self {
            group_id,
            ctx,
            state: Mutex::new(ActuatorState {
                group: None,
                channels: None,
                mode: PollingMode::Settled,
                error_count: 0,
                paused: false,
            }),
            status,
            init_attempts: AtomicU32::new(0),
            lifetime,
            self_ref: self_ref.clone(),
        })
    }

    pub fn group_id(&self) -> u32 {
        self.group_id
    }

    // ── Lifecycle hooks ──────────────────────────────────────────────

    /// Try to come online once; on a recoverable failure hand over to the
    /// retry loop. Configuration failures take the actuator offline for good.
    pub async fn initialize(&self) {
        self.set_status(ActuatorStatus::Initializing);
        match self.try_initialize().await {
            Ok(()) => {}
            Err(e) if e.is_configuration() => self.fail_configuration(&e),
            Err(CoreError::Disposed) => {}
            Err(e) => {
                debug!(group_id = self.group_id, error = %e, "initialization deferred");
                self.spawn_init_retry();
            }
        }
    }

    /// One discovery + channel creation attempt.
    pub(crate) async fn try_initialize(&self) -> Result<(), CoreError> {
        if self.is_disposed() {
            return Err(CoreError::Disposed);
        }
        self.init_attempts.fetch_add(1, Ordering::Relaxed);

        let group = self.ctx.registry.resolve_group(self.group_id).await?;
        if self.is_disposed() {
            return Err(CoreError::Disposed);
        }
        let channels = ChannelSet::new(&group, &self.ctx.config, self.ctx.events.clone());
        {
            let mut state = self.state.lock().await;
            state.channels = Some(channels);
            state.mode = PollingMode::Settled;
            state.error_count = 0;
            info!(
                group_id = self.group_id,
                name = %group.name,
                ports = group.ports.len(),
                "actuator initialized"
            );
            state.group = Some(group);
        }

        self.set_status(ActuatorStatus::Online);
        self.start_polling(self.ctx.config.interval);
        Ok(())
    }

    pub(crate) fn fail_configuration(&self, err: &CoreError) {
        warn!(group_id = self.group_id, error = %err, "actuator configuration error");
        self.set_status(ActuatorStatus::offline(OfflineReason::Configuration(err.to_string())));
    }

    /// React to the gateway going online or offline.
    ///
    /// Runs under the state lock, so a tick or command in flight finishes
    /// before polling is paused or resumed.
    pub async fn bridge_status_changed(&self, bridge: &BridgeStatus) {
        if self.is_disposed() {
            return;
        }
        let mut state = self.state.lock().await;
        let current = self.status();
        if bridge.is_online() {
            if state.paused {
                state.paused = false;
                state.mode = PollingMode::Settled;
                self.start_polling(self.ctx.config.interval);
                debug!(group_id = self.group_id, "gateway back, polling resumed");
            }
            return;
        }

        match current {
            ActuatorStatus::Online
            | ActuatorStatus::Offline {
                reason: OfflineReason::ErrorBudgetExceeded | OfflineReason::BridgeOffline,
            } => {
                state.paused = true;
                self.ctx.scheduler.stop(self.group_id);
                self.set_status(ActuatorStatus::offline(OfflineReason::BridgeOffline));
            }
            _ => {}
        }
    }

    /// Cancel polling and the retry loop. Results of calls still in flight
    /// are discarded.
    pub fn dispose(&self) {
        if self.lifetime.is_cancelled() {
            return;
        }
        self.lifetime.cancel();
        self.ctx.scheduler.stop(self.group_id);
        info!(group_id = self.group_id, "actuator disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.lifetime.is_cancelled()
    }

    // ── Observers ────────────────────────────────────────────────────

    pub fn status(&self) -> ActuatorStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ActuatorStatus> {
        self.status.subscribe()
    }

    pub async fn polling_mode(&self) -> PollingMode {
        self.state.lock().await.mode
    }

    /// Current timer interval, `None` while not polling.
    pub fn polling_interval(&self) -> Option<Duration> {
        self.ctx.scheduler.interval(self.group_id)
    }

    pub async fn error_count(&self) -> u32 {
        self.state.lock().await.error_count
    }

    /// Number of initialization attempts made so far.
    pub fn init_attempts(&self) -> u32 {
        self.init_attempts.load(Ordering::Relaxed)
    }

    pub async fn group(&self) -> Option<Group> {
        self.state.lock().await.group.clone()
    }

    pub async fn channels(&self) -> Vec<ChannelUid> {
        self.state
            .lock()
            .await
            .channels
            .as_ref()
            .map(ChannelSet::channels)
            .unwrap_or_default()
    }

    pub async fn last_value(&self, channel: &ChannelUid) -> Option<ChannelValue> {
        self.state.lock().await.channels.as_ref()?.last_value(channel)
    }

    // ── Internals ────────────────────────────────────────────────────

    pub(crate) fn set_status(&self, status: ActuatorStatus) {
        let group_id = self.group_id;
        self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            info!(group_id, from = %current, to = %status, "actuator status changed");
            *current = status;
            true
        });
    }

    pub(crate) fn start_polling(&self, interval: Duration) {
        if self.is_disposed() {
            return;
        }
        let target: Weak<dyn PollTarget> = self.self_ref.clone();
        self.ctx.scheduler.start(self.group_id, interval, target);
    }

    /// Change the cadence of a running timer, or start one. Never starts
    /// polling while the gateway is offline.
    pub(crate) fn reschedule(&self, state: &ActuatorState, interval: Duration) {
        if self.is_disposed() || state.paused {
            return;
        }
        if !self.ctx.scheduler.reschedule(self.group_id, interval) {
            self.start_polling(interval);
        }
    }
}

#[async_trait]
impl PollTarget for Actuator {
    async fn tick(&self) {
        self.poll().await;
    }
}
