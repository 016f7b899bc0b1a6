// ── State poller ──
//
// One tick per timer firing: read every port's transition, render it into
// the channel set, classify faults, keep the error budget, and decide the
// polling cadence. Runs entirely under the actuator's state lock.

use bisecure_api::Port;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::actuator::{Actuator, ActuatorState};
use crate::config::PollingConfig;
use crate::error::{CoreError, FaultClass};
use crate::model::{ActuatorStatus, OfflineReason};

/// Polling cadence of one actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollingMode {
    Settled,
    /// Entered on command issuance or observed motion.
    Active { since: Instant },
}

impl PollingMode {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

/// Mode after a successful poll.
///
/// Active polling ends once the timeout has passed, nothing moves, and the
/// hold-open option does not apply. Settled polling switches to active on
/// motion. A fully open door with hold-open enabled does not by itself
/// leave settled polling.
pub fn next_polling_mode(
    current: PollingMode,
    moving: bool,
    fully_open: bool,
    now: Instant,
    config: &PollingConfig,
) -> PollingMode {
    let hold_open = fully_open && config.active_polling_during_opened;
    match current {
        PollingMode::Active { since } => {
            let timed_out = now.saturating_duration_since(since) >= config.active_timeout;
            if timed_out && !moving && !hold_open {
                PollingMode::Settled
            } else {
                current
            }
        }
        PollingMode::Settled if moving => PollingMode::Active { since: now },
        PollingMode::Settled => PollingMode::Settled,
    }
}

/// What a failed port read does to the tick.
enum PortFault {
    /// Counts against the error budget.
    Counted,
    Ignored,
    /// Remaining ports would fail the same way.
    Abort,
}

impl Actuator {
    /// Poll every port once. Faults stay inside the tick.
    pub async fn poll(&self) {
        if self.is_disposed() {
            return;
        }
        let Some(link) = self.ctx.session.link() else {
            debug!(group_id = self.group_id, "link not ready, skipping poll");
            return;
        };

        let mut state = self.state.lock().await;
        if state.paused {
            debug!(group_id = self.group_id, "gateway offline, skipping poll");
            return;
        }
        let ports: Vec<Port> = match &state.channels {
            Some(channels) => channels.ports().copied().collect(),
            None => return,
        };

        let mut moving = false;
        let mut fully_open = false;
        let mut any_read = false;
        let mut indeterminate = false;
        let mut aborted = false;
        for port in ports {
            let result = link.get_transition(&port).await;
            if self.is_disposed() {
                debug!(group_id = self.group_id, "discarding poll result after dispose");
                return;
            }
            match result {
                Ok(transition) => {
                    if let Some(channels) = state.channels.as_mut() {
                        channels.render_transition(port.id, &transition);
                    }
                    any_read = true;
                    moving |= transition.is_driving;
                    fully_open |= transition.is_fully_open();
                }
                Err(e) => match self.record_fault(&mut state, port.id, &CoreError::from(e)) {
                    PortFault::Counted => indeterminate = true,
                    PortFault::Ignored => {}
                    PortFault::Abort => {
                        aborted = true;
                        break;
                    }
                },
            }
        }

        let previous = state.mode;
        if indeterminate {
            self.record_indeterminate_tick(&mut state);
        } else if any_read && !aborted {
            self.record_success(&mut state);
        }
        if !any_read || indeterminate {
            return;
        }

        let config = &self.ctx.config;
        let next = next_polling_mode(state.mode, moving, fully_open, Instant::now(), config);
        state.mode = next;
        if next != previous {
            let interval = if next.is_active() {
                config.active_interval
            } else {
                config.interval
            };
            info!(
                group_id = self.group_id,
                active = next.is_active(),
                interval_secs = interval.as_secs(),
                "polling mode changed"
            );
            self.reschedule(&state, interval);
        }
    }

    /// A tick without indeterminate reads. An actuator taken offline by its
    /// error budget comes back with settled polling.
    fn record_success(&self, state: &mut ActuatorState) {
        state.error_count = 0;
        if let ActuatorStatus::Offline { reason } = self.status() {
            match reason {
                OfflineReason::ErrorBudgetExceeded => {
                    state.mode = PollingMode::Settled;
                    self.set_status(ActuatorStatus::Online);
                }
                OfflineReason::BridgeOffline => self.set_status(ActuatorStatus::Online),
                OfflineReason::Configuration(_) => {}
            }
        }
    }

    /// One budget step per tick, however many ports were indeterminate.
    fn record_indeterminate_tick(&self, state: &mut ActuatorState) {
        state.error_count += 1;
        warn!(
            group_id = self.group_id,
            errors = state.error_count,
            "poll returned indeterminate state"
        );
        if state.error_count > self.ctx.config.error_ceiling && self.status().is_online() {
            self.set_status(ActuatorStatus::offline(OfflineReason::ErrorBudgetExceeded));
        }
    }

    fn record_fault(&self, state: &mut ActuatorState, port_id: u8, err: &CoreError) -> PortFault {
        let group_id = self.group_id;
        match err.fault_class() {
            FaultClass::LinkNotReady => {
                debug!(group_id, port = port_id, "link went away during poll");
                PortFault::Abort
            }
            FaultClass::Unauthorized => {
                let started = self.ctx.session.trigger_relogin();
                warn!(group_id, port = port_id, relogin = started, "gateway session expired");
                annotate(state, port_id, &err.to_string());
                PortFault::Abort
            }
            FaultClass::StateIndeterminate => {
                debug!(group_id, port = port_id, error = %err, "indeterminate device state");
                annotate(state, port_id, &err.to_string());
                PortFault::Counted
            }
            FaultClass::Configuration | FaultClass::Unclassified => {
                warn!(group_id, port = port_id, error = %err, "poll failed");
                annotate(state, port_id, &err.to_string());
                PortFault::Ignored
            }
        }
    }
}

fn annotate(state: &mut ActuatorState, port_id: u8, message: &str) {
    if let Some(channels) = state.channels.as_mut() {
        channels.annotate(port_id, message);
    }
}
