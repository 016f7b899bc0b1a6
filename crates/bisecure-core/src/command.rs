// ── Command translation ──
//
// The gateway only knows one actuation primitive: an impulse that starts a
// stationary door and stops a moving one. High-level commands are mapped
// onto at most one impulse, decided against a fresh transition snapshot.

use bisecure_api::{Transition, TravelDirection};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::actuator::Actuator;
use crate::error::{CoreError, FaultClass};
use crate::model::ChannelUid;
use crate::poller::PollingMode;

/// High-level command addressed to an actuator channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Command {
    Open,
    Close,
    Stop,
    Move,
    /// Poll now. Never actuates.
    Refresh,
}

/// Why no impulse was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SuppressReason {
    Refresh,
    NotOnline,
    AlreadyOpen,
    AlreadyClosed,
    /// Already travelling in the requested direction.
    SameDirection,
    AlreadyDriving,
    NotDriving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum CommandOutcome {
    Emitted,
    Suppressed(SuppressReason),
}

/// Decide whether `command` translates into an impulse given `transition`.
pub fn impulse_decision(command: Command, transition: &Transition) -> CommandOutcome {
    use CommandOutcome::{Emitted, Suppressed};

    if let Some(direction) = transition.direction() {
        // An impulse stops the door; only worth it when heading the wrong way.
        return match (command, direction) {
            (Command::Stop, _) => Emitted,
            (Command::Refresh, _) => Suppressed(SuppressReason::Refresh),
            (Command::Move, _) => Suppressed(SuppressReason::AlreadyDriving),
            (Command::Close, TravelDirection::Open) | (Command::Open, TravelDirection::Close) => Emitted,
            (Command::Close | Command::Open, _) => Suppressed(SuppressReason::SameDirection),
        };
    }

    match command {
        Command::Open if transition.is_fully_open() => Suppressed(SuppressReason::AlreadyOpen),
        Command::Close if transition.is_fully_closed() => Suppressed(SuppressReason::AlreadyClosed),
        Command::Open | Command::Close | Command::Move => Emitted,
        Command::Stop => Suppressed(SuppressReason::NotDriving),
        Command::Refresh => Suppressed(SuppressReason::Refresh),
    }
}

pub fn should_impulse(command: Command, transition: &Transition) -> bool {
    impulse_decision(command, transition) == CommandOutcome::Emitted
}

impl Actuator {
    /// Translate `command` for the position channel of `port_id`.
    pub async fn handle_command(&self, port_id: u8, command: Command) -> Result<CommandOutcome, CoreError> {
        let group_id = self.group_id;
        if self.is_disposed() {
            return Err(CoreError::Disposed);
        }
        if command == Command::Refresh {
            self.poll().await;
            return Ok(CommandOutcome::Suppressed(SuppressReason::Refresh));
        }
        if !self.status().is_online() {
            debug!(group_id, %command, status = %self.status(), "ignoring command while not online");
            return Ok(CommandOutcome::Suppressed(SuppressReason::NotOnline));
        }

        let link = self.ctx.session.link().ok_or(CoreError::LinkNotReady)?;
        let mut state = self.state.lock().await;
        if state.paused {
            debug!(group_id, %command, "ignoring command while gateway is offline");
            return Ok(CommandOutcome::Suppressed(SuppressReason::NotOnline));
        }
        let port = state
            .channels
            .as_ref()
            .and_then(|c| c.port(port_id))
            .copied()
            .ok_or_else(|| CoreError::ChannelNotFound {
                channel: ChannelUid::position(group_id, port_id).to_string(),
            })?;

        let transition = link
            .get_transition(&port)
            .await
            .map_err(|e| self.link_fault(e))?;
        if self.is_disposed() {
            return Err(CoreError::Disposed);
        }

        match impulse_decision(command, &transition) {
            CommandOutcome::Emitted => {
                link.set_state(&port).await.map_err(|e| self.link_fault(e))?;
                state.mode = PollingMode::Active {
                    since: Instant::now(),
                };
                self.reschedule(&state, self.ctx.config.active_interval);
                drop(state);
                info!(group_id, port = port_id, %command, "impulse sent");
                Ok(CommandOutcome::Emitted)
            }
            CommandOutcome::Suppressed(reason) => {
                debug!(group_id, port = port_id, %command, %reason, "command suppressed");
                Ok(CommandOutcome::Suppressed(reason))
            }
        }
    }

    fn link_fault(&self, err: bisecure_api::Error) -> CoreError {
        let err = CoreError::from(err);
        if err.fault_class() == FaultClass::Unauthorized {
            self.ctx.session.trigger_relogin();
        }
        err
    }
}
