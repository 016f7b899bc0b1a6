//! Adaptive polling and command translation for BiSecure gateway actuators.
//!
//! This crate sits between a [`DeviceLink`](bisecure_api::DeviceLink) and
//! whatever presents the doors to a user:
//!
//! - **[`GatewayController`]**: Facade over one gateway. Validates the
//!   configuration, opens the shared session, registers one [`Actuator`]
//!   per group and broadcasts every rendered [`ChannelEvent`].
//!
//! - **[`Actuator`]**: Per-group controller. Discovers its group (retrying
//!   until the link is ready), polls at a settled or active cadence, keeps
//!   an error budget, and translates [`Command`]s into impulses.
//!
//! - **Fault taxonomy** ([`CoreError`], [`FaultClass`]): Link failures are
//!   folded into classes that decide whether a fault is ignored, counted,
//!   recovered by re-login, or fatal for the actuator.

pub mod actuator;
pub mod channels;
pub mod command;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod error;
mod init;
pub mod model;
pub mod poller;
pub mod registry;
pub mod scheduler;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use actuator::Actuator;
pub use command::{Command, CommandOutcome, SuppressReason, impulse_decision, should_impulse};
pub use config::{GatewayConfig, PollingConfig};
pub use controller::GatewayController;
pub use discovery::DiscoveredDevice;
pub use error::{CoreError, FaultClass};
pub use model::{
    ActuatorStatus, BridgeStatus, ChannelEvent, ChannelKind, ChannelUid, ChannelValue, Contact,
    OfflineReason,
};
pub use poller::{PollingMode, next_polling_mode};
