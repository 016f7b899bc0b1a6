// ── Controller domain model ──
//
// Types the controller exposes to its consumers: the channels rendered for
// each port and the status of the gateway and its actuators. Wire types
// (`Group`, `Port`, `Transition`) stay in `bisecure-api`.

pub mod channel;
pub mod status;

pub use channel::{ChannelEvent, ChannelKind, ChannelUid, ChannelValue, Contact};
pub use status::{ActuatorStatus, BridgeStatus, OfflineReason};
