//! Device-link surface for BiSecure gateways.
//!
//! This crate describes what the controller consumes from a gateway and
//! nothing more:
//!
//! - **[`DeviceLink`]**: the async capability set of one authenticated
//!   session (`login`, `relogin`, `list_groups`, `get_transition`,
//!   `set_state`, ...). Vendor SDK bindings implement it.
//!
//! - **Wire model** ([`model`]): [`Group`], [`Port`], [`PortType`] and the
//!   [`Transition`] snapshot with its position and motion flags.
//!
//! - **[`Error`]**: everything a link can report, with helpers
//!   (`is_auth_expired`, `is_state_indeterminate`, `is_transient`) the
//!   controller uses to classify faults.
//!
//! - **[`SimulatedGateway`]**: an in-memory link whose doors travel on the
//!   tokio clock. Used by tests and by the `bisecure` demo binary.

pub mod error;
pub mod link;
pub mod model;
pub mod sim;

pub use error::Error;
pub use link::DeviceLink;
pub use model::{Group, HcpState, Port, PortType, Transition, TravelDirection};
pub use sim::{SimFault, SimulatedGateway, SimulatedGatewayBuilder};
