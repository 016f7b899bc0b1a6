// ── Gateway wire model ──
//
// Value types exchanged with the gateway. A group is one physical device
// (a door, a gate) and owns the ports the gateway advertises for it.
// Transitions are point-in-time snapshots; nothing here is mutated after
// it leaves the link.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::Error;

// ── Ports ───────────────────────────────────────────────────────────

/// Function tag of a port, as advertised by the gateway.
///
/// Drives which local channel kind is created for the port.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortType {
    Impulse,
    AutoClose,
    On,
    Up,
    Down,
    Half,
    Walk,
    Light,
    Unknown,
}

impl PortType {
    /// Decode the numeric tag used on the wire.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Impulse,
            2 => Self::AutoClose,
            3 => Self::On,
            4 => Self::Up,
            5 => Self::Down,
            6 => Self::Half,
            7 => Self::Walk,
            8 => Self::Light,
            _ => Self::Unknown,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Impulse => 1,
            Self::AutoClose => 2,
            Self::On => 3,
            Self::Up => 4,
            Self::Down => 5,
            Self::Half => 6,
            Self::Walk => 7,
            Self::Light => 8,
            Self::Unknown => 0,
        }
    }
}

/// One addressable actuator/sensor channel within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    /// Unique within the owning group.
    pub id: u8,
    #[serde(rename = "type")]
    pub port_type: PortType,
}

impl Port {
    pub fn new(id: u8, port_type: PortType) -> Self {
        Self { id, port_type }
    }
}

/// A logical device exposed by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Assigned by the gateway; never created locally.
    pub id: u32,
    pub name: String,
    pub ports: Vec<Port>,
}

impl Group {
    pub fn port(&self, port_id: u8) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == port_id)
    }
}

// ── Transitions ─────────────────────────────────────────────────────

/// Travel direction of a moving door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TravelDirection {
    Open,
    Close,
}

/// End-position sensor reading reported alongside a transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HcpState {
    pub position_open: bool,
    pub position_close: bool,
    #[serde(default)]
    pub light_barrier: bool,
    #[serde(default)]
    pub error: bool,
}

/// Point-in-time state of one port.
///
/// `state_in_percent` runs from 0 (fully open) to 100 (fully closed).
/// When `is_driving` is set exactly one of the direction flags is set;
/// when not driving both are clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub state_in_percent: u8,
    #[serde(default)]
    pub desired_state_in_percent: u8,
    pub is_driving: bool,
    pub driving_to_close: bool,
    pub driving_to_open: bool,
    #[serde(default)]
    pub hcp: HcpState,
}

impl Transition {
    /// A stationary door at `state_in_percent`, with end-position sensors
    /// derived from the position.
    pub fn settled(state_in_percent: u8) -> Self {
        Self {
            state_in_percent,
            desired_state_in_percent: state_in_percent,
            is_driving: false,
            driving_to_close: false,
            driving_to_open: false,
            hcp: HcpState {
                position_open: state_in_percent == 0,
                position_close: state_in_percent == 100,
                ..HcpState::default()
            },
        }
    }

    /// A door travelling in `direction`, currently at `state_in_percent`.
    pub fn driving(state_in_percent: u8, direction: TravelDirection) -> Self {
        let desired = match direction {
            TravelDirection::Open => 0,
            TravelDirection::Close => 100,
        };
        Self {
            state_in_percent,
            desired_state_in_percent: desired,
            is_driving: true,
            driving_to_close: direction == TravelDirection::Close,
            driving_to_open: direction == TravelDirection::Open,
            hcp: HcpState::default(),
        }
    }

    /// Check the snapshot invariants. Links call this before handing a
    /// decoded transition to the controller.
    pub fn validate(self) -> Result<Self, Error> {
        if self.state_in_percent > 100 {
            return Err(Error::StateIndeterminate {
                message: format!("state {}% out of range", self.state_in_percent),
            });
        }
        if self.is_driving && self.driving_to_close == self.driving_to_open {
            return Err(Error::StateIndeterminate {
                message: "driving without a unique direction".into(),
            });
        }
        if !self.is_driving && (self.driving_to_close || self.driving_to_open) {
            return Err(Error::StateIndeterminate {
                message: "direction flag set while stationary".into(),
            });
        }
        Ok(self)
    }

    /// Percent open: 100 when fully open, 0 when fully closed.
    pub fn percent_open(&self) -> u8 {
        100u8.saturating_sub(self.state_in_percent)
    }

    pub fn direction(&self) -> Option<TravelDirection> {
        if !self.is_driving {
            None
        } else if self.driving_to_open {
            Some(TravelDirection::Open)
        } else {
            Some(TravelDirection::Close)
        }
    }

    pub fn is_fully_open(&self) -> bool {
        self.state_in_percent == 0
    }

    pub fn is_fully_closed(&self) -> bool {
        self.state_in_percent == 100
    }
}
