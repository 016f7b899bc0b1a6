// ── Channel domain types ──

use std::fmt;

use bisecure_api::{PortType, Transition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What a channel renders for its port.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChannelKind {
    /// Percent open, 100 = fully open.
    Position,
    /// Open/closed reading from the end-position sensors.
    Contact,
    /// Last fault annotation, empty while healthy.
    Error,
}

/// Identity of one channel: a port of a group plus the rendered aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelUid {
    pub group_id: u32,
    pub port_id: u8,
    pub kind: ChannelKind,
}

impl ChannelUid {
    pub fn new(group_id: u32, port_id: u8, kind: ChannelKind) -> Self {
        Self {
            group_id,
            port_id,
            kind,
        }
    }

    pub fn position(group_id: u32, port_id: u8) -> Self {
        Self::new(group_id, port_id, ChannelKind::Position)
    }

    /// Channel name as shown to users, derived from the port type tag:
    /// `IMPULSE`, `IMPULSE-contact`, `IMPULSE-error`.
    pub fn name(&self, port_type: PortType) -> String {
        match self.kind {
            ChannelKind::Position => port_type.to_string(),
            kind => format!("{port_type}-{kind}"),
        }
    }
}

impl fmt::Display for ChannelUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.port_id, self.kind)
    }
}

/// Reading of the end-position sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Contact {
    Open,
    Closed,
    Undetermined,
}

impl Contact {
    pub fn from_transition(transition: &Transition) -> Self {
        if transition.hcp.position_open {
            Self::Open
        } else if transition.hcp.position_close {
            Self::Closed
        } else {
            Self::Undetermined
        }
    }
}

/// A rendered channel value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ChannelValue {
    PercentOpen(u8),
    Contact(Contact),
    Annotation(String),
}

impl fmt::Display for ChannelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PercentOpen(p) => write!(f, "{p}% open"),
            Self::Contact(c) => write!(f, "{c}"),
            Self::Annotation(a) if a.is_empty() => f.write_str("ok"),
            Self::Annotation(a) => f.write_str(a),
        }
    }
}

/// One published channel update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEvent {
    pub channel: ChannelUid,
    pub value: ChannelValue,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use bisecure_api::TravelDirection;

    use super::*;

    #[test]
    fn channel_names_follow_port_type() {
        let position = ChannelUid::position(0, 1);
        assert_eq!(position.name(PortType::Impulse), "IMPULSE");

        let error = ChannelUid::new(0, 1, ChannelKind::Error);
        assert_eq!(error.name(PortType::Impulse), "IMPULSE-error");

        let contact = ChannelUid::new(0, 1, ChannelKind::Contact);
        assert_eq!(contact.name(PortType::AutoClose), "AUTO_CLOSE-contact");
    }

    #[test]
    fn uid_display_is_group_port_kind() {
        assert_eq!(ChannelUid::position(3, 2).to_string(), "3:2:position");
    }

    #[test]
    fn contact_prefers_open_sensor() {
        assert_eq!(Contact::from_transition(&Transition::settled(0)), Contact::Open);
        assert_eq!(Contact::from_transition(&Transition::settled(100)), Contact::Closed);
        assert_eq!(
            Contact::from_transition(&Transition::driving(40, TravelDirection::Open)),
            Contact::Undetermined
        );
    }
}
