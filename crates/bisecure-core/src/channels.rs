// ── Per-actuator channel set ──
//
// One entry per port of a group. Each entry remembers the last value it
// rendered for every channel kind and only publishes when the rendering
// changes. Publication goes out on the controller's broadcast channel.

use bisecure_api::{Group, Port, Transition};
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::config::PollingConfig;
use crate::model::{ChannelEvent, ChannelKind, ChannelUid, ChannelValue, Contact};

#[derive(Debug)]
struct PortChannels {
    port: Port,
    percent_open: Option<u8>,
    contact: Option<Contact>,
    annotation: Option<String>,
}

impl PortChannels {
    fn last(&self, kind: ChannelKind) -> Option<ChannelValue> {
        match kind {
            ChannelKind::Position => self.percent_open.map(ChannelValue::PercentOpen),
            ChannelKind::Contact => self.contact.map(ChannelValue::Contact),
            ChannelKind::Error => self.annotation.clone().map(ChannelValue::Annotation),
        }
    }
}

/// Rendered channel state for one group.
#[derive(Debug)]
pub struct ChannelSet {
    group_id: u32,
    ports: Vec<PortChannels>,
    error_channels: bool,
    contact_channels: bool,
    events: broadcast::Sender<ChannelEvent>,
}

impl ChannelSet {
    pub fn new(group: &Group, config: &PollingConfig, events: broadcast::Sender<ChannelEvent>) -> Self {
        Self {
            group_id: group.id,
            ports: group
                .ports
                .iter()
                .map(|port| PortChannels {
                    port: *port,
                    percent_open: None,
                    contact: None,
                    annotation: None,
                })
                .collect(),
            error_channels: config.error_channels,
            contact_channels: config.contact_channels,
            events,
        }
    }

    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().map(|p| &p.port)
    }

    pub fn port(&self, port_id: u8) -> Option<&Port> {
        self.ports().find(|p| p.id == port_id)
    }

    /// Every channel this set exposes, in port order.
    pub fn channels(&self) -> Vec<ChannelUid> {
        let mut uids = Vec::new();
        for entry in &self.ports {
            let id = entry.port.id;
            uids.push(ChannelUid::new(self.group_id, id, ChannelKind::Position));
            if self.contact_channels {
                uids.push(ChannelUid::new(self.group_id, id, ChannelKind::Contact));
            }
            if self.error_channels {
                uids.push(ChannelUid::new(self.group_id, id, ChannelKind::Error));
            }
        }
        uids
    }

    /// Last value rendered on `channel`, if any.
    pub fn last_value(&self, channel: &ChannelUid) -> Option<ChannelValue> {
        self.entry(channel.port_id)?.last(channel.kind)
    }

    /// Render a successful poll: percent open, the contact reading when
    /// enabled, and a cleared annotation.
    pub fn render_transition(&mut self, port_id: u8, transition: &Transition) {
        let percent = transition.percent_open();
        let contact = Contact::from_transition(transition);
        let contact_enabled = self.contact_channels;

        let mut updates = Vec::with_capacity(2);
        if let Some(entry) = self.entry_mut(port_id) {
            if entry.percent_open != Some(percent) {
                entry.percent_open = Some(percent);
                updates.push((ChannelKind::Position, ChannelValue::PercentOpen(percent)));
            }
            if contact_enabled && entry.contact != Some(contact) {
                entry.contact = Some(contact);
                updates.push((ChannelKind::Contact, ChannelValue::Contact(contact)));
            }
        }
        for (kind, value) in updates {
            self.publish(port_id, kind, value);
        }
        self.annotate(port_id, "");
    }

    /// Publish a fault annotation, or clear it with an empty message.
    /// No-op without error channels.
    pub fn annotate(&mut self, port_id: u8, message: &str) {
        if !self.error_channels {
            return;
        }
        let changed = match self.entry_mut(port_id) {
            Some(entry) if entry.annotation.as_deref() != Some(message) => {
                entry.annotation = Some(message.to_owned());
                true
            }
            _ => false,
        };
        if changed {
            self.publish(port_id, ChannelKind::Error, ChannelValue::Annotation(message.to_owned()));
        }
    }

    fn publish(&self, port_id: u8, kind: ChannelKind, value: ChannelValue) {
        let channel = ChannelUid::new(self.group_id, port_id, kind);
        debug!(%channel, %value, "channel update");
        let _ = self.events.send(ChannelEvent {
            channel,
            value,
            at: Utc::now(),
        });
    }

    fn entry(&self, port_id: u8) -> Option<&PortChannels> {
        self.ports.iter().find(|p| p.port.id == port_id)
    }

    fn entry_mut(&mut self, port_id: u8) -> Option<&mut PortChannels> {
        self.ports.iter_mut().find(|p| p.port.id == port_id)
    }
}
