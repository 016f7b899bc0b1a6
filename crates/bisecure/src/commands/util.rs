//! Shared helpers for command handlers.

use std::collections::HashMap;
use std::sync::Arc;

use bisecure_api::{Group, PortType};
use bisecure_core::{Actuator, ChannelUid, CoreError, GatewayController};

use crate::error::CliError;

/// Register actuators for `groups`, or for every discovered group when the
/// list is empty.
pub async fn register(
    controller: &GatewayController,
    groups: &[u32],
) -> Result<Vec<Arc<Actuator>>, CliError> {
    let ids: Vec<u32> = if groups.is_empty() {
        let devices = controller.discover_devices().await?;
        if devices.is_empty() {
            return Err(CoreError::DiscoveryEmpty.into());
        }
        devices.into_iter().map(|d| d.group_id).collect()
    } else {
        groups.to_vec()
    };

    let mut actuators = Vec::with_capacity(ids.len());
    for id in ids {
        actuators.push(controller.add_actuator(id).await?);
    }
    Ok(actuators)
}

/// Port types of every port served by `actuators`, keyed by group and port.
pub async fn port_types(actuators: &[Arc<Actuator>]) -> HashMap<(u32, u8), PortType> {
    let mut types = HashMap::new();
    for actuator in actuators {
        if let Some(group) = actuator.group().await {
            for port in &group.ports {
                types.insert((group.id, port.id), port.port_type);
            }
        }
    }
    types
}

/// Display name of `channel`, falling back to its uid when the port is
/// unknown.
pub fn channel_name(types: &HashMap<(u32, u8), PortType>, channel: &ChannelUid) -> String {
    types
        .get(&(channel.group_id, channel.port_id))
        .map_or_else(|| channel.to_string(), |t| channel.name(*t))
}

/// First port of `group` that accepts impulses.
pub fn default_port(group: &Group) -> Option<u8> {
    group
        .ports
        .iter()
        .find(|p| p.port_type == PortType::Impulse)
        .or_else(|| group.ports.first())
        .map(|p| p.id)
}
