//! Channel snapshot of one or more actuators.

use std::fmt::Write as _;

use serde::Serialize;
use tabled::Tabled;

use bisecure_core::{ActuatorStatus, ChannelUid, ChannelValue, GatewayController};

use crate::cli::{GlobalOpts, StatusArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct ChannelReading {
    group_id: u32,
    group: String,
    status: ActuatorStatus,
    channel: ChannelUid,
    name: String,
    value: Option<ChannelValue>,
}

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Channel")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn row(r: &ChannelReading) -> ReadingRow {
    let mut group = r.group_id.to_string();
    if !r.group.is_empty() {
        let _ = write!(group, " ({})", r.group);
    }
    ReadingRow {
        group,
        name: r.name.clone(),
        value: r
            .value
            .as_ref()
            .map_or_else(|| "-".into(), ToString::to_string),
        status: r.status.to_string(),
    }
}

pub async fn handle(
    controller: &GatewayController,
    args: &StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let actuators = util::register(controller, &args.group).await?;
    let types = util::port_types(&actuators).await;

    let mut readings = Vec::new();
    for actuator in &actuators {
        if actuator.status().is_online() {
            // read now instead of waiting for the first timer tick
            actuator.poll().await;
        }
        let status = actuator.status();
        let group = actuator.group().await.map(|g| g.name).unwrap_or_default();
        let channels = actuator.channels().await;

        if channels.is_empty() {
            readings.push(ChannelReading {
                group_id: actuator.group_id(),
                group,
                status,
                channel: ChannelUid::position(actuator.group_id(), 0),
                name: "-".into(),
                value: None,
            });
            continue;
        }
        for channel in channels {
            readings.push(ChannelReading {
                group_id: actuator.group_id(),
                group: group.clone(),
                status: status.clone(),
                name: util::channel_name(&types, &channel),
                value: actuator.last_value(&channel).await,
                channel,
            });
        }
    }

    let out = output::render_list(global.output, &readings, row, |r| {
        format!(
            "{} {}",
            r.channel,
            r.value.as_ref().map_or_else(String::new, ToString::to_string)
        )
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
