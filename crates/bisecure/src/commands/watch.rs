//! Live channel updates.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use bisecure_api::PortType;
use bisecure_core::{ChannelEvent, GatewayController};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(
    controller: &GatewayController,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let events = controller.events();
    let actuators = util::register(controller, &args.group).await?;
    let types = util::port_types(&actuators).await;

    stream(events, &types, global, args.duration.map(Duration::from_secs)).await
}

/// Print channel events until `limit` elapses, Ctrl-C is pressed or the
/// controller goes away.
pub(crate) async fn stream(
    mut events: broadcast::Receiver<ChannelEvent>,
    types: &HashMap<(u32, u8), PortType>,
    global: &GlobalOpts,
    limit: Option<Duration>,
) -> Result<(), CliError> {
    let deadline = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break,
            () = &mut deadline => break,
            event = events.recv() => match event {
                Ok(event) => {
                    let line = format_event(&event, types, global.output)?;
                    output::print_output(&line, global.quiet);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream lagged, some updates were dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}

fn format_event(
    event: &ChannelEvent,
    types: &HashMap<(u32, u8), PortType>,
    format: OutputFormat,
) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Table => {
            let uid = event.channel.to_string();
            let name = util::channel_name(types, &event.channel);
            format!("{}  {uid:<14} {name:<18} {}", event.at.format("%H:%M:%S"), event.value)
        }
        // one document per line keeps the stream parseable
        OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(event)?,
        OutputFormat::Plain => format!("{} {}", event.channel, event.value),
    })
}
