//! Door commands.

use std::time::Duration;

use serde::Serialize;

use bisecure_core::{ChannelUid, Command, CommandOutcome, GatewayController};

use crate::cli::{DoorCommand, GlobalOpts, SendArgs};
use crate::error::CliError;
use crate::output;

use super::{util, watch};

impl From<DoorCommand> for Command {
    fn from(cmd: DoorCommand) -> Self {
        match cmd {
            DoorCommand::Open => Self::Open,
            DoorCommand::Close => Self::Close,
            DoorCommand::Stop => Self::Stop,
            DoorCommand::Move => Self::Move,
            DoorCommand::Refresh => Self::Refresh,
        }
    }
}

#[derive(Debug, Serialize)]
struct SendReport {
    channel: ChannelUid,
    command: Command,
    outcome: CommandOutcome,
}

fn detail(report: &SendReport) -> String {
    match report.outcome {
        CommandOutcome::Emitted => format!("{}: {} -> impulse sent", report.channel, report.command),
        CommandOutcome::Suppressed(reason) => {
            format!("{}: {} -> suppressed ({reason})", report.channel, report.command)
        }
    }
}

pub async fn handle(
    controller: &GatewayController,
    args: &SendArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let events = controller.events();
    let actuators = util::register(controller, &[args.group]).await?;
    let Some(actuator) = actuators.first() else {
        return Err(CliError::NotFound {
            resource_type: "group".into(),
            identifier: args.group.to_string(),
            list_command: "groups".into(),
        });
    };

    let status = actuator.status();
    if !status.is_online() {
        return Err(CliError::ActuatorUnavailable {
            group_id: args.group,
            status: status.to_string(),
        });
    }

    let port = match args.port {
        Some(port) => port,
        None => actuator
            .group()
            .await
            .as_ref()
            .and_then(util::default_port)
            .ok_or_else(|| CliError::NotFound {
                resource_type: "port".into(),
                identifier: format!("group {}", args.group),
                list_command: "status".into(),
            })?,
    };

    let channel = ChannelUid::position(args.group, port);
    let command = Command::from(args.command);
    let outcome = controller.handle_command(&channel, command).await?;

    let report = SendReport {
        channel,
        command,
        outcome,
    };
    let out = output::render_single(global.output, &report, detail, |r| match r.outcome {
        CommandOutcome::Emitted => "emitted".into(),
        CommandOutcome::Suppressed(reason) => reason.to_string(),
    })?;
    output::print_output(&out, global.quiet);

    if args.follow > 0 {
        let types = util::port_types(&actuators).await;
        watch::stream(events, &types, global, Some(Duration::from_secs(args.follow))).await?;
    }
    Ok(())
}
