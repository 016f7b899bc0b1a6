//! Command dispatch: bridges CLI args -> gateway controller -> output formatting.

pub mod config_cmd;
pub mod groups;
pub mod send;
pub mod status;
pub mod util;
pub mod watch;

use std::sync::Arc;

use bisecure_api::{DeviceLink, SimulatedGateway};
use bisecure_core::{CoreError, GatewayConfig, GatewayController};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a gateway-bound command to the appropriate handler.
///
/// The controller is always disposed afterwards, also on failure.
pub async fn dispatch(
    cmd: Command,
    profile: &str,
    gateway: GatewayConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let controller = connect(profile, gateway).await?;

    let result = match cmd {
        Command::Groups => groups::handle(&controller, global).await,
        Command::Status(args) => status::handle(&controller, &args, global).await,
        Command::Watch(args) => watch::handle(&controller, &args, global).await,
        Command::Send(args) => send::handle(&controller, &args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    };

    controller.dispose().await;
    result
}

/// Open a session on the gateway described by `gateway`.
async fn connect(profile: &str, gateway: GatewayConfig) -> Result<GatewayController, CliError> {
    let link: Arc<dyn DeviceLink> = Arc::new(SimulatedGateway::demo());
    let controller = GatewayController::new(gateway, link);

    match controller.initialize().await {
        Ok(()) => Ok(controller),
        Err(e @ (CoreError::AuthenticationFailed { .. } | CoreError::Configuration { .. })) => {
            Err(e.into())
        }
        Err(e) => Err(CliError::ConnectionFailed {
            gateway: profile.to_owned(),
            reason: e.to_string(),
        }),
    }
}
