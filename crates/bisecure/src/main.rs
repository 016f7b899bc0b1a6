mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bisecure_config::{Config, ConfigError, GatewayProfile};
use bisecure_core::GatewayConfig;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

/// Profile used when no configuration exists at all.
const DEMO_PROFILE: &str = "demo";
const DEMO_GATEWAY_ID: &str = "5410EC036150";

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a gateway
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "bisecure", &mut std::io::stdout());
            Ok(())
        }

        // All other commands talk to the gateway
        cmd => {
            let (profile, gateway) = build_gateway_config(&cli.global)?;
            tracing::debug!(command = ?cmd, profile, "dispatching command");
            commands::dispatch(cmd, &profile, gateway, &cli.global).await
        }
    }
}

/// Load the config file named by `--config`, or the canonical one.
pub(crate) fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let cfg = match global.config {
        Some(ref path) => bisecure_config::load_config_from(path)?,
        None => bisecure_config::load_config()?,
    };
    Ok(cfg)
}

/// Resolve the active gateway profile into a `GatewayConfig`.
///
/// Without any configured gateway (and no explicit `--profile`) a demo
/// profile pointing at the simulated gateway is used.
fn build_gateway_config(global: &GlobalOpts) -> Result<(String, GatewayConfig), CliError> {
    let cfg = load_config(global)?;

    if cfg.gateways.is_empty() && global.profile.is_none() {
        let demo = GatewayProfile {
            gateway_id: DEMO_GATEWAY_ID.into(),
            address: "127.0.0.1".into(),
            ..GatewayProfile::default()
        };
        let gateway =
            bisecure_config::profile_to_gateway_config(&demo, DEMO_PROFILE, &cfg.defaults)?;
        return Ok((DEMO_PROFILE.into(), gateway));
    }

    bisecure_config::resolve_gateway(&cfg, global.profile.as_deref()).map_err(|err| match err {
        ConfigError::ProfileNotFound { profile } => {
            let mut names: Vec<_> = cfg.gateways.keys().cloned().collect();
            names.sort();
            CliError::ProfileNotFound {
                name: profile,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            }
        }
        other => other.into(),
    })
}
