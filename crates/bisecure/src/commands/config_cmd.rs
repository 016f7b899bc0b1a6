//! Config subcommand handlers.

use std::path::PathBuf;

use bisecure_config::{Config, GatewayProfile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, InitArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(bisecure_config::config_path)
}

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_gateway {
        let _ = writeln!(out, "default_gateway = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "polling_interval = {}", cfg.defaults.polling_interval);
    let _ = writeln!(
        out,
        "active_polling_interval = {}",
        cfg.defaults.active_polling_interval
    );
    let _ = writeln!(
        out,
        "active_polling_timeout = {}",
        cfg.defaults.active_polling_timeout
    );
    let _ = writeln!(
        out,
        "active_polling_during_opened = {}",
        cfg.defaults.active_polling_during_opened
    );
    let _ = writeln!(out, "error_ceiling = {}", cfg.defaults.error_ceiling);

    let mut names: Vec<_> = cfg.gateways.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.gateways[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[gateways.{name}]");
        let _ = writeln!(out, "gateway_id = \"{}\"", p.gateway_id);
        let _ = writeln!(out, "address = \"{}\"", p.address);
        if let Some(port) = p.port {
            let _ = writeln!(out, "port = {port}");
        }
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if let Some(ms) = p.read_timeout_ms {
            let _ = writeln!(out, "read_timeout_ms = {ms}");
        }
        if let Some(secs) = p.polling_interval {
            let _ = writeln!(out, "polling_interval = {secs}");
        }
        if let Some(secs) = p.active_polling_interval {
            let _ = writeln!(out, "active_polling_interval = {secs}");
        }
        if let Some(secs) = p.active_polling_timeout {
            let _ = writeln!(out, "active_polling_timeout = {secs}");
        }
        if let Some(hold) = p.active_polling_during_opened {
            let _ = writeln!(out, "active_polling_during_opened = {hold}");
        }
        if let Some(ceiling) = p.error_ceiling {
            let _ = writeln!(out, "error_ceiling = {ceiling}");
        }
    }

    out
}

fn init_profile(args: &InitArgs, path: &std::path::Path, cfg: &mut Config) -> Result<(), CliError> {
    let profile = GatewayProfile {
        gateway_id: args.gateway_id.trim().to_uppercase(),
        address: args.address.trim().to_owned(),
        username: args.username.clone(),
        password_env: args.password_env.clone(),
        ..GatewayProfile::default()
    };

    // Reject what the controller would refuse later on.
    let gateway = bisecure_config::profile_to_gateway_config(&profile, &args.name, &cfg.defaults)?;
    gateway.validate()?;

    cfg.gateways.insert(args.name.clone(), profile);
    if args.set_default || cfg.gateways.len() == 1 {
        cfg.default_gateway = Some(args.name.clone());
    }
    bisecure_config::save_config_to(cfg, path)?;
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = crate::load_config(global)?;
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => format_config_redacted(&cfg),
                format => {
                    let mut names: Vec<_> = cfg.gateways.keys().cloned().collect();
                    names.sort();
                    let summary = serde_json::json!({
                        "default_gateway": cfg.default_gateway,
                        "gateways": names,
                    });
                    output::render_single(format, &summary, ToString::to_string, ToString::to_string)?
                }
            };
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config_path(global).display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Init(init) => {
            let path = config_path(global);
            let mut cfg = crate::load_config(global)?;
            init_profile(&init, &path, &mut cfg)?;
            eprintln!("✓ Profile '{}' saved to {}", init.name, path.display());
            Ok(())
        }
    }
}
