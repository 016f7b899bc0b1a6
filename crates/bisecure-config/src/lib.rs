//! Shared configuration for BiSecure gateway tools.
//!
//! TOML gateway profiles, password resolution (env + keyring + plaintext),
//! and translation to `bisecure_core::GatewayConfig`.

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bisecure_core::config::{
    DEFAULT_ACTIVE_POLLING_INTERVAL, DEFAULT_ACTIVE_POLLING_TIMEOUT, DEFAULT_ERROR_CEILING,
    DEFAULT_GATEWAY_PORT, DEFAULT_PASSWORD, DEFAULT_POLLING_INTERVAL, DEFAULT_READ_TIMEOUT,
    DEFAULT_USERNAME,
};
use bisecure_core::{GatewayConfig, PollingConfig};

const KEYRING_SERVICE: &str = "bisecure";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no gateway profile named '{profile}'")]
    ProfileNotFound { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Gateway profile used when none is named.
    pub default_gateway: Option<String>,

    /// Polling defaults applied to every gateway.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named gateway profiles.
    #[serde(default)]
    pub gateways: HashMap<String, GatewayProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_gateway: Some("default".into()),
            defaults: Defaults::default(),
            gateways: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Settled polling interval in seconds.
    #[serde(default = "default_polling_interval")]
    pub polling_interval: u64,

    /// Active polling interval in seconds.
    #[serde(default = "default_active_polling_interval")]
    pub active_polling_interval: u64,

    /// Minimum active polling time in seconds.
    #[serde(default = "default_active_polling_timeout")]
    pub active_polling_timeout: u64,

    #[serde(default)]
    pub active_polling_during_opened: bool,

    #[serde(default = "default_error_ceiling")]
    pub error_ceiling: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            polling_interval: default_polling_interval(),
            active_polling_interval: default_active_polling_interval(),
            active_polling_timeout: default_active_polling_timeout(),
            active_polling_during_opened: false,
            error_ceiling: default_error_ceiling(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_polling_interval() -> u64 {
    DEFAULT_POLLING_INTERVAL.as_secs()
}
fn default_active_polling_interval() -> u64 {
    DEFAULT_ACTIVE_POLLING_INTERVAL.as_secs()
}
fn default_active_polling_timeout() -> u64 {
    DEFAULT_ACTIVE_POLLING_TIMEOUT.as_secs()
}
fn default_error_ceiling() -> u32 {
    DEFAULT_ERROR_CEILING
}

/// A named gateway profile.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayProfile {
    /// Gateway MAC address without separators.
    pub gateway_id: String,

    /// Gateway IP address.
    pub address: String,

    /// Gateway TCP port (default 4000).
    pub port: Option<u16>,

    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    pub read_timeout_ms: Option<u64>,

    // Per-gateway overrides of [defaults]
    pub polling_interval: Option<u64>,
    pub active_polling_interval: Option<u64>,
    pub active_polling_timeout: Option<u64>,
    pub active_polling_during_opened: Option<bool>,
    pub error_ceiling: Option<u32>,

    /// Publish an error annotation channel per port (default true).
    pub error_channels: Option<bool>,

    /// Publish an open/closed contact channel per port (default false).
    pub contact_channels: Option<bool>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "bisecure", "bisecure").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("bisecure");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the Config from `path` + environment.
///
/// A missing file yields the defaults. `BISECURE_` variables override
/// file values, with `__` separating nested keys
/// (`BISECURE_GATEWAYS__HOME__ADDRESS`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("BISECURE_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the gateway password.
///
/// Order: the profile's `password_env` variable, the system keyring entry
/// `bisecure/<profile>/password`, the plaintext `password`, and finally the
/// gateway's factory default.
pub fn resolve_password(profile: &GatewayProfile, profile_name: &str) -> SecretString {
    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return SecretString::from(val);
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password")) {
        if let Ok(pw) = entry.get_password() {
            return SecretString::from(pw);
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return SecretString::from(pw.clone());
    }

    SecretString::from(DEFAULT_PASSWORD.to_owned())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `GatewayConfig` from a profile and the global defaults.
///
/// Only parses; semantic checks happen in `GatewayConfig::validate` when
/// the controller initializes.
pub fn profile_to_gateway_config(
    profile: &GatewayProfile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<GatewayConfig, ConfigError> {
    let address = if profile.address.trim().is_empty() {
        None
    } else {
        let ip: IpAddr = profile
            .address
            .trim()
            .parse()
            .map_err(|_| ConfigError::Validation {
                field: "address".into(),
                reason: format!("not an IP address: {}", profile.address),
            })?;
        Some(ip)
    };

    let polling = PollingConfig {
        interval: Duration::from_secs(profile.polling_interval.unwrap_or(defaults.polling_interval)),
        active_interval: Duration::from_secs(
            profile
                .active_polling_interval
                .unwrap_or(defaults.active_polling_interval),
        ),
        active_timeout: Duration::from_secs(
            profile
                .active_polling_timeout
                .unwrap_or(defaults.active_polling_timeout),
        ),
        active_polling_during_opened: profile
            .active_polling_during_opened
            .unwrap_or(defaults.active_polling_during_opened),
        error_ceiling: profile.error_ceiling.unwrap_or(defaults.error_ceiling),
        error_channels: profile.error_channels.unwrap_or(true),
        contact_channels: profile.contact_channels.unwrap_or(false),
        ..PollingConfig::default()
    };

    Ok(GatewayConfig {
        gateway_id: profile.gateway_id.trim().to_owned(),
        address,
        port: profile.port.unwrap_or(DEFAULT_GATEWAY_PORT),
        username: profile
            .username
            .clone()
            .unwrap_or_else(|| DEFAULT_USERNAME.into()),
        password: resolve_password(profile, profile_name),
        read_timeout: profile
            .read_timeout_ms
            .map_or(DEFAULT_READ_TIMEOUT, Duration::from_millis),
        polling,
    })
}

/// Pick the named gateway (or the default one) and translate it.
///
/// Returns the resolved profile name alongside the config.
pub fn resolve_gateway(
    config: &Config,
    name: Option<&str>,
) -> Result<(String, GatewayConfig), ConfigError> {
    let profile_name = name
        .map(str::to_owned)
        .or_else(|| config.default_gateway.clone())
        .unwrap_or_else(|| "default".into());

    let profile = config
        .gateways
        .get(&profile_name)
        .ok_or_else(|| ConfigError::ProfileNotFound {
            profile: profile_name.clone(),
        })?;

    let gateway = profile_to_gateway_config(profile, &profile_name, &config.defaults)?;
    Ok((profile_name, gateway))
}
