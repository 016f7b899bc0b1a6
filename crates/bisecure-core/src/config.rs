// ── Runtime gateway configuration ──
//
// These types describe *which* gateway to talk to and *how* to poll it.
// They carry credential data and cadence tuning, but never touch disk.
// `bisecure-config` (or an embedding host) builds a `GatewayConfig` and
// hands it in.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;

use crate::error::CoreError;

pub const DEFAULT_GATEWAY_PORT: u16 = 4000;
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "0000";
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(5000);

pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_ACTIVE_POLLING_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_ACTIVE_POLLING_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_ERROR_CEILING: u32 = 4;
pub const DEFAULT_INIT_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Polling cadence and channel layout, shared by every actuator of a gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct PollingConfig {
    /// Cadence while the door is settled.
    pub interval: Duration,
    /// Cadence around an actuation or while the door is moving.
    pub active_interval: Duration,
    /// Minimum time spent in active polling once entered.
    pub active_timeout: Duration,
    /// Stay in active polling while the door reports fully open.
    pub active_polling_during_opened: bool,
    /// Consecutive indeterminate polls tolerated before going offline.
    pub error_ceiling: u32,
    /// Period of the initialization retry loop.
    pub init_retry_interval: Duration,
    /// Create an error-annotation channel per port.
    pub error_channels: bool,
    /// Create an open/closed contact channel per port.
    pub contact_channels: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLLING_INTERVAL,
            active_interval: DEFAULT_ACTIVE_POLLING_INTERVAL,
            active_timeout: DEFAULT_ACTIVE_POLLING_TIMEOUT,
            active_polling_during_opened: false,
            error_ceiling: DEFAULT_ERROR_CEILING,
            init_retry_interval: DEFAULT_INIT_RETRY_INTERVAL,
            error_channels: true,
            contact_channels: false,
        }
    }
}

/// Configuration for one gateway and all actuators behind it.
///
/// Immutable once handed to a [`GatewayController`](crate::GatewayController).
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway id: its MAC address without separators.
    pub gateway_id: String,
    /// Network address of the gateway.
    pub address: Option<IpAddr>,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// How long to wait for each gateway answer.
    pub read_timeout: Duration,
    pub polling: PollingConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gateway_id: String::new(),
            address: None,
            port: DEFAULT_GATEWAY_PORT,
            username: DEFAULT_USERNAME.into(),
            password: SecretString::from(DEFAULT_PASSWORD.to_owned()),
            read_timeout: DEFAULT_READ_TIMEOUT,
            polling: PollingConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Socket address of the gateway, when an address is configured.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.address.map(|ip| SocketAddr::new(ip, self.port))
    }

    /// Reject configurations the controller cannot run with.
    ///
    /// Failures are fatal for the gateway: they surface once as a
    /// configuration status and are never retried.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.gateway_id.is_empty() {
            return Err(config_error("gateway id is missing"));
        }
        if !self.gateway_id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(config_error(format!(
                "gateway id '{}' must be the gateway MAC without separators",
                self.gateway_id
            )));
        }
        if self.address.is_none() {
            return Err(config_error("gateway address is missing"));
        }
        if self.username.is_empty() {
            return Err(config_error("username is missing"));
        }
        let polling = &self.polling;
        if polling.interval.is_zero()
            || polling.active_interval.is_zero()
            || polling.init_retry_interval.is_zero()
        {
            return Err(config_error("polling intervals must be non-zero"));
        }
        if self.read_timeout.is_zero() {
            return Err(config_error("read timeout must be non-zero"));
        }
        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> CoreError {
    CoreError::Configuration {
        message: message.into(),
    }
}
