// Shared fixtures for bisecure-core integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use bisecure_api::{DeviceLink, Error, Group, Port, PortType, Transition};
use bisecure_core::{Actuator, GatewayConfig, GatewayController, PollingConfig};

pub const GROUP: u32 = 0;
pub const PORT: u8 = 0;

/// Scripted answer for the next `get_transition` call.
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Unauthorized,
    Indeterminate,
    Timeout,
    NotConnected,
}

/// Scripted answer for the next `list_groups` call.
#[derive(Debug, Clone, Copy)]
pub enum Listing {
    Empty,
    NotConnected,
    Panic,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Calls {
    pub get_transition: usize,
    pub set_state: usize,
    pub list_groups: usize,
    pub relogin: usize,
}

struct Script {
    groups: Vec<Group>,
    transition: Transition,
    outcomes: VecDeque<Outcome>,
    listings: VecDeque<Listing>,
    broken_port: Option<u8>,
    delay: Duration,
    calls: Calls,
}

/// A `DeviceLink` whose answers are set by the test.
pub struct ScriptedLink {
    script: Mutex<Script>,
}

impl ScriptedLink {
    pub fn new(transition: Transition) -> Arc<Self> {
        Self::with_ports(transition, vec![Port::new(PORT, PortType::Impulse)])
    }

    /// One group [`GROUP`] with the given ports.
    pub fn with_ports(transition: Transition, ports: Vec<Port>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Script {
                groups: vec![Group {
                    id: GROUP,
                    name: "Garage".into(),
                    ports,
                }],
                transition,
                outcomes: VecDeque::new(),
                listings: VecDeque::new(),
                broken_port: None,
                delay: Duration::ZERO,
                calls: Calls::default(),
            }),
        })
    }

    /// Every read of `port_id` answers with an indeterminate state.
    pub fn break_port(&self, port_id: u8) {
        self.lock().broken_port = Some(port_id);
    }

    /// Hold every `get_transition` call for `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = delay;
    }

    pub fn set_transition(&self, transition: Transition) {
        self.lock().transition = transition;
    }

    pub fn push(&self, outcome: Outcome, times: usize) {
        let mut script = self.lock();
        for _ in 0..times {
            script.outcomes.push_back(outcome);
        }
    }

    pub fn push_listing(&self, listing: Listing, times: usize) {
        let mut script = self.lock();
        for _ in 0..times {
            script.listings.push_back(listing);
        }
    }

    pub fn calls(&self) -> Calls {
        self.lock().calls
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }
}

#[async_trait]
impl DeviceLink for ScriptedLink {
    async fn login(&self, _username: &str, _password: &SecretString) -> Result<bool, Error> {
        Ok(true)
    }

    async fn logout(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn relogin(&self) -> Result<bool, Error> {
        self.lock().calls.relogin += 1;
        Ok(true)
    }

    async fn name(&self) -> Result<String, Error> {
        Ok("Scripted gateway".into())
    }

    async fn list_groups(&self) -> Result<Vec<Group>, Error> {
        let next = {
            let mut script = self.lock();
            script.calls.list_groups += 1;
            script.listings.pop_front()
        };
        match next {
            None => Ok(self.lock().groups.clone()),
            Some(Listing::Empty) => Ok(Vec::new()),
            Some(Listing::NotConnected) => Err(Error::NotConnected),
            Some(Listing::Panic) => panic!("scripted discovery panic"),
        }
    }

    async fn get_transition(&self, port: &Port) -> Result<Transition, Error> {
        let delay = self.lock().delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut script = self.lock();
        script.calls.get_transition += 1;
        if script.broken_port == Some(port.id) {
            return Err(Error::StateIndeterminate {
                message: "scripted".into(),
            });
        }
        match script.outcomes.pop_front() {
            None => Ok(script.transition),
            Some(Outcome::Unauthorized) => Err(Error::Unauthorized),
            Some(Outcome::Indeterminate) => Err(Error::StateIndeterminate {
                message: "scripted".into(),
            }),
            Some(Outcome::Timeout) => Err(Error::Timeout { timeout_ms: 5000 }),
            Some(Outcome::NotConnected) => Err(Error::NotConnected),
        }
    }

    async fn set_state(&self, _port: &Port) -> Result<(), Error> {
        self.lock().calls.set_state += 1;
        Ok(())
    }
}

// ── Configuration ───────────────────────────────────────────────────

/// Settled polling far out of reach so tests drive ticks by hand.
pub fn quiet_polling() -> PollingConfig {
    PollingConfig {
        interval: Duration::from_secs(3600),
        active_interval: Duration::from_secs(5),
        active_timeout: Duration::from_secs(20),
        ..PollingConfig::default()
    }
}

pub fn gateway_config(polling: PollingConfig) -> GatewayConfig {
    GatewayConfig {
        gateway_id: "5410EC036150".into(),
        address: Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 40))),
        polling,
        ..GatewayConfig::default()
    }
}

// ── Setup ───────────────────────────────────────────────────────────

/// Let spawned timers and re-login tasks run without moving the clock far.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Connected controller with the actuator for [`GROUP`] online and its
/// first tick done.
pub async fn online(
    link: &Arc<ScriptedLink>,
    polling: PollingConfig,
) -> (GatewayController, Arc<Actuator>) {
    let controller = GatewayController::new(gateway_config(polling), link.clone());
    controller.initialize().await.unwrap();
    let actuator = controller.add_actuator(GROUP).await.unwrap();
    settle().await;
    (controller, actuator)
}
