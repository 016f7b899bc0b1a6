// ── In-process gateway simulator ──
//
// A `DeviceLink` backed by memory instead of a socket. Doors travel at a
// constant speed on the tokio clock, so paused-time tests and the CLI demo
// see the same motion the real gateway reports: an impulse starts a
// stationary door and stops a moving one.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::time::Instant;
use tracing::debug;

use crate::error::Error;
use crate::link::DeviceLink;
use crate::model::{Group, Port, Transition, TravelDirection};

const DEFAULT_TRAVEL_TIME: Duration = Duration::from_secs(20);

/// A one-shot failure returned by the next port call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimFault {
    Unauthorized,
    StateIndeterminate,
    Timeout,
}

impl SimFault {
    fn into_error(self) -> Error {
        match self {
            Self::Unauthorized => Error::Unauthorized,
            Self::StateIndeterminate => Error::StateIndeterminate {
                message: "simulated radio error".into(),
            },
            Self::Timeout => Error::Timeout { timeout_ms: 5000 },
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Motion {
    from: f64,
    direction: TravelDirection,
    started: Instant,
}

#[derive(Debug, Clone, Copy)]
struct Door {
    /// 0 = fully open, 100 = fully closed.
    state: f64,
    motion: Option<Motion>,
    last_direction: TravelDirection,
}

impl Door {
    fn at(state_in_percent: u8) -> Self {
        Self {
            state: f64::from(state_in_percent.min(100)),
            motion: None,
            last_direction: TravelDirection::Close,
        }
    }

    /// Move the door along its travel up to `now`, stopping at the end stops.
    fn advance(&mut self, now: Instant, travel_time: Duration) {
        let Some(motion) = self.motion else { return };
        let elapsed = now.saturating_duration_since(motion.started).as_secs_f64();
        let distance = 100.0 * elapsed / travel_time.as_secs_f64().max(f64::EPSILON);
        let (position, end) = match motion.direction {
            TravelDirection::Open => ((motion.from - distance).max(0.0), 0.0),
            TravelDirection::Close => ((motion.from + distance).min(100.0), 100.0),
        };
        self.state = position;
        if (position - end).abs() < f64::EPSILON {
            self.motion = None;
        }
    }

    fn impulse(&mut self, now: Instant) {
        if self.motion.take().is_some() {
            return;
        }
        let direction = if self.state >= 100.0 {
            TravelDirection::Open
        } else if self.state <= 0.0 {
            TravelDirection::Close
        } else {
            match self.last_direction {
                TravelDirection::Open => TravelDirection::Close,
                TravelDirection::Close => TravelDirection::Open,
            }
        };
        self.last_direction = direction;
        self.motion = Some(Motion {
            from: self.state,
            direction,
            started: now,
        });
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::as_conversions
    )]
    fn transition(&self) -> Transition {
        let percent = self.state.round().clamp(0.0, 100.0) as u8;
        match self.motion {
            Some(motion) => Transition::driving(percent, motion.direction),
            None => Transition::settled(percent),
        }
    }
}

#[derive(Debug, Default)]
struct SimState {
    session_started: Option<Instant>,
    has_credentials: bool,
    closed: bool,
    doors: HashMap<u8, Door>,
    faults: VecDeque<SimFault>,
    impulses: usize,
    relogins: usize,
}

impl SimState {
    fn check_session(&mut self, now: Instant, ttl: Option<Duration>) -> Result<(), Error> {
        if self.closed {
            return Err(Error::NotConnected);
        }
        let Some(started) = self.session_started else {
            return Err(if self.has_credentials {
                Error::Unauthorized
            } else {
                Error::NotConnected
            });
        };
        if ttl.is_some_and(|ttl| now.saturating_duration_since(started) >= ttl) {
            self.session_started = None;
            return Err(Error::Unauthorized);
        }
        Ok(())
    }
}

/// Simulated BiSecure gateway.
///
/// Ports are keyed by id across the whole gateway, the same way the
/// gateway numbers them on the wire.
pub struct SimulatedGateway {
    name: String,
    username: String,
    password: SecretString,
    travel_time: Duration,
    session_ttl: Option<Duration>,
    groups: Vec<Group>,
    state: Mutex<SimState>,
}

impl SimulatedGateway {
    pub fn builder() -> SimulatedGatewayBuilder {
        SimulatedGatewayBuilder::default()
    }

    /// Two closed doors: a garage with a light and a driveway gate.
    pub fn demo() -> Self {
        use crate::model::PortType;

        Self::builder()
            .name("BiSecure Gateway (simulated)")
            .group(
                0,
                "Garage",
                [Port::new(0, PortType::Impulse), Port::new(1, PortType::Light)],
            )
            .group(1, "Driveway gate", [Port::new(2, PortType::Impulse)])
            .build()
    }

    /// Queue a failure for the next `get_transition` or `set_state` call.
    pub fn inject_fault(&self, fault: SimFault) {
        self.lock().faults.push_back(fault);
    }

    /// Drop the session so the next call answers `Unauthorized`.
    pub fn expire_session(&self) {
        self.lock().session_started = None;
    }

    /// Place a door at a fixed position, cancelling any travel.
    pub fn set_door_state(&self, port_id: u8, state_in_percent: u8) {
        self.lock().doors.insert(port_id, Door::at(state_in_percent));
    }

    /// Number of impulses accepted so far.
    pub fn impulses(&self) -> usize {
        self.lock().impulses
    }

    /// Number of successful re-logins so far.
    pub fn relogins(&self) -> usize {
        self.lock().relogins
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn port_call(&self, port: &Port) -> Result<(MutexGuard<'_, SimState>, Instant), Error> {
        let now = Instant::now();
        let mut state = self.lock();
        state.check_session(now, self.session_ttl)?;
        if let Some(fault) = state.faults.pop_front() {
            return Err(fault.into_error());
        }
        if !state.doors.contains_key(&port.id) {
            return Err(Error::Protocol {
                message: format!("unknown port {}", port.id),
            });
        }
        Ok((state, now))
    }
}

#[async_trait]
impl DeviceLink for SimulatedGateway {
    async fn login(&self, username: &str, password: &SecretString) -> Result<bool, Error> {
        let mut state = self.lock();
        if state.closed {
            return Err(Error::NotConnected);
        }
        if username != self.username || password.expose_secret() != self.password.expose_secret() {
            debug!(username, "simulated gateway refused login");
            return Ok(false);
        }
        state.session_started = Some(Instant::now());
        state.has_credentials = true;
        Ok(true)
    }

    async fn logout(&self) -> Result<(), Error> {
        self.lock().session_started = None;
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        let mut state = self.lock();
        state.session_started = None;
        state.closed = true;
        Ok(())
    }

    async fn relogin(&self) -> Result<bool, Error> {
        let mut state = self.lock();
        if state.closed {
            return Err(Error::NotConnected);
        }
        if !state.has_credentials {
            return Err(Error::Authentication {
                message: "no stored credentials".into(),
            });
        }
        state.session_started = Some(Instant::now());
        state.relogins += 1;
        Ok(true)
    }

    async fn name(&self) -> Result<String, Error> {
        Ok(self.name.clone())
    }

    async fn list_groups(&self) -> Result<Vec<Group>, Error> {
        self.lock().check_session(Instant::now(), self.session_ttl)?;
        Ok(self.groups.clone())
    }

    async fn get_transition(&self, port: &Port) -> Result<Transition, Error> {
        let (mut state, now) = self.port_call(port)?;
        let travel_time = self.travel_time;
        let door = state
            .doors
            .get_mut(&port.id)
            .ok_or(Error::NotConnected)?;
        door.advance(now, travel_time);
        door.transition().validate()
    }

    async fn set_state(&self, port: &Port) -> Result<(), Error> {
        let (mut state, now) = self.port_call(port)?;
        let travel_time = self.travel_time;
        if let Some(door) = state.doors.get_mut(&port.id) {
            door.advance(now, travel_time);
            door.impulse(now);
            debug!(port = port.id, state = door.state, moving = door.motion.is_some(), "impulse");
        }
        state.impulses += 1;
        Ok(())
    }
}

/// Builder for [`SimulatedGateway`].
pub struct SimulatedGatewayBuilder {
    name: String,
    username: String,
    password: SecretString,
    travel_time: Duration,
    session_ttl: Option<Duration>,
    groups: Vec<Group>,
    initial: HashMap<u8, u8>,
}

impl Default for SimulatedGatewayBuilder {
    fn default() -> Self {
        Self {
            name: "BiSecure Gateway".into(),
            username: "admin".into(),
            password: SecretString::from(String::from("0000")),
            travel_time: DEFAULT_TRAVEL_TIME,
            session_ttl: None,
            groups: Vec::new(),
            initial: HashMap::new(),
        }
    }
}

impl SimulatedGatewayBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = SecretString::from(password.into());
        self
    }

    /// Time a door needs for a full open or close run.
    pub fn travel_time(mut self, travel_time: Duration) -> Self {
        self.travel_time = travel_time;
        self
    }

    /// Expire the session this long after each login.
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = Some(ttl);
        self
    }

    pub fn group(
        mut self,
        id: u32,
        name: impl Into<String>,
        ports: impl IntoIterator<Item = Port>,
    ) -> Self {
        self.groups.push(Group {
            id,
            name: name.into(),
            ports: ports.into_iter().collect(),
        });
        self
    }

    /// Initial position of a door. Doors default to fully closed.
    pub fn door_state(mut self, port_id: u8, state_in_percent: u8) -> Self {
        self.initial.insert(port_id, state_in_percent);
        self
    }

    pub fn build(self) -> SimulatedGateway {
        let doors = self
            .groups
            .iter()
            .flat_map(|g| g.ports.iter())
            .map(|p| {
                let initial = self.initial.get(&p.id).copied().unwrap_or(100);
                (p.id, Door::at(initial))
            })
            .collect();

        SimulatedGateway {
            name: self.name,
            username: self.username,
            password: self.password,
            travel_time: self.travel_time,
            session_ttl: self.session_ttl,
            groups: self.groups,
            state: Mutex::new(SimState {
                doors,
                ..SimState::default()
            }),
        }
    }
}
