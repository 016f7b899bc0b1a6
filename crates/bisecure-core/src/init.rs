// ── Initialization retry loop ──
//
// While an actuator is still initializing, retry discovery at a fixed
// period until it succeeds once. Only cancellation or a configuration
// error ends the loop early; a failing or panicking attempt never does.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::actuator::Actuator;
use crate::model::ActuatorStatus;

impl Actuator {
    pub(crate) fn spawn_init_retry(&self) {
        let period = self.ctx.config.init_retry_interval;
        let cancel = self.lifetime.child_token();
        tokio::spawn(init_retry_task(self.self_ref.clone(), period, cancel));
    }
}

async fn init_retry_task(actuator: Weak<Actuator>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let Some(actuator) = actuator.upgrade() else { break };
                if actuator.status() != ActuatorStatus::Initializing {
                    break;
                }
                if attempt(actuator).await {
                    break;
                }
            }
        }
    }
}

/// One attempt, isolated in its own task so a panic cannot take the loop
/// down. Returns `true` when the loop is done.
async fn attempt(actuator: Arc<Actuator>) -> bool {
    let group_id = actuator.group_id();
    let task = {
        let actuator = Arc::clone(&actuator);
        tokio::spawn(async move { actuator.try_initialize().await })
    };

    match task.await {
        Ok(Ok(())) => {
            info!(group_id, attempts = actuator.init_attempts(), "initialization succeeded");
            true
        }
        Ok(Err(e)) if e.is_configuration() => {
            actuator.fail_configuration(&e);
            true
        }
        Ok(Err(e)) => {
            debug!(group_id, error = %e, "initialization still deferred");
            actuator.is_disposed()
        }
        Err(e) => {
            warn!(group_id, error = %e, "initialization attempt aborted");
            false
        }
    }
}
