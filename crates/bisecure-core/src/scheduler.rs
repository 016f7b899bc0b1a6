// ── Polling scheduler ──
//
// One recurring timer per actuator. Every timer fires immediately, then
// repeats at its interval. Rescheduling cancels the running timer and
// installs a fresh one; a tick already in flight runs to completion.

use std::sync::Weak;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Something driven by a poll timer.
#[async_trait]
pub trait PollTarget: Send + Sync {
    async fn tick(&self);
}

struct ScheduledTimer {
    interval: Duration,
    cancel: CancellationToken,
    target: Weak<dyn PollTarget>,
}

pub struct PollingScheduler {
    timers: DashMap<u32, ScheduledTimer>,
    cancel: CancellationToken,
}

impl PollingScheduler {
    /// Timers are children of `parent` and stop when it is cancelled.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            timers: DashMap::new(),
            cancel: parent.child_token(),
        }
    }

    /// Start polling `target` for actuator `id`, replacing any timer it had.
    ///
    /// The scheduler holds the target weakly; the timer ends on its own once
    /// the target is dropped.
    pub fn start(&self, id: u32, interval: Duration, target: Weak<dyn PollTarget>) {
        let timer = self.spawn_timer(id, interval, target);
        if let Some(old) = self.timers.insert(id, timer) {
            old.cancel.cancel();
        }
    }

    /// Swap the interval of a running timer. Returns `false` when no timer
    /// exists for `id`.
    pub fn reschedule(&self, id: u32, interval: Duration) -> bool {
        let Some(mut entry) = self.timers.get_mut(&id) else {
            return false;
        };
        entry.cancel.cancel();
        let target = entry.target.clone();
        *entry = self.spawn_timer(id, interval, target);
        info!(group_id = id, interval_secs = interval.as_secs(), "polling cadence changed");
        true
    }

    pub fn stop(&self, id: u32) {
        if let Some((_, timer)) = self.timers.remove(&id) {
            timer.cancel.cancel();
            debug!(group_id = id, "polling stopped");
        }
    }

    /// Cancel every timer.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.timers.clear();
    }

    pub fn interval(&self, id: u32) -> Option<Duration> {
        self.timers.get(&id).map(|t| t.interval)
    }

    pub fn is_scheduled(&self, id: u32) -> bool {
        self.timers.contains_key(&id)
    }

    fn spawn_timer(&self, id: u32, interval: Duration, target: Weak<dyn PollTarget>) -> ScheduledTimer {
        let cancel = self.cancel.child_token();
        tokio::spawn(poll_task(id, interval, target.clone(), cancel.clone()));
        ScheduledTimer {
            interval,
            cancel,
            target,
        }
    }
}

async fn poll_task(id: u32, period: Duration, target: Weak<dyn PollTarget>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let Some(target) = target.upgrade() else { break };
                target.tick().await;
            }
        }
    }
    debug!(group_id = id, "poll timer ended");
}
