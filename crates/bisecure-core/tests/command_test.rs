#![allow(clippy::unwrap_used)]
// Command translation through the controller, against a scripted link.

mod support;

use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::time::sleep;

use bisecure_api::{Transition, TravelDirection};
use bisecure_core::{
    ActuatorStatus, ChannelKind, ChannelUid, ChannelValue, Command, CommandOutcome, CoreError,
    PollingConfig, PollingMode, SuppressReason,
};

use support::{GROUP, Outcome, PORT, ScriptedLink, online, quiet_polling, settle};

fn position() -> ChannelUid {
    ChannelUid::position(GROUP, PORT)
}

// ── Impulse emission ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn close_on_settled_door_sends_one_impulse_and_goes_active() {
    let link = ScriptedLink::new(Transition::settled(0));
    let (controller, actuator) = online(&link, quiet_polling()).await;

    let outcome = controller.handle_command(&position(), Command::Close).await.unwrap();

    assert_eq!(outcome, CommandOutcome::Emitted);
    assert_eq!(link.calls().set_state, 1);
    assert!(actuator.polling_mode().await.is_active());
    assert_eq!(actuator.polling_interval(), Some(Duration::from_secs(5)));
}

#[tokio::test(start_paused = true)]
async fn active_polling_after_command_falls_back_after_timeout() {
    let link = ScriptedLink::new(Transition::settled(0));
    let (controller, actuator) = online(&link, quiet_polling()).await;

    controller.handle_command(&position(), Command::Close).await.unwrap();
    sleep(Duration::from_secs(15)).await;
    assert!(actuator.polling_mode().await.is_active());

    sleep(Duration::from_secs(10)).await;
    assert_eq!(actuator.polling_mode().await, PollingMode::Settled);
    assert_eq!(actuator.polling_interval(), Some(Duration::from_secs(3600)));
    assert_eq!(link.calls().set_state, 1);
}

#[tokio::test(start_paused = true)]
async fn stop_on_moving_door_is_emitted() {
    let link = ScriptedLink::new(Transition::settled(100));
    let (controller, _actuator) = online(&link, quiet_polling()).await;

    link.set_transition(Transition::driving(70, TravelDirection::Open));
    let outcome = controller.handle_command(&position(), Command::Stop).await.unwrap();
    assert_eq!(outcome, CommandOutcome::Emitted);
    assert_eq!(link.calls().set_state, 1);
}

// ── Suppression ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn close_on_closed_door_is_suppressed() {
    let link = ScriptedLink::new(Transition::settled(100));
    let (controller, actuator) = online(&link, quiet_polling()).await;

    let outcome = controller.handle_command(&position(), Command::Close).await.unwrap();

    assert_eq!(outcome, CommandOutcome::Suppressed(SuppressReason::AlreadyClosed));
    assert_eq!(link.calls().set_state, 0);
    assert_eq!(actuator.polling_mode().await, PollingMode::Settled);
}

#[tokio::test(start_paused = true)]
async fn same_direction_while_driving_is_suppressed() {
    let link = ScriptedLink::new(Transition::settled(100));
    let (controller, _actuator) = online(&link, quiet_polling()).await;

    link.set_transition(Transition::driving(70, TravelDirection::Close));
    let outcome = controller.handle_command(&position(), Command::Close).await.unwrap();
    assert_eq!(outcome, CommandOutcome::Suppressed(SuppressReason::SameDirection));
    assert_eq!(link.calls().set_state, 0);
}

#[tokio::test(start_paused = true)]
async fn commands_are_suppressed_while_offline() {
    let link = ScriptedLink::new(Transition::settled(100));
    let (controller, actuator) = online(&link, quiet_polling()).await;

    link.push(Outcome::Indeterminate, 5);
    for _ in 0..5 {
        actuator.poll().await;
    }
    assert!(!actuator.status().is_online());

    let outcome = controller.handle_command(&position(), Command::Open).await.unwrap();
    assert_eq!(outcome, CommandOutcome::Suppressed(SuppressReason::NotOnline));
    assert_eq!(link.calls().set_state, 0);
}

#[tokio::test(start_paused = true)]
async fn refresh_polls_without_actuating() {
    let link = ScriptedLink::new(Transition::settled(100));
    let (controller, actuator) = online(&link, quiet_polling()).await;

    link.set_transition(Transition::settled(25));
    let outcome = controller.handle_command(&position(), Command::Refresh).await.unwrap();

    assert_eq!(outcome, CommandOutcome::Suppressed(SuppressReason::Refresh));
    assert_eq!(link.calls().set_state, 0);
    assert_eq!(
        actuator.last_value(&position()).await,
        Some(ChannelValue::PercentOpen(75))
    );
}

// ── Faults and routing ──────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn unauthorized_command_read_triggers_relogin() {
    let link = ScriptedLink::new(Transition::settled(0));
    let (controller, actuator) = online(&link, quiet_polling()).await;

    link.push(Outcome::Unauthorized, 1);
    let result = controller.handle_command(&position(), Command::Close).await;
    settle().await;

    assert!(matches!(result, Err(CoreError::Unauthorized)), "got {result:?}");
    assert_eq!(link.calls().relogin, 1);
    assert_eq!(link.calls().set_state, 0);
    assert_eq!(actuator.status(), ActuatorStatus::Online);
}

#[tokio::test(start_paused = true)]
async fn commands_are_routed_by_channel() {
    let link = ScriptedLink::new(Transition::settled(100));
    let (controller, _actuator) = online(&link, PollingConfig::default()).await;

    let unknown_group = ChannelUid::position(42, PORT);
    assert!(matches!(
        controller.handle_command(&unknown_group, Command::Open).await,
        Err(CoreError::ActuatorNotFound { group_id: 42 })
    ));

    let unknown_port = ChannelUid::position(GROUP, 9);
    assert!(matches!(
        controller.handle_command(&unknown_port, Command::Open).await,
        Err(CoreError::ChannelNotFound { .. })
    ));

    let error_channel = ChannelUid::new(GROUP, PORT, ChannelKind::Error);
    assert!(matches!(
        controller.handle_command(&error_channel, Command::Open).await,
        Err(CoreError::ChannelNotFound { .. })
    ));
    assert_eq!(
        controller.handle_command(&error_channel, Command::Refresh).await.unwrap(),
        CommandOutcome::Suppressed(SuppressReason::Refresh)
    );
}
