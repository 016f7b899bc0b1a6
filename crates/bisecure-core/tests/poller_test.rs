#![allow(clippy::unwrap_used)]
// Tick behaviour of the state poller against a scripted link, on the
// paused tokio clock.

mod support;

use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::broadcast;
use tokio::time::sleep;

use bisecure_api::{Port, PortType, Transition, TravelDirection};
use bisecure_core::{
    ActuatorStatus, BridgeStatus, ChannelEvent, ChannelKind, ChannelUid, ChannelValue, Command,
    CommandOutcome, GatewayController, OfflineReason, PollingConfig, PollingMode, SuppressReason,
};

use support::{GROUP, Outcome, PORT, ScriptedLink, gateway_config, online, quiet_polling, settle};

// ── Helpers ─────────────────────────────────────────────────────────

fn drain(rx: &mut broadcast::Receiver<ChannelEvent>, kind: ChannelKind) -> Vec<ChannelValue> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        if ev.channel.kind == kind {
            out.push(ev.value);
        }
    }
    out
}

// ── Rendering ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn percent_open_is_published_once_per_change() {
    let link = ScriptedLink::new(Transition::settled(100));
    let controller = GatewayController::new(gateway_config(quiet_polling()), link.clone());
    let mut events = controller.events();
    controller.initialize().await.unwrap();
    let actuator = controller.add_actuator(GROUP).await.unwrap();
    settle().await;

    assert_eq!(
        drain(&mut events, ChannelKind::Position),
        vec![ChannelValue::PercentOpen(0)]
    );

    actuator.poll().await;
    assert!(drain(&mut events, ChannelKind::Position).is_empty());

    link.set_transition(Transition::settled(40));
    actuator.poll().await;
    assert_eq!(
        drain(&mut events, ChannelKind::Position),
        vec![ChannelValue::PercentOpen(60)]
    );
    assert_eq!(
        actuator.last_value(&ChannelUid::position(GROUP, PORT)).await,
        Some(ChannelValue::PercentOpen(60))
    );
}

// ── Error budget ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn five_indeterminate_polls_take_actuator_offline_until_next_success() {
    let link = ScriptedLink::new(Transition::settled(100));
    let (_controller, actuator) = online(&link, quiet_polling()).await;
    let mut status = actuator.subscribe_status();

    link.push(Outcome::Indeterminate, 5);
    for expected in 1..=4 {
        actuator.poll().await;
        assert_eq!(actuator.error_count().await, expected);
        assert_eq!(actuator.status(), ActuatorStatus::Online);
    }
    assert!(!status.has_changed().unwrap());

    actuator.poll().await;
    assert_eq!(actuator.error_count().await, 5);
    assert!(status.has_changed().unwrap());
    assert_eq!(
        *status.borrow_and_update(),
        ActuatorStatus::offline(OfflineReason::ErrorBudgetExceeded)
    );

    actuator.poll().await;
    assert_eq!(actuator.status(), ActuatorStatus::Online);
    assert_eq!(actuator.error_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn success_in_between_resets_the_budget() {
    let link = ScriptedLink::new(Transition::settled(100));
    let (_controller, actuator) = online(&link, quiet_polling()).await;

    link.push(Outcome::Indeterminate, 4);
    for _ in 0..4 {
        actuator.poll().await;
    }
    actuator.poll().await;
    assert_eq!(actuator.error_count().await, 0);

    link.push(Outcome::Indeterminate, 4);
    for _ in 0..4 {
        actuator.poll().await;
    }
    assert_eq!(actuator.status(), ActuatorStatus::Online);
}

#[tokio::test(start_paused = true)]
async fn indeterminate_state_is_annotated() {
    let link = ScriptedLink::new(Transition::settled(100));
    let (controller, actuator) = online(&link, quiet_polling()).await;
    let mut events = controller.events();

    link.push(Outcome::Indeterminate, 1);
    actuator.poll().await;
    assert_eq!(
        drain(&mut events, ChannelKind::Error),
        vec![ChannelValue::Annotation(
            "Device state indeterminate: scripted".into()
        )]
    );

    actuator.poll().await;
    assert_eq!(
        drain(&mut events, ChannelKind::Error),
        vec![ChannelValue::Annotation(String::new())]
    );
}

#[tokio::test(start_paused = true)]
async fn faulty_port_exhausts_budget_even_when_sibling_port_answers() {
    let link = ScriptedLink::with_ports(
        Transition::settled(100),
        vec![Port::new(0, PortType::Impulse), Port::new(1, PortType::Light)],
    );
    link.break_port(0);
    let (_controller, actuator) = online(&link, quiet_polling()).await;
    assert_eq!(actuator.error_count().await, 1);

    for expected in 2..=4 {
        actuator.poll().await;
        assert_eq!(actuator.error_count().await, expected);
        assert_eq!(actuator.status(), ActuatorStatus::Online);
    }

    actuator.poll().await;
    assert_eq!(
        actuator.status(),
        ActuatorStatus::offline(OfflineReason::ErrorBudgetExceeded)
    );
}

#[tokio::test(start_paused = true)]
async fn indeterminate_ports_count_once_per_poll() {
    let link = ScriptedLink::with_ports(
        Transition::settled(100),
        vec![Port::new(0, PortType::Impulse), Port::new(1, PortType::Light)],
    );
    let (_controller, actuator) = online(&link, quiet_polling()).await;

    link.push(Outcome::Indeterminate, 2);
    actuator.poll().await;
    assert_eq!(actuator.error_count().await, 1);
    assert_eq!(link.calls().get_transition, 4);
}

#[tokio::test(start_paused = true)]
async fn recovery_from_error_budget_returns_to_settled_polling() {
    let link = ScriptedLink::new(Transition::settled(100));
    let (_controller, actuator) = online(&link, quiet_polling()).await;

    link.set_transition(Transition::driving(60, TravelDirection::Open));
    actuator.poll().await;
    settle().await;
    assert!(actuator.polling_mode().await.is_active());

    link.push(Outcome::Indeterminate, 5);
    for _ in 0..5 {
        actuator.poll().await;
    }
    assert_eq!(
        actuator.status(),
        ActuatorStatus::offline(OfflineReason::ErrorBudgetExceeded)
    );
    assert!(actuator.polling_mode().await.is_active());

    link.set_transition(Transition::settled(100));
    actuator.poll().await;
    assert_eq!(actuator.status(), ActuatorStatus::Online);
    assert_eq!(actuator.polling_mode().await, PollingMode::Settled);
    assert_eq!(actuator.polling_interval(), Some(Duration::from_secs(3600)));
}

// ── Other fault classes ─────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn unauthorized_triggers_one_relogin_and_changes_nothing_else() {
    let link = ScriptedLink::new(Transition::settled(100));
    let (controller, actuator) = online(&link, quiet_polling()).await;
    let mut events = controller.events();

    link.push(Outcome::Unauthorized, 1);
    actuator.poll().await;
    settle().await;

    assert_eq!(link.calls().relogin, 1);
    assert_eq!(actuator.error_count().await, 0);
    assert_eq!(actuator.status(), ActuatorStatus::Online);
    assert!(drain(&mut events, ChannelKind::Position).is_empty());
    assert_eq!(
        actuator.last_value(&ChannelUid::position(GROUP, PORT)).await,
        Some(ChannelValue::PercentOpen(0))
    );

    link.push(Outcome::Unauthorized, 1);
    actuator.poll().await;
    settle().await;
    assert_eq!(link.calls().relogin, 2);
}

#[tokio::test(start_paused = true)]
async fn unclassified_faults_are_annotated_but_not_counted() {
    let link = ScriptedLink::new(Transition::settled(100));
    let (controller, actuator) = online(&link, quiet_polling()).await;
    let mut events = controller.events();

    link.push(Outcome::Timeout, 6);
    for _ in 0..6 {
        actuator.poll().await;
    }

    assert_eq!(actuator.error_count().await, 0);
    assert_eq!(actuator.status(), ActuatorStatus::Online);
    assert_eq!(
        drain(&mut events, ChannelKind::Error),
        vec![ChannelValue::Annotation(
            "Unexpected device fault: no answer within 5000ms".into()
        )]
    );
}

#[tokio::test(start_paused = true)]
async fn link_loss_mid_poll_is_not_counted() {
    let link = ScriptedLink::new(Transition::settled(100));
    let (_controller, actuator) = online(&link, quiet_polling()).await;

    link.push(Outcome::NotConnected, 3);
    for _ in 0..3 {
        actuator.poll().await;
    }
    assert_eq!(actuator.error_count().await, 0);
    assert_eq!(actuator.status(), ActuatorStatus::Online);
}

// ── Cadence ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn observed_motion_enters_active_polling_until_timeout() {
    let link = ScriptedLink::new(Transition::settled(100));
    let (_controller, actuator) = online(&link, quiet_polling()).await;
    assert_eq!(actuator.polling_interval(), Some(Duration::from_secs(3600)));

    link.set_transition(Transition::driving(60, TravelDirection::Open));
    actuator.poll().await;
    assert!(actuator.polling_mode().await.is_active());
    assert_eq!(actuator.polling_interval(), Some(Duration::from_secs(5)));

    link.set_transition(Transition::settled(0));
    sleep(Duration::from_secs(25)).await;

    assert_eq!(actuator.polling_mode().await, PollingMode::Settled);
    assert_eq!(actuator.polling_interval(), Some(Duration::from_secs(3600)));
}

#[tokio::test(start_paused = true)]
async fn hold_open_keeps_active_polling_while_fully_open() {
    let link = ScriptedLink::new(Transition::settled(100));
    let polling = PollingConfig {
        active_polling_during_opened: true,
        ..quiet_polling()
    };
    let (_controller, actuator) = online(&link, polling).await;

    link.set_transition(Transition::driving(60, TravelDirection::Open));
    actuator.poll().await;
    link.set_transition(Transition::settled(0));
    sleep(Duration::from_secs(60)).await;

    assert!(actuator.polling_mode().await.is_active());
    assert_eq!(actuator.polling_interval(), Some(Duration::from_secs(5)));
}

#[tokio::test(start_paused = true)]
async fn settled_actuator_polls_at_configured_interval() {
    let link = ScriptedLink::new(Transition::settled(100));
    let polling = PollingConfig {
        interval: Duration::from_secs(30),
        ..quiet_polling()
    };
    let (_controller, _actuator) = online(&link, polling).await;
    assert_eq!(link.calls().get_transition, 1);

    sleep(Duration::from_secs(95)).await;
    assert_eq!(link.calls().get_transition, 4);
}

// ── Gateway offline ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn poll_in_flight_when_gateway_drops_does_not_bring_actuator_back() {
    let link = ScriptedLink::new(Transition::settled(100));
    let (_controller, actuator) = online(&link, quiet_polling()).await;
    link.set_delay(Duration::from_secs(10));

    let in_flight = tokio::spawn({
        let actuator = actuator.clone();
        async move { actuator.poll().await }
    });
    settle().await;
    let offline = tokio::spawn({
        let actuator = actuator.clone();
        async move {
            actuator
                .bridge_status_changed(&BridgeStatus::CommunicationError("link lost".into()))
                .await;
        }
    });
    sleep(Duration::from_secs(11)).await;
    in_flight.await.unwrap();
    offline.await.unwrap();

    assert_eq!(
        actuator.status(),
        ActuatorStatus::offline(OfflineReason::BridgeOffline)
    );
    assert_eq!(actuator.polling_interval(), None);

    link.set_delay(Duration::ZERO);
    actuator.bridge_status_changed(&BridgeStatus::Online).await;
    assert_eq!(actuator.polling_interval(), Some(Duration::from_secs(3600)));
    settle().await;
    assert_eq!(actuator.status(), ActuatorStatus::Online);
}

#[tokio::test(start_paused = true)]
async fn command_in_flight_when_gateway_drops_leaves_polling_paused() {
    let link = ScriptedLink::new(Transition::settled(100));
    let (_controller, actuator) = online(&link, quiet_polling()).await;
    link.set_delay(Duration::from_secs(10));

    let command = tokio::spawn({
        let actuator = actuator.clone();
        async move { actuator.handle_command(PORT, Command::Open).await }
    });
    settle().await;
    actuator
        .bridge_status_changed(&BridgeStatus::CommunicationError("link lost".into()))
        .await;

    assert_eq!(command.await.unwrap().unwrap(), CommandOutcome::Emitted);
    assert_eq!(
        actuator.status(),
        ActuatorStatus::offline(OfflineReason::BridgeOffline)
    );
    assert_eq!(actuator.polling_interval(), None);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(link.calls().get_transition, 2);
    assert_eq!(
        actuator.handle_command(PORT, Command::Close).await.unwrap(),
        CommandOutcome::Suppressed(SuppressReason::NotOnline)
    );
}
