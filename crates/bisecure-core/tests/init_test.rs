#![allow(clippy::unwrap_used)]
// Initialization retry loop on the paused tokio clock.

mod support;

use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::time::sleep;

use bisecure_api::Transition;
use bisecure_core::{ActuatorStatus, GatewayController, OfflineReason};

use support::{GROUP, Listing, ScriptedLink, gateway_config, quiet_polling, settle};

async fn connected(link: &std::sync::Arc<ScriptedLink>) -> GatewayController {
    let controller = GatewayController::new(gateway_config(quiet_polling()), link.clone());
    controller.initialize().await.unwrap();
    controller
}

#[tokio::test(start_paused = true)]
async fn retries_every_period_until_discovery_succeeds_once() {
    let link = ScriptedLink::new(Transition::settled(100));
    link.push_listing(Listing::Empty, 3);
    let controller = connected(&link).await;

    let actuator = controller.add_actuator(GROUP).await.unwrap();
    assert_eq!(actuator.status(), ActuatorStatus::Initializing);
    assert_eq!(actuator.init_attempts(), 1);

    sleep(Duration::from_secs(31)).await;
    assert_eq!(actuator.init_attempts(), 2);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(actuator.init_attempts(), 3);
    assert_eq!(actuator.status(), ActuatorStatus::Initializing);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(actuator.init_attempts(), 4);
    assert_eq!(actuator.status(), ActuatorStatus::Online);

    sleep(Duration::from_secs(300)).await;
    assert_eq!(actuator.init_attempts(), 4);
    assert_eq!(link.calls().list_groups, 4);
}

#[tokio::test(start_paused = true)]
async fn missing_group_is_a_configuration_error_and_never_retried() {
    let link = ScriptedLink::new(Transition::settled(100));
    let controller = connected(&link).await;

    let actuator = controller.add_actuator(99).await.unwrap();
    assert!(matches!(
        actuator.status(),
        ActuatorStatus::Offline {
            reason: OfflineReason::Configuration(_)
        }
    ));

    sleep(Duration::from_secs(120)).await;
    assert_eq!(actuator.init_attempts(), 1);
    assert_eq!(actuator.polling_interval(), None);
}

#[tokio::test(start_paused = true)]
async fn actuator_added_before_connect_comes_online_on_next_retry() {
    let link = ScriptedLink::new(Transition::settled(100));
    let controller = GatewayController::new(gateway_config(quiet_polling()), link.clone());

    let actuator = controller.add_actuator(GROUP).await.unwrap();
    assert_eq!(actuator.status(), ActuatorStatus::Initializing);
    assert_eq!(link.calls().list_groups, 0);

    sleep(Duration::from_secs(5)).await;
    controller.initialize().await.unwrap();
    assert_eq!(actuator.status(), ActuatorStatus::Initializing);

    sleep(Duration::from_secs(26)).await;
    assert_eq!(actuator.status(), ActuatorStatus::Online);
    assert_eq!(actuator.init_attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn failing_attempts_never_stop_the_loop() {
    let link = ScriptedLink::new(Transition::settled(100));
    link.push_listing(Listing::NotConnected, 1);
    link.push_listing(Listing::Panic, 1);
    link.push_listing(Listing::Empty, 1);
    let controller = connected(&link).await;

    let actuator = controller.add_actuator(GROUP).await.unwrap();
    sleep(Duration::from_secs(95)).await;

    assert_eq!(actuator.init_attempts(), 4);
    assert_eq!(actuator.status(), ActuatorStatus::Online);
}

#[tokio::test(start_paused = true)]
async fn dispose_cancels_the_retry_loop() {
    let link = ScriptedLink::new(Transition::settled(100));
    link.push_listing(Listing::Empty, 100);
    let controller = connected(&link).await;

    let actuator = controller.add_actuator(GROUP).await.unwrap();
    settle().await;
    controller.dispose().await;

    sleep(Duration::from_secs(300)).await;
    assert_eq!(actuator.init_attempts(), 1);
    assert!(actuator.is_disposed());
}
