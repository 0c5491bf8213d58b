//! Queue ordering guarantees of the scene processor

mod common;

use std::time::Duration;

use callaudio_core::{AudioEvent, TelCallState};
use common::{harness, position};

#[tokio::test]
async fn transitions_execute_in_submission_order_despite_slow_actions() {
    let h = harness();
    // every renderer start takes a while; ordering must still hold
    h.factory.set_play_delay(Duration::from_millis(100));

    h.context.call_state().add_call(1, TelCallState::Dialing);
    let scene = h.context.scene().clone();
    assert!(scene.process_event(AudioEvent::SwitchDialingState));
    assert!(scene.process_event(AudioEvent::SwitchAlertingState));

    tokio::time::sleep(Duration::from_millis(400)).await;
    let actions = h.actions.actions();
    assert!(
        position(&actions, "play:soundtone") < position(&actions, "play:tone:RingbackTone"),
        "dialing entry action must complete before alerting entry action"
    );
}

#[tokio::test]
async fn submission_returns_immediately_and_reports_success() {
    let h = harness();
    h.factory.set_play_delay(Duration::from_millis(200));

    let scene = h.context.scene().clone();
    let before = std::time::Instant::now();
    assert!(scene.process_event(AudioEvent::SwitchDialingState));
    assert!(before.elapsed() < Duration::from_millis(50));
}

#[tokio::test]
async fn submission_fails_after_shutdown() {
    let h = harness();
    let scene = h.context.scene().clone();
    h.context.shutdown();
    // give the abort a moment to land
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!scene.process_event(AudioEvent::SwitchDialingState));
}
