//! Behavioural tests for the age controller, driven through its public
//! handle with a paused Tokio clock.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use agegate_core::config::GateConfig;
use agegate_core::{
    AgeController, AgeEventChannel, ControllerConfig, ControllerError, ControllerHandle,
    Diagnostic, MemoryStore, RejectReason, StoreError,
};
use agegate_types::{AgeEvent, DisplayBucket};
use tokio::sync::broadcast;
use tokio::time::Instant;

const DELAY: Duration = Duration::from_secs(30);

fn start(config: ControllerConfig) -> (AgeEventChannel, MemoryStore, ControllerHandle) {
    let channel = AgeEventChannel::new("CY_FACE_AGE_RESULT", 16);
    let store = MemoryStore::new();
    let handle = AgeController::spawn(&channel, Arc::new(store.clone()), config);
    (channel, store, handle)
}

async fn identify(handle: &ControllerHandle, name: &str) {
    handle.edit_name(name).await.unwrap();
    handle.blur().await.unwrap();
    let expected = name.trim().to_owned();
    handle
        .wait_for(|view| view.user_name == expected && !view.typing)
        .await
        .unwrap();
}

async fn next(diagnostics: &mut broadcast::Receiver<Diagnostic>) -> Diagnostic {
    diagnostics.recv().await.unwrap()
}

#[tokio::test(start_paused = true)]
async fn accepted_event_updates_display_and_writes() {
    let (channel, store, handle) = start(ControllerConfig::default());
    let mut diagnostics = handle.diagnostics();
    identify(&handle, "Alice").await;

    assert_eq!(channel.publish(AgeEvent::new(37.9)), 1);

    let expected = DisplayBucket {
        value: 37,
        lower: 30,
        upper: 40,
    };
    assert!(matches!(
        next(&mut diagnostics).await,
        Diagnostic::Accepted { bucket, malformed: false, .. } if bucket == expected
    ));
    assert!(matches!(
        next(&mut diagnostics).await,
        Diagnostic::WriteSucceeded { .. }
    ));

    let view = handle.wait_for(|view| view.cooldown).await.unwrap();
    assert_eq!(view.bucket, expected);
    assert!(view.timer_armed);
    assert_eq!(view.writes_in_flight, 0);

    let readings = store.readings().await;
    assert_eq!(readings.len(), 1);
    let reading = readings.first().unwrap();
    assert_eq!(reading.user_name.as_deref(), Some("Alice"));
    assert_eq!(reading.age, 37);
}

#[tokio::test(start_paused = true)]
async fn missing_identity_is_rejected_without_side_effects() {
    let (channel, store, handle) = start(ControllerConfig::default());
    let mut diagnostics = handle.diagnostics();

    channel.publish(AgeEvent::new(42.0));

    assert_eq!(
        next(&mut diagnostics).await,
        Diagnostic::Rejected {
            reason: RejectReason::MissingIdentity,
            numeric_age: Some(42.0),
        }
    );
    let view = handle.view();
    assert!(view.bucket.is_idle());
    assert!(!view.cooldown);
    assert!(!view.timer_armed);
    assert_eq!(store.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn whitespace_label_counts_as_missing() {
    let (channel, store, handle) = start(ControllerConfig::default());
    let mut diagnostics = handle.diagnostics();
    identify(&handle, "   ").await;

    channel.publish(AgeEvent::new(42.0));

    assert!(matches!(
        next(&mut diagnostics).await,
        Diagnostic::Rejected {
            reason: RejectReason::MissingIdentity,
            ..
        }
    ));
    assert!(store.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn label_is_trimmed() {
    let (_channel, _store, handle) = start(ControllerConfig::default());
    identify(&handle, "  Bob ").await;
    assert_eq!(handle.view().user_name, "Bob");
}

#[tokio::test(start_paused = true)]
async fn typing_blocks_acceptance_until_blur() {
    let (channel, store, handle) = start(ControllerConfig::default());
    let mut diagnostics = handle.diagnostics();

    handle.edit_name("Al").await.unwrap();
    handle.wait_for(|view| view.typing).await.unwrap();
    channel.publish(AgeEvent::new(30.0));
    assert!(matches!(
        next(&mut diagnostics).await,
        Diagnostic::Rejected {
            reason: RejectReason::Typing,
            ..
        }
    ));

    handle.blur().await.unwrap();
    handle.wait_for(|view| !view.typing).await.unwrap();
    channel.publish(AgeEvent::new(30.0));
    assert!(matches!(
        next(&mut diagnostics).await,
        Diagnostic::Accepted { .. }
    ));
    assert!(matches!(
        next(&mut diagnostics).await,
        Diagnostic::WriteSucceeded { .. }
    ));
    assert_eq!(store.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn focus_marks_the_field_as_typing() {
    let (_channel, _store, handle) = start(ControllerConfig::default());
    handle.focus().await.unwrap();
    assert!(handle.wait_for(|view| view.typing).await.unwrap().typing);
    handle.blur().await.unwrap();
    assert!(!handle.wait_for(|view| !view.typing).await.unwrap().typing);
}

#[tokio::test(start_paused = true)]
async fn cooldown_rejects_until_the_window_expires() {
    let (channel, store, handle) = start(ControllerConfig::default());
    let mut diagnostics = handle.diagnostics();
    identify(&handle, "Alice").await;

    let started = Instant::now();
    channel.publish(AgeEvent::new(37.9));
    assert!(matches!(next(&mut diagnostics).await, Diagnostic::Accepted { .. }));
    assert!(matches!(
        next(&mut diagnostics).await,
        Diagnostic::WriteSucceeded { .. }
    ));

    channel.publish(AgeEvent::new(52.0));
    assert!(matches!(
        next(&mut diagnostics).await,
        Diagnostic::Rejected {
            reason: RejectReason::Cooldown,
            ..
        }
    ));
    assert_eq!(store.attempts(), 1);

    assert_eq!(
        next(&mut diagnostics).await,
        Diagnostic::Expired { window: 1 }
    );
    assert_eq!(Instant::now().duration_since(started), DELAY);
    let view = handle.view();
    assert_eq!(view.bucket, DisplayBucket::IDLE);
    assert!(!view.cooldown);
    assert!(!view.timer_armed);

    channel.publish(AgeEvent::new(52.0));
    assert!(matches!(
        next(&mut diagnostics).await,
        Diagnostic::Accepted { bucket, .. } if bucket.value == 52
    ));
}

#[tokio::test(start_paused = true)]
async fn accepted_events_extend_a_single_window() {
    let gate = GateConfig {
        cooldown_enabled: false,
        ..GateConfig::default()
    };
    let (channel, store, handle) = start(ControllerConfig::default().with_gate(gate));
    let mut diagnostics = handle.diagnostics();
    identify(&handle, "Alice").await;

    let started = Instant::now();
    channel.publish(AgeEvent::new(20.0));
    handle.wait_for(|view| view.timer_armed && view.writes_in_flight == 0).await.unwrap();
    tokio::time::sleep(Duration::from_secs(20)).await;
    channel.publish(AgeEvent::new(25.0));

    loop {
        let diagnostic = next(&mut diagnostics).await;
        assert!(
            !matches!(diagnostic, Diagnostic::Rejected { .. }),
            "cooldown is disabled"
        );
        if diagnostic == (Diagnostic::Expired { window: 1 }) {
            break;
        }
    }
    assert_eq!(
        Instant::now().duration_since(started),
        Duration::from_secs(50)
    );
    assert_eq!(store.len().await, 2);
}

#[tokio::test(start_paused = true)]
async fn malformed_event_displays_zero_and_still_writes() {
    let config = ControllerConfig::default().with_gate(GateConfig::minimal());
    let (channel, store, handle) = start(config);
    let mut diagnostics = handle.diagnostics();

    channel.publish(AgeEvent::from_value(&serde_json::json!({ "detail": {} })));

    assert!(matches!(
        next(&mut diagnostics).await,
        Diagnostic::Accepted { bucket, malformed: true, .. }
            if bucket == DisplayBucket::IDLE
    ));
    assert!(matches!(
        next(&mut diagnostics).await,
        Diagnostic::WriteSucceeded { .. }
    ));
    let readings = store.readings().await;
    let reading = readings.first().unwrap();
    assert_eq!(reading.age, 0);
    assert_eq!(reading.user_name, None);

    // The zero display still belongs to an armed window with cooldown.
    let view = handle.wait_for(|view| view.cooldown).await.unwrap();
    assert!(view.bucket.is_idle());
    assert!(view.timer_armed);
}

#[tokio::test(start_paused = true)]
async fn anonymous_sessions_attach_a_label_when_present() {
    let config = ControllerConfig::default().with_gate(GateConfig::minimal());
    let (channel, store, handle) = start(config);
    let mut diagnostics = handle.diagnostics();
    identify(&handle, "Carol").await;

    channel.publish(AgeEvent::new(61.2));
    assert!(matches!(next(&mut diagnostics).await, Diagnostic::Accepted { .. }));
    assert!(matches!(
        next(&mut diagnostics).await,
        Diagnostic::WriteSucceeded { .. }
    ));
    let readings = store.readings().await;
    assert_eq!(readings.first().unwrap().user_name.as_deref(), Some("Carol"));
}

#[tokio::test(start_paused = true)]
async fn failed_write_keeps_display_and_skips_cooldown() {
    let (channel, store, handle) = start(ControllerConfig::default());
    let mut diagnostics = handle.diagnostics();
    identify(&handle, "Alice").await;
    store.set_failing(true);

    channel.publish(AgeEvent::new(37.9));
    assert!(matches!(next(&mut diagnostics).await, Diagnostic::Accepted { .. }));
    assert!(matches!(
        next(&mut diagnostics).await,
        Diagnostic::WriteFailed {
            error: StoreError::Unavailable(_),
            ..
        }
    ));

    let view = handle.view();
    assert_eq!(view.bucket.value, 37);
    assert!(!view.cooldown);
    assert_eq!(view.writes_in_flight, 0);

    // The failure does not poison later writes.
    store.set_failing(false);
    channel.publish(AgeEvent::new(38.1));
    assert!(matches!(next(&mut diagnostics).await, Diagnostic::Accepted { .. }));
    assert!(matches!(
        next(&mut diagnostics).await,
        Diagnostic::WriteSucceeded { .. }
    ));
    assert_eq!(store.len().await, 1);
    assert!(handle.view().cooldown);
}

#[tokio::test(start_paused = true)]
async fn slow_write_times_out() {
    let config = ControllerConfig::default().with_write_timeout(Some(Duration::from_secs(10)));
    let (channel, store, handle) = start(config);
    let mut diagnostics = handle.diagnostics();
    identify(&handle, "Alice").await;
    store.set_latency(Duration::from_secs(20));

    channel.publish(AgeEvent::new(44.0));
    assert!(matches!(next(&mut diagnostics).await, Diagnostic::Accepted { .. }));
    assert!(matches!(
        next(&mut diagnostics).await,
        Diagnostic::WriteFailed {
            error: StoreError::Timeout { timeout_ms: 10_000 },
            ..
        }
    ));
    assert!(!handle.view().cooldown);
    assert!(store.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn completion_from_an_expired_window_is_ignored() {
    let config = ControllerConfig::default().with_write_timeout(None);
    let (channel, store, handle) = start(config);
    let mut diagnostics = handle.diagnostics();
    identify(&handle, "Alice").await;
    store.set_latency(Duration::from_secs(40));

    channel.publish(AgeEvent::new(37.9));
    assert!(matches!(next(&mut diagnostics).await, Diagnostic::Accepted { .. }));
    assert_eq!(
        next(&mut diagnostics).await,
        Diagnostic::Expired { window: 1 }
    );
    assert!(matches!(
        next(&mut diagnostics).await,
        Diagnostic::StaleCompletion {
            issued_window: 0,
            current_window: 1,
            committed: true,
            ..
        }
    ));

    let view = handle
        .wait_for(|view| view.writes_in_flight == 0)
        .await
        .unwrap();
    assert!(view.bucket.is_idle());
    assert!(!view.cooldown);
    assert!(!view.timer_armed);
    assert_eq!(store.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_releases_the_subscription() {
    let (channel, _store, handle) = start(ControllerConfig::default());
    assert_eq!(channel.listener_count(), 1);

    handle.shutdown().await;

    assert_eq!(channel.listener_count(), 0);
    assert!(!handle.is_running());
    assert_eq!(channel.publish(AgeEvent::new(30.0)), 0);
    assert_eq!(handle.edit_name("Alice").await, Err(ControllerError::Stopped));
    // A second shutdown is a no-op.
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn write_finishing_after_shutdown_is_a_no_op() {
    let config = ControllerConfig::default().with_write_timeout(None);
    let (channel, store, handle) = start(config);
    let mut diagnostics = handle.diagnostics();
    identify(&handle, "Alice").await;
    store.set_latency(Duration::from_secs(5));

    channel.publish(AgeEvent::new(37.9));
    assert!(matches!(next(&mut diagnostics).await, Diagnostic::Accepted { .. }));
    handle.shutdown().await;

    // The write itself is not cancelled; its completion has nowhere to go.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(store.len().await, 1);
    assert_eq!(channel.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_stops_the_controller() {
    let (channel, _store, handle) = start(ControllerConfig::default());
    let mut view = handle.watch();
    drop(handle);

    while view.changed().await.is_ok() {}
    assert_eq!(channel.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_channel_stops_the_controller() {
    let (channel, _store, handle) = start(ControllerConfig::default());
    drop(channel);
    handle.stopped().await;
    assert!(!handle.is_running());
}
