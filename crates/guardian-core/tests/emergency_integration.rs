//! Integration tests for the emergency lifecycle as seen through the
//! application controller.

use guardian_core::events::{Effect, Event};
use guardian_core::{
    AlertStatus, GuardianApp, NewContact, ResponderKind, Severity, ValidationError,
};
use proptest::prelude::*;

fn speeches(effects: &[Effect]) -> Vec<String> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Speak { text } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_loud_community_trigger_logs_protocol_and_broadcast() {
    let mut app = GuardianApp::default();
    let effects = app.trigger();

    assert_eq!(app.status(), AlertStatus::Danger);
    assert_eq!(app.countdown(), Some(5));
    assert!(app.engine().camera_active());

    let log: Vec<_> = app.log().entries().collect();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].event, "Preparing community-wide GPS broadcast");
    assert_eq!(log[0].severity, Severity::Warning);
    assert_eq!(log[1].event, "Emergency Protocol: LOUD SOS");
    assert_eq!(log[1].severity, Severity::Critical);

    assert_eq!(speeches(&effects), vec!["SOS Initiated. Camera feed broadcasting."]);
}

#[test]
fn test_five_ticks_dispatch_three_responders() {
    let mut app = GuardianApp::default();
    app.trigger();
    for remaining in (1..5).rev() {
        app.tick();
        assert_eq!(app.countdown(), Some(remaining));
        assert_eq!(app.status(), AlertStatus::Danger);
    }
    let effects = app.tick();

    assert_eq!(app.status(), AlertStatus::RescueInProgress);
    assert_eq!(app.countdown(), None);
    assert_eq!(app.responders().len(), 3);
    assert_eq!(
        app.responders()
            .iter()
            .filter(|r| r.kind == ResponderKind::Citizen)
            .count(),
        2
    );
    assert_eq!(
        app.log().latest().unwrap().event,
        "Alerting Local Authorities & Net"
    );
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Publish { event: Event::RescueDispatched { broadcast_fanout: Some(12), .. } }
    )));
}

#[test]
fn test_silent_private_trigger_is_quiet() {
    let mut app = GuardianApp::default();
    app.toggle_silent();
    app.toggle_community();

    let mut effects = app.trigger();
    for _ in 0..5 {
        effects.extend(app.tick());
    }
    effects.extend(app.cancel());

    assert!(speeches(&effects).is_empty());
    assert!(app
        .log()
        .entries()
        .any(|e| e.event == "Emergency Protocol: SILENT SOS"));
    assert!(!app
        .log()
        .entries()
        .any(|e| e.event.starts_with("GPS BROADCAST")));
}

#[test]
fn test_private_dispatch_has_baseline_only() {
    let mut app = GuardianApp::default();
    app.toggle_community();
    app.trigger();
    for _ in 0..5 {
        app.tick();
    }
    assert_eq!(app.responders().len(), 2);
}

#[test]
fn test_trigger_during_emergency_is_ignored() {
    let mut app = GuardianApp::default();
    app.trigger();
    app.tick();
    let epoch = app.epoch();
    assert!(app.trigger().is_empty());
    assert_eq!(app.countdown(), Some(4));
    assert_eq!(app.epoch(), epoch);
}

#[test]
fn test_cancel_mid_countdown_resets_to_safe() {
    let mut app = GuardianApp::default();
    app.trigger();
    app.tick();
    app.tick();
    let effects = app.cancel();

    assert_eq!(app.status(), AlertStatus::Safe);
    assert_eq!(app.countdown(), None);
    assert!(app.responders().is_empty());
    assert!(!app.engine().camera_active());
    assert_eq!(app.log().latest().unwrap().event, "Status: SAFE");
    assert!(effects.iter().any(|e| matches!(e, Effect::StopCamera)));
    assert_eq!(speeches(&effects), vec!["Alert deactivated."]);

    // Further ticks do nothing.
    assert!(app.tick().is_empty());
    assert_eq!(app.status(), AlertStatus::Safe);
}

#[test]
fn test_invalid_contact_leaves_registry_untouched() {
    let mut app = GuardianApp::default();
    let before = app.contacts().list().to_vec();

    let err = app
        .add_contact(NewContact::new("Sam", "", "Friend"))
        .unwrap_err();

    assert_eq!(err, ValidationError::EmptyField("phone"));
    assert_eq!(app.contacts().list(), before.as_slice());
    assert!(app.log().is_empty());
}

#[test]
fn test_log_keeps_ten_newest() {
    let mut app = GuardianApp::default();
    for _ in 0..8 {
        app.trigger();
        app.cancel();
    }
    // 8 cycles x (critical + warning + info) = 24 entries appended.
    assert_eq!(app.log().len(), 10);
    let seqs: Vec<u64> = app.log().entries().map(|e| e.seq).collect();
    let mut sorted = seqs.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(seqs, sorted);
}

// ============================================================================
// State machine properties
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Op {
    Trigger,
    Cancel,
    Tick,
    Voice,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Trigger),
        1 => Just(Op::Cancel),
        6 => Just(Op::Tick),
        1 => Just(Op::Voice),
    ]
}

proptest! {
    #[test]
    fn prop_engine_invariants_hold(ops in proptest::collection::vec(op(), 0..80)) {
        let mut app = GuardianApp::default();
        let mut last_epoch = app.epoch();
        let mut last_countdown: Option<u32> = None;

        for op in ops {
            let before = app.status();
            match op {
                Op::Trigger => { app.trigger(); }
                Op::Cancel => { app.cancel(); }
                Op::Tick => { app.tick(); }
                Op::Voice => { app.toggle_voice(); }
            }
            let status = app.status();

            // Countdown exists exactly while in DANGER.
            prop_assert_eq!(app.countdown().is_some(), status == AlertStatus::Danger);
            // Responders exist exactly while rescue is underway.
            prop_assert_eq!(!app.responders().is_empty(), status == AlertStatus::RescueInProgress);
            prop_assert_eq!(app.engine().camera_active(), status.is_emergency());
            prop_assert!(app.log().len() <= 10);
            prop_assert!(app.epoch() >= last_epoch);

            // A tick moves the countdown down by exactly one.
            if let (Op::Tick, Some(prev)) = (op, last_countdown) {
                if prev > 1 {
                    prop_assert_eq!(app.countdown(), Some(prev - 1));
                } else {
                    prop_assert_eq!(status, AlertStatus::RescueInProgress);
                }
            }

            // RESCUE is only left through cancel.
            if before == AlertStatus::RescueInProgress && !matches!(op, Op::Cancel) {
                prop_assert_eq!(status, AlertStatus::RescueInProgress);
            }

            last_epoch = app.epoch();
            last_countdown = app.countdown();
        }
    }
}
