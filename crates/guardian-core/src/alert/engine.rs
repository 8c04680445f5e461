//! Emergency state machine.
//!
//! Like a kitchen timer, the engine has no thread of its own: the caller
//! invokes `tick()` once per second while a countdown is pending.
//!
//! ## State Transitions
//!
//! ```text
//! Safe <-> Monitoring
//! (Safe | Monitoring) -> Danger -> RescueInProgress -> Safe
//!                        Danger -> Safe  (cancel before the countdown expires)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = EmergencyEngine::new(AlertSettings::default(), directory);
//! let effects = engine.trigger();
//! // Once per second:
//! engine.tick(); // escalates when the countdown reaches zero
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::responders::{Responder, ResponderDirectory, StaticDirectory};
use super::status::{AlertMode, AlertStatus};
use crate::audit::EventLog;
use crate::events::{Effect, Event};

pub const DEFAULT_COUNTDOWN_SECS: u32 = 5;

const SAY_TRIGGERED: &str = "SOS Initiated. Camera feed broadcasting.";
const SAY_CANCELLED: &str = "Alert deactivated.";
const SAY_DISPATCHED: &str = "Police units and nearby guardians are responding.";

/// Toggles that shape side effects but never the state itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSettings {
    pub countdown_secs: u32,
    pub silent_mode: bool,
    pub community_broadcast: bool,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            silent_mode: false,
            community_broadcast: true,
        }
    }
}

/// Core emergency engine. Owns the audit trail it writes to.
#[derive(Clone)]
pub struct EmergencyEngine {
    settings: AlertSettings,
    status: AlertStatus,
    countdown: Option<u32>,
    camera_active: bool,
    responders: Vec<Responder>,
    /// Bumped on every effective trigger and every cancel. Async work
    /// started under an older epoch must not act on the emergency.
    epoch: u64,
    log: EventLog,
    directory: Arc<dyn ResponderDirectory>,
}

impl fmt::Debug for EmergencyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmergencyEngine")
            .field("settings", &self.settings)
            .field("status", &self.status)
            .field("countdown", &self.countdown)
            .field("camera_active", &self.camera_active)
            .field("responders", &self.responders.len())
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

impl Default for EmergencyEngine {
    fn default() -> Self {
        Self::new(AlertSettings::default(), Arc::new(StaticDirectory::default()))
    }
}

impl EmergencyEngine {
    pub fn new(settings: AlertSettings, directory: Arc<dyn ResponderDirectory>) -> Self {
        Self {
            settings,
            status: AlertStatus::Safe,
            countdown: None,
            camera_active: false,
            responders: Vec::new(),
            epoch: 0,
            log: EventLog::new(),
            directory,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> AlertStatus {
        self.status
    }

    pub fn countdown(&self) -> Option<u32> {
        self.countdown
    }

    pub fn camera_active(&self) -> bool {
        self.camera_active
    }

    pub fn responders(&self) -> &[Responder] {
        &self.responders
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn settings(&self) -> &AlertSettings {
        &self.settings
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut EventLog {
        &mut self.log
    }

    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            status: self.status,
            countdown: self.countdown,
            camera_active: self.camera_active,
            responders: self.responders.clone(),
            epoch: self.epoch,
            at: Utc::now(),
        }
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub fn set_silent_mode(&mut self, silent: bool) {
        self.settings.silent_mode = silent;
    }

    pub fn set_community_broadcast(&mut self, enabled: bool) {
        self.settings.community_broadcast = enabled;
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the escalation countdown. Ignored while an emergency is
    /// already underway.
    pub fn trigger(&mut self) -> Vec<Effect> {
        if self.status.is_emergency() {
            tracing::debug!(status = %self.status, "trigger ignored");
            return Vec::new();
        }

        let mode = AlertMode::from_silent(self.settings.silent_mode);
        self.status = AlertStatus::Danger;
        self.camera_active = true;
        self.countdown = Some(self.settings.countdown_secs);
        self.epoch += 1;

        self.log.critical(format!("Emergency Protocol: {mode} SOS"));
        if self.settings.community_broadcast {
            self.log.warning("Preparing community-wide GPS broadcast");
        }
        tracing::info!(%mode, epoch = self.epoch, "emergency triggered");

        let mut effects = vec![
            Effect::publish(Event::EmergencyTriggered {
                mode,
                countdown: self.settings.countdown_secs,
                epoch: self.epoch,
                at: Utc::now(),
            }),
            Effect::StartCamera,
        ];
        self.say(&mut effects, SAY_TRIGGERED);

        // A zero-length countdown escalates immediately.
        if self.settings.countdown_secs == 0 {
            effects.extend(self.escalate());
        }
        effects
    }

    /// Advance the countdown by one second. Escalates on reaching zero.
    pub fn tick(&mut self) -> Vec<Effect> {
        let Some(remaining) = self.countdown else {
            return Vec::new();
        };
        let remaining = remaining.saturating_sub(1);
        self.countdown = Some(remaining);

        let mut effects = vec![Effect::publish(Event::CountdownTicked {
            remaining,
            at: Utc::now(),
        })];
        if remaining == 0 {
            effects.extend(self.escalate());
        }
        effects
    }

    /// Abort whatever is happening and return to `Safe`.
    pub fn cancel(&mut self) -> Vec<Effect> {
        let from = self.status;
        self.countdown = None;
        self.status = AlertStatus::Safe;
        self.camera_active = false;
        self.responders.clear();
        self.epoch += 1;

        self.log.info("Status: SAFE");
        tracing::info!(%from, epoch = self.epoch, "emergency cancelled");

        let mut effects = vec![
            Effect::publish(Event::EmergencyCancelled {
                from,
                epoch: self.epoch,
                at: Utc::now(),
            }),
            Effect::StopCamera,
        ];
        self.say(&mut effects, SAY_CANCELLED);
        effects
    }

    /// Arm passive monitoring. Only valid from `Safe`.
    pub fn monitor(&mut self) -> Vec<Effect> {
        if self.status != AlertStatus::Safe {
            return Vec::new();
        }
        self.status = AlertStatus::Monitoring;
        self.log.info("Status: MONITORING");
        vec![Effect::publish(Event::MonitoringChanged {
            status: self.status,
            at: Utc::now(),
        })]
    }

    /// Leave passive monitoring. Only valid from `Monitoring`.
    pub fn stand_down(&mut self) -> Vec<Effect> {
        if self.status != AlertStatus::Monitoring {
            return Vec::new();
        }
        self.status = AlertStatus::Safe;
        self.log.info("Status: SAFE");
        vec![Effect::publish(Event::MonitoringChanged {
            status: self.status,
            at: Utc::now(),
        })]
    }

    /// Record that the camera could not be kept running.
    pub fn camera_lost(&mut self) {
        self.camera_active = false;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn escalate(&mut self) -> Vec<Effect> {
        self.status = AlertStatus::RescueInProgress;
        self.countdown = None;

        let dispatch = self.directory.dispatch(self.settings.community_broadcast);
        if let Some(fanout) = dispatch.broadcast_fanout {
            self.log.critical(format!(
                "GPS BROADCAST: Exact coordinates sent to {fanout} nearby users"
            ));
        }
        self.responders = dispatch.responders;
        self.log.critical("Alerting Local Authorities & Net");
        tracing::info!(
            responders = self.responders.len(),
            epoch = self.epoch,
            "rescue dispatched"
        );

        let mut effects = vec![Effect::publish(Event::RescueDispatched {
            responders: self.responders.clone(),
            broadcast_fanout: dispatch.broadcast_fanout,
            at: Utc::now(),
        })];
        self.say(&mut effects, SAY_DISPATCHED);
        effects
    }

    fn say(&self, effects: &mut Vec<Effect>, text: &str) {
        if !self.settings.silent_mode {
            effects.push(Effect::speak(text));
        }
    }
}
