//! Application controller.
//!
//! `GuardianApp` owns every piece of session state. Each input, whether from the
//! user, a device or an oracle, is a method that updates state and returns
//! the [`Effect`]s the runtime should carry out. Nothing in here blocks or
//! touches a device, so the whole thing is testable without a runtime.

use std::sync::Arc;

use serde::Serialize;

use crate::alert::{AlertStatus, EmergencyEngine, Responder};
use crate::assistant::{AssistantSession, ChatMessage, PendingTurn, TurnResolution, LOGGED_REPLY};
use crate::audit::{EventLog, LogEntry};
use crate::contacts::{ContactRegistry, EmergencyContact, NewContact};
use crate::decoy::DecoyCall;
use crate::devices::{parse_transcript, DeviceKind, LocationSample, LocationUpdate, RecognizerEvent, VoiceCommand};
use crate::error::ValidationError;
use crate::events::{Effect, Event};
use crate::oracle::{SafeHaven, MAX_HAVENS};
use crate::storage::Config;

const DEFAULT_LOCATION_LABEL: &str = "Current Location";

/// Coordinates for a haven search the runtime should perform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HavenRequest {
    pub seq: u64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Everything a frontend needs to draw the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub status: AlertStatus,
    pub countdown: Option<u32>,
    pub camera_active: bool,
    pub silent_mode: bool,
    pub community_broadcast: bool,
    pub voice_enabled: bool,
    pub location: Option<LocationSample>,
    pub responders: Vec<Responder>,
    pub contacts: Vec<EmergencyContact>,
    pub havens: Vec<SafeHaven>,
    pub searching_havens: bool,
    pub log: Vec<LogEntry>,
    pub transcript: Vec<ChatMessage>,
    pub assistant_loading: bool,
    pub decoy: Option<DecoyView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecoyView {
    pub caller: String,
    /// Avatar letter for the incoming-call screen.
    pub initial: Option<char>,
    pub elapsed: String,
}

#[derive(Debug)]
pub struct GuardianApp {
    engine: EmergencyEngine,
    contacts: ContactRegistry,
    assistant: AssistantSession,
    location: Option<LocationSample>,
    havens: Vec<SafeHaven>,
    haven_search: Option<u64>,
    next_haven_seq: u64,
    voice_enabled: bool,
    decoy: Option<DecoyCall>,
    decoy_caller: String,
    /// Highest log sequence already published as an event.
    published_seq: Option<u64>,
}

impl Default for GuardianApp {
    fn default() -> Self {
        Self::new(
            EmergencyEngine::default(),
            ContactRegistry::with_defaults(),
            "Dad (Guardian)",
        )
    }
}

impl GuardianApp {
    pub fn new(
        engine: EmergencyEngine,
        contacts: ContactRegistry,
        decoy_caller: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            contacts,
            assistant: AssistantSession::new(),
            location: None,
            havens: Vec::new(),
            haven_search: None,
            next_haven_seq: 1,
            voice_enabled: false,
            decoy: None,
            decoy_caller: decoy_caller.into(),
            published_seq: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let engine = EmergencyEngine::new(
            config.alert_settings(),
            Arc::new(config.directory()),
        );
        Self::new(engine, config.contact_registry(), config.decoy.caller_name.clone())
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn engine(&self) -> &EmergencyEngine {
        &self.engine
    }

    pub fn status(&self) -> AlertStatus {
        self.engine.status()
    }

    pub fn countdown(&self) -> Option<u32> {
        self.engine.countdown()
    }

    pub fn epoch(&self) -> u64 {
        self.engine.epoch()
    }

    pub fn responders(&self) -> &[Responder] {
        self.engine.responders()
    }

    pub fn log(&self) -> &EventLog {
        self.engine.log()
    }

    pub fn contacts(&self) -> &ContactRegistry {
        &self.contacts
    }

    pub fn assistant(&self) -> &AssistantSession {
        &self.assistant
    }

    pub fn location(&self) -> Option<&LocationSample> {
        self.location.as_ref()
    }

    pub fn havens(&self) -> &[SafeHaven] {
        &self.havens
    }

    pub fn is_searching_havens(&self) -> bool {
        self.haven_search.is_some()
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice_enabled
    }

    pub fn silent_mode(&self) -> bool {
        self.engine.settings().silent_mode
    }

    pub fn community_broadcast(&self) -> bool {
        self.engine.settings().community_broadcast
    }

    pub fn decoy(&self) -> Option<&DecoyCall> {
        self.decoy.as_ref()
    }

    pub fn snapshot(&self) -> Event {
        self.engine.snapshot()
    }

    pub fn dashboard(&self) -> Dashboard {
        Dashboard {
            status: self.engine.status(),
            countdown: self.engine.countdown(),
            camera_active: self.engine.camera_active(),
            silent_mode: self.silent_mode(),
            community_broadcast: self.community_broadcast(),
            voice_enabled: self.voice_enabled,
            location: self.location,
            responders: self.engine.responders().to_vec(),
            contacts: self.contacts.list().to_vec(),
            havens: self.havens.clone(),
            searching_havens: self.is_searching_havens(),
            log: self.engine.log().to_vec(),
            transcript: self.assistant.transcript().to_vec(),
            assistant_loading: self.assistant.is_loading(),
            decoy: self.decoy.as_ref().map(|d| DecoyView {
                caller: d.caller().to_string(),
                initial: d.initial(),
                elapsed: d.elapsed_label(),
            }),
        }
    }

    /// Label passed to the guidance oracle.
    pub fn location_label(&self) -> String {
        self.location
            .map(|l| l.label())
            .unwrap_or_else(|| DEFAULT_LOCATION_LABEL.to_string())
    }

    // ── Emergency ────────────────────────────────────────────────────

    pub fn trigger(&mut self) -> Vec<Effect> {
        self.engine.trigger()
    }

    pub fn cancel(&mut self) -> Vec<Effect> {
        self.engine.cancel()
    }

    /// One-second countdown tick.
    pub fn tick(&mut self) -> Vec<Effect> {
        self.engine.tick()
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub fn toggle_silent(&mut self) -> Vec<Effect> {
        let value = !self.silent_mode();
        self.engine.set_silent_mode(value);
        vec![setting_changed("silent_mode", value)]
    }

    pub fn toggle_community(&mut self) -> Vec<Effect> {
        let value = !self.community_broadcast();
        self.engine.set_community_broadcast(value);
        vec![setting_changed("community_broadcast", value)]
    }

    // ── Voice ────────────────────────────────────────────────────────

    pub fn toggle_voice(&mut self) -> Vec<Effect> {
        self.voice_enabled = !self.voice_enabled;
        let mut effects = vec![setting_changed("voice_enabled", self.voice_enabled)];
        if self.voice_enabled {
            effects.push(Effect::StartListening);
            self.say(&mut effects, "Voice commands active.");
            effects.extend(self.engine.monitor());
        } else {
            effects.push(Effect::StopListening);
            effects.extend(self.engine.stand_down());
        }
        effects
    }

    pub fn on_recognizer(&mut self, event: RecognizerEvent) -> Vec<Effect> {
        match event {
            RecognizerEvent::Transcript(text) => self.on_transcript(&text),
            RecognizerEvent::Ended if self.voice_enabled => vec![Effect::StartListening],
            RecognizerEvent::Ended => Vec::new(),
            RecognizerEvent::Error(message) => self.device_failed(DeviceKind::Voice, &message),
        }
    }

    pub fn on_transcript(&mut self, transcript: &str) -> Vec<Effect> {
        let mut effects = Vec::new();
        for command in parse_transcript(transcript) {
            match command {
                VoiceCommand::Trigger => effects.extend(self.engine.trigger()),
                VoiceCommand::Cancel => effects.extend(self.engine.cancel()),
            }
        }
        effects
    }

    // ── Devices ──────────────────────────────────────────────────────

    pub fn on_location(&mut self, update: LocationUpdate) -> Vec<Effect> {
        match update {
            LocationUpdate::Fix(sample) => {
                self.location = Some(sample);
                vec![Effect::publish(Event::LocationUpdated {
                    latitude: sample.latitude,
                    longitude: sample.longitude,
                    accuracy: sample.accuracy,
                })]
            }
            LocationUpdate::Error(message) => self.device_failed(DeviceKind::Location, &message),
        }
    }

    /// A device API is missing, denied or broke. Logged; the feature goes
    /// inactive. The emergency path is unaffected.
    pub fn device_failed(&mut self, kind: DeviceKind, message: &str) -> Vec<Effect> {
        tracing::warn!(device = %kind, %message, "device failure");
        self.engine.log_mut().warning(format!("{kind}: {message}"));

        let mut effects = Vec::new();
        match kind {
            DeviceKind::Camera => self.engine.camera_lost(),
            DeviceKind::Voice if self.voice_enabled => {
                self.voice_enabled = false;
                effects.push(Effect::StopListening);
                effects.push(setting_changed("voice_enabled", false));
                effects.extend(self.engine.stand_down());
            }
            _ => {}
        }
        effects
    }

    // ── Contacts ─────────────────────────────────────────────────────

    /// Register a guardian. Invalid submissions change nothing and log nothing.
    pub fn add_contact(&mut self, contact: NewContact) -> Result<Vec<Effect>, ValidationError> {
        let contact = self.contacts.add(contact)?.clone();
        self.engine
            .log_mut()
            .info(format!("Guardian Added: {}", contact.name));

        let mut effects = Vec::new();
        self.say(
            &mut effects,
            &format!("Guardian {} registered successfully.", contact.name),
        );
        effects.push(Effect::publish(Event::ContactAdded { contact }));
        Ok(effects)
    }

    pub fn remove_contact(&mut self, id: &str) -> Vec<Effect> {
        match self.contacts.remove(id) {
            Some(removed) => {
                self.engine
                    .log_mut()
                    .info(format!("Guardian Removed: {}", removed.name));
                vec![Effect::publish(Event::ContactRemoved { id: removed.id })]
            }
            None => Vec::new(),
        }
    }

    // ── Assistant ────────────────────────────────────────────────────

    pub fn begin_turn(&mut self, input: &str) -> Option<PendingTurn> {
        self.assistant.begin_turn(input, self.engine.epoch())
    }

    /// Apply an oracle answer. A trigger request from a turn started before
    /// the latest trigger/cancel is discarded; the alert wording is kept only
    /// while an emergency is still underway.
    pub fn finish_turn(&mut self, resolution: TurnResolution) -> Vec<Effect> {
        let stale = resolution.epoch != self.engine.epoch();
        let (reply, trigger) = if resolution.trigger_alert && stale {
            tracing::info!(
                turn = resolution.turn_id,
                turn_epoch = resolution.epoch,
                epoch = self.engine.epoch(),
                "discarding stale alert request"
            );
            if self.engine.status().is_emergency() {
                (resolution.reply, false)
            } else {
                (LOGGED_REPLY.to_string(), false)
            }
        } else {
            (resolution.reply, resolution.trigger_alert)
        };

        if !self.assistant.finish_turn(resolution.turn_id, reply.clone()) {
            return Vec::new();
        }

        let mut effects = vec![Effect::publish(Event::AssistantReplied {
            text: reply,
            alert: trigger,
        })];
        if trigger {
            effects.extend(self.engine.trigger());
        }
        effects
    }

    // ── Safe havens ──────────────────────────────────────────────────

    /// Start a search around the current position. Needs a location fix and
    /// no search already in flight.
    pub fn begin_haven_search(&mut self) -> Option<HavenRequest> {
        let location = self.location?;
        if self.haven_search.is_some() {
            return None;
        }
        let seq = self.next_haven_seq;
        self.next_haven_seq += 1;
        self.haven_search = Some(seq);
        self.engine.log_mut().info("Scanning for Nearby Safe Havens");
        Some(HavenRequest {
            seq,
            latitude: location.latitude,
            longitude: location.longitude,
        })
    }

    pub fn finish_haven_search(&mut self, seq: u64, mut havens: Vec<SafeHaven>) -> Vec<Effect> {
        if self.haven_search != Some(seq) {
            tracing::debug!(seq, "dropping superseded haven results");
            return Vec::new();
        }
        self.haven_search = None;
        havens.truncate(MAX_HAVENS);
        self.havens = havens;
        self.engine
            .log_mut()
            .info(format!("Safety Grounding: {} sites found", self.havens.len()));
        vec![Effect::publish(Event::HavensUpdated {
            count: self.havens.len(),
        })]
    }

    /// Clear the board. A search still in flight is abandoned.
    pub fn clear_havens(&mut self) -> Vec<Effect> {
        self.havens.clear();
        self.haven_search = None;
        vec![Effect::publish(Event::HavensUpdated { count: 0 })]
    }

    // ── Decoy call ───────────────────────────────────────────────────

    pub fn start_decoy(&mut self) -> Vec<Effect> {
        if self.decoy.is_some() {
            return Vec::new();
        }
        self.decoy = Some(DecoyCall::new(self.decoy_caller.clone()));
        vec![Effect::publish(Event::DecoyStarted {
            caller: self.decoy_caller.clone(),
        })]
    }

    pub fn tick_decoy(&mut self) {
        if let Some(call) = self.decoy.as_mut() {
            call.tick();
        }
    }

    pub fn end_decoy(&mut self) -> Vec<Effect> {
        match self.decoy.take() {
            Some(call) => vec![Effect::publish(Event::DecoyEnded {
                elapsed: call.elapsed_label(),
            })],
            None => Vec::new(),
        }
    }

    // ── Audit publishing ─────────────────────────────────────────────

    /// Log entries appended since the last call, oldest first, as events.
    pub fn take_log_events(&mut self) -> Vec<Effect> {
        let seen = self.published_seq;
        let mut fresh: Vec<&LogEntry> = self
            .engine
            .log()
            .entries()
            .take_while(|e| seen.map_or(true, |seen| e.seq > seen))
            .collect();
        fresh.reverse();
        if let Some(last) = fresh.last() {
            self.published_seq = Some(last.seq);
        }
        fresh
            .into_iter()
            .map(|entry| {
                Effect::publish(Event::Logged {
                    entry: entry.clone(),
                })
            })
            .collect()
    }

    fn say(&self, effects: &mut Vec<Effect>, text: &str) {
        if !self.silent_mode() {
            effects.push(Effect::speak(text));
        }
    }
}

fn setting_changed(key: &str, value: bool) -> Effect {
    Effect::publish(Event::SettingChanged {
        key: key.to_string(),
        value,
    })
}
