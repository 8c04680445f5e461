use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::{AlertMode, AlertStatus, Responder};
use crate::audit::LogEntry;
use crate::contacts::EmergencyContact;

/// Every state change in the system produces an Event.
/// Frontends consume them; nothing in the core reads them back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    EmergencyTriggered {
        mode: AlertMode,
        countdown: u32,
        epoch: u64,
        at: DateTime<Utc>,
    },
    CountdownTicked {
        remaining: u32,
        at: DateTime<Utc>,
    },
    /// Countdown reached zero and responders were dispatched.
    RescueDispatched {
        responders: Vec<Responder>,
        broadcast_fanout: Option<u32>,
        at: DateTime<Utc>,
    },
    EmergencyCancelled {
        from: AlertStatus,
        epoch: u64,
        at: DateTime<Utc>,
    },
    MonitoringChanged {
        status: AlertStatus,
        at: DateTime<Utc>,
    },
    Logged {
        entry: LogEntry,
    },
    ContactAdded {
        contact: EmergencyContact,
    },
    ContactRemoved {
        id: String,
    },
    AssistantReplied {
        text: String,
        /// Whether this reply escalated to an emergency trigger.
        alert: bool,
    },
    HavensUpdated {
        count: usize,
    },
    LocationUpdated {
        latitude: f64,
        longitude: f64,
        accuracy: f64,
    },
    SettingChanged {
        key: String,
        value: bool,
    },
    DecoyStarted {
        caller: String,
    },
    DecoyEnded {
        elapsed: String,
    },
    /// A command could not be carried out; state is unchanged.
    CommandRejected {
        command: String,
        reason: String,
    },
    StateSnapshot {
        status: AlertStatus,
        countdown: Option<u32>,
        camera_active: bool,
        responders: Vec<Responder>,
        epoch: u64,
        at: DateTime<Utc>,
    },
}

/// Side effects requested by the controller. Only the runtime touches
/// devices; everything upstream of it is plain state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    Speak { text: String },
    StartCamera,
    StopCamera,
    StartListening,
    StopListening,
    Publish { event: Event },
}

impl Effect {
    pub fn speak(text: impl Into<String>) -> Self {
        Effect::Speak { text: text.into() }
    }

    pub fn publish(event: Event) -> Self {
        Effect::Publish { event }
    }
}
