use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    #[default]
    Safe,
    /// Voice monitoring armed; no emergency yet.
    Monitoring,
    /// Countdown running; cancellable.
    Danger,
    /// Countdown expired and responders dispatched.
    RescueInProgress,
}

impl AlertStatus {
    /// Whether an emergency is underway (trigger is ignored in these states).
    pub fn is_emergency(self) -> bool {
        matches!(self, AlertStatus::Danger | AlertStatus::RescueInProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertStatus::Safe => "SAFE",
            AlertStatus::Monitoring => "MONITORING",
            AlertStatus::Danger => "DANGER",
            AlertStatus::RescueInProgress => "RESCUE_IN_PROGRESS",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an alert announces itself, fixed at trigger time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertMode {
    Silent,
    Loud,
}

impl AlertMode {
    pub fn from_silent(silent: bool) -> Self {
        if silent {
            AlertMode::Silent
        } else {
            AlertMode::Loud
        }
    }
}

impl fmt::Display for AlertMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertMode::Silent => f.write_str("SILENT"),
            AlertMode::Loud => f.write_str("LOUD"),
        }
    }
}
