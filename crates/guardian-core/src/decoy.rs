//! Decoy call: a fake in-progress phone call used as social camouflage.
//! Independent of the emergency state machine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoyCall {
    caller: String,
    elapsed_secs: u64,
}

impl DecoyCall {
    pub fn new(caller: impl Into<String>) -> Self {
        Self {
            caller: caller.into(),
            elapsed_secs: 0,
        }
    }

    pub fn caller(&self) -> &str {
        &self.caller
    }

    /// Letter shown in the caller's avatar.
    pub fn initial(&self) -> Option<char> {
        self.caller.chars().next()
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    /// Advance the call clock by one second.
    pub fn tick(&mut self) {
        self.elapsed_secs += 1;
    }

    pub fn elapsed_label(&self) -> String {
        format_call_time(self.elapsed_secs)
    }
}

/// `m:ss`, minutes unbounded.
pub fn format_call_time(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
