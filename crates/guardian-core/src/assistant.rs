//! Conversational safety assistant.
//!
//! A turn is split in two so the oracle round-trip never holds the session:
//! `begin_turn` records the user message and hands out a [`PendingTurn`],
//! [`resolve_turn`] talks to the oracles without touching any state, and the
//! controller applies the [`TurnResolution`] afterwards. The turn carries the
//! emergency epoch it was started under so a late answer cannot re-trigger
//! an alert the user has since cancelled.

use serde::{Deserialize, Serialize};

use crate::oracle::{
    assess_or_default, guidance_or_fallback, DangerAssessment, DangerAssessor, GuidanceOracle,
};

pub const GREETING: &str =
    "I'm Guardian Angel. Tell me what's happening or where you are, and I'll keep watch.";
pub const ALERT_REPLY: &str =
    "⚠️ ALERT: High danger detected. Notifying emergency services and contacts now.";
pub const LOGGED_REPLY: &str = "I've logged this. Stay alert.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTurn {
    pub turn_id: u64,
    /// Emergency epoch when the user spoke.
    pub epoch: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnResolution {
    pub turn_id: u64,
    pub epoch: u64,
    pub assessment: DangerAssessment,
    pub reply: String,
    pub trigger_alert: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantSession {
    transcript: Vec<ChatMessage>,
    loading: Option<u64>,
    next_turn: u64,
}

impl Default for AssistantSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AssistantSession {
    pub fn new() -> Self {
        Self {
            transcript: vec![ChatMessage::assistant(GREETING)],
            loading: None,
            next_turn: 1,
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    /// Record a user message. Returns `None` for blank input or while a
    /// previous turn is still being analysed.
    pub fn begin_turn(&mut self, input: &str, epoch: u64) -> Option<PendingTurn> {
        if input.trim().is_empty() || self.loading.is_some() {
            return None;
        }
        let turn_id = self.next_turn;
        self.next_turn += 1;
        self.loading = Some(turn_id);
        self.transcript.push(ChatMessage::user(input));
        Some(PendingTurn {
            turn_id,
            epoch,
            text: input.to_string(),
        })
    }

    /// Append the reply for `turn_id` and clear the loading flag. Replies
    /// for any other turn are dropped.
    pub fn finish_turn(&mut self, turn_id: u64, reply: impl Into<String>) -> bool {
        if self.loading != Some(turn_id) {
            return false;
        }
        self.loading = None;
        self.transcript.push(ChatMessage::assistant(reply));
        true
    }
}

/// Run the oracle round-trip for a turn. Never fails: oracle errors collapse
/// into the safe defaults.
pub async fn resolve_turn(
    turn: PendingTurn,
    assessor: &dyn DangerAssessor,
    guidance: &dyn GuidanceOracle,
    location_label: &str,
) -> TurnResolution {
    let assessment = assess_or_default(assessor, &turn.text).await;

    let (reply, trigger_alert) = if assessment.should_trigger_alert {
        (ALERT_REPLY.to_string(), true)
    } else {
        let tips = guidance_or_fallback(guidance, location_label, &turn.text).await;
        if tips.trim().is_empty() {
            (LOGGED_REPLY.to_string(), false)
        } else {
            (tips, false)
        }
    };

    TurnResolution {
        turn_id: turn.turn_id,
        epoch: turn.epoch,
        assessment,
        reply,
        trigger_alert,
    }
}
