use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::subscription::Subscription;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceCommand {
    Trigger,
    Cancel,
}

/// Map a recognised phrase to commands, trigger first.
///
/// Matching is case-insensitive substring search: "help" or "sos" triggers,
/// "stop alert" cancels. A transcript may carry both.
pub fn parse_transcript(transcript: &str) -> Vec<VoiceCommand> {
    let lower = transcript.to_lowercase();
    let mut commands = Vec::new();
    if lower.contains("help") || lower.contains("sos") {
        commands.push(VoiceCommand::Trigger);
    }
    if lower.contains("stop alert") {
        commands.push(VoiceCommand::Cancel);
    }
    commands
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecognizerEvent {
    Transcript(String),
    /// Recognition stopped on its own; restart if voice mode is still on.
    Ended,
    Error(String),
}

/// Continuous speech recognition.
pub trait SpeechRecognizer: Send + Sync {
    fn listen(&self) -> Subscription<RecognizerEvent>;
}

/// Emits the given transcripts, then `Ended`, on the first `listen()`.
/// Later sessions hear nothing and stay open until cancelled, so a restart
/// after `Ended` does not replay the script.
#[derive(Debug, Default)]
pub struct ScriptedRecognizer {
    transcripts: Mutex<Option<Vec<String>>>,
}

impl ScriptedRecognizer {
    pub fn new<I, S>(transcripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            transcripts: Mutex::new(Some(transcripts.into_iter().map(Into::into).collect())),
        }
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn listen(&self) -> Subscription<RecognizerEvent> {
        let script = self
            .transcripts
            .lock()
            .map(|mut guard| guard.take())
            .unwrap_or_default();
        Subscription::spawn(|tx| async move {
            let Some(transcripts) = script else {
                tx.closed().await;
                return;
            };
            for t in transcripts {
                if tx.send(RecognizerEvent::Transcript(t)).is_err() {
                    return;
                }
            }
            let _ = tx.send(RecognizerEvent::Ended);
        })
    }
}
