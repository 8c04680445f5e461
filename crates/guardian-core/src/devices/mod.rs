//! Device seams: location, speech in/out and camera.
//!
//! The controller never calls these directly. It returns
//! [`Effect`](crate::events::Effect)s and the runtime executes them here,
//! reporting failures back so the feature can degrade.

mod console;
mod location;
mod subscription;
mod voice;

pub use console::{LoggingCamera, TracingSpeech, UnavailableCamera};
pub use location::{LocationSample, LocationSource, LocationUpdate, ScriptedLocation};
pub use subscription::Subscription;
pub use voice::{parse_transcript, RecognizerEvent, ScriptedRecognizer, SpeechRecognizer, VoiceCommand};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Location,
    Camera,
    Voice,
    Speech,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceKind::Location => "GPS",
            DeviceKind::Camera => "Camera",
            DeviceKind::Voice => "Voice",
            DeviceKind::Speech => "Speech",
        })
    }
}

/// Text-to-speech output.
pub trait SpeechOutput: Send + Sync {
    fn speak(&self, text: &str) -> Result<(), DeviceError>;
}

/// Video+audio capture bound to the emergency lifecycle.
pub trait CameraCapture: Send + Sync {
    fn start(&self) -> Result<(), DeviceError>;
    fn stop(&self);
}
