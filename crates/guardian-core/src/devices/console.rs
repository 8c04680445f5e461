use std::sync::atomic::{AtomicBool, Ordering};

use super::{CameraCapture, SpeechOutput};
use crate::error::DeviceError;

/// Speech sink that writes utterances to the tracing log.
#[derive(Debug, Default)]
pub struct TracingSpeech;

impl SpeechOutput for TracingSpeech {
    fn speak(&self, text: &str) -> Result<(), DeviceError> {
        tracing::info!(target: "guardian::speech", "{text}");
        Ok(())
    }
}

/// Stand-in camera that only records whether it is capturing.
#[derive(Debug, Default)]
pub struct LoggingCamera {
    recording: AtomicBool,
}

impl LoggingCamera {
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }
}

impl CameraCapture for LoggingCamera {
    fn start(&self) -> Result<(), DeviceError> {
        self.recording.store(true, Ordering::SeqCst);
        tracing::info!(target: "guardian::camera", "capture started");
        Ok(())
    }

    fn stop(&self) {
        if self.recording.swap(false, Ordering::SeqCst) {
            tracing::info!(target: "guardian::camera", "capture stopped");
        }
    }
}

/// Camera that is never available.
#[derive(Debug, Default)]
pub struct UnavailableCamera;

impl CameraCapture for UnavailableCamera {
    fn start(&self) -> Result<(), DeviceError> {
        Err(DeviceError::Unavailable("video capture".into()))
    }

    fn stop(&self) {}
}
