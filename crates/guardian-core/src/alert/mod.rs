mod engine;
mod responders;
mod status;

pub use engine::{AlertSettings, EmergencyEngine, DEFAULT_COUNTDOWN_SECS};
pub use responders::{Dispatch, Responder, ResponderDirectory, ResponderKind, StaticDirectory};
pub use status::{AlertMode, AlertStatus};
