//! # Guardian Angel Core Library
//!
//! Core logic for the Guardian Angel personal-safety companion. Everything a
//! frontend can do is reachable from the CLI binary; a graphical shell would
//! be a thin layer over the same controller.
//!
//! ## Architecture
//!
//! - **Emergency Engine**: SAFE/MONITORING/DANGER/RESCUE state machine. Like
//!   a kitchen timer, it needs the caller to invoke `tick()` once per second
//! - **Event Log**: capped, newest-first audit trail of safety events
//! - **Contacts**: trusted guardians, validated on entry
//! - **Assistant**: chat session backed by danger/guidance/haven oracles
//! - **Runtime**: tokio task that owns the app and executes device effects
//! - **Storage**: TOML configuration
//!
//! ## Key Components
//!
//! - [`GuardianApp`]: controller that returns [`Effect`]s instead of doing I/O
//! - [`EmergencyEngine`]: the alert state machine
//! - [`Runtime`]: async driver for device streams, timers and oracles
//! - [`Config`]: application configuration management

pub mod alert;
pub mod app;
pub mod assistant;
pub mod audit;
pub mod contacts;
pub mod decoy;
pub mod devices;
pub mod error;
pub mod events;
pub mod oracle;
pub mod runtime;
pub mod storage;

pub use alert::{AlertMode, AlertSettings, AlertStatus, EmergencyEngine, Responder, ResponderKind};
pub use app::{Dashboard, GuardianApp, HavenRequest};
pub use assistant::{AssistantSession, ChatMessage, Role};
pub use audit::{EventLog, LogEntry, Severity};
pub use contacts::{ContactRegistry, EmergencyContact, NewContact};
pub use decoy::DecoyCall;
pub use error::{ConfigError, DeviceError, OracleError, ValidationError};
pub use events::{Effect, Event};
pub use oracle::{DangerAssessment, DangerLevel, GeminiClient, Oracles, SafeHaven};
pub use runtime::{Command, Devices, Runtime};
pub use storage::Config;
