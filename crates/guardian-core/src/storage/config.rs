//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Alert behaviour (countdown length, silent mode, community broadcast)
//! - The responder roster handed out on escalation
//! - Oracle endpoint, model and credentials
//! - Voice monitoring, a fixed location and the decoy caller
//! - Seed emergency contacts
//!
//! Configuration is stored at `~/.config/guardian-angel/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::alert::{AlertSettings, Responder, StaticDirectory, DEFAULT_COUNTDOWN_SECS};
use crate::contacts::{default_contacts, ContactRegistry, NewContact};
use crate::devices::LocationSample;
use crate::error::ConfigError;
use crate::oracle::gemini::{DEFAULT_API_BASE, DEFAULT_MODEL};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u32,
    #[serde(default)]
    pub silent_mode: bool,
    #[serde(default = "default_true")]
    pub community_broadcast: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondersConfig {
    #[serde(default = "default_broadcast_fanout")]
    pub broadcast_fanout: u32,
    #[serde(default = "default_baseline")]
    pub baseline: Vec<Responder>,
    #[serde(default = "default_community")]
    pub community: Vec<Responder>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Inline key. Prefer `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// Fixed position used when no live location source is available.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoyConfig {
    #[serde(default = "default_caller_name")]
    pub caller_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSeed {
    pub name: String,
    pub phone: String,
    pub relation: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/guardian-angel/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default)]
    pub responders: RespondersConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub decoy: DecoyConfig,
    #[serde(default = "default_contact_seeds")]
    pub contacts: Vec<ContactSeed>,
}

// Default functions
fn default_countdown_secs() -> u32 {
    DEFAULT_COUNTDOWN_SECS
}
fn default_true() -> bool {
    true
}
fn default_broadcast_fanout() -> u32 {
    StaticDirectory::default().broadcast_fanout
}
fn default_baseline() -> Vec<Responder> {
    StaticDirectory::default().baseline
}
fn default_community() -> Vec<Responder> {
    StaticDirectory::default().community
}
fn default_api_base() -> String {
    DEFAULT_API_BASE.into()
}
fn default_model() -> String {
    DEFAULT_MODEL.into()
}
fn default_api_key_env() -> String {
    "API_KEY".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_caller_name() -> String {
    "Dad (Guardian)".into()
}
fn default_contact_seeds() -> Vec<ContactSeed> {
    default_contacts()
        .into_iter()
        .map(|c| ContactSeed {
            name: c.name,
            phone: c.phone,
            relation: c.relation,
        })
        .collect()
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            countdown_secs: default_countdown_secs(),
            silent_mode: false,
            community_broadcast: true,
        }
    }
}

impl Default for RespondersConfig {
    fn default() -> Self {
        let stock = StaticDirectory::default();
        Self {
            broadcast_fanout: stock.broadcast_fanout,
            baseline: stock.baseline,
            community: stock.community,
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DecoyConfig {
    fn default() -> Self {
        Self {
            caller_name: default_caller_name(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alert: AlertConfig::default(),
            responders: RespondersConfig::default(),
            oracle: OracleConfig::default(),
            voice: VoiceConfig::default(),
            location: LocationConfig::default(),
            decoy: DecoyConfig::default(),
            contacts: default_contact_seeds(),
        }
    }
}

impl OracleConfig {
    /// Inline key, then `api_key_env`, then `GEMINI_API_KEY`. Blank values
    /// count as missing.
    pub fn resolve_api_key(&self) -> Option<String> {
        let non_blank = |s: String| {
            let s = s.trim().to_string();
            (!s.is_empty()).then_some(s)
        };
        self.api_key
            .clone()
            .and_then(non_blank)
            .or_else(|| std::env::var(&self.api_key_env).ok().and_then(non_blank))
            .or_else(|| std::env::var("GEMINI_API_KEY").ok().and_then(non_blank))
    }
}

impl LocationConfig {
    pub fn sample(&self) -> Option<LocationSample> {
        Some(LocationSample::now(
            self.latitude?,
            self.longitude?,
            self.accuracy.unwrap_or(0.0),
        ))
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => parse_number(value)
                        .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    // Unset optional: take whatever the text looks like.
                    serde_json::Value::Null => parse_number(value)
                        .or_else(|| value.parse::<bool>().ok().map(serde_json::Value::Bool))
                        .unwrap_or_else(|| serde_json::Value::String(value.into())),
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults there if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value by dotted key in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit.
    pub fn update(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let original = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        let mut json = original.clone();
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated = match serde_json::from_value(json) {
            Ok(cfg) => cfg,
            // An unset optional guessed the wrong type; the field may be text.
            Err(e) if Self::get_json_value_by_path(&original, key).is_some_and(|v| v.is_null()) => {
                let mut json = original;
                let pointer = format!("/{}", key.replace('.', "/"));
                let slot = json.pointer_mut(&pointer).ok_or_else(|| invalid(e.to_string()))?;
                *slot = serde_json::Value::String(value.into());
                serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?
            }
            Err(e) => return Err(invalid(e.to_string())),
        };
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.update(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn alert_settings(&self) -> AlertSettings {
        AlertSettings {
            countdown_secs: self.alert.countdown_secs,
            silent_mode: self.alert.silent_mode,
            community_broadcast: self.alert.community_broadcast,
        }
    }

    pub fn directory(&self) -> StaticDirectory {
        StaticDirectory {
            baseline: self.responders.baseline.clone(),
            community: self.responders.community.clone(),
            broadcast_fanout: self.responders.broadcast_fanout,
        }
    }

    /// Registry seeded from `[[contacts]]`. Invalid seeds are skipped.
    pub fn contact_registry(&self) -> ContactRegistry {
        let mut registry = ContactRegistry::new();
        for seed in &self.contacts {
            let added = registry.add(NewContact::new(
                seed.name.clone(),
                seed.phone.clone(),
                seed.relation.clone(),
            ));
            if let Err(e) = added {
                tracing::warn!(error = %e, "skipping invalid contact seed");
            }
        }
        registry
    }
}

fn parse_number(value: &str) -> Option<serde_json::Value> {
    if let Ok(n) = value.parse::<u64>() {
        Some(serde_json::Value::Number(n.into()))
    } else if let Ok(n) = value.parse::<f64>() {
        serde_json::Number::from_f64(n).map(serde_json::Value::Number)
    } else {
        None
    }
}
