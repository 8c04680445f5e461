mod config;

pub use config::{
    AlertConfig, Config, ContactSeed, DecoyConfig, LocationConfig, OracleConfig, RespondersConfig,
    VoiceConfig,
};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the configuration directory, creating it if needed.
///
/// `GUARDIAN_HOME` overrides the location outright. Otherwise this is
/// `~/.config/guardian-angel[-dev]/`, where `GUARDIAN_ENV=dev` selects the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("GUARDIAN_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("GUARDIAN_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("guardian-angel-dev")
            } else {
                base_dir.join("guardian-angel")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DirUnavailable {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
