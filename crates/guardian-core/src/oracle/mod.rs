//! Hosted language-model oracles.
//!
//! Three call-and-response services: danger assessment, tactical guidance and
//! safe-haven search. Every caller goes through the `*_or_*` helpers, which
//! swallow failures and hand back a safe default, so an unreachable model can
//! never take the session down with it.

pub mod gemini;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OracleError;

pub use gemini::GeminiClient;

/// Tips used when the guidance oracle cannot be reached.
pub const GUIDANCE_FALLBACK: &str =
    "Stay in well-lit areas. Keep your phone in hand. Head towards the nearest open business.";

/// Haven searches return at most this many results.
pub const MAX_HAVENS: usize = 3;

pub const HAVEN_CATEGORY: &str = "Safe Haven";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DangerLevel {
    Low,
    Medium,
    High,
    #[default]
    Unknown,
}

impl From<String> for DangerLevel {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => DangerLevel::Low,
            "MEDIUM" => DangerLevel::Medium,
            "HIGH" => DangerLevel::High,
            _ => DangerLevel::Unknown,
        }
    }
}

impl From<DangerLevel> for String {
    fn from(level: DangerLevel) -> Self {
        level.to_string()
    }
}

impl fmt::Display for DangerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DangerLevel::Low => "LOW",
            DangerLevel::Medium => "MEDIUM",
            DangerLevel::High => "HIGH",
            DangerLevel::Unknown => "UNKNOWN",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DangerAssessment {
    #[serde(default)]
    pub danger_level: DangerLevel,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub should_trigger_alert: bool,
}

impl DangerAssessment {
    /// The answer used whenever the oracle fails.
    pub fn unknown() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeHaven {
    pub name: String,
    #[serde(rename = "type")]
    pub category: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<String>,
}

#[async_trait]
pub trait DangerAssessor: Send + Sync {
    async fn assess(&self, context: &str) -> Result<DangerAssessment, OracleError>;
}

#[async_trait]
pub trait GuidanceOracle: Send + Sync {
    /// Free-text tactical tips. May legitimately be empty.
    async fn guidance(&self, location: &str, situation: &str) -> Result<String, OracleError>;
}

#[async_trait]
pub trait HavenSearch: Send + Sync {
    async fn search(&self, latitude: f64, longitude: f64) -> Result<Vec<SafeHaven>, OracleError>;
}

pub async fn assess_or_default(assessor: &dyn DangerAssessor, context: &str) -> DangerAssessment {
    match assessor.assess(context).await {
        Ok(assessment) => assessment,
        Err(e) => {
            tracing::warn!(error = %e, "danger assessment failed");
            DangerAssessment::unknown()
        }
    }
}

pub async fn guidance_or_fallback(
    oracle: &dyn GuidanceOracle,
    location: &str,
    situation: &str,
) -> String {
    match oracle.guidance(location, situation).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "guidance request failed");
            GUIDANCE_FALLBACK.to_string()
        }
    }
}

pub async fn havens_or_empty(search: &dyn HavenSearch, latitude: f64, longitude: f64) -> Vec<SafeHaven> {
    match search.search(latitude, longitude).await {
        Ok(mut havens) => {
            havens.truncate(MAX_HAVENS);
            havens
        }
        Err(e) => {
            tracing::warn!(error = %e, "safe haven search failed");
            Vec::new()
        }
    }
}

/// Oracle used when no API key is configured. Every call fails, so callers
/// get the safe defaults.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineOracle;

#[async_trait]
impl DangerAssessor for OfflineOracle {
    async fn assess(&self, _context: &str) -> Result<DangerAssessment, OracleError> {
        Err(OracleError::MissingApiKey)
    }
}

#[async_trait]
impl GuidanceOracle for OfflineOracle {
    async fn guidance(&self, _location: &str, _situation: &str) -> Result<String, OracleError> {
        Err(OracleError::MissingApiKey)
    }
}

#[async_trait]
impl HavenSearch for OfflineOracle {
    async fn search(&self, _latitude: f64, _longitude: f64) -> Result<Vec<SafeHaven>, OracleError> {
        Err(OracleError::MissingApiKey)
    }
}

/// The three oracles the runtime hands to background tasks.
#[derive(Clone)]
pub struct Oracles {
    pub assessor: Arc<dyn DangerAssessor>,
    pub guidance: Arc<dyn GuidanceOracle>,
    pub havens: Arc<dyn HavenSearch>,
}

impl Oracles {
    pub fn offline() -> Self {
        let oracle = Arc::new(OfflineOracle);
        Self {
            assessor: oracle.clone(),
            guidance: oracle.clone(),
            havens: oracle,
        }
    }

    pub fn gemini(client: GeminiClient) -> Self {
        let client = Arc::new(client);
        Self {
            assessor: client.clone(),
            guidance: client.clone(),
            havens: client,
        }
    }
}

impl fmt::Debug for Oracles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Oracles").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn danger_level_parses_loosely() {
        let a: DangerAssessment = serde_json::from_str(
            r#"{"dangerLevel":"high","reasoning":"r","action":"run","shouldTriggerAlert":true}"#,
        )
        .unwrap();
        assert_eq!(a.danger_level, DangerLevel::High);
        assert!(a.should_trigger_alert);

        let a: DangerAssessment = serde_json::from_str(r#"{"dangerLevel":"EXTREME"}"#).unwrap();
        assert_eq!(a.danger_level, DangerLevel::Unknown);
        assert!(!a.should_trigger_alert);
    }

    #[test]
    fn assessment_serializes_camel_case() {
        let json = serde_json::to_value(DangerAssessment::unknown()).unwrap();
        assert_eq!(json["dangerLevel"], "UNKNOWN");
        assert_eq!(json["shouldTriggerAlert"], false);
    }

    #[tokio::test]
    async fn offline_oracle_degrades_to_defaults() {
        let oracle = OfflineOracle;
        assert_eq!(
            assess_or_default(&oracle, "someone is following me").await,
            DangerAssessment::unknown()
        );
        assert_eq!(
            guidance_or_fallback(&oracle, "Current Location", "uneasy").await,
            GUIDANCE_FALLBACK
        );
        assert!(havens_or_empty(&oracle, 1.0, 2.0).await.is_empty());
    }

    struct ManyHavens;

    #[async_trait]
    impl HavenSearch for ManyHavens {
        async fn search(&self, _lat: f64, _lng: f64) -> Result<Vec<SafeHaven>, OracleError> {
            Ok((0..5)
                .map(|i| SafeHaven {
                    name: format!("Station {i}"),
                    category: HAVEN_CATEGORY.into(),
                    url: format!("https://example.com/{i}"),
                    address: None,
                    distance: None,
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn havens_are_capped() {
        let havens = havens_or_empty(&ManyHavens, 0.0, 0.0).await;
        assert_eq!(havens.len(), MAX_HAVENS);
        assert_eq!(havens[0].name, "Station 0");
    }
}
