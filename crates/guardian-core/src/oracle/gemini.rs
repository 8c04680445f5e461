//! Google Generative Language API client.
//!
//! All three oracles go through `models/{model}:generateContent`:
//! assessment with a JSON response schema, guidance as plain text, and haven
//! search with the Google Search tool, reading results out of the grounding
//! metadata rather than the model's prose.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use super::{
    DangerAssessment, DangerAssessor, GuidanceOracle, HavenSearch, SafeHaven, HAVEN_CATEGORY,
    MAX_HAVENS,
};
use crate::error::OracleError;
use crate::storage::OracleConfig;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const DISPATCHER_INSTRUCTION: &str = "You are a professional safety emergency dispatcher AI. \
    Analyze input for signs of distress, violence, or dangerous surroundings. \
    Provide a danger level (LOW, MEDIUM, HIGH) and a recommended immediate action.";

const GUIDANCE_INSTRUCTION: &str =
    "Be concise, tactical, and calm. Focus on survival and de-escalation.";

// generateContent request/response shapes

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebSource>,
}

#[derive(Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        Some(text)
    }

    fn web_sources(&self) -> impl Iterator<Item = &WebSource> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .into_iter()
            .flat_map(|m| m.grounding_chunks.iter())
            .filter_map(|chunk| chunk.web.as_ref())
    }
}

fn user_turn(text: String) -> Vec<Content> {
    vec![Content {
        role: Some("user"),
        parts: vec![Part { text }],
    }]
}

fn instruction(text: &str) -> Option<Content> {
    Some(Content {
        role: None,
        parts: vec![Part {
            text: text.to_string(),
        }],
    })
}

fn assessment_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "dangerLevel": { "type": "STRING", "description": "LOW, MEDIUM, or HIGH" },
            "reasoning": { "type": "STRING" },
            "action": { "type": "STRING" },
            "shouldTriggerAlert": { "type": "BOOLEAN" }
        },
        "required": ["dangerLevel", "reasoning", "action", "shouldTriggerAlert"]
    })
}

/// Gemini-backed implementation of all three oracles.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    /// Always ends with '/' so relative joins append.
    api_base: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_base: format!("{DEFAULT_API_BASE}/"),
            api_key: api_key.into().trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
            client: build_http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }

    /// Build from the `[oracle]` config section. Fails without an API key.
    pub fn from_config(config: &OracleConfig) -> Result<Self, OracleError> {
        let key = config.resolve_api_key().ok_or(OracleError::MissingApiKey)?;
        Ok(Self::new(key)
            .with_model(&config.model)
            .with_timeout(Duration::from_secs(config.timeout_secs))
            .with_api_base(&config.api_base)?)
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_http_client(timeout);
        self
    }

    pub fn with_api_base(mut self, base: &str) -> Result<Self, OracleError> {
        let base = format!("{}/", base.trim_end_matches('/'));
        Url::parse(&base)?;
        self.api_base = base;
        Ok(self)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> Result<Url, OracleError> {
        Ok(Url::parse(&self.api_base)?.join(&format!("v1beta/models/{}:generateContent", self.model))?)
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, OracleError> {
        if self.api_key.is_empty() {
            return Err(OracleError::MissingApiKey);
        }

        let res = self
            .client
            .post(self.endpoint()?)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(OracleError::Status { status, body });
        }

        let body = res.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[async_trait]
impl DangerAssessor for GeminiClient {
    async fn assess(&self, context: &str) -> Result<DangerAssessment, OracleError> {
        let request = GenerateRequest {
            contents: user_turn(format!(
                "Assess the following safety context from a user who might be in danger. \
                 Determine if an emergency alert should be triggered. Context: {context}"
            )),
            system_instruction: instruction(DISPATCHER_INSTRUCTION),
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json",
                response_schema: assessment_schema(),
            }),
            tools: Vec::new(),
        };

        let text = self
            .generate(&request)
            .await?
            .text()
            .filter(|t| !t.trim().is_empty())
            .ok_or(OracleError::EmptyResponse)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl GuidanceOracle for GeminiClient {
    async fn guidance(&self, location: &str, situation: &str) -> Result<String, OracleError> {
        let request = GenerateRequest {
            contents: user_turn(format!(
                "The user is at {location} and feels {situation}. \
                 Give 3 quick, tactical safety tips for this specific scenario."
            )),
            system_instruction: instruction(GUIDANCE_INSTRUCTION),
            generation_config: None,
            tools: Vec::new(),
        };
        Ok(self.generate(&request).await?.text().unwrap_or_default())
    }
}

#[async_trait]
impl HavenSearch for GeminiClient {
    async fn search(&self, latitude: f64, longitude: f64) -> Result<Vec<SafeHaven>, OracleError> {
        let request = GenerateRequest {
            contents: user_turn(format!(
                "Find 3 real-world safe havens (police stations, 24/7 pharmacies, or hospitals) \
                 near coordinates {latitude}, {longitude}."
            )),
            system_instruction: None,
            generation_config: None,
            tools: vec![json!({ "googleSearch": {} })],
        };

        let response = self.generate(&request).await?;
        let havens = response
            .web_sources()
            .filter_map(|web| {
                let uri = web.uri.as_deref()?;
                // Grounding links are followed by the user; drop anything malformed.
                Url::parse(uri).ok()?;
                Some(SafeHaven {
                    name: web.title.clone().unwrap_or_else(|| uri.to_string()),
                    category: HAVEN_CATEGORY.to_string(),
                    url: uri.to_string(),
                    address: None,
                    distance: None,
                })
            })
            .take(MAX_HAVENS)
            .collect();
        Ok(havens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_includes_model() {
        let client = GeminiClient::new("k")
            .with_api_base("http://localhost:8080/")
            .unwrap();
        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "http://localhost:8080/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }

    #[test]
    fn api_base_with_path_keeps_prefix() {
        let client = GeminiClient::new("k")
            .with_model("gemini-pro")
            .with_api_base("https://proxy.example.com/google")
            .unwrap();
        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "https://proxy.example.com/google/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn response_text_joins_parts() {
        let resp: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "a" }, { "text": "b" }] } }]
        }))
        .unwrap();
        assert_eq!(resp.text().as_deref(), Some("ab"));
        assert!(GenerateResponse::default().text().is_none());
    }

    #[test]
    fn request_serializes_camel_case() {
        let req = GenerateRequest {
            contents: user_turn("hi".into()),
            system_instruction: instruction("sys"),
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json",
                response_schema: assessment_schema(),
            }),
            tools: Vec::new(),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(v["contents"][0]["role"], "user");
        assert!(v.get("tools").is_none());
    }

    #[tokio::test]
    async fn empty_key_fails_without_network() {
        let client = GeminiClient::new("  ");
        assert!(matches!(
            client.assess("ctx").await,
            Err(OracleError::MissingApiKey)
        ));
    }
}
