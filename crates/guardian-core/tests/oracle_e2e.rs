//! E2E tests for the Gemini oracle client.
//!
//! Tests run against a local mock of the generateContent endpoint, so no
//! API key or network access is needed.

use guardian_core::assistant::{resolve_turn, AssistantSession, ALERT_REPLY};
use guardian_core::oracle::{
    assess_or_default, guidance_or_fallback, havens_or_empty, DangerAssessor, GuidanceOracle,
    HavenSearch, GUIDANCE_FALLBACK,
};
use guardian_core::{DangerAssessment, DangerLevel, GeminiClient, OracleError};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

const ENDPOINT: &str = "/v1beta/models/gemini-3-flash-preview:generateContent";
const KEY: &str = "test-key";

// ============================================================================
// Test Helpers
// ============================================================================

fn client(server: &ServerGuard) -> GeminiClient {
    GeminiClient::new(KEY).with_api_base(&server.url()).unwrap()
}

fn text_response(text: &str) -> String {
    json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
    })
    .to_string()
}

// ============================================================================
// Danger assessment
// ============================================================================

#[tokio::test]
async fn test_assess_parses_structured_answer() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", ENDPOINT)
        .match_header("x-goog-api-key", KEY)
        .match_body(Matcher::PartialJson(json!({
            "generationConfig": { "responseMimeType": "application/json" }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(text_response(
            r#"{"dangerLevel":"HIGH","reasoning":"Weapon mentioned","action":"Move to a crowded place","shouldTriggerAlert":true}"#,
        ))
        .create_async()
        .await;

    let assessment = client(&server).assess("a man with a knife is following me").await.unwrap();

    mock.assert_async().await;
    assert_eq!(assessment.danger_level, DangerLevel::High);
    assert!(assessment.should_trigger_alert);
    assert_eq!(assessment.action, "Move to a crowded place");
}

#[tokio::test]
async fn test_assess_server_error_degrades_to_unknown() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", ENDPOINT)
        .with_status(500)
        .with_body("internal")
        .create_async()
        .await;

    let gemini = client(&server);
    match gemini.assess("hello").await {
        Err(OracleError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "internal");
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert_eq!(assess_or_default(&gemini, "hello").await, DangerAssessment::unknown());
}

#[tokio::test]
async fn test_assess_malformed_json_is_parse_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", ENDPOINT)
        .with_status(200)
        .with_body(text_response("definitely not json"))
        .create_async()
        .await;

    assert!(matches!(
        client(&server).assess("ctx").await,
        Err(OracleError::Parse(_))
    ));
}

// ============================================================================
// Guidance
// ============================================================================

#[tokio::test]
async fn test_guidance_returns_model_text() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", ENDPOINT)
        .match_body(Matcher::Regex("feels uneasy".into()))
        .with_status(200)
        .with_body(text_response("1. Stay on lit streets.\n2. Call someone.\n3. Walk briskly."))
        .create_async()
        .await;

    let tips = client(&server).guidance("Main St", "uneasy").await.unwrap();
    assert!(tips.starts_with("1. Stay on lit streets."));
}

#[tokio::test]
async fn test_guidance_failure_uses_fallback() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", ENDPOINT)
        .with_status(503)
        .create_async()
        .await;

    let tips = guidance_or_fallback(&client(&server), "Main St", "uneasy").await;
    assert_eq!(tips, GUIDANCE_FALLBACK);
}

// ============================================================================
// Safe haven search
// ============================================================================

#[tokio::test]
async fn test_havens_come_from_grounding_sources() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", ENDPOINT)
        .match_body(Matcher::PartialJson(json!({ "tools": [{ "googleSearch": {} }] })))
        .with_status(200)
        .with_body(
            json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "Here are some places." }] },
                    "groundingMetadata": {
                        "groundingChunks": [
                            { "web": { "uri": "https://example.com/precinct", "title": "1st Precinct" } },
                            { "web": { "uri": "not a url", "title": "Broken" } },
                            { "web": { "uri": "https://example.com/pharmacy", "title": "24h Pharmacy" } },
                            { "web": { "uri": "https://example.com/hospital" } },
                            { "web": { "uri": "https://example.com/extra", "title": "Extra" } }
                        ]
                    }
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let havens = client(&server).search(40.7128, -74.006).await.unwrap();

    let names: Vec<&str> = havens.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["1st Precinct", "24h Pharmacy", "https://example.com/hospital"]);
    assert!(havens.iter().all(|h| h.category == "Safe Haven"));
}

#[tokio::test]
async fn test_havens_without_grounding_are_empty() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", ENDPOINT)
        .with_status(200)
        .with_body(text_response("I could not find anything."))
        .create_async()
        .await;

    assert!(havens_or_empty(&client(&server), 1.0, 2.0).await.is_empty());
}

// ============================================================================
// Assistant turn end-to-end
// ============================================================================

#[tokio::test]
async fn test_dangerous_turn_requests_alert_without_guidance_call() {
    let mut server = Server::new_async().await;
    let assess = server
        .mock("POST", ENDPOINT)
        .with_status(200)
        .with_body(text_response(
            r#"{"dangerLevel":"HIGH","reasoning":"","action":"","shouldTriggerAlert":true}"#,
        ))
        .expect(1)
        .create_async()
        .await;

    let gemini = client(&server);
    let mut session = AssistantSession::new();
    let turn = session.begin_turn("someone is breaking in", 0).unwrap();
    let resolution = resolve_turn(turn, &gemini, &gemini, "Current Location").await;

    assess.assert_async().await;
    assert!(resolution.trigger_alert);
    assert_eq!(resolution.reply, ALERT_REPLY);
}
