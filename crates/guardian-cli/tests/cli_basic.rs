//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against a throwaway config
//! directory and verify outputs.

use std::io::Write;
use std::process::{Command, Stdio};

use tempfile::TempDir;

fn cli(home: &TempDir) -> Command {
    let mut cmd = Command::new("cargo");
    cmd.args(["run", "-q", "-p", "guardian-cli", "--"])
        .env("GUARDIAN_HOME", home.path())
        .env_remove("API_KEY")
        .env_remove("GEMINI_API_KEY");
    cmd
}

/// Run a CLI command and return (code, stdout, stderr).
fn run_cli(home: &TempDir, args: &[&str]) -> (i32, String, String) {
    let output = cli(home)
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

/// Feed `input` to an interactive session and return its JSON lines.
fn run_session(home: &TempDir, input: &str) -> Vec<serde_json::Value> {
    let mut child = cli(home)
        .args(["run", "--offline"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn CLI session");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success(), "session failed: {output:?}");

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).expect("stdout line is not JSON"))
        .collect()
}

fn events_of<'a>(lines: &'a [serde_json::Value], ty: &str) -> Vec<&'a serde_json::Value> {
    lines.iter().filter(|v| v["type"] == ty).collect()
}

#[test]
fn test_config_get_default() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["config", "get", "alert.countdown_secs"]);
    assert_eq!(code, 0, "config get failed");
    assert_eq!(stdout.trim(), "5");
}

#[test]
fn test_config_set_then_get() {
    let home = TempDir::new().unwrap();
    let (code, _, _) = run_cli(&home, &["config", "set", "decoy.caller_name", "Mom"]);
    assert_eq!(code, 0, "config set failed");
    let (_, stdout, _) = run_cli(&home, &["config", "get", "decoy.caller_name"]);
    assert_eq!(stdout.trim(), "Mom");
}

#[test]
fn test_config_unknown_key_fails() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&home, &["config", "get", "nope.nothing"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error: unknown key"));
}

#[test]
fn test_config_list_is_json() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["config", "list"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["contacts"].as_array().unwrap().len(), 2);
}

#[test]
fn test_assess_offline_returns_unknown() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["assess", "someone is following me"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["dangerLevel"], "UNKNOWN");
    assert_eq!(parsed["shouldTriggerAlert"], false);
}

#[test]
fn test_guidance_offline_returns_fallback() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["guidance", "uneasy"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(parsed["tips"].as_str().unwrap().starts_with("Stay in well-lit areas."));
}

#[test]
fn test_havens_offline_is_empty() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["havens", "--lat", "40.7", "--lng", "-74.0"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(parsed.as_array().unwrap().is_empty());
}

#[test]
fn test_session_trigger_and_cancel() {
    let home = TempDir::new().unwrap();
    let lines = run_session(&home, "trigger\ncancel\nstatus\nquit\n");

    assert_eq!(events_of(&lines, "StateSnapshot").len(), 1);
    assert_eq!(events_of(&lines, "EmergencyTriggered").len(), 1);
    assert_eq!(events_of(&lines, "EmergencyCancelled").len(), 1);

    let status = lines.iter().find(|v| v.get("status").is_some() && v.get("type").is_none());
    assert_eq!(status.unwrap()["status"], "SAFE");
}

#[test]
fn test_session_adds_contact() {
    let home = TempDir::new().unwrap();
    let lines = run_session(&home, "contact add Mom +15550100 Family\ncontacts\nquit\n");

    assert_eq!(events_of(&lines, "ContactAdded").len(), 1);
    let contacts = lines.iter().find(|v| v.is_array()).unwrap();
    assert_eq!(contacts.as_array().unwrap().len(), 3);
}

#[test]
fn test_session_spoken_trigger_after_voice() {
    let home = TempDir::new().unwrap();
    let lines = run_session(&home, "voice\nsay help me\nstatus\nquit\n");

    assert_eq!(events_of(&lines, "EmergencyTriggered").len(), 1);
    assert!(events_of(&lines, "CommandRejected").is_empty());
    let status = lines.iter().find(|v| v.get("status").is_some() && v.get("type").is_none());
    assert_eq!(status.unwrap()["status"], "DANGER");
}

#[test]
fn test_session_say_without_voice_is_rejected() {
    let home = TempDir::new().unwrap();
    let lines = run_session(&home, "say help me\nstatus\nquit\n");

    assert!(events_of(&lines, "EmergencyTriggered").is_empty());
    let rejected = events_of(&lines, "CommandRejected");
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0]["reason"], "voice mode is off");
}
