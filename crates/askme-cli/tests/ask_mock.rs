//! Integration tests for `askme ask` against a mocked Gemini endpoint.

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn text_response(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }]
    }))
}

fn askme(home: &TempDir, server: &MockServer) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("askme");
    cmd.env("ASKME_HOME", home.path())
        .env("GEMINI_API_KEY", "test-key")
        .env("GEMINI_BASE_URL", format!("{}/v1beta", server.uri()))
        .arg("--no-speech");
    cmd
}

#[tokio::test]
async fn test_ask_prints_items_and_records_history() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(query_param("key", "test-key"))
        .and(body_json(json!({
            "contents": [{ "parts": [{ "text": "What is Rust?" }] }]
        })))
        .respond_with(text_response("* First point  * second point"))
        .expect(1)
        .mount(&server)
        .await;

    askme(&home, &server)
        .args(["ask", "What is Rust?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("First point"))
        .stdout(predicate::str::contains("second point"))
        .stdout(predicate::str::contains("*").not());

    let state: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(home.path().join("state.json")).unwrap())
            .unwrap();
    assert_eq!(state["history"], json!(["What is Rust?"]));
}

#[tokio::test]
async fn test_ask_wraps_code_answer_in_fenced_block() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(text_response("Here you go * if (x > 0) { return x; }"))
        .mount(&server)
        .await;

    askme(&home, &server)
        .args(["ask", "show me code"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Here you go"))
        .stdout(predicate::str::contains("javascript"))
        .stdout(predicate::str::contains("if (x > 0) { return x; }"));
}

#[tokio::test]
async fn test_ask_http_error_exits_nonzero_and_keeps_history() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT" }
        })))
        .mount(&server)
        .await;

    askme(&home, &server)
        .args(["ask", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to get an answer"))
        .stderr(predicate::str::contains("HTTP 400: API key not valid."));

    // The question was persisted before the call went out.
    let state: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(home.path().join("state.json")).unwrap())
            .unwrap();
    assert_eq!(state["history"], json!(["hello"]));
}

#[tokio::test]
async fn test_ask_blocked_prompt_reports_reason() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    askme(&home, &server)
        .args(["ask", "something"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("blocked: SAFETY"));
}

#[tokio::test]
async fn test_history_ask_reuses_entry_without_duplicating() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    fs::write(
        home.path().join("state.json"),
        r#"{"history":["newest","older"]}"#,
    )
    .unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_json(json!({ "contents": [{ "parts": [{ "text": "older" }] }] })))
        .respond_with(text_response("answer to older"))
        .expect(1)
        .mount(&server)
        .await;

    askme(&home, &server)
        .args(["history", "ask", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("answer to older"));

    let state: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(home.path().join("state.json")).unwrap())
            .unwrap();
    assert_eq!(state["history"], json!(["newest", "older"]));
}

#[tokio::test]
async fn test_piped_stdin_asks_once() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_json(json!({ "contents": [{ "parts": [{ "text": "piped question" }] }] })))
        .respond_with(text_response("piped answer"))
        .expect(1)
        .mount(&server)
        .await;

    askme(&home, &server)
        .write_stdin("piped question\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("piped answer"));
}

#[test]
fn test_ask_without_api_key_names_env_var() {
    let home = TempDir::new().unwrap();

    cargo_bin_cmd!("askme")
        .env("ASKME_HOME", home.path())
        .env_remove("GEMINI_API_KEY")
        .args(["--no-speech", "ask", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}
