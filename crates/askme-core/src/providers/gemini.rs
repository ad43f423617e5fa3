//! Gemini `generateContent` client (Generative Language API, API key auth).

use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::{
    ProviderError, USER_AGENT, classify_reqwest_error, resolve_api_key, resolve_base_url,
};
use crate::config::Config;
use crate::ports::AnswerSource;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl GeminiConfig {
    /// Builds the client config from the loaded config file.
    ///
    /// Authentication resolution order:
    /// 1. `[gemini] api_key`
    /// 2. `GEMINI_API_KEY` environment variable
    ///
    /// `GEMINI_BASE_URL` overrides `[gemini] base_url`.
    ///
    /// # Errors
    /// Returns an error if no API key is available or the base URL is invalid.
    pub fn from_config(config: &Config, model_override: Option<&str>) -> Result<Self> {
        let api_key = resolve_api_key(
            config.gemini.effective_api_key(),
            "GEMINI_API_KEY",
            "gemini",
        )?;
        let base_url = resolve_base_url(
            config.gemini.effective_base_url(),
            "GEMINI_BASE_URL",
            DEFAULT_BASE_URL,
            "Gemini",
        )?;
        let model = model_override
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&config.model)
            .to_string();

        Ok(Self {
            api_key,
            base_url,
            model,
            timeout: config.request_timeout(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn single_prompt(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Extracts the first candidate's text from a response body.
///
/// Text parts of the first candidate are concatenated. A response without
/// any text is an `EmptyResponse` error.
pub fn parse_response(body: &str) -> Result<String, ProviderError> {
    let response: GenerateResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::parse(format!("Failed to parse Gemini response: {e}")).with_details(body)
    })?;

    let text: String = response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let block_reason = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref());
        return Err(ProviderError::empty_response(block_reason));
    }
    Ok(text)
}

/// Gemini client.
pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { config, http })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Sends one prompt and returns the raw answer text.
    ///
    /// # Errors
    /// Returns a `ProviderError` for transport failures, non-success status,
    /// unparsable bodies and empty answers.
    pub async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = GenerateRequest::single_prompt(prompt);
        tracing::debug!(model = %self.config.model, "Sending generateContent request");

        let response = self
            .http
            .post(self.config.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Gemini request failed");
            return Err(ProviderError::http_status(status.as_u16(), &body));
        }

        parse_response(&body)
    }
}

impl AnswerSource for GeminiClient {
    fn ask<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(self.generate(prompt))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::providers::ProviderErrorKind;

    #[test]
    fn request_body_has_single_text_part() {
        let body = serde_json::to_value(GenerateRequest::single_prompt("hello")).unwrap();
        assert_eq!(body, json!({ "contents": [{ "parts": [{ "text": "hello" }] }] }));
    }

    #[test]
    fn endpoint_includes_model() {
        let config = GeminiConfig {
            api_key: "k".into(),
            base_url: "http://localhost:1234/v1beta".into(),
            model: "gemini-2.0-flash".into(),
            timeout: None,
        };
        assert_eq!(
            config.endpoint(),
            "http://localhost:1234/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn parses_first_candidate_text() {
        let body = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "* First" }, { "text": " * Second" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        })
        .to_string();
        assert_eq!(parse_response(&body).unwrap(), "* First * Second");
    }

    #[test]
    fn empty_candidates_fail_loudly() {
        let err = parse_response(r#"{"candidates":[]}"#).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::EmptyResponse);
    }

    #[test]
    fn blocked_prompt_reports_reason() {
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } }).to_string();
        let err = parse_response(&body).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::EmptyResponse);
        assert!(err.message.contains("SAFETY"));
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let err = parse_response("<html>").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Parse);
        assert_eq!(err.details.as_deref(), Some("<html>"));
    }

    #[test]
    fn model_override_wins() {
        let mut config = Config::default();
        config.gemini.api_key = Some("test-key".into());
        config.gemini.base_url = Some("http://127.0.0.1:9".into());

        let gemini = GeminiConfig::from_config(&config, Some("gemini-2.5-pro")).unwrap();
        assert_eq!(gemini.model, "gemini-2.5-pro");
        assert_eq!(gemini.api_key, "test-key");
        assert_eq!(gemini.timeout, None);
    }
}
