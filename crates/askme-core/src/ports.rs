//! Seams between the conversation logic and the outside world.
//!
//! The orchestrator only talks to these traits; concrete adapters live in
//! [`crate::storage`], [`crate::speech`] and [`crate::providers`].

use std::fmt;

use anyhow::Result;
use futures_util::future::BoxFuture;

use crate::model::ThemePreference;
use crate::providers::ProviderError;

/// Durable key/value store for the question history and the theme.
pub trait HistoryStore: Send {
    /// Returns past questions, most recent first. Absent history is empty.
    fn load_history(&self) -> Result<Vec<String>>;

    /// Replaces the whole persisted history.
    fn save_history(&mut self, history: &[String]) -> Result<()>;

    /// Returns the persisted theme; absent or unknown values read as dark.
    fn load_theme(&self) -> Result<ThemePreference>;

    fn save_theme(&mut self, theme: ThemePreference) -> Result<()>;
}

/// Failure reported by a speech adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechError {
    pub message: String,
}

impl SpeechError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for SpeechError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SpeechError {}

/// Text-to-speech.
pub trait SpeechOutput: Send {
    fn is_available(&self) -> bool;

    /// Queues `text` for synthesis and returns immediately.
    ///
    /// Utterances play in the order they were queued.
    fn speak(&self, text: &str);

    /// Stops accepting utterances and resolves once queued ones have played.
    fn finish(self: Box<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}

/// One-shot speech recognition.
pub trait SpeechInput: Send + Sync {
    fn is_available(&self) -> bool;

    /// Listens for a single utterance and returns its transcript.
    fn listen(&self) -> BoxFuture<'_, Result<String, SpeechError>>;
}

/// Something that answers a prompt with raw model text.
pub trait AnswerSource: Send + Sync {
    fn ask<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, ProviderError>>;
}
