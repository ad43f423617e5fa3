//! CLI command handlers.

pub mod ask;
pub mod chat;
pub mod config;
pub mod history;
pub mod theme;

use anyhow::{Context, Result};
use askme_core::answer::render::{ItemPosition, Renderer};
use askme_core::config::Config;
use askme_core::conversation::Conversation;
use askme_core::ports::SpeechOutput;
use askme_core::providers::{GeminiClient, GeminiConfig};
use askme_core::speech::{CommandSpeechOutput, NoSpeech};
use askme_core::storage::JsonBlobStore;

/// Settings shared by every command that talks to the model.
pub struct SessionOptions<'a> {
    pub config: &'a Config,
    pub model_override: Option<&'a str>,
    pub no_speech: bool,
}

impl SessionOptions<'_> {
    /// Builds the Gemini client.
    ///
    /// # Errors
    /// Returns an error if no API key is configured or the client cannot be built.
    pub fn client(&self) -> Result<GeminiClient> {
        let gemini = GeminiConfig::from_config(self.config, self.model_override)
            .context("configure Gemini")?;
        GeminiClient::new(gemini)
    }

    /// Opens the conversation over the on-disk store.
    ///
    /// Must be called within the tokio runtime (speech output spawns a worker).
    pub fn conversation(&self) -> Result<Conversation> {
        let speech: Box<dyn SpeechOutput> = if self.no_speech {
            Box::new(NoSpeech)
        } else {
            Box::new(CommandSpeechOutput::spawn(&self.config.speech))
        };
        Conversation::new(Box::new(JsonBlobStore::open_default()), speech)
            .context("open conversation")
    }
}

/// Renders answer items as plain text, one line per rendered line.
pub fn render_items(renderer: &Renderer, items: &[String]) -> Vec<String> {
    items
        .iter()
        .enumerate()
        .flat_map(|(index, item)| {
            renderer.render_answer_item(item, ItemPosition::new(index, items.len()))
        })
        .map(|line| line.plain_text())
        .collect()
}
