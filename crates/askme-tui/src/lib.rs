//! Full-screen TUI for askme.

pub mod common;
pub mod effects;
pub mod events;
pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod update;

use std::io::{IsTerminal, stdout};
use std::sync::Arc;

use anyhow::Result;
use askme_core::config::Config;
use askme_core::conversation::Conversation;
use askme_core::ports::{AnswerSource, SpeechInput};
pub use runtime::TuiRuntime;

use crate::state::{AppState, TuiOptions};

/// Runs the interactive chat view until the user quits.
///
/// # Errors
/// Returns an error if stdout is not a terminal or the terminal fails.
pub fn run_interactive(
    config: &Config,
    model: &str,
    conversation: Conversation,
    source: Arc<dyn AnswerSource>,
    speech_input: Arc<dyn SpeechInput>,
) -> Result<()> {
    if !stdout().is_terminal() {
        anyhow::bail!(
            "Interactive mode requires a terminal.\n\
             Use `askme ask '...'` for one-shot questions."
        );
    }

    let options = TuiOptions {
        model: model.to_string(),
        code_language: config.display.code_language.clone(),
        scroll_delay: config.display.scroll_delay(),
        speech_input_available: speech_input.is_available(),
    };
    let state = AppState::new(conversation, options);

    let mut runtime = TuiRuntime::new(state, source, speech_input)?;
    runtime.run()
}
