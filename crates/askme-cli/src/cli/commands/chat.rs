//! Chat command handler (the default when no subcommand is given).

use std::io::{IsTerminal, Read};
use std::sync::Arc;

use anyhow::{Context, Result};
use askme_core::ports::SpeechInput;
use askme_core::speech::{CommandSpeechInput, NoSpeech};

use super::{SessionOptions, ask};

pub async fn run(session: &SessionOptions<'_>) -> Result<()> {
    // If stdin is piped, ask once instead
    if !std::io::stdin().is_terminal() {
        let mut prompt = String::new();
        std::io::stdin().lock().read_to_string(&mut prompt)?;
        let prompt = prompt.trim();
        if prompt.is_empty() {
            anyhow::bail!("No input provided via pipe");
        }
        return ask::run(session, prompt).await;
    }

    let client = session.client()?;
    let model = client.model().to_string();
    let conversation = session.conversation()?;
    let speech_input: Arc<dyn SpeechInput> = if session.no_speech {
        Arc::new(NoSpeech)
    } else {
        Arc::new(CommandSpeechInput::new(&session.config.speech))
    };

    askme_tui::run_interactive(
        session.config,
        &model,
        conversation,
        Arc::new(client),
        speech_input,
    )
    .context("interactive chat failed")
}
