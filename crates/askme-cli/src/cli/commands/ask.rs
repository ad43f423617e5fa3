//! Ask command handler.

use anyhow::Result;
use askme_core::answer::render::Renderer;
use askme_core::conversation::Conversation;
use askme_core::providers::GeminiClient;

use super::{SessionOptions, render_items};

pub async fn run(session: &SessionOptions<'_>, prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        anyhow::bail!("No prompt provided");
    }

    let client = session.client()?;
    let mut conversation = session.conversation()?;
    conversation.set_input(prompt);
    submit_and_print(session, conversation, &client).await
}

/// Submits whatever the conversation holds and prints the answer.
///
/// Waits for queued speech before returning.
pub(super) async fn submit_and_print(
    session: &SessionOptions<'_>,
    mut conversation: Conversation,
    client: &GeminiClient,
) -> Result<()> {
    let renderer = Renderer::new(
        conversation.theme(),
        session.config.display.code_language.clone(),
    );

    let lines = match conversation.submit(client).await? {
        Some(turn) => render_items(&renderer, turn.items()),
        None => anyhow::bail!("Nothing to ask"),
    };
    for line in lines {
        println!("{line}");
    }

    conversation.finish().await;
    Ok(())
}
