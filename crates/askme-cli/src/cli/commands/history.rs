//! History command handlers.

use anyhow::{Context, Result};
use askme_core::ports::HistoryStore;
use askme_core::storage::JsonBlobStore;

use super::{SessionOptions, ask};

pub fn list() -> Result<()> {
    let history = JsonBlobStore::open_default()
        .load_history()
        .context("load history")?;

    if history.is_empty() {
        println!("No questions asked yet.");
        return Ok(());
    }

    for (index, question) in history.iter().enumerate() {
        println!("{:>3}  {}", index + 1, question);
    }
    Ok(())
}

pub fn clear() -> Result<()> {
    JsonBlobStore::open_default()
        .save_history(&[])
        .context("clear history")?;
    println!("History cleared.");
    Ok(())
}

/// Re-asks entry `number` (1-based, as printed by `history list`).
///
/// The question is not pushed to the front of the history again.
pub async fn ask(session: &SessionOptions<'_>, number: usize) -> Result<()> {
    let client = session.client()?;
    let mut conversation = session.conversation()?;

    let stored = conversation.history().len();
    let selected = number
        .checked_sub(1)
        .and_then(|index| conversation.select_history(index))
        .is_some();
    if !selected {
        anyhow::bail!("No history entry #{number} ({stored} stored)");
    }

    ask::submit_and_print(session, conversation, &client).await
}
