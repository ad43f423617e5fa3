//! Conversation orchestrator.
//!
//! Owns the visible turns, the live input, the cached question history and the
//! theme. Persistence and speech go through the injected ports; the outbound
//! call goes through an [`AnswerSource`].
//!
//! Hosts with an event loop use the two-phase API:
//! - `begin_submit()` validates the input, persists history and enters the
//!   awaiting state, returning a [`PendingQuestion`]
//! - `complete()` or `fail()` leaves the awaiting state once the answer (or
//!   error) arrives
//!
//! `submit()` composes both around an `AnswerSource` for one-shot callers.

use anyhow::{Context, Result};

use crate::answer::{split_answer, spoken_text};
use crate::model::{ThemePreference, Turn};
use crate::ports::{AnswerSource, HistoryStore, SpeechError, SpeechOutput};

/// A submission that has been accepted and is awaiting its answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuestion {
    prompt: String,
}

impl PendingQuestion {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

pub struct Conversation {
    store: Box<dyn HistoryStore>,
    speech: Box<dyn SpeechOutput>,
    turns: Vec<Turn>,
    history: Vec<String>,
    live_input: String,
    selected_history: Option<String>,
    in_flight: usize,
    theme: ThemePreference,
    listening: bool,
}

impl Conversation {
    /// Creates a conversation, loading history and theme from `store`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn new(store: Box<dyn HistoryStore>, speech: Box<dyn SpeechOutput>) -> Result<Self> {
        let history = store.load_history().context("Failed to load history")?;
        let theme = store.load_theme().context("Failed to load theme")?;
        tracing::debug!(entries = history.len(), %theme, "Conversation loaded");

        Ok(Self {
            store,
            speech,
            turns: Vec::new(),
            history,
            live_input: String::new(),
            selected_history: None,
            in_flight: 0,
            theme,
            listening: false,
        })
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Past questions, most recent first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn input(&self) -> &str {
        &self.live_input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.live_input = text.into();
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.live_input
    }

    pub fn selected_history(&self) -> Option<&str> {
        self.selected_history.as_deref()
    }

    /// Marks a history item to be asked on the next submission.
    ///
    /// Returns the selected text, or `None` (clearing the selection) when
    /// `index` is out of range.
    pub fn select_history(&mut self, index: usize) -> Option<&str> {
        self.selected_history = self.history.get(index).cloned();
        self.selected_history.as_deref()
    }

    pub fn is_awaiting(&self) -> bool {
        self.in_flight > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn theme(&self) -> ThemePreference {
        self.theme
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Accepts the current submission, if any.
    ///
    /// A non-empty live input wins over a selected history item and is
    /// prepended to the persisted history. A selected history item is asked
    /// as-is without being written again. With neither, nothing changes and
    /// `None` is returned.
    ///
    /// # Errors
    /// Returns an error if the history cannot be persisted; the conversation
    /// is left unchanged in that case.
    pub fn begin_submit(&mut self) -> Result<Option<PendingQuestion>> {
        let prompt = if self.live_input.trim().is_empty() {
            match self.selected_history.take() {
                Some(selected) if !selected.trim().is_empty() => selected,
                _ => return Ok(None),
            }
        } else {
            let prompt = self.live_input.clone();
            let mut history = Vec::with_capacity(self.history.len() + 1);
            history.push(prompt.clone());
            history.extend(self.history.iter().cloned());
            self.store
                .save_history(&history)
                .context("Failed to save history")?;
            self.history = history;
            self.selected_history = None;
            prompt
        };

        self.in_flight += 1;
        tracing::info!(in_flight = self.in_flight, "Question submitted");
        Ok(Some(PendingQuestion { prompt }))
    }

    /// Records the answer for `pending` and leaves the awaiting state.
    ///
    /// Speaks the joined answer items when speech output is available, then
    /// appends one question turn and one answer turn and clears the live
    /// input. Returns the answer turn.
    pub fn complete(&mut self, pending: PendingQuestion, raw_answer: &str) -> &Turn {
        self.in_flight = self.in_flight.saturating_sub(1);

        let items = split_answer(raw_answer);
        if self.speech.is_available() && !items.is_empty() {
            self.speech.speak(&spoken_text(&items));
        }
        tracing::info!(items = items.len(), "Answer received");

        self.turns.push(Turn::question(pending.prompt));
        self.turns.push(Turn::answer(items));
        self.live_input.clear();
        &self.turns[self.turns.len() - 1]
    }

    /// Leaves the awaiting state without recording any turn.
    ///
    /// The live input is kept so the user can retry.
    pub fn fail(&mut self, pending: PendingQuestion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        tracing::warn!(prompt_len = pending.prompt.len(), "Question failed");
    }

    /// Submits and awaits the answer from `source`.
    ///
    /// Returns the answer turn, or `None` for an empty submission.
    ///
    /// # Errors
    /// Returns an error if history cannot be saved or the outbound call fails.
    pub async fn submit(&mut self, source: &dyn AnswerSource) -> Result<Option<&Turn>> {
        let Some(pending) = self.begin_submit()? else {
            return Ok(None);
        };

        let result = source.ask(pending.prompt()).await;
        match result {
            Ok(answer) => Ok(Some(self.complete(pending, &answer))),
            Err(e) => {
                self.fail(pending);
                Err(anyhow::Error::new(e).context("Failed to get an answer"))
            }
        }
    }

    /// Persists and activates `theme`.
    ///
    /// # Errors
    /// Returns an error if the theme cannot be persisted.
    pub fn set_theme(&mut self, theme: ThemePreference) -> Result<()> {
        self.store
            .save_theme(theme)
            .context("Failed to save theme")?;
        self.theme = theme;
        Ok(())
    }

    /// Switches between dark and light.
    ///
    /// # Errors
    /// Returns an error if the theme cannot be persisted.
    pub fn toggle_theme(&mut self) -> Result<ThemePreference> {
        self.set_theme(self.theme.toggled())?;
        Ok(self.theme)
    }

    /// Removes every stored question.
    ///
    /// # Errors
    /// Returns an error if the empty history cannot be persisted.
    pub fn clear_history(&mut self) -> Result<()> {
        self.store
            .save_history(&[])
            .context("Failed to clear history")?;
        self.history.clear();
        self.selected_history = None;
        Ok(())
    }

    /// Enters the listening state. Returns false if already listening.
    pub fn begin_listening(&mut self) -> bool {
        if self.listening {
            return false;
        }
        self.listening = true;
        true
    }

    /// Applies the result of a recognition session.
    ///
    /// A transcript overwrites the live input. Errors are logged. Either way
    /// the listening flag is reset.
    pub fn apply_transcript(&mut self, result: Result<String, SpeechError>) {
        self.listening = false;
        match result {
            Ok(transcript) => self.live_input = transcript,
            Err(e) => tracing::error!(error = %e, "Speech recognition failed"),
        }
    }

    /// Waits for queued speech, consuming the conversation.
    pub async fn finish(self) {
        self.speech.finish().await;
    }
}
