//! UI effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes.
//! They cover persistence, speech and task spawning; the reducer itself never
//! performs I/O.

use askme_core::conversation::PendingQuestion;

#[derive(Debug)]
pub enum UiEffect {
    Quit,

    /// Submit the live input (or the selected history item).
    Submit,

    /// Record a finished answer, speak it and schedule the deferred scroll.
    CompleteSubmission {
        pending: PendingQuestion,
        answer: String,
    },

    /// Persist the toggled theme.
    ToggleTheme,

    /// Remove every stored question.
    ClearHistory,

    /// Start a single-shot recognition session.
    StartDictation,
}
