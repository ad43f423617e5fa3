//! UI event types.
//!
//! Everything the reducer reacts to: terminal input, frame/tick cadence and
//! results reported back by spawned tasks through the runtime inbox.

use askme_core::conversation::PendingQuestion;
use askme_core::ports::SpeechError;
use askme_core::providers::ProviderError;
use crossterm::event::Event;

use crate::common::TaskId;

#[derive(Debug)]
pub enum UiEvent {
    /// Render cadence.
    Tick,
    /// Current terminal size, sent before other events each loop.
    Frame { width: u16, height: u16 },
    Terminal(Event),
    /// The outbound call for `pending` finished.
    AnswerReady {
        pending: PendingQuestion,
        result: Result<String, ProviderError>,
    },
    /// A dictation session ended.
    DictationFinished { result: Result<String, SpeechError> },
    /// A deferred scroll elapsed without being superseded.
    ScrollDue { task: TaskId },
}
