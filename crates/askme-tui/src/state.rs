//! TUI state.
//!
//! `AppState` pairs the core `Conversation` (turns, input, history, theme)
//! with view-only state in `TuiState`. Only the reducer mutates it; the
//! runtime touches the conversation when executing effects.

use std::time::Duration;

use askme_core::answer::render::Renderer;
use askme_core::conversation::Conversation;
use askme_core::model::ThemePreference;
use ratatui::text::Line;

use crate::common::DeferredTask;

/// Which pane receives keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Input,
    History,
}

/// One-line status message shown under the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// Single-line input editor (cursor is a char index).
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub cursor: usize,
}

impl InputState {
    pub fn insert(&mut self, buffer: &mut String, text: &str) {
        let at = byte_index(buffer, self.cursor);
        buffer.insert_str(at, text);
        self.cursor += text.chars().count();
    }

    pub fn backspace(&mut self, buffer: &mut String) {
        if self.cursor == 0 {
            return;
        }
        let at = byte_index(buffer, self.cursor - 1);
        buffer.remove(at);
        self.cursor -= 1;
    }

    pub fn delete(&mut self, buffer: &mut String) {
        if self.cursor < buffer.chars().count() {
            let at = byte_index(buffer, self.cursor);
            buffer.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self, buffer: &str) {
        self.cursor = (self.cursor + 1).min(buffer.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self, buffer: &str) {
        self.cursor = buffer.chars().count();
    }

    /// Clamps the cursor after the buffer was replaced externally.
    pub fn clamp(&mut self, buffer: &str) {
        self.cursor = self.cursor.min(buffer.chars().count());
    }
}

fn byte_index(s: &str, char_index: usize) -> usize {
    s.char_indices().nth(char_index).map_or(s.len(), |(i, _)| i)
}

/// Cached transcript lines plus the scroll position.
///
/// Lines are rebuilt only when the turn count, theme or width changes.
/// `follow_latest` pins the view to the bottom; a new answer holds the
/// current position until the deferred scroll releases it.
#[derive(Debug, Default)]
pub struct TranscriptView {
    pub lines: Vec<Line<'static>>,
    pub offset: usize,
    pub follow_latest: bool,
    pub viewport_height: usize,
    cache_key: Option<(usize, ThemePreference, usize)>,
}

impl TranscriptView {
    pub fn needs_rebuild(&self, turns: usize, theme: ThemePreference, width: usize) -> bool {
        self.cache_key != Some((turns, theme, width))
    }

    pub fn set_lines(
        &mut self,
        lines: Vec<Line<'static>>,
        turns: usize,
        theme: ThemePreference,
        width: usize,
    ) {
        self.lines = lines;
        self.cache_key = Some((turns, theme, width));
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.viewport_height)
    }

    /// Offset to render with, honoring `follow_latest`.
    pub fn effective_offset(&self) -> usize {
        if self.follow_latest {
            self.max_offset()
        } else {
            self.offset.min(self.max_offset())
        }
    }

    /// Stops following so appended lines stay below the fold.
    pub fn hold_position(&mut self) {
        self.offset = self.effective_offset();
        self.follow_latest = false;
    }

    pub fn scroll_to_latest(&mut self) {
        self.follow_latest = true;
        self.offset = self.max_offset();
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.offset = self.effective_offset().saturating_sub(lines);
        self.follow_latest = false;
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.offset = (self.effective_offset() + lines).min(self.max_offset());
        self.follow_latest = self.offset >= self.max_offset();
    }
}

/// View state owned by the TUI.
#[derive(Debug)]
pub struct TuiState {
    pub should_quit: bool,
    pub model: String,
    pub focus: Focus,
    /// False when the terminal is too narrow for the history sidebar.
    pub sidebar_visible: bool,
    pub input: InputState,
    /// Highlighted row in the history sidebar.
    pub history_cursor: usize,
    pub transcript: TranscriptView,
    pub renderer: Renderer,
    pub status: Option<StatusMessage>,
    pub speech_input_available: bool,
    pub scroll_delay: Duration,
    /// Deferred scroll-to-latest after an answer lands.
    pub pending_scroll: DeferredTask,
    pub spinner_frame: usize,
}

/// Whole application state.
pub struct AppState {
    pub conversation: Conversation,
    pub tui: TuiState,
}

/// Static settings the TUI is created with.
#[derive(Debug, Clone)]
pub struct TuiOptions {
    pub model: String,
    pub code_language: String,
    pub scroll_delay: Duration,
    pub speech_input_available: bool,
}

impl AppState {
    pub fn new(conversation: Conversation, options: TuiOptions) -> Self {
        let renderer = Renderer::new(conversation.theme(), options.code_language);
        Self {
            conversation,
            tui: TuiState {
                should_quit: false,
                model: options.model,
                focus: Focus::Input,
                sidebar_visible: true,
                input: InputState::default(),
                history_cursor: 0,
                transcript: TranscriptView {
                    follow_latest: true,
                    ..TranscriptView::default()
                },
                renderer,
                status: None,
                speech_input_available: options.speech_input_available,
                scroll_delay: options.scroll_delay,
                pending_scroll: DeferredTask::default(),
                spinner_frame: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_edits_respect_multibyte_chars() {
        let mut buffer = String::new();
        let mut input = InputState::default();
        input.insert(&mut buffer, "héllo");
        input.move_left();
        input.backspace(&mut buffer);
        assert_eq!(buffer, "hélo");
        input.move_home();
        input.delete(&mut buffer);
        assert_eq!(buffer, "élo");
        input.move_end(&buffer);
        assert_eq!(input.cursor, 3);
    }

    #[test]
    fn hold_position_then_release() {
        let mut view = TranscriptView {
            follow_latest: true,
            viewport_height: 5,
            ..TranscriptView::default()
        };
        view.set_lines(vec![Line::from("x"); 10], 2, ThemePreference::Dark, 40);
        assert_eq!(view.effective_offset(), 5);

        view.hold_position();
        view.set_lines(vec![Line::from("x"); 20], 4, ThemePreference::Dark, 40);
        assert_eq!(view.effective_offset(), 5);

        view.scroll_to_latest();
        assert_eq!(view.effective_offset(), 15);
    }

    #[test]
    fn scroll_down_to_bottom_resumes_following() {
        let mut view = TranscriptView {
            viewport_height: 5,
            ..TranscriptView::default()
        };
        view.set_lines(vec![Line::from("x"); 10], 1, ThemePreference::Dark, 40);
        view.scroll_up(3);
        assert!(!view.follow_latest);
        view.scroll_down(100);
        assert!(view.follow_latest);
    }
}
