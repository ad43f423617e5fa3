//! TUI reducer (update function).
//!
//! All state mutations happen here. The runtime calls `update(app, event)`
//! and executes the returned effects.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};
use ratatui::layout::Rect;

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::render;
use crate::state::{AppState, Focus, StatusMessage};

/// Lines moved per PageUp/PageDown when the viewport is unknown.
const MIN_PAGE: usize = 5;

/// Lines moved per mouse wheel notch.
const WHEEL_LINES: usize = 3;

/// The main reducer function.
pub fn update(app: &mut AppState, event: UiEvent) -> Vec<UiEffect> {
    match event {
        UiEvent::Tick => {
            app.tui.spinner_frame = app.tui.spinner_frame.wrapping_add(1);
            vec![]
        }
        UiEvent::Frame { width, height } => {
            handle_frame(app, width, height);
            vec![]
        }
        UiEvent::Terminal(term_event) => handle_terminal_event(app, term_event),
        UiEvent::AnswerReady { pending, result } => match result {
            Ok(answer) => {
                app.tui.status = None;
                vec![UiEffect::CompleteSubmission { pending, answer }]
            }
            Err(e) => {
                app.conversation.fail(pending);
                app.tui.status = Some(StatusMessage::error(format!("Request failed: {e}")));
                vec![]
            }
        },
        UiEvent::DictationFinished { result } => {
            if let Err(e) = &result {
                app.tui.status = Some(StatusMessage::error(format!("Dictation failed: {e}")));
            } else {
                app.tui.status = None;
            }
            app.conversation.apply_transcript(result);
            let input = app.conversation.input().to_string();
            app.tui.input.move_end(&input);
            vec![]
        }
        UiEvent::ScrollDue { task } => {
            if app.tui.pending_scroll.finish_if_active(task) {
                app.tui.transcript.scroll_to_latest();
            }
            vec![]
        }
    }
}

/// Recomputes layout-dependent state and rebuilds the transcript cache.
fn handle_frame(app: &mut AppState, width: u16, height: u16) {
    let areas = render::layout(Rect::new(0, 0, width, height));
    app.tui.sidebar_visible = areas.history.is_some();
    if !app.tui.sidebar_visible {
        app.tui.focus = Focus::Input;
    }

    let theme = app.conversation.theme();
    if app.tui.renderer.theme() != theme {
        app.tui.renderer.set_theme(theme);
    }

    let inner = render::inner(areas.transcript);
    let text_width = inner.width as usize;
    app.tui.transcript.viewport_height = inner.height as usize;

    let turns = app.conversation.turns().len();
    if app.tui.transcript.needs_rebuild(turns, theme, text_width) {
        let lines = render::transcript_lines(&app.conversation, &app.tui.renderer, text_width);
        app.tui.transcript.set_lines(lines, turns, theme, text_width);
    }

    let history_len = app.conversation.history().len();
    app.tui.history_cursor = app.tui.history_cursor.min(history_len.saturating_sub(1));
}

fn handle_terminal_event(app: &mut AppState, event: Event) -> Vec<UiEffect> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key(app, key),
        Event::Paste(text) => {
            if app.tui.focus == Focus::Input {
                let text = text.replace(['\r', '\n'], " ");
                app.tui.input.insert(app.conversation.input_mut(), &text);
            }
            vec![]
        }
        Event::Mouse(mouse) => {
            match mouse.kind {
                MouseEventKind::ScrollUp => app.tui.transcript.scroll_up(WHEEL_LINES),
                MouseEventKind::ScrollDown => app.tui.transcript.scroll_down(WHEEL_LINES),
                _ => {}
            }
            vec![]
        }
        _ => vec![],
    }
}

fn handle_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let page = app.tui.transcript.viewport_height.max(MIN_PAGE);

    // Global keys
    match key.code {
        KeyCode::Esc => return vec![UiEffect::Quit],
        KeyCode::Char('c') if ctrl => return vec![UiEffect::Quit],
        KeyCode::Char('t') if ctrl => return vec![UiEffect::ToggleTheme],
        KeyCode::Char('r') if ctrl => return start_dictation(app),
        KeyCode::Tab | KeyCode::BackTab => {
            toggle_focus(app);
            return vec![];
        }
        KeyCode::PageUp => {
            app.tui.transcript.scroll_up(page);
            return vec![];
        }
        KeyCode::PageDown => {
            app.tui.transcript.scroll_down(page);
            return vec![];
        }
        _ => {}
    }

    match app.tui.focus {
        Focus::Input => handle_input_key(app, key),
        Focus::History => handle_history_key(app, key),
    }
}

fn toggle_focus(app: &mut AppState) {
    app.tui.focus = match app.tui.focus {
        Focus::Input if app.tui.sidebar_visible && !app.conversation.history().is_empty() => {
            Focus::History
        }
        _ => Focus::Input,
    };
}

fn start_dictation(app: &mut AppState) -> Vec<UiEffect> {
    if !app.tui.speech_input_available {
        app.tui.status = Some(StatusMessage::info(
            "Dictation unavailable: set speech.input_command in config",
        ));
        return vec![];
    }
    if !app.conversation.begin_listening() {
        return vec![];
    }
    app.tui.focus = Focus::Input;
    app.tui.status = Some(StatusMessage::info("Listening…"));
    vec![UiEffect::StartDictation]
}

fn handle_input_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let input = &mut app.tui.input;

    match key.code {
        KeyCode::Enter => {
            app.tui.status = None;
            return vec![UiEffect::Submit];
        }
        KeyCode::Char('u') if ctrl => {
            app.conversation.set_input(String::new());
            input.move_home();
        }
        KeyCode::Char('a') if ctrl => input.move_home(),
        KeyCode::Char('e') if ctrl => input.move_end(app.conversation.input()),
        KeyCode::Char(c) if !ctrl => {
            input.insert(app.conversation.input_mut(), c.encode_utf8(&mut [0; 4]));
        }
        KeyCode::Backspace => input.backspace(app.conversation.input_mut()),
        KeyCode::Delete => input.delete(app.conversation.input_mut()),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(app.conversation.input()),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(app.conversation.input()),
        KeyCode::Up => app.tui.transcript.scroll_up(1),
        KeyCode::Down => app.tui.transcript.scroll_down(1),
        _ => {}
    }
    vec![]
}

fn handle_history_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let len = app.conversation.history().len();

    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            app.tui.history_cursor = app.tui.history_cursor.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if app.tui.history_cursor + 1 < len {
                app.tui.history_cursor += 1;
            }
        }
        KeyCode::Home => app.tui.history_cursor = 0,
        KeyCode::End => app.tui.history_cursor = len.saturating_sub(1),
        KeyCode::Enter => {
            if app
                .conversation
                .select_history(app.tui.history_cursor)
                .is_some()
            {
                app.tui.status = None;
                return vec![UiEffect::Submit];
            }
        }
        KeyCode::Char('x') if ctrl => {
            app.tui.focus = Focus::Input;
            app.tui.history_cursor = 0;
            return vec![UiEffect::ClearHistory];
        }
        _ => {}
    }
    vec![]
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use askme_core::conversation::Conversation;
    use askme_core::ports::SpeechError;
    use askme_core::providers::ProviderError;
    use askme_core::speech::NoSpeech;
    use askme_core::storage::MemoryStore;

    use super::*;
    use crate::state::TuiOptions;

    fn app_with_history(history: &[&str]) -> AppState {
        let store = MemoryStore::with_history(history.iter().map(ToString::to_string).collect());
        let conversation = Conversation::new(Box::new(store), Box::new(NoSpeech)).unwrap();
        let mut app = AppState::new(conversation, TuiOptions {
            model: "gemini-2.0-flash".into(),
            code_language: "javascript".into(),
            scroll_delay: Duration::from_millis(500),
            speech_input_available: true,
        });
        update(&mut app, UiEvent::Frame {
            width: 120,
            height: 40,
        });
        app
    }

    fn key(code: KeyCode) -> UiEvent {
        UiEvent::Terminal(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn ctrl(c: char) -> UiEvent {
        UiEvent::Terminal(Event::Key(KeyEvent::new(
            KeyCode::Char(c),
            KeyModifiers::CONTROL,
        )))
    }

    fn type_text(app: &mut AppState, text: &str) {
        for c in text.chars() {
            update(app, key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_typing_and_enter_submits() {
        let mut app = app_with_history(&[]);
        type_text(&mut app, "hi there");
        update(&mut app, key(KeyCode::Backspace));
        assert_eq!(app.conversation.input(), "hi ther");

        let effects = update(&mut app, key(KeyCode::Enter));
        assert!(matches!(effects.as_slice(), [UiEffect::Submit]));
    }

    #[test]
    fn test_esc_and_ctrl_c_quit() {
        let mut app = app_with_history(&[]);
        assert!(matches!(
            update(&mut app, key(KeyCode::Esc)).as_slice(),
            [UiEffect::Quit]
        ));
        assert!(matches!(
            update(&mut app, ctrl('c')).as_slice(),
            [UiEffect::Quit]
        ));
    }

    #[test]
    fn test_ctrl_t_toggles_theme() {
        let mut app = app_with_history(&[]);
        assert!(matches!(
            update(&mut app, ctrl('t')).as_slice(),
            [UiEffect::ToggleTheme]
        ));
    }

    #[test]
    fn test_answer_ready_completes_submission() {
        let mut app = app_with_history(&[]);
        app.conversation.set_input("question");
        let pending = app.conversation.begin_submit().unwrap().unwrap();

        let effects = update(&mut app, UiEvent::AnswerReady {
            pending,
            result: Ok("* one * two".to_string()),
        });
        match effects.as_slice() {
            [UiEffect::CompleteSubmission { pending, answer }] => {
                assert_eq!(pending.prompt(), "question");
                assert_eq!(answer, "* one * two");
            }
            other => panic!("unexpected effects: {other:?}"),
        }
    }

    #[test]
    fn test_failed_answer_keeps_input_and_shows_error() {
        let mut app = app_with_history(&[]);
        app.conversation.set_input("question");
        let pending = app.conversation.begin_submit().unwrap().unwrap();
        assert!(app.conversation.is_awaiting());

        let effects = update(&mut app, UiEvent::AnswerReady {
            pending,
            result: Err(ProviderError::http_status(503, "")),
        });
        assert!(effects.is_empty());
        assert!(!app.conversation.is_awaiting());
        assert!(app.conversation.turns().is_empty());
        assert_eq!(app.conversation.input(), "question");
        let status = app.tui.status.as_ref().unwrap();
        assert!(status.is_error);
        assert!(status.text.contains("HTTP 503"));
    }

    #[test]
    fn test_history_enter_selects_and_submits() {
        let mut app = app_with_history(&["newest", "older"]);
        update(&mut app, key(KeyCode::Tab));
        assert_eq!(app.tui.focus, Focus::History);

        update(&mut app, key(KeyCode::Down));
        let effects = update(&mut app, key(KeyCode::Enter));
        assert!(matches!(effects.as_slice(), [UiEffect::Submit]));
        assert_eq!(app.conversation.selected_history(), Some("older"));
    }

    #[test]
    fn test_tab_stays_on_input_without_history() {
        let mut app = app_with_history(&[]);
        update(&mut app, key(KeyCode::Tab));
        assert_eq!(app.tui.focus, Focus::Input);
    }

    #[test]
    fn test_ctrl_x_in_history_clears() {
        let mut app = app_with_history(&["one"]);
        update(&mut app, key(KeyCode::Tab));
        let effects = update(&mut app, ctrl('x'));
        assert!(matches!(effects.as_slice(), [UiEffect::ClearHistory]));
        assert_eq!(app.tui.focus, Focus::Input);
    }

    #[test]
    fn test_dictation_round_trip() {
        let mut app = app_with_history(&[]);
        let effects = update(&mut app, ctrl('r'));
        assert!(matches!(effects.as_slice(), [UiEffect::StartDictation]));
        assert!(app.conversation.is_listening());

        // Second press while listening does nothing.
        assert!(update(&mut app, ctrl('r')).is_empty());

        update(&mut app, UiEvent::DictationFinished {
            result: Ok("spoken text".to_string()),
        });
        assert!(!app.conversation.is_listening());
        assert_eq!(app.conversation.input(), "spoken text");
        assert_eq!(app.tui.input.cursor, "spoken text".len());
    }

    #[test]
    fn test_dictation_error_resets_listening() {
        let mut app = app_with_history(&[]);
        update(&mut app, ctrl('r'));
        update(&mut app, UiEvent::DictationFinished {
            result: Err(SpeechError::new("no microphone")),
        });
        assert!(!app.conversation.is_listening());
        assert!(app.tui.status.as_ref().unwrap().is_error);
    }

    #[test]
    fn test_dictation_unavailable_sets_status() {
        let mut app = app_with_history(&[]);
        app.tui.speech_input_available = false;
        assert!(update(&mut app, ctrl('r')).is_empty());
        assert!(!app.conversation.is_listening());
        assert!(app.tui.status.is_some());
    }

    #[test]
    fn test_stale_scroll_is_ignored() {
        let mut app = app_with_history(&[]);
        app.tui.transcript.hold_position();
        let (stale, _) = app.tui.pending_scroll.schedule();
        let (current, _) = app.tui.pending_scroll.schedule();

        update(&mut app, UiEvent::ScrollDue { task: stale });
        assert!(!app.tui.transcript.follow_latest);

        update(&mut app, UiEvent::ScrollDue { task: current });
        assert!(app.tui.transcript.follow_latest);
    }

    #[test]
    fn test_frame_rebuilds_transcript_after_answer() {
        let mut app = app_with_history(&[]);
        app.conversation.set_input("q");
        let pending = app.conversation.begin_submit().unwrap().unwrap();
        app.conversation.complete(pending, "a");

        update(&mut app, UiEvent::Frame {
            width: 120,
            height: 40,
        });
        // question, blank, answer, blank
        assert_eq!(app.tui.transcript.lines.len(), 4);
    }

    #[test]
    fn test_paste_flattens_newlines() {
        let mut app = app_with_history(&[]);
        update(
            &mut app,
            UiEvent::Terminal(Event::Paste("line one\nline two".to_string())),
        );
        assert_eq!(app.conversation.input(), "line one line two");
    }
}
