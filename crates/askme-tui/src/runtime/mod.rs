//! TUI runtime - owns terminal, runs event loop, executes effects.
//!
//! This is the "Elm runtime" boundary: all side effects happen here.
//! The reducer stays pure and produces effects; this module executes them.
//!
//! ## Inbox Pattern
//!
//! - Spawned tasks (outbound call, dictation, deferred scroll) send their
//!   result as a `UiEvent` to `inbox_tx`
//! - The runtime drains `inbox_rx` each loop iteration
//!
//! Must run inside a multi-threaded tokio runtime: the loop blocks its thread
//! on terminal polling while spawned tasks progress on the others.

mod inbox;

use std::future::Future;
use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use askme_core::ports::{AnswerSource, SpeechInput};
use crossterm::event;
use inbox::{UiEventReceiver, UiEventSender};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::{AppState, StatusMessage};
use crate::{render, terminal, update};

/// Poll duration while something is in flight (spinner cadence).
pub const FRAME_DURATION: Duration = Duration::from_millis(33);

/// Poll duration when idle.
pub const IDLE_POLL_DURATION: Duration = Duration::from_millis(250);

/// Full-screen TUI runtime.
///
/// Owns the terminal and state. Terminal state is restored on drop or panic.
pub struct TuiRuntime {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    pub state: AppState,
    source: Arc<dyn AnswerSource>,
    speech_input: Arc<dyn SpeechInput>,
    inbox_tx: UiEventSender,
    inbox_rx: UiEventReceiver,
    last_tick: Instant,
}

impl TuiRuntime {
    /// Enters TUI mode.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be set up.
    pub fn new(
        state: AppState,
        source: Arc<dyn AnswerSource>,
        speech_input: Arc<dyn SpeechInput>,
    ) -> Result<Self> {
        // Panic hook goes in before the alternate screen.
        terminal::install_panic_hook();
        let terminal = terminal::setup_terminal().context("Failed to setup terminal")?;
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        Ok(Self {
            terminal,
            state,
            source,
            speech_input,
            inbox_tx,
            inbox_rx,
            last_tick: Instant::now(),
        })
    }

    /// Runs the main event loop until the user quits.
    ///
    /// # Errors
    /// Returns an error if drawing or reading terminal events fails.
    pub fn run(&mut self) -> Result<()> {
        terminal::enable_input_features()?;
        self.event_loop()
    }

    fn event_loop(&mut self) -> Result<()> {
        while !self.state.tui.should_quit {
            let mut events = self.collect_events()?;

            // Layout and transcript cache are refreshed before anything else.
            let size = self.terminal.size()?;
            events.insert(0, UiEvent::Frame {
                width: size.width,
                height: size.height,
            });

            for event in events {
                let effects = update::update(&mut self.state, event);
                self.execute_effects(effects);
            }

            // Effects can append turns; refresh the cache before drawing.
            let effects = update::update(&mut self.state, UiEvent::Frame {
                width: size.width,
                height: size.height,
            });
            self.execute_effects(effects);

            self.terminal.draw(|frame| render::render(&self.state, frame))?;
        }

        tracing::info!("TUI exiting");
        Ok(())
    }

    // ========================================================================
    // Event Collection
    // ========================================================================

    fn collect_events(&mut self) -> Result<Vec<UiEvent>> {
        let mut events = Vec::new();

        let busy = self.state.conversation.is_awaiting()
            || self.state.conversation.is_listening()
            || self.state.tui.pending_scroll.is_pending();
        let tick_interval = if busy {
            FRAME_DURATION
        } else {
            IDLE_POLL_DURATION
        };

        while let Ok(ev) = self.inbox_rx.try_recv() {
            events.push(ev);
        }

        let poll_duration = if events.is_empty() {
            tick_interval.saturating_sub(self.last_tick.elapsed())
        } else {
            Duration::ZERO
        };

        if event::poll(poll_duration)? {
            events.push(UiEvent::Terminal(event::read()?));
            while event::poll(Duration::ZERO)? {
                events.push(UiEvent::Terminal(event::read()?));
            }
        }

        if self.last_tick.elapsed() >= tick_interval {
            events.push(UiEvent::Tick);
            self.last_tick = Instant::now();
        }

        Ok(events)
    }

    // ========================================================================
    // Effect Dispatch
    // ========================================================================

    fn execute_effects(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    /// Spawns an async handler and sends its result event to the inbox.
    fn spawn_effect<F, Fut>(&self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = UiEvent> + Send + 'static,
    {
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(f().await);
        });
    }

    fn execute_effect(&mut self, effect: UiEffect) {
        match effect {
            UiEffect::Quit => {
                self.state.tui.should_quit = true;
            }
            UiEffect::Submit => self.submit(),
            UiEffect::CompleteSubmission { pending, answer } => {
                self.state.conversation.complete(pending, &answer);
                let input = self.state.conversation.input().to_string();
                self.state.tui.input.clamp(&input);
                self.state.tui.transcript.hold_position();
                self.schedule_scroll();
            }
            UiEffect::ToggleTheme => match self.state.conversation.toggle_theme() {
                Ok(theme) => {
                    self.state.tui.status = Some(StatusMessage::info(format!("Theme: {theme}")));
                }
                Err(e) => {
                    tracing::error!(error = %format!("{e:#}"), "Theme toggle failed");
                    self.state.tui.status = Some(StatusMessage::error(format!("{e:#}")));
                }
            },
            UiEffect::ClearHistory => match self.state.conversation.clear_history() {
                Ok(()) => {
                    self.state.tui.status = Some(StatusMessage::info("History cleared"));
                }
                Err(e) => {
                    tracing::error!(error = %format!("{e:#}"), "Clearing history failed");
                    self.state.tui.status = Some(StatusMessage::error(format!("{e:#}")));
                }
            },
            UiEffect::StartDictation => {
                let input = Arc::clone(&self.speech_input);
                self.spawn_effect(move || async move {
                    UiEvent::DictationFinished {
                        result: input.listen().await,
                    }
                });
            }
        }
    }

    fn submit(&mut self) {
        match self.state.conversation.begin_submit() {
            Ok(Some(pending)) => {
                let source = Arc::clone(&self.source);
                self.spawn_effect(move || async move {
                    let result = source.ask(pending.prompt()).await;
                    UiEvent::AnswerReady { pending, result }
                });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "Submission failed");
                self.state.tui.status = Some(StatusMessage::error(format!("{e:#}")));
            }
        }
    }

    /// Scrolls to the newest answer after the configured delay.
    ///
    /// Scheduling again supersedes the previous timer.
    fn schedule_scroll(&mut self) {
        let (task, cancel) = self.state.tui.pending_scroll.schedule();
        let delay = self.state.tui.scroll_delay;
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let _ = tx.send(UiEvent::ScrollDue { task });
                }
            }
        });
    }
}

impl Drop for TuiRuntime {
    fn drop(&mut self) {
        self.state.tui.pending_scroll.cancel();
        let _ = terminal::restore_terminal();
    }
}
