//! Pure view/render functions for the TUI.
//!
//! Functions here take `&AppState`, draw to a ratatui `Frame` and never
//! mutate state. Transcript lines are built by the reducer (on `Frame`) via
//! [`transcript_lines`] and cached in `TranscriptView`.

use askme_core::answer::render::{ItemPosition, Renderer, SpanStyle, StyledLine};
use askme_core::conversation::Conversation;
use askme_core::model::{Role, ThemePreference};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::common::text::{sanitize_for_display, single_line, truncate_with_ellipsis, wrap_line};
use crate::state::{AppState, Focus};

/// Width of the history sidebar, borders included.
const SIDEBAR_WIDTH: u16 = 32;

/// Narrowest terminal that still shows the sidebar.
const MIN_WIDTH_FOR_SIDEBAR: u16 = 72;

const INPUT_HEIGHT: u16 = 3;

/// Spinner frames for the status line while awaiting an answer.
const SPINNER_FRAMES: &[&str] = &["◐", "◓", "◑", "◒"];

const KEY_HINTS: &str =
    "Enter ask · Tab history · Ctrl+R dictate · Ctrl+T theme · PgUp/PgDn scroll · Esc quit";

/// Screen regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppLayout {
    pub title: Rect,
    pub history: Option<Rect>,
    pub transcript: Rect,
    pub input: Rect,
    pub status: Rect,
}

pub fn layout(area: Rect) -> AppLayout {
    let [title, body, input, status] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(INPUT_HEIGHT),
        Constraint::Length(1),
    ])
    .areas(area);

    if body.width >= MIN_WIDTH_FOR_SIDEBAR {
        let [history, transcript] =
            Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
                .areas(body);
        AppLayout {
            title,
            history: Some(history),
            transcript,
            input,
            status,
        }
    } else {
        AppLayout {
            title,
            history: None,
            transcript: body,
            input,
            status,
        }
    }
}

/// Inner area of a bordered pane.
pub fn inner(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(area)
}

/// Colors for one theme.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub muted: Color,
    pub border: Color,
    pub accent: Color,
    pub question: Color,
    pub heading: Color,
    pub inline_code: Color,
    pub link: Color,
    pub error: Color,
}

pub fn palette(theme: ThemePreference) -> Palette {
    match theme {
        ThemePreference::Dark => Palette {
            bg: Color::Rgb(0x1b, 0x1d, 0x23),
            fg: Color::Rgb(0xd8, 0xde, 0xe9),
            muted: Color::Rgb(0x6b, 0x73, 0x80),
            border: Color::Rgb(0x3b, 0x42, 0x52),
            accent: Color::Rgb(0x88, 0xc0, 0xd0),
            question: Color::Rgb(0xeb, 0xcb, 0x8b),
            heading: Color::Rgb(0x81, 0xa1, 0xc1),
            inline_code: Color::Rgb(0xb4, 0x8e, 0xad),
            link: Color::Rgb(0x8f, 0xbc, 0xbb),
            error: Color::Rgb(0xbf, 0x61, 0x6a),
        },
        ThemePreference::Light => Palette {
            bg: Color::Rgb(0xfa, 0xfa, 0xfa),
            fg: Color::Rgb(0x24, 0x29, 0x2e),
            muted: Color::Rgb(0x6a, 0x73, 0x7d),
            border: Color::Rgb(0xd1, 0xd5, 0xda),
            accent: Color::Rgb(0x03, 0x66, 0xd6),
            question: Color::Rgb(0xb0, 0x88, 0x00),
            heading: Color::Rgb(0x00, 0x5c, 0xc5),
            inline_code: Color::Rgb(0x6f, 0x42, 0xc1),
            link: Color::Rgb(0x03, 0x2f, 0x62),
            error: Color::Rgb(0xcb, 0x24, 0x31),
        },
    }
}

fn span_style(style: SpanStyle, palette: &Palette) -> Style {
    let base = Style::default().fg(palette.fg);
    match style {
        SpanStyle::Plain | SpanStyle::Code(None) => base,
        SpanStyle::Lead | SpanStyle::Strong => base.add_modifier(Modifier::BOLD),
        SpanStyle::Question => Style::default()
            .fg(palette.question)
            .add_modifier(Modifier::BOLD),
        SpanStyle::Heading => Style::default()
            .fg(palette.heading)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        SpanStyle::Emphasis => base.add_modifier(Modifier::ITALIC),
        SpanStyle::InlineCode => Style::default().fg(palette.inline_code),
        SpanStyle::Link => Style::default()
            .fg(palette.link)
            .add_modifier(Modifier::UNDERLINED),
        SpanStyle::ListBullet => Style::default().fg(palette.accent),
        SpanStyle::CodeFence => Style::default().fg(palette.muted),
        SpanStyle::Code(Some(rgb)) => Style::default().fg(Color::Rgb(rgb.0, rgb.1, rgb.2)),
    }
}

fn to_line(line: &StyledLine, palette: &Palette, prefix: Option<Span<'static>>) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = prefix.into_iter().collect();
    spans.extend(line.spans.iter().map(|span| {
        Span::styled(
            sanitize_for_display(&span.text).into_owned(),
            span_style(span.style, palette),
        )
    }));
    Line::from(spans)
}

/// Builds the wrapped transcript for every turn of `conversation`.
pub fn transcript_lines(
    conversation: &Conversation,
    renderer: &Renderer,
    width: usize,
) -> Vec<Line<'static>> {
    let palette = palette(renderer.theme());
    let mut lines = Vec::new();

    for turn in conversation.turns() {
        match turn.role() {
            Role::Question => {
                let marker = Span::styled("› ", Style::default().fg(palette.accent));
                for (i, styled) in renderer.render_question(&turn.text()).iter().enumerate() {
                    let prefix = if i == 0 {
                        marker.clone()
                    } else {
                        Span::raw("  ")
                    };
                    lines.extend(wrap_line(to_line(styled, &palette, Some(prefix)), width));
                }
            }
            Role::Answer => {
                let total = turn.items().len();
                for (index, item) in turn.items().iter().enumerate() {
                    let position = ItemPosition::new(index, total);
                    for styled in renderer.render_answer_item(item, position) {
                        lines.extend(wrap_line(to_line(&styled, &palette, None), width));
                    }
                }
            }
        }
        lines.push(Line::default());
    }

    lines
}

/// Renders the entire TUI to the frame.
pub fn render(app: &AppState, frame: &mut Frame) {
    let palette = palette(app.conversation.theme());
    let areas = layout(frame.area());

    frame.render_widget(
        Block::default().style(Style::default().bg(palette.bg).fg(palette.fg)),
        frame.area(),
    );

    render_title(app, frame, areas.title, &palette);
    if let Some(history) = areas.history {
        render_history(app, frame, history, &palette);
    }
    render_transcript(app, frame, areas.transcript, &palette);
    render_input(app, frame, areas.input, &palette);
    render_status(app, frame, areas.status, &palette);
}

fn pane_block<'a>(title: &'a str, focused: bool, palette: &Palette) -> Block<'a> {
    let border = if focused {
        palette.accent
    } else {
        palette.border
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(Span::styled(title, Style::default().fg(palette.muted)))
}

fn render_title(app: &AppState, frame: &mut Frame, area: Rect, palette: &Palette) {
    let theme = app.conversation.theme();
    let theme_icon = match theme {
        ThemePreference::Dark => "☾",
        ThemePreference::Light => "☀",
    };
    let line = Line::from(vec![
        Span::styled(
            " askme ",
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(app.tui.model.clone(), Style::default().fg(palette.muted)),
        Span::styled(
            format!("  {theme_icon} {theme}"),
            Style::default().fg(palette.muted),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_history(app: &AppState, frame: &mut Frame, area: Rect, palette: &Palette) {
    let focused = app.tui.focus == Focus::History;
    let history = app.conversation.history();
    let title = format!(" History ({}) ", history.len());
    let block = pane_block(&title, focused, palette);
    let width = block.inner(area).width.saturating_sub(2) as usize;

    let selected = app.conversation.selected_history();
    let items: Vec<ListItem> = history
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let text = truncate_with_ellipsis(&single_line(entry), width);
            let is_cursor = focused && i == app.tui.history_cursor;
            let marker = if is_cursor { "▸ " } else { "  " };
            let mut style = Style::default().fg(palette.fg);
            if is_cursor {
                style = style.fg(palette.accent).add_modifier(Modifier::BOLD);
            } else if selected == Some(entry.as_str()) {
                style = style.add_modifier(Modifier::ITALIC);
            }
            ListItem::new(Line::from(vec![Span::raw(marker), Span::styled(text, style)]))
        })
        .collect();

    if items.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No questions yet",
            Style::default().fg(palette.muted),
        ))
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    // Keep the cursor row visible.
    let visible = block.inner(area).height as usize;
    let skip = app
        .tui
        .history_cursor
        .saturating_sub(visible.saturating_sub(1));
    let items: Vec<ListItem> = items.into_iter().skip(skip).collect();
    frame.render_widget(List::new(items).block(block), area);
}

fn render_transcript(app: &AppState, frame: &mut Frame, area: Rect, palette: &Palette) {
    let block = pane_block(" Conversation ", false, palette);
    let view = &app.tui.transcript;
    let height = block.inner(area).height as usize;

    if view.lines.is_empty() {
        let hint = Paragraph::new(Line::from(Span::styled(
            "Ask anything. Answers are read aloud when speech is available.",
            Style::default().fg(palette.muted),
        )))
        .block(block);
        frame.render_widget(hint, area);
        return;
    }

    let offset = view.effective_offset();
    let visible: Vec<Line<'static>> = view.lines.iter().skip(offset).take(height).cloned().collect();
    frame.render_widget(Paragraph::new(visible).block(block), area);
}

fn render_input(app: &AppState, frame: &mut Frame, area: Rect, palette: &Palette) {
    let focused = app.tui.focus == Focus::Input;
    let title = if app.conversation.is_listening() {
        " Listening… "
    } else {
        " Ask "
    };
    let block = pane_block(title, focused, palette);
    let inner_area = block.inner(area);
    let width = inner_area.width as usize;

    let input = app.conversation.input();
    let before_cursor: String = input.chars().take(app.tui.input.cursor).collect();
    let cursor_col = before_cursor.width();

    // Scroll horizontally so the cursor stays inside the box.
    let mut skip_cols = cursor_col.saturating_sub(width.saturating_sub(1));
    let mut visible = String::new();
    for ch in input.chars() {
        let w = ch.to_string().width();
        if skip_cols > 0 {
            skip_cols = skip_cols.saturating_sub(w);
            continue;
        }
        visible.push(ch);
    }
    let shown_cursor = cursor_col.min(width.saturating_sub(1));

    let paragraph = if input.is_empty() && !focused {
        Paragraph::new(Span::styled(
            "Press Tab to type",
            Style::default().fg(palette.muted),
        ))
    } else {
        Paragraph::new(Span::styled(
            sanitize_for_display(&visible).into_owned(),
            Style::default().fg(palette.fg),
        ))
    };
    frame.render_widget(paragraph.block(block), area);

    if focused {
        frame.set_cursor_position(Position::new(
            inner_area.x + u16::try_from(shown_cursor).unwrap_or(0),
            inner_area.y,
        ));
    }
}

fn render_status(app: &AppState, frame: &mut Frame, area: Rect, palette: &Palette) {
    let line = if app.conversation.is_awaiting() {
        let spinner = SPINNER_FRAMES[app.tui.spinner_frame % SPINNER_FRAMES.len()];
        let pending = app.conversation.in_flight();
        let label = if pending > 1 {
            format!(" {spinner} Waiting for {pending} answers…")
        } else {
            format!(" {spinner} Waiting for answer…")
        };
        Line::from(Span::styled(label, Style::default().fg(palette.accent)))
    } else if let Some(status) = &app.tui.status {
        let color = if status.is_error {
            palette.error
        } else {
            palette.muted
        };
        Line::from(Span::styled(
            format!(" {}", single_line(&status.text)),
            Style::default().fg(color),
        ))
    } else {
        let mut hints = KEY_HINTS.to_string();
        if app.tui.focus == Focus::History {
            hints = "Enter ask selected · Ctrl+X clear history · Tab back to input · Esc quit"
                .to_string();
        }
        Line::from(Span::styled(
            format!(" {hints}"),
            Style::default().fg(palette.muted),
        ))
    };
    frame.render_widget(Paragraph::new(line), area);
}
