//! Text utilities for TUI rendering.

use std::borrow::Cow;

use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Truncates a string with an ellipsis if it exceeds `max_width` columns.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width <= 1 {
        return "…".to_string();
    }
    let mut truncated = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width + 1 > max_width {
            break;
        }
        width += ch_width;
        truncated.push(ch);
    }
    truncated.push('…');
    truncated
}

/// Strips ANSI escapes and expands tabs to four spaces.
///
/// Model output and recognizer transcripts are displayed verbatim, so both
/// would otherwise corrupt the layout.
pub fn sanitize_for_display(s: &str) -> Cow<'_, str> {
    if s.contains('\x1b') || s.contains('\t') {
        Cow::Owned(s.replace('\x1b', "").replace('\t', "    "))
    } else {
        Cow::Borrowed(s)
    }
}

/// Collapses a possibly multi-line string onto one line for list display.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Wraps a styled line to `width` columns.
///
/// Breaks after the last space that fits; words longer than the width are
/// split mid-word. Span styles are preserved across breaks.
pub fn wrap_line(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    if width == 0 || line.width() <= width {
        return vec![line];
    }

    let base = line.style;
    let cells: Vec<(char, Style)> = line
        .spans
        .iter()
        .flat_map(|span| span.content.chars().map(move |c| (c, span.style)))
        .collect();

    let mut out = Vec::new();
    let mut start = 0;
    while start < cells.len() {
        let mut used = 0;
        let mut end = start;
        let mut last_space = None;
        while end < cells.len() {
            let (ch, _) = cells[end];
            let ch_width = ch.width().unwrap_or(0);
            if used + ch_width > width {
                break;
            }
            if ch == ' ' {
                last_space = Some(end);
            }
            used += ch_width;
            end += 1;
        }
        if end < cells.len()
            && let Some(space) = last_space.filter(|&space| space > start)
        {
            end = space + 1;
        }
        if end == start {
            end = start + 1;
        }
        out.push(cells_to_line(&cells[start..end], base));
        start = end;
    }
    out
}

fn cells_to_line(cells: &[(char, Style)], base: Style) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut text = String::new();
    let mut current: Option<Style> = None;

    for &(ch, style) in cells {
        if current.is_some_and(|s| s != style) {
            spans.push(Span::styled(std::mem::take(&mut text), current.unwrap_or_default()));
        }
        current = Some(style);
        text.push(ch);
    }
    if let Some(style) = current {
        let trimmed = text.trim_end_matches(' ').to_string();
        if !trimmed.is_empty() {
            spans.push(Span::styled(trimmed, style));
        }
    }
    Line::from(spans).style(base)
}
