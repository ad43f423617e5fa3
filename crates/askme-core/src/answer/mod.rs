//! Answer post-processing.
//!
//! Turns the raw text returned by the model into display items:
//! - `split_answer()`: splits on the bullet marker and trims each item
//! - `classify()`: tags an item as `Heading`, `FencedCode` or `Plain` and
//!   rewrites it for the renderer
//!
//! Rendering of classified items lives in [`render`].

pub mod render;

use std::sync::LazyLock;

use regex::Regex;

/// Language tag used when wrapping code-like text in a fenced block.
pub const DEFAULT_CODE_LANGUAGE: &str = "javascript";

/// Substring the model uses to start a bullet point.
pub const BULLET_MARKER: &str = "* ";

/// Markdown fence marker.
pub const FENCE: &str = "```";

/// Keyword fragments of common procedural syntax.
///
/// Deliberately coarse: prose such as "let me explain" matches too.
static CODE_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"for\s*\(|if\s*\(|while\s*\(|const\s+|let\s+|var\s+|function\s*\(|=>")
        .expect("valid regex")
});

/// ATX heading line (`# ` .. `###### `); a closing `#` run only counts
/// after whitespace.
static ATX_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#{1,6}\s+(?P<title>.+?)(?:\s+#+)?\s*$")
        .expect("valid regex")
});

/// Whole item wrapped in a bold pair (`**Title**`).
static BOLD_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\*\*(?P<title>[^*].*?)\*{1,2}\s*$")
        .expect("valid regex")
});

/// Classification of a single answer item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    /// Section title; the marker has been stripped. Lines after the
    /// heading line are kept in `body`.
    Heading,
    /// Contains at least one fenced block (existing or added).
    FencedCode,
    /// Anything else, unchanged.
    Plain,
}

/// A classified answer item ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub kind: AnswerKind,
    pub text: String,
    /// Text following a heading line, if any.
    pub body: Option<String>,
}

impl Classified {
    fn new(kind: AnswerKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            body: None,
        }
    }

    fn heading(title: String, body: Option<String>) -> Self {
        Self {
            kind: AnswerKind::Heading,
            text: title,
            body,
        }
    }
}

/// Splits raw model output into trimmed display items.
///
/// Segments are separated by [`BULLET_MARKER`]. Empty segments (a leading
/// marker, or two markers in a row) are dropped.
pub fn split_answer(raw: &str) -> Vec<String> {
    raw.split(BULLET_MARKER)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Text handed to speech synthesis for a list of items.
pub fn spoken_text(items: &[String]) -> String {
    items.join(" ")
}

/// Classifies an item using the default code language.
pub fn classify(text: &str) -> Classified {
    classify_with_language(text, DEFAULT_CODE_LANGUAGE)
}

/// Classifies an item, wrapping code-like text with `language`.
///
/// Precedence: heading, then fenced code, then plain.
pub fn classify_with_language(text: &str, language: &str) -> Classified {
    if let Some(title) = heading_title(text) {
        let body = text
            .split_once('\n')
            .map(|(_, rest)| rest.trim())
            .filter(|rest| !rest.is_empty())
            .map(str::to_string);
        return Classified::heading(title, body);
    }
    if has_fence(text) {
        return Classified::new(AnswerKind::FencedCode, text);
    }
    if looks_like_code(text) {
        return Classified::new(AnswerKind::FencedCode, wrap_in_fence(text, language));
    }
    Classified::new(AnswerKind::Plain, text)
}

/// Returns the heading title with its marker stripped, if `text` starts
/// with a heading.
///
/// An ATX marker is checked on the first line only. The bold form must be
/// the whole single-line item.
pub fn heading_title(text: &str) -> Option<String> {
    let first_line = text.lines().next()?;
    if let Some(caps) = ATX_HEADING.captures(first_line) {
        let title = caps.name("title")?.as_str().trim();
        return (!title.is_empty()).then(|| title.to_string());
    }
    if text.contains('\n') {
        return None;
    }
    let caps = BOLD_HEADING.captures(text)?;
    let title = caps.name("title")?.as_str().trim();
    // `**A** and **B**` is inline emphasis, not a title.
    (!title.is_empty() && !title.contains("**")).then(|| title.to_string())
}

/// Returns true if `text` already contains a fence marker.
pub fn has_fence(text: &str) -> bool {
    text.contains(FENCE)
}

/// Returns true if `text` matches the procedural-keyword heuristic.
pub fn looks_like_code(text: &str) -> bool {
    CODE_HINT.is_match(text)
}

/// Wraps `text` in exactly one fenced block tagged with `language`.
pub fn wrap_in_fence(text: &str, language: &str) -> String {
    format!("{FENCE}{language}\n{text}\n{FENCE}")
}
