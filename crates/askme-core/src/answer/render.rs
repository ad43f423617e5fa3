//! Renderer adapter: classified answer items to styled lines.
//!
//! Output is a host-independent `StyledLine` list; the TUI maps span styles to
//! terminal colors and the CLI prints the plain text.
//!
//! - `Heading` titles are rendered as inline markdown with the heading style;
//!   lines after the heading line are classified and rendered on their own
//! - `FencedCode` items go through the markdown engine; fenced blocks are
//!   highlighted by syntect keyed by their language tag
//! - `Plain` items are emitted as unformatted text
//! - The first item of a multi-item answer is emitted raw with the lead style

use std::borrow::Cow;
use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use super::{AnswerKind, Classified, DEFAULT_CODE_LANGUAGE, classify_with_language};
use crate::model::ThemePreference;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const DARK_CODE_THEME: &str = "base16-ocean.dark";
const LIGHT_CODE_THEME: &str = "InspiredGitHub";

/// 24-bit color produced by the syntax highlighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Semantic style of a span; hosts decide the actual colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStyle {
    Plain,
    /// Undecorated first item of a multi-item answer.
    Lead,
    Question,
    Heading,
    Strong,
    Emphasis,
    InlineCode,
    Link,
    ListBullet,
    /// Fence border and language label around a code block.
    CodeFence,
    /// Highlighted code; `None` when no highlight color is available.
    Code(Option<Rgb>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub text: String,
    pub style: SpanStyle,
}

impl StyledSpan {
    pub fn new(text: impl Into<String>, style: SpanStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledLine {
    pub spans: Vec<StyledSpan>,
}

impl StyledLine {
    pub fn new(spans: Vec<StyledSpan>) -> Self {
        Self { spans }
    }

    pub fn single(text: impl Into<String>, style: SpanStyle) -> Self {
        Self {
            spans: vec![StyledSpan::new(text, style)],
        }
    }

    /// Concatenated span text without styling.
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Where an item sits within its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemPosition {
    pub index: usize,
    pub total: usize,
}

impl ItemPosition {
    pub fn new(index: usize, total: usize) -> Self {
        Self { index, total }
    }

    /// First item of a multi-item list bypasses classification.
    pub fn is_lead(self) -> bool {
        self.index == 0 && self.total > 1
    }
}

/// Maps answer items to styled lines for a given theme.
#[derive(Debug, Clone)]
pub struct Renderer {
    theme: ThemePreference,
    code_language: String,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(ThemePreference::default(), DEFAULT_CODE_LANGUAGE)
    }
}

impl Renderer {
    pub fn new(theme: ThemePreference, code_language: impl Into<String>) -> Self {
        Self {
            theme,
            code_language: code_language.into(),
        }
    }

    pub fn theme(&self) -> ThemePreference {
        self.theme
    }

    pub fn set_theme(&mut self, theme: ThemePreference) {
        self.theme = theme;
    }

    /// Renders one answer item at `position` within its turn.
    pub fn render_answer_item(&self, item: &str, position: ItemPosition) -> Vec<StyledLine> {
        if position.is_lead() {
            return plain_lines(item, SpanStyle::Lead);
        }
        self.render_classified(&classify_with_language(item, &self.code_language))
    }

    /// Renders a question turn's text.
    pub fn render_question(&self, text: &str) -> Vec<StyledLine> {
        plain_lines(text, SpanStyle::Question)
    }

    pub fn render_classified(&self, classified: &Classified) -> Vec<StyledLine> {
        match classified.kind {
            AnswerKind::Heading => {
                let title = escape_block_marker(&classified.text);
                let mut lines = self.render_markdown(&title, SpanStyle::Heading);
                if let Some(body) = &classified.body {
                    lines.extend(
                        self.render_classified(&classify_with_language(body, &self.code_language)),
                    );
                }
                lines
            }
            AnswerKind::FencedCode => self.render_markdown(&classified.text, SpanStyle::Plain),
            AnswerKind::Plain => plain_lines(&classified.text, SpanStyle::Plain),
        }
    }

    /// Renders markdown with `base` as the style for ordinary text.
    pub fn render_markdown(&self, text: &str, base: SpanStyle) -> Vec<StyledLine> {
        let mut state = MarkdownState::new(base);

        for event in Parser::new(text) {
            match event {
                Event::Start(Tag::Strong) => state.strong = true,
                Event::End(TagEnd::Strong) => state.strong = false,
                Event::Start(Tag::Emphasis) => state.emphasis = true,
                Event::End(TagEnd::Emphasis) => state.emphasis = false,
                Event::Start(Tag::Link { .. }) => state.link = true,
                Event::End(TagEnd::Link) => state.link = false,
                Event::Start(Tag::Heading { .. }) => {
                    state.flush();
                    state.heading = true;
                }
                Event::End(TagEnd::Heading(_)) => {
                    state.flush();
                    state.heading = false;
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    state.flush();
                    state.code_lang = Some(match kind {
                        CodeBlockKind::Fenced(lang) => lang
                            .split_whitespace()
                            .next()
                            .unwrap_or_default()
                            .to_string(),
                        CodeBlockKind::Indented => String::new(),
                    });
                    state.code.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    let lang = state.code_lang.take().unwrap_or_default();
                    let code = std::mem::take(&mut state.code);
                    state.lines.extend(self.highlight_block(&code, &lang));
                }
                Event::Text(text) => {
                    if state.code_lang.is_some() {
                        state.code.push_str(&text);
                    } else {
                        state.push_text(&text);
                    }
                }
                Event::Code(code) => {
                    state
                        .current
                        .push(StyledSpan::new(code.to_string(), SpanStyle::InlineCode));
                }
                Event::SoftBreak => state.push_text(" "),
                Event::HardBreak | Event::End(TagEnd::Paragraph | TagEnd::Item) => state.flush(),
                Event::Start(Tag::List(start)) => {
                    state.flush();
                    state.lists.push(start);
                }
                Event::End(TagEnd::List(_)) => {
                    state.flush();
                    state.lists.pop();
                }
                Event::Start(Tag::Item) => {
                    state.flush();
                    let marker = state.next_item_marker();
                    state
                        .current
                        .push(StyledSpan::new(marker, SpanStyle::ListBullet));
                }
                _ => {}
            }
        }

        state.finish()
    }

    /// Highlights a fenced block, framing it with fence lines.
    fn highlight_block(&self, code: &str, lang: &str) -> Vec<StyledLine> {
        let (syntax, label) = self.resolve_syntax(lang);
        let mut lines = vec![StyledLine::single(
            format!("┌─ {label}"),
            SpanStyle::CodeFence,
        )];

        let theme = self.code_theme();
        let mut highlighter = theme.map(|t| HighlightLines::new(syntax, t));

        for raw in LinesWithEndings::from(code) {
            let mut spans = vec![StyledSpan::new("│ ", SpanStyle::CodeFence)];
            let highlighted = highlighter
                .as_mut()
                .and_then(|h| h.highlight_line(raw, &SYNTAX_SET).ok());
            match highlighted {
                Some(ranges) => {
                    for (style, piece) in ranges {
                        let piece = piece.trim_end_matches(['\n', '\r']);
                        if piece.is_empty() {
                            continue;
                        }
                        let fg = style.foreground;
                        spans.push(StyledSpan::new(
                            piece,
                            SpanStyle::Code(Some(Rgb(fg.r, fg.g, fg.b))),
                        ));
                    }
                }
                None => spans.push(StyledSpan::new(
                    raw.trim_end_matches(['\n', '\r']),
                    SpanStyle::Code(None),
                )),
            }
            lines.push(StyledLine::new(spans));
        }

        lines.push(StyledLine::single("└─", SpanStyle::CodeFence));
        lines
    }

    /// Looks up the syntax for `lang`, falling back to the default language
    /// and then to plain text. Returns the syntax and the label to display.
    fn resolve_syntax(&self, lang: &str) -> (&'static SyntaxReference, String) {
        let set: &'static SyntaxSet = &SYNTAX_SET;
        if !lang.is_empty()
            && let Some(syntax) = set.find_syntax_by_token(lang)
        {
            return (syntax, lang.to_string());
        }
        if let Some(syntax) = set.find_syntax_by_token(&self.code_language) {
            return (syntax, self.code_language.clone());
        }
        (set.find_syntax_plain_text(), "text".to_string())
    }

    fn code_theme(&self) -> Option<&'static Theme> {
        let themes: &'static ThemeSet = &THEME_SET;
        let name = match self.theme {
            ThemePreference::Dark => DARK_CODE_THEME,
            ThemePreference::Light => LIGHT_CODE_THEME,
        };
        themes.themes.get(name)
    }
}

/// Splits text into lines with a single style.
fn plain_lines(text: &str, style: SpanStyle) -> Vec<StyledLine> {
    text.lines()
        .map(|line| StyledLine::single(line, style))
        .collect()
}

/// Backslash-escapes a leading block marker so a heading title stays
/// inline (`1. Install` keeps its number, `> note` is not a quote).
fn escape_block_marker(title: &str) -> Cow<'_, str> {
    let digits = title.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && matches!(title.as_bytes().get(digits), Some(b'.' | b')')) {
        return Cow::Owned(format!("{}\\{}", &title[..digits], &title[digits..]));
    }

    let mut chars = title.chars();
    let needs_escape = match chars.next() {
        Some('>' | '#') => true,
        Some(c @ ('-' | '+' | '*' | '_')) => {
            let rest = chars.as_str();
            rest.is_empty()
                || rest.starts_with(char::is_whitespace)
                || rest.chars().all(|r| r == c || r.is_whitespace())
        }
        _ => title.starts_with("```") || title.starts_with("~~~"),
    };
    if needs_escape {
        Cow::Owned(format!("\\{title}"))
    } else {
        Cow::Borrowed(title)
    }
}

/// Accumulator for markdown events.
struct MarkdownState {
    base: SpanStyle,
    lines: Vec<StyledLine>,
    current: Vec<StyledSpan>,
    strong: bool,
    emphasis: bool,
    link: bool,
    heading: bool,
    /// Open lists; `Some(n)` is an ordered list whose next item is `n`.
    lists: Vec<Option<u64>>,
    code_lang: Option<String>,
    code: String,
}

impl MarkdownState {
    fn new(base: SpanStyle) -> Self {
        Self {
            base,
            lines: Vec::new(),
            current: Vec::new(),
            strong: false,
            emphasis: false,
            link: false,
            heading: false,
            lists: Vec::new(),
            code_lang: None,
            code: String::new(),
        }
    }

    fn text_style(&self) -> SpanStyle {
        if self.heading || self.base == SpanStyle::Heading {
            SpanStyle::Heading
        } else if self.link {
            SpanStyle::Link
        } else if self.strong {
            SpanStyle::Strong
        } else if self.emphasis {
            SpanStyle::Emphasis
        } else {
            self.base
        }
    }

    fn next_item_marker(&mut self) -> String {
        match self.lists.last_mut() {
            Some(Some(n)) => {
                let marker = format!("{n}. ");
                *n += 1;
                marker
            }
            _ => "• ".to_string(),
        }
    }

    fn push_text(&mut self, text: &str) {
        let style = self.text_style();
        self.current.push(StyledSpan::new(text, style));
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.lines
                .push(StyledLine::new(std::mem::take(&mut self.current)));
        }
    }

    fn finish(mut self) -> Vec<StyledLine> {
        self.flush();
        self.lines
    }
}
