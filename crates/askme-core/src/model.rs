//! Conversation data model: turns and the theme preference.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Question,
    Answer,
}

/// One question or one answer in the visible conversation.
///
/// Immutable after creation. Answer turns keep their display items (the
/// bullet-split segments); question turns hold a single item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    items: Vec<String>,
}

impl Turn {
    pub fn question(text: impl Into<String>) -> Self {
        Self {
            role: Role::Question,
            items: vec![text.into()],
        }
    }

    pub fn answer(items: Vec<String>) -> Self {
        Self {
            role: Role::Answer,
            items,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Full text of the turn (items joined by single spaces).
    pub fn text(&self) -> String {
        self.items.join(" ")
    }
}

/// Persisted color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    #[default]
    Dark,
    Light,
}

impl ThemePreference {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemePreference::Dark => "dark",
            ThemePreference::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ThemePreference::Dark => ThemePreference::Light,
            ThemePreference::Light => ThemePreference::Dark,
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(ThemePreference::Dark),
            "light" => Ok(ThemePreference::Light),
            other => Err(format!("Unknown theme '{other}'. Valid options: dark, light")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_parses_case_insensitively() {
        assert_eq!("Light".parse::<ThemePreference>(), Ok(ThemePreference::Light));
        assert_eq!(" dark ".parse::<ThemePreference>(), Ok(ThemePreference::Dark));
        assert!("solarized".parse::<ThemePreference>().is_err());
    }

    #[test]
    fn theme_toggle_flips() {
        assert_eq!(ThemePreference::Dark.toggled(), ThemePreference::Light);
        assert_eq!(ThemePreference::Light.toggled(), ThemePreference::Dark);
        assert_eq!(ThemePreference::default(), ThemePreference::Dark);
    }

    #[test]
    fn answer_text_joins_items() {
        let turn = Turn::answer(vec!["First point".into(), "second point".into()]);
        assert_eq!(turn.role(), Role::Answer);
        assert_eq!(turn.text(), "First point second point");
    }
}
