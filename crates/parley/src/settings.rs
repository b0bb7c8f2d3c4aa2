//! Settings menu and selection handling.
//!
//! The settings command opens an inline keyboard with the output formats and
//! the language catalog. Each button press comes back as a selection payload:
//!
//! - `format:<text|voice|document>` sets the output format
//! - `lang:<code>` sets the target language
//!
//! Invalid values are acknowledged and leave the session untouched. Unknown
//! prefixes are ignored.

use parley_gateway_protocol::InlineButton;
use thiserror::Error;
use tracing::{debug, info};

use crate::language::LanguageCode;
use crate::session::{MenuState, OutputFormat, SessionHandle};

const FORMAT_PREFIX: &str = "format:";
const LANGUAGE_PREFIX: &str = "lang:";

/// Language buttons per keyboard row.
const LANGUAGES_PER_ROW: usize = 2;

pub const MENU_PROMPT: &str = "Choose your settings:";

/// A rejected settings selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
}

impl SettingsError {
    /// Acknowledgement shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "Unknown output format, nothing changed.",
            Self::UnsupportedLanguage(_) => "Unsupported language, nothing changed.",
        }
    }
}

// ============================================================================
// Menu
// ============================================================================

/// The keyboard sent in reply to the settings command.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsMenu {
    pub prompt: &'static str,
    pub rows: Vec<Vec<InlineButton>>,
}

/// Build the settings keyboard: one row of formats, then languages in pairs.
pub fn build_menu() -> SettingsMenu {
    let mut rows = Vec::new();

    rows.push(
        OutputFormat::ALL
            .iter()
            .map(|f| InlineButton::new(f.label(), format!("{}{}", FORMAT_PREFIX, f.as_str())))
            .collect(),
    );

    let languages: Vec<_> = LanguageCode::all()
        .map(|l| InlineButton::new(l.label(), format!("{}{}", LANGUAGE_PREFIX, l.code())))
        .collect();
    rows.extend(languages.chunks(LANGUAGES_PER_ROW).map(<[_]>::to_vec));

    SettingsMenu {
        prompt: MENU_PROMPT,
        rows,
    }
}

/// Open the menu for a session.
pub fn open_menu(session: &SessionHandle) -> SettingsMenu {
    session.update(|s| s.menu = MenuState::MenuOpen);
    build_menu()
}

// ============================================================================
// Selections
// ============================================================================

/// A parsed selection payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<'a> {
    Format(&'a str),
    Language(&'a str),
    Unknown,
}

impl<'a> Selection<'a> {
    pub fn parse(data: Option<&'a str>) -> Self {
        let Some(data) = data else {
            return Self::Unknown;
        };
        if let Some(value) = data.strip_prefix(FORMAT_PREFIX) {
            Self::Format(value)
        } else if let Some(code) = data.strip_prefix(LANGUAGE_PREFIX) {
            Self::Language(code)
        } else {
            Self::Unknown
        }
    }
}

/// What a selection did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    FormatChanged(OutputFormat),
    LanguageChanged(LanguageCode),
    Rejected(SettingsError),
    Ignored,
}

impl SelectionOutcome {
    /// Acknowledgement text. Empty for ignored payloads.
    pub fn ack_text(&self) -> String {
        match self {
            Self::FormatChanged(format) => format!("Output set to {}", format.label()),
            Self::LanguageChanged(language) => format!("Language set to {}", language.label()),
            Self::Rejected(err) => err.user_message().to_string(),
            Self::Ignored => String::new(),
        }
    }
}

/// Validate a selection and apply it to the session.
pub fn apply_selection(session: &SessionHandle, data: Option<&str>) -> SelectionOutcome {
    let outcome = match Selection::parse(data) {
        Selection::Format(value) => match OutputFormat::parse(value) {
            Some(format) => {
                session.update(|s| {
                    s.output_format = format;
                    s.menu = MenuState::Idle;
                });
                SelectionOutcome::FormatChanged(format)
            }
            None => SelectionOutcome::Rejected(SettingsError::UnsupportedFormat(value.to_string())),
        },
        Selection::Language(code) => match LanguageCode::parse(code) {
            Some(language) => {
                session.update(|s| {
                    s.language = language;
                    s.menu = MenuState::Idle;
                });
                SelectionOutcome::LanguageChanged(language)
            }
            None => {
                SelectionOutcome::Rejected(SettingsError::UnsupportedLanguage(code.to_string()))
            }
        },
        Selection::Unknown => {
            debug!(data = ?data, "Ignoring unknown selection payload");
            SelectionOutcome::Ignored
        }
    };

    match &outcome {
        SelectionOutcome::FormatChanged(format) => {
            info!(user = %session.user_id(), format = %format, "Output format changed");
        }
        SelectionOutcome::LanguageChanged(language) => {
            info!(user = %session.user_id(), language = %language, "Language changed");
        }
        SelectionOutcome::Rejected(err) => {
            info!(user = %session.user_id(), error = %err, "Settings selection rejected");
        }
        SelectionOutcome::Ignored => {}
    }

    outcome
}
