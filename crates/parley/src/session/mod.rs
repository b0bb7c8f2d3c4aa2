//! Per-user session state.
//!
//! Every user gets exactly one [`UserSession`], created lazily on first
//! contact and kept for the lifetime of the process. Sessions live behind a
//! per-user mutex inside [`SessionStore`], so writes for one user never wait
//! on another user's lock.

mod guard;
mod store;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::language::LanguageCode;

pub use guard::ProcessedEvents;
pub use store::SessionStore;

// ============================================================================
// Types
// ============================================================================

/// Stable user identifier from the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How translations are delivered back to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Voice,
    Document,
}

impl OutputFormat {
    /// All formats, in menu order.
    pub const ALL: [OutputFormat; 3] = [Self::Text, Self::Voice, Self::Document];

    /// Parse a selection value. `pdf` is accepted as an alias for `document`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "voice" => Some(Self::Voice),
            "document" | "pdf" => Some(Self::Document),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Voice => "voice",
            Self::Document => "document",
        }
    }

    /// Button label shown in the settings menu.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Voice => "Voice",
            Self::Document => "PDF",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the settings menu was opened since the last selection.
///
/// Selections are accepted in both states; the platform keeps the keyboard
/// clickable until the user dismisses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuState {
    #[default]
    Idle,
    MenuOpen,
}

/// The settings a pipeline run needs, copied out of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preferences {
    pub output_format: OutputFormat,
    pub language: LanguageCode,
}

/// One user's session record.
#[derive(Debug)]
pub struct UserSession {
    pub user_id: UserId,
    pub output_format: OutputFormat,
    pub language: LanguageCode,
    pub welcome_sent: bool,
    pub menu: MenuState,
    pub processed_events: ProcessedEvents,
    pub updated_at: DateTime<Utc>,
}

impl UserSession {
    /// A fresh session with default settings.
    pub fn new(user_id: UserId, max_tracked_events: Option<usize>) -> Self {
        Self {
            user_id,
            output_format: OutputFormat::default(),
            language: LanguageCode::default(),
            welcome_sent: false,
            menu: MenuState::default(),
            processed_events: ProcessedEvents::new(max_tracked_events),
            updated_at: Utc::now(),
        }
    }

    pub fn preferences(&self) -> Preferences {
        Preferences {
            output_format: self.output_format,
            language: self.language,
        }
    }
}

// ============================================================================
// SessionHandle
// ============================================================================

/// Shared handle to one user's session. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<UserSession>>,
}

impl SessionHandle {
    fn new(session: UserSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Apply `f` while holding this user's lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut UserSession) -> R) -> R {
        let mut session = self.lock();
        let result = f(&mut session);
        session.updated_at = Utc::now();
        result
    }

    /// Read from the session while holding this user's lock.
    pub fn read<R>(&self, f: impl FnOnce(&UserSession) -> R) -> R {
        f(&self.lock())
    }

    pub fn user_id(&self) -> UserId {
        self.read(|s| s.user_id.clone())
    }

    pub fn preferences(&self) -> Preferences {
        self.read(UserSession::preferences)
    }

    pub fn welcome_sent(&self) -> bool {
        self.read(|s| s.welcome_sent)
    }

    /// Set `welcome_sent`, returning true only for the call that flipped it.
    pub fn mark_welcomed(&self) -> bool {
        self.update(|s| !std::mem::replace(&mut s.welcome_sent, true))
    }

    fn lock(&self) -> MutexGuard<'_, UserSession> {
        // A panic while holding the lock cannot leave a half-written field:
        // every mutation is a single assignment or set insert.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
