//! Event classification and routing.
//!
//! Every inbound event maps to exactly one [`EventKind`]. Commands and menu
//! selections are handled inline; text and voice content passes the
//! idempotency guard and then runs through the [`Pipeline`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Stage;
use crate::gateway::{ChatTransport, EventContent, InboundEvent, ReplyTarget};
use crate::pipeline::{Pipeline, PipelineInput, PipelineRequest};
use crate::session::{OutputFormat, SessionHandle, SessionStore, UserId};
use crate::settings::{self, SelectionOutcome};

pub const WELCOME_TEXT: &str = "Welcome to the Voice Translator Bot! 🎉\n\n\
This bot translates your voice messages and texts into your preferred language. \
You can receive the translations as text, voice, or PDF.\n\n\
Use /settings to choose the output format and language.\n\n\
How to use:\n\
1. Send a voice message, and I'll transcribe and translate it.\n\
2. Send a text, and I'll translate it.\n\
3. Send a PDF, and I'll let you know (text extraction is not supported yet).\n\n\
Ready to get started? Send me a voice message or some text!";

pub const WELCOME_BACK_TEXT: &str =
    "Welcome back! Ready to translate? Use /settings to customize.";

pub const DOCUMENT_NOTICE: &str =
    "Received your document. (Text extraction is not supported yet.)";

pub const UNSUPPORTED_NOTICE: &str =
    "Sorry, I can only translate voice messages and text. Use /help for details.";

pub const UNKNOWN_COMMAND_HINT: &str =
    "Unknown command. Try /start, /settings, or /help.";

// ============================================================================
// Classification
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Settings,
    Help,
    Unknown(String),
}

impl Command {
    /// Parse a slash-command. Returns `None` when `text` is not a command.
    ///
    /// The name is the first token without the leading `/` and without any
    /// `@botname` suffix; matching is case-insensitive.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.trim_start().strip_prefix('/')?;
        let token = rest.split_whitespace().next().unwrap_or("");
        let name = token.split('@').next().unwrap_or("").to_ascii_lowercase();
        Some(match name.as_str() {
            "start" => Self::Start,
            "settings" => Self::Settings,
            "help" => Self::Help,
            _ => Self::Unknown(name),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Command(Command),
    MenuSelection,
    VoiceContent,
    TextContent,
    DocumentContent,
    UnsupportedContent,
}

impl EventKind {
    pub fn classify(content: &EventContent) -> Self {
        match content {
            EventContent::Text { text } => match Command::parse(text) {
                Some(command) => Self::Command(command),
                None if text.trim().is_empty() => Self::UnsupportedContent,
                None => Self::TextContent,
            },
            EventContent::Voice(_) => Self::VoiceContent,
            EventContent::Document(_) => Self::DocumentContent,
            EventContent::Selection { .. } => Self::MenuSelection,
            EventContent::Other { .. } => Self::UnsupportedContent,
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// What handling an event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Welcomed,
    WelcomedBack,
    MenuOpened,
    HelpSent,
    UnknownCommand,
    Selection(SelectionOutcome),
    Delivered(OutputFormat),
    Failed(Stage),
    Duplicate,
    DocumentNotice,
    UnsupportedNotice,
}

pub struct Dispatcher {
    sessions: SessionStore,
    pipeline: Pipeline,
    transport: Arc<dyn ChatTransport>,
}

impl Dispatcher {
    pub fn new(
        sessions: SessionStore,
        pipeline: Pipeline,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            sessions,
            pipeline,
            transport,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn dispatch(&self, event: InboundEvent) -> DispatchOutcome {
        let user_id = UserId::new(event.user.id.clone());
        let session = self.sessions.get_or_create(&user_id);
        let target = event.reply_target();
        let kind = EventKind::classify(&event.content);
        debug!(user = %user_id, event = %event.event_id, ?kind, "Dispatching");

        match kind {
            EventKind::Command(command) => self.handle_command(command, &session, &target).await,
            EventKind::MenuSelection => self.handle_selection(&event, &session).await,
            EventKind::TextContent | EventKind::VoiceContent => {
                self.handle_content(event, &session, target).await
            }
            EventKind::DocumentContent => {
                self.reply(&target, DOCUMENT_NOTICE).await;
                DispatchOutcome::DocumentNotice
            }
            EventKind::UnsupportedContent => {
                self.reply(&target, UNSUPPORTED_NOTICE).await;
                DispatchOutcome::UnsupportedNotice
            }
        }
    }

    async fn handle_command(
        &self,
        command: Command,
        session: &SessionHandle,
        target: &ReplyTarget,
    ) -> DispatchOutcome {
        match command {
            Command::Start => {
                if session.mark_welcomed() {
                    info!(user = %session.user_id(), "New user welcomed");
                    self.reply(target, WELCOME_TEXT).await;
                    DispatchOutcome::Welcomed
                } else {
                    self.reply(target, WELCOME_BACK_TEXT).await;
                    DispatchOutcome::WelcomedBack
                }
            }
            Command::Settings => {
                let menu = settings::open_menu(session);
                if let Err(e) = self
                    .transport
                    .send_menu(target, menu.prompt, &menu.rows)
                    .await
                {
                    warn!(user = %session.user_id(), error = %e, "Failed to send settings menu");
                }
                DispatchOutcome::MenuOpened
            }
            Command::Help => {
                self.reply(target, &help_text(session)).await;
                DispatchOutcome::HelpSent
            }
            Command::Unknown(name) => {
                debug!(user = %session.user_id(), command = %name, "Unknown command");
                self.reply(target, UNKNOWN_COMMAND_HINT).await;
                DispatchOutcome::UnknownCommand
            }
        }
    }

    async fn handle_selection(
        &self,
        event: &InboundEvent,
        session: &SessionHandle,
    ) -> DispatchOutcome {
        let EventContent::Selection { selection_id, data } = &event.content else {
            return DispatchOutcome::UnsupportedNotice;
        };
        let outcome = settings::apply_selection(session, data.as_deref());
        if let Err(e) = self
            .transport
            .answer_selection(selection_id, &outcome.ack_text())
            .await
        {
            warn!(user = %session.user_id(), error = %e, "Failed to acknowledge selection");
        }
        DispatchOutcome::Selection(outcome)
    }

    async fn handle_content(
        &self,
        event: InboundEvent,
        session: &SessionHandle,
        target: ReplyTarget,
    ) -> DispatchOutcome {
        if !session.try_begin(&event.event_id) {
            debug!(user = %session.user_id(), event = %event.event_id, "Duplicate event dropped");
            return DispatchOutcome::Duplicate;
        }

        let input = match event.content {
            EventContent::Text { text } => PipelineInput::Text(text),
            EventContent::Voice(media) => PipelineInput::Voice(media),
            _ => return DispatchOutcome::UnsupportedNotice,
        };
        let request = PipelineRequest {
            event_id: event.event_id,
            input,
            preferences: session.preferences(),
            target,
        };
        let event_id = request.event_id.clone();
        let target = request.target.clone();

        match self.pipeline.run(request).await {
            Ok(format) => DispatchOutcome::Delivered(format),
            Err(e) => {
                warn!(
                    user = %session.user_id(),
                    event = %event_id,
                    stage = %e.stage(),
                    error = %e,
                    "Pipeline failed"
                );
                self.reply(&target, e.user_message()).await;
                DispatchOutcome::Failed(e.stage())
            }
        }
    }

    /// Send a plain reply. Failures are logged.
    async fn reply(&self, target: &ReplyTarget, text: &str) {
        if let Err(e) = self.transport.send_text(target, text).await {
            warn!(chat = %target.chat_id, error = %e, "Failed to send reply");
        }
    }
}

fn help_text(session: &SessionHandle) -> String {
    let preferences = session.preferences();
    format!(
        "Send me a voice message or some text and I'll translate it.\n\n\
         Current settings:\n\
         Output: {}\n\
         Language: {}\n\n\
         Commands:\n\
         /settings - choose output format and language\n\
         /help - show this message",
        preferences.output_format.label(),
        preferences.language.label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MediaPayload;

    #[test]
    fn parses_known_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/settings"), Some(Command::Settings));
        assert_eq!(Command::parse("/HELP"), Some(Command::Help));
    }

    #[test]
    fn strips_bot_suffix_and_arguments() {
        assert_eq!(Command::parse("/start@ParleyBot"), Some(Command::Start));
        assert_eq!(Command::parse("/settings now please"), Some(Command::Settings));
    }

    #[test]
    fn unknown_commands_keep_their_name() {
        assert_eq!(
            Command::parse("/translate hola"),
            Some(Command::Unknown("translate".to_string()))
        );
        assert_eq!(Command::parse("/"), Some(Command::Unknown(String::new())));
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(Command::parse("hello /start"), None);
        assert_eq!(Command::parse("hola"), None);
    }

    #[test]
    fn classifies_every_content_kind() {
        let media = MediaPayload {
            file_id: "f".into(),
            file_name: None,
            mime_type: None,
            size_bytes: None,
        };
        assert_eq!(
            EventKind::classify(&EventContent::Text { text: "hi".into() }),
            EventKind::TextContent
        );
        assert_eq!(
            EventKind::classify(&EventContent::Text {
                text: "/start".into()
            }),
            EventKind::Command(Command::Start)
        );
        assert_eq!(
            EventKind::classify(&EventContent::Voice(media.clone())),
            EventKind::VoiceContent
        );
        assert_eq!(
            EventKind::classify(&EventContent::Document(media)),
            EventKind::DocumentContent
        );
        assert_eq!(
            EventKind::classify(&EventContent::Selection {
                selection_id: "1".into(),
                data: None
            }),
            EventKind::MenuSelection
        );
        assert_eq!(
            EventKind::classify(&EventContent::Other {
                kind: "sticker".into()
            }),
            EventKind::UnsupportedContent
        );
    }

    #[test]
    fn help_lists_current_settings() {
        let store = SessionStore::new();
        let session = store.get_or_create(&UserId::new("7"));
        let text = help_text(&session);
        assert!(text.contains("Output: Text"));
        assert!(text.contains("English"));
    }
}
