//! Telegram gateway for Parley.
//!
//! Polls the Bot API with `teloxide`, converts every message and callback
//! query into an [`InboundEvent`] and forwards it over an mpsc channel. The
//! outbound half is a set of plain async methods the core wraps in its own
//! transport trait.
//!
//! Event ids:
//!
//! - messages: `"{chat_id}:{message_id}"`, stable across redelivery
//! - callback queries: `"cb:{callback_query_id}"`

use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::Utc;
use parley_gateway_protocol::{EventContent, InboundEvent, InlineButton, MediaPayload, Sender};
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile,
    MaybeInaccessibleMessage, MessageId, ReplyParameters, User,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Bot API limit on message text, in UTF-16 code units.
const MAX_MESSAGE_UNITS: usize = 4096;

/// Telegram gateway configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
}

/// Telegram Bot API gateway.
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            bot: Bot::new(config.bot_token),
        }
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    /// Poll updates until Ctrl-C, forwarding each one to `events`.
    ///
    /// Handlers only convert and enqueue; all real work happens on the
    /// receiving side, so a slow pipeline never stalls polling.
    pub async fn run(&self, events: mpsc::Sender<InboundEvent>) {
        info!("Starting Telegram gateway");

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint({
                let events = events.clone();
                move |msg: Message| {
                    let events = events.clone();
                    async move {
                        if let Some(event) = message_to_event(&msg) {
                            forward(&events, event).await;
                        }
                        respond(())
                    }
                }
            }))
            .branch(Update::filter_callback_query().endpoint({
                let events = events.clone();
                move |q: CallbackQuery| {
                    let events = events.clone();
                    async move {
                        forward(&events, callback_to_event(&q)).await;
                        respond(())
                    }
                }
            }));

        Dispatcher::builder(self.bot.clone(), handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("Telegram gateway stopped");
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    /// Send a text message, quoting `reply_to` when given.
    ///
    /// Text over the Bot API length limit goes out as several messages; only
    /// the first one quotes `reply_to`.
    pub async fn send_text(
        &self,
        chat_id: &str,
        reply_to: Option<&str>,
        text: &str,
    ) -> anyhow::Result<()> {
        let chat = parse_chat_id(chat_id)?;
        let mut reply_to = reply_to.and_then(parse_message_id);
        for chunk in split_message(text, MAX_MESSAGE_UNITS) {
            let mut request = self.bot.send_message(chat, chunk);
            if let Some(message_id) = reply_to.take() {
                request = request.reply_parameters(ReplyParameters::new(message_id));
            }
            request.await?;
        }
        Ok(())
    }

    /// Send an audio file from disk.
    pub async fn send_audio(&self, chat_id: &str, path: &Path) -> anyhow::Result<()> {
        let chat = parse_chat_id(chat_id)?;
        self.bot
            .send_audio(chat, InputFile::file(path.to_path_buf()))
            .await?;
        Ok(())
    }

    /// Send a document from disk under the given display name.
    pub async fn send_document(
        &self,
        chat_id: &str,
        path: &Path,
        file_name: &str,
    ) -> anyhow::Result<()> {
        let chat = parse_chat_id(chat_id)?;
        let document = InputFile::file(path.to_path_buf()).file_name(file_name.to_string());
        self.bot.send_document(chat, document).await?;
        Ok(())
    }

    /// Send a text message with an inline keyboard.
    pub async fn send_keyboard(
        &self,
        chat_id: &str,
        text: &str,
        rows: &[Vec<InlineButton>],
    ) -> anyhow::Result<()> {
        let chat = parse_chat_id(chat_id)?;
        self.bot
            .send_message(chat, text)
            .reply_markup(build_keyboard(rows))
            .await?;
        Ok(())
    }

    /// Answer a callback query. An empty `text` just stops the client spinner.
    pub async fn answer_callback(&self, callback_id: &str, text: &str) -> anyhow::Result<()> {
        let mut request = self
            .bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()));
        if !text.is_empty() {
            request = request.text(text);
        }
        request.await?;
        Ok(())
    }

    /// Download a file by its Bot API file id.
    pub async fn download_file(&self, file_id: &str) -> anyhow::Result<Vec<u8>> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .context("get_file failed")?;
        let mut buf = Vec::new();
        self.bot
            .download_file(&file.path, &mut buf)
            .await
            .context("file download failed")?;
        debug!(file_id, bytes = buf.len(), "Downloaded file");
        Ok(buf)
    }
}

// ============================================================================
// Update conversion
// ============================================================================

async fn forward(events: &mpsc::Sender<InboundEvent>, event: InboundEvent) {
    if events.send(event).await.is_err() {
        warn!("Event receiver dropped, discarding Telegram update");
    }
}

fn message_to_event(msg: &Message) -> Option<InboundEvent> {
    // Channel posts have no sender and no per-user session to attach to.
    let user = msg.from.as_ref()?;

    let content = if let Some(text) = msg.text() {
        EventContent::Text {
            text: text.to_string(),
        }
    } else if let Some(voice) = msg.voice() {
        EventContent::Voice(MediaPayload {
            file_id: voice.file.id.to_string(),
            file_name: None,
            mime_type: voice.mime_type.as_ref().map(|m| m.to_string()),
            size_bytes: Some(u64::from(voice.file.size)),
        })
    } else if let Some(doc) = msg.document() {
        EventContent::Document(MediaPayload {
            file_id: doc.file.id.to_string(),
            file_name: doc.file_name.clone(),
            mime_type: doc.mime_type.as_ref().map(|m| m.to_string()),
            size_bytes: Some(u64::from(doc.file.size)),
        })
    } else {
        EventContent::Other {
            kind: other_kind(msg).to_string(),
        }
    };

    Some(InboundEvent {
        event_id: message_event_id(msg.chat.id.0, msg.id.0),
        user: sender(user),
        chat_id: msg.chat.id.0.to_string(),
        message_id: Some(msg.id.0.to_string()),
        received_at: Utc::now(),
        content,
    })
}

fn callback_to_event(q: &CallbackQuery) -> InboundEvent {
    let (chat_id, message_id) = match &q.message {
        Some(MaybeInaccessibleMessage::Regular(m)) => (m.chat.id.0, Some(m.id.0.to_string())),
        Some(MaybeInaccessibleMessage::Inaccessible(m)) => (m.chat.id.0, None),
        // Inline-mode callbacks carry no message; answer in the private chat.
        None => (q.from.id.0 as i64, None),
    };
    let selection_id = q.id.to_string();

    InboundEvent {
        event_id: callback_event_id(&selection_id),
        user: sender(&q.from),
        chat_id: chat_id.to_string(),
        message_id,
        received_at: Utc::now(),
        content: EventContent::Selection {
            selection_id,
            data: q.data.clone(),
        },
    }
}

fn sender(user: &User) -> Sender {
    let display_name = match &user.last_name {
        Some(last) => format!("{} {}", user.first_name, last),
        None => user.first_name.clone(),
    };
    Sender {
        id: user.id.0.to_string(),
        username: user.username.clone(),
        display_name: Some(display_name),
    }
}

fn other_kind(msg: &Message) -> &'static str {
    if msg.photo().is_some() {
        "photo"
    } else if msg.sticker().is_some() {
        "sticker"
    } else if msg.video().is_some() {
        "video"
    } else if msg.audio().is_some() {
        "audio"
    } else if msg.location().is_some() {
        "location"
    } else {
        "other"
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn message_event_id(chat_id: i64, message_id: i32) -> String {
    format!("{}:{}", chat_id, message_id)
}

fn callback_event_id(callback_id: &str) -> String {
    format!("cb:{}", callback_id)
}

fn parse_chat_id(chat_id: &str) -> anyhow::Result<ChatId> {
    chat_id
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| anyhow!("invalid Telegram chat id: {}", chat_id))
}

fn parse_message_id(message_id: &str) -> Option<MessageId> {
    message_id.parse::<i32>().ok().map(MessageId)
}

/// Split `text` into pieces of at most `limit` UTF-16 units, breaking at a
/// newline or whitespace when one is available.
fn split_message(text: &str, limit: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let mut units = 0;
        let mut end = rest.len();
        for (i, c) in rest.char_indices() {
            units += c.len_utf16();
            if units > limit {
                end = i;
                break;
            }
        }
        if end == rest.len() {
            chunks.push(rest);
            break;
        }
        if end == 0 {
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }

        let head = &rest[..end];
        let cut = if rest[end..].starts_with(char::is_whitespace) {
            end
        } else {
            head.rfind('\n')
                .or_else(|| head.rfind(char::is_whitespace))
                .filter(|&i| i > 0)
                .unwrap_or(end)
        };
        chunks.push(rest[..cut].trim_end());
        rest = rest[cut..].trim_start();
    }
    chunks
}

fn build_keyboard(rows: &[Vec<InlineButton>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.data.clone()))
            .collect::<Vec<_>>()
    }))
}
