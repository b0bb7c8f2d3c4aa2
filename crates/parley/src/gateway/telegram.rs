//! [`ChatTransport`] over the Telegram gateway.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use parley_gateway_telegram::TelegramGateway;

use super::{ChatTransport, InlineButton, ReplyTarget, TransportError};

pub struct TelegramTransport {
    gateway: TelegramGateway,
}

impl TelegramTransport {
    pub fn new(gateway: TelegramGateway) -> Self {
        Self { gateway }
    }
}

fn send_error(e: anyhow::Error) -> TransportError {
    TransportError::Send(format!("{:#}", e))
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, target: &ReplyTarget, text: &str) -> Result<(), TransportError> {
        self.gateway
            .send_text(&target.chat_id, target.reply_to.as_deref(), text)
            .await
            .map_err(send_error)
    }

    async fn send_audio(&self, target: &ReplyTarget, path: &Path) -> Result<(), TransportError> {
        self.gateway
            .send_audio(&target.chat_id, path)
            .await
            .map_err(send_error)
    }

    async fn send_document(
        &self,
        target: &ReplyTarget,
        path: &Path,
        file_name: &str,
    ) -> Result<(), TransportError> {
        self.gateway
            .send_document(&target.chat_id, path, file_name)
            .await
            .map_err(send_error)
    }

    async fn send_menu(
        &self,
        target: &ReplyTarget,
        prompt: &str,
        rows: &[Vec<InlineButton>],
    ) -> Result<(), TransportError> {
        self.gateway
            .send_keyboard(&target.chat_id, prompt, rows)
            .await
            .map_err(send_error)
    }

    async fn answer_selection(
        &self,
        selection_id: &str,
        text: &str,
    ) -> Result<(), TransportError> {
        self.gateway
            .answer_callback(selection_id, text)
            .await
            .map_err(send_error)
    }

    async fn download(&self, file_id: &str) -> Result<Bytes, TransportError> {
        self.gateway
            .download_file(file_id)
            .await
            .map(Bytes::from)
            .map_err(|e| TransportError::Download(format!("{:#}", e)))
    }
}
