//! Chat platform integration.
//!
//! Gateways turn platform updates into [`InboundEvent`]s and push them onto
//! an mpsc channel. The core never talks to a platform SDK directly: replies,
//! menus, uploads and downloads all go through [`ChatTransport`].
//!
//! # Message Flow
//!
//! ```text
//!  Gateway (Telegram)
//!       │  InboundEvent over mpsc
//!       ▼
//!  run_event_loop()                   one task per event
//!       ▼
//!  Dispatcher::dispatch()             [dispatch.rs]
//!       ├─ command     → welcome / menu / help
//!       ├─ selection   → settings state machine
//!       └─ text, voice → Pipeline::run() → ChatTransport::send_*
//! ```

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::dispatch::Dispatcher;

#[cfg(feature = "gateway-telegram")]
mod telegram;

pub use parley_gateway_protocol::{
    EventContent, InboundEvent, InlineButton, MediaPayload, ReplyTarget, Sender,
};

#[cfg(feature = "gateway-telegram")]
pub use telegram::TelegramTransport;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("send failed: {0}")]
    Send(String),

    #[error("download failed: {0}")]
    Download(String),
}

/// Outbound operations against a chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, target: &ReplyTarget, text: &str) -> Result<(), TransportError>;

    async fn send_audio(&self, target: &ReplyTarget, path: &Path) -> Result<(), TransportError>;

    async fn send_document(
        &self,
        target: &ReplyTarget,
        path: &Path,
        file_name: &str,
    ) -> Result<(), TransportError>;

    /// Send `prompt` with an inline keyboard.
    async fn send_menu(
        &self,
        target: &ReplyTarget,
        prompt: &str,
        rows: &[Vec<InlineButton>],
    ) -> Result<(), TransportError>;

    /// Acknowledge a menu selection. Empty `text` acknowledges silently.
    async fn answer_selection(&self, selection_id: &str, text: &str)
    -> Result<(), TransportError>;

    async fn download(&self, file_id: &str) -> Result<Bytes, TransportError>;
}

/// Consume events until the channel closes, handling each on its own task.
///
/// Returns once every in-flight event has finished.
pub async fn run_event_loop(mut events: mpsc::Receiver<InboundEvent>, dispatcher: Arc<Dispatcher>) {
    let tracker = TaskTracker::new();

    while let Some(event) = events.recv().await {
        debug!(event_id = %event.event_id, "Event received");
        let dispatcher = Arc::clone(&dispatcher);
        tracker.spawn(async move {
            dispatcher.dispatch(event).await;
        });
    }

    tracker.close();
    info!(in_flight = tracker.len(), "Event stream closed, draining");
    tracker.wait().await;
}
