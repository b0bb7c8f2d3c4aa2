//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tempfile::TempDir;

use parley::config::PipelineConfig;
use parley::dispatch::{DispatchOutcome, Dispatcher};
use parley::gateway::{
    ChatTransport, EventContent, InboundEvent, InlineButton, MediaPayload, ReplyTarget, Sender,
    TransportError,
};
use parley::language::LanguageCode;
use parley::pipeline::Pipeline;
use parley::services::{
    AudioCodec, DocumentRenderer, ServiceError, Services, SpeechSynthesizer, Transcriber,
    Translator,
};
use parley::session::SessionStore;

// ============================================================================
// Transport
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        chat_id: String,
        text: String,
    },
    Audio {
        chat_id: String,
        path: PathBuf,
        existed: bool,
    },
    Document {
        chat_id: String,
        path: PathBuf,
        file_name: String,
        existed: bool,
    },
    Menu {
        chat_id: String,
        prompt: String,
        rows: Vec<Vec<InlineButton>>,
    },
    Answer {
        selection_id: String,
        text: String,
    },
}

pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    download: Result<Bytes, String>,
    uploads_fail: bool,
    send_delay: Duration,
}

impl RecordingTransport {
    pub fn new(download: Result<Bytes, String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            download,
            uploads_fail: false,
            send_delay: Duration::ZERO,
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts_to(&self, chat_id: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { chat_id: c, text } if c == chat_id => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, sent: Sent) {
        self.sent.lock().unwrap().push(sent);
    }

    /// Applies the configured delay, then fails if uploads are disabled.
    async fn upload(&self) -> Result<(), TransportError> {
        tokio::time::sleep(self.send_delay).await;
        if self.uploads_fail {
            return Err(TransportError::Send("upload rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, target: &ReplyTarget, text: &str) -> Result<(), TransportError> {
        tokio::time::sleep(self.send_delay).await;
        self.record(Sent::Text {
            chat_id: target.chat_id.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_audio(&self, target: &ReplyTarget, path: &Path) -> Result<(), TransportError> {
        self.upload().await?;
        self.record(Sent::Audio {
            chat_id: target.chat_id.clone(),
            path: path.to_path_buf(),
            existed: path.exists(),
        });
        Ok(())
    }

    async fn send_document(
        &self,
        target: &ReplyTarget,
        path: &Path,
        file_name: &str,
    ) -> Result<(), TransportError> {
        self.upload().await?;
        self.record(Sent::Document {
            chat_id: target.chat_id.clone(),
            path: path.to_path_buf(),
            file_name: file_name.to_string(),
            existed: path.exists(),
        });
        Ok(())
    }

    async fn send_menu(
        &self,
        target: &ReplyTarget,
        prompt: &str,
        rows: &[Vec<InlineButton>],
    ) -> Result<(), TransportError> {
        self.record(Sent::Menu {
            chat_id: target.chat_id.clone(),
            prompt: prompt.to_string(),
            rows: rows.to_vec(),
        });
        Ok(())
    }

    async fn answer_selection(
        &self,
        selection_id: &str,
        text: &str,
    ) -> Result<(), TransportError> {
        self.record(Sent::Answer {
            selection_id: selection_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn download(&self, _file_id: &str) -> Result<Bytes, TransportError> {
        self.download
            .clone()
            .map_err(TransportError::Download)
    }
}

// ============================================================================
// Collaborators
// ============================================================================

/// How the fake translator answers.
#[derive(Debug, Clone)]
pub enum TranslatorMode {
    /// Always return this text.
    Reply(String),
    /// Return `"[code] input"`.
    Tagged,
    Fail,
    /// Sleep longer than any test timeout.
    Hang,
}

pub struct FakeTranslator {
    mode: TranslatorMode,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl FakeTranslator {
    pub fn new(mode: TranslatorMode) -> Self {
        Self {
            mode,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, text: &str, target: LanguageCode) -> Result<String, ServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), target.code().to_string()));
        match &self.mode {
            TranslatorMode::Reply(reply) => Ok(reply.clone()),
            TranslatorMode::Tagged => Ok(format!("[{}] {}", target.code(), text)),
            TranslatorMode::Fail => Err(ServiceError::Api {
                status: 503,
                message: "upstream unavailable".to_string(),
            }),
            TranslatorMode::Hang => {
                tokio::time::sleep(Duration::from_secs(300)).await;
                Ok(String::new())
            }
        }
    }
}

pub struct FakeTranscriber {
    transcript: String,
    pub calls: Mutex<Vec<Bytes>>,
}

impl FakeTranscriber {
    pub fn new(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio: Bytes) -> Result<String, ServiceError> {
        self.calls.lock().unwrap().push(audio);
        Ok(self.transcript.clone())
    }
}

#[derive(Default)]
pub struct FakeSynthesizer {
    pub fail: bool,
    pub calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, language: LanguageCode) -> Result<Bytes, ServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), language.code().to_string()));
        if self.fail {
            return Err(ServiceError::Api {
                status: 500,
                message: "speech backend down".to_string(),
            });
        }
        Ok(Bytes::from_static(b"ID3fake"))
    }
}

#[derive(Default)]
pub struct FakeDocuments {
    pub fail: bool,
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl DocumentRenderer for FakeDocuments {
    async fn render(&self, text: &str) -> Result<Bytes, ServiceError> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(ServiceError::Unsupported(
                "character outside the document font".to_string(),
            ));
        }
        Ok(Bytes::from_static(b"%PDF-1.4 fake"))
    }
}

/// Copies input to output, recording the input path. When failing, leaves a
/// truncated output behind the way an aborted encoder would.
#[derive(Default)]
pub struct FakeCodec {
    pub fail: bool,
    pub inputs: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl AudioCodec for FakeCodec {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ServiceError> {
        self.inputs.lock().unwrap().push(input.to_path_buf());
        if self.fail {
            tokio::fs::write(output, b"RIFF").await?;
            return Err(ServiceError::Process("ffmpeg exited with status 1".to_string()));
        }
        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Options {
    pub translator: TranslatorMode,
    pub transcript: String,
    pub download: Result<Bytes, String>,
    pub document_max_chars: usize,
    pub call_timeout_seconds: u64,
    pub synthesizer_fails: bool,
    pub documents_fail: bool,
    pub codec_fails: bool,
    pub uploads_fail: bool,
    /// Delay applied to every text and file the transport sends.
    pub send_delay: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            translator: TranslatorMode::Tagged,
            transcript: "good morning".to_string(),
            download: Ok(Bytes::from_static(b"OggS voice")),
            document_max_chars: 10_000,
            call_timeout_seconds: 5,
            synthesizer_fails: false,
            documents_fail: false,
            codec_fails: false,
            uploads_fail: false,
            send_delay: Duration::ZERO,
        }
    }
}

pub struct Harness {
    pub dispatcher: Arc<Dispatcher>,
    pub transport: Arc<RecordingTransport>,
    pub translator: Arc<FakeTranslator>,
    pub transcriber: Arc<FakeTranscriber>,
    pub synthesizer: Arc<FakeSynthesizer>,
    pub documents: Arc<FakeDocuments>,
    pub codec: Arc<FakeCodec>,
    pub temp_dir: PathBuf,
    _temp: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(Options::default())
    }

    pub fn with(options: Options) -> Self {
        let temp = TempDir::new().unwrap();
        let temp_dir = temp.path().join("artifacts");

        let transport = Arc::new(RecordingTransport {
            uploads_fail: options.uploads_fail,
            send_delay: options.send_delay,
            ..RecordingTransport::new(options.download)
        });
        let translator = Arc::new(FakeTranslator::new(options.translator));
        let transcriber = Arc::new(FakeTranscriber::new(&options.transcript));
        let synthesizer = Arc::new(FakeSynthesizer {
            fail: options.synthesizer_fails,
            ..FakeSynthesizer::default()
        });
        let documents = Arc::new(FakeDocuments {
            fail: options.documents_fail,
            ..FakeDocuments::default()
        });
        let codec = Arc::new(FakeCodec {
            fail: options.codec_fails,
            ..FakeCodec::default()
        });

        let services = Services {
            transcriber: transcriber.clone(),
            translator: translator.clone(),
            synthesizer: synthesizer.clone(),
            documents: documents.clone(),
            codec: codec.clone(),
        };
        let config = PipelineConfig {
            temp_dir: temp_dir.clone(),
            call_timeout_seconds: options.call_timeout_seconds,
            document_max_chars: options.document_max_chars,
            max_tracked_events: None,
        };
        let pipeline = Pipeline::new(services, transport.clone(), &config);
        let dispatcher = Arc::new(Dispatcher::new(
            SessionStore::new(),
            pipeline,
            transport.clone(),
        ));

        Self {
            dispatcher,
            transport,
            translator,
            transcriber,
            synthesizer,
            documents,
            codec,
            temp_dir,
            _temp: temp,
        }
    }

    pub async fn dispatch(&self, event: InboundEvent) -> DispatchOutcome {
        self.dispatcher.dispatch(event).await
    }

    /// Files still present in the artifact directory.
    pub fn leftover_artifacts(&self) -> usize {
        std::fs::read_dir(&self.temp_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

// ============================================================================
// Events
// ============================================================================

fn event(user: &str, event_id: String, message_id: Option<String>, content: EventContent) -> InboundEvent {
    InboundEvent {
        event_id,
        user: Sender {
            id: user.to_string(),
            username: None,
            display_name: None,
        },
        chat_id: user.to_string(),
        message_id,
        received_at: Utc::now(),
        content,
    }
}

pub fn text(user: &str, message_id: u32, text: &str) -> InboundEvent {
    event(
        user,
        format!("{}:{}", user, message_id),
        Some(message_id.to_string()),
        EventContent::Text {
            text: text.to_string(),
        },
    )
}

pub fn voice(user: &str, message_id: u32) -> InboundEvent {
    event(
        user,
        format!("{}:{}", user, message_id),
        Some(message_id.to_string()),
        EventContent::Voice(MediaPayload {
            file_id: format!("voice-{}", message_id),
            file_name: None,
            mime_type: Some("audio/ogg".to_string()),
            size_bytes: Some(10),
        }),
    )
}

pub fn document(user: &str, message_id: u32) -> InboundEvent {
    event(
        user,
        format!("{}:{}", user, message_id),
        Some(message_id.to_string()),
        EventContent::Document(MediaPayload {
            file_id: format!("doc-{}", message_id),
            file_name: Some("notes.pdf".to_string()),
            mime_type: Some("application/pdf".to_string()),
            size_bytes: Some(2048),
        }),
    )
}

pub fn selection(user: &str, selection_id: &str, data: Option<&str>) -> InboundEvent {
    event(
        user,
        format!("cb:{}", selection_id),
        None,
        EventContent::Selection {
            selection_id: selection_id.to_string(),
            data: data.map(str::to_string),
        },
    )
}
