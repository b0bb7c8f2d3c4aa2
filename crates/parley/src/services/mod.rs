//! External collaborators used by the translation pipeline.
//!
//! Each collaborator is a narrow async trait so the pipeline can be driven by
//! real HTTP/process adapters in production and by in-memory fakes in tests:
//!
//! | Trait | Default adapter |
//! |---|---|
//! | [`Transcriber`] | [`WhisperApiTranscriber`] (OpenAI-compatible API) |
//! | [`Translator`] | [`GoogleTranslator`] |
//! | [`SpeechSynthesizer`] | [`GoogleSpeech`] |
//! | [`DocumentRenderer`] | [`PdfRenderer`] |
//! | [`AudioCodec`] | [`FfmpegCodec`] |

mod error;
mod ffmpeg;
mod google;
mod pdf;
mod whisper;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{info, warn};

use crate::config::{ServicesConfig, read_env};
use crate::language::LanguageCode;

pub use error::ServiceError;
pub use ffmpeg::FfmpegCodec;
pub use google::{GoogleSpeech, GoogleTranslator};
pub use pdf::PdfRenderer;
pub use whisper::WhisperApiTranscriber;

/// Speech-to-text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe 16 kHz mono WAV audio.
    async fn transcribe(&self, audio: Bytes) -> Result<String, ServiceError>;
}

/// Machine translation.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target: LanguageCode) -> Result<String, ServiceError>;
}

/// Text-to-speech. Returns encoded audio (MP3).
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language: LanguageCode) -> Result<Bytes, ServiceError>;
}

/// Plain text to a document file (PDF).
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, text: &str) -> Result<Bytes, ServiceError>;
}

/// Audio container conversion, file to file.
#[async_trait]
pub trait AudioCodec: Send + Sync {
    /// Convert `input` into 16 kHz mono WAV at `output`.
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ServiceError>;
}

/// The full set of collaborators the pipeline depends on.
#[derive(Clone)]
pub struct Services {
    pub transcriber: Arc<dyn Transcriber>,
    pub translator: Arc<dyn Translator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub documents: Arc<dyn DocumentRenderer>,
    pub codec: Arc<dyn AudioCodec>,
}

impl Services {
    /// Build the default adapters from config. API keys come from the
    /// environment variables the config names.
    pub fn from_config(config: &ServicesConfig) -> Self {
        let transcription = &config.transcription;
        let api_key = read_env(&transcription.api_key_env);
        if api_key.is_none() {
            warn!(
                env = %transcription.api_key_env,
                "Transcription API key not set, voice messages will likely fail"
            );
        }
        info!(
            base_url = %transcription.base_url,
            model = %transcription.model,
            "Registered transcriber"
        );

        Self {
            transcriber: Arc::new(WhisperApiTranscriber::new(
                transcription.base_url.clone(),
                api_key,
                transcription.model.clone(),
            )),
            translator: Arc::new(GoogleTranslator::new(config.translate_url.clone())),
            synthesizer: Arc::new(GoogleSpeech::new(config.speech_url.clone())),
            documents: Arc::new(PdfRenderer::default()),
            codec: Arc::new(FfmpegCodec::new(config.ffmpeg_path.clone())),
        }
    }
}
