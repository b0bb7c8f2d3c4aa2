use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;

use serde::Deserialize;
use thiserror::Error;

use crate::render::DEFAULT_DOCUMENT_MAX_CHARS;

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramSection,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub services: ServicesConfig,
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Ok(serde_saphyr::from_str(&contents)?)
    }

    /// Read the bot token from the configured environment variable.
    pub fn bot_token(&self) -> Result<String, ConfigError> {
        read_env(&self.telegram.token_env)
            .ok_or_else(|| ConfigError::MissingToken(self.telegram.token_env.clone()))
    }
}

/// Non-empty value of `name`, if set.
pub(crate) fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// ============================================================================
// TelegramSection
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TelegramSection {
    /// Name of the environment variable holding the bot token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
        }
    }
}

fn default_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".to_string()
}

// ============================================================================
// PipelineConfig
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
    #[serde(default = "default_call_timeout")]
    pub call_timeout_seconds: u64,
    #[serde(default = "default_document_max_chars")]
    pub document_max_chars: usize,
    /// Bound on remembered event ids per user. Unbounded when unset.
    #[serde(default)]
    pub max_tracked_events: Option<usize>,
}

impl PipelineConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_seconds.max(1))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            call_timeout_seconds: default_call_timeout(),
            document_max_chars: default_document_max_chars(),
            max_tracked_events: None,
        }
    }
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("/tmp/parley")
}

fn default_call_timeout() -> u64 {
    60
}

fn default_document_max_chars() -> usize {
    DEFAULT_DOCUMENT_MAX_CHARS
}

// ============================================================================
// ServicesConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_translate_url")]
    pub translate_url: String,
    #[serde(default = "default_speech_url")]
    pub speech_url: String,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            translate_url: default_translate_url(),
            speech_url: default_speech_url(),
            transcription: TranscriptionConfig::default(),
            ffmpeg_path: default_ffmpeg_path(),
        }
    }
}

fn default_translate_url() -> String {
    "https://translate.googleapis.com/translate_a/single".to_string()
}

fn default_speech_url() -> String {
    "https://translate.google.com/translate_tts".to_string()
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

// ============================================================================
// TranscriptionConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TranscriptionConfig {
    #[serde(default = "default_transcription_url")]
    pub base_url: String,
    #[serde(default = "default_transcription_model")]
    pub model: String,
    #[serde(default = "default_transcription_key_env")]
    pub api_key_env: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: default_transcription_url(),
            model: default_transcription_model(),
            api_key_env: default_transcription_key_env(),
        }
    }
}

fn default_transcription_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_transcription_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

// ============================================================================
// ConfigError
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),

    #[error("bot token not set: export {0}")]
    MissingToken(String),
}

// ============================================================================
// Tests
// ============================================================================
