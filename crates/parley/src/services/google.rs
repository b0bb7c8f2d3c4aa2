//! Google web endpoints for translation and speech.
//!
//! Both adapters talk to the public, key-less endpoints used by the Google
//! Translate web client.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::Client;
use tracing::debug;
use url::Url;
use url::form_urlencoded;

use super::error::{ServiceError, check_status};
use super::{SpeechSynthesizer, Translator};
use crate::language::LanguageCode;

/// Longest text the speech endpoint accepts per request.
const SPEECH_CHUNK_CHARS: usize = 200;

/// Catalog languages the speech endpoint has no voice for.
const NO_VOICE: [&str; 4] = ["fa", "ha", "or", "pa"];

// ============================================================================
// Translation
// ============================================================================

/// Translator backed by the `translate_a/single` endpoint.
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target: LanguageCode) -> Result<String, ServiceError> {
        let url = Url::parse_with_params(
            &self.endpoint,
            &[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target.code()),
                ("dt", "t"),
            ],
        )
        .map_err(|e| ServiceError::InvalidResponse(format!("bad translate url: {}", e)))?;

        // Text goes in the body; long messages overflow URL limits.
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("q", text)
            .finish();

        debug!(language = %target, chars = text.chars().count(), "Translating");
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/x-www-form-urlencoded;charset=utf-8")
            .body(body)
            .send()
            .await?;
        let response = check_status(response).await?;
        let json: serde_json::Value = response.json().await?;

        parse_translation(&json)
    }
}

/// Join the translated segments of a `translate_a/single` response.
///
/// The response is a nested array: `[[["Hola", "Hello", ...], ...], ...]`.
fn parse_translation(json: &serde_json::Value) -> Result<String, ServiceError> {
    let segments = json
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| ServiceError::InvalidResponse("missing translation segments".into()))?;

    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|s| s.as_str()))
        .collect();

    if text.is_empty() {
        return Err(ServiceError::InvalidResponse("empty translation".into()));
    }
    Ok(text)
}

// ============================================================================
// Speech
// ============================================================================

/// Speech synthesizer backed by the `translate_tts` endpoint.
pub struct GoogleSpeech {
    client: Client,
    endpoint: String,
}

impl GoogleSpeech {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleSpeech {
    async fn synthesize(&self, text: &str, language: LanguageCode) -> Result<Bytes, ServiceError> {
        if NO_VOICE.contains(&language.code()) {
            return Err(ServiceError::Unsupported(format!(
                "no voice for language {}",
                language
            )));
        }

        let chunks = split_for_speech(text, SPEECH_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(ServiceError::Unsupported("nothing to synthesize".into()));
        }

        // MP3 frames are self-delimiting, so segments concatenate cleanly.
        let total = chunks.len().to_string();
        let mut audio = BytesMut::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let url = Url::parse_with_params(
                &self.endpoint,
                &[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", language.code()),
                    ("q", chunk.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx.to_string().as_str()),
                    ("textlen", chunk.chars().count().to_string().as_str()),
                ],
            )
            .map_err(|e| ServiceError::InvalidResponse(format!("bad speech url: {}", e)))?;

            let response = self.client.get(url).send().await?;
            let response = check_status(response).await?;
            audio.extend_from_slice(&response.bytes().await?);
        }

        debug!(language = %language, chunks = chunks.len(), bytes = audio.len(), "Synthesized speech");
        Ok(audio.freeze())
    }
}

/// Split `text` into pieces of at most `max_chars`, preferring word breaks.
fn split_for_speech(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            chunks.extend(chars.chunks(max_chars).map(|c| c.iter().collect::<String>()));
            continue;
        }

        let needed = if current.is_empty() { word_len } else { word_len + 1 };
        if current_len + needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
