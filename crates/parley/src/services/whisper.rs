//! OpenAI-compatible Whisper transcription.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, multipart};
use tracing::debug;

use super::Transcriber;
use super::error::{ServiceError, check_status};

/// Transcriber for any server implementing `POST /audio/transcriptions`
/// (OpenAI, Groq, local whisper servers).
pub struct WhisperApiTranscriber {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl WhisperApiTranscriber {
    pub fn new(base_url: String, api_key: Option<String>, model: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Transcriber for WhisperApiTranscriber {
    async fn transcribe(&self, audio: Bytes) -> Result<String, ServiceError> {
        let url = format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'));
        debug!(bytes = audio.len(), model = %self.model, "Sending audio for transcription");

        let file_part = multipart::Part::bytes(audio.to_vec())
            .file_name("audio.wav")
            .mime_str("audio/wav")?;
        let form = multipart::Form::new()
            .text("model", self.model.clone())
            .part("file", file_part);

        let mut request = self.client.post(&url).multipart(form);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = check_status(request.send().await?).await?;
        let json: serde_json::Value = response.json().await?;
        parse_transcript(&json)
    }
}

fn parse_transcript(json: &serde_json::Value) -> Result<String, ServiceError> {
    json.get("text")
        .and_then(|t| t.as_str())
        .map(|t| t.trim().to_string())
        .ok_or_else(|| ServiceError::InvalidResponse("missing \"text\" field".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_transcript_trims_text() {
        let json = serde_json::json!({"text": "  hello there \n"});
        assert_eq!(parse_transcript(&json).unwrap(), "hello there");
    }

    #[test]
    fn parse_transcript_requires_text() {
        let json = serde_json::json!({"error": {"message": "bad audio"}});
        assert!(matches!(
            parse_transcript(&json),
            Err(ServiceError::InvalidResponse(_))
        ));
    }
}
