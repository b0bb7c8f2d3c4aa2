//! Turn translated text into the user's chosen output format.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::fs;
use tracing::debug;

use crate::artifact::ArtifactScope;
use crate::error::{PipelineError, Stage, StageError, bounded};
use crate::language::LanguageCode;
use crate::services::{DocumentRenderer, SpeechSynthesizer};
use crate::session::OutputFormat;

pub const DEFAULT_DOCUMENT_MAX_CHARS: usize = 10_000;

/// Name shown to the user for delivered documents.
pub const DOCUMENT_FILE_NAME: &str = "translation.pdf";

/// A rendered result ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deliverable {
    Text(String),
    Audio(PathBuf),
    Document { path: PathBuf, file_name: String },
}

pub struct OutputRenderer {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    documents: Arc<dyn DocumentRenderer>,
    max_document_chars: usize,
    call_timeout: Duration,
}

impl OutputRenderer {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        documents: Arc<dyn DocumentRenderer>,
        max_document_chars: usize,
        call_timeout: Duration,
    ) -> Self {
        Self {
            synthesizer,
            documents,
            max_document_chars,
            call_timeout,
        }
    }

    /// Render `text` as `format`. Audio and documents are written into
    /// `scope`, which the caller cleans up after delivery.
    pub async fn render(
        &self,
        text: String,
        format: OutputFormat,
        language: LanguageCode,
        scope: &mut ArtifactScope,
    ) -> Result<Deliverable, PipelineError> {
        match format {
            OutputFormat::Text => Ok(Deliverable::Text(text)),
            OutputFormat::Voice => {
                let audio = bounded(
                    Stage::Synthesize,
                    self.call_timeout,
                    self.synthesizer.synthesize(&text, language),
                )
                .await?;
                let path = scope
                    .write("speech", "mp3", &audio)
                    .await
                    .map_err(|e| e.at_stage(Stage::Synthesize))?;
                debug!(bytes = audio.len(), %language, "Synthesized speech");
                Ok(Deliverable::Audio(path))
            }
            OutputFormat::Document => {
                let body = truncate_chars(&text, self.max_document_chars);
                if body.len() < text.len() {
                    debug!(
                        limit = self.max_document_chars,
                        "Truncated document text"
                    );
                }
                let pdf = bounded(Stage::Render, self.call_timeout, self.documents.render(body))
                    .await?;
                let path = scope
                    .write("document", "pdf", &pdf)
                    .await
                    .map_err(|e| e.at_stage(Stage::Render))?;
                Ok(Deliverable::Document {
                    path,
                    file_name: DOCUMENT_FILE_NAME.to_string(),
                })
            }
        }
    }
}

/// Longest prefix of `text` holding at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
