//! Translation pipeline.
//!
//! One run per text or voice event:
//!
//! ```text
//!  voice: download → convert → transcribe ┐
//!  text:  ───────────────────────────────┴→ translate → render → deliver
//! ```
//!
//! Every call before delivery is bounded by the configured timeout. Delivery
//! is not: once an upload has started, a local timeout cannot tell whether
//! the platform accepted it. Every temporary file lives in an
//! [`ArtifactScope`] that is cleaned up on all exit paths.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::fs;
use tracing::{debug, info};

use crate::artifact::ArtifactScope;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Stage, StageError, bounded};
use crate::gateway::{ChatTransport, MediaPayload, ReplyTarget};
use crate::render::{Deliverable, OutputRenderer};
use crate::services::{ServiceError, Services};
use crate::session::{OutputFormat, Preferences};

/// Source content of a pipeline run.
#[derive(Debug, Clone)]
pub enum PipelineInput {
    Text(String),
    Voice(MediaPayload),
}

#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub event_id: String,
    pub input: PipelineInput,
    /// Snapshot taken when the event was admitted.
    pub preferences: Preferences,
    pub target: ReplyTarget,
}

pub struct Pipeline {
    services: Services,
    renderer: OutputRenderer,
    transport: Arc<dyn ChatTransport>,
    temp_dir: PathBuf,
    call_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        services: Services,
        transport: Arc<dyn ChatTransport>,
        config: &PipelineConfig,
    ) -> Self {
        let call_timeout = config.call_timeout();
        let renderer = OutputRenderer::new(
            Arc::clone(&services.synthesizer),
            Arc::clone(&services.documents),
            config.document_max_chars,
            call_timeout,
        );
        Self {
            services,
            renderer,
            transport,
            temp_dir: config.temp_dir.clone(),
            call_timeout,
        }
    }

    /// Run the pipeline and deliver the result. Returns the delivered format.
    ///
    /// Temporary files are removed before this returns, success or not.
    pub async fn run(&self, request: PipelineRequest) -> Result<OutputFormat, PipelineError> {
        let mut scope = ArtifactScope::new(&self.temp_dir, &request.event_id);
        let result = self.execute(&request, &mut scope).await;
        scope.cleanup().await;
        result
    }

    async fn execute(
        &self,
        request: &PipelineRequest,
        scope: &mut ArtifactScope,
    ) -> Result<OutputFormat, PipelineError> {
        let Preferences {
            output_format,
            language,
        } = request.preferences;

        let source = match &request.input {
            PipelineInput::Text(text) => text.clone(),
            PipelineInput::Voice(media) => self.transcribe_voice(media, scope).await?,
        };

        let translated = bounded(
            Stage::Translate,
            self.call_timeout,
            self.services.translator.translate(&source, language),
        )
        .await?;
        debug!(event_id = %request.event_id, %language, "Translated");

        let deliverable = self
            .renderer
            .render(translated, output_format, language, scope)
            .await?;
        self.deliver(&request.target, &deliverable).await?;

        info!(
            event_id = %request.event_id,
            format = %output_format,
            %language,
            "Delivered translation"
        );
        Ok(output_format)
    }

    async fn transcribe_voice(
        &self,
        media: &MediaPayload,
        scope: &mut ArtifactScope,
    ) -> Result<String, PipelineError> {
        let audio = bounded(
            Stage::Download,
            self.call_timeout,
            self.transport.download(&media.file_id),
        )
        .await?;
        let input = scope
            .write("voice", "ogg", &audio)
            .await
            .map_err(|e| e.at_stage(Stage::Download))?;

        let wav = scope.path_for("voice", "wav");
        bounded(
            Stage::Convert,
            self.call_timeout,
            self.services.codec.convert(&input, &wav),
        )
        .await?;
        let samples = fs::read(&wav)
            .await
            .map_err(|e| e.at_stage(Stage::Convert))?;

        let transcript = bounded(
            Stage::Transcribe,
            self.call_timeout,
            self.services.transcriber.transcribe(Bytes::from(samples)),
        )
        .await?;
        if transcript.trim().is_empty() {
            return Err(ServiceError::InvalidResponse("empty transcription".to_string())
                .at_stage(Stage::Transcribe));
        }
        Ok(transcript)
    }

    async fn deliver(
        &self,
        target: &ReplyTarget,
        deliverable: &Deliverable,
    ) -> Result<(), PipelineError> {
        let sent = match deliverable {
            Deliverable::Text(text) => self.transport.send_text(target, text).await,
            Deliverable::Audio(path) => self.transport.send_audio(target, path).await,
            Deliverable::Document { path, file_name } => {
                self.transport.send_document(target, path, file_name).await
            }
        };
        sent.map_err(|e| e.at_stage(Stage::Deliver))
    }
}
