//! Pipeline error taxonomy.
//!
//! Every failure inside a pipeline run is tagged with the [`Stage`] it
//! happened in. Users only ever see the fixed per-stage message from
//! [`PipelineError::user_message`]; the full error goes to the logs.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::gateway::TransportError;
use crate::services::ServiceError;

/// A step of the translation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Download,
    Convert,
    Transcribe,
    Translate,
    Synthesize,
    Render,
    Deliver,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Convert => "convert",
            Self::Transcribe => "transcribe",
            Self::Translate => "translate",
            Self::Synthesize => "synthesize",
            Self::Render => "render",
            Self::Deliver => "deliver",
        }
    }

    /// Reply sent to the user when this stage fails.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Download => "Sorry, I couldn't download your voice message. Please try again.",
            Self::Convert => "Sorry, I couldn't read the audio in your voice message.",
            Self::Transcribe => "Sorry, I couldn't understand your voice message.",
            Self::Translate => "Sorry, the translation failed. Please try again later.",
            Self::Synthesize => {
                "Sorry, I couldn't generate speech for this language. Try another output format with /settings."
            }
            Self::Render => {
                "Sorry, I couldn't create the PDF. Some characters may not be supported; try another output format with /settings."
            }
            Self::Deliver => "Sorry, I couldn't send the result. Please try again.",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A collaborator returned an error.
    #[error("{stage} failed: {source}")]
    Service { stage: Stage, source: ServiceError },

    /// A collaborator or transport call exceeded the per-call timeout.
    #[error("{stage} timed out after {}s", .after.as_secs())]
    Timeout { stage: Stage, after: Duration },

    /// Reading or writing a temporary artifact failed.
    #[error("{stage} artifact i/o failed: {source}")]
    Artifact {
        stage: Stage,
        source: std::io::Error,
    },

    /// The chat transport failed to download or deliver.
    #[error("{stage} failed: {source}")]
    Transport {
        stage: Stage,
        source: TransportError,
    },
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Service { stage, .. }
            | Self::Timeout { stage, .. }
            | Self::Artifact { stage, .. }
            | Self::Transport { stage, .. } => *stage,
        }
    }

    pub fn user_message(&self) -> &'static str {
        self.stage().user_message()
    }
}

/// Errors that can be attributed to a pipeline stage.
pub trait StageError {
    fn at_stage(self, stage: Stage) -> PipelineError;
}

impl StageError for ServiceError {
    fn at_stage(self, stage: Stage) -> PipelineError {
        PipelineError::Service {
            stage,
            source: self,
        }
    }
}

impl StageError for TransportError {
    fn at_stage(self, stage: Stage) -> PipelineError {
        PipelineError::Transport {
            stage,
            source: self,
        }
    }
}

impl StageError for std::io::Error {
    fn at_stage(self, stage: Stage) -> PipelineError {
        PipelineError::Artifact {
            stage,
            source: self,
        }
    }
}

/// Run one external call under `limit`, tagging any failure with `stage`.
pub async fn bounded<T, E: StageError>(
    stage: Stage,
    limit: Duration,
    call: impl Future<Output = Result<T, E>>,
) -> Result<T, PipelineError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(|e| e.at_stage(stage)),
        Err(_) => Err(PipelineError::Timeout {
            stage,
            after: limit,
        }),
    }
}
