//! ffmpeg-based audio conversion.
//!
//! Shells out via `tokio::process::Command`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::AudioCodec;
use super::error::ServiceError;

/// Sample rate expected by the transcriber.
const TARGET_SAMPLE_RATE: &str = "16000";

/// Converts voice notes (OGG/Opus) to 16 kHz mono WAV.
pub struct FfmpegCodec {
    binary: PathBuf,
}

impl FfmpegCodec {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl AudioCodec for FfmpegCodec {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ServiceError> {
        let result = Command::new(&self.binary)
            .args(["-nostdin", "-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(input)
            .args(["-ar", TARGET_SAMPLE_RATE, "-ac", "1"])
            .arg(output)
            .kill_on_drop(true)
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ServiceError::Process(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                result.status,
                stderr.trim()
            )));
        }

        debug!(input = %input.display(), output = %output.display(), "Converted audio");
        Ok(())
    }
}
