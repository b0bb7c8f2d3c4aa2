//! Collaborator error types.

use thiserror::Error;

/// Errors returned by external collaborators (translation, speech,
/// transcription, codec, document rendering).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// HTTP request failed
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// API returned an error response
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// External process exited unsuccessfully
    #[error("process failed: {0}")]
    Process(String),

    /// Input the collaborator cannot handle (language, character set, audio)
    #[error("unsupported input: {0}")]
    Unsupported(String),

    /// Local I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turn a non-success HTTP response into [`ServiceError::Api`].
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    Err(ServiceError::Api { status, message })
}
