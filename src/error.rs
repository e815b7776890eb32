//! Error handling for the upload client
//!
//! This module defines the error types used throughout the library and the
//! capture of raw failure diagnostics from each upload step.

use thiserror::Error;

use crate::types::ResponseBody;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, UploadError>;

/// Raw diagnostics from a failed HTTP exchange.
///
/// Step errors always carry the failure that actually occurred: the
/// non-success response, the transport error, or the decode error from a
/// body the server declared as JSON.
#[derive(Debug)]
pub enum FailureDetail {
    /// The server answered outside the [200, 400) success window
    Status {
        status: reqwest::StatusCode,
        body: ResponseBody,
    },
    /// The request never produced a response
    Transport(reqwest::Error),
    /// The body could not be decoded as the JSON it claimed to be
    Decode(serde_json::Error),
}

impl std::fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureDetail::Status { status, body } => write!(f, "HTTP {}: {}", status, body),
            FailureDetail::Transport(err) => write!(f, "transport error: {}", err),
            FailureDetail::Decode(err) => write!(f, "invalid JSON in response: {}", err),
        }
    }
}

/// Error types that can occur while driving an upload
#[derive(Error, Debug)]
pub enum UploadError {
    /// A step was invoked before the session reached the stage it needs
    #[error("Precondition failed: {step} - {message}")]
    Precondition { step: String, message: String },

    /// The signing service did not produce a usable destination
    #[error("Couldn't get signed upload destination: {detail}")]
    Signing { detail: FailureDetail },

    /// The direct transfer to the signed destination failed
    #[error("Couldn't upload to signed destination: {detail}")]
    Transfer { detail: FailureDetail },

    /// The completion callback rejected the notification
    #[error("Upload completion callback failed: {detail}")]
    Callback { detail: FailureDetail },

    /// I/O error reading content from disk
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Create a new precondition error
    pub fn precondition(step: impl Into<String>, message: impl Into<String>) -> Self {
        UploadError::Precondition {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Create a new signing error
    pub fn signing(detail: FailureDetail) -> Self {
        UploadError::Signing { detail }
    }

    /// Create a new transfer error
    pub fn transfer(detail: FailureDetail) -> Self {
        UploadError::Transfer { detail }
    }

    /// Create a new callback error
    pub fn callback(detail: FailureDetail) -> Self {
        UploadError::Callback { detail }
    }

    /// The raw failed exchange behind a step error, if this error carries one
    pub fn detail(&self) -> Option<&FailureDetail> {
        match self {
            UploadError::Signing { detail }
            | UploadError::Transfer { detail }
            | UploadError::Callback { detail } => Some(detail),
            _ => None,
        }
    }
}
