//! Session and wire types for the upload flow

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Lifecycle of one upload attempt.
///
/// A session moves forward through these stages one step at a time and
/// never re-enters a stage. `Failed` is absorbing: once a step fails the
/// session accepts no further steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Unconfigured,
    Configured,
    DestinationObtained,
    Transferred,
    Completed,
    Failed,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Unconfigured => write!(f, "unconfigured"),
            Stage::Configured => write!(f, "configured"),
            Stage::DestinationObtained => write!(f, "destination-obtained"),
            Stage::Transferred => write!(f, "transferred"),
            Stage::Completed => write!(f, "completed"),
            Stage::Failed => write!(f, "failed"),
        }
    }
}

/// Body of a completed HTTP exchange.
///
/// A body is parsed only when the server declared `application/json`;
/// anything else passes through as raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
}

impl ResponseBody {
    /// Returns the parsed JSON value, if the server declared JSON
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }

    /// Returns the raw text, if the body passed through unparsed
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Json(_) => None,
            ResponseBody::Text(text) => Some(text),
        }
    }
}

impl Display for ResponseBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Json(value) => write!(f, "{}", value),
            ResponseBody::Text(text) => write!(f, "{}", text),
        }
    }
}

/// Signing service response: where to PUT the content and the storage key
/// the backend will know it by
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SignedDestination {
    pub upload_uri: String,
    pub key: String,
}

/// Completion callback payload associating the storage key with the
/// original filename
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub key: String,
    pub filename: String,
}

/// Incremental progress notification emitted during the transfer step
#[derive(Debug, Clone)]
pub struct UploadProgress {
    pub bytes_sent: usize,
    pub total_bytes: usize,
    pub percentage: f64,
}

impl UploadProgress {
    pub fn new(bytes_sent: usize, total_bytes: usize) -> Self {
        let percentage = if total_bytes > 0 {
            (bytes_sent as f64 / total_bytes as f64).min(1.0)
        } else {
            0.0
        };

        Self {
            bytes_sent,
            total_bytes,
            percentage,
        }
    }
}

/// Outcome of a completed upload run
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    /// Storage key the backend assigned to the content
    pub key: String,
    /// Size of the transferred content in bytes
    pub bytes_sent: usize,
    /// Wall-clock time for the whole pipeline
    pub duration_ms: u64,
    /// The completion callback's response, passed through unchanged
    pub ack: ResponseBody,
}
