//! The upload orchestrator
//!
//! Drives the three-step flow against a drf-to-s3 style backend: obtain a
//! signed destination, PUT the content directly to it, then notify the
//! backend that the transfer finished.

use bytes::Bytes;
use log::info;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{FailureDetail, Result, UploadError};
use crate::http::{ProgressHook, Transport};
use crate::types::{
    CompletionRequest, ResponseBody, SignedDestination, Stage, UploadProgress, UploadReceipt,
};

/// Relative path of the signing endpoint
const UPLOAD_URI_PATH: &str = "api/s3/upload_uri";
/// Relative path of the completion callback
const FILE_UPLOADED_PATH: &str = "api/s3/file_uploaded";

/// Client-side orchestrator for one direct-to-S3 upload.
///
/// One instance is one upload attempt: the session advances through
/// [`Stage`]s strictly forward and no step can run twice. Independent
/// uploads get independent instances and share nothing.
///
/// The three steps can be driven individually, or [`S3Uploader::run`]
/// chains them in order and short-circuits on the first failure.
pub struct S3Uploader {
    transport: Transport,
    base_url: String,
    on_progress: Option<ProgressHook>,
    stage: Stage,
    filename: Option<String>,
    content_type: Option<String>,
    content: Option<Bytes>,
    upload_uri: Option<String>,
    key: Option<String>,
}

impl std::fmt::Debug for S3Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Uploader")
            .field("base_url", &self.base_url)
            .field("stage", &self.stage)
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("content_len", &self.content.as_ref().map(Bytes::len))
            .field("upload_uri", &self.upload_uri)
            .field("key", &self.key)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl S3Uploader {
    /// Create an orchestrator for the backend at `base_url`.
    ///
    /// The anti-CSRF token is passed in explicitly and attached to every
    /// request; there is no ambient cookie lookup. A trailing slash on the
    /// base URL is tolerated.
    pub fn new(base_url: impl Into<String>, csrf_token: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            transport: Transport::new(csrf_token),
            base_url,
            on_progress: None,
            stage: Stage::Unconfigured,
            filename: None,
            content_type: None,
            content: None,
            upload_uri: None,
            key: None,
        }
    }

    /// Register a hook invoked with incremental [`UploadProgress`] while the
    /// transfer step hands content to the transport
    pub fn on_progress<F>(mut self, hook: F) -> Self
    where
        F: Fn(UploadProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(hook));
        self
    }

    /// Current lifecycle stage of this upload attempt
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Destination URI obtained from the signing service, if any
    pub fn upload_uri(&self) -> Option<&str> {
        self.upload_uri.as_deref()
    }

    /// Storage key obtained from the signing service, if any
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Store the payload to upload and mark the session configured.
    ///
    /// Presence is the only validation; the content type is recorded for
    /// the session but never forced onto the transfer request.
    pub fn set_content(
        &mut self,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Result<()> {
        self.expect_stage("set_content", Stage::Unconfigured)?;

        self.filename = Some(filename.into());
        self.content_type = Some(content_type.into());
        self.content = Some(content.into());
        self.stage = Stage::Configured;
        Ok(())
    }

    /// Read the payload from disk; the filename is the path's final
    /// component.
    pub async fn set_content_from_path(
        &mut self,
        path: impl AsRef<Path>,
        content_type: impl Into<String>,
    ) -> Result<()> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                UploadError::precondition("set_content_from_path", "path has no usable file name")
            })?;

        let content = tokio::fs::read(path).await?;
        self.set_content(filename, content_type, content)
    }

    /// Ask the signing service for a destination URI and storage key.
    ///
    /// On success both fields are stored and the session moves to
    /// [`Stage::DestinationObtained`]; on failure neither is set and the
    /// session fails.
    pub async fn request_upload_uri(&mut self) -> Result<()> {
        self.expect_stage("request_upload_uri", Stage::Configured)?;

        let url = format!("{}/{}", self.base_url, UPLOAD_URI_PATH);
        info!("requesting signed upload destination from {}", url);

        let result = self.transport.post_empty(&url).await;
        let body = match result {
            Ok(body) => body,
            Err(detail) => return Err(self.fail(UploadError::signing(detail))),
        };

        let parsed = match body {
            ResponseBody::Json(value) => serde_json::from_value::<SignedDestination>(value),
            ResponseBody::Text(text) => serde_json::from_str::<SignedDestination>(&text),
        };
        let destination = match parsed {
            Ok(destination) => destination,
            Err(err) => {
                return Err(self.fail(UploadError::signing(FailureDetail::Decode(err))));
            }
        };

        self.upload_uri = Some(destination.upload_uri);
        self.key = Some(destination.key);
        self.stage = Stage::DestinationObtained;
        Ok(())
    }

    /// PUT the content bytes directly to the signed destination.
    ///
    /// Resolves on any 2xx/3xx status; the destination's response body is
    /// not part of the contract and is discarded.
    pub async fn transfer(&mut self) -> Result<()> {
        self.expect_stage("transfer", Stage::DestinationObtained)?;

        let (Some(upload_uri), Some(content)) = (self.upload_uri.clone(), self.content.clone())
        else {
            return Err(UploadError::precondition(
                "transfer",
                "no signed destination on record",
            ));
        };

        info!("uploading {} bytes to {}", content.len(), upload_uri);

        let result = self
            .transport
            .put_bytes(&upload_uri, content, self.on_progress.clone())
            .await;
        if let Err(detail) = result {
            return Err(self.fail(UploadError::transfer(detail)));
        }

        self.stage = Stage::Transferred;
        Ok(())
    }

    /// Notify the backend that the transfer finished.
    ///
    /// Sends `{key, filename}` to the completion callback and returns the
    /// acknowledgement body unchanged.
    pub async fn confirm_completion(&mut self) -> Result<ResponseBody> {
        self.expect_stage("confirm_completion", Stage::Transferred)?;

        let (Some(key), Some(filename)) = (self.key.clone(), self.filename.clone()) else {
            return Err(UploadError::precondition(
                "confirm_completion",
                "no destination key on record",
            ));
        };

        let url = format!("{}/{}", self.base_url, FILE_UPLOADED_PATH);
        let payload = CompletionRequest { key, filename };
        info!("reporting completed upload of {} as {}", payload.filename, payload.key);

        let result = self.transport.post_json(&url, &payload).await;
        match result {
            Ok(ack) => {
                self.stage = Stage::Completed;
                Ok(ack)
            }
            Err(detail) => Err(self.fail(UploadError::callback(detail))),
        }
    }

    /// Run the full pipeline: destination, transfer, completion callback.
    ///
    /// Steps run strictly in sequence and the first failure short-circuits
    /// the rest; there is no rollback and no retry.
    pub async fn run(&mut self) -> Result<UploadReceipt> {
        let started = Instant::now();
        info!("starting upload");

        self.request_upload_uri().await?;
        info!("got signed upload destination");

        self.transfer().await?;
        info!("transferred content to destination");

        let ack = self.confirm_completion().await?;
        info!("upload complete");

        Ok(UploadReceipt {
            key: self.key.clone().unwrap_or_default(),
            bytes_sent: self.content.as_ref().map(Bytes::len).unwrap_or(0),
            duration_ms: started.elapsed().as_millis() as u64,
            ack,
        })
    }

    fn expect_stage(&self, step: &str, required: Stage) -> Result<()> {
        if self.stage == required {
            return Ok(());
        }
        Err(UploadError::precondition(
            step,
            format!("session is {}, must be {}", self.stage, required),
        ))
    }

    fn fail(&mut self, err: UploadError) -> UploadError {
        self.stage = Stage::Failed;
        err
    }
}
