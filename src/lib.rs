//! Client for drf-to-s3 style upload backends.
//!
//! The backend signs a destination for a direct S3 PUT, the client uploads
//! the bytes straight to it, then reports the finished transfer back:
//!
//! ```no_run
//! use s3_upload_client::S3Uploader;
//!
//! # async fn demo() -> s3_upload_client::Result<()> {
//! let mut uploader = S3Uploader::new("https://backend.example", "csrf-token")
//!     .on_progress(|progress| {
//!         log::info!("sent {} of {} bytes", progress.bytes_sent, progress.total_bytes);
//!     });
//!
//! uploader.set_content("photo.jpg", "image/jpeg", &b"..."[..])?;
//! let receipt = uploader.run().await?;
//! println!("stored as {}", receipt.key);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod types;
pub mod uploader;

pub use error::{FailureDetail, Result, UploadError};

pub use http::CSRF_HEADER;

pub use types::{
    CompletionRequest, ResponseBody, SignedDestination, Stage, UploadProgress, UploadReceipt,
};

pub use uploader::S3Uploader;
