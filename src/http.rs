//! Shared request mechanics for the upload steps
//!
//! Every backend call carries the same header set: `Accept:
//! application/json` plus the anti-CSRF token handed to the client at
//! construction. Responses are classified by the declared content type and
//! the [200, 400) success window; failures keep the raw exchange for
//! diagnostics.

use bytes::Bytes;
use futures::StreamExt;
use log::debug;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::{Body, Client, RequestBuilder, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::error::FailureDetail;
use crate::types::{ResponseBody, UploadProgress};

/// Header carrying the anti-CSRF token on every request
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Bytes handed to the transport per progress notification
const PROGRESS_CHUNK_SIZE: usize = 64 * 1024;

/// Hook invoked with incremental progress during a transfer
pub(crate) type ProgressHook = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// HTTP transport shared by all upload steps
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    client: Client,
    csrf_token: String,
}

impl Transport {
    pub fn new(csrf_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            csrf_token: csrf_token.into(),
        }
    }

    /// POST with an empty body
    pub async fn post_empty(&self, url: &str) -> Result<ResponseBody, FailureDetail> {
        self.dispatch(self.client.post(url)).await
    }

    /// POST a serialized JSON body labeled `application/json`
    pub async fn post_json<T: Serialize>(
        &self,
        url: &str,
        payload: &T,
    ) -> Result<ResponseBody, FailureDetail> {
        self.dispatch(self.client.post(url).json(payload)).await
    }

    /// PUT raw bytes with no Content-Type override.
    ///
    /// When a progress hook is present the body is streamed in chunks and
    /// the hook fires as each chunk is handed to the transport.
    pub async fn put_bytes(
        &self,
        url: &str,
        content: Bytes,
        on_progress: Option<ProgressHook>,
    ) -> Result<ResponseBody, FailureDetail> {
        self.dispatch(self.client.put(url).body(upload_body(content, on_progress)))
            .await
    }

    async fn dispatch(&self, request: RequestBuilder) -> Result<ResponseBody, FailureDetail> {
        let response = request
            .header(ACCEPT, "application/json")
            .header(CSRF_HEADER, &self.csrf_token)
            .send()
            .await
            .map_err(FailureDetail::Transport)?;

        let status = response.status();
        let url = response.url().clone();
        let declared_json = declares_json(response.headers());
        let text = response.text().await.map_err(FailureDetail::Transport)?;

        debug!("{} responded {}", url, status);

        let body = if declared_json {
            match serde_json::from_str(&text) {
                Ok(value) => ResponseBody::Json(value),
                Err(err) if is_success(status) => return Err(FailureDetail::Decode(err)),
                // keep the raw body so the failure diagnostics stay intact
                Err(_) => ResponseBody::Text(text),
            }
        } else {
            ResponseBody::Text(text)
        };

        if is_success(status) {
            Ok(body)
        } else {
            Err(FailureDetail::Status { status, body })
        }
    }
}

/// Success is any status in [200, 400); redirects count as success
pub(crate) fn is_success(status: StatusCode) -> bool {
    (200..400).contains(&status.as_u16())
}

/// A response body is JSON only when the server says so
fn declares_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .is_some_and(|media| media.essence_str() == mime::APPLICATION_JSON.essence_str())
}

/// Wrap the content so the transport pulls it chunk by chunk, notifying the
/// hook after each chunk. Without a hook the body stays a plain sized
/// payload.
fn upload_body(content: Bytes, on_progress: Option<ProgressHook>) -> Body {
    let Some(hook) = on_progress else {
        return Body::from(content);
    };

    let total = content.len();
    let mut chunks = Vec::with_capacity(total.div_ceil(PROGRESS_CHUNK_SIZE));
    let mut offset = 0;
    while offset < total {
        let end = usize::min(offset + PROGRESS_CHUNK_SIZE, total);
        chunks.push(content.slice(offset..end));
        offset = end;
    }

    let mut sent = 0usize;
    let stream = futures::stream::iter(chunks).map(move |chunk| {
        sent += chunk.len();
        hook(UploadProgress::new(sent, total));
        Ok::<Bytes, std::convert::Infallible>(chunk)
    });

    Body::wrap_stream(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_success_window() {
        assert!(is_success(StatusCode::OK));
        assert!(is_success(StatusCode::NO_CONTENT));
        assert!(is_success(StatusCode::FOUND));
        assert!(is_success(StatusCode::from_u16(399).unwrap()));

        assert!(!is_success(StatusCode::from_u16(199).unwrap()));
        assert!(!is_success(StatusCode::BAD_REQUEST));
        assert!(!is_success(StatusCode::FORBIDDEN));
        assert!(!is_success(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_declares_json() {
        let mut headers = HeaderMap::new();
        assert!(!declares_json(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(declares_json(&headers));

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert!(declares_json(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!declares_json(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));
        assert!(!declares_json(&headers));
    }
}
