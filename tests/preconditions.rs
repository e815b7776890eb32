//! Step-ordering guarantees
//!
//! A step invoked before its prerequisite stage fails fast as caller
//! misuse, without putting anything on the wire. A catch-all mock with an
//! expectation of zero requests proves the network stayed quiet.

use s3_upload_client::{S3Uploader, Stage, UploadError};
use wiremock::matchers::{any, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn silent_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_signing_before_content_never_touches_network() {
    let server = silent_server().await;

    let mut uploader = S3Uploader::new(server.uri(), "token");
    let err = uploader.request_upload_uri().await.unwrap_err();

    assert!(matches!(err, UploadError::Precondition { .. }));
    assert_eq!(uploader.stage(), Stage::Unconfigured);
}

#[tokio::test]
async fn test_transfer_before_signing_never_touches_network() {
    let server = silent_server().await;

    let mut uploader = S3Uploader::new(server.uri(), "token");
    uploader
        .set_content("notes.txt", "text/plain", b"hello".to_vec())
        .unwrap();

    let err = uploader.transfer().await.unwrap_err();
    assert!(matches!(err, UploadError::Precondition { .. }));
}

#[tokio::test]
async fn test_confirm_before_transfer_never_touches_network() {
    let server = silent_server().await;

    let mut uploader = S3Uploader::new(server.uri(), "token");
    uploader
        .set_content("notes.txt", "text/plain", b"hello".to_vec())
        .unwrap();

    let err = uploader.confirm_completion().await.unwrap_err();
    assert!(matches!(err, UploadError::Precondition { .. }));
}

#[tokio::test]
async fn test_failed_session_accepts_no_further_steps() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let mut uploader = S3Uploader::new(server.uri(), "token");
    uploader
        .set_content("notes.txt", "text/plain", b"hello".to_vec())
        .unwrap();

    let err = uploader.request_upload_uri().await.unwrap_err();
    assert!(matches!(err, UploadError::Signing { .. }));
    assert_eq!(uploader.stage(), Stage::Failed);

    // every later step is now caller misuse, not a retry opportunity
    let err = uploader.request_upload_uri().await.unwrap_err();
    assert!(matches!(err, UploadError::Precondition { .. }));

    let err = uploader.transfer().await.unwrap_err();
    assert!(matches!(err, UploadError::Precondition { .. }));

    let err = uploader.confirm_completion().await.unwrap_err();
    assert!(matches!(err, UploadError::Precondition { .. }));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_completed_session_is_not_reusable() {
    let server = MockServer::start().await;

    let upload_uri = format!("{}/bucket/once", server.uri());
    Mock::given(path("/api/s3/upload_uri"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "upload_uri": upload_uri,
            "key": "once",
        })))
        .mount(&server)
        .await;
    Mock::given(path("/bucket/once"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(path("/api/s3/file_uploaded"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut uploader = S3Uploader::new(server.uri(), "token");
    uploader
        .set_content("notes.txt", "text/plain", b"hello".to_vec())
        .unwrap();
    uploader.run().await.unwrap();
    assert_eq!(uploader.stage(), Stage::Completed);

    let err = uploader.run().await.unwrap_err();
    assert!(matches!(err, UploadError::Precondition { .. }));
}
