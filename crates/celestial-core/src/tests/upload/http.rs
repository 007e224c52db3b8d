use crate::{CoreError, HttpSegmentUploader, SegmentUploader, tests::upload::sample_segment};

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// URL of a local port that was bound and then released.
#[allow(clippy::unwrap_used)]
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// WHAT: Segment is posted as multipart with label query parameters
/// WHY: Backend files chunks by camera and window
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_backend_accepts_when_uploading_then_labelled_multipart_sent_once() {
    // Given: A backend that stores chunks
    let (segment, label) = sample_segment(b"webm-bytes");
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/monitor/upload-chunk"))
        .and(query_param("camera_id", "cam_1"))
        .and(query_param("start_time", label.start_param().as_str()))
        .and(query_param("end_time", label.end_param().as_str()))
        .and(body_string_contains("name=\"video\""))
        .and(body_string_contains("filename=\"chunk.webm\""))
        .and(body_string_contains("video/webm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "stored" })))
        .expect(1)
        .mount(&server)
        .await;
    let uploader = HttpSegmentUploader::new(server.uri()).unwrap();

    // When: Uploading
    let ack = uploader.upload(segment, &label).await.unwrap();

    // Then: Acknowledged with the backend payload
    assert_eq!(ack.status, 200);
    assert_eq!(ack.payload, json!({ "status": "stored" }));
}

/// WHAT: Backend `detail` is surfaced as the failure reason
/// WHY: Operators see the backend's own explanation
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_backend_rejects_with_detail_when_uploading_then_detail_reported() {
    // Given: A backend returning 422 with a detail
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/monitor/upload-chunk"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "detail": "Invalid time range" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    let uploader = HttpSegmentUploader::new(server.uri()).unwrap();
    let (segment, label) = sample_segment(b"webm-bytes");

    // When: Uploading
    let err = uploader.upload(segment, &label).await.unwrap_err();

    // Then: Upload error carrying the detail
    assert!(matches!(err, CoreError::Upload { .. }));
    assert_eq!(err.reason(), "Invalid time range");
}

/// WHAT: Non-2xx without a detail reports the status code
/// WHY: Some failures come from proxies with non-JSON bodies
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_backend_error_without_detail_when_uploading_then_status_reported() {
    // Given: A backend returning a plain 500
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(1)
        .mount(&server)
        .await;
    let uploader = HttpSegmentUploader::new(server.uri()).unwrap();
    let (segment, label) = sample_segment(b"webm-bytes");

    // When: Uploading
    let err = uploader.upload(segment, &label).await.unwrap_err();

    // Then: Reason names the status code
    assert_eq!(err.reason(), "Request failed with status code 500");
}

/// WHAT: Unreachable backend is an upload error
/// WHY: Network failures are reported once, never retried
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_unreachable_backend_when_uploading_then_upload_error() {
    // Given: An address where nothing listens any more
    let uploader = HttpSegmentUploader::new(closed_port_url()).unwrap();
    let (segment, label) = sample_segment(b"webm-bytes");

    // When: Uploading
    let result = uploader.upload(segment, &label).await;

    // Then: Upload error
    assert!(matches!(result, Err(CoreError::Upload { .. })));
}

/// WHAT: Non-JSON success bodies are kept as text
/// WHY: The acknowledgment payload is informational only
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_text_response_when_uploading_then_payload_is_string() {
    // Given: A backend answering with plain text
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_string("ok"))
        .mount(&server)
        .await;
    let uploader = HttpSegmentUploader::new(format!("{}/", server.uri())).unwrap();
    let (segment, label) = sample_segment(b"webm-bytes");

    // When: Uploading
    let ack = uploader.upload(segment, &label).await.unwrap();

    // Then: Status and raw text preserved
    assert_eq!(ack.status, 201);
    assert_eq!(ack.payload, json!("ok"));
}

/// WHAT: The health check reports backend reachability
/// WHY: Monitor mode logs whether the backend is up
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_backend_states_when_checking_health_then_reachability_reported() {
    // Given: A healthy backend
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let healthy = HttpSegmentUploader::new(server.uri()).unwrap();

    // Then: Healthy backend is reachable, trailing slash trimmed
    assert!(healthy.is_reachable().await);
    assert_eq!(healthy.base_url(), server.uri());

    // Given: A backend that has gone away
    let gone = HttpSegmentUploader::new(closed_port_url()).unwrap();

    // Then: Not reachable
    assert!(!gone.is_reachable().await);
}
