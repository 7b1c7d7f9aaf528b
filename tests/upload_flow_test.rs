//! End-to-end upload flows against a mock share server.

use std::io::Write;

use pshare::{
    ChunkedTransport, ShareClient, SingleShotTransport, UploadError, UploadFile, UploadProgress,
};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EXPIRATION: &str = "2030-01-02T03:04:25Z";

fn client_for(server: &MockServer) -> ShareClient {
    ShareClient::new(Url::parse(&server.uri()).unwrap(), None).unwrap()
}

async fn disk_file(len: usize) -> (tempfile::TempDir, UploadFile) {
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("archive.zip");
    let mut out = std::fs::File::create(&file_path).unwrap();
    let data: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
    out.write_all(&data).unwrap();
    drop(out);

    let file = UploadFile::open(&file_path).await.unwrap();
    (dir, file)
}

#[tokio::test]
async fn test_chunked_upload_of_disk_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/entry"))
        .and(query_param("expiration", EXPIRATION))
        .and(body_string_contains("name=\"last\"\r\n\r\n1\r\n"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "Qm9vaz",
            "filename": "archive.zip",
            "note": "weekly backup",
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/entry"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "Qm9vaz"})))
        .with_priority(2)
        .expect(3)
        .mount(&server)
        .await;

    // Four chunks: three full and one short.
    let chunk_size = 4096;
    let (_dir, file) = disk_file(chunk_size * 3 + 1000).await;
    assert_eq!(file.content_type(), "application/zip");

    let mut progress = Vec::new();
    let record = client_for(&server)
        .upload_file(
            &file,
            EXPIRATION,
            Some("weekly backup"),
            &ChunkedTransport::new(chunk_size as u64).unwrap(),
            &mut |p: UploadProgress| progress.push(p.bytes_uploaded),
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record["filename"], "archive.zip");
    assert_eq!(progress, vec![4096, 8192, 12288, 13288]);

    let requests = server.received_requests().await.unwrap();
    let total_file_bytes: usize = requests
        .iter()
        .map(|r| {
            let body = String::from_utf8_lossy(&r.body);
            assert!(body.contains("name=\"filename\"\r\n\r\narchive.zip\r\n"));
            assert!(body.contains("name=\"note\"\r\n\r\nweekly backup\r\n"));
            r.body.len()
        })
        .sum();
    assert!(total_file_bytes > 13288);
}

#[tokio::test]
async fn test_same_file_through_either_transport() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/entry"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "abc"})))
        .mount(&server)
        .await;

    let (_dir, file) = disk_file(2048).await;
    let client = client_for(&server);

    let chunked = client
        .upload_file(
            &file,
            EXPIRATION,
            None,
            &ChunkedTransport::default(),
            &mut |_: UploadProgress| {},
        )
        .await
        .unwrap();
    let single_shot = client
        .upload_file(
            &file,
            EXPIRATION,
            None,
            &SingleShotTransport,
            &mut |_: UploadProgress| {},
        )
        .await
        .unwrap();

    assert_eq!(chunked, single_shot);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_file_never_reaches_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let (_dir, file) = disk_file(0).await;
    let record = client_for(&server)
        .upload_file(
            &file,
            EXPIRATION,
            Some("empty"),
            &ChunkedTransport::default(),
            &mut |_: UploadProgress| {},
        )
        .await
        .unwrap();
    assert!(record.is_none());
}

#[tokio::test]
async fn test_failed_chunk_stops_the_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, file) = disk_file(10_000).await;
    let err = client_for(&server)
        .upload_file(
            &file,
            EXPIRATION,
            None,
            &ChunkedTransport::new(1000).unwrap(),
            &mut |_: UploadProgress| {},
        )
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::ServerRejected { .. }));
    assert_eq!(err.to_string(), "Upload failed: Bad Gateway");
}
