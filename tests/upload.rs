use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::timeout;

use pktview::network::{upload_capture, UPLOAD_FIELD};
use pktview::{DisplayState, Endpoints, LiveConnection, ModeKind, UploadError};

const WAIT: Duration = Duration::from_secs(5);

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

fn boundary_of(head: &str) -> Option<String> {
    head.lines()
        .find(|line| line.to_ascii_lowercase().starts_with("content-type:"))
        .and_then(|line| line.split("boundary=").nth(1))
        .map(|boundary| boundary.trim().trim_matches('"').to_string())
}

/// Answers one HTTP request with `status` and `body`, handing back the raw
/// request it received.
async fn respond_once(status: &'static str, body: &'static str) -> (Endpoints, oneshot::Receiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (request_tx, request_rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
            let Some(head_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&request[..head_end]).into_owned();
            let Some(boundary) = boundary_of(&head) else {
                break;
            };
            if contains(&request[head_end..], format!("--{boundary}--").as_bytes()) {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;
        let _ = request_tx.send(request);
    });
    let endpoints = Endpoints::new(&format!("http://{addr}"), "/api/live", "/api/upload").unwrap();
    (endpoints, request_rx)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

fn capture_file(dir: &TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"\xd4\xc3\xb2\xa1not-really-a-capture").unwrap();
    path
}

const THREE_PACKETS: &str = r#"[{"timestamp":"2024-05-01T10:00:00Z","src_ip":"10.0.0.1","dst_ip":"10.0.0.2","protocol":"TCP","length":60},{"timestamp":"2024-05-01T10:00:01Z","src_ip":"10.0.0.2","dst_ip":"10.0.0.1","protocol":"TCP","length":1514},{"timestamp":"2024-05-01T10:00:02Z","src_ip":"fe80::1","dst_ip":"ff02::1","protocol":"UDP","length":90}]"#;

#[tokio::test]
async fn posts_multipart_and_decodes_packets() {
    let (endpoints, request_rx) = respond_once("200 OK", THREE_PACKETS).await;
    let dir = TempDir::new().unwrap();
    let path = capture_file(&dir, "trace.pcap");

    let records = timeout(WAIT, upload_capture(&client(), endpoints.upload(), &path))
        .await
        .unwrap()
        .unwrap();

    let lengths: Vec<u64> = records.iter().map(|r| r.length).collect();
    assert_eq!(lengths, [60, 1514, 90]);
    assert_eq!(records[2].src_ip, "fe80::1");

    let request = request_rx.await.unwrap();
    assert!(request.starts_with(b"POST /api/upload HTTP/1.1"));
    assert!(contains(&request, format!("name=\"{UPLOAD_FIELD}\"").as_bytes()));
    assert!(contains(&request, b"filename=\"trace.pcap\""));
    assert!(contains(&request, b"not-really-a-capture"));
}

#[tokio::test]
async fn any_extension_is_forwarded() {
    let (endpoints, request_rx) = respond_once("200 OK", "[]").await;
    let dir = TempDir::new().unwrap();
    let path = capture_file(&dir, "notes.txt");

    let records = upload_capture(&client(), endpoints.upload(), &path)
        .await
        .unwrap();
    assert!(records.is_empty());
    let request = request_rx.await.unwrap();
    assert!(contains(&request, b"filename=\"notes.txt\""));
}

#[tokio::test]
async fn null_body_is_an_empty_capture() {
    let (endpoints, _request_rx) = respond_once("200 OK", "null\n").await;
    let dir = TempDir::new().unwrap();
    let path = capture_file(&dir, "empty.pcap");

    let records = upload_capture(&client(), endpoints.upload(), &path)
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn server_error_status_is_reported() {
    let (endpoints, _request_rx) =
        respond_once("500 Internal Server Error", "Error opening pcap file\n").await;
    let dir = TempDir::new().unwrap();
    let path = capture_file(&dir, "broken.pcap");

    let err = upload_capture(&client(), endpoints.upload(), &path)
        .await
        .unwrap_err();
    match err {
        UploadError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "Error opening pcap file");
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_body_is_a_decode_error() {
    let (endpoints, _request_rx) = respond_once("200 OK", "<html>proxy</html>").await;
    let dir = TempDir::new().unwrap();
    let path = capture_file(&dir, "trace.pcap");

    let err = upload_capture(&client(), endpoints.upload(), &path)
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::Decode(_)));
}

#[tokio::test]
async fn missing_file_never_reaches_the_server() {
    let endpoints = Endpoints::new("http://127.0.0.1:9", "/api/live", "/api/upload").unwrap();
    let dir = TempDir::new().unwrap();
    let err = upload_capture(
        &client(),
        endpoints.upload(),
        &dir.path().join("gone.pcap"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, UploadError::Read { .. }));
}

#[tokio::test]
async fn upload_result_replaces_live_buffer() {
    let (endpoints, _request_rx) = respond_once("200 OK", THREE_PACKETS).await;
    let dir = TempDir::new().unwrap();
    let path = capture_file(&dir, "trace.pcap");

    // The live side only needs a handle; nothing listens there.
    let dead = Endpoints::new("http://127.0.0.1:9", "/api/live", "/api/upload").unwrap();
    let (tx, _rx) = pktview::event_channel();
    let mut state: DisplayState<LiveConnection> = DisplayState::new();
    state
        .start_live(|epoch| LiveConnection::open(dead.live().clone(), epoch, tx.clone()))
        .unwrap();
    let epoch = state.current_epoch().unwrap();
    for length in 0..10 {
        state.apply_packet(
            epoch,
            serde_json::from_value(serde_json::json!({
                "timestamp": "t", "src_ip": "a", "dst_ip": "b", "protocol": "TCP", "length": length
            }))
            .unwrap(),
        );
    }

    let ticket = state.begin_upload();
    let result = upload_capture(&client(), endpoints.upload(), &path).await;
    state.finish_upload(ticket, result);

    assert_eq!(state.mode(), ModeKind::Static);
    assert!(state.connection().is_none());
    let lengths: Vec<u64> = state.packets().iter().map(|r| r.length).collect();
    assert_eq!(lengths, [60, 1514, 90]);
}
