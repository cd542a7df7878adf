use printer_notify::{GotifyChannel, GotifyConfig, NotificationChannel, OutboundPayload};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// 假服务器收到的请求
struct CapturedRequest {
    request_line: String,
    body: Value,
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}

/// 接受一个请求，用 `status` 和 `body` 响应
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers were complete");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = find_header_end(&buf) {
                break end;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body was complete");
            buf.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;

        CapturedRequest {
            request_line: head.lines().next().unwrap_or_default().to_string(),
            body: serde_json::from_slice(&buf[header_end..header_end + content_length])
                .unwrap_or(Value::Null),
        }
    });

    (format!("http://{}", addr), handle)
}

fn channel(base_url: &str, token: Option<&str>) -> GotifyChannel {
    GotifyChannel::new(GotifyConfig {
        base_url: Some(base_url.to_string()),
        token: token.map(str::to_string),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_send_test_notification() {
    // Given
    let (url, server) = serve_once("200 OK", r#"{"id":1234}"#).await;
    let gotify = channel(&url, Some("stored-token"));

    // When: 显式传入 token
    gotify.send_test(Some("override")).await.unwrap();

    // Then
    let request = server.await.unwrap();
    assert_eq!(request.request_line, "POST /message?token=override HTTP/1.1");
    assert_eq!(
        request.body,
        json!({
            "title": "OctoPrint push test",
            "message": "pewpewpew!! OctoPrint works. \u{1F680}"
        })
    );
}

#[tokio::test]
async fn test_empty_token_falls_back_to_configured() {
    let (url, server) = serve_once("200 OK", r#"{"id":1}"#).await;
    let gotify = channel(&format!("{}/", url), Some("stored-token"));

    gotify.send_test(Some("")).await.unwrap();

    let request = server.await.unwrap();
    assert_eq!(request.request_line, "POST /message?token=stored-token HTTP/1.1");
}

#[tokio::test]
async fn test_rejected_token_is_reported() {
    let (url, server) = serve_once("401 Unauthorized", r#"{"error":"Unauthorized"}"#).await;
    let gotify = channel(&url, Some("bad"));

    let err = gotify.send_test(None).await.unwrap_err();
    assert!(err.to_string().contains("401"), "unexpected error: {}", err);
    server.await.unwrap();
}

#[tokio::test]
async fn test_fire_and_forget_send() {
    let (url, server) = serve_once("200 OK", r#"{"id":7}"#).await;
    let gotify = channel(&url, Some("abc"));

    let payload = OutboundPayload::new("Print Job Started")
        .with_title("Octoprint: Ender 3")
        .with_priority(Some(0));
    gotify.send_async(&payload).unwrap();
    gotify.flush().await;
    assert_eq!(gotify.pending(), 0);

    let request = server.await.unwrap();
    assert_eq!(request.request_line, "POST /message?token=abc HTTP/1.1");
    assert_eq!(
        request.body,
        json!({"title": "Octoprint: Ender 3", "message": "Print Job Started", "priority": 0})
    );
}

#[tokio::test]
async fn test_fire_and_forget_failure_is_swallowed() {
    // 绑定后立即释放，端口上没有监听
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gotify = channel(&format!("http://{}", addr), Some("abc"));
    assert!(gotify.send_async(&OutboundPayload::new("hello")).is_ok());
    gotify.flush().await;
}
