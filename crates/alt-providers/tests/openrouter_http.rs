use alt_core::{ModelProvider, ProviderContent, ProviderErrorKind, ProviderRequest};
use alt_providers::{OpenRouterConfig, OpenRouterProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Servidor de un solo request: devuelve la respuesta enlatada y entrega el
/// request crudo recibido (cabeceras + cuerpo).
async fn serve_once(status_line: &'static str, body: String, delay: Duration) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end].lines()
                                                     .find_map(|l| {
                                                         let lower = l.to_ascii_lowercase();
                                                         lower.strip_prefix("content-length:")
                                                              .and_then(|v| v.trim().parse::<usize>().ok())
                                                     })
                                                     .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).to_string());
        tokio::time::sleep(delay).await;
        let response = format!("HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                               body.len());
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });
    (format!("http://{addr}/api/v1/chat/completions"), rx)
}

fn provider(endpoint: String) -> OpenRouterProvider {
    let mut cfg = OpenRouterConfig::new("sk-test").with_endpoint(endpoint);
    cfg.referer = Some("https://example.org".into());
    OpenRouterProvider::new(cfg).unwrap()
}

fn request(timeout: Duration) -> ProviderRequest {
    ProviderRequest { model: "vendor/model-a".into(),
                      prompt: "describe".into(),
                      content: ProviderContent { mime_type: "image/png".into(), bytes: Arc::from(&b"\x89PNG"[..]) },
                      timeout }
}

#[tokio::test]
async fn success_sends_auth_headers_and_parses_text() {
    let body = serde_json::json!({
        "id": "gen-42",
        "model": "vendor/model-a",
        "choices": [{"message": {"content": "A lighthouse at dusk."}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    }).to_string();
    let (endpoint, seen) = serve_once("200 OK", body, Duration::ZERO).await;
    let response = provider(endpoint).generate(request(Duration::from_secs(5))).await.unwrap();
    assert_eq!(response.text, "A lighthouse at dusk.");
    assert_eq!(response.response_id.as_deref(), Some("gen-42"));
    assert_eq!(response.usage.unwrap().total_tokens, Some(15));
    assert!(response.raw.is_some());

    let raw = seen.await.unwrap();
    let lower = raw.to_ascii_lowercase();
    assert!(lower.contains("authorization: bearer sk-test"), "{raw}");
    assert!(lower.contains("http-referer: https://example.org"));
    assert!(lower.contains("x-title: altflow"));
    assert!(raw.contains("data:image/png;base64,iVBORw=="));
    assert!(raw.contains("\"model\":\"vendor/model-a\""));
}

#[tokio::test]
async fn rate_limit_is_transient() {
    let (endpoint, _seen) = serve_once("429 Too Many Requests", r#"{"error":"slow down"}"#.into(), Duration::ZERO).await;
    let err = provider(endpoint).generate(request(Duration::from_secs(5))).await.unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::Transient);
    assert_eq!(err.model, "vendor/model-a");
    assert!(err.message.contains("429"));
}

#[tokio::test]
async fn bad_request_is_non_retryable() {
    let (endpoint, _seen) = serve_once("400 Bad Request", r#"{"error":"bad image"}"#.into(), Duration::ZERO).await;
    let err = provider(endpoint).generate(request(Duration::from_secs(5))).await.unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::NonRetryable);
}

#[tokio::test]
async fn empty_text_is_non_retryable() {
    let body = r#"{"choices":[{"message":{"content":"   "},"finish_reason":"stop"}]}"#.to_string();
    let (endpoint, _seen) = serve_once("200 OK", body, Duration::ZERO).await;
    let err = provider(endpoint).generate(request(Duration::from_secs(5))).await.unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::NonRetryable);
}

#[tokio::test]
async fn slow_server_times_out() {
    let (endpoint, _seen) = serve_once("200 OK", "{}".into(), Duration::from_secs(3)).await;
    let err = provider(endpoint).generate(request(Duration::from_millis(200))).await.unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::Timeout);
}

#[tokio::test]
async fn connection_refused_is_transient() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let err = provider(format!("http://{addr}/api/v1/chat/completions")).generate(request(Duration::from_secs(2)))
                                                                         .await
                                                                         .unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::Transient);
}
