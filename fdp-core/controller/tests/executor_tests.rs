//! 步骤执行器集成测试
//!
//! 用本地 TCP 监听按脚本应答 HTTP 请求，验证重试边界、客户端错误
//! 不重试、401 重认证等行为。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reqwest::Method;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use fdp_controller::{ControllerClient, ControllerConfig, ControllerError, RestStep, RetryPolicy};

/// 构造一条原始 HTTP 响应
fn http_response(status_line: &str, extra_headers: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
        status_line,
        body.len(),
        extra_headers,
        body
    )
}

/// 认证端点的令牌响应
fn token_response() -> String {
    http_response("204 No Content", "X-auth-access-token: test-token\r\n", "")
}

/// 读取完整请求（头部 + Content-Length 指定的请求体）
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];
    loop {
        let n = match socket.read(&mut tmp).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&tmp[..n]);

        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);

            let mut remaining = content_length.saturating_sub(buf.len() - (pos + 4));
            while remaining > 0 {
                let n = match socket.read(&mut tmp).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                };
                remaining = remaining.saturating_sub(n);
            }
            return;
        }
    }
}

/// 启动按脚本应答的服务端，返回基础 URL 与请求计数
async fn spawn_server(responses: Vec<String>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    let count = Arc::clone(&counter);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let index = count.fetch_add(1, Ordering::SeqCst);
            let response = responses
                .get(index)
                .cloned()
                .unwrap_or_else(|| responses.last().cloned().unwrap());

            read_request(&mut socket).await;
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}", addr), counter)
}

/// 快速重试策略，避免测试等待真实退避
fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay_ms: 1,
        max_delay_ms: 5,
        backoff_multiplier: 2.0,
    }
}

async fn client_for(base_url: &str, max_attempts: u32) -> ControllerClient {
    let config = ControllerConfig {
        retry: fast_retry(max_attempts),
        ..Default::default()
    };
    let client = ControllerClient::new(base_url, "api-user", "api-pass", config).unwrap();
    client.authenticate().await.unwrap();
    client
}

#[tokio::test]
async fn test_transient_failures_then_success() {
    let (base_url, counter) = spawn_server(vec![
        token_response(),
        http_response("503 Service Unavailable", "", ""),
        http_response("503 Service Unavailable", "", ""),
        http_response("200 OK", "", r#"{"id": "zone-1"}"#),
    ])
    .await;

    let client = client_for(&base_url, 5).await;
    let step = RestStep::new("zone_create", Method::POST, "/object/securityzones")
        .with_payload(serde_json::json!({"name": "INSIDE"}));

    let response = client.execute(step).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body["id"], "zone-1");
    // 认证 1 次 + 两次瞬时失败 + 一次成功
    assert_eq!(counter.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_retry_budget_exhausted_reports_once() {
    let (base_url, counter) = spawn_server(vec![
        token_response(),
        http_response("503 Service Unavailable", "", ""),
    ])
    .await;

    let client = client_for(&base_url, 3).await;
    let step = RestStep::new("device_list", Method::GET, "/devices/devicerecords");

    let err = client.execute(step).await.unwrap_err();
    match err {
        ControllerError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("期望 RetriesExhausted，得到 {:?}", other),
    }
    // 预算耗尽后不再发出请求
    assert_eq!(counter.load(Ordering::SeqCst), 1 + 3);
}

#[tokio::test]
async fn test_client_error_not_retried() {
    let (base_url, counter) = spawn_server(vec![
        token_response(),
        http_response("404 Not Found", "", r#"{"error": "no such device"}"#),
    ])
    .await;

    let client = client_for(&base_url, 5).await;
    let step = RestStep::new(
        "device_details",
        Method::GET,
        "/devices/devicerecords/{device_id}",
    )
    .with_param("device_id", "missing");

    let err = client.execute(step).await.unwrap_err();
    match err {
        ControllerError::ClientError(status, body) => {
            assert_eq!(status, 404);
            assert!(body.contains("no such device"));
        }
        other => panic!("期望 ClientError，得到 {:?}", other),
    }
    // 4xx 不消耗重试预算
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rate_limit_is_transient() {
    let (base_url, _counter) = spawn_server(vec![
        token_response(),
        http_response("429 Too Many Requests", "", ""),
        http_response("200 OK", "", r#"{"items": []}"#),
    ])
    .await;

    let client = client_for(&base_url, 5).await;
    let step = RestStep::new("device_list", Method::GET, "/devices/devicerecords");

    let response = client.execute(step).await.unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_unauthorized_triggers_single_reauth() {
    let (base_url, counter) = spawn_server(vec![
        token_response(),
        http_response("401 Unauthorized", "", ""),
        token_response(),
        http_response("200 OK", "", r#"{"items": []}"#),
    ])
    .await;

    let client = client_for(&base_url, 5).await;
    let step = RestStep::new("device_list", Method::GET, "/devices/devicerecords");

    let response = client.execute(step).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(counter.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_second_unauthorized_is_fatal() {
    let (base_url, _counter) = spawn_server(vec![
        token_response(),
        http_response("401 Unauthorized", "", ""),
        token_response(),
        http_response("401 Unauthorized", "", ""),
    ])
    .await;

    let client = client_for(&base_url, 5).await;
    let step = RestStep::new("device_list", Method::GET, "/devices/devicerecords");

    let err = client.execute(step).await.unwrap_err();
    assert!(matches!(err, ControllerError::AuthError(_)));
}

#[tokio::test]
async fn test_empty_success_body_is_null() {
    let (base_url, _counter) = spawn_server(vec![
        token_response(),
        http_response("202 Accepted", "", ""),
    ])
    .await;

    let client = client_for(&base_url, 5).await;
    let step = RestStep::new("device_register", Method::POST, "/devices/devicerecords")
        .with_payload(serde_json::json!({"name": "fw-1"}));

    let response = client.execute(step).await.unwrap();
    assert_eq!(response.status, 202);
    assert!(response.body.is_null());
}
