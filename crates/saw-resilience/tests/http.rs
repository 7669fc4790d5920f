//! HTTP engine against a minimal in-process server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use saw_model::{AnalysisConfig, AnalysisKind, ProjectId};
use saw_resilience::{
    AnalyticsClient, AnalyticsClientConfig, AnalyticsError, AnalyticsEngine, CircuitBreakerConfig,
    CircuitState, HttpAnalyticsEngine, RetryPolicy,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Serve the canned `(status, body)` responses in order, one per connection.
async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    tokio::spawn(async move {
        let mut responses = responses.into_iter();
        while let Ok((mut socket, _)) = listener.accept().await {
            let (status, body) = responses.next().unwrap_or((500, "exhausted"));
            counter.fetch_add(1, Ordering::SeqCst);
            let path = read_request(&mut socket).await;
            assert_eq!(path, "POST /api/analyses");
            let reply = format!(
                "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{addr}/api"), hits)
}

/// Read one request and return its method and path.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_string();
        let length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);
        if buf.len() >= end + 4 + length {
            let request_line = head.lines().next().unwrap_or_default();
            return request_line
                .rsplit_once(' ')
                .map(|(method_path, _)| method_path.to_string())
                .unwrap_or_default();
        }
    }
    String::new()
}

const RESULT: &str = r#"{"analysis_id":"run-7","kind":"regression","summary":"R2 = 0.41",
"statistics":{"r_squared":0.41}}"#;

fn config() -> AnalysisConfig {
    AnalysisConfig::new(ProjectId::new("p1").unwrap(), AnalysisKind::Regression)
}

fn client_config(base_url: String) -> AnalyticsClientConfig {
    AnalyticsClientConfig {
        base_url,
        timeout: Duration::from_secs(5),
        retry: RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            backoff_multiplier: 2.0,
        },
        breaker: CircuitBreakerConfig::default(),
    }
}

#[tokio::test]
async fn posts_config_and_decodes_result() {
    let (base_url, hits) = serve(vec![(200, RESULT)]).await;
    let engine = HttpAnalyticsEngine::new(&base_url, Duration::from_secs(5)).unwrap();

    let result = engine.run_analysis(&config()).await.unwrap();
    assert_eq!(result.analysis_id, "run-7");
    assert_eq!(result.kind, AnalysisKind::Regression);
    assert_eq!(result.statistics["r_squared"], 0.41);
    assert!(result.warnings.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn server_errors_are_retried() {
    let (base_url, hits) = serve(vec![(503, "busy"), (502, "bad gateway"), (200, RESULT)]).await;
    let client = AnalyticsClient::http(&client_config(base_url)).unwrap();

    let result = client.submit(&config()).await.unwrap();
    assert_eq!(result.analysis_id, "run-7");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert_eq!(client.breaker().state(), CircuitState::Closed);
    assert_eq!(client.breaker().snapshot().failure_count, 0);
}

#[tokio::test]
async fn client_errors_are_terminal() {
    let (base_url, hits) = serve(vec![(422, r#"{"error":"no outcome"}"#)]).await;
    let client = AnalyticsClient::http(&client_config(base_url)).unwrap();

    let err = client.submit(&config()).await.unwrap_err();
    match err {
        AnalyticsError::Client { status, message } => {
            assert_eq!(status, 422);
            assert!(message.contains("no outcome"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let (base_url, _) = serve(vec![(200, "{not json")]).await;
    let engine = HttpAnalyticsEngine::new(&base_url, Duration::from_secs(5)).unwrap();
    let err = engine.run_analysis(&config()).await.unwrap_err();
    assert!(matches!(err, AnalyticsError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn unreachable_engine_is_a_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = client_config(format!("http://{addr}"));
    config.retry.max_attempts = 2;
    let client = AnalyticsClient::http(&config).unwrap();

    let err = client.submit(&self::config()).await.unwrap_err();
    assert!(matches!(err, AnalyticsError::Connection(_)), "{err:?}");
    assert_eq!(client.breaker().snapshot().failure_count, 2);
}
