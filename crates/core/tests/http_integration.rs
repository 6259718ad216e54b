//! 실제 HTTP 왕복 통합 테스트
//!
//! 로컬 `TcpListener` 위의 최소 HTTP/1.1 응답기를 대상으로
//! - ReqwestWebhookClient 헤더/본문 전송
//! - ScenarioRunner 전체 스위트 (메모리 스토어)
//! - LoadDriver 램프 실행
//! 을 검증합니다.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hookprobe_core::client::{ReqwestWebhookClient, WebhookClient, join_url};
use hookprobe_core::config::{HookprobeConfig, StageConfig, ThresholdConfig};
use hookprobe_core::error::{StoreError, TransportError};
use hookprobe_core::load::{LoadDriver, Ramp};
use hookprobe_core::runner::{Failure, ScenarioRunner};
use hookprobe_core::scenario::ScenarioTable;
use hookprobe_core::store::SideEffectStore;
use hookprobe_core::verifier::{PollPolicy, SideEffectVerifier};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

// =============================================================================
// 테스트용 HTTP 응답기
// =============================================================================

#[derive(Debug, Clone)]
struct Received {
    path: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

type Responder = Arc<dyn Fn(&Received) -> (u16, String) + Send + Sync>;

struct TestServer {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<Received>>>,
}

impl TestServer {
    async fn start(respond: Responder) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let respond = Arc::clone(&respond);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let (read, mut write) = stream.into_split();
                    let mut reader = BufReader::new(read);
                    // keep-alive: 연결이 닫힐 때까지 요청을 반복 처리
                    while let Some(request) = read_request(&mut reader).await {
                        let (status, body) = respond(&request);
                        log.lock().unwrap().push(request);
                        let response = format!(
                            "HTTP/1.1 {status} X\r\ncontent-length: {}\r\n\r\n{body}",
                            body.len()
                        );
                        if write.write_all(response.as_bytes()).await.is_err() {
                            return;
                        }
                    }
                });
            }
        });

        Self { addr, received }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }
}

async fn read_request<R: tokio::io::AsyncBufRead + Unpin>(reader: &mut R) -> Option<Received> {
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await.ok()? == 0 {
        return None;
    }
    let path = request_line.split_whitespace().nth(1)?.to_owned();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await.ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_owned());
        }
    }

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await.ok()?;
    Some(Received {
        path,
        headers,
        body,
    })
}

// =============================================================================
// 메모리 스토어: 응답기가 "수신기" 역할로 레코드를 넣는다
// =============================================================================

#[derive(Default, Clone)]
struct MemoryStore {
    lists: Arc<Mutex<HashMap<String, VecDeque<String>>>>,
}

impl MemoryStore {
    fn push(&self, key: &str, record: String) {
        self.lists
            .lock()
            .unwrap()
            .entry(key.to_owned())
            .or_default()
            .push_back(record);
    }
}

impl SideEffectStore for MemoryStore {
    async fn pop(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .lists
            .lock()
            .unwrap()
            .get_mut(key)
            .and_then(VecDeque::pop_front))
    }
}

// =============================================================================
// ReqwestWebhookClient
// =============================================================================

#[tokio::test]
async fn integration_client_sends_token_and_json_content_type() {
    let server = TestServer::start(Arc::new(|_: &Received| (200, String::new()))).await;
    let config = HookprobeConfig::default();
    let client = ReqwestWebhookClient::for_integration(&config.integration).unwrap();

    let response = client
        .post(
            &join_url(&server.url("/v1alpha1/integration"), "basic-usage"),
            bytes::Bytes::from_static(br#"{"message":"hi"}"#),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert!(response.body.is_empty());
    let received = server.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].path, "/v1alpha1/integration/basic-usage");
    assert_eq!(received[0].headers["x-token"], "integration-test");
    assert_eq!(received[0].headers["content-type"], "application/json");
    assert_eq!(received[0].body, br#"{"message":"hi"}"#);
}

#[tokio::test]
async fn non_2xx_status_is_not_a_transport_error() {
    let server = TestServer::start(Arc::new(|_: &Received| (401, "unauthorized".to_owned()))).await;
    let client = ReqwestWebhookClient::new("X-Token", "wrong", Duration::from_secs(5), 1).unwrap();

    let response = client
        .post(&server.url("/x"), bytes::Bytes::from_static(b"{}"))
        .await
        .unwrap();

    assert_eq!(response.status, 401);
    assert_eq!(response.body_text(), "unauthorized");
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    // 바인드 후 즉시 닫아 사용되지 않는 포트를 얻음
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ReqwestWebhookClient::new("X-Token", "t", Duration::from_secs(2), 1).unwrap();
    let err = client
        .post(&format!("http://{addr}/x"), bytes::Bytes::from_static(b"{}"))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Request { .. }));
}

// =============================================================================
// ScenarioRunner 전체 스위트
// =============================================================================

/// 기대대로 동작하는 수신기: 시나리오별 기대 레코드를 저장하고 응답 본문을 돌려준다.
fn conforming_receiver(table: &ScenarioTable, store: &MemoryStore) -> Responder {
    let table = table.clone();
    let store = store.clone();
    Arc::new(move |req: &Received| {
        let name = req.path.rsplit('/').next().unwrap_or_default();
        let Some(scenario) = table.scenarios().iter().find(|s| s.name == name) else {
            return (404, String::new());
        };
        let payload: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
        assert_eq!(payload, scenario.payload, "payload sent verbatim");
        store.push(&scenario.queue_key(), scenario.expected().to_string());
        (200, scenario.expected_response.clone())
    })
}

#[tokio::test]
async fn builtin_suite_passes_against_conforming_receiver() {
    let table = ScenarioTable::builtin("qwertyuiop");
    let store = MemoryStore::default();
    let server = TestServer::start(conforming_receiver(&table, &store)).await;

    let config = HookprobeConfig::default();
    let client = ReqwestWebhookClient::for_integration(&config.integration).unwrap();
    let verifier = SideEffectVerifier::new(store, PollPolicy::immediate(), true);
    let runner = ScenarioRunner::new(client, verifier, server.url("/v1alpha1/integration"));

    let selected = table.select(&[]).unwrap();
    let report = runner.run(&selected).await;

    assert!(report.passed(), "{report:#?}");
    assert_eq!(report.scenarios.len(), 4);
    assert_eq!(
        report.scenarios[2].case_name,
        "should return 200 with a response asked. [basic-response]"
    );
}

#[tokio::test]
async fn receiver_that_stores_twice_fails_drain_check() {
    let table = ScenarioTable::builtin("qwertyuiop");
    let store = MemoryStore::default();
    let push_store = store.clone();
    let scenario = table.scenarios()[0].clone();
    let server = TestServer::start(Arc::new(move |_req: &Received| {
        push_store.push(&scenario.queue_key(), scenario.expected().to_string());
        push_store.push(&scenario.queue_key(), scenario.expected().to_string());
        (200, String::new())
    }))
    .await;

    let client =
        ReqwestWebhookClient::for_integration(&HookprobeConfig::default().integration).unwrap();
    let runner = ScenarioRunner::new(
        client,
        SideEffectVerifier::new(store, PollPolicy::immediate(), true),
        server.url("/v1alpha1/integration"),
    );

    let report = runner.run_one(&table.scenarios()[0]).await;
    assert!(matches!(report.failures.as_slice(), [Failure::Leftover { .. }]));
}

// =============================================================================
// LoadDriver
// =============================================================================

#[tokio::test]
async fn load_driver_posts_with_secret_header() {
    let server = TestServer::start(Arc::new(|_: &Received| (200, String::new()))).await;
    let mut config = HookprobeConfig::default().load;
    config.url = server.url("/v1alpha1/webhooks/example");
    config.start_vus = 0;
    config.tick = Duration::from_millis(20);
    config.stages = vec![
        StageConfig {
            duration: Duration::from_millis(200),
            target: 3,
        },
        StageConfig {
            duration: Duration::from_millis(100),
            target: 0,
        },
    ];
    // 로컬 루프백에서는 지연 기준을 넉넉하게
    config.thresholds = ThresholdConfig {
        max_failure_rate: 0.0001,
        p95: Duration::from_secs(1),
        p999: Duration::from_secs(2),
    };

    let client = ReqwestWebhookClient::for_load(&config).unwrap();
    let driver = LoadDriver::from_config(client, &config).unwrap();
    let report = driver.run(CancellationToken::new()).await.unwrap();

    assert!(report.summary.requests > 0);
    assert_eq!(report.summary.failed, 0);
    assert!(report.passed(), "{:#?}", report.thresholds);

    let received = server.received();
    assert_eq!(received.len() as u64, report.summary.requests);
    let first = &received[0];
    assert_eq!(first.path, "/v1alpha1/webhooks/example");
    assert_eq!(first.headers["x-hook-secret"], "test");
    let body: serde_json::Value = serde_json::from_slice(&first.body).unwrap();
    assert_eq!(body["data"], serde_json::json!({}));
    assert!(body["timestamp"].is_u64());
}

#[tokio::test]
async fn load_driver_counts_server_errors_as_failures() {
    let server = TestServer::start(Arc::new(|_: &Received| (500, "boom".to_owned()))).await;
    let client = ReqwestWebhookClient::new("X-Hook-Secret", "test", Duration::from_secs(5), 2).unwrap();
    let ramp = Ramp::new(
        2,
        vec![StageConfig {
            duration: Duration::from_millis(150),
            target: 2,
        }],
    )
    .unwrap();
    let driver = LoadDriver::new(
        client,
        &server.url("/hook"),
        ramp,
        Duration::from_millis(20),
        ThresholdConfig::default(),
    );

    let report = driver.run(CancellationToken::new()).await.unwrap();

    assert!(report.summary.requests > 0);
    assert_eq!(report.summary.failed, report.summary.requests);
    assert!(!report.passed());
}
