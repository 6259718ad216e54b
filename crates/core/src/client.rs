//! 웹훅 수신기 HTTP 클라이언트
//!
//! [`WebhookClient`] trait이 하네스와 네트워크 사이의 경계입니다.
//! [`ReqwestWebhookClient`]가 실제 수신기와 통신하고, 테스트는 자체 구현을 끼워 넣습니다.
//!
//! 모든 요청은 `Content-Type: application/json`과 공유 시크릿 헤더 하나를 가집니다
//! (기본값: 통합 테스트는 `X-Token`, 부하 테스트는 `X-Hook-Secret`).

use std::borrow::Cow;
use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::config::{IntegrationConfig, LoadConfig};
use crate::error::TransportError;

/// 완료된 요청의 상태 코드와 본문
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    /// 4xx/5xx 상태 여부
    ///
    /// 부하 드라이버는 200-399를 기대 상태로 보고 나머지만 실패로 집계합니다.
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// UTF-8로 디코딩한 본문 (잘못된 시퀀스는 대체 문자로 치환)
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// 수신기에 JSON POST 요청을 보내는 클라이언트
///
/// 공유 헤더는 구현체가 직접 붙이고, 호출자는 대상 URL과 인코딩된 본문만 넘깁니다.
pub trait WebhookClient: Send + Sync + 'static {
    /// `body`를 `url`로 POST하고 응답 전체를 읽습니다.
    ///
    /// # Errors
    ///
    /// 완전한 응답을 받지 못하면 `TransportError::Timeout` 또는
    /// `TransportError::Request`를 반환합니다. 2xx가 아닌 상태는 에러가 아닙니다.
    fn post(
        &self,
        url: &str,
        body: Bytes,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// `value`를 JSON 요청 본문으로 인코딩합니다.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, TransportError> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

/// `reqwest` 기반 클라이언트
#[derive(Debug, Clone)]
pub struct ReqwestWebhookClient {
    client: reqwest::Client,
}

impl ReqwestWebhookClient {
    /// 모든 요청에 `secret_header: secret`을 붙이는 클라이언트를 생성합니다.
    ///
    /// `max_idle`은 호스트당 유지하는 keep-alive 연결 수 상한입니다.
    pub fn new(
        secret_header: &str,
        secret: &str,
        timeout: Duration,
        max_idle: usize,
    ) -> Result<Self, TransportError> {
        let name = HeaderName::from_bytes(secret_header.as_bytes())
            .map_err(|e| TransportError::Build(format!("invalid header name: {e}")))?;
        let value = HeaderValue::from_str(secret)
            .map_err(|e| TransportError::Build(format!("invalid header value: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(name, value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .pool_max_idle_per_host(max_idle)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self { client })
    }

    /// 시나리오 러너용 클라이언트
    pub fn for_integration(config: &IntegrationConfig) -> Result<Self, TransportError> {
        Self::new(
            &config.token_header,
            &config.token,
            config.request_timeout,
            1,
        )
    }

    /// 부하 드라이버용 클라이언트
    ///
    /// 연결 풀은 최대 VU 수에 맞춰 잡습니다.
    pub fn for_load(config: &LoadConfig) -> Result<Self, TransportError> {
        let peak = config
            .stages
            .iter()
            .map(|s| s.target)
            .chain(std::iter::once(config.start_vus))
            .max()
            .unwrap_or(1);
        Self::new(
            &config.secret_header,
            &config.secret,
            config.request_timeout,
            peak as usize,
        )
    }
}

impl WebhookClient for ReqwestWebhookClient {
    async fn post(&self, url: &str, body: Bytes) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .post(url)
            .body(body)
            .send()
            .await
            .map_err(|e| classify(url, e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| classify(url, e))?;
        Ok(HttpResponse { status, body })
    }
}

fn classify(url: &str, e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout {
            url: url.to_owned(),
        }
    } else {
        TransportError::Request {
            url: url.to_owned(),
            reason: e.to_string(),
        }
    }
}

/// 기본 URL과 경로 세그먼트를 `/` 하나로 연결합니다.
pub fn join_url(base: &str, segment: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), segment)
}
