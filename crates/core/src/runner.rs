//! 통합 시나리오 러너
//!
//! 시나리오는 엄격히 하나씩 실행됩니다: 요청, 응답 검사, 부수 효과 검증,
//! 그리고 다음 시나리오. 실패한 시나리오는 기록만 하고 스위트는 계속됩니다.

use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::{WebhookClient, encode_json, join_url};
use crate::equality::Difference;
use crate::metrics as m;
use crate::scenario::Scenario;
use crate::store::SideEffectStore;
use crate::verifier::{SideEffectVerifier, Verification};

/// 모든 시나리오 요청이 받아야 하는 상태 코드
pub const EXPECTED_STATUS: u16 = 200;

/// 시나리오가 통과하지 못한 이유 하나
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    #[error("request failed: {reason}")]
    Transport { reason: String },

    #[error("expected status {expected}, got {actual}")]
    UnexpectedStatus { expected: u16, actual: u16 },

    #[error("expected response body {expected:?}, got {actual:?}")]
    UnexpectedBody { expected: String, actual: String },

    #[error("no side effect after {waited_ms}ms ({attempts} attempts)")]
    SideEffectMissing { attempts: u32, waited_ms: u64 },

    #[error("side effect differs from expected ({} difference(s))", .differences.len())]
    SideEffectMismatch {
        actual: Value,
        differences: Vec<Difference>,
    },

    #[error("side effect is not valid JSON: {reason}")]
    InvalidRecord { raw: String, reason: String },

    #[error("more than one side effect queued, next record: {raw}")]
    Leftover { raw: String },

    #[error("store error: {reason}")]
    Store { reason: String },
}

impl Failure {
    fn from_verification(v: Verification) -> Option<Self> {
        match v {
            Verification::Matched { .. } => None,
            Verification::Missing {
                attempts,
                waited_ms,
            } => Some(Self::SideEffectMissing {
                attempts,
                waited_ms,
            }),
            Verification::Mismatch {
                actual,
                differences,
            } => Some(Self::SideEffectMismatch {
                actual,
                differences,
            }),
            Verification::InvalidRecord { raw, reason } => Some(Self::InvalidRecord { raw, reason }),
            Verification::Leftover { raw } => Some(Self::Leftover { raw }),
            Verification::StoreFailed { reason } => Some(Self::Store { reason }),
        }
    }
}

/// 시나리오 하나의 결과
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    /// 케이스 이름 `"<description> [<name>]"`
    pub case_name: String,
    /// 응답 상태 코드 (응답이 없으면 `None`)
    pub status: Option<u16>,
    pub duration_ms: u64,
    pub failures: Vec<Failure>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 스위트 전체 실행 결과
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub run_id: String,
    pub duration_ms: u64,
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    /// 모든 시나리오 통과 여부 (빈 스위트는 통과)
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(ScenarioReport::passed)
    }

    pub fn passed_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.scenarios.len() - self.passed_count()
    }

    /// 통과한 시나리오 비율 (빈 스위트는 1.0)
    pub fn checks_rate(&self) -> f64 {
        if self.scenarios.is_empty() {
            1.0
        } else {
            self.passed_count() as f64 / self.scenarios.len() as f64
        }
    }
}

/// 수신기에 시나리오를 실행하고 부수 효과를 검사합니다.
pub struct ScenarioRunner<C, S> {
    client: C,
    verifier: SideEffectVerifier<S>,
    base_url: String,
}

impl<C: WebhookClient, S: SideEffectStore> ScenarioRunner<C, S> {
    pub fn new(client: C, verifier: SideEffectVerifier<S>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            verifier,
            base_url: base_url.into(),
        }
    }

    /// `scenarios`를 순서대로 실행합니다.
    pub async fn run(&self, scenarios: &[&Scenario]) -> SuiteReport {
        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        info!(run_id = %run_id, scenarios = scenarios.len(), base_url = %self.base_url, "integration run started");

        let mut reports = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            reports.push(self.run_one(scenario).await);
        }

        let report = SuiteReport {
            run_id,
            duration_ms: elapsed_ms(started),
            scenarios: reports,
        };
        info!(
            run_id = %report.run_id,
            passed = report.passed_count(),
            failed = report.failed_count(),
            duration_ms = report.duration_ms,
            "integration run finished"
        );
        report
    }

    /// 시나리오 하나를 실행합니다: POST, 응답 검사, 부수 효과 검증
    pub async fn run_one(&self, scenario: &Scenario) -> ScenarioReport {
        let started = Instant::now();
        let url = join_url(&self.base_url, &scenario.name);
        let mut failures = Vec::new();
        let mut status = None;

        let sent = match encode_json(&scenario.payload) {
            Ok(body) => self.client.post(&url, body).await,
            Err(e) => Err(e),
        };
        metrics::histogram!(m::INTEGRATION_REQUEST_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        match sent {
            Ok(response) => {
                status = Some(response.status);
                if response.status != EXPECTED_STATUS {
                    failures.push(Failure::UnexpectedStatus {
                        expected: EXPECTED_STATUS,
                        actual: response.status,
                    });
                }
                let body = response.body_text();
                if body != scenario.expected_response {
                    failures.push(Failure::UnexpectedBody {
                        expected: scenario.expected_response.clone(),
                        actual: body.into_owned(),
                    });
                }
                if let Some(failure) = Failure::from_verification(self.verifier.verify(scenario).await)
                {
                    failures.push(failure);
                }
            }
            // 요청이 전달되지 않았으므로 부수 효과 검증은 생략
            Err(e) => failures.push(Failure::Transport {
                reason: e.to_string(),
            }),
        }

        let report = ScenarioReport {
            name: scenario.name.clone(),
            case_name: scenario.case_name(),
            status,
            duration_ms: elapsed_ms(started),
            failures,
        };

        let outcome = if report.passed() { "passed" } else { "failed" };
        metrics::counter!(m::INTEGRATION_SCENARIOS_TOTAL, m::LABEL_OUTCOME => outcome).increment(1);
        if report.passed() {
            info!(scenario = %scenario.name, duration_ms = report.duration_ms, "scenario passed");
        } else {
            for failure in &report.failures {
                warn!(scenario = %scenario.name, failure = %failure, "scenario check failed");
            }
        }
        report
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
