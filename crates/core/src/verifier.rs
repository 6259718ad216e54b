//! 부수 효과 검증
//!
//! 수신기는 레코드를 비동기로 만들기 때문에 HTTP 응답이 도착했을 때 아직
//! 레코드가 없을 수 있습니다. [`SideEffectVerifier`]는 레코드가 나타나거나
//! 마감 시간이 지날 때까지 지수 백오프로 시나리오 키를 반복해서 pop합니다.
//! 마감 시점까지 비어 있으면 부수 효과 누락 실패입니다.
//! 타임아웃이 0이면 즉시 한 번만 pop합니다.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::VerifyConfig;
use crate::equality::{Difference, differences};
use crate::error::StoreError;
use crate::metrics as m;
use crate::scenario::Scenario;
use crate::store::SideEffectStore;

/// 레코드 pop 백오프 일정
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    /// 레코드를 기다리는 전체 시간 (0이면 한 번만 시도)
    pub timeout: Duration,
    /// 첫 번째 빈 pop 이후 대기 시간
    pub initial_interval: Duration,
    /// 대기 시간 한 번의 상한
    pub max_interval: Duration,
    /// 대기 시간 증가 배수
    pub multiplier: f64,
}

impl PollPolicy {
    /// 대기 없이 정확히 한 번 pop
    pub const fn immediate() -> Self {
        Self {
            timeout: Duration::ZERO,
            initial_interval: Duration::ZERO,
            max_interval: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// 다음 대기 시간. `Duration` 범위를 넘는 곱은 `max_interval`로 포화됩니다.
    fn next_interval(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.multiplier)
            .map_or(self.max_interval, |d| d.min(self.max_interval))
    }
}

impl From<&VerifyConfig> for PollPolicy {
    fn from(config: &VerifyConfig) -> Self {
        Self {
            timeout: config.timeout,
            initial_interval: config.initial_interval,
            max_interval: config.max_interval,
            multiplier: config.multiplier,
        }
    }
}

/// 시나리오 하나의 부수 효과 검증 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Verification {
    /// pop한 레코드가 기대값과 같음 (드레인 검사 시 키도 비어 있음)
    Matched { attempts: u32 },
    /// 마감 시간까지 키에 아무것도 나타나지 않음
    Missing { attempts: u32, waited_ms: u64 },
    /// pop한 레코드가 기대값과 다름
    Mismatch {
        actual: Value,
        differences: Vec<Difference>,
    },
    /// pop한 레코드가 올바른 JSON이 아님
    InvalidRecord { raw: String, reason: String },
    /// 레코드는 일치했지만 같은 키에 두 번째 레코드가 남아 있음
    Leftover { raw: String },
    /// 스토어 자체 실패
    StoreFailed { reason: String },
}

impl Verification {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Matched { .. } => "matched",
            Self::Missing { .. } => "missing",
            Self::Mismatch { .. } => "mismatch",
            Self::InvalidRecord { .. } => "invalid_record",
            Self::Leftover { .. } => "leftover",
            Self::StoreFailed { .. } => "store_failed",
        }
    }
}

enum Polled {
    Found { raw: String, attempts: u32 },
    Empty { attempts: u32, waited: Duration },
}

/// 시나리오가 만들어야 하는 레코드를 pop하고 검사합니다.
pub struct SideEffectVerifier<S> {
    store: S,
    policy: PollPolicy,
    check_drained: bool,
}

impl<S: SideEffectStore> SideEffectVerifier<S> {
    pub fn new(store: S, policy: PollPolicy, check_drained: bool) -> Self {
        Self {
            store,
            policy,
            check_drained,
        }
    }

    pub fn from_config(store: S, config: &VerifyConfig) -> Self {
        Self::new(store, PollPolicy::from(config), config.check_drained)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// `integration:<scenario.name>` 아래의 레코드를 검증합니다.
    pub async fn verify(&self, scenario: &Scenario) -> Verification {
        let key = scenario.queue_key();
        let outcome = match self.verify_key(&key, &scenario.expected()).await {
            Ok(v) => v,
            Err(e) => {
                warn!(scenario = %scenario.name, error = %e, "store failure during verification");
                Verification::StoreFailed {
                    reason: e.to_string(),
                }
            }
        };
        metrics::counter!(m::VERIFICATIONS_TOTAL, m::LABEL_OUTCOME => outcome.label())
            .increment(1);
        outcome
    }

    async fn verify_key(&self, key: &str, expected: &Value) -> Result<Verification, StoreError> {
        let (raw, attempts) = match self.poll(key).await? {
            Polled::Found { raw, attempts } => (raw, attempts),
            Polled::Empty { attempts, waited } => {
                return Ok(Verification::Missing {
                    attempts,
                    waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                });
            }
        };
        debug!(key, attempts, record = %raw, "side effect popped");

        let actual: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                return Ok(Verification::InvalidRecord {
                    raw,
                    reason: e.to_string(),
                });
            }
        };

        let diffs = differences(expected, &actual);
        if !diffs.is_empty() {
            return Ok(Verification::Mismatch {
                actual,
                differences: diffs,
            });
        }

        if self.check_drained {
            if let Some(extra) = self.store.pop(key).await? {
                return Ok(Verification::Leftover { raw: extra });
            }
        }

        Ok(Verification::Matched { attempts })
    }

    async fn poll(&self, key: &str) -> Result<Polled, StoreError> {
        let started = Instant::now();
        let deadline = started + self.policy.timeout;
        let mut interval = self.policy.initial_interval;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            if let Some(raw) = self.store.pop(key).await? {
                return Ok(Polled::Found { raw, attempts });
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Polled::Empty {
                    attempts,
                    waited: now - started,
                });
            }

            let delay = interval.min(deadline - now);
            debug!(key, attempts, delay_ms = delay.as_millis() as u64, "record not there yet");
            tokio::time::sleep(delay).await;
            interval = self.policy.next_interval(interval);
        }
    }
}
