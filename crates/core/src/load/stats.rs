//! VU별 요청 통계와 병합된 실행 요약

use std::time::Duration;

use hdrhistogram::Histogram;
use serde::Serialize;

use crate::error::LoadError;

/// 지연 시간은 마이크로초 단위로 1µs부터 60s까지 기록합니다.
const HISTOGRAM_MAX_MICROS: u64 = 60_000_000;
const HISTOGRAM_SIGFIG: u8 = 3;

/// 부하 요청 하나의 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// 기대 상태 (400 미만)
    Success,
    /// 4xx/5xx 응답
    BadStatus(u16),
    /// 완전한 응답을 받지 못함
    TransportError,
}

impl RequestOutcome {
    pub fn is_failure(self) -> bool {
        !matches!(self, Self::Success)
    }
}

/// VU 하나가 소유하는 카운터와 지연 히스토그램
#[derive(Debug, Clone)]
pub struct VuStats {
    latency: Histogram<u64>,
    requests: u64,
    bad_status: u64,
    transport_errors: u64,
}

impl VuStats {
    pub fn new() -> Result<Self, LoadError> {
        let latency = Histogram::new_with_bounds(1, HISTOGRAM_MAX_MICROS, HISTOGRAM_SIGFIG)
            .map_err(|e| LoadError::Histogram(e.to_string()))?;
        Ok(Self {
            latency,
            requests: 0,
            bad_status: 0,
            transport_errors: 0,
        })
    }

    /// 끝난 요청 하나를 기록합니다.
    pub fn record(&mut self, latency: Duration, outcome: RequestOutcome) {
        self.requests += 1;
        match outcome {
            RequestOutcome::Success => {}
            RequestOutcome::BadStatus(_) => self.bad_status += 1,
            RequestOutcome::TransportError => self.transport_errors += 1,
        }
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.latency.saturating_record(micros.max(1));
    }

    /// `other`를 `self`에 합칩니다.
    pub fn merge(&mut self, other: &VuStats) -> Result<(), LoadError> {
        self.latency
            .add(&other.latency)
            .map_err(|e| LoadError::Histogram(e.to_string()))?;
        self.requests += other.requests;
        self.bad_status += other.bad_status;
        self.transport_errors += other.transport_errors;
        Ok(())
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    pub fn failed(&self) -> u64 {
        self.bad_status + self.transport_errors
    }

    /// 전체 요청 중 실패 비율 (보낸 요청이 없으면 0.0)
    pub fn failure_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.failed() as f64 / self.requests as f64
        }
    }

    /// `quantile` (0.0..=1.0) 지점의 지연 시간
    pub fn latency_at(&self, quantile: f64) -> Duration {
        Duration::from_micros(self.latency.value_at_quantile(quantile))
    }

    pub fn summary(&self, elapsed: Duration, peak_vus: u32) -> LoadSummary {
        let secs = elapsed.as_secs_f64();
        LoadSummary {
            requests: self.requests,
            failed: self.failed(),
            bad_status: self.bad_status,
            transport_errors: self.transport_errors,
            failure_rate: self.failure_rate(),
            requests_per_second: if secs > 0.0 {
                self.requests as f64 / secs
            } else {
                0.0
            },
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            peak_vus,
            latency: LatencySummary {
                min_ms: micros_to_ms(self.latency.min()),
                mean_ms: self.latency.mean() / 1000.0,
                p50_ms: self.quantile_ms(0.50),
                p90_ms: self.quantile_ms(0.90),
                p95_ms: self.quantile_ms(0.95),
                p99_ms: self.quantile_ms(0.99),
                p999_ms: self.quantile_ms(0.999),
                max_ms: micros_to_ms(self.latency.max()),
            },
        }
    }

    fn quantile_ms(&self, q: f64) -> f64 {
        micros_to_ms(self.latency.value_at_quantile(q))
    }
}

fn micros_to_ms(micros: u64) -> f64 {
    micros as f64 / 1000.0
}

/// 부하 실행 집계 결과
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub requests: u64,
    pub failed: u64,
    pub bad_status: u64,
    pub transport_errors: u64,
    pub failure_rate: f64,
    pub requests_per_second: f64,
    pub duration_ms: u64,
    pub peak_vus: u32,
    pub latency: LatencySummary,
}

/// 밀리초 단위 지연 분포
#[derive(Debug, Clone, Serialize)]
pub struct LatencySummary {
    pub min_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub p999_ms: f64,
    pub max_ms: f64,
}
