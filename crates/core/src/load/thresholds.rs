//! 병합된 부하 통계에 대한 통과/실패 판정

use std::time::Duration;

use serde::Serialize;

use crate::config::ThresholdConfig;
use crate::load::stats::VuStats;

/// 평가된 기준 하나: `metric < bound`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdCheck {
    /// 지표 이름 (예: `http_req_failed`, `http_req_duration p(95)`)
    pub metric: String,
    pub actual: f64,
    pub bound: f64,
    /// `actual`과 `bound`의 단위 (`rate` 또는 `ms`)
    pub unit: &'static str,
    pub passed: bool,
}

/// 설정된 모든 기준을 평가합니다. 모든 경계는 엄격한 미만(`<`) 비교입니다.
pub fn evaluate(stats: &VuStats, thresholds: &ThresholdConfig) -> Vec<ThresholdCheck> {
    vec![
        check(
            "http_req_failed",
            stats.failure_rate(),
            thresholds.max_failure_rate,
            "rate",
        ),
        latency_check("http_req_duration p(95)", stats.latency_at(0.95), thresholds.p95),
        latency_check(
            "http_req_duration p(99.9)",
            stats.latency_at(0.999),
            thresholds.p999,
        ),
    ]
}

/// 모든 기준을 통과했는지 여부
pub fn all_passed(checks: &[ThresholdCheck]) -> bool {
    checks.iter().all(|c| c.passed)
}

fn latency_check(metric: &str, actual: Duration, bound: Duration) -> ThresholdCheck {
    check(
        metric,
        actual.as_secs_f64() * 1000.0,
        bound.as_secs_f64() * 1000.0,
        "ms",
    )
}

fn check(metric: &str, actual: f64, bound: f64, unit: &'static str) -> ThresholdCheck {
    ThresholdCheck {
        metric: metric.to_owned(),
        actual,
        bound,
        unit,
        passed: actual < bound,
    }
}
