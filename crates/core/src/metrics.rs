//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 레코더가 설치되지 않은 경우 `metrics::counter!()` 등은 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `hookprobe_`
//! - 컴포넌트명: `integration_`, `verify_`, `load_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (passed, failed / matched, missing, ...)
pub const LABEL_OUTCOME: &str = "outcome";

/// 실패 종류 레이블 키 (transport, status, timeout ...)
pub const LABEL_REASON: &str = "reason";

// ─── Integration 메트릭 ─────────────────────────────────────────────

/// Integration: 실행된 시나리오 수 (counter, label: outcome)
pub const INTEGRATION_SCENARIOS_TOTAL: &str = "hookprobe_integration_scenarios_total";

/// Integration: 시나리오 요청 지연 시간 (histogram, 초)
pub const INTEGRATION_REQUEST_DURATION_SECONDS: &str =
    "hookprobe_integration_request_duration_seconds";

// ─── Verify 메트릭 ──────────────────────────────────────────────────

/// Verify: 부수 효과 검증 수 (counter, label: outcome)
pub const VERIFICATIONS_TOTAL: &str = "hookprobe_verify_verifications_total";

// ─── Load 메트릭 ────────────────────────────────────────────────────

/// Load: 전송된 요청 수 (counter)
pub const LOAD_REQUESTS_TOTAL: &str = "hookprobe_load_requests_total";

/// Load: 실패한 요청 수 (counter, label: reason)
pub const LOAD_REQUESTS_FAILED_TOTAL: &str = "hookprobe_load_requests_failed_total";

/// Load: 요청 지연 시간 (histogram, 초)
pub const LOAD_REQUEST_DURATION_SECONDS: &str = "hookprobe_load_request_duration_seconds";

/// Load: 현재 활성 VU 수 (gauge)
pub const LOAD_ACTIVE_VUS: &str = "hookprobe_load_active_vus";

/// Load: 램프가 요구하는 VU 수 (gauge)
pub const LOAD_TARGET_VUS: &str = "hookprobe_load_target_vus";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 요청 지연 시간 히스토그램 버킷 (초)
///
/// 1ms ~ 10s, 50ms / 100ms 임계값 근처를 촘촘하게
pub const REQUEST_DURATION_BUCKETS: [f64; 12] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 1.0, 5.0, 10.0,
];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        INTEGRATION_SCENARIOS_TOTAL,
        "Integration scenarios executed, by outcome"
    );
    describe_histogram!(
        INTEGRATION_REQUEST_DURATION_SECONDS,
        "Round-trip time of integration scenario requests in seconds"
    );

    describe_counter!(
        VERIFICATIONS_TOTAL,
        "Side-effect verifications, by outcome"
    );

    describe_counter!(LOAD_REQUESTS_TOTAL, "Requests sent by the load driver");
    describe_counter!(
        LOAD_REQUESTS_FAILED_TOTAL,
        "Load driver requests that failed, by reason"
    );
    describe_histogram!(
        LOAD_REQUEST_DURATION_SECONDS,
        "Load driver request latency in seconds"
    );
    describe_gauge!(LOAD_ACTIVE_VUS, "Virtual users currently running");
    describe_gauge!(LOAD_TARGET_VUS, "Virtual users requested by the ramp");
}
