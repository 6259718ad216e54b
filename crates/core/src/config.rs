//! 설정 관리 - hookprobe.toml 파싱 및 런타임 설정
//!
//! [`HookprobeConfig`]는 통합 테스트, 부하 테스트, 메트릭 설정을 담는 최상위 구조체입니다.
//! 시작 시 한 번 로드되고 이후에는 읽기 전용으로 각 컴포넌트에 전달됩니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`HOOKPROBE_LOAD_URL=...` 형식, 그리고 `REDIS_HOST` / `REDIS_PASSWORD`)
//! 3. 설정 파일 (`hookprobe.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), hookprobe_core::error::HookprobeError> {
//! use hookprobe_core::config::HookprobeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = HookprobeConfig::load("hookprobe.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = HookprobeConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, HookprobeError};

/// hookprobe 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookprobeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 통합 테스트(시나리오 러너) 설정
    #[serde(default)]
    pub integration: IntegrationConfig,
    /// 부수 효과 검증기 설정
    #[serde(default)]
    pub verify: VerifyConfig,
    /// 부하 드라이버 설정
    #[serde(default)]
    pub load: LoadConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl HookprobeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HookprobeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, HookprobeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HookprobeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                HookprobeError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, HookprobeError> {
        toml::from_str(toml_str).map_err(|e| {
            HookprobeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// `REDIS_HOST`, `REDIS_PASSWORD`가 먼저 적용되고,
    /// 더 구체적인 `HOOKPROBE_{SECTION}_{FIELD}` 변수가 그 위에 적용됩니다.
    pub fn apply_env_overrides(&mut self) {
        // 관례적인 Redis 변수명이 먼저 적용됩니다
        override_string(&mut self.integration.store.host, "REDIS_HOST");
        override_string(&mut self.integration.store.password, "REDIS_PASSWORD");

        // General
        override_string(&mut self.general.log_level, "HOOKPROBE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "HOOKPROBE_GENERAL_LOG_FORMAT");

        // Integration
        override_string(
            &mut self.integration.base_url,
            "HOOKPROBE_INTEGRATION_BASE_URL",
        );
        override_string(&mut self.integration.token, "HOOKPROBE_INTEGRATION_TOKEN");
        override_string(
            &mut self.integration.scenarios_file,
            "HOOKPROBE_INTEGRATION_SCENARIOS_FILE",
        );
        override_duration(
            &mut self.integration.request_timeout,
            "HOOKPROBE_INTEGRATION_REQUEST_TIMEOUT",
        );

        // Store
        override_string(&mut self.integration.store.host, "HOOKPROBE_STORE_HOST");
        override_u16(&mut self.integration.store.port, "HOOKPROBE_STORE_PORT");
        override_i64(
            &mut self.integration.store.database,
            "HOOKPROBE_STORE_DATABASE",
        );
        override_string(
            &mut self.integration.store.username,
            "HOOKPROBE_STORE_USERNAME",
        );
        override_string(
            &mut self.integration.store.password,
            "HOOKPROBE_STORE_PASSWORD",
        );

        // Verify
        override_duration(&mut self.verify.timeout, "HOOKPROBE_VERIFY_TIMEOUT");
        override_bool(
            &mut self.verify.check_drained,
            "HOOKPROBE_VERIFY_CHECK_DRAINED",
        );

        // Load
        override_string(&mut self.load.url, "HOOKPROBE_LOAD_URL");
        override_string(&mut self.load.secret, "HOOKPROBE_LOAD_SECRET");
        override_duration(
            &mut self.load.request_timeout,
            "HOOKPROBE_LOAD_REQUEST_TIMEOUT",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "HOOKPROBE_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "HOOKPROBE_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "HOOKPROBE_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), HookprobeError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        // integration
        validate_http_url("integration.base_url", &self.integration.base_url)?;
        validate_header_name("integration.token_header", &self.integration.token_header)?;
        if self.integration.request_timeout.is_zero() {
            return Err(invalid(
                "integration.request_timeout",
                "must be greater than zero".to_owned(),
            ));
        }
        if self.integration.store.host.is_empty() {
            return Err(invalid(
                "integration.store.host",
                "must not be empty".to_owned(),
            ));
        }
        if self.integration.store.port == 0 {
            return Err(invalid(
                "integration.store.port",
                "must be greater than zero".to_owned(),
            ));
        }
        if self.integration.store.database < 0 {
            return Err(invalid(
                "integration.store.database",
                "must not be negative".to_owned(),
            ));
        }

        // verify
        if !self.verify.multiplier.is_finite() || self.verify.multiplier < 1.0 {
            return Err(invalid(
                "verify.multiplier",
                "must be a finite number >= 1.0".to_owned(),
            ));
        }
        if !self.verify.timeout.is_zero() && self.verify.initial_interval.is_zero() {
            return Err(invalid(
                "verify.initial_interval",
                "must be greater than zero when verify.timeout is set".to_owned(),
            ));
        }
        if self.verify.max_interval < self.verify.initial_interval {
            return Err(invalid(
                "verify.max_interval",
                "must be >= verify.initial_interval".to_owned(),
            ));
        }

        // load
        validate_http_url("load.url", &self.load.url)?;
        validate_header_name("load.secret_header", &self.load.secret_header)?;
        if self.load.request_timeout.is_zero() {
            return Err(invalid(
                "load.request_timeout",
                "must be greater than zero".to_owned(),
            ));
        }
        if self.load.tick.is_zero() {
            return Err(invalid("load.tick", "must be greater than zero".to_owned()));
        }
        if self.load.stages.is_empty() {
            return Err(invalid(
                "load.stages",
                "at least one stage is required".to_owned(),
            ));
        }
        if self.load.stages.iter().all(|s| s.duration.is_zero()) {
            return Err(invalid(
                "load.stages",
                "total ramp duration must be greater than zero".to_owned(),
            ));
        }
        let rate = self.load.thresholds.max_failure_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(invalid(
                "load.thresholds.max_failure_rate",
                "must be within 0.0..=1.0".to_owned(),
            ));
        }

        // metrics
        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid(
                "metrics.port",
                "must be greater than zero when metrics are enabled".to_owned(),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> HookprobeError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

fn validate_http_url(field: &str, url: &str) -> Result<(), HookprobeError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(invalid(
            field,
            "must start with http:// or https://".to_owned(),
        ));
    }
    Ok(())
}

fn validate_header_name(field: &str, name: &str) -> Result<(), HookprobeError> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(invalid(
            field,
            "must be a non-empty header name (ASCII letters, digits, '-')".to_owned(),
        ));
    }
    Ok(())
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 통합 테스트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    /// 시나리오 이름이 뒤에 붙는 기본 URL
    pub base_url: String,
    /// 공유 시크릿 헤더 이름
    pub token_header: String,
    /// 공유 시크릿 값
    pub token: String,
    /// 요청 타임아웃
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// 시나리오 JSON 파일 경로 (비어 있으면 내장 테이블 사용)
    pub scenarios_file: String,
    /// 부수 효과가 기록되는 Redis
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/v1alpha1/integration".to_owned(),
            token_header: "X-Token".to_owned(),
            token: "integration-test".to_owned(),
            request_timeout: Duration::from_secs(10),
            scenarios_file: String::new(),
            store: StoreConfig::default(),
        }
    }
}

/// Redis 스토어 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// 호스트
    pub host: String,
    /// 포트
    pub port: u16,
    /// DB 번호
    pub database: i64,
    /// 사용자명 (ACL, 비어 있으면 기본 사용자)
    pub username: String,
    /// 비밀번호
    pub password: String,
    /// 연결 타임아웃
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 6379,
            database: 0,
            username: String::new(),
            password: String::new(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// 부수 효과 검증기 설정
///
/// `timeout`이 0이면 HTTP 응답 직후 단 한 번만 pop을 시도합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// 레코드를 기다리는 최대 시간
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// 첫 재시도 간격
    #[serde(with = "humantime_serde")]
    pub initial_interval: Duration,
    /// 재시도 간격 상한
    #[serde(with = "humantime_serde")]
    pub max_interval: Duration,
    /// 간격 증가 배수
    pub multiplier: f64,
    /// 매칭 후 같은 키가 비어 있는지 확인
    pub check_drained: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            initial_interval: Duration::from_millis(50),
            max_interval: Duration::from_millis(500),
            multiplier: 2.0,
            check_drained: true,
        }
    }
}

/// 부하 드라이버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// 요청 대상 URL
    pub url: String,
    /// 공유 시크릿 헤더 이름
    pub secret_header: String,
    /// 공유 시크릿 값
    pub secret: String,
    /// 요청 타임아웃
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// 첫 스테이지 시작 시점의 VU 수
    pub start_vus: u32,
    /// 램프 컨트롤러 갱신 주기
    #[serde(with = "humantime_serde")]
    pub tick: Duration,
    /// 스테이지 목록 (순서대로 진행)
    pub stages: Vec<StageConfig>,
    /// 통과 기준
    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

impl Default for LoadConfig {
    fn default() -> Self {
        let stage = |secs: u64, target: u32| StageConfig {
            duration: Duration::from_secs(secs),
            target,
        };
        Self {
            url: "http://localhost:8080/v1alpha1/webhooks/example".to_owned(),
            secret_header: "X-Hook-Secret".to_owned(),
            secret: "test".to_owned(),
            request_timeout: Duration::from_secs(60),
            start_vus: 1,
            tick: Duration::from_millis(100),
            stages: vec![
                stage(5, 10),
                stage(10, 200),
                stage(10, 1000),
                stage(10, 1000),
                stage(10, 100),
                stage(600, 100),
                stage(10, 10),
                stage(5, 0),
            ],
            thresholds: ThresholdConfig::default(),
        }
    }
}

/// 램프 스테이지 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// 스테이지 길이
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    /// 스테이지 종료 시점의 목표 VU 수
    pub target: u32,
}

/// 부하 테스트 통과 기준
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// 허용되는 최대 실패율 (미만이어야 통과)
    pub max_failure_rate: f64,
    /// p95 지연 상한
    #[serde(with = "humantime_serde")]
    pub p95: Duration,
    /// p99.9 지연 상한
    #[serde(with = "humantime_serde")]
    pub p999: Duration,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            max_failure_rate: 0.0001,
            p95: Duration::from_millis(50),
            p999: Duration::from_millis(100),
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 익스포터 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9464,
        }
    }
}

mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_i64(target: &mut i64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<i64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse i64 from env var, ignoring"
            ),
        }
    }
}

fn override_duration(target: &mut Duration, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match humantime::parse_duration(&val) {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse duration from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = HookprobeConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.integration.token_header, "X-Token");
        assert_eq!(config.integration.token, "integration-test");
        assert_eq!(config.integration.store.port, 6379);
        assert_eq!(config.load.secret_header, "X-Hook-Secret");
        assert_eq!(config.load.stages.len(), 8);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        let config = HookprobeConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn default_stages_peak_at_one_thousand_and_end_at_zero() {
        let config = HookprobeConfig::default();
        let peak = config.load.stages.iter().map(|s| s.target).max();
        assert_eq!(peak, Some(1000));
        assert_eq!(config.load.stages.last().map(|s| s.target), Some(0));
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = HookprobeConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(
            config.integration.base_url,
            "http://localhost:8080/v1alpha1/integration"
        );
    }

    #[test]
    fn from_str_parses_human_durations_and_stages() {
        let toml = r#"
[verify]
timeout = "2s"
initial_interval = "25ms"

[load]
url = "http://hooks.internal/v1alpha1/webhooks/example"

[[load.stages]]
duration = "1m 30s"
target = 50

[[load.stages]]
duration = "10s"
target = 0

[load.thresholds]
p95 = "40ms"
"#;
        let config = HookprobeConfig::parse(toml).unwrap();
        assert_eq!(config.verify.timeout, Duration::from_secs(2));
        assert_eq!(config.verify.initial_interval, Duration::from_millis(25));
        // 지정하지 않은 필드는 기본값 유지
        assert_eq!(config.verify.max_interval, Duration::from_millis(500));
        assert_eq!(config.load.stages.len(), 2);
        assert_eq!(config.load.stages[0].duration, Duration::from_secs(90));
        assert_eq!(config.load.thresholds.p95, Duration::from_millis(40));
        assert_eq!(config.load.thresholds.p999, Duration::from_millis(100));
        config.validate().unwrap();
    }

    #[test]
    fn from_str_invalid_duration_returns_parse_error() {
        let result = HookprobeConfig::parse("[verify]\ntimeout = \"soon\"\n");
        assert!(matches!(
            result.unwrap_err(),
            HookprobeError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let result = HookprobeConfig::parse("invalid = [[[toml");
        assert!(matches!(
            result.unwrap_err(),
            HookprobeError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = HookprobeConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_non_http_base_url() {
        let mut config = HookprobeConfig::default();
        config.integration.base_url = "localhost:8080".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("integration.base_url"));
    }

    #[test]
    fn validate_rejects_header_with_spaces() {
        let mut config = HookprobeConfig::default();
        config.load.secret_header = "X Hook Secret".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("load.secret_header"));
    }

    #[test]
    fn validate_rejects_multiplier_below_one() {
        let mut config = HookprobeConfig::default();
        config.verify.multiplier = 0.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("verify.multiplier"));
    }

    #[test]
    fn validate_accepts_zero_timeout_single_pop() {
        let mut config = HookprobeConfig::default();
        config.verify.timeout = Duration::ZERO;
        config.verify.initial_interval = Duration::ZERO;
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_empty_stages() {
        let mut config = HookprobeConfig::default();
        config.load.stages.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("load.stages"));
    }

    #[test]
    fn validate_rejects_failure_rate_above_one() {
        let mut config = HookprobeConfig::default();
        config.load.thresholds.max_failure_rate = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_failure_rate"));
    }

    #[test]
    fn validate_rejects_zero_metrics_port_when_enabled() {
        let mut config = HookprobeConfig::default();
        config.metrics.enabled = true;
        config.metrics.port = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("metrics.port"));
    }

    #[test]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: 테스트 전용 변수명이라 다른 테스트와 겹치지 않습니다.
        unsafe { std::env::set_var("TEST_HOOKPROBE_STR", "overridden") };
        override_string(&mut val, "TEST_HOOKPROBE_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_HOOKPROBE_STR") };
    }

    #[test]
    fn env_override_duration_valid() {
        let mut val = Duration::from_secs(1);
        // SAFETY: 테스트 전용 변수명이라 다른 테스트와 겹치지 않습니다.
        unsafe { std::env::set_var("TEST_HOOKPROBE_DURATION", "750ms") };
        override_duration(&mut val, "TEST_HOOKPROBE_DURATION");
        assert_eq!(val, Duration::from_millis(750));
        unsafe { std::env::remove_var("TEST_HOOKPROBE_DURATION") };
    }

    #[test]
    fn env_override_u16_invalid_keeps_original() {
        let mut val = 6379;
        // SAFETY: 테스트 전용 변수명이라 다른 테스트와 겹치지 않습니다.
        unsafe { std::env::set_var("TEST_HOOKPROBE_U16_BAD", "70000") };
        override_u16(&mut val, "TEST_HOOKPROBE_U16_BAD");
        assert_eq!(val, 6379);
        unsafe { std::env::remove_var("TEST_HOOKPROBE_U16_BAD") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = "original".to_owned();
        override_string(&mut val, "TEST_HOOKPROBE_NONEXISTENT_12345");
        assert_eq!(val, "original");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = HookprobeConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = HookprobeConfig::parse(&toml_str).unwrap();
        assert_eq!(config.load.stages, parsed.load.stages);
        assert_eq!(config.verify.timeout, parsed.verify.timeout);
        assert_eq!(config.integration.base_url, parsed.integration.base_url);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = HookprobeConfig::from_file("/nonexistent/path/hookprobe.toml").await;
        assert!(matches!(
            result.unwrap_err(),
            HookprobeError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
