//! 에러 타입 - 도메인별 에러 정의

/// hookprobe 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum HookprobeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 시나리오 정의 에러
    #[error("scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    /// HTTP 전송 에러
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// 스토어(Redis) 에러
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// 부하 드라이버 에러
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 시나리오 정의 에러
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// URL 경로 세그먼트로 쓸 수 없는 이름
    #[error("invalid scenario name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// 같은 이름이 두 번 정의됨 (큐 키 충돌)
    #[error("duplicate scenario name: {0}")]
    Duplicate(String),

    /// 필터에 지정된 시나리오가 테이블에 없음
    #[error("unknown scenario: {0}")]
    Unknown(String),

    /// 시나리오 파일 파싱 실패
    #[error("failed to load scenarios from {path}: {reason}")]
    LoadFailed { path: String, reason: String },
}

/// HTTP 전송 에러
///
/// 요청을 보내지 못했거나 응답을 끝까지 읽지 못한 경우입니다.
/// 상태 코드 불일치는 전송 에러가 아닙니다.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// 클라이언트 생성 실패
    #[error("failed to build http client: {0}")]
    Build(String),

    /// 타임아웃
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// 연결/전송 실패
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// 요청 본문 직렬화 실패
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// 스토어(Redis) 에러
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 연결 실패
    #[error("connection failed: {0}")]
    Connection(String),

    /// 명령 실패
    #[error("command failed: {0}")]
    Command(String),
}

/// 부하 드라이버 에러
///
/// 개별 요청 실패는 에러가 아니라 통계에 집계됩니다.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// 지연 시간 히스토그램 생성 실패
    #[error("failed to create latency histogram: {0}")]
    Histogram(String),

    /// 램프에 스테이지가 없음
    #[error("ramp has no stages")]
    EmptyRamp,
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_connection_refusal() || e.is_connection_dropped() || e.is_io_error() {
            Self::Connection(e.to_string())
        } else {
            Self::Command(e.to_string())
        }
    }
}
