//! hookprobe 공통 라이브러리
//!
//! 웹훅 수신기를 대상으로 하는 두 가지 하네스를 제공합니다.
//!
//! - 통합 스위트: [`ScenarioRunner`]가 시나리오를 순서대로 전송하고
//!   [`SideEffectVerifier`]가 Redis 큐에 남은 부수 효과를 검증합니다.
//! - 부하 드라이버: [`LoadDriver`]가 스테이지 램프를 따라 VU를 조절하고
//!   실패율/지연 임계값으로 결과를 판정합니다.

pub mod client;
pub mod config;
pub mod equality;
pub mod error;
pub mod load;
pub mod metrics;
pub mod runner;
pub mod scenario;
pub mod store;
pub mod verifier;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{
    ConfigError, HookprobeError, LoadError, ScenarioError, StoreError, TransportError,
};

// 설정
pub use config::HookprobeConfig;

// 시나리오
pub use scenario::{Expectation, Scenario, ScenarioTable};

// 경계 trait 및 구현
pub use client::{HttpResponse, ReqwestWebhookClient, WebhookClient};
pub use store::{RedisStore, SideEffectStore};

// 실행기
pub use load::{LoadDriver, LoadReport, Ramp};
pub use runner::{Failure, ScenarioReport, ScenarioRunner, SuiteReport};
pub use verifier::{PollPolicy, SideEffectVerifier, Verification};
