//! 부하 드라이버
//!
//! 스테이지 램프를 따라 가상 사용자(VU)를 늘리고 줄이며 고정 엔드포인트에
//! 요청을 보내고, 합산된 실패율과 지연 백분위수로 통과 여부를 판정합니다.

pub mod driver;
pub mod stage;
pub mod stats;
pub mod thresholds;

pub use driver::{LoadDriver, LoadReport};
pub use stage::{PlannedStage, Ramp};
pub use stats::{LatencySummary, LoadSummary, RequestOutcome, VuStats};
pub use thresholds::ThresholdCheck;
