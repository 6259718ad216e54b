//! 스테이지 기반 VU 램프
//!
//! 각 스테이지는 이전 스테이지의 목표(첫 스테이지는 `start_vus`)에서 자신의
//! 목표까지 스테이지 길이 동안 선형으로 VU 수를 옮깁니다.
//! 길이가 0인 스테이지는 곧바로 목표로 점프합니다.

use std::time::Duration;

use serde::Serialize;

use crate::config::{LoadConfig, StageConfig};
use crate::error::LoadError;

/// 불변 VU 램프
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ramp {
    start_vus: u32,
    stages: Vec<StageConfig>,
}

/// 계산된 램프 스테이지 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStage {
    pub index: usize,
    pub starts_at_ms: u64,
    pub duration_ms: u64,
    pub from: u32,
    pub to: u32,
}

impl Ramp {
    pub fn new(start_vus: u32, stages: Vec<StageConfig>) -> Result<Self, LoadError> {
        if stages.is_empty() {
            return Err(LoadError::EmptyRamp);
        }
        Ok(Self { start_vus, stages })
    }

    pub fn from_config(config: &LoadConfig) -> Result<Self, LoadError> {
        Self::new(config.start_vus, config.stages.clone())
    }

    pub fn stages(&self) -> &[StageConfig] {
        &self.stages
    }

    /// 모든 스테이지 길이의 합
    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    /// 램프가 요구하는 최대 VU 수
    pub fn peak(&self) -> u32 {
        self.stages
            .iter()
            .map(|s| s.target)
            .fold(self.start_vus, u32::max)
    }

    /// 램프 시작 후 `elapsed` 시점의 목표 VU 수 (램프가 끝나면 `None`)
    pub fn target_at(&self, elapsed: Duration) -> Option<u32> {
        let mut from = self.start_vus;
        let mut offset = Duration::ZERO;
        for stage in &self.stages {
            let end = offset + stage.duration;
            if elapsed < end {
                let progress = (elapsed - offset).as_secs_f64() / stage.duration.as_secs_f64();
                return Some(interpolate(from, stage.target, progress));
            }
            from = stage.target;
            offset = end;
        }
        None
    }

    /// 스테이지별 램프 계획
    pub fn plan(&self) -> Vec<PlannedStage> {
        let mut from = self.start_vus;
        let mut offset = Duration::ZERO;
        self.stages
            .iter()
            .enumerate()
            .map(|(index, stage)| {
                let planned = PlannedStage {
                    index,
                    starts_at_ms: as_millis(offset),
                    duration_ms: as_millis(stage.duration),
                    from,
                    to: stage.target,
                };
                from = stage.target;
                offset += stage.duration;
                planned
            })
            .collect()
    }
}

fn interpolate(from: u32, to: u32, progress: f64) -> u32 {
    let progress = progress.clamp(0.0, 1.0);
    let value = f64::from(from) + (f64::from(to) - f64::from(from)) * progress;
    value.round() as u32
}

fn as_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(millis: u64, target: u32) -> StageConfig {
        StageConfig {
            duration: Duration::from_millis(millis),
            target,
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn empty_ramp_is_rejected() {
        assert!(matches!(Ramp::new(1, vec![]), Err(LoadError::EmptyRamp)));
    }

    #[test]
    fn first_stage_starts_from_start_vus() {
        let ramp = Ramp::new(0, vec![stage(1000, 10)]).unwrap();
        assert_eq!(ramp.target_at(ms(0)), Some(0));
        assert_eq!(ramp.target_at(ms(500)), Some(5));
        assert_eq!(ramp.target_at(ms(999)), Some(10));
        assert_eq!(ramp.target_at(ms(1000)), None);
    }

    #[test]
    fn later_stages_start_from_previous_target() {
        let ramp = Ramp::new(1, vec![stage(1000, 100), stage(1000, 100), stage(1000, 0)]).unwrap();
        assert_eq!(ramp.target_at(ms(1500)), Some(100));
        assert_eq!(ramp.target_at(ms(2500)), Some(50));
        assert_eq!(ramp.total_duration(), ms(3000));
    }

    #[test]
    fn zero_length_stage_jumps() {
        let ramp = Ramp::new(0, vec![stage(0, 50), stage(1000, 50)]).unwrap();
        assert_eq!(ramp.target_at(ms(0)), Some(50));
    }

    #[test]
    fn default_ramp_peaks_at_one_thousand() {
        let ramp = Ramp::from_config(&LoadConfig::default()).unwrap();
        assert_eq!(ramp.peak(), 1000);
        assert_eq!(ramp.total_duration(), Duration::from_secs(660));
        // 세 번째 스테이지 중간: 200 -> 1000
        assert_eq!(ramp.target_at(Duration::from_secs(20)), Some(600));
    }

    #[test]
    fn plan_lists_offsets_and_endpoints() {
        let ramp = Ramp::new(1, vec![stage(5000, 10), stage(10_000, 200)]).unwrap();
        let plan = ramp.plan();
        assert_eq!(
            plan,
            vec![
                PlannedStage {
                    index: 0,
                    starts_at_ms: 0,
                    duration_ms: 5000,
                    from: 1,
                    to: 10
                },
                PlannedStage {
                    index: 1,
                    starts_at_ms: 5000,
                    duration_ms: 10_000,
                    from: 10,
                    to: 200
                },
            ]
        );
    }
}
