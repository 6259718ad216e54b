//! 부하 드라이버 - 스테이지 램프를 따르는 가상 사용자(VU)
//!
//! 컨트롤러가 `tick`마다 목표 VU 수를 다시 계산해 `watch` 채널로 알립니다.
//! VU `i`는 `i < desired`인 동안 요청을 계속 보내고, 목표 수가 그 아래로
//! 내려가면 진행 중인 요청을 마친 뒤 자신의 통계를 반환합니다.
//! 컨트롤러는 반환된 통계를 병합합니다. 취소 시에는 목표 수를 0으로 내리고
//! 같은 방식으로 드레인합니다.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::Serialize;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::{WebhookClient, encode_json};
use crate::config::{LoadConfig, ThresholdConfig};
use crate::error::{LoadError, TransportError};
use crate::load::stage::Ramp;
use crate::load::stats::{LoadSummary, RequestOutcome, VuStats};
use crate::load::thresholds::{ThresholdCheck, all_passed, evaluate};
use crate::metrics as m;

/// 부하 실행 결과
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub run_id: String,
    pub url: String,
    /// 램프가 끝나기 전에 중단되었는지 여부
    pub cancelled: bool,
    pub summary: LoadSummary,
    pub thresholds: Vec<ThresholdCheck>,
}

impl LoadReport {
    /// 모든 임계값 통과 여부
    pub fn passed(&self) -> bool {
        all_passed(&self.thresholds)
    }
}

/// [`Ramp`]를 따라 `POST <url>` 트래픽을 발생시킵니다.
pub struct LoadDriver<C> {
    client: Arc<C>,
    url: Arc<str>,
    ramp: Ramp,
    tick: Duration,
    thresholds: ThresholdConfig,
}

impl<C: WebhookClient> LoadDriver<C> {
    pub fn new(
        client: C,
        url: &str,
        ramp: Ramp,
        tick: Duration,
        thresholds: ThresholdConfig,
    ) -> Self {
        Self {
            client: Arc::new(client),
            url: Arc::from(url),
            ramp,
            tick,
            thresholds,
        }
    }

    pub fn from_config(client: C, config: &LoadConfig) -> Result<Self, LoadError> {
        Ok(Self::new(
            client,
            &config.url,
            Ramp::from_config(config)?,
            config.tick,
            config.thresholds.clone(),
        ))
    }

    pub fn ramp(&self) -> &Ramp {
        &self.ramp
    }

    /// 램프 전체를 실행하고 (또는 `cancel`까지) 임계값을 평가합니다.
    pub async fn run(&self, cancel: CancellationToken) -> Result<LoadReport, LoadError> {
        let run_id = Uuid::new_v4().to_string();
        info!(
            run_id = %run_id,
            url = %self.url,
            stages = self.ramp.stages().len(),
            peak_vus = self.ramp.peak(),
            duration = ?self.ramp.total_duration(),
            "load run started"
        );

        let (desired_tx, desired_rx) = watch::channel(0u32);
        let mut vus: Vec<Option<JoinHandle<VuStats>>> = Vec::new();
        let mut merged = VuStats::new()?;
        let mut peak_vus = 0u32;
        let mut cancelled = false;
        let mut last_target = None;

        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!(run_id = %run_id, "load run cancelled, draining virtual users");
                    cancelled = true;
                    break;
                }
                _ = ticker.tick() => {}
            }

            let Some(target) = self.ramp.target_at(started.elapsed()) else {
                break;
            };
            if last_target != Some(target) {
                debug!(target, "desired virtual users changed");
                last_target = Some(target);
            }
            desired_tx.send_replace(target);
            metrics::gauge!(m::LOAD_TARGET_VUS).set(f64::from(target));

            let wanted = target as usize;
            if vus.len() < wanted {
                vus.resize_with(wanted, || None);
            }
            for (id, slot) in vus.iter_mut().enumerate().take(wanted) {
                if let Some(handle) = slot.take_if(|h| h.is_finished()) {
                    harvest(&mut merged, handle).await?;
                }
                if slot.is_none() {
                    *slot = Some(tokio::spawn(virtual_user(
                        id,
                        Arc::clone(&self.client),
                        Arc::clone(&self.url),
                        desired_rx.clone(),
                        VuStats::new()?,
                    )));
                }
            }

            let active = vus
                .iter()
                .filter(|s| s.as_ref().is_some_and(|h| !h.is_finished()))
                .count();
            peak_vus = peak_vus.max(u32::try_from(active).unwrap_or(u32::MAX));
            metrics::gauge!(m::LOAD_ACTIVE_VUS).set(active as f64);
        }

        desired_tx.send_replace(0);
        metrics::gauge!(m::LOAD_TARGET_VUS).set(0.0);
        for handle in vus.into_iter().flatten() {
            harvest(&mut merged, handle).await?;
        }
        metrics::gauge!(m::LOAD_ACTIVE_VUS).set(0.0);

        let summary = merged.summary(started.elapsed(), peak_vus);
        let thresholds = evaluate(&merged, &self.thresholds);
        let report = LoadReport {
            run_id,
            url: self.url.to_string(),
            cancelled,
            summary,
            thresholds,
        };

        info!(
            run_id = %report.run_id,
            requests = report.summary.requests,
            failed = report.summary.failed,
            p95_ms = report.summary.latency.p95_ms,
            passed = report.passed(),
            "load run finished"
        );
        Ok(report)
    }
}

async fn harvest(merged: &mut VuStats, handle: JoinHandle<VuStats>) -> Result<(), LoadError> {
    match handle.await {
        Ok(stats) => merged.merge(&stats),
        Err(e) => {
            warn!(error = %e, "virtual user task failed, its samples are lost");
            Ok(())
        }
    }
}

async fn virtual_user<C: WebhookClient>(
    id: usize,
    client: Arc<C>,
    url: Arc<str>,
    desired: watch::Receiver<u32>,
    mut stats: VuStats,
) -> VuStats {
    debug!(vu = id, "virtual user started");
    loop {
        let wanted = *desired.borrow() as usize;
        if id >= wanted {
            break;
        }
        let started = Instant::now();
        let outcome = match load_body() {
            Ok(body) => match client.post(&url, body).await {
                Ok(response) if response.is_error() => RequestOutcome::BadStatus(response.status),
                Ok(_) => RequestOutcome::Success,
                Err(e) => {
                    debug!(vu = id, error = %e, "load request failed");
                    RequestOutcome::TransportError
                }
            },
            Err(_) => RequestOutcome::TransportError,
        };
        let elapsed = started.elapsed();
        stats.record(elapsed, outcome);

        metrics::counter!(m::LOAD_REQUESTS_TOTAL).increment(1);
        metrics::histogram!(m::LOAD_REQUEST_DURATION_SECONDS).record(elapsed.as_secs_f64());
        match outcome {
            RequestOutcome::Success => {}
            RequestOutcome::BadStatus(_) => {
                metrics::counter!(m::LOAD_REQUESTS_FAILED_TOTAL, m::LABEL_REASON => "status")
                    .increment(1);
            }
            RequestOutcome::TransportError => {
                metrics::counter!(m::LOAD_REQUESTS_FAILED_TOTAL, m::LABEL_REASON => "transport")
                    .increment(1);
            }
        }
    }
    debug!(vu = id, requests = stats.requests(), "virtual user stopped");
    stats
}

/// 부하 요청 본문: `{"data": {}, "timestamp": <epoch millis>}`
fn load_body() -> Result<Bytes, TransportError> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    encode_json(&json!({ "data": {}, "timestamp": timestamp as u64 }))
}
