use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use shopwatch_core::{
    ApiConfig, LoadProfile, LoadRecorder, LoadSummary, OrderRequest, RequestSample, Result,
    ShopwatchError, Step, Workload,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::client::{Probe, ShopApiClient};

/// How often the scheduler re-evaluates the VU target.
pub const SCHEDULER_TICK: Duration = Duration::from_millis(100);
const PROGRESS_EVERY: Duration = Duration::from_secs(1);
/// In-flight iterations get this long to finish once the last stage ends.
const GRACEFUL_STOP: Duration = Duration::from_secs(30);
const CANCEL_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoadEvent {
    Started { profile: String, base_url: String, duration_ms: u64, peak_vus: u32 },
    Stage { index: usize, total: usize, target: u32 },
    Progress { elapsed_ms: u64, active_vus: u32, target_vus: u32, requests: u64, failed: u64 },
    Done { summary: LoadSummary },
    Cancelled { summary: LoadSummary },
    Error { message: String },
}

enum VuReport {
    Request(RequestSample),
    Iteration,
}

struct VuContext {
    client: ShopApiClient,
    workload: Workload,
}

struct VuHandle {
    id: u32,
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the running virtual users. Scaling down cancels the most recently
/// started VUs first; they finish their current request before exiting. A VU
/// id is not handed out again while its retired holder is still running.
struct VuPool {
    ctx: Arc<VuContext>,
    reports: mpsc::UnboundedSender<VuReport>,
    active: Vec<VuHandle>,
    retired: Vec<(u32, JoinHandle<()>)>,
}

impl VuPool {
    fn new(ctx: Arc<VuContext>, reports: mpsc::UnboundedSender<VuReport>) -> Self {
        Self {
            ctx,
            reports,
            active: Vec::new(),
            retired: Vec::new(),
        }
    }

    fn active(&self) -> u32 {
        self.active.len() as u32
    }

    /// Lowest id not held by an active or still-draining VU.
    fn next_id(&self) -> u32 {
        let taken = |id: u32| {
            self.active.iter().any(|vu| vu.id == id)
                || self
                    .retired
                    .iter()
                    .any(|(rid, task)| *rid == id && !task.is_finished())
        };
        (1..).find(|&id| !taken(id)).unwrap_or(u32::MAX)
    }

    fn scale_to(&mut self, target: u32) {
        self.retired.retain(|(_, task)| !task.is_finished());

        while self.active() < target {
            let id = self.next_id();
            let token = CancellationToken::new();
            let task = tokio::spawn(run_vu(
                self.ctx.clone(),
                id,
                token.clone(),
                self.reports.clone(),
            ));
            self.active.push(VuHandle { id, token, task });
        }

        while self.active() > target {
            let Some(vu) = self.active.pop() else { break };
            debug!(vu = vu.id, "Retiring VU");
            vu.token.cancel();
            self.retired.push((vu.id, vu.task));
        }
    }

    /// Stops every VU, waiting up to `grace` before aborting stragglers.
    async fn shutdown(mut self, grace: Duration) {
        for vu in &self.active {
            vu.token.cancel();
        }
        let deadline = tokio::time::Instant::now() + grace;
        let tasks = self
            .active
            .drain(..)
            .map(|vu| vu.task)
            .chain(self.retired.drain(..).map(|(_, task)| task));

        for mut task in tasks {
            if tokio::time::timeout_at(deadline, &mut task).await.is_err() {
                task.abort();
            }
        }
    }
}

pub struct LoadRunner {
    http: reqwest::Client,
}

impl Default for LoadRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadRunner {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Runs `profile` to completion (or cancellation) and returns the summary.
    pub async fn run(&self, profile: &LoadProfile, cancel_token: CancellationToken) -> Result<LoadSummary> {
        let (tx, mut rx) = mpsc::channel(64);

        let mut summary = None;
        let mut error = None;
        let drain = async {
            while let Some(event) = rx.recv().await {
                match event {
                    LoadEvent::Done { summary: s } | LoadEvent::Cancelled { summary: s } => summary = Some(s),
                    LoadEvent::Error { message } => error = Some(message),
                    _ => {}
                }
            }
        };

        tokio::join!(self.run_streaming(profile, cancel_token, tx), drain);

        if let Some(message) = error {
            return Err(ShopwatchError::Profile(message));
        }
        summary.ok_or_else(|| ShopwatchError::Profile("load run produced no summary".to_string()))
    }

    #[instrument(skip_all, fields(profile = %profile.name, base = %profile.base_url))]
    pub async fn run_streaming(
        &self,
        profile: &LoadProfile,
        cancel_token: CancellationToken,
        tx: mpsc::Sender<LoadEvent>,
    ) {
        if let Err(e) = profile.validate() {
            let _ = tx.send(LoadEvent::Error { message: e.to_string() }).await;
            return;
        }

        info!(
            stages = profile.stages.len(),
            peak = profile.peak_target(),
            "Starting load run"
        );

        let ctx = Arc::new(VuContext {
            client: ShopApiClient::with_http(self.http.clone(), &profile.base_url, &ApiConfig::default()),
            workload: profile.workload.clone(),
        });
        let (report_tx, mut report_rx) = mpsc::unbounded_channel();
        let mut pool = VuPool::new(ctx, report_tx);
        let mut recorder = LoadRecorder::new();

        let _ = tx
            .send(LoadEvent::Started {
                profile: profile.name.clone(),
                base_url: profile.base_url.clone(),
                duration_ms: profile.total_duration().as_millis() as u64,
                peak_vus: profile.peak_target(),
            })
            .await;

        let start = Instant::now();
        let mut ticker = tokio::time::interval(SCHEDULER_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut current_stage = None;
        let mut last_progress = Duration::ZERO;

        let cancelled = loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break true,
                Some(report) = report_rx.recv() => record(&mut recorder, report),
                _ = ticker.tick() => {
                    let elapsed = start.elapsed();
                    let Some(target) = profile.target_at(elapsed) else { break false };

                    let stage = profile.stage_at(elapsed);
                    if stage != current_stage {
                        current_stage = stage;
                        if let Some(index) = stage {
                            info!(stage = index, target = profile.stages[index].target, "Entering stage");
                            let _ = tx
                                .send(LoadEvent::Stage {
                                    index,
                                    total: profile.stages.len(),
                                    target: profile.stages[index].target,
                                })
                                .await;
                        }
                    }

                    pool.scale_to(target);
                    recorder.observe_vus(pool.active());

                    if elapsed - last_progress >= PROGRESS_EVERY {
                        last_progress = elapsed;
                        let _ = tx
                            .send(LoadEvent::Progress {
                                elapsed_ms: elapsed.as_millis() as u64,
                                active_vus: pool.active(),
                                target_vus: target,
                                requests: recorder.requests(),
                                failed: recorder.failed(),
                            })
                            .await;
                    }
                }
            }
        };

        let grace = if cancelled { CANCEL_GRACE } else { GRACEFUL_STOP };
        pool.shutdown(grace).await;
        while let Some(report) = report_rx.recv().await {
            record(&mut recorder, report);
        }

        let summary = recorder.summarize(profile, start.elapsed(), cancelled);
        if cancelled {
            warn!(requests = summary.requests, "Load run cancelled");
            let _ = tx.send(LoadEvent::Cancelled { summary }).await;
            return;
        }

        info!(
            requests = summary.requests,
            failed_rate = summary.failed_rate,
            p95_ms = summary.latency.p95_ms,
            passed = summary.passed,
            "Load run complete"
        );
        let _ = tx.send(LoadEvent::Done { summary }).await;
    }
}

fn record(recorder: &mut LoadRecorder, report: VuReport) {
    match report {
        VuReport::Request(sample) => recorder.record(&sample),
        VuReport::Iteration => recorder.record_iteration(),
    }
}

fn sample(step: Step, probe: Probe) -> RequestSample {
    RequestSample {
        step,
        latency_ms: probe.latency.as_secs_f64() * 1000.0,
        status: probe.status,
        error: probe.error,
    }
}

/// Sleeps for the think time. Returns false if the VU was retired meanwhile.
async fn think(token: &CancellationToken, pause: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(pause) => true,
    }
}

async fn run_vu(
    ctx: Arc<VuContext>,
    vu: u32,
    token: CancellationToken,
    reports: mpsc::UnboundedSender<VuReport>,
) {
    let workload = &ctx.workload;
    let email = workload.email_for(vu);
    let mut rng = StdRng::from_entropy();
    debug!(vu, "VU started");

    while !token.is_cancelled() {
        let probe = ctx.client.probe_products(workload.request_timeout).await;
        let _ = reports.send(VuReport::Request(sample(Step::ListProducts, probe)));
        if !think(&token, workload.think_time).await {
            break;
        }

        let request = OrderRequest {
            product_id: rng.gen_range(1..=workload.max_product_id),
            quantity: workload.quantity,
            customer_email: email.clone(),
        };
        let probe = ctx.client.probe_order(&request, workload.request_timeout).await;
        let _ = reports.send(VuReport::Request(sample(Step::PlaceOrder, probe)));
        let _ = reports.send(VuReport::Iteration);
        if !think(&token, workload.think_time).await {
            break;
        }
    }

    debug!(vu, "VU stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shopwatch_core::{Stage, Threshold};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn smoke_profile(base: &str) -> LoadProfile {
        LoadProfile {
            name: "smoke".to_string(),
            description: String::new(),
            base_url: base.to_string(),
            stages: vec![
                Stage::new(Duration::from_millis(400), 2),
                Stage::new(Duration::from_millis(400), 0),
            ],
            thresholds: vec![
                Threshold::HttpReqFailed { max_rate: 0.2 },
                Threshold::HttpReqDuration {
                    percentile: 95.0,
                    max_ms: 5000.0,
                },
            ],
            workload: Workload {
                think_time: Duration::from_millis(10),
                request_timeout: Duration::from_secs(2),
                max_product_id: 5,
                quantity: 1,
                email_template: "loadtest{vu}@shopwatch.io".to_string(),
            },
        }
    }

    fn ids(pool: &VuPool) -> Vec<u32> {
        pool.active.iter().map(|vu| vu.id).collect()
    }

    #[tokio::test]
    async fn test_rescale_skips_ids_of_draining_vus() {
        let (reports, _rx) = mpsc::unbounded_channel();
        let ctx = Arc::new(VuContext {
            client: ShopApiClient::new("http://127.0.0.1:1"),
            workload: smoke_profile("http://127.0.0.1:1").workload,
        });
        let mut pool = VuPool::new(ctx, reports);

        pool.scale_to(2);
        assert_eq!(ids(&pool), vec![1, 2]);

        // VU 2 is cancelled but has not been polled yet, so it is still draining.
        pool.scale_to(1);
        assert_eq!(ids(&pool), vec![1]);
        assert_eq!(pool.retired.len(), 1);

        pool.scale_to(2);
        assert_eq!(ids(&pool), vec![1, 3]);

        pool.shutdown(Duration::from_millis(200)).await;
    }

    async fn mount_products(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"products": []})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_healthy_run_passes_thresholds() {
        let server = MockServer::start().await;
        mount_products(&server).await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(body_partial_json(json!({"quantity": 1})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"status": "completed"})))
            .mount(&server)
            .await;

        let summary = LoadRunner::new()
            .run(&smoke_profile(&server.uri()), CancellationToken::new())
            .await
            .unwrap();

        assert!(summary.requests > 0);
        assert_eq!(summary.failed_requests, 0);
        assert!(summary.iterations > 0);
        assert!(summary.peak_vus >= 1 && summary.peak_vus <= 2);
        assert!(summary.passed);
        assert!(!summary.cancelled);
    }

    #[tokio::test]
    async fn test_failing_orders_break_error_budget() {
        let server = MockServer::start().await;
        mount_products(&server).await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "db down"})))
            .mount(&server)
            .await;

        let summary = LoadRunner::new()
            .run(&smoke_profile(&server.uri()), CancellationToken::new())
            .await
            .unwrap();

        assert!(summary.failed_rate > 0.2);
        assert!(!summary.thresholds[0].passed);
        assert!(!summary.passed);
        let orders = summary.checks.iter().find(|c| c.name == "order 200/201").unwrap();
        assert_eq!(orders.passes, 0);
        assert!(orders.fails > 0);
    }

    #[tokio::test]
    async fn test_cancel_stops_run_early() {
        let server = MockServer::start().await;
        mount_products(&server).await;

        let mut profile = smoke_profile(&server.uri());
        profile.stages = vec![Stage::new(Duration::from_secs(60), 3)];

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let summary = LoadRunner::new().run(&profile, cancel).await.unwrap();

        assert!(summary.cancelled);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_streaming_event_order() {
        let server = MockServer::start().await;
        mount_products(&server).await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let (tx, mut rx) = mpsc::channel(256);
        let runner = LoadRunner::new();
        let profile = smoke_profile(&server.uri());
        let run = runner.run_streaming(&profile, CancellationToken::new(), tx);

        let collect = async {
            let mut events = Vec::new();
            while let Some(event) = rx.recv().await {
                events.push(event);
            }
            events
        };
        let ((), events) = tokio::join!(run, collect);

        assert!(matches!(events.first(), Some(LoadEvent::Started { peak_vus: 2, .. })));
        assert!(matches!(events.last(), Some(LoadEvent::Done { .. })));
        let stages: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                LoadEvent::Stage { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(stages, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_invalid_profile_is_error() {
        let mut profile = smoke_profile("http://127.0.0.1:1");
        profile.stages.clear();

        let err = LoadRunner::new()
            .run(&profile, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ShopwatchError::Profile(_)));
    }

    #[test]
    fn test_load_event_serializes_with_type_tag() {
        let event = LoadEvent::Stage { index: 1, total: 3, target: 60 };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "stage");
        assert_eq!(value["target"], 60);
    }
}
