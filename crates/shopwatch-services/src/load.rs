use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::thread;

use shopwatch_core::{LoadProfile, LoadSummary};
use shopwatch_loadgen::{LoadEvent, LoadRunner};
use tokio::runtime::Runtime;
use tokio::sync::mpsc as tokio_mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

/// Live state of a load run as seen by a front-end.
#[derive(Debug, Default)]
pub struct LoadRun {
    rx: Option<Receiver<LoadEvent>>,
    cancel_token: Option<CancellationToken>,
    pub profile: String,
    pub stage: Option<(usize, usize, u32)>,
    pub elapsed_ms: u64,
    pub duration_ms: u64,
    pub active_vus: u32,
    pub requests: u64,
    pub failed: u64,
    pub log: Vec<String>,
    pub summary: Option<LoadSummary>,
    pub error: Option<String>,
}

impl LoadRun {
    pub fn is_running(&self) -> bool {
        self.rx.is_some()
    }

    /// Fraction of the profile's total duration elapsed so far.
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (self.elapsed_ms as f32 / self.duration_ms as f32).min(1.0)
    }

    pub fn cancel(&self) {
        if let Some(token) = &self.cancel_token {
            LoadService::cancel(token);
        }
    }

    fn finish(&mut self) {
        self.rx = None;
        self.cancel_token = None;
        self.active_vus = 0;
    }

    fn handle_event(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Started { profile, base_url, duration_ms, peak_vus } => {
                self.log.push(format!(
                    "Starting {} against {} ({}s, peak {} VUs)",
                    profile,
                    base_url,
                    duration_ms / 1000,
                    peak_vus
                ));
                self.duration_ms = duration_ms;
            }
            LoadEvent::Stage { index, total, target } => {
                self.log.push(format!("Stage {}/{} → {} VUs", index + 1, total, target));
                self.stage = Some((index, total, target));
            }
            LoadEvent::Progress { elapsed_ms, active_vus, requests, failed, .. } => {
                self.elapsed_ms = elapsed_ms;
                self.active_vus = active_vus;
                self.requests = requests;
                self.failed = failed;
            }
            LoadEvent::Done { summary } => {
                self.log.push(format!(
                    "{} {} requests, {:.2}% failed, p95 {:.0}ms",
                    if summary.passed { "✅ Passed:" } else { "❌ Thresholds failed:" },
                    summary.requests,
                    summary.failed_rate * 100.0,
                    summary.latency.p95_ms
                ));
                self.summary = Some(summary);
                self.finish();
            }
            LoadEvent::Cancelled { summary } => {
                self.log.push(format!("⚠️ Cancelled after {} requests", summary.requests));
                self.summary = Some(summary);
                self.finish();
            }
            LoadEvent::Error { message } => {
                self.log.push(format!("❌ {}", message));
                self.error = Some(message);
                self.finish();
            }
        }
    }
}

/// Runs load profiles on a dedicated thread so front-ends can poll progress.
#[derive(Debug, Default)]
pub struct LoadService;

impl LoadService {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, profile), fields(profile = %profile.name, base = %profile.base_url))]
    pub fn run_streaming(&self, profile: LoadProfile) -> (Receiver<LoadEvent>, CancellationToken) {
        info!("Starting streaming load run");

        let (std_tx, std_rx) = channel();
        let cancel_token = CancellationToken::new();
        let runner_cancel = cancel_token.clone();

        thread::spawn(move || {
            let rt = match Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    error!("Failed to create tokio runtime: {}", e);
                    let _ = std_tx.send(LoadEvent::Error {
                        message: format!("Runtime error: {}", e),
                    });
                    return;
                }
            };

            rt.block_on(async {
                let runner = LoadRunner::new();
                let (tokio_tx, mut tokio_rx) = tokio_mpsc::channel(100);

                tokio::spawn(async move {
                    runner.run_streaming(&profile, runner_cancel, tokio_tx).await;
                });

                while let Some(event) = tokio_rx.recv().await {
                    if std_tx.send(event).is_err() {
                        debug!("Load receiver dropped");
                        break;
                    }
                }

                info!("Load streaming complete");
            });
        });

        (std_rx, cancel_token)
    }

    pub fn cancel(token: &CancellationToken) {
        info!("Cancelling load run");
        token.cancel();
    }

    /// Resets `run` and starts `profile` into it. Ignored while a run is active.
    pub fn start(&self, run: &mut LoadRun, profile: LoadProfile) {
        if run.is_running() {
            return;
        }
        *run = LoadRun {
            profile: profile.name.clone(),
            ..LoadRun::default()
        };
        let (rx, cancel_token) = self.run_streaming(profile);
        run.rx = Some(rx);
        run.cancel_token = Some(cancel_token);
    }

    /// Drains pending events into `run`. Returns true if anything changed.
    pub fn poll(run: &mut LoadRun) -> bool {
        let Some(receiver) = run.rx.take() else { return false };
        let mut changed = false;

        loop {
            match receiver.try_recv() {
                Ok(event) => {
                    changed = true;
                    let terminal = matches!(
                        event,
                        LoadEvent::Done { .. } | LoadEvent::Cancelled { .. } | LoadEvent::Error { .. }
                    );
                    run.handle_event(event);
                    if terminal {
                        return true;
                    }
                }
                Err(TryRecvError::Empty) => {
                    run.rx = Some(receiver);
                    return changed;
                }
                Err(TryRecvError::Disconnected) => {
                    run.finish();
                    return true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shopwatch_core::Stage;
    use std::time::{Duration, Instant};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick_profile(base: &str) -> LoadProfile {
        let mut profile = LoadProfile::hpa_trigger().with_base_url(base);
        profile.stages = vec![Stage::new(Duration::from_millis(500), 2)];
        profile.workload.think_time = Duration::from_millis(10);
        profile
    }

    fn wait_for_finish(run: &mut LoadRun) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while run.is_running() && Instant::now() < deadline {
            LoadService::poll(run);
            thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn test_run_reports_summary() {
        let rt = Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        rt.block_on(
            Mock::given(method("GET"))
                .and(path("/products"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"products": []})))
                .mount(&server),
        );
        rt.block_on(
            Mock::given(method("POST"))
                .and(path("/orders"))
                .respond_with(ResponseTemplate::new(201))
                .mount(&server),
        );

        let service = LoadService::new();
        let mut run = LoadRun::default();
        service.start(&mut run, quick_profile(&server.uri()));
        assert!(run.is_running());
        assert_eq!(run.profile, "hpa-trigger");

        wait_for_finish(&mut run);

        assert!(!run.is_running());
        let summary = run.summary.as_ref().unwrap();
        assert!(summary.requests > 0);
        assert!(summary.passed);
        assert!(run.log[0].starts_with("Starting hpa-trigger"));
    }

    #[test]
    fn test_invalid_profile_surfaces_error() {
        let mut profile = LoadProfile::stress_test();
        profile.stages.clear();

        let mut run = LoadRun::default();
        LoadService::new().start(&mut run, profile);
        wait_for_finish(&mut run);

        assert!(run.summary.is_none());
        assert!(run.error.as_deref().unwrap().contains("no stages"));
    }

    #[test]
    fn test_progress_fraction() {
        let run = LoadRun {
            elapsed_ms: 45_000,
            duration_ms: 180_000,
            ..LoadRun::default()
        };
        assert_eq!(run.progress(), 0.25);
        assert_eq!(LoadRun::default().progress(), 0.0);
    }
}
