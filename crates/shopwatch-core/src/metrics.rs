use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::profile::{LoadProfile, Step, Threshold};

/// One HTTP request made by a virtual user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSample {
    pub step: Step,
    pub latency_ms: f64,
    /// `None` when no response arrived (timeout, refused, reset).
    pub status: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RequestSample {
    pub fn failed(&self) -> bool {
        self.status.map_or(true, |s| s >= 400)
    }

    pub fn check_passed(&self) -> bool {
        self.step.check(self.status)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

impl LatencyStats {
    pub fn from_sorted(sorted: &[f64]) -> Self {
        if sorted.is_empty() {
            return Self::default();
        }
        Self {
            avg_ms: sorted.iter().sum::<f64>() / sorted.len() as f64,
            min_ms: sorted[0],
            max_ms: sorted[sorted.len() - 1],
            p50_ms: percentile(sorted, 50.0),
            p90_ms: percentile(sorted, 90.0),
            p95_ms: percentile(sorted, 95.0),
            p99_ms: percentile(sorted, 99.0),
        }
    }
}

/// Percentile of ascending `sorted` values, linearly interpolated between
/// the closest ranks. Empty input yields 0.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckTally {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdVerdict {
    pub threshold: Threshold,
    pub observed: f64,
    pub passed: bool,
}

impl Threshold {
    pub fn evaluate(&self, failed_rate: f64, sorted_latencies: &[f64]) -> ThresholdVerdict {
        let (observed, passed) = match self {
            Threshold::HttpReqFailed { max_rate } => (failed_rate, failed_rate < *max_rate),
            Threshold::HttpReqDuration { percentile: p, max_ms } => {
                let observed = percentile(sorted_latencies, *p);
                (observed, observed < *max_ms)
            }
        };
        ThresholdVerdict {
            threshold: *self,
            observed,
            passed,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadSummary {
    pub profile: String,
    pub base_url: String,
    pub duration_ms: f64,
    pub iterations: u64,
    pub requests: u64,
    pub failed_requests: u64,
    pub failed_rate: f64,
    pub requests_per_sec: f64,
    pub latency: LatencyStats,
    pub peak_vus: u32,
    pub checks: Vec<CheckTally>,
    pub thresholds: Vec<ThresholdVerdict>,
    pub passed: bool,
    pub cancelled: bool,
}

/// Accumulates samples during a run.
#[derive(Debug, Default)]
pub struct LoadRecorder {
    latencies: Vec<f64>,
    failed: u64,
    iterations: u64,
    peak_vus: u32,
    checks: BTreeMap<&'static str, (u64, u64)>,
}

impl LoadRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sample: &RequestSample) {
        self.latencies.push(sample.latency_ms);
        if sample.failed() {
            self.failed += 1;
        }
        let tally = self.checks.entry(sample.step.check_name()).or_default();
        if sample.check_passed() {
            tally.0 += 1;
        } else {
            tally.1 += 1;
        }
    }

    pub fn record_iteration(&mut self) {
        self.iterations += 1;
    }

    pub fn observe_vus(&mut self, active: u32) {
        self.peak_vus = self.peak_vus.max(active);
    }

    pub fn requests(&self) -> u64 {
        self.latencies.len() as u64
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn failed_rate(&self) -> f64 {
        match self.latencies.len() {
            0 => 0.0,
            n => self.failed as f64 / n as f64,
        }
    }

    pub fn summarize(mut self, profile: &LoadProfile, elapsed: Duration, cancelled: bool) -> LoadSummary {
        self.latencies.sort_by(|a, b| a.total_cmp(b));
        let failed_rate = self.failed_rate();

        let thresholds: Vec<ThresholdVerdict> = profile
            .thresholds
            .iter()
            .map(|t| t.evaluate(failed_rate, &self.latencies))
            .collect();
        let passed = thresholds.iter().all(|v| v.passed);

        let secs = elapsed.as_secs_f64();
        let requests = self.latencies.len() as u64;

        LoadSummary {
            profile: profile.name.clone(),
            base_url: profile.base_url.clone(),
            duration_ms: secs * 1000.0,
            iterations: self.iterations,
            requests,
            failed_requests: self.failed,
            failed_rate,
            requests_per_sec: if secs > 0.0 { requests as f64 / secs } else { 0.0 },
            latency: LatencyStats::from_sorted(&self.latencies),
            peak_vus: self.peak_vus,
            checks: self
                .checks
                .into_iter()
                .map(|(name, (passes, fails))| CheckTally {
                    name: name.to_string(),
                    passes,
                    fails,
                })
                .collect(),
            thresholds,
            passed,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(step: Step, latency_ms: f64, status: Option<u16>) -> RequestSample {
        RequestSample {
            step,
            latency_ms,
            status,
            error: None,
        }
    }

    #[test]
    fn test_percentile_interpolates() {
        let values: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        assert_eq!(percentile(&values, 50.0), 50.5);
        assert!((percentile(&values, 95.0) - 95.05).abs() < 1e-9);
        assert_eq!(percentile(&values, 100.0), 100.0);
        assert_eq!(percentile(&[], 95.0), 0.0);
        assert_eq!(percentile(&[7.0], 95.0), 7.0);
    }

    #[test]
    fn test_failure_classification() {
        assert!(!sample(Step::PlaceOrder, 1.0, Some(201)).failed());
        assert!(sample(Step::PlaceOrder, 1.0, Some(404)).failed());
        assert!(sample(Step::ListProducts, 1.0, None).failed());
        // 3xx is not a failure but also not a passing check
        let redirect = sample(Step::ListProducts, 1.0, Some(302));
        assert!(!redirect.failed());
        assert!(!redirect.check_passed());
    }

    #[test]
    fn test_summary_evaluates_thresholds() {
        let profile = LoadProfile::stress_test();
        let mut recorder = LoadRecorder::new();

        for _ in 0..18 {
            recorder.record(&sample(Step::ListProducts, 100.0, Some(200)));
        }
        recorder.record(&sample(Step::PlaceOrder, 3000.0, Some(500)));
        recorder.record(&sample(Step::PlaceOrder, 3000.0, Some(201)));
        recorder.record_iteration();
        recorder.observe_vus(4);
        recorder.observe_vus(2);

        let summary = recorder.summarize(&profile, Duration::from_secs(10), false);

        assert_eq!(summary.requests, 20);
        assert_eq!(summary.failed_requests, 1);
        assert!((summary.failed_rate - 0.05).abs() < 1e-9);
        assert_eq!(summary.peak_vus, 4);
        assert_eq!(summary.requests_per_sec, 2.0);

        // 5% failed is not below 5%; p95 is pulled up by the slow orders.
        assert!(!summary.thresholds[0].passed);
        assert!(!summary.thresholds[1].passed);
        assert!(!summary.passed);

        let orders = summary.checks.iter().find(|c| c.name == "order 200/201").unwrap();
        assert_eq!((orders.passes, orders.fails), (1, 1));
    }

    #[test]
    fn test_empty_run_passes() {
        let summary = LoadRecorder::new().summarize(&LoadProfile::hpa_trigger(), Duration::ZERO, true);
        assert!(summary.passed);
        assert!(summary.cancelled);
        assert_eq!(summary.requests_per_sec, 0.0);
    }
}
