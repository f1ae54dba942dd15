//! Load profiles: staged virtual-user ramps, the per-iteration workload and
//! the pass/fail thresholds evaluated over a run.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Result, ShopwatchError};

pub const HPA_TRIGGER_BASE: &str = "http://192.168.174.10:30080";
pub const STRESS_TEST_BASE: &str = "http://192.168.174.20:30080";

/// Ramp from the previous stage's target to `target` over `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub target: u32,
}

impl Stage {
    pub fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metric", rename_all = "snake_case")]
pub enum Threshold {
    /// Share of failed requests must stay below `max_rate`.
    HttpReqFailed { max_rate: f64 },
    /// The given latency percentile must stay below `max_ms`.
    HttpReqDuration { percentile: f64, max_ms: f64 },
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::HttpReqFailed { max_rate } => write!(f, "http_req_failed rate<{}", max_rate),
            Threshold::HttpReqDuration { percentile, max_ms } => {
                write!(f, "http_req_duration p({})<{}", percentile, max_ms)
            }
        }
    }
}

/// One HTTP step of an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ListProducts,
    PlaceOrder,
}

impl Step {
    pub fn label(&self) -> &'static str {
        match self {
            Step::ListProducts => "GET /products",
            Step::PlaceOrder => "POST /orders",
        }
    }

    pub fn check_name(&self) -> &'static str {
        match self {
            Step::ListProducts => "products 200",
            Step::PlaceOrder => "order 200/201",
        }
    }

    pub fn check(&self, status: Option<u16>) -> bool {
        match (self, status) {
            (Step::ListProducts, Some(200)) => true,
            (Step::PlaceOrder, Some(200 | 201)) => true,
            _ => false,
        }
    }

    pub fn all() -> &'static [Step] {
        &[Step::ListProducts, Step::PlaceOrder]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    /// Pause after each step.
    #[serde(with = "humantime_serde")]
    pub think_time: Duration,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Orders pick a product id uniformly from `1..=max_product_id`.
    pub max_product_id: i64,
    pub quantity: u32,
    /// Customer email; `{vu}` is replaced by the virtual user number.
    pub email_template: String,
}

impl Workload {
    pub fn email_for(&self, vu: u32) -> String {
        self.email_template.replace("{vu}", &vu.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub base_url: String,
    pub stages: Vec<Stage>,
    pub thresholds: Vec<Threshold>,
    pub workload: Workload,
}

impl LoadProfile {
    /// Moderate ramp meant to push the pod autoscaler over its CPU target.
    pub fn hpa_trigger() -> Self {
        Self {
            name: "hpa-trigger".to_string(),
            description: "Warm up, hold 60 VUs to trigger HPA scale-out, cool down".to_string(),
            base_url: HPA_TRIGGER_BASE.to_string(),
            stages: vec![
                Stage::new(Duration::from_secs(30), 30),
                Stage::new(Duration::from_secs(120), 60),
                Stage::new(Duration::from_secs(30), 0),
            ],
            thresholds: vec![
                Threshold::HttpReqFailed { max_rate: 0.20 },
                Threshold::HttpReqDuration {
                    percentile: 95.0,
                    max_ms: 5000.0,
                },
            ],
            workload: Workload {
                think_time: Duration::from_millis(300),
                request_timeout: Duration::from_secs(10),
                max_product_id: 5,
                quantity: 1,
                email_template: "loadtest{vu}@shopwatch.io".to_string(),
            },
        }
    }

    /// Peak-traffic simulation with strict error and latency budgets.
    pub fn stress_test() -> Self {
        Self {
            name: "stress-test".to_string(),
            description: "Warm up, ramp to 100 VUs of peak traffic, cool down".to_string(),
            base_url: STRESS_TEST_BASE.to_string(),
            stages: vec![
                Stage::new(Duration::from_secs(30), 20),
                Stage::new(Duration::from_secs(120), 100),
                Stage::new(Duration::from_secs(30), 0),
            ],
            thresholds: vec![
                Threshold::HttpReqFailed { max_rate: 0.05 },
                Threshold::HttpReqDuration {
                    percentile: 95.0,
                    max_ms: 2000.0,
                },
            ],
            workload: Workload {
                think_time: Duration::from_millis(500),
                request_timeout: Duration::from_secs(60),
                max_product_id: 5,
                quantity: 1,
                email_template: "loadtest{vu}@shopwatch.io".to_string(),
            },
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let profile: LoadProfile = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ShopwatchError::Profile("base_url is empty".to_string()));
        }
        if self.stages.is_empty() {
            return Err(ShopwatchError::Profile(format!("{}: no stages", self.name)));
        }
        if self.workload.max_product_id < 1 {
            return Err(ShopwatchError::Profile("max_product_id must be at least 1".to_string()));
        }
        if self.workload.quantity == 0 {
            return Err(ShopwatchError::Profile("quantity must be positive".to_string()));
        }
        for threshold in &self.thresholds {
            let valid = match threshold {
                Threshold::HttpReqFailed { max_rate } => (0.0..=1.0).contains(max_rate),
                Threshold::HttpReqDuration { percentile, max_ms } => {
                    *percentile > 0.0 && *percentile <= 100.0 && *max_ms > 0.0
                }
            };
            if !valid {
                return Err(ShopwatchError::Profile(format!("invalid threshold: {}", threshold)));
            }
        }
        Ok(())
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    pub fn peak_target(&self) -> u32 {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    /// Index of the stage running at `elapsed`.
    pub fn stage_at(&self, elapsed: Duration) -> Option<usize> {
        let mut stage_end = Duration::ZERO;
        for (idx, stage) in self.stages.iter().enumerate() {
            stage_end += stage.duration;
            if elapsed < stage_end {
                return Some(idx);
            }
        }
        None
    }

    /// Target VU count at `elapsed`, linearly interpolated inside the current
    /// stage from the previous target (0 before the first stage). `None` once
    /// all stages are over.
    pub fn target_at(&self, elapsed: Duration) -> Option<u32> {
        let mut stage_start = Duration::ZERO;
        let mut from = 0u32;

        for stage in &self.stages {
            let stage_end = stage_start + stage.duration;
            if elapsed < stage_end {
                let progress = (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64();
                let span = stage.target as f64 - from as f64;
                return Some((from as f64 + span * progress).round().max(0.0) as u32);
            }
            stage_start = stage_end;
            from = stage.target;
        }
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinProfile {
    HpaTrigger,
    StressTest,
}

impl BuiltinProfile {
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinProfile::HpaTrigger => "hpa-trigger",
            BuiltinProfile::StressTest => "stress-test",
        }
    }

    pub fn profile(&self) -> LoadProfile {
        match self {
            BuiltinProfile::HpaTrigger => LoadProfile::hpa_trigger(),
            BuiltinProfile::StressTest => LoadProfile::stress_test(),
        }
    }

    pub fn all() -> &'static [BuiltinProfile] {
        &[BuiltinProfile::HpaTrigger, BuiltinProfile::StressTest]
    }
}

impl FromStr for BuiltinProfile {
    type Err = ShopwatchError;

    fn from_str(s: &str) -> Result<Self> {
        BuiltinProfile::all()
            .iter()
            .copied()
            .find(|p| p.name() == s.trim())
            .ok_or_else(|| ShopwatchError::Profile(format!("unknown profile: {}", s)))
    }
}
