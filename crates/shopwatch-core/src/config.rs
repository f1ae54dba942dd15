use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Result, ShopwatchError};

pub const DEFAULT_API_BASE: &str = "http://192.168.174.20:30080";

pub const ENV_API_BASE: &str = "SHOPWATCH_API_BASE";
pub const ENV_TIMEOUT_MS: &str = "SHOPWATCH_TIMEOUT_MS";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopwatchConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl ShopwatchConfig {
    /// Defaults with `SHOPWATCH_*` environment overrides applied.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(base) = lookup(ENV_API_BASE) {
            let base = base.trim();
            if base.is_empty() {
                return Err(ShopwatchError::Config(format!("{} is empty", ENV_API_BASE)));
            }
            self.api.base = base.to_string();
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            self.api.timeout_ms = raw.trim().parse().map_err(|_| {
                ShopwatchError::Config(format!("{} must be milliseconds, got {:?}", ENV_TIMEOUT_MS, raw))
            })?;
        }

        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base: String,
    pub timeout_ms: u64,
    pub order_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base: DEFAULT_API_BASE.to_string(),
            timeout_ms: 6000,
            order_timeout_ms: 10000,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn order_timeout(&self) -> Duration {
        Duration::from_millis(self.order_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub refresh_interval_sec: u64,
    pub post_order_refresh_ms: u64,
    pub recent_orders_limit: u32,
    pub history_limit: u32,
    pub max_stock: i64,
    pub low_stock_threshold: i64,
    pub toast_ms: u64,
    pub default_email: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_sec: 30,
            post_order_refresh_ms: 1000,
            recent_orders_limit: 5,
            history_limit: 50,
            max_stock: 300,
            low_stock_threshold: 30,
            toast_ms: 3500,
            default_email: "guest@demo.com".to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_sec)
    }

    pub fn post_order_refresh(&self) -> Duration {
        Duration::from_millis(self.post_order_refresh_ms)
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_ms)
    }
}
