//! Service container for the front-ends.

use shopwatch_core::{DashboardModel, ShopwatchConfig};

use crate::{DashboardService, LoadService, RefreshSchedule};

/// Everything a front-end needs to drive the dashboard and launch load runs.
pub struct Services {
    pub dashboard: DashboardService,
    pub load: LoadService,
    pub config: ShopwatchConfig,
}

impl Services {
    pub fn new(config: ShopwatchConfig) -> Self {
        Self {
            dashboard: DashboardService::new(&config.api),
            load: LoadService::new(),
            config,
        }
    }

    /// A fresh dashboard model pointed at the configured API base.
    pub fn dashboard_model(&self) -> DashboardModel {
        DashboardModel::new(self.config.api.base.clone(), self.config.dashboard.clone())
    }

    pub fn refresh_schedule(&self) -> RefreshSchedule {
        RefreshSchedule::new(self.config.dashboard.refresh_interval(), std::time::Instant::now())
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::new(ShopwatchConfig::default())
    }
}
