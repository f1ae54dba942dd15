mod dashboard_service;
mod load;
mod schedule;
mod services;

pub use dashboard_service::{run_fetch, DashboardService};
pub use load::{LoadRun, LoadService};
pub use schedule::RefreshSchedule;
pub use services::Services;

// Re-export the types front-ends work with, so they only depend on services.
pub use shopwatch_core::{
    dashboard, format, ApiConfig, BuiltinProfile, DashboardConfig, DashboardModel, LoadProfile,
    LoadSummary, ShopwatchConfig, ShopwatchError, Tab, ToastKind,
};
pub use shopwatch_loadgen::{LoadEvent, ShopApiClient};
