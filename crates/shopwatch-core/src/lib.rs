// Domain modules
pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod metrics;
pub mod profile;

pub use api::{
    HealthStatus, MetricValue, MetricsSummary, Order, OrderHistory, OrderReceipt, OrderRequest,
    Product, ProductList, ServiceInfo,
};
pub use config::{ApiConfig, DashboardConfig, ShopwatchConfig, DEFAULT_API_BASE};
pub use dashboard::{
    ConnectionStatus, DashboardEvent, DashboardModel, Effect, Fetch, Tab, Ticket, ToastKind, View,
};
pub use error::{Result, ShopwatchError};
pub use metrics::{
    CheckTally, LatencyStats, LoadRecorder, LoadSummary, RequestSample, ThresholdVerdict,
};
pub use profile::{BuiltinProfile, LoadProfile, Stage, Step, Threshold, Workload};
