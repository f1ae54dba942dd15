mod generation;
mod model;
mod tab;
mod toast;
mod views;

pub use generation::{Generations, Ticket, View};
pub use model::{DashboardEvent, DashboardModel, Effect, Fetch};
pub use tab::Tab;
pub use toast::{Toast, ToastKind};
pub use views::{
    history_cells, recent_order_cells, Badge, BadgeColor, ConnectionStatus, HealthPanel,
    MetricsPanel, OrderConfirmation, OrderForm, OrderResult, OrderTable, ProductCard,
    ProductsView, SpanKind, TableRow, HISTORY_COLUMNS, RECENT_ORDER_COLUMNS,
};
