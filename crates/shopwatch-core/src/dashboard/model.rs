use std::time::Duration;

use tracing::debug;

use super::generation::{Generations, Ticket, View};
use super::tab::Tab;
use super::toast::{Toast, ToastKind};
use super::views::{
    history_cells, recent_order_cells, Badge, BadgeColor, ConnectionStatus, HealthPanel,
    MetricsPanel, OrderConfirmation, OrderForm, OrderResult, OrderTable, ProductCard,
    ProductsView, SpanKind, HISTORY_COLUMNS, RECENT_ORDER_COLUMNS,
};
use crate::api::{HealthStatus, MetricValue, MetricsSummary, Order, OrderReceipt, OrderRequest, Product};
use crate::config::DashboardConfig;
use crate::format::format_won;

/// A request the model wants performed. The caller executes it against
/// `base` and feeds the outcome back through [`DashboardModel::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch {
    /// `/health`, then (only on success) `/metrics/summary` and
    /// `/orders/history?limit=recent_limit`.
    Dashboard {
        ticket: Ticket,
        base: String,
        recent_limit: u32,
    },
    Products {
        ticket: Ticket,
        base: String,
    },
    History {
        ticket: Ticket,
        base: String,
        limit: u32,
    },
    PlaceOrder {
        ticket: Ticket,
        base: String,
        request: OrderRequest,
    },
}

impl Fetch {
    pub fn ticket(&self) -> Ticket {
        match self {
            Fetch::Dashboard { ticket, .. }
            | Fetch::Products { ticket, .. }
            | Fetch::History { ticket, .. }
            | Fetch::PlaceOrder { ticket, .. } => *ticket,
        }
    }

    pub fn base(&self) -> &str {
        match self {
            Fetch::Dashboard { base, .. }
            | Fetch::Products { base, .. }
            | Fetch::History { base, .. }
            | Fetch::PlaceOrder { base, .. } => base,
        }
    }
}

/// Outcome of one API call, tagged with the generation of the fetch that
/// issued it. Errors are the UI message of the failure.
#[derive(Debug, Clone)]
pub enum DashboardEvent {
    Health {
        generation: u64,
        result: Result<HealthStatus, String>,
    },
    Metrics {
        generation: u64,
        result: Result<MetricsSummary, String>,
    },
    RecentOrders {
        generation: u64,
        result: Result<Vec<Order>, String>,
    },
    Products {
        generation: u64,
        result: Result<Vec<Product>, String>,
    },
    History {
        generation: u64,
        result: Result<Vec<Order>, String>,
    },
    OrderPlaced {
        generation: u64,
        result: Result<OrderReceipt, String>,
    },
}

impl DashboardEvent {
    pub fn view(&self) -> View {
        match self {
            DashboardEvent::Health { .. }
            | DashboardEvent::Metrics { .. }
            | DashboardEvent::RecentOrders { .. } => View::Dashboard,
            DashboardEvent::Products { .. } => View::Products,
            DashboardEvent::History { .. } => View::History,
            DashboardEvent::OrderPlaced { .. } => View::Order,
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            DashboardEvent::Health { generation, .. }
            | DashboardEvent::Metrics { generation, .. }
            | DashboardEvent::RecentOrders { generation, .. }
            | DashboardEvent::Products { generation, .. }
            | DashboardEvent::History { generation, .. }
            | DashboardEvent::OrderPlaced { generation, .. } => *generation,
        }
    }
}

/// Follow-up work produced by applying an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Fetch(Fetch),
    RefreshDashboardAfter(Duration),
}

/// State of the four-tab dashboard.
#[derive(Debug, Clone)]
pub struct DashboardModel {
    active_tab: Tab,
    api_base: String,
    config: DashboardConfig,
    generations: Generations,
    selected_product: Option<Product>,
    toast: Option<Toast>,

    pub health: HealthPanel,
    pub metrics: MetricsPanel,
    pub recent_orders: OrderTable,
    pub products: ProductsView,
    pub order_form: OrderForm,
    pub order_result: OrderResult,
    pub history: OrderTable,
    /// Contents of the API address editor.
    pub api_host_input: String,
}

impl DashboardModel {
    pub fn new(api_base: impl Into<String>, config: DashboardConfig) -> Self {
        let api_base = api_base.into();
        let mut recent_orders = OrderTable::new(RECENT_ORDER_COLUMNS);
        recent_orders.set_span("Loading...", SpanKind::Loading);

        Self {
            active_tab: Tab::Dashboard,
            api_host_input: api_base.clone(),
            api_base,
            config,
            generations: Generations::new(),
            selected_product: None,
            toast: None,
            health: HealthPanel::default(),
            metrics: MetricsPanel::default(),
            recent_orders,
            products: ProductsView::Idle,
            order_form: OrderForm::default(),
            order_result: OrderResult::Hidden,
            history: OrderTable::new(HISTORY_COLUMNS),
        }
    }

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn selected_product(&self) -> Option<&Product> {
        self.selected_product.as_ref()
    }

    /// The toast, while it is still on screen.
    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref().filter(|t| t.is_visible())
    }

    pub fn docs_url(&self) -> String {
        format!("{}/docs", self.api_base)
    }

    pub fn notify(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.toast = Some(Toast::new(message, kind, self.config.toast_duration()));
    }

    // --- Tab state machine ---

    /// Activates `tab`; returns the load the activation triggers.
    pub fn show_tab(&mut self, tab: Tab) -> Option<Fetch> {
        self.active_tab = tab;
        match tab {
            Tab::Dashboard => Some(self.load_dashboard()),
            Tab::Products => Some(self.load_products()),
            Tab::History => Some(self.load_history()),
            Tab::Infra => None,
        }
    }

    // --- Loads ---

    pub fn load_dashboard(&mut self) -> Fetch {
        Fetch::Dashboard {
            ticket: self.generations.issue(View::Dashboard),
            base: self.api_base.clone(),
            recent_limit: self.config.recent_orders_limit,
        }
    }

    pub fn load_products(&mut self) -> Fetch {
        self.products = ProductsView::Loading;
        Fetch::Products {
            ticket: self.generations.issue(View::Products),
            base: self.api_base.clone(),
        }
    }

    pub fn load_history(&mut self) -> Fetch {
        self.history.set_span("Loading...", SpanKind::Loading);
        Fetch::History {
            ticket: self.generations.issue(View::History),
            base: self.api_base.clone(),
            limit: self.config.history_limit,
        }
    }

    // --- Ordering ---

    /// Selects a product from the current listing. Unknown ids are ignored.
    pub fn select_product(&mut self, product_id: i64) -> bool {
        let Some(card) = self
            .products
            .cards()
            .iter()
            .find(|c| c.product.id == product_id)
        else {
            return false;
        };
        self.selected_product = Some(card.product.clone());
        true
    }

    pub fn is_selected(&self, product_id: i64) -> bool {
        self.selected_product
            .as_ref()
            .is_some_and(|p| p.id == product_id)
    }

    /// `<name> · <price>` of the selection, empty when nothing is selected.
    pub fn selected_label(&self) -> String {
        self.selected_product
            .as_ref()
            .map(|p| format!("{} · {}", p.name, format_won(p.price)))
            .unwrap_or_default()
    }

    /// Builds the order request from the form. Without a selection this only
    /// raises a warning and no request is made.
    pub fn place_order(&mut self) -> Option<Fetch> {
        let Some(product) = &self.selected_product else {
            self.notify("⚠️ Select a product first", ToastKind::Warning);
            return None;
        };

        let request = OrderRequest {
            product_id: product.id,
            quantity: self.order_form.parsed_quantity(),
            customer_email: self
                .order_form
                .email_or(&self.config.default_email)
                .to_string(),
        };

        self.order_result = OrderResult::Pending;
        Some(Fetch::PlaceOrder {
            ticket: self.generations.issue(View::Order),
            base: self.api_base.clone(),
            request,
        })
    }

    // --- Runtime reconfiguration ---

    /// Points the dashboard at a new API base. Returns the dashboard reload,
    /// plus the active tab's reload when that tab has its own data. Everything
    /// in flight against the old base is invalidated, and views waiting on it
    /// are settled.
    pub fn update_api_host(&mut self, input: &str) -> Vec<Fetch> {
        let base = input.trim().trim_end_matches('/');
        if base.is_empty() {
            self.notify("⚠️ API address must not be empty", ToastKind::Warning);
            return Vec::new();
        }

        self.api_base = base.to_string();
        self.api_host_input = self.api_base.clone();
        self.generations.invalidate_all();
        self.settle_invalidated();
        self.notify(format!("API address changed: {}", self.api_base), ToastKind::Info);

        let mut fetches = vec![self.load_dashboard()];
        match self.active_tab {
            Tab::Products => fetches.push(self.load_products()),
            Tab::History => fetches.push(self.load_history()),
            Tab::Dashboard | Tab::Infra => {}
        }
        fetches
    }

    /// Views still waiting on a request whose response will now be dropped.
    fn settle_invalidated(&mut self) {
        if self.order_result == OrderResult::Pending {
            self.order_result =
                OrderResult::Failed("API address changed; order result unknown".to_string());
        }
        if self.products == ProductsView::Loading {
            self.products = ProductsView::Idle;
        }
        if self.history.is_loading() {
            self.history.rows.clear();
        }
    }

    // --- Responses ---

    /// Applies a response. Responses from superseded requests are dropped.
    pub fn apply(&mut self, event: DashboardEvent) -> Vec<Effect> {
        let view = event.view();
        let generation = event.generation();
        if !self.generations.is_current(view, generation) {
            debug!(
                ?view,
                generation,
                current = self.generations.current(view),
                "Dropping stale response"
            );
            return Vec::new();
        }

        match event {
            DashboardEvent::Health { result, .. } => {
                self.apply_health(result);
                Vec::new()
            }
            DashboardEvent::Metrics { result, .. } => {
                match result {
                    Ok(summary) => self.apply_metrics(&summary),
                    Err(e) => debug!("Metrics unavailable: {}", e),
                }
                Vec::new()
            }
            DashboardEvent::RecentOrders { result, .. } => {
                match result {
                    Ok(orders) if orders.is_empty() => self.recent_orders.set_span(
                        "No orders yet. Place the first one from the Products tab!",
                        SpanKind::Empty,
                    ),
                    Ok(orders) => self
                        .recent_orders
                        .set_rows(orders.iter().map(recent_order_cells).collect()),
                    Err(e) => debug!("Recent orders unavailable: {}", e),
                }
                Vec::new()
            }
            DashboardEvent::Products { result, .. } => {
                self.apply_products(result);
                Vec::new()
            }
            DashboardEvent::History { result, .. } => {
                match result {
                    Ok(orders) if orders.is_empty() => {
                        self.history.set_span("No order history.", SpanKind::Empty)
                    }
                    Ok(orders) => self
                        .history
                        .set_rows(orders.iter().map(history_cells).collect()),
                    Err(e) => self
                        .history
                        .set_span(format!("API connection failed: {}", e), SpanKind::Error),
                }
                Vec::new()
            }
            DashboardEvent::OrderPlaced { result, .. } => self.apply_order(result),
        }
    }

    fn apply_health(&mut self, result: Result<HealthStatus, String>) {
        let health = match result {
            Ok(h) => h,
            Err(e) => {
                debug!("Health check failed: {}", e);
                self.health.status = ConnectionStatus::Offline;
                self.health.status_text = "API connection failed".to_string();
                self.health.postgres_metric = "❌ offline".to_string();
                return;
            }
        };

        let connected = health.postgres_connected();
        self.health.status = ConnectionStatus::Online;
        self.health.status_text = format!("API OK ({})", if connected { "PG ✓" } else { "PG ✗" });
        if connected {
            self.health.postgres_badge = Badge::new("connected", BadgeColor::Green);
            self.health.postgres_metric = "✅ Connected".to_string();
        } else {
            self.health.postgres_badge = Badge::new(or_question(&health.postgresql), BadgeColor::Red);
            self.health.postgres_metric = format!("❌ {}", health.postgresql);
        }
        self.health.api_badge = Badge::new("Running", BadgeColor::Green);
        self.health.redis_label = format!("Redis: {}", or_question(&health.redis));
    }

    fn apply_metrics(&mut self, summary: &MetricsSummary) {
        self.metrics.orders = display_or_dash(summary.total_orders_db.as_ref());
        self.metrics.revenue = match summary.total_revenue.as_ref().and_then(MetricValue::as_f64) {
            Some(v) if v != 0.0 => format_won(v),
            _ => "—".to_string(),
        };
        self.metrics.product_views = display_or_dash(summary.redis_product_views.as_ref());
    }

    fn apply_products(&mut self, result: Result<Vec<Product>, String>) {
        let products = match result {
            Ok(p) => p,
            Err(e) => {
                self.products = ProductsView::Failed {
                    message: format!("API connection failed: {}", e),
                    url: format!("{}/products", self.api_base),
                };
                return;
            }
        };

        // Keep the selection pointing at a product of the current listing.
        if let Some(selected) = &self.selected_product {
            self.selected_product = products.iter().find(|p| p.id == selected.id).cloned();
        }

        let cards = products
            .into_iter()
            .map(|p| ProductCard::new(p, self.config.max_stock, self.config.low_stock_threshold))
            .collect();
        self.products = ProductsView::Loaded(cards);
    }

    fn apply_order(&mut self, result: Result<OrderReceipt, String>) -> Vec<Effect> {
        match result {
            Ok(receipt) => {
                self.order_result = OrderResult::Placed(OrderConfirmation::from(&receipt));
                self.notify("✅ Order placed!", ToastKind::Success);
                vec![
                    Effect::Fetch(self.load_products()),
                    Effect::RefreshDashboardAfter(self.config.post_order_refresh()),
                ]
            }
            Err(message) => {
                self.order_result = OrderResult::Failed(message);
                Vec::new()
            }
        }
    }
}

fn or_question(value: &str) -> &str {
    if value.is_empty() {
        "?"
    } else {
        value
    }
}

fn display_or_dash(value: Option<&MetricValue>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "—".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::views::TableRow;

    fn model() -> DashboardModel {
        DashboardModel::new("http://api.test", DashboardConfig::default())
    }

    fn widget(id: i64, stock: i64) -> Product {
        Product {
            id,
            name: "Widget".to_string(),
            price: 9990.0,
            stock,
        }
    }

    fn loaded(model: &mut DashboardModel, products: Vec<Product>) {
        let Fetch::Products { ticket, .. } = model.load_products() else {
            unreachable!()
        };
        model.apply(DashboardEvent::Products {
            generation: ticket.generation,
            result: Ok(products),
        });
    }

    fn health(pg: &str, redis: &str) -> HealthStatus {
        HealthStatus {
            postgresql: pg.to_string(),
            redis: redis.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_show_tab_triggers_matching_load() {
        let mut m = model();
        assert!(matches!(m.show_tab(Tab::Products), Some(Fetch::Products { .. })));
        assert_eq!(m.active_tab(), Tab::Products);
        assert!(matches!(m.show_tab(Tab::History), Some(Fetch::History { limit: 50, .. })));
        assert!(m.show_tab(Tab::Infra).is_none());
        assert_eq!(m.active_tab(), Tab::Infra);
        assert!(matches!(
            m.show_tab(Tab::Dashboard),
            Some(Fetch::Dashboard { recent_limit: 5, .. })
        ));
    }

    #[test]
    fn test_healthy_postgres_shows_check_mark() {
        let mut m = model();
        let fetch = m.load_dashboard();
        m.apply(DashboardEvent::Health {
            generation: fetch.ticket().generation,
            result: Ok(health("connected", "ok")),
        });

        assert_eq!(m.health.status, ConnectionStatus::Online);
        assert!(m.health.status_text.contains("PG ✓"));
        assert_eq!(m.health.postgres_badge, Badge::new("connected", BadgeColor::Green));
        assert_eq!(m.health.redis_label, "Redis: ok");
    }

    #[test]
    fn test_unhealthy_postgres_shows_literal_value() {
        let mut m = model();
        let fetch = m.load_dashboard();
        m.apply(DashboardEvent::Health {
            generation: fetch.ticket().generation,
            result: Ok(health("error: timeout", "")),
        });

        assert_eq!(m.health.status, ConnectionStatus::Online);
        assert!(m.health.status_text.contains("PG ✗"));
        assert_eq!(m.health.postgres_badge, Badge::new("error: timeout", BadgeColor::Red));
        assert_eq!(m.health.postgres_metric, "❌ error: timeout");
        assert_eq!(m.health.redis_label, "Redis: ?");
    }

    #[test]
    fn test_health_failure_marks_offline() {
        let mut m = model();
        let fetch = m.load_dashboard();
        m.apply(DashboardEvent::Health {
            generation: fetch.ticket().generation,
            result: Err("connection refused".to_string()),
        });

        assert_eq!(m.health.status, ConnectionStatus::Offline);
        assert_eq!(m.health.postgres_metric, "❌ offline");
    }

    #[test]
    fn test_metrics_failure_keeps_previous_values() {
        let mut m = model();
        let gen = m.load_dashboard().ticket().generation;
        m.apply(DashboardEvent::Metrics {
            generation: gen,
            result: Ok(MetricsSummary {
                total_orders_db: Some(MetricValue::Int(12)),
                total_revenue: Some(MetricValue::Int(19980)),
                redis_product_views: None,
                ..Default::default()
            }),
        });
        m.apply(DashboardEvent::Metrics {
            generation: gen,
            result: Err("timeout".to_string()),
        });

        assert_eq!(m.metrics.orders, "12");
        assert_eq!(m.metrics.revenue, "19,980원");
        assert_eq!(m.metrics.product_views, "—");
    }

    #[test]
    fn test_zero_revenue_shows_dash() {
        let mut m = model();
        let gen = m.load_dashboard().ticket().generation;
        m.apply(DashboardEvent::Metrics {
            generation: gen,
            result: Ok(MetricsSummary {
                total_revenue: Some(MetricValue::Int(0)),
                ..Default::default()
            }),
        });
        assert_eq!(m.metrics.revenue, "—");
    }

    #[test]
    fn test_products_render_cards() {
        let mut m = model();
        loaded(&mut m, vec![widget(1, 10), widget(2, 300), widget(3, 150)]);

        let cards = m.products.cards();
        assert_eq!(cards.len(), 3);
        assert_eq!(
            cards.iter().map(|c| (c.stock_percent, c.low_stock)).collect::<Vec<_>>(),
            vec![(3, true), (100, false), (50, false)]
        );
    }

    #[test]
    fn test_products_failure_shows_url() {
        let mut m = model();
        let gen = m.load_products().ticket().generation;
        m.apply(DashboardEvent::Products {
            generation: gen,
            result: Err("Connection failed: refused".to_string()),
        });

        let ProductsView::Failed { message, url } = &m.products else {
            panic!("expected failure view");
        };
        assert!(message.starts_with("API connection failed: "));
        assert_eq!(url, "http://api.test/products");
    }

    #[test]
    fn test_place_order_without_selection_warns_and_issues_nothing() {
        let mut m = model();
        assert!(m.place_order().is_none());

        let toast = m.toast().expect("warning toast");
        assert_eq!(toast.kind, ToastKind::Warning);
        assert_eq!(m.order_result, OrderResult::Hidden);
    }

    #[test]
    fn test_place_order_builds_request() {
        let mut m = model();
        loaded(&mut m, vec![widget(3, 100)]);
        assert!(m.select_product(3));
        assert!(m.is_selected(3));
        assert_eq!(m.selected_label(), "Widget · 9,990원");

        m.order_form.quantity = "2".to_string();
        m.order_form.email = "test@x.com".to_string();

        let Some(Fetch::PlaceOrder { request, base, .. }) = m.place_order() else {
            panic!("expected order fetch");
        };
        assert_eq!(base, "http://api.test");
        assert_eq!(
            request,
            OrderRequest {
                product_id: 3,
                quantity: 2,
                customer_email: "test@x.com".to_string(),
            }
        );
        assert_eq!(m.order_result, OrderResult::Pending);
    }

    #[test]
    fn test_order_success_renders_confirmation_and_refreshes() {
        let mut m = model();
        loaded(&mut m, vec![widget(3, 100)]);
        m.select_product(3);
        let gen = m.place_order().unwrap().ticket().generation;

        let effects = m.apply(DashboardEvent::OrderPlaced {
            generation: gen,
            result: Ok(OrderReceipt {
                order_id: "abc12345-ffff".to_string(),
                product: "Widget".to_string(),
                quantity: Some(2),
                total_price: 19980.0,
                status: "completed".to_string(),
                source: "api".to_string(),
            }),
        });

        let OrderResult::Placed(confirmation) = &m.order_result else {
            panic!("expected confirmation");
        };
        assert_eq!(confirmation.short_order_id, "abc12345…");
        assert_eq!(confirmation.product, "Widget");
        assert_eq!(confirmation.total_label, "19,980원");
        assert_eq!(confirmation.status_badge, Badge::new("completed", BadgeColor::Green));
        assert_eq!(confirmation.source_badge, Badge::new("api", BadgeColor::Blue));

        assert_eq!(effects.len(), 2);
        assert!(matches!(effects[0], Effect::Fetch(Fetch::Products { .. })));
        assert_eq!(effects[1], Effect::RefreshDashboardAfter(Duration::from_secs(1)));
    }

    #[test]
    fn test_order_failure_is_inline() {
        let mut m = model();
        loaded(&mut m, vec![widget(3, 100)]);
        m.select_product(3);
        let gen = m.place_order().unwrap().ticket().generation;

        let effects = m.apply(DashboardEvent::OrderPlaced {
            generation: gen,
            result: Err("insufficient stock".to_string()),
        });

        assert!(effects.is_empty());
        assert_eq!(m.order_result, OrderResult::Failed("insufficient stock".to_string()));
    }

    #[test]
    fn test_empty_history_renders_single_placeholder() {
        let mut m = model();
        let gen = m.load_history().ticket().generation;
        m.apply(DashboardEvent::History {
            generation: gen,
            result: Ok(vec![]),
        });

        assert_eq!(m.history.rows.len(), 1);
        assert!(matches!(
            &m.history.rows[0],
            TableRow::Span { colspan: HISTORY_COLUMNS, kind: SpanKind::Empty, .. }
        ));
    }

    #[test]
    fn test_history_rows_have_seven_cells() {
        let mut m = model();
        let gen = m.load_history().ticket().generation;
        m.apply(DashboardEvent::History {
            generation: gen,
            result: Ok(vec![Order {
                id: "0123456789".to_string(),
                email: "a@b.c".to_string(),
                product: "Widget".to_string(),
                quantity: 2,
                total_price: 19980.0,
                status: "confirmed".to_string(),
                created_at: Some("2025-05-01 10:11:12.000".to_string()),
                source: None,
            }]),
        });

        let TableRow::Cells(cells) = &m.history.rows[0] else {
            panic!("expected cells");
        };
        assert_eq!(
            cells,
            &vec![
                "01234567…".to_string(),
                "a@b.c".to_string(),
                "Widget".to_string(),
                "2".to_string(),
                "19,980원".to_string(),
                "confirmed".to_string(),
                "2025-05-01 10:11".to_string(),
            ]
        );
    }

    #[test]
    fn test_stale_response_does_not_overwrite_newer() {
        let mut m = model();
        let old = m.load_products().ticket().generation;
        let new = m.load_products().ticket().generation;

        m.apply(DashboardEvent::Products {
            generation: new,
            result: Ok(vec![widget(1, 100)]),
        });
        m.apply(DashboardEvent::Products {
            generation: old,
            result: Err("timeout".to_string()),
        });

        assert_eq!(m.products.cards().len(), 1);
    }

    #[test]
    fn test_reload_drops_vanished_selection() {
        let mut m = model();
        loaded(&mut m, vec![widget(1, 100), widget(2, 100)]);
        m.select_product(2);
        loaded(&mut m, vec![widget(1, 100)]);

        assert!(m.selected_product().is_none());
    }

    #[test]
    fn test_select_unknown_product_is_ignored() {
        let mut m = model();
        loaded(&mut m, vec![widget(1, 100)]);
        assert!(!m.select_product(9));
        assert!(m.selected_product().is_none());
    }

    #[test]
    fn test_update_api_host_redirects_and_invalidates() {
        let mut m = model();
        let old_products = m.load_products().ticket().generation;

        let fetches = m.update_api_host(" http://new.test/ ");
        assert_eq!(fetches.len(), 1);
        let Fetch::Dashboard { base, .. } = &fetches[0] else {
            panic!("expected dashboard reload");
        };
        assert_eq!(base, "http://new.test");
        assert_eq!(m.api_base(), "http://new.test");
        assert_eq!(m.docs_url(), "http://new.test/docs");

        // Late response from the old base is ignored, and the view is not
        // left waiting for it.
        m.apply(DashboardEvent::Products {
            generation: old_products,
            result: Ok(vec![widget(1, 100)]),
        });
        assert_eq!(m.products, ProductsView::Idle);

        for tab in [Tab::Products, Tab::History, Tab::Dashboard] {
            assert_eq!(m.show_tab(tab).unwrap().base(), "http://new.test");
        }
    }

    #[test]
    fn test_host_change_during_order_settles_result() {
        let mut m = model();
        loaded(&mut m, vec![widget(3, 100)]);
        m.select_product(3);
        let old_order = m.place_order().unwrap().ticket().generation;

        m.update_api_host("http://new.test");
        m.apply(DashboardEvent::OrderPlaced {
            generation: old_order,
            result: Ok(OrderReceipt {
                order_id: "abc12345-ffff".to_string(),
                product: "Widget".to_string(),
                total_price: 9990.0,
                status: "completed".to_string(),
                source: "api".to_string(),
                ..Default::default()
            }),
        });

        assert_eq!(
            m.order_result,
            OrderResult::Failed("API address changed; order result unknown".to_string())
        );
        // A new order can be placed against the new base.
        let Some(Fetch::PlaceOrder { base, .. }) = m.place_order() else {
            panic!("expected order fetch");
        };
        assert_eq!(base, "http://new.test");
        assert_eq!(m.order_result, OrderResult::Pending);
    }

    #[test]
    fn test_host_change_reloads_active_tab() {
        let mut m = model();
        m.show_tab(Tab::History);
        let old_history = m.load_history().ticket().generation;

        let fetches = m.update_api_host("http://new.test");
        assert_eq!(fetches.len(), 2);
        assert!(matches!(fetches[0], Fetch::Dashboard { .. }));
        let Fetch::History { ticket, base, .. } = &fetches[1] else {
            panic!("expected history reload");
        };
        assert_eq!(base, "http://new.test");

        m.apply(DashboardEvent::History {
            generation: old_history,
            result: Ok(vec![]),
        });
        assert!(m.history.is_loading());

        m.apply(DashboardEvent::History {
            generation: ticket.generation,
            result: Ok(vec![]),
        });
        assert!(matches!(
            &m.history.rows[0],
            TableRow::Span { kind: SpanKind::Empty, .. }
        ));
    }

    #[test]
    fn test_host_change_clears_loading_history_off_tab() {
        let mut m = model();
        m.load_history();
        assert!(m.history.is_loading());

        assert_eq!(m.update_api_host("http://new.test").len(), 1);
        assert!(m.history.rows.is_empty());
    }

    #[test]
    fn test_empty_api_host_rejected() {
        let mut m = model();
        assert!(m.update_api_host("   ").is_empty());
        assert_eq!(m.api_base(), "http://api.test");
        assert_eq!(m.toast().unwrap().kind, ToastKind::Warning);
    }
}
