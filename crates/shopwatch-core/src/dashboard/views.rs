use crate::api::{Order, OrderReceipt, Product};
use crate::format::{format_won, is_low_stock, short_id, short_timestamp, stock_percent};

pub const RECENT_ORDER_COLUMNS: usize = 6;
pub const HISTORY_COLUMNS: usize = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BadgeColor {
    Green,
    Red,
    Blue,
    Muted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub text: String,
    pub color: BadgeColor,
}

impl Badge {
    pub fn new(text: impl Into<String>, color: BadgeColor) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }

    pub fn unknown() -> Self {
        Self::new("—", BadgeColor::Muted)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Unknown,
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthPanel {
    pub status: ConnectionStatus,
    pub status_text: String,
    pub postgres_badge: Badge,
    pub api_badge: Badge,
    pub postgres_metric: String,
    pub redis_label: String,
}

impl Default for HealthPanel {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Unknown,
            status_text: "Connecting...".to_string(),
            postgres_badge: Badge::unknown(),
            api_badge: Badge::unknown(),
            postgres_metric: "—".to_string(),
            redis_label: "Redis: —".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsPanel {
    pub orders: String,
    pub revenue: String,
    pub product_views: String,
}

impl Default for MetricsPanel {
    fn default() -> Self {
        Self {
            orders: "—".to_string(),
            revenue: "—".to_string(),
            product_views: "—".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpanKind {
    Loading,
    Empty,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRow {
    Cells(Vec<String>),
    /// One cell spanning `colspan` columns (loading, empty or error notice).
    Span {
        text: String,
        colspan: usize,
        kind: SpanKind,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTable {
    pub columns: usize,
    pub rows: Vec<TableRow>,
}

impl OrderTable {
    pub fn new(columns: usize) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn set_span(&mut self, text: impl Into<String>, kind: SpanKind) {
        self.rows = vec![TableRow::Span {
            text: text.into(),
            colspan: self.columns,
            kind,
        }];
    }

    pub fn set_rows(&mut self, rows: Vec<Vec<String>>) {
        self.rows = rows.into_iter().map(TableRow::Cells).collect();
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.rows.as_slice(),
            [TableRow::Span {
                kind: SpanKind::Loading,
                ..
            }]
        )
    }

    pub fn headers(&self) -> &'static [&'static str] {
        match self.columns {
            RECENT_ORDER_COLUMNS => &["Order ID", "Email", "Product", "Total", "Status", "Created"],
            _ => &["Order ID", "Email", "Product", "Qty", "Total", "Status", "Created"],
        }
    }
}

pub fn recent_order_cells(order: &Order) -> Vec<String> {
    vec![
        short_id(&order.id),
        order.email.clone(),
        order.product.clone(),
        format_won(order.total_price),
        order.status.clone(),
        short_timestamp(order.created_at.as_deref()),
    ]
}

pub fn history_cells(order: &Order) -> Vec<String> {
    vec![
        short_id(&order.id),
        order.email.clone(),
        order.product.clone(),
        order.quantity.to_string(),
        format_won(order.total_price),
        order.status.clone(),
        short_timestamp(order.created_at.as_deref()),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductCard {
    pub product: Product,
    pub price_label: String,
    pub stock_percent: u8,
    pub low_stock: bool,
}

impl ProductCard {
    pub fn new(product: Product, max_stock: i64, low_stock_threshold: i64) -> Self {
        Self {
            price_label: format_won(product.price),
            stock_percent: stock_percent(product.stock, max_stock),
            low_stock: is_low_stock(product.stock, low_stock_threshold),
            product,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ProductsView {
    #[default]
    Idle,
    Loading,
    Loaded(Vec<ProductCard>),
    Failed {
        message: String,
        url: String,
    },
}

impl ProductsView {
    pub fn cards(&self) -> &[ProductCard] {
        match self {
            ProductsView::Loaded(cards) => cards,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    pub short_order_id: String,
    pub product: String,
    pub total_label: String,
    pub status_badge: Badge,
    pub source_badge: Badge,
}

impl From<&OrderReceipt> for OrderConfirmation {
    fn from(receipt: &OrderReceipt) -> Self {
        Self {
            short_order_id: short_id(&receipt.order_id),
            product: receipt.product.clone(),
            total_label: format_won(receipt.total_price),
            status_badge: Badge::new(receipt.status.clone(), BadgeColor::Green),
            source_badge: Badge::new(receipt.source.clone(), BadgeColor::Blue),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OrderResult {
    #[default]
    Hidden,
    Pending,
    Placed(OrderConfirmation),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderForm {
    pub quantity: String,
    pub email: String,
}

impl Default for OrderForm {
    fn default() -> Self {
        Self {
            quantity: "1".to_string(),
            email: String::new(),
        }
    }
}

impl OrderForm {
    /// Leading integer of the quantity input; anything non-positive is 1.
    pub fn parsed_quantity(&self) -> u32 {
        let digits: String = self
            .quantity
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        match digits.parse::<u32>() {
            Ok(q) if q > 0 => q,
            _ => 1,
        }
    }

    pub fn email_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        let email = self.email.trim();
        if email.is_empty() {
            fallback
        } else {
            email
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64) -> Product {
        Product {
            id: 1,
            name: "Widget".to_string(),
            price: 9990.0,
            stock,
        }
    }

    #[test]
    fn test_product_card_low_stock_marker() {
        let low = ProductCard::new(product(29), 300, 30);
        let ok = ProductCard::new(product(30), 300, 30);

        assert!(low.low_stock);
        assert!(!ok.low_stock);
        assert_eq!(ok.stock_percent, 10);
        assert_eq!(ok.price_label, "9,990원");
    }

    #[test]
    fn test_product_card_caps_at_full() {
        assert_eq!(ProductCard::new(product(450), 300, 30).stock_percent, 100);
    }

    #[test]
    fn test_span_row_covers_all_columns() {
        let mut table = OrderTable::new(HISTORY_COLUMNS);
        table.set_span("No orders yet.", SpanKind::Empty);

        assert_eq!(table.rows.len(), 1);
        assert!(matches!(&table.rows[0], TableRow::Span { colspan: 7, .. }));
        assert_eq!(table.headers().len(), HISTORY_COLUMNS);
    }

    #[test]
    fn test_quantity_parsing() {
        let form = |q: &str| OrderForm {
            quantity: q.to_string(),
            email: String::new(),
        };
        assert_eq!(form("2").parsed_quantity(), 2);
        assert_eq!(form("3abc").parsed_quantity(), 3);
        assert_eq!(form("").parsed_quantity(), 1);
        assert_eq!(form("0").parsed_quantity(), 1);
        assert_eq!(form("-4").parsed_quantity(), 1);
    }

    #[test]
    fn test_email_fallback() {
        let form = OrderForm::default();
        assert_eq!(form.email_or("guest@demo.com"), "guest@demo.com");
    }
}
