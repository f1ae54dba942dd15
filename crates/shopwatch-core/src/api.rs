//! Wire types of the shop API.
//!
//! The server is loose about types (counters come back as numbers, numeric
//! strings or `"N/A"`, optional fields go missing), so most fields default.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductList {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub total_views: Option<MetricValue>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub total_price: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderHistory {
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub postgresql: String,
    #[serde(default)]
    pub redis: String,
    #[serde(default)]
    pub api: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

impl HealthStatus {
    pub fn postgres_connected(&self) -> bool {
        self.postgresql == "connected"
    }
}

/// A counter as reported by `/metrics/summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl MetricValue {
    /// Numeric reading; text that does not parse (e.g. `"N/A"`) is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Int(v) => Some(*v as f64),
            MetricValue::Float(v) => Some(*v),
            MetricValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Int(v) => write!(f, "{}", v),
            MetricValue::Float(v) => write!(f, "{}", v),
            MetricValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    #[serde(default)]
    pub total_orders_db: Option<MetricValue>,
    #[serde(default)]
    pub total_revenue: Option<MetricValue>,
    #[serde(default)]
    pub redis_product_views: Option<MetricValue>,
    #[serde(default)]
    pub confirmed_orders: Option<MetricValue>,
    #[serde(default)]
    pub redis_order_count: Option<MetricValue>,
    #[serde(default)]
    pub db_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub product_id: i64,
    pub quantity: u32,
    pub customer_email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub total_price: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
}

/// Builds the message for a non-2xx response body: the server's `detail`
/// string when present, otherwise the JSON re-serialized, otherwise the raw
/// text.
pub fn error_message_from_body(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };

    match value.get("detail").and_then(|d| d.as_str()) {
        Some(detail) if !detail.is_empty() => detail.to_string(),
        _ => value.to_string(),
    }
}
