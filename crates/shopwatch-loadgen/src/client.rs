use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use shopwatch_core::api::error_message_from_body;
use shopwatch_core::{
    ApiConfig, HealthStatus, MetricsSummary, Order, OrderHistory, OrderReceipt, OrderRequest,
    Product, ProductList, Result, ServiceInfo, ShopwatchError,
};
use tracing::{debug, instrument};

/// Client for the shop API. Every call carries its own timeout; order
/// placement uses the longer order timeout.
#[derive(Debug, Clone)]
pub struct ShopApiClient {
    base: String,
    client: reqwest::Client,
    timeout: Duration,
    order_timeout: Duration,
}

/// Raw outcome of a load-test request: status and timing, body discarded.
#[derive(Debug, Clone)]
pub struct Probe {
    pub status: Option<u16>,
    pub latency: Duration,
    pub error: Option<String>,
}

impl ShopApiClient {
    pub fn new(base: &str) -> Self {
        Self::with_http(reqwest::Client::new(), base, &ApiConfig::default())
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::with_http(reqwest::Client::new(), &config.base, config)
    }

    /// Shares `client`'s connection pool; `base` overrides `config.base`.
    pub fn with_http(client: reqwest::Client, base: &str, config: &ApiConfig) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            client,
            timeout: config.timeout(),
            order_timeout: config.order_timeout(),
        }
    }

    /// Same pool and timeouts, different API base.
    pub fn with_base(&self, base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            ..self.clone()
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn docs_url(&self) -> String {
        self.url("/docs")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    #[instrument(skip(self), fields(base = %self.base))]
    pub async fn health(&self) -> Result<HealthStatus> {
        self.get_json("/health").await
    }

    #[instrument(skip(self), fields(base = %self.base))]
    pub async fn metrics_summary(&self) -> Result<MetricsSummary> {
        self.get_json("/metrics/summary").await
    }

    #[instrument(skip(self), fields(base = %self.base))]
    pub async fn products(&self) -> Result<Vec<Product>> {
        let list: ProductList = self.get_json("/products").await?;
        Ok(list.products)
    }

    #[instrument(skip(self), fields(base = %self.base))]
    pub async fn order_history(&self, limit: u32) -> Result<Vec<Order>> {
        let history: OrderHistory = self
            .get_json(&format!("/orders/history?limit={}", limit))
            .await?;
        Ok(history.orders)
    }

    #[instrument(skip(self), fields(base = %self.base))]
    pub async fn service_info(&self) -> Result<ServiceInfo> {
        self.get_json("/").await
    }

    #[instrument(skip(self, request), fields(base = %self.base, product_id = request.product_id))]
    pub async fn place_order(&self, request: &OrderRequest) -> Result<OrderReceipt> {
        let resp = self
            .client
            .post(self.url("/orders"))
            .json(request)
            .timeout(self.order_timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.order_timeout))?;

        decode(resp, self.order_timeout).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("GET {}", path);
        let resp = self
            .client
            .get(self.url(path))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        decode(resp, self.timeout).await
    }

    pub async fn probe_products(&self, timeout: Duration) -> Probe {
        self.probe(self.client.get(self.url("/products")), timeout).await
    }

    pub async fn probe_order(&self, request: &OrderRequest, timeout: Duration) -> Probe {
        self.probe(self.client.post(self.url("/orders")).json(request), timeout)
            .await
    }

    async fn probe(&self, builder: reqwest::RequestBuilder, timeout: Duration) -> Probe {
        let start = Instant::now();

        let resp = match builder.timeout(timeout).send().await {
            Ok(resp) => resp,
            Err(e) => {
                return Probe {
                    status: None,
                    latency: start.elapsed(),
                    error: Some(map_reqwest_error(e, timeout).to_string()),
                }
            }
        };

        let status = resp.status().as_u16();
        let error = resp
            .bytes()
            .await
            .err()
            .map(|e| map_reqwest_error(e, timeout).to_string());

        Probe {
            status: Some(status),
            latency: start.elapsed(),
            error,
        }
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response, timeout: Duration) -> Result<T> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| map_reqwest_error(e, timeout))?;

    if !status.is_success() {
        return Err(ShopwatchError::Api {
            status: status.as_u16(),
            message: error_message_from_body(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        let head: String = body.chars().take(500).collect();
        ShopwatchError::Decode(format!("{} - Body: {}", e, head))
    })
}

fn map_reqwest_error(e: reqwest::Error, timeout: Duration) -> ShopwatchError {
    if e.is_timeout() {
        return ShopwatchError::Timeout(timeout.as_millis() as u64);
    }
    ShopwatchError::Network(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ShopApiClient {
        ShopApiClient::new(&server.uri())
    }

    #[tokio::test]
    async fn test_health_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "api": "healthy",
                "postgresql": "connected",
                "redis": "ok",
                "version": "3.0.0"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let health = client_for(&server).health().await.unwrap();
        assert!(health.postgres_connected());
        assert_eq!(health.redis, "ok");
        assert_eq!(health.version.as_deref(), Some("3.0.0"));
    }

    #[tokio::test]
    async fn test_history_passes_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orders/history"))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "orders": [{
                    "id": "9f1c2d3e-aaaa", "email": "a@b.c", "product": "Widget",
                    "quantity": 2, "total_price": 19980, "status": "confirmed",
                    "created_at": "2025-05-01 10:11:12"
                }],
                "count": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let orders = client_for(&server).order_history(50).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].total_price, 19980.0);
    }

    #[tokio::test]
    async fn test_place_order_posts_exact_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(body_json(json!({"product_id": 3, "quantity": 2, "customer_email": "test@x.com"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "order_id": "abc12345-0000-0000",
                "product": "Widget",
                "total_price": 19980,
                "status": "completed",
                "source": "api"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = client_for(&server)
            .place_order(&OrderRequest {
                product_id: 3,
                quantity: 2,
                customer_email: "test@x.com".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(receipt.product, "Widget");
        assert_eq!(receipt.total_price, 19980.0);
        assert_eq!(receipt.source, "api");
    }

    #[tokio::test]
    async fn test_error_detail_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": "insufficient stock"})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .place_order(&OrderRequest {
                product_id: 1,
                quantity: 999,
                customer_email: "a@b.c".to_string(),
            })
            .await
            .unwrap_err();

        match err {
            ShopwatchError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "insufficient stock");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_without_json_body_uses_raw_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = client_for(&server).products().await.unwrap_err();
        assert_eq!(err.ui_message(), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"postgresql": "connected", "redis": "ok"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let config = ApiConfig {
            base: server.uri(),
            timeout_ms: 100,
            order_timeout_ms: 100,
        };
        let err = ShopApiClient::from_config(&config).health().await.unwrap_err();
        assert!(matches!(err, ShopwatchError::Timeout(100)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let err = ShopApiClient::new("http://127.0.0.1:1").health().await.unwrap_err();
        assert!(err.is_connection_failure());
    }

    #[tokio::test]
    async fn test_garbage_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/metrics/summary"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).metrics_summary().await.unwrap_err();
        assert!(matches!(err, ShopwatchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_probe_reports_status_and_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let probe = client_for(&server)
            .probe_products(Duration::from_secs(1))
            .await;
        assert_eq!(probe.status, Some(503));

        let probe = ShopApiClient::new("http://127.0.0.1:1")
            .probe_products(Duration::from_secs(1))
            .await;
        assert_eq!(probe.status, None);
        assert!(probe.error.is_some());
    }
}
