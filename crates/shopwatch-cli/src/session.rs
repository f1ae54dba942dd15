use std::collections::VecDeque;
use std::sync::mpsc::channel;

use anyhow::{bail, Result};
use shopwatch_core::{ConnectionStatus, DashboardConfig, DashboardModel, Effect, Fetch};
use shopwatch_loadgen::ShopApiClient;
use shopwatch_services::run_fetch;
use tracing::debug;

/// A dashboard model driven inline from async code: each fetch is awaited and
/// its responses applied before the call returns.
pub struct Session {
    client: ShopApiClient,
    pub model: DashboardModel,
}

impl Session {
    pub fn new(client: ShopApiClient, config: DashboardConfig) -> Self {
        let model = DashboardModel::new(client.base(), config);
        Self { client, model }
    }

    /// Runs `fetch`. With `follow`, effects it produces run too (a delayed
    /// refresh is awaited rather than scheduled).
    pub async fn run(&mut self, fetches: impl IntoIterator<Item = Fetch>, follow: bool) {
        let mut queue: VecDeque<Fetch> = fetches.into_iter().collect();

        while let Some(fetch) = queue.pop_front() {
            let (tx, rx) = channel();
            run_fetch(&self.client, fetch, &tx).await;
            drop(tx);

            for event in rx {
                for effect in self.model.apply(event) {
                    if !follow {
                        continue;
                    }
                    match effect {
                        Effect::Fetch(next) => queue.push_back(next),
                        Effect::RefreshDashboardAfter(delay) => {
                            debug!(?delay, "Delaying dashboard refresh");
                            tokio::time::sleep(delay).await;
                            queue.push_back(self.model.load_dashboard());
                        }
                    }
                }
            }
        }
    }

    pub async fn dashboard(&mut self) {
        let fetch = self.model.load_dashboard();
        self.run(Some(fetch), false).await;
    }

    pub async fn products(&mut self) {
        let fetch = self.model.load_products();
        self.run(Some(fetch), false).await;
    }

    pub async fn history(&mut self) {
        let fetch = self.model.load_history();
        self.run(Some(fetch), false).await;
    }

    /// Selects `product_id` (loading the listing first if needed) and places
    /// an order with the form's current quantity and email.
    pub async fn order(&mut self, product_id: i64, follow: bool) -> bool {
        if self.model.products.cards().is_empty() {
            self.products().await;
        }
        if !self.model.select_product(product_id) {
            return false;
        }
        let fetch = self.model.place_order();
        self.run(fetch, follow).await;
        true
    }

    pub async fn set_api_host(&mut self, input: &str) {
        let fetches = self.model.update_api_host(input);
        self.run(fetches, false).await;
    }

    /// Fails unless the last health check reached the API.
    pub fn ensure_online(&self) -> Result<()> {
        if self.model.health.status != ConnectionStatus::Online {
            bail!("API at {} is unreachable", self.model.api_base());
        }
        Ok(())
    }
}
