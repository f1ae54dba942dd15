use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Instant;

use shopwatch_core::{ApiConfig, DashboardEvent, DashboardModel, Effect, Fetch};
use shopwatch_loadgen::ShopApiClient;
use tokio::runtime::Runtime;
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{debug, error, info, instrument};

use crate::schedule::RefreshSchedule;

/// Performs `fetch` against its own base and reports every outcome on `tx`.
///
/// A dashboard fetch reports health first; metrics and recent orders are only
/// requested when health succeeded, and then concurrently.
#[instrument(skip_all, fields(view = ?fetch.ticket().view, generation = fetch.ticket().generation, base = %fetch.base()))]
pub async fn run_fetch(client: &ShopApiClient, fetch: Fetch, tx: &Sender<DashboardEvent>) {
    let client = client.with_base(fetch.base());
    let generation = fetch.ticket().generation;
    let send = |event: DashboardEvent| {
        if tx.send(event).is_err() {
            debug!("Dashboard receiver dropped");
        }
    };

    match fetch {
        Fetch::Dashboard { recent_limit, .. } => {
            let health = client.health().await.map_err(|e| e.ui_message());
            let online = health.is_ok();
            send(DashboardEvent::Health {
                generation,
                result: health,
            });
            if !online {
                debug!("Health failed, skipping metrics and recent orders");
                return;
            }

            let (metrics, recent) =
                tokio::join!(client.metrics_summary(), client.order_history(recent_limit));
            send(DashboardEvent::Metrics {
                generation,
                result: metrics.map_err(|e| e.ui_message()),
            });
            send(DashboardEvent::RecentOrders {
                generation,
                result: recent.map_err(|e| e.ui_message()),
            });
        }
        Fetch::Products { .. } => {
            send(DashboardEvent::Products {
                generation,
                result: client.products().await.map_err(|e| e.ui_message()),
            });
        }
        Fetch::History { limit, .. } => {
            send(DashboardEvent::History {
                generation,
                result: client.order_history(limit).await.map_err(|e| e.ui_message()),
            });
        }
        Fetch::PlaceOrder { request, .. } => {
            send(DashboardEvent::OrderPlaced {
                generation,
                result: client.place_order(&request).await.map_err(|e| e.ui_message()),
            });
        }
    }
}

/// Runs dashboard fetches on a worker thread with its own tokio runtime.
/// The UI thread dispatches fetches and drains results with [`poll`] each
/// frame; it never blocks.
///
/// [`poll`]: DashboardService::poll
pub struct DashboardService {
    fetches: tokio_mpsc::UnboundedSender<Fetch>,
    events: Receiver<DashboardEvent>,
}

impl DashboardService {
    pub fn new(api: &ApiConfig) -> Self {
        let (fetch_tx, mut fetch_rx) = tokio_mpsc::unbounded_channel::<Fetch>();
        let (event_tx, event_rx) = channel();
        let client = ShopApiClient::from_config(api);

        thread::spawn(move || {
            let rt = match Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    error!("Failed to create tokio runtime: {}", e);
                    return;
                }
            };

            rt.block_on(async move {
                while let Some(fetch) = fetch_rx.recv().await {
                    let client = client.clone();
                    let tx = event_tx.clone();
                    tokio::spawn(async move {
                        run_fetch(&client, fetch, &tx).await;
                    });
                }
                info!("Dashboard service stopped");
            });
        });

        Self {
            fetches: fetch_tx,
            events: event_rx,
        }
    }

    pub fn dispatch(&self, fetch: Fetch) {
        debug!(view = ?fetch.ticket().view, base = %fetch.base(), "Dispatching fetch");
        if self.fetches.send(fetch).is_err() {
            error!("Dashboard worker is gone, fetch dropped");
        }
    }

    pub fn dispatch_opt(&self, fetch: Option<Fetch>) {
        if let Some(fetch) = fetch {
            self.dispatch(fetch);
        }
    }

    /// Applies every pending response to `model` and carries out the
    /// resulting effects. Returns the number of responses drained.
    pub fn poll(&self, model: &mut DashboardModel, schedule: &mut RefreshSchedule) -> usize {
        let mut drained = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    drained += 1;
                    for effect in model.apply(event) {
                        self.perform(effect, schedule);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    error!("Dashboard worker disconnected");
                    break;
                }
            }
        }
        drained
    }

    fn perform(&self, effect: Effect, schedule: &mut RefreshSchedule) {
        match effect {
            Effect::Fetch(fetch) => self.dispatch(fetch),
            Effect::RefreshDashboardAfter(delay) => schedule.refresh_after(delay, Instant::now()),
        }
    }

    /// Issues a dashboard reload when the schedule says one is due.
    pub fn tick(&self, model: &mut DashboardModel, schedule: &mut RefreshSchedule) -> bool {
        if !schedule.due(Instant::now()) {
            return false;
        }
        debug!("Scheduled dashboard refresh");
        self.dispatch(model.load_dashboard());
        true
    }
}
