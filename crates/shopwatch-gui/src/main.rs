mod app;
mod panels;

use std::path::PathBuf;

use app::ShopwatchApp;
use eframe::egui;
use shopwatch_services::ShopwatchConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const APP_ID: &str = "Shopwatch";
/// Overrides where the GUI writes its daily log files.
const ENV_LOG_DIR: &str = "SHOPWATCH_LOG_DIR";
const LOG_PREFIX: &str = "shopwatch-gui.log";
const DEFAULT_FILTER: &str = "shopwatch_gui=info,shopwatch_services=debug,shopwatch_core=info";

fn log_dir() -> PathBuf {
    std::env::var_os(ENV_LOG_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}

/// Logs to stdout and to a daily file. The returned guard flushes the file
/// writer on drop, so it must live until the window closes.
fn init_tracing() -> WorkerGuard {
    let dir = log_dir();
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, LOG_PREFIX));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();

    tracing::debug!(dir = %dir.display(), "File logging enabled");
    guard
}

fn load_config() -> ShopwatchConfig {
    ShopwatchConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Bad SHOPWATCH_* override, using defaults");
        ShopwatchConfig::default()
    })
}

fn main() -> eframe::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let config = load_config();
    tracing::info!(
        api = %config.api.base,
        timeout_ms = config.api.timeout_ms,
        "Opening dashboard"
    );

    let viewport = egui::ViewportBuilder::default()
        .with_title(APP_ID)
        .with_inner_size([1200.0, 800.0])
        .with_min_inner_size([800.0, 600.0]);

    eframe::run_native(
        APP_ID,
        eframe::NativeOptions {
            viewport,
            ..Default::default()
        },
        Box::new(move |cc| Ok(Box::new(ShopwatchApp::new(cc, config)))),
    )
}
