mod render;
mod repl;
mod session;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shopwatch_core::{BuiltinProfile, LoadProfile, ShopwatchConfig};
use shopwatch_loadgen::{LoadEvent, LoadRunner, ShopApiClient};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use render::{print_lines, OutputFormat};
use session::Session;

#[derive(Parser)]
#[command(name = "shopwatch")]
#[command(about = "Shopwatch - shop API dashboard and load runner", long_about = None)]
struct Cli {
    /// API base address
    #[arg(long, global = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show API health, metrics and service info
    Status,

    /// List products with stock levels
    Products,

    /// Show order history
    History {
        /// Number of orders to fetch
        #[arg(short, long, default_value = "50")]
        limit: u32,
    },

    /// Place an order
    Order {
        /// Product ID
        #[arg(short, long)]
        product: i64,

        /// Quantity
        #[arg(short, long, default_value = "1")]
        quantity: String,

        /// Customer email (defaults to the guest address)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Live dashboard, refreshed periodically until Ctrl+C
    Watch {
        /// Refresh interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// List built-in load profiles
    Profiles,

    /// Run a load profile against the API
    Load {
        /// Built-in profile name (hpa-trigger, stress-test)
        #[arg(required_unless_present = "profile_file")]
        profile: Option<String>,

        /// Override the profile's target base address
        #[arg(long)]
        base: Option<String>,

        /// Load a profile definition from a JSON file instead
        #[arg(long)]
        profile_file: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ShopwatchConfig::from_env()?;
    if let Some(base) = cli.api_base {
        config.api.base = base.trim().trim_end_matches('/').to_string();
    }

    match cli.command {
        Some(Commands::Status) => cmd_status(&config).await?,
        Some(Commands::Products) => cmd_products(&config).await?,
        Some(Commands::History { limit }) => cmd_history(&config, limit).await?,
        Some(Commands::Order { product, quantity, email }) => {
            cmd_order(&config, product, &quantity, email.as_deref()).await?
        }
        Some(Commands::Watch { interval }) => {
            let secs = interval.unwrap_or(config.dashboard.refresh_interval_sec);
            cmd_watch(&config, Duration::from_secs(secs.max(1))).await?
        }
        Some(Commands::Profiles) => cmd_profiles(),
        Some(Commands::Load { profile, base, profile_file, output }) => {
            let profile = resolve_profile(profile.as_deref(), profile_file.as_deref(), base.as_deref())?;
            cmd_load(profile, output).await?
        }
        None => repl::run_interactive(&config).await?,
    }

    Ok(())
}

pub fn new_session(config: &ShopwatchConfig) -> Session {
    Session::new(ShopApiClient::from_config(&config.api), config.dashboard.clone())
}

pub async fn cmd_status(config: &ShopwatchConfig) -> Result<()> {
    let mut session = new_session(config);
    session.dashboard().await;

    println!();
    print_lines(&render::health_lines(&session.model.health, session.model.api_base()));
    println!();
    print_lines(&render::metrics_lines(&session.model.metrics));

    match ShopApiClient::from_config(&config.api).service_info().await {
        Ok(info) => {
            println!();
            print_lines(&render::service_info_lines(&info));
        }
        Err(e) => tracing::debug!("Service info unavailable: {}", e),
    }
    println!("  Docs: {}", session.model.docs_url());
    println!();

    session.ensure_online()
}

async fn cmd_products(config: &ShopwatchConfig) -> Result<()> {
    let mut session = new_session(config);
    session.products().await;

    println!();
    println!("Products:");
    print_lines(&render::products_lines(&session.model.products, |_| false));
    println!();
    Ok(())
}

async fn cmd_history(config: &ShopwatchConfig, limit: u32) -> Result<()> {
    let mut config = config.clone();
    config.dashboard.history_limit = limit;
    let mut session = new_session(&config);
    session.history().await;

    println!();
    println!("Order history (latest {}):", limit);
    print_lines(&render::table_lines(&session.model.history));
    println!();
    Ok(())
}

async fn cmd_order(config: &ShopwatchConfig, product: i64, quantity: &str, email: Option<&str>) -> Result<()> {
    let mut session = new_session(config);
    session.model.order_form.quantity = quantity.to_string();
    session.model.order_form.email = email.unwrap_or_default().to_string();

    if !session.order(product, false).await {
        if let shopwatch_core::dashboard::ProductsView::Failed { message, .. } = &session.model.products {
            anyhow::bail!("{}", message);
        }
        anyhow::bail!("Unknown product: {}", product);
    }

    println!();
    print_lines(&render::order_result_lines(&session.model.order_result));
    println!();

    if let shopwatch_core::dashboard::OrderResult::Failed(message) = &session.model.order_result {
        anyhow::bail!("Order failed: {}", message);
    }
    Ok(())
}

async fn cmd_watch(config: &ShopwatchConfig, interval: Duration) -> Result<()> {
    let mut session = new_session(config);

    loop {
        session.dashboard().await;

        print!("\x1B[2J\x1B[1;1H");
        println!("Shopwatch · refreshing every {}s · Ctrl+C to quit", interval.as_secs());
        println!();
        print_lines(&render::health_lines(&session.model.health, session.model.api_base()));
        println!();
        print_lines(&render::metrics_lines(&session.model.metrics));
        println!();
        println!("Recent orders:");
        print_lines(&render::table_lines(&session.model.recent_orders));

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    println!();
    Ok(())
}

pub fn cmd_profiles() {
    println!();
    println!("Load profiles:");
    println!("{:-<60}", "");
    for builtin in BuiltinProfile::all() {
        print_lines(&render::profile_lines(&builtin.profile()));
        println!();
    }
}

pub fn resolve_profile(name: Option<&str>, file: Option<&std::path::Path>, base: Option<&str>) -> Result<LoadProfile> {
    let profile = match (file, name) {
        (Some(path), _) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading profile file {}", path.display()))?;
            LoadProfile::from_json(&json)?
        }
        (None, Some(name)) => name.parse::<BuiltinProfile>()?.profile(),
        (None, None) => anyhow::bail!("No profile given"),
    };

    Ok(match base {
        Some(base) => profile.with_base_url(base),
        None => profile,
    })
}

pub async fn cmd_load(profile: LoadProfile, output: OutputFormat) -> Result<()> {
    let runner = LoadRunner::new();
    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(100);

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let run = runner.run_streaming(&profile, cancel, tx);
    let report = async {
        let mut outcome = None;
        while let Some(event) = rx.recv().await {
            match event {
                LoadEvent::Started { profile, base_url, duration_ms, peak_vus } => eprintln!(
                    "Running {} against {} for {}s (peak {} VUs)...",
                    profile,
                    base_url,
                    duration_ms / 1000,
                    peak_vus
                ),
                LoadEvent::Stage { index, total, target } => {
                    eprintln!("  stage {}/{} → {} VUs", index + 1, total, target)
                }
                LoadEvent::Progress { elapsed_ms, active_vus, requests, failed, .. } => eprintln!(
                    "  {:>5.1}s  vus {:>3}  requests {:>6}  failed {:>5}",
                    elapsed_ms as f64 / 1000.0,
                    active_vus,
                    requests,
                    failed
                ),
                LoadEvent::Done { summary } | LoadEvent::Cancelled { summary } => outcome = Some(Ok(summary)),
                LoadEvent::Error { message } => outcome = Some(Err(message)),
            }
        }
        outcome
    };

    let ((), outcome) = tokio::join!(run, report);
    let summary = match outcome {
        Some(Ok(summary)) => summary,
        Some(Err(message)) => anyhow::bail!("{}", message),
        None => anyhow::bail!("Load run ended without a result"),
    };

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Csv => print!("{}", render::summary_csv(&summary)),
        OutputFormat::Table => {
            println!();
            print_lines(&render::summary_table(&summary));
            println!();
        }
    }

    if !summary.passed {
        anyhow::bail!("Thresholds failed for {}", summary.profile);
    }
    Ok(())
}
