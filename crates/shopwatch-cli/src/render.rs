use std::fmt::Write as _;

use clap::ValueEnum;
use shopwatch_core::dashboard::{
    Badge, BadgeColor, ConnectionStatus, HealthPanel, MetricsPanel, OrderResult, OrderTable,
    ProductsView, TableRow, Toast,
};
use shopwatch_core::{LoadProfile, LoadSummary, ServiceInfo, ToastKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

fn badge(b: &Badge) -> String {
    let marker = match b.color {
        BadgeColor::Green => "●",
        BadgeColor::Red => "✖",
        BadgeColor::Blue => "◆",
        BadgeColor::Muted => "·",
    };
    format!("{} {}", marker, b.text)
}

pub fn health_lines(health: &HealthPanel, api_base: &str) -> Vec<String> {
    let dot = match health.status {
        ConnectionStatus::Online => "🟢",
        ConnectionStatus::Offline => "🔴",
        ConnectionStatus::Unknown => "⚪",
    };
    vec![
        format!("{} {}  ({})", dot, health.status_text, api_base),
        format!("  PostgreSQL:  {}", badge(&health.postgres_badge)),
        format!("  API:         {}", badge(&health.api_badge)),
        format!("  DB status:   {}", health.postgres_metric),
        format!("  {}", health.redis_label),
    ]
}

pub fn metrics_lines(metrics: &MetricsPanel) -> Vec<String> {
    vec![
        format!("  Orders:        {}", metrics.orders),
        format!("  Revenue:       {}", metrics.revenue),
        format!("  Product views: {}", metrics.product_views),
    ]
}

/// Column-aligned rendering of `table`. A spanning row is printed once,
/// across the whole width.
pub fn table_lines(table: &OrderTable) -> Vec<String> {
    let headers = table.headers();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &table.rows {
        if let TableRow::Cells(cells) = row {
            for (w, cell) in widths.iter_mut().zip(cells) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let total: usize = widths.iter().map(|w| w + 2).sum::<usize>() + 1;
    let mut lines = vec![
        aligned_row(headers.iter().copied(), &widths),
        format!("{:-<width$}", "", width = total),
    ];

    for row in &table.rows {
        match row {
            TableRow::Cells(cells) => lines.push(aligned_row(cells.iter().map(String::as_str), &widths)),
            TableRow::Span { text, .. } => lines.push(format!("  {}", text)),
        }
    }
    lines
}

fn aligned_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let mut line = String::from(" ");
    for (cell, width) in cells.zip(widths) {
        let pad = width.saturating_sub(cell.chars().count());
        let _ = write!(line, " {}{} ", cell, " ".repeat(pad));
    }
    line.trim_end().to_string()
}

pub fn products_lines(view: &ProductsView, is_selected: impl Fn(i64) -> bool) -> Vec<String> {
    match view {
        ProductsView::Idle => vec![],
        ProductsView::Loading => vec!["  Loading...".to_string()],
        ProductsView::Failed { message, url } => {
            vec![format!("  ❌ {}", message), format!("     {}", url)]
        }
        ProductsView::Loaded(cards) if cards.is_empty() => vec!["  No products.".to_string()],
        ProductsView::Loaded(cards) => cards
            .iter()
            .map(|card| {
                let filled = card.stock_percent as usize / 10;
                format!(
                    "{} #{:<3} {:<24} {:>12}  stock {:>4} [{}{}] {:>3}%{}",
                    if is_selected(card.product.id) { "▶" } else { " " },
                    card.product.id,
                    card.product.name,
                    card.price_label,
                    card.product.stock,
                    "█".repeat(filled),
                    "░".repeat(10 - filled),
                    card.stock_percent,
                    if card.low_stock { "  ⚠ low stock" } else { "" }
                )
            })
            .collect(),
    }
}

pub fn order_result_lines(result: &OrderResult) -> Vec<String> {
    match result {
        OrderResult::Hidden => vec![],
        OrderResult::Pending => vec!["  ⏳ Processing order...".to_string()],
        OrderResult::Placed(c) => vec![
            "  ✅ Order placed".to_string(),
            format!("  Order ID: {}", c.short_order_id),
            format!("  Product:  {}", c.product),
            format!("  Total:    {}", c.total_label),
            format!("  Status:   {}", badge(&c.status_badge)),
            format!("  Source:   {}", badge(&c.source_badge)),
        ],
        OrderResult::Failed(message) => vec![format!("  ❌ Order failed: {}", message)],
    }
}

pub fn toast_line(toast: &Toast) -> String {
    let prefix = match toast.kind {
        ToastKind::Info => "ℹ",
        ToastKind::Success => "✔",
        ToastKind::Warning => "!",
    };
    format!("[{}] {}", prefix, toast.message)
}

pub fn service_info_lines(info: &ServiceInfo) -> Vec<String> {
    let mut lines = vec![format!("  Service: {} v{}", info.service, info.version)];
    for (name, route) in &info.endpoints {
        lines.push(format!("    {:<12} {}", name, route));
    }
    lines
}

pub fn profile_lines(profile: &LoadProfile) -> Vec<String> {
    let mut lines = vec![
        format!("{}  ({})", profile.name, profile.description),
        format!("  target:    {}", profile.base_url),
    ];
    let stages: Vec<String> = profile
        .stages
        .iter()
        .map(|s| format!("{}s→{}", s.duration.as_secs(), s.target))
        .collect();
    lines.push(format!("  stages:    {}", stages.join(", ")));
    let thresholds: Vec<String> = profile.thresholds.iter().map(|t| t.to_string()).collect();
    lines.push(format!("  thresholds: {}", thresholds.join(", ")));
    lines.push(format!(
        "  think:     {}ms, timeout {}s",
        profile.workload.think_time.as_millis(),
        profile.workload.request_timeout.as_secs()
    ));
    lines
}

pub fn summary_csv(summary: &LoadSummary) -> String {
    let l = &summary.latency;
    let rows: Vec<(&str, String)> = vec![
        ("profile", summary.profile.clone()),
        ("base_url", summary.base_url.clone()),
        ("duration_ms", format!("{:.0}", summary.duration_ms)),
        ("iterations", summary.iterations.to_string()),
        ("requests", summary.requests.to_string()),
        ("failed_requests", summary.failed_requests.to_string()),
        ("failed_rate", format!("{:.4}", summary.failed_rate)),
        ("requests_per_sec", format!("{:.2}", summary.requests_per_sec)),
        ("avg_ms", format!("{:.2}", l.avg_ms)),
        ("min_ms", format!("{:.2}", l.min_ms)),
        ("max_ms", format!("{:.2}", l.max_ms)),
        ("p50_ms", format!("{:.2}", l.p50_ms)),
        ("p90_ms", format!("{:.2}", l.p90_ms)),
        ("p95_ms", format!("{:.2}", l.p95_ms)),
        ("p99_ms", format!("{:.2}", l.p99_ms)),
        ("peak_vus", summary.peak_vus.to_string()),
        ("passed", summary.passed.to_string()),
        ("cancelled", summary.cancelled.to_string()),
    ];

    let mut out = String::from("metric,value\n");
    for (metric, value) in rows {
        let _ = writeln!(out, "{},{}", metric, value);
    }
    out
}

pub fn summary_table(summary: &LoadSummary) -> Vec<String> {
    let l = &summary.latency;
    let mut lines = vec![
        format!("Results: {}{}", summary.profile, if summary.cancelled { " (cancelled)" } else { "" }),
        format!("{:-<48}", ""),
        format!("  Duration:      {:.1} s", summary.duration_ms / 1000.0),
        format!("  Iterations:    {}", summary.iterations),
        format!("  Requests:      {} ({:.2}/s)", summary.requests, summary.requests_per_sec),
        format!(
            "  Failed:        {} ({:.2}%)",
            summary.failed_requests,
            summary.failed_rate * 100.0
        ),
        format!("  Latency avg:   {:.2} ms (min {:.2}, max {:.2})", l.avg_ms, l.min_ms, l.max_ms),
        format!(
            "  Latency p50/p90/p95/p99: {:.2} / {:.2} / {:.2} / {:.2} ms",
            l.p50_ms, l.p90_ms, l.p95_ms, l.p99_ms
        ),
        format!("  Peak VUs:      {}", summary.peak_vus),
        String::new(),
        "Checks:".to_string(),
    ];
    for check in &summary.checks {
        let mark = if check.fails == 0 { "✓" } else { "✗" };
        lines.push(format!("  {} {:<16} {} passed, {} failed", mark, check.name, check.passes, check.fails));
    }
    lines.push(String::new());
    lines.push("Thresholds:".to_string());
    for verdict in &summary.thresholds {
        lines.push(format!(
            "  {} {:<32} observed {:.4}",
            if verdict.passed { "✓" } else { "✗" },
            verdict.threshold.to_string(),
            verdict.observed
        ));
    }
    lines
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}
