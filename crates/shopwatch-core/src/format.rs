//! Display helpers shared by every front-end.

/// Formats an amount in won: `19980.0` -> `19,980원`. Fractions round to the
/// nearest won.
pub fn format_won(amount: f64) -> String {
    let rounded = if amount.is_finite() { amount.round() as i64 } else { 0 };
    format!("{}원", group_thousands(rounded))
}

pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// First 8 characters of an id followed by an ellipsis.
pub fn short_id(id: &str) -> String {
    let head: String = id.chars().take(8).collect();
    format!("{}…", head)
}

/// `YYYY-MM-DD HH:MM` prefix of a server timestamp; empty when absent.
pub fn short_timestamp(ts: Option<&str>) -> String {
    ts.unwrap_or_default().chars().take(16).collect()
}

/// Stock fill level as a whole percentage of `max_stock`, capped at 100.
pub fn stock_percent(stock: i64, max_stock: i64) -> u8 {
    if max_stock <= 0 || stock <= 0 {
        return 0;
    }
    let pct = (stock as f64 / max_stock as f64 * 100.0).round();
    pct.min(100.0) as u8
}

pub fn is_low_stock(stock: i64, threshold: i64) -> bool {
    stock < threshold
}
