//! Display helpers for dashboard numbers

/// Integer with comma thousands separators, e.g. "-1,234,567"
pub fn format_grouped_int(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let lead = match digits.len() % 3 {
        0 => 3,
        n => n,
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    grouped.push_str(&digits[..lead]);
    for start in (lead..digits.len()).step_by(3) {
        grouped.push(',');
        grouped.push_str(&digits[start..start + 3]);
    }
    grouped
}

/// Two decimals with thousands separators, e.g. "$1,234.50"
pub fn format_money(value: f64, currency_symbol: &str) -> String {
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let whole = format_grouped_int((cents / 100) as i64);
    format!("{sign}{currency_symbol}{whole}.{:02}", cents % 100)
}

/// Scaled to K / M / B with one decimal, e.g. "$1.2M"
pub fn format_compact(value: f64, currency_symbol: &str) -> String {
    let abs = value.abs();
    let sign = if value < 0.0 { "-" } else { "" };
    let (scaled, suffix) = if abs >= 1e9 {
        (abs / 1e9, "B")
    } else if abs >= 1e6 {
        (abs / 1e6, "M")
    } else if abs >= 1e3 {
        (abs / 1e3, "K")
    } else {
        return format!("{sign}{currency_symbol}{abs:.0}");
    };
    format!("{sign}{currency_symbol}{scaled:.1}{suffix}")
}

pub fn format_percent(rate: f64) -> String {
    if rate.is_finite() {
        format!("{rate:.1}%")
    } else {
        "0.0%".to_string()
    }
}

pub fn format_days(days: f64) -> String {
    if days <= 0.0 || !days.is_finite() {
        "-".to_string()
    } else {
        format!("{days:.1} days")
    }
}
