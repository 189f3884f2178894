// src/format.rs
//! Display formatting for prices, market caps and percentages.
//!
//! None of these functions fail: missing, zero or non-finite input renders as
//! `$0`, `0%` or `0`.

use serde::{Deserialize, Serialize};

const TRILLION: f64 = 1e12;
const BILLION: f64 = 1e9;
const MILLION: f64 = 1e6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Currency,
    Percent,
    Number,
}

pub fn format_value(value: Option<f64>, kind: FormatKind) -> String {
    let value = value.unwrap_or(0.0);
    match kind {
        FormatKind::Currency => format_currency(value),
        FormatKind::Percent => format_percent(value),
        FormatKind::Number => format_number(value),
    }
}

/// `$1.32T`, `$35.00B`, `$12.50M`, `$67,500.00`, `$3.14`, `$0.000123`.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "$0".to_string();
    }
    if value < 0.0 {
        return format!("-{}", format_currency(-value));
    }

    // Tiers below a million print cents, so compare what will be printed.
    let cents = (value * 100.0).round() / 100.0;
    if value >= TRILLION {
        format!("${:.2}T", value / TRILLION)
    } else if value >= BILLION {
        format!("${:.2}B", value / BILLION)
    } else if cents >= MILLION {
        format!("${:.2}M", value / MILLION)
    } else if cents >= 1000.0 {
        format!("${}", group_thousands(value, 2))
    } else if value >= 1.0 {
        format!("${:.2}", value)
    } else {
        format!("${:.6}", value)
    }
}

/// Headline aggregates always carry a suffix, falling through to millions.
pub fn format_compact_currency(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "$0".to_string();
    }
    if value >= TRILLION {
        format!("${:.2}T", value / TRILLION)
    } else if value >= BILLION {
        format!("${:.2}B", value / BILLION)
    } else {
        format!("${:.2}M", value / MILLION)
    }
}

pub fn format_percent(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "0%".to_string();
    }
    format!("{:.2}%", value)
}

/// Like [`format_percent`] but with a leading `+` on gains.
pub fn format_signed_percent(value: f64) -> String {
    let formatted = format_percent(value);
    if value.is_finite() && value > 0.0 {
        format!("+{}", formatted)
    } else {
        formatted
    }
}

pub fn format_number(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "0".to_string();
    }
    let decimals = if value.fract() == 0.0 { 0 } else { 2 };
    let grouped = group_thousands(value.abs(), decimals);
    if value < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn group_thousands(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value);
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3 + 4);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}
