//! INR→USDT conversion and the display formatting around it.

use chrono::{DateTime, Utc};

use super::amount;
use crate::models::price::{RateQuote, RateSource};

/// Shown for empty, invalid, zero or negative input.
pub const ZERO_PLACEHOLDER: &str = "0.00";

/// Shown while no rate is known yet.
pub const LOADING_PLACEHOLDER: &str = "Loading...";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grouping {
    /// `1,234,567`
    Western,
    /// `12,34,567`
    Indian,
}

/// Converts raw user input at `rate` USDT per rupee.
pub fn convert(input: &str, rate: f64) -> String {
    convert_amount(amount::parse(input), rate)
}

pub fn convert_amount(amount: Option<f64>, rate: f64) -> String {
    let amount = match amount {
        Some(amount) if amount > 0.0 => amount,
        _ => return ZERO_PLACEHOLDER.to_string(),
    };

    if rate == 0.0 {
        return LOADING_PLACEHOLDER.to_string();
    }

    // USDT is pegged to USD, so the USD amount is the USDT amount.
    format_amount(amount * rate, 2, 6)
}

/// en-US style number: thousands separators, between `min_fraction` and
/// `max_fraction` decimals.
pub fn format_amount(value: f64, min_fraction: usize, max_fraction: usize) -> String {
    format_grouped(value, min_fraction, max_fraction, Grouping::Western)
}

/// en-IN style rupee amount with two decimals.
pub fn format_inr(value: f64) -> String {
    format_grouped(value, 2, 2, Grouping::Indian)
}

pub fn format_grouped(
    value: f64,
    min_fraction: usize,
    max_fraction: usize,
    grouping: Grouping,
) -> String {
    let rendered = format!("{:.*}", max_fraction, value.abs());
    let (integer, fraction) = rendered.split_once('.').unwrap_or((rendered.as_str(), ""));

    let mut fraction = fraction.trim_end_matches('0').to_string();
    while fraction.len() < min_fraction {
        fraction.push('0');
    }

    let is_zero = rendered.chars().all(|c| c == '0' || c == '.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };
    let integer = group_digits(integer, grouping);

    if fraction.is_empty() {
        format!("{}{}", sign, integer)
    } else {
        format!("{}{}.{}", sign, integer, fraction)
    }
}

fn group_digits(digits: &str, grouping: Grouping) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let step = match grouping {
        Grouping::Western => 3,
        Grouping::Indian => 2,
    };

    let mut groups = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(step);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    groups.push(tail);

    groups.join(",")
}

/// Banner text describing the rate in use.
pub fn rate_text(quote: &RateQuote, now: DateTime<Utc>) -> String {
    let rate = format!("1 INR = ₮{} USDT", format_amount(quote.rate, 2, 6));

    match quote.source {
        RateSource::Fallback => format!("{} (Approximate)", rate),
        _ => format!(
            "{} • Updated {}",
            rate,
            relative_time(quote.fetched_at, now)
        ),
    }
}

pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - then).num_minutes();

    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes == 1 {
        return "1 minute ago".to_string();
    }
    if minutes < 60 {
        return format!("{} minutes ago", minutes);
    }

    let hours = minutes / 60;
    if hours == 1 {
        return "1 hour ago".to_string();
    }
    if hours < 24 {
        return format!("{} hours ago", hours);
    }

    then.format("%-m/%-d/%Y").to_string()
}
