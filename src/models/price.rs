use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateSource {
    Coingecko,
    ExchangeRateApi,
    /// Last known live rate, served while providers are failing.
    Cache,
    Fallback,
}

/// INR→USDT conversion factor: USDT received per rupee.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateQuote {
    pub rate: f64,
    pub source: RateSource,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    pub inr_amount: String,
    pub usdt_amount: String,
    pub rate: f64,
    pub rate_text: String,
}
