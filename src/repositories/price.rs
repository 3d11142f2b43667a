use crate::models::price::{RateQuote, RateSource};
use crate::settings::PriceProviders;

use anyhow::{anyhow, bail};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct PriceRepository {
    coingecko_url: String,
    exchange_rate_url: String,
    client: reqwest::Client,
    cache_ttl: chrono::Duration,
    fallback_rate: f64,
    price_cache: Arc<RwLock<Option<RateQuote>>>,
}

impl PriceRepository {
    pub fn new(settings: &PriceProviders) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Self {
            coingecko_url: settings.coingecko_url.trim_end_matches('/').to_string(),
            exchange_rate_url: settings.exchange_rate_url.trim_end_matches('/').to_string(),
            client,
            cache_ttl: chrono::Duration::seconds(settings.cache_ttl_secs as i64),
            fallback_rate: settings.fallback_rate,
            price_cache: Arc::new(RwLock::new(None)),
        })
    }

    /// Current INR→USDT rate. Never fails: when every provider is down the
    /// last live rate is served, or the fallback constant if there is none.
    pub async fn get_rate(&self) -> RateQuote {
        if let Some(quote) = self.get_fresh_quote().await {
            return quote;
        }

        match self.refresh().await {
            Ok(quote) => quote,
            Err(e) => {
                log::warn!("Could not fetch exchange rate: {}", e);
                self.degraded_quote().await
            }
        }
    }

    pub async fn refresh(&self) -> Result<RateQuote, anyhow::Error> {
        let quote = self.fetch_best_rate().await?;

        let mut cache = self.price_cache.write().await;
        *cache = Some(quote.clone());

        Ok(quote)
    }

    pub async fn start_price_fetch_task(&self, every: Duration) {
        let repository = self.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);

            loop {
                interval.tick().await;

                match repository.refresh().await {
                    Ok(quote) => {
                        log::info!("Fetched INR->USDT rate {} from {:?}.", quote.rate, quote.source)
                    }
                    Err(e) => {
                        log::error!("Error updating price cache: {}", e);
                    }
                }
            }
        });

        log::info!("Price fetch task started");
    }

    async fn get_fresh_quote(&self) -> Option<RateQuote> {
        let cache = self.price_cache.read().await;

        cache
            .as_ref()
            .filter(|quote| Utc::now() - quote.fetched_at < self.cache_ttl)
            .cloned()
    }

    async fn degraded_quote(&self) -> RateQuote {
        let cache = self.price_cache.read().await;

        match cache.as_ref() {
            Some(last) => RateQuote {
                source: RateSource::Cache,
                ..last.clone()
            },
            None => RateQuote {
                rate: self.fallback_rate,
                source: RateSource::Fallback,
                fetched_at: Utc::now(),
            },
        }
    }

    async fn fetch_best_rate(&self) -> Result<RateQuote, anyhow::Error> {
        let coingecko_error = match self.fetch_rate_from_coingecko().await {
            Ok(rate) => return Ok(live_quote(rate, RateSource::Coingecko)),
            Err(e) => e,
        };

        match self.fetch_rate_from_exchange_rate_api().await {
            Ok(rate) => Ok(live_quote(rate, RateSource::ExchangeRateApi)),
            Err(e) => Err(anyhow!(
                "all providers failed (coingecko: {}; exchangerate-api: {})",
                coingecko_error,
                e
            )),
        }
    }

    async fn fetch_rate_from_coingecko(&self) -> Result<f64, anyhow::Error> {
        let prices: serde_json::Value = self
            .client
            .get(format!(
                "{}/api/v3/simple/price?ids=tether&vs_currencies=inr",
                self.coingecko_url
            ))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        log::debug!("Fetched prices from Coingecko: {:?}", prices);

        let inr_per_usdt = prices["tether"]["inr"]
            .as_f64()
            .ok_or_else(|| anyhow!("Coingecko: Bad response format."))?;

        invert(inr_per_usdt)
    }

    async fn fetch_rate_from_exchange_rate_api(&self) -> Result<f64, anyhow::Error> {
        let rates: serde_json::Value = self
            .client
            .get(format!("{}/v4/latest/USD", self.exchange_rate_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let inr_per_usd = rates["rates"]["INR"]
            .as_f64()
            .ok_or_else(|| anyhow!("ExchangeRate-API: Bad response format."))?;

        invert(inr_per_usd)
    }
}

#[cfg(test)]
impl PriceRepository {
    pub async fn seed(&self, quote: RateQuote) {
        *self.price_cache.write().await = Some(quote);
    }
}

fn live_quote(rate: f64, source: RateSource) -> RateQuote {
    RateQuote {
        rate,
        source,
        fetched_at: Utc::now(),
    }
}

/// Rupees per unit → units per rupee.
fn invert(price: f64) -> Result<f64, anyhow::Error> {
    if !(price.is_finite() && price > 0.0) {
        bail!("Invalid upstream price: {}", price);
    }

    Ok(1.0 / price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn unreachable_repository() -> PriceRepository {
        let settings = Settings::for_tests(1.0, "uploads");
        PriceRepository::new(&settings.price_providers).unwrap()
    }

    #[test]
    fn inverts_positive_prices_only() {
        assert!((invert(83.5).unwrap() - 0.011976).abs() < 1e-6);
        assert!(invert(0.0).is_err());
        assert!(invert(-2.0).is_err());
        assert!(invert(f64::NAN).is_err());
    }

    #[tokio::test]
    async fn falls_back_to_the_constant_without_providers() {
        let repository = unreachable_repository();

        let quote = repository.get_rate().await;

        assert_eq!(quote.source, RateSource::Fallback);
        assert_eq!(quote.rate, 0.012);
    }

    #[tokio::test]
    async fn serves_fresh_cache_without_fetching() {
        let repository = unreachable_repository();
        repository
            .seed(live_quote(0.0119, RateSource::Coingecko))
            .await;

        let quote = repository.get_rate().await;

        assert_eq!(quote.source, RateSource::Coingecko);
        assert_eq!(quote.rate, 0.0119);
    }

    #[tokio::test]
    async fn serves_last_known_rate_when_cache_is_stale() {
        let repository = unreachable_repository();
        repository
            .seed(RateQuote {
                rate: 0.0118,
                source: RateSource::ExchangeRateApi,
                fetched_at: Utc::now() - chrono::Duration::hours(1),
            })
            .await;

        let quote = repository.get_rate().await;

        assert_eq!(quote.source, RateSource::Cache);
        assert_eq!(quote.rate, 0.0118);
    }
}
