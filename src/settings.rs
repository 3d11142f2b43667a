use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub listen: String,
    pub uploads_dir: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceProviders {
    pub coingecko_url: String,
    pub exchange_rate_url: String,
    pub request_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub refresh_interval_secs: u64,
    pub fallback_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Razorpay {
    pub key_id: String,
    pub key_secret: String,
}

/// Delays are in milliseconds, success rates are probabilities in `[0, 1]`.
#[derive(Debug, Clone, Deserialize)]
pub struct Simulation {
    pub kyc_delay_ms: u64,
    pub kyc_success_rate: f64,
    pub settlement_delay_ms: u64,
    pub settlement_success_rate: f64,
    pub transfer_delay_ms: u64,
    pub transfer_success_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub price_providers: PriceProviders,
    pub razorpay: Razorpay,
    pub simulation: Simulation,
}

impl Settings {
    /// Loads `path` (optional) on top of the built-in defaults, then applies
    /// `ENKRYPT__SECTION__KEY` environment overrides.
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let config = Self::defaults()?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("ENKRYPT").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.listen", "0.0.0.0:3000")?
            .set_default("server.uploads_dir", "uploads")?
            .set_default("server.max_upload_bytes", 5 * 1024 * 1024)?
            .set_default("price_providers.coingecko_url", "https://api.coingecko.com")?
            .set_default(
                "price_providers.exchange_rate_url",
                "https://api.exchangerate-api.com",
            )?
            .set_default("price_providers.request_timeout_secs", 10)?
            .set_default("price_providers.cache_ttl_secs", 60)?
            .set_default("price_providers.refresh_interval_secs", 300)?
            .set_default("price_providers.fallback_rate", 0.012)?
            .set_default("razorpay.key_id", "rzp_test_1234567890")?
            .set_default("razorpay.key_secret", "test_secret_key")?
            .set_default("simulation.kyc_delay_ms", 2000)?
            .set_default("simulation.kyc_success_rate", 0.7)?
            .set_default("simulation.settlement_delay_ms", 1000)?
            .set_default("simulation.settlement_success_rate", 0.9)?
            .set_default("simulation.transfer_delay_ms", 3000)?
            .set_default("simulation.transfer_success_rate", 0.95)
    }
}

#[cfg(test)]
impl Settings {
    /// Instant, deterministic simulators and unreachable price providers.
    pub fn for_tests(success_rate: f64, uploads_dir: &str) -> Self {
        Settings {
            server: Server {
                listen: "127.0.0.1:0".to_string(),
                uploads_dir: uploads_dir.to_string(),
                max_upload_bytes: 5 * 1024 * 1024,
            },
            price_providers: PriceProviders {
                coingecko_url: "http://127.0.0.1:9".to_string(),
                exchange_rate_url: "http://127.0.0.1:9".to_string(),
                request_timeout_secs: 1,
                cache_ttl_secs: 60,
                refresh_interval_secs: 300,
                fallback_rate: 0.012,
            },
            razorpay: Razorpay {
                key_id: "rzp_test_1234567890".to_string(),
                key_secret: "test_secret_key".to_string(),
            },
            simulation: Simulation {
                kyc_delay_ms: 0,
                kyc_success_rate: success_rate,
                settlement_delay_ms: 0,
                settlement_success_rate: success_rate,
                transfer_delay_ms: 0,
                transfer_success_rate: success_rate,
            },
        }
    }
}
