use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::price::{Conversion, RateQuote};
use crate::repositories::price::PriceRepository;
use crate::utils::converter;

pub enum PriceRequest {
    GetRate {
        response: oneshot::Sender<Result<RateQuote, ServiceError>>,
    },
    Convert {
        amount: String,
        response: oneshot::Sender<Result<Conversion, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct PriceRequestHandler {
    price_repository: PriceRepository,
}

impl PriceRequestHandler {
    pub fn new(price_repository: PriceRepository) -> Self {
        Self { price_repository }
    }

    async fn convert(&self, amount: &str) -> Conversion {
        let quote = self.price_repository.get_rate().await;
        let inr_amount = match crate::utils::amount::parse(amount) {
            Some(value) if value > 0.0 => converter::format_inr(value),
            _ => converter::ZERO_PLACEHOLDER.to_string(),
        };

        Conversion {
            inr_amount,
            usdt_amount: converter::convert(amount, quote.rate),
            rate: quote.rate,
            rate_text: converter::rate_text(&quote, Utc::now()),
        }
    }
}

#[async_trait]
impl RequestHandler<PriceRequest> for PriceRequestHandler {
    async fn handle_request(&self, request: PriceRequest) {
        match request {
            PriceRequest::GetRate { response } => {
                let quote = self.price_repository.get_rate().await;
                let _ = response.send(Ok(quote));
            }
            PriceRequest::Convert { amount, response } => {
                let conversion = self.convert(&amount).await;
                let _ = response.send(Ok(conversion));
            }
        }
    }
}

pub struct PriceService;

impl PriceService {
    pub fn new() -> Self {
        PriceService {}
    }
}

#[async_trait]
impl Service<PriceRequest, PriceRequestHandler> for PriceService {}
