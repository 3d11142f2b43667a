use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::{success, AppState};
use crate::models::price::RateSource;
use crate::services::{call, price::PriceRequest, ServiceError};
use crate::utils::converter;

#[derive(Deserialize)]
pub struct ConvertQuery {
    amount: Option<String>,
}

pub async fn get_exchange_rate(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let quote = call(&state.channels.price, "HTTP", "Price", |response| {
        PriceRequest::GetRate { response }
    })
    .await?;

    if quote.source == RateSource::Fallback {
        return Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "Failed to fetch exchange rate",
                "fallbackRate": quote.rate,
            })),
        )
            .into_response());
    }

    Ok(success(json!({
        "rate": quote.rate,
        "source": quote.source,
        "timestamp": quote.fetched_at,
        "rateText": converter::rate_text(&quote, Utc::now()),
    }))
    .into_response())
}

pub async fn convert(
    State(state): State<AppState>,
    Query(query): Query<ConvertQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let conversion = call(&state.channels.price, "HTTP", "Price", |response| {
        PriceRequest::Convert {
            amount: query.amount.unwrap_or_default(),
            response,
        }
    })
    .await?;

    Ok(success(conversion))
}
