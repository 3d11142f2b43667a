use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use super::{json_body, success, AppState};
use crate::models::payments::{NewOrder, OrderSummary, PaymentVerification};
use crate::services::{call, payments::PaymentRequest, ServiceError};

pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<NewOrder>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let new_order = json_body(payload)?;

    let (order, key_id) = call(&state.channels.payments, "HTTP", "Payment", |response| {
        PaymentRequest::CreateOrder {
            uid: new_order.uid,
            amount: new_order.amount,
            currency: new_order.currency,
            response,
        }
    })
    .await?;

    Ok(success(json!({
        "order": OrderSummary::from(order),
        "keyId": key_id,
    })))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    payload: Result<Json<PaymentVerification>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let verification = json_body(payload)?;

    let receipt = call(&state.channels.payments, "HTTP", "Payment", |response| {
        PaymentRequest::VerifyPayment {
            verification,
            response,
        }
    })
    .await?;

    Ok(success(json!({ "transaction": receipt })))
}
