use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use super::{json_body, AppState};
use crate::models::transactions::TransferRequest;
use crate::services::{call, wallet::WalletRequest, ServiceError};

pub async fn transfer(
    State(state): State<AppState>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = json_body(payload)?;

    let outcome = call(&state.channels.wallet, "HTTP", "Wallet", |response| {
        WalletRequest::Transfer {
            uid: request.uid,
            to_address: request.to_address,
            amount: request.amount,
            response,
        }
    })
    .await?;

    log::info!(
        "Transfer {} finished, success: {}.",
        outcome.transaction_id,
        outcome.success
    );

    // A declined transfer is still a handled request: the body says so.
    let succeeded = outcome.success;
    let mut body = json!(outcome);
    if !succeeded {
        body["error"] = json!("Transfer failed");
    }

    Ok(Json(body))
}
