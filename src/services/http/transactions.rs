use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;

use super::{success, AppState};
use crate::services::{call, transactions::TransactionRequest, ServiceError};

/// A user's ledger, newest first. Unknown users simply have no entries.
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let transactions = call(
        &state.channels.transactions,
        "HTTP",
        "Transaction",
        |response| TransactionRequest::ListTransactions { uid, response },
    )
    .await?;

    Ok(success(json!({ "transactions": transactions })))
}
