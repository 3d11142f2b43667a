use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::amount;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Buy,
    Transfer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Failed,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub uid: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inr_amount: Option<f64>,
    pub usdt_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    pub status: TransactionStatus,
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Insertion order, breaks ties between equal timestamps.
    #[serde(skip)]
    pub sequence: u64,
}

/// Everything the ledger needs to record an event. Id, timestamp and
/// sequence are assigned on insert.
#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub uid: String,
    pub kind: TransactionType,
    pub inr_amount: Option<f64>,
    pub usdt_amount: f64,
    pub rate: Option<f64>,
    pub status: TransactionStatus,
    pub tx_hash: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
}

impl NewTransaction {
    pub fn buy(uid: &str, usdt_amount: f64, status: TransactionStatus) -> Self {
        Self {
            uid: uid.to_string(),
            kind: TransactionType::Buy,
            inr_amount: None,
            usdt_amount,
            rate: None,
            status,
            tx_hash: None,
            from_address: None,
            to_address: None,
            razorpay_order_id: None,
            razorpay_payment_id: None,
        }
    }

    pub fn transfer(
        uid: &str,
        usdt_amount: f64,
        from_address: &str,
        to_address: &str,
        status: TransactionStatus,
    ) -> Self {
        Self {
            uid: uid.to_string(),
            kind: TransactionType::Transfer,
            inr_amount: None,
            usdt_amount,
            rate: None,
            status,
            tx_hash: None,
            from_address: Some(from_address.to_string()),
            to_address: Some(to_address.to_string()),
            razorpay_order_id: None,
            razorpay_payment_id: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub uid: Option<String>,
    pub to_address: Option<String>,
    #[serde(default, deserialize_with = "amount::optional")]
    pub amount: Option<f64>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutcome {
    pub success: bool,
    pub tx_hash: Option<String>,
    pub new_balance: f64,
    #[serde(skip)]
    pub transaction_id: String,
}
