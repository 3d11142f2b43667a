use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::amount;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Processing,
    Paid,
    Failed,
}

/// A payment gateway order. `amount` is in paise.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub uid: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub status: OrderStatus,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderSummary {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

impl From<Order> for OrderSummary {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            amount: order.amount,
            currency: order.currency,
            receipt: order.receipt,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewOrder {
    #[serde(default, deserialize_with = "amount::optional")]
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub uid: Option<String>,
}

/// Payment callback as posted by the checkout page.
#[derive(Clone, Debug, Deserialize)]
pub struct PaymentVerification {
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub razorpay_signature: Option<String>,
    pub uid: Option<String>,
    #[serde(default, rename = "usdtAmount", deserialize_with = "amount::optional")]
    pub usdt_amount: Option<f64>,
    #[serde(default, rename = "inrAmount", deserialize_with = "amount::optional")]
    pub inr_amount: Option<f64>,
    #[serde(default, deserialize_with = "amount::optional")]
    pub rate: Option<f64>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub id: String,
    pub status: super::transactions::TransactionStatus,
    pub tx_hash: Option<String>,
    pub usdt_amount: f64,
}
