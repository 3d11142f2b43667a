use crate::repositories::simulation;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Order as issued by the payment gateway. `amount` is in paise.
#[derive(Clone, Debug)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key the checkout page uses with this gateway.
    fn key_id(&self) -> &str;

    async fn create_order(
        &self,
        amount_in_paise: i64,
        currency: &str,
    ) -> Result<GatewayOrder, anyhow::Error>;

    /// Checks the callback signature for `order_id|payment_id`.
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;
}

/// Issues orders locally and checks signatures with the configured secret,
/// the same way Razorpay signs checkout callbacks.
pub struct SimulatedRazorpay {
    key_id: String,
    key_secret: String,
}

impl SimulatedRazorpay {
    pub fn new(key_id: String, key_secret: String) -> Self {
        Self { key_id, key_secret }
    }

    fn mac(&self, order_id: &str, payment_id: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
        mac
    }

    /// Signature the checkout page would receive for this payment.
    #[cfg(test)]
    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        hex::encode(self.mac(order_id, payment_id).finalize().into_bytes())
    }
}

#[async_trait]
impl PaymentGateway for SimulatedRazorpay {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn create_order(
        &self,
        amount_in_paise: i64,
        currency: &str,
    ) -> Result<GatewayOrder, anyhow::Error> {
        Ok(GatewayOrder {
            id: format!("order_{}", simulation::random_alphanumeric(14)),
            amount: amount_in_paise,
            currency: currency.to_string(),
            receipt: format!("receipt_{}", Utc::now().timestamp_millis()),
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let Ok(signature) = hex::decode(signature) else {
            return false;
        };

        self.mac(order_id, payment_id).verify_slice(&signature).is_ok()
    }
}
