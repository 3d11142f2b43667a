use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::transactions::TransactionRequest;
use super::users::UserRequest;
use super::{call, RequestHandler, Service, ServiceError};
use crate::models::payments::{Order, PaymentReceipt, PaymentVerification};
use crate::models::transactions::{NewTransaction, Transaction, TransactionStatus};
use crate::models::users::KycStatus;
use crate::repositories::payments::{OrderClaim, OrderError, OrderRepository, PaymentGateway};
use crate::repositories::usdt::UsdtNetwork;

const DEFAULT_CURRENCY: &str = "INR";

pub enum PaymentRequest {
    CreateOrder {
        uid: Option<String>,
        amount: Option<f64>,
        currency: Option<String>,
        response: oneshot::Sender<Result<(Order, String), ServiceError>>,
    },
    VerifyPayment {
        verification: PaymentVerification,
        response: oneshot::Sender<Result<PaymentReceipt, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct PaymentRequestHandler {
    orders: OrderRepository,
    gateway: Arc<dyn PaymentGateway>,
    usdt_network: Arc<dyn UsdtNetwork>,
    user_channel: mpsc::Sender<UserRequest>,
    transaction_channel: mpsc::Sender<TransactionRequest>,
}

/// Fields of a verification callback once presence has been checked.
struct VerifiedCallback {
    order_id: String,
    payment_id: String,
    uid: String,
    usdt_amount: f64,
    inr_amount: Option<f64>,
    rate: Option<f64>,
}

impl PaymentRequestHandler {
    pub fn new(
        orders: OrderRepository,
        gateway: Arc<dyn PaymentGateway>,
        usdt_network: Arc<dyn UsdtNetwork>,
        user_channel: mpsc::Sender<UserRequest>,
        transaction_channel: mpsc::Sender<TransactionRequest>,
    ) -> Self {
        Self {
            orders,
            gateway,
            usdt_network,
            user_channel,
            transaction_channel,
        }
    }

    async fn create_order(
        &self,
        uid: Option<String>,
        amount: Option<f64>,
        currency: Option<String>,
    ) -> Result<(Order, String), ServiceError> {
        let (uid, amount) = match (uid.filter(|uid| !uid.trim().is_empty()), amount) {
            (Some(uid), Some(amount)) if amount > 0.0 => (uid, amount),
            _ => {
                return Err(ServiceError::InvalidRequest(
                    "Amount and user ID required".to_string(),
                ))
            }
        };

        let amount_in_paise = (amount * 100.0).round();
        if amount_in_paise >= i64::MAX as f64 {
            return Err(ServiceError::InvalidRequest("Amount too large".to_string()));
        }
        let amount_in_paise = amount_in_paise as i64;

        let user = call(&self.user_channel, "Payment", "User", |response| {
            UserRequest::GetUser {
                uid: uid.clone(),
                response,
            }
        })
        .await?;

        if user.kyc_status != KycStatus::Verified {
            return Err(ServiceError::Forbidden(
                "KYC verification required".to_string(),
            ));
        }

        let currency = currency
            .filter(|currency| !currency.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let gateway_order = self
            .gateway
            .create_order(amount_in_paise, &currency)
            .await
            .map_err(|e| {
                ServiceError::ExternalService(
                    "PaymentService".to_string(),
                    "PaymentGateway".to_string(),
                    e.to_string(),
                )
            })?;

        let order = self.orders.new_order(&uid, gateway_order);
        log::info!(
            "Created order {} for {}: {} paise {}.",
            order.id,
            order.uid,
            order.amount,
            order.currency
        );

        Ok((order, self.gateway.key_id().to_string()))
    }

    fn check_callback(
        &self,
        verification: PaymentVerification,
    ) -> Result<VerifiedCallback, ServiceError> {
        let missing = || ServiceError::InvalidRequest("Missing required fields".to_string());
        let present = |value: Option<String>| value.filter(|value| !value.trim().is_empty());

        let order_id = present(verification.razorpay_order_id).ok_or_else(missing)?;
        let payment_id = present(verification.razorpay_payment_id).ok_or_else(missing)?;
        let signature = present(verification.razorpay_signature).ok_or_else(missing)?;
        let uid = present(verification.uid).ok_or_else(missing)?;
        let usdt_amount = verification
            .usdt_amount
            .filter(|amount| *amount > 0.0)
            .ok_or_else(missing)?;

        if !self
            .gateway
            .verify_signature(&order_id, &payment_id, &signature)
        {
            log::warn!("Rejected payment {} for order {}: bad signature.", payment_id, order_id);
            return Err(ServiceError::InvalidSignature);
        }

        Ok(VerifiedCallback {
            order_id,
            payment_id,
            uid,
            usdt_amount,
            inr_amount: verification.inr_amount,
            rate: verification.rate,
        })
    }

    async fn verify_payment(
        &self,
        verification: PaymentVerification,
    ) -> Result<PaymentReceipt, ServiceError> {
        let callback = self.check_callback(verification)?;

        let user = call(&self.user_channel, "Payment", "User", |response| {
            UserRequest::GetUser {
                uid: callback.uid.clone(),
                response,
            }
        })
        .await?;

        let order = match self.orders.claim(&callback.order_id, &callback.uid) {
            Ok(OrderClaim::Claimed(order)) => order,
            Ok(OrderClaim::Settled(order)) => return self.settled_receipt(&order).await,
            Err(OrderError::NotFound) => return Err(ServiceError::NotFound("Order".to_string())),
            Err(e) => return Err(ServiceError::Conflict(e.to_string())),
        };

        match self
            .settle_claimed(&order, &callback, &user.wallet_address)
            .await
        {
            Ok(receipt) => Ok(receipt),
            Err(e) => {
                log::warn!("Releasing order {} after failed settlement: {}", order.id, e);
                self.orders.release(&order.id);
                Err(e)
            }
        }
    }

    /// Delivers the USDT for a claimed order, credits the balance and records
    /// the buy. The caller releases the order if this fails.
    async fn settle_claimed(
        &self,
        order: &Order,
        callback: &VerifiedCallback,
        wallet_address: &str,
    ) -> Result<PaymentReceipt, ServiceError> {
        let settlement = self
            .usdt_network
            .credit(wallet_address, callback.usdt_amount)
            .await;

        let (status, tx_hash) = match settlement {
            Ok(tx_hash) => {
                call(&self.user_channel, "Payment", "User", |response| {
                    UserRequest::Credit {
                        uid: callback.uid.clone(),
                        amount: callback.usdt_amount,
                        response,
                    }
                })
                .await?;
                (TransactionStatus::Completed, Some(tx_hash))
            }
            Err(e) => {
                log::warn!("Settlement of order {} failed: {}", order.id, e);
                (TransactionStatus::Failed, None)
            }
        };

        let transaction = NewTransaction {
            inr_amount: Some(
                callback
                    .inr_amount
                    .unwrap_or(order.amount as f64 / 100.0),
            ),
            rate: callback.rate,
            tx_hash,
            razorpay_order_id: Some(order.id.clone()),
            razorpay_payment_id: Some(callback.payment_id.clone()),
            ..NewTransaction::buy(&callback.uid, callback.usdt_amount, status)
        };

        let transaction = call(
            &self.transaction_channel,
            "Payment",
            "Transaction",
            |response| TransactionRequest::RecordTransaction {
                transaction,
                response,
            },
        )
        .await?;

        self.orders
            .settle(
                &order.id,
                status == TransactionStatus::Completed,
                &transaction.id,
            )
            .map_err(|e| ServiceError::Repository("Order".to_string(), e.to_string()))?;

        Ok(receipt(transaction))
    }

    /// Answers a repeated verification with the transaction recorded the
    /// first time.
    async fn settled_receipt(&self, order: &Order) -> Result<PaymentReceipt, ServiceError> {
        let transaction_id = order.transaction_id.clone().ok_or_else(|| {
            ServiceError::Internal(format!("Settled order {} has no transaction", order.id))
        })?;

        log::info!("Order {} already settled, returning {}.", order.id, transaction_id);

        let transaction = call(
            &self.transaction_channel,
            "Payment",
            "Transaction",
            |response| TransactionRequest::GetTransaction {
                id: transaction_id,
                response,
            },
        )
        .await?;

        Ok(receipt(transaction))
    }
}

fn receipt(transaction: Transaction) -> PaymentReceipt {
    PaymentReceipt {
        id: transaction.id,
        status: transaction.status,
        tx_hash: transaction.tx_hash,
        usdt_amount: transaction.usdt_amount,
    }
}

#[async_trait]
impl RequestHandler<PaymentRequest> for PaymentRequestHandler {
    async fn handle_request(&self, request: PaymentRequest) {
        match request {
            PaymentRequest::CreateOrder {
                uid,
                amount,
                currency,
                response,
            } => {
                let _ = response.send(self.create_order(uid, amount, currency).await);
            }
            PaymentRequest::VerifyPayment {
                verification,
                response,
            } => {
                let _ = response.send(self.verify_payment(verification).await);
            }
        }
    }
}

pub struct PaymentService;

impl PaymentService {
    pub fn new() -> Self {
        PaymentService {}
    }
}

#[async_trait]
impl Service<PaymentRequest, PaymentRequestHandler> for PaymentService {}
