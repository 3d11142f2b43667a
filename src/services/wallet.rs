use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::transactions::TransactionRequest;
use super::users::UserRequest;
use super::{call, RequestHandler, Service, ServiceError};
use crate::models::transactions::{NewTransaction, TransactionStatus, TransferOutcome};
use crate::repositories::usdt::UsdtNetwork;

pub enum WalletRequest {
    Transfer {
        uid: Option<String>,
        to_address: Option<String>,
        amount: Option<f64>,
        response: oneshot::Sender<Result<TransferOutcome, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct WalletRequestHandler {
    usdt_network: Arc<dyn UsdtNetwork>,
    user_channel: mpsc::Sender<UserRequest>,
    transaction_channel: mpsc::Sender<TransactionRequest>,
}

impl WalletRequestHandler {
    pub fn new(
        usdt_network: Arc<dyn UsdtNetwork>,
        user_channel: mpsc::Sender<UserRequest>,
        transaction_channel: mpsc::Sender<TransactionRequest>,
    ) -> Self {
        Self {
            usdt_network,
            user_channel,
            transaction_channel,
        }
    }

    /// Debits first so two concurrent transfers can't both spend the same
    /// balance. A declined send gives the amount back.
    async fn transfer(
        &self,
        uid: Option<String>,
        to_address: Option<String>,
        amount: Option<f64>,
    ) -> Result<TransferOutcome, ServiceError> {
        let present = |value: Option<String>| value.filter(|value| !value.trim().is_empty());
        let (uid, to_address, amount) = match (present(uid), present(to_address), amount) {
            (Some(uid), Some(to_address), Some(amount)) if amount > 0.0 => {
                (uid, to_address, amount)
            }
            _ => {
                return Err(ServiceError::InvalidRequest(
                    "Missing required fields".to_string(),
                ))
            }
        };

        let user = call(&self.user_channel, "Wallet", "User", |response| {
            UserRequest::GetUser {
                uid: uid.clone(),
                response,
            }
        })
        .await?;

        let debited_balance = call(&self.user_channel, "Wallet", "User", |response| {
            UserRequest::Debit {
                uid: uid.clone(),
                amount,
                response,
            }
        })
        .await?;

        let sent = self
            .usdt_network
            .send(&user.wallet_address, &to_address, amount)
            .await;

        let (status, tx_hash, new_balance) = match sent {
            Ok(tx_hash) => (TransactionStatus::Completed, Some(tx_hash), debited_balance),
            Err(e) => {
                log::warn!("Transfer of {} USDT for {} failed: {}", amount, uid, e);
                let refunded_balance = call(&self.user_channel, "Wallet", "User", |response| {
                    UserRequest::Credit {
                        uid: uid.clone(),
                        amount,
                        response,
                    }
                })
                .await?;
                (TransactionStatus::Failed, None, refunded_balance)
            }
        };

        let transaction = NewTransaction {
            tx_hash: tx_hash.clone(),
            ..NewTransaction::transfer(&uid, amount, &user.wallet_address, &to_address, status)
        };

        let transaction = call(
            &self.transaction_channel,
            "Wallet",
            "Transaction",
            |response| TransactionRequest::RecordTransaction {
                transaction,
                response,
            },
        )
        .await?;

        Ok(TransferOutcome {
            success: status == TransactionStatus::Completed,
            tx_hash,
            new_balance,
            transaction_id: transaction.id,
        })
    }
}

#[async_trait]
impl RequestHandler<WalletRequest> for WalletRequestHandler {
    async fn handle_request(&self, request: WalletRequest) {
        match request {
            WalletRequest::Transfer {
                uid,
                to_address,
                amount,
                response,
            } => {
                let _ = response.send(self.transfer(uid, to_address, amount).await);
            }
        }
    }
}

pub struct WalletService;

impl WalletService {
    pub fn new() -> Self {
        WalletService {}
    }
}

#[async_trait]
impl Service<WalletRequest, WalletRequestHandler> for WalletService {}
