use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::transactions::{NewTransaction, Transaction};
use crate::repositories::transactions::TransactionRepository;

pub enum TransactionRequest {
    RecordTransaction {
        transaction: NewTransaction,
        response: oneshot::Sender<Result<Transaction, ServiceError>>,
    },
    GetTransaction {
        id: String,
        response: oneshot::Sender<Result<Transaction, ServiceError>>,
    },
    ListTransactions {
        uid: String,
        response: oneshot::Sender<Result<Vec<Transaction>, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct TransactionRequestHandler {
    repository: TransactionRepository,
}

impl TransactionRequestHandler {
    pub fn new(repository: TransactionRepository) -> Self {
        TransactionRequestHandler { repository }
    }

    fn record_transaction(&self, transaction: NewTransaction) -> Transaction {
        let transaction = self.repository.new_transaction(transaction);

        log::info!(
            "Recorded {:?} transaction {} for {}: {} USDT ({:?}).",
            transaction.kind,
            transaction.id,
            transaction.uid,
            transaction.usdt_amount,
            transaction.status
        );

        transaction
    }

    fn get_transaction(&self, id: &str) -> Result<Transaction, ServiceError> {
        self.repository
            .get_transaction(id)
            .ok_or_else(|| ServiceError::NotFound("Transaction".to_string()))
    }
}

#[async_trait]
impl RequestHandler<TransactionRequest> for TransactionRequestHandler {
    async fn handle_request(&self, request: TransactionRequest) {
        match request {
            TransactionRequest::RecordTransaction {
                transaction,
                response,
            } => {
                let _ = response.send(Ok(self.record_transaction(transaction)));
            }
            TransactionRequest::GetTransaction { id, response } => {
                let _ = response.send(self.get_transaction(&id));
            }
            TransactionRequest::ListTransactions { uid, response } => {
                let _ = response.send(Ok(self.repository.get_user_transactions(&uid)));
            }
        }
    }
}

pub struct TransactionService;

impl TransactionService {
    pub fn new() -> Self {
        TransactionService {}
    }
}

#[async_trait]
impl Service<TransactionRequest, TransactionRequestHandler> for TransactionService {}
