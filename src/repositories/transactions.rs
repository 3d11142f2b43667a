use crate::models::transactions::{NewTransaction, Transaction};

use chrono::Utc;
use dashmap::DashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use uuid::Uuid;

/// Append-only ledger. Records are never modified after insert.
#[derive(Clone, Default)]
pub struct TransactionRepository {
    transactions: Arc<DashMap<String, Transaction>>,
    sequence: Arc<AtomicU64>,
}

impl TransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_transaction(&self, new: NewTransaction) -> Transaction {
        let transaction = Transaction {
            id: Uuid::new_v4().hyphenated().to_string(),
            uid: new.uid,
            kind: new.kind,
            inr_amount: new.inr_amount,
            usdt_amount: new.usdt_amount,
            rate: new.rate,
            status: new.status,
            tx_hash: new.tx_hash,
            from_address: new.from_address,
            to_address: new.to_address,
            razorpay_order_id: new.razorpay_order_id,
            razorpay_payment_id: new.razorpay_payment_id,
            created_at: Utc::now(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
        };

        self.transactions
            .insert(transaction.id.clone(), transaction.clone());

        transaction
    }

    pub fn get_transaction(&self, id: &str) -> Option<Transaction> {
        self.transactions.get(id).map(|tx| tx.clone())
    }

    /// All transactions of `uid`, newest first.
    pub fn get_user_transactions(&self, uid: &str) -> Vec<Transaction> {
        let mut transactions: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|tx| tx.uid == uid)
            .map(|tx| tx.clone())
            .collect();

        transactions.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.sequence.cmp(&a.sequence))
        });

        transactions
    }
}
