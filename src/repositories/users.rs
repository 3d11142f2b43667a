use crate::models::users::{KycStatus, User};

use anyhow::bail;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum BalanceError {
    #[error("User not found")]
    UserNotFound,
    #[error("Insufficient balance")]
    InsufficientBalance,
    #[error("Invalid amount")]
    InvalidAmount,
}

/// Profiles keyed by uid. Balance updates run while the entry is held, so a
/// check-and-debit cannot interleave with another update for the same user.
#[derive(Clone, Default)]
pub struct UserRepository {
    users: Arc<DashMap<String, User>>,
}

impl UserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fresh profile. An existing profile is returned untouched
    /// together with `false`.
    pub fn insert_user(
        &self,
        uid: &str,
        email: &str,
        display_name: &str,
        wallet_address: String,
    ) -> (User, bool) {
        match self.users.entry(uid.to_string()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let now = Utc::now();
                let user = User {
                    uid: uid.to_string(),
                    email: email.to_string(),
                    display_name: display_name.to_string(),
                    wallet_address,
                    balance: 0.0,
                    kyc_status: KycStatus::Pending,
                    created_at: now,
                    updated_at: now,
                };
                entry.insert(user.clone());
                (user, true)
            }
        }
    }

    pub fn get_user_by_id(&self, uid: &str) -> Option<User> {
        self.users.get(uid).map(|user| user.clone())
    }

    pub fn set_kyc_status(&self, uid: &str, status: KycStatus) -> Result<User, anyhow::Error> {
        match self.users.get_mut(uid) {
            Some(mut user) => {
                user.kyc_status = status;
                user.updated_at = Utc::now();
                Ok(user.clone())
            }
            None => bail!("User not found"),
        }
    }

    /// Adds `amount` and returns the new balance.
    pub fn credit(&self, uid: &str, amount: f64) -> Result<f64, BalanceError> {
        if !(amount.is_finite() && amount > 0.0) {
            return Err(BalanceError::InvalidAmount);
        }

        let mut user = self.users.get_mut(uid).ok_or(BalanceError::UserNotFound)?;
        user.balance += amount;
        user.updated_at = Utc::now();

        Ok(user.balance)
    }

    /// Subtracts `amount` if the balance covers it and returns the new
    /// balance. Nothing changes on error.
    pub fn debit(&self, uid: &str, amount: f64) -> Result<f64, BalanceError> {
        if !(amount.is_finite() && amount > 0.0) {
            return Err(BalanceError::InvalidAmount);
        }

        let mut user = self.users.get_mut(uid).ok_or(BalanceError::UserNotFound)?;
        if user.balance < amount {
            return Err(BalanceError::InsufficientBalance);
        }
        user.balance -= amount;
        user.updated_at = Utc::now();

        Ok(user.balance)
    }
}
