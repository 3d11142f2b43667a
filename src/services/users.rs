use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::users::{self, KycStatus};
use crate::repositories::{
    usdt::UsdtNetwork,
    users::{BalanceError, UserRepository},
};

pub enum UserRequest {
    CreateUser {
        uid: String,
        email: String,
        display_name: String,
        response: oneshot::Sender<Result<(users::User, bool), ServiceError>>,
    },
    GetUser {
        uid: String,
        response: oneshot::Sender<Result<users::User, ServiceError>>,
    },
    SetKycStatus {
        uid: String,
        status: KycStatus,
        response: oneshot::Sender<Result<users::User, ServiceError>>,
    },
    Credit {
        uid: String,
        amount: f64,
        response: oneshot::Sender<Result<f64, ServiceError>>,
    },
    Debit {
        uid: String,
        amount: f64,
        response: oneshot::Sender<Result<f64, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct UserRequestHandler {
    repository: UserRepository,
    usdt_network: Arc<dyn UsdtNetwork>,
}

impl UserRequestHandler {
    pub fn new(repository: UserRepository, usdt_network: Arc<dyn UsdtNetwork>) -> Self {
        UserRequestHandler {
            repository,
            usdt_network,
        }
    }

    fn create_user(
        &self,
        uid: &str,
        email: &str,
        display_name: &str,
    ) -> Result<(users::User, bool), ServiceError> {
        if uid.trim().is_empty() || email.trim().is_empty() {
            return Err(ServiceError::InvalidRequest(
                "Missing required fields".to_string(),
            ));
        }

        let (user, created) = self.repository.insert_user(
            uid,
            email,
            display_name,
            self.usdt_network.generate_address(),
        );

        if created {
            log::info!("Registered user {} with wallet {}.", user.uid, user.wallet_address);
        } else {
            log::info!("User {} already registered.", user.uid);
        }

        Ok((user, created))
    }

    fn get_user(&self, uid: &str) -> Result<users::User, ServiceError> {
        self.repository
            .get_user_by_id(uid)
            .ok_or_else(|| ServiceError::NotFound("User".to_string()))
    }

    fn set_kyc_status(&self, uid: &str, status: KycStatus) -> Result<users::User, ServiceError> {
        self.repository
            .set_kyc_status(uid, status)
            .map_err(|_| ServiceError::NotFound("User".to_string()))
    }

    fn credit(&self, uid: &str, amount: f64) -> Result<f64, ServiceError> {
        self.repository.credit(uid, amount).map_err(balance_error)
    }

    fn debit(&self, uid: &str, amount: f64) -> Result<f64, ServiceError> {
        self.repository.debit(uid, amount).map_err(balance_error)
    }
}

fn balance_error(error: BalanceError) -> ServiceError {
    match error {
        BalanceError::UserNotFound => ServiceError::NotFound("User".to_string()),
        BalanceError::InsufficientBalance => ServiceError::InsufficientBalance,
        BalanceError::InvalidAmount => ServiceError::InvalidRequest(error.to_string()),
    }
}

#[async_trait]
impl RequestHandler<UserRequest> for UserRequestHandler {
    async fn handle_request(&self, request: UserRequest) {
        match request {
            UserRequest::CreateUser {
                uid,
                email,
                display_name,
                response,
            } => {
                let user = self.create_user(&uid, &email, &display_name);
                let _ = response.send(user);
            }
            UserRequest::GetUser { uid, response } => {
                let _ = response.send(self.get_user(&uid));
            }
            UserRequest::SetKycStatus {
                uid,
                status,
                response,
            } => {
                let _ = response.send(self.set_kyc_status(&uid, status));
            }
            UserRequest::Credit {
                uid,
                amount,
                response,
            } => {
                let _ = response.send(self.credit(&uid, amount));
            }
            UserRequest::Debit {
                uid,
                amount,
                response,
            } => {
                let _ = response.send(self.debit(&uid, amount));
            }
        }
    }
}

pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        UserService {}
    }
}

#[async_trait]
impl Service<UserRequest, UserRequestHandler> for UserService {}
