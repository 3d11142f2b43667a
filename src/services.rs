use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::repositories::{
    kyc::{KycRepository, SimulatedKycProvider},
    payments::{OrderRepository, SimulatedRazorpay},
    price::PriceRepository,
    simulation::RandomizedOutcome,
    transactions::TransactionRepository,
    usdt::{SimulatedUsdtNetwork, UsdtNetwork},
    users::UserRepository,
};
use crate::settings::Settings;

pub mod http;
mod kyc;
mod payments;
mod price;
mod transactions;
mod users;
mod wallet;

const CHANNEL_CAPACITY: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Repository error: {0} - {1}")]
    Repository(String, String),
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
    #[error("External service error: {0} -> {1} => {2}")]
    ExternalService(String, String, String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Invalid payment signature")]
    InvalidSignature,
    #[error("Insufficient balance")]
    InsufficientBalance,
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

/// Sends a request built around a fresh reply channel and waits for the
/// answer. `from`/`to` name the caller and the callee in errors.
pub(crate) async fn call<T, R>(
    channel: &mpsc::Sender<T>,
    from: &str,
    to: &str,
    build: impl FnOnce(oneshot::Sender<Result<R, ServiceError>>) -> T,
) -> Result<R, ServiceError>
where
    T: Send + 'static,
{
    let (response_tx, response_rx) = oneshot::channel();

    channel
        .send(build(response_tx))
        .await
        .map_err(|e| ServiceError::Communication(format!("{} => {}", from, to), e.to_string()))?;

    response_rx
        .await
        .map_err(|e| ServiceError::Communication(format!("{} => {}", to, from), e.to_string()))?
}

/// Senders of every running service.
#[derive(Clone)]
pub struct ServiceChannels {
    pub price: mpsc::Sender<price::PriceRequest>,
    pub users: mpsc::Sender<users::UserRequest>,
    pub kyc: mpsc::Sender<kyc::KycRequest>,
    pub payments: mpsc::Sender<payments::PaymentRequest>,
    pub wallet: mpsc::Sender<wallet::WalletRequest>,
    pub transactions: mpsc::Sender<transactions::TransactionRequest>,
}

fn spawn_service<S, T, H>(name: &'static str, mut service: S, handler: H, mut receiver: mpsc::Receiver<T>)
where
    S: Service<T, H>,
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    log::info!("Starting {} service.", name);
    tokio::spawn(async move {
        service.run(handler, &mut receiver).await;
        log::warn!("{} service stopped.", name);
    });
}

/// Builds the repositories and simulators described by `settings` and spawns
/// one task per service. Must run inside a tokio runtime.
pub fn spawn_services(
    settings: &Settings,
    price_repository: PriceRepository,
) -> ServiceChannels {
    let (price_tx, price_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (user_tx, user_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (kyc_tx, kyc_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (payment_tx, payment_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (wallet_tx, wallet_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (transaction_tx, transaction_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let simulation = &settings.simulation;
    let usdt_network: Arc<dyn UsdtNetwork> = Arc::new(SimulatedUsdtNetwork::new(
        RandomizedOutcome::new(
            simulation.settlement_delay_ms,
            simulation.settlement_success_rate,
        ),
        RandomizedOutcome::new(simulation.transfer_delay_ms, simulation.transfer_success_rate),
    ));

    spawn_service(
        "price",
        price::PriceService::new(),
        price::PriceRequestHandler::new(price_repository),
        price_rx,
    );

    spawn_service(
        "user",
        users::UserService::new(),
        users::UserRequestHandler::new(UserRepository::new(), usdt_network.clone()),
        user_rx,
    );

    spawn_service(
        "transaction",
        transactions::TransactionService::new(),
        transactions::TransactionRequestHandler::new(TransactionRepository::new()),
        transaction_rx,
    );

    spawn_service(
        "KYC",
        kyc::KycService::new(),
        kyc::KycRequestHandler::new(
            KycRepository::new(&settings.server.uploads_dir),
            Arc::new(SimulatedKycProvider::new(RandomizedOutcome::new(
                simulation.kyc_delay_ms,
                simulation.kyc_success_rate,
            ))),
            settings.server.max_upload_bytes,
            user_tx.clone(),
        ),
        kyc_rx,
    );

    spawn_service(
        "payment",
        payments::PaymentService::new(),
        payments::PaymentRequestHandler::new(
            OrderRepository::new(),
            Arc::new(SimulatedRazorpay::new(
                settings.razorpay.key_id.clone(),
                settings.razorpay.key_secret.clone(),
            )),
            usdt_network.clone(),
            user_tx.clone(),
            transaction_tx.clone(),
        ),
        payment_rx,
    );

    spawn_service(
        "wallet",
        wallet::WalletService::new(),
        wallet::WalletRequestHandler::new(usdt_network, user_tx.clone(), transaction_tx.clone()),
        wallet_rx,
    );

    ServiceChannels {
        price: price_tx,
        users: user_tx,
        kyc: kyc_tx,
        payments: payment_tx,
        wallet: wallet_tx,
        transactions: transaction_tx,
    }
}

pub async fn start_services(settings: Settings) -> Result<(), anyhow::Error> {
    let price_repository = PriceRepository::new(&settings.price_providers)?;
    price_repository
        .start_price_fetch_task(Duration::from_secs(
            settings.price_providers.refresh_interval_secs.max(1),
        ))
        .await;

    let channels = spawn_services(&settings, price_repository);

    log::info!("Started services.");
    http::start_http_server(channels, &settings.server).await
}
