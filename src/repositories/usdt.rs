use async_trait::async_trait;

use super::simulation::{self, RandomizedOutcome};

#[derive(Debug, thiserror::Error)]
pub enum UsdtError {
    #[error("USDT network declined the transfer")]
    Declined,
}

/// Moves USDT on the settlement network. Successful calls return the
/// transaction hash.
#[async_trait]
pub trait UsdtNetwork: Send + Sync {
    fn generate_address(&self) -> String;

    /// Delivers purchased USDT to a user's wallet.
    async fn credit(&self, address: &str, amount: f64) -> Result<String, UsdtError>;

    /// Sends USDT from a user's wallet to an external address.
    async fn send(&self, from: &str, to: &str, amount: f64) -> Result<String, UsdtError>;
}

pub struct SimulatedUsdtNetwork {
    settlement: RandomizedOutcome,
    transfer: RandomizedOutcome,
}

impl SimulatedUsdtNetwork {
    pub fn new(settlement: RandomizedOutcome, transfer: RandomizedOutcome) -> Self {
        Self {
            settlement,
            transfer,
        }
    }
}

#[async_trait]
impl UsdtNetwork for SimulatedUsdtNetwork {
    fn generate_address(&self) -> String {
        simulation::generate_trc20_address()
    }

    async fn credit(&self, address: &str, amount: f64) -> Result<String, UsdtError> {
        if !self.settlement.draw().await {
            log::warn!("Simulated credit of {} USDT to {} failed.", amount, address);
            return Err(UsdtError::Declined);
        }

        Ok(simulation::fabricate_tx_hash())
    }

    async fn send(&self, from: &str, to: &str, amount: f64) -> Result<String, UsdtError> {
        if !self.transfer.draw().await {
            log::warn!("Simulated transfer of {} USDT {} -> {} failed.", amount, from, to);
            return Err(UsdtError::Declined);
        }

        Ok(simulation::fabricate_tx_hash())
    }
}
