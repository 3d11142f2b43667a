use crate::models::kyc::{KycDocuments, KycVerdict};
use crate::models::users::KycStatus;
use crate::repositories::simulation::RandomizedOutcome;

use async_trait::async_trait;
use rand::Rng;
use uuid::Uuid;

/// Identity verification backend.
#[async_trait]
pub trait KycProvider: Send + Sync {
    async fn verify(&self, uid: &str, documents: &KycDocuments) -> Result<KycVerdict, anyhow::Error>;
}

/// Approves a configured share of submissions after a fixed delay.
pub struct SimulatedKycProvider {
    outcome: RandomizedOutcome,
}

impl SimulatedKycProvider {
    pub fn new(outcome: RandomizedOutcome) -> Self {
        Self { outcome }
    }
}

#[async_trait]
impl KycProvider for SimulatedKycProvider {
    async fn verify(&self, uid: &str, documents: &KycDocuments) -> Result<KycVerdict, anyhow::Error> {
        let verified = self.outcome.draw().await;
        let status = if verified {
            KycStatus::Verified
        } else {
            KycStatus::Rejected
        };

        log::info!(
            "Simulated KYC for {} ({}, {}, {}): {:?}",
            uid,
            documents.aadhaar,
            documents.pan,
            documents.selfie,
            status
        );

        Ok(KycVerdict {
            status,
            verification_id: format!("kyc_{}", Uuid::new_v4()),
            confidence: rand::thread_rng().gen_range(0.0..100.0),
        })
    }
}
