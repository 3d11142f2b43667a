use crate::models::kyc::{KycDocuments, KycRequest, KycVerdict, UploadedDocument};

use anyhow::Context;
use chrono::Utc;
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use uuid::Uuid;

mod provider;

pub use provider::{KycProvider, SimulatedKycProvider};

/// KYC submissions keyed by request id. A user's later submission
/// supersedes earlier ones; nothing is merged.
#[derive(Clone)]
pub struct KycRepository {
    requests: Arc<DashMap<String, KycRequest>>,
    sequence: Arc<AtomicU64>,
    uploads_dir: PathBuf,
}

impl KycRepository {
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            requests: Arc::new(DashMap::new()),
            sequence: Arc::new(AtomicU64::new(0)),
            uploads_dir: uploads_dir.into(),
        }
    }

    /// Writes a document under the uploads directory as
    /// `<unix millis>-<random tag>-<original name>` and returns the stored
    /// name. The tag keeps same-named files from replacing each other.
    pub async fn store_document(&self, document: &UploadedDocument) -> Result<String, anyhow::Error> {
        tokio::fs::create_dir_all(&self.uploads_dir)
            .await
            .with_context(|| format!("Could not create {}", self.uploads_dir.display()))?;

        let file_name = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            &Uuid::new_v4().simple().to_string()[..8],
            sanitize_file_name(&document.file_name)
        );
        let path = self.uploads_dir.join(&file_name);

        tokio::fs::write(&path, &document.bytes)
            .await
            .with_context(|| format!("Could not write {}", path.display()))?;

        Ok(file_name)
    }

    pub fn new_request(&self, uid: &str, documents: KycDocuments, verdict: KycVerdict) -> KycRequest {
        let now = Utc::now();
        let request = KycRequest {
            id: Uuid::new_v4().hyphenated().to_string(),
            uid: uid.to_string(),
            documents,
            status: verdict.status,
            verification_id: verdict.verification_id,
            submitted_at: now,
            updated_at: now,
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
        };

        self.requests.insert(request.id.clone(), request.clone());

        request
    }

    pub fn latest_for_user(&self, uid: &str) -> Option<KycRequest> {
        self.requests
            .iter()
            .filter(|request| request.uid == uid)
            .max_by(|a, b| {
                a.submitted_at
                    .cmp(&b.submitted_at)
                    .then_with(|| a.sequence.cmp(&b.sequence))
            })
            .map(|request| request.clone())
    }
}

#[cfg(test)]
impl KycRepository {
    pub fn count_for_user(&self, uid: &str) -> usize {
        self.requests
            .iter()
            .filter(|request| request.uid == uid)
            .count()
    }
}

/// Keeps only the final path component so a client cannot write outside the
/// uploads directory.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();

    match base {
        "" | "." | ".." => "document".to_string(),
        base => base.to_string(),
    }
}
