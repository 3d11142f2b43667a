use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::users::KycStatus;

/// Multipart field names a KYC upload must carry, one file each.
pub const DOCUMENT_FIELDS: [&str; 3] = ["aadhaar", "pan", "selfie"];

/// Stored filenames of the submitted documents.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct KycDocuments {
    pub aadhaar: String,
    pub pan: String,
    pub selfie: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KycRequest {
    pub id: String,
    pub uid: String,
    pub documents: KycDocuments,
    pub status: KycStatus,
    pub verification_id: String,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub sequence: u64,
}

/// Result reported by a KYC provider.
#[derive(Clone, Debug)]
pub struct KycVerdict {
    pub status: KycStatus,
    pub verification_id: String,
    pub confidence: f64,
}

/// A document file as received, before it is written to disk.
#[derive(Clone, Debug)]
pub struct UploadedDocument {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KycReceipt {
    pub id: String,
    pub status: KycStatus,
    pub verification_id: String,
}

impl From<&KycRequest> for KycReceipt {
    fn from(request: &KycRequest) -> Self {
        Self {
            id: request.id.clone(),
            status: request.status,
            verification_id: request.verification_id.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KycRequestSummary {
    pub id: String,
    pub status: KycStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KycStatusReport {
    pub kyc_status: KycStatus,
    pub kyc_request: Option<KycRequestSummary>,
}
