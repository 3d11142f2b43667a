use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::users::UserRequest;
use super::{call, RequestHandler, Service, ServiceError};
use crate::models::kyc::{
    self, KycDocuments, KycRequestSummary, KycStatusReport, UploadedDocument, DOCUMENT_FIELDS,
};
use crate::repositories::kyc::{KycProvider, KycRepository};

pub enum KycRequest {
    Submit {
        uid: String,
        documents: Vec<UploadedDocument>,
        response: oneshot::Sender<Result<kyc::KycRequest, ServiceError>>,
    },
    GetStatus {
        uid: String,
        response: oneshot::Sender<Result<KycStatusReport, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct KycRequestHandler {
    repository: KycRepository,
    provider: Arc<dyn KycProvider>,
    max_document_bytes: usize,
    user_channel: mpsc::Sender<UserRequest>,
}

impl KycRequestHandler {
    pub fn new(
        repository: KycRepository,
        provider: Arc<dyn KycProvider>,
        max_document_bytes: usize,
        user_channel: mpsc::Sender<UserRequest>,
    ) -> Self {
        Self {
            repository,
            provider,
            max_document_bytes,
            user_channel,
        }
    }

    /// Picks the single file for `field`, checking type and size.
    fn take_document<'a>(
        &self,
        documents: &'a [UploadedDocument],
        field: &str,
    ) -> Result<&'a UploadedDocument, ServiceError> {
        let document = documents
            .iter()
            .find(|document| document.field == field)
            .ok_or_else(|| ServiceError::InvalidRequest("All documents required".to_string()))?;

        if !document.content_type.starts_with("image/") {
            return Err(ServiceError::InvalidRequest(
                "Only image files are allowed".to_string(),
            ));
        }
        if document.bytes.len() > self.max_document_bytes {
            return Err(ServiceError::InvalidRequest(format!(
                "{} exceeds the {} byte limit",
                field, self.max_document_bytes
            )));
        }

        Ok(document)
    }

    async fn store(&self, document: &UploadedDocument) -> Result<String, ServiceError> {
        self.repository
            .store_document(document)
            .await
            .map_err(|e| ServiceError::Repository("KYC".to_string(), e.to_string()))
    }

    async fn submit(
        &self,
        uid: String,
        documents: Vec<UploadedDocument>,
    ) -> Result<kyc::KycRequest, ServiceError> {
        if uid.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("User ID required".to_string()));
        }

        let [aadhaar, pan, selfie] = DOCUMENT_FIELDS;
        let aadhaar = self.take_document(&documents, aadhaar)?;
        let pan = self.take_document(&documents, pan)?;
        let selfie = self.take_document(&documents, selfie)?;

        call(&self.user_channel, "KYC", "User", |response| UserRequest::GetUser {
            uid: uid.clone(),
            response,
        })
        .await?;

        let documents = KycDocuments {
            aadhaar: self.store(aadhaar).await?,
            pan: self.store(pan).await?,
            selfie: self.store(selfie).await?,
        };

        let verdict = self
            .provider
            .verify(&uid, &documents)
            .await
            .map_err(|e| {
                ServiceError::ExternalService(
                    "KycService".to_string(),
                    "KycProvider".to_string(),
                    e.to_string(),
                )
            })?;

        log::info!(
            "KYC verdict for {}: {:?} (confidence {:.1}).",
            uid,
            verdict.status,
            verdict.confidence
        );

        let request = self.repository.new_request(&uid, documents, verdict);

        call(&self.user_channel, "KYC", "User", |response| {
            UserRequest::SetKycStatus {
                uid: uid.clone(),
                status: request.status,
                response,
            }
        })
        .await?;

        Ok(request)
    }

    async fn get_status(&self, uid: String) -> Result<KycStatusReport, ServiceError> {
        let user = call(&self.user_channel, "KYC", "User", |response| {
            UserRequest::GetUser {
                uid: uid.clone(),
                response,
            }
        })
        .await?;

        let kyc_request = self
            .repository
            .latest_for_user(&uid)
            .map(|request| KycRequestSummary {
                id: request.id,
                status: request.status,
                submitted_at: request.submitted_at,
                updated_at: request.updated_at,
            });

        Ok(KycStatusReport {
            kyc_status: user.kyc_status,
            kyc_request,
        })
    }
}

#[async_trait]
impl RequestHandler<KycRequest> for KycRequestHandler {
    async fn handle_request(&self, request: KycRequest) {
        match request {
            KycRequest::Submit {
                uid,
                documents,
                response,
            } => {
                let _ = response.send(self.submit(uid, documents).await);
            }
            KycRequest::GetStatus { uid, response } => {
                let _ = response.send(self.get_status(uid).await);
            }
        }
    }
}

pub struct KycService;

impl KycService {
    pub fn new() -> Self {
        KycService {}
    }
}

#[async_trait]
impl Service<KycRequest, KycRequestHandler> for KycService {}
