use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    response::IntoResponse,
};
use serde_json::json;

use super::{success, AppState};
use crate::models::kyc::{KycReceipt, UploadedDocument, DOCUMENT_FIELDS};
use crate::services::{call, kyc::KycRequest, ServiceError};

pub const DOCUMENT_COUNT: usize = DOCUMENT_FIELDS.len();

fn multipart_error(error: MultipartError) -> ServiceError {
    ServiceError::InvalidRequest(error.body_text())
}

/// Accepts a multipart form with a `uid` text field and one file per
/// document field. Unknown fields are ignored.
pub async fn upload_documents(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ServiceError> {
    let mut uid = String::new();
    let mut documents: Vec<UploadedDocument> = Vec::with_capacity(DOCUMENT_COUNT);

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "uid" {
            uid = field.text().await.map_err(multipart_error)?;
            continue;
        }
        if !DOCUMENT_FIELDS.contains(&name.as_str()) {
            continue;
        }
        if documents.iter().any(|document| document.field == name) {
            return Err(ServiceError::InvalidRequest(format!(
                "Only one {} file is allowed",
                name
            )));
        }

        let file_name = field.file_name().unwrap_or(&name).to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        documents.push(UploadedDocument {
            field: name,
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    let request = call(&state.channels.kyc, "HTTP", "KYC", |response| {
        KycRequest::Submit {
            uid,
            documents,
            response,
        }
    })
    .await?;

    Ok(success(json!({ "kycRequest": KycReceipt::from(&request) })))
}

pub async fn get_kyc_status(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = call(&state.channels.kyc, "HTTP", "KYC", |response| {
        KycRequest::GetStatus { uid, response }
    })
    .await?;

    Ok(success(report))
}
