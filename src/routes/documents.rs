use axum::extract::{Json, Multipart, Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::engine::documents::{self, UploadFile, UploadRequest};
use crate::engine::gate;
use crate::error::{AppError, AppResult};
use crate::models::Document;
use crate::state::AppState;

#[derive(Serialize, Clone)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    pub public_url: String,
    pub size_bytes: i64,
    pub mime_type: Option<String>,
    pub facility_id: Uuid,
    pub uploaded_by: Uuid,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Document> for DocumentResponse {
    fn from(document: Document) -> Self {
        Self {
            id: document.id,
            title: document.title,
            description: document.description,
            file_name: document.file_name,
            public_url: document.public_url,
            size_bytes: document.size_bytes,
            mime_type: document.mime_type,
            facility_id: document.facility_id,
            uploaded_by: document.uploaded_by,
            active: document.active,
            created_at: to_iso(document.created_at),
            updated_at: to_iso(document.updated_at),
        }
    }
}

#[derive(Serialize)]
pub struct DocumentDetailResponse {
    pub document: DocumentResponse,
}

#[derive(Serialize)]
pub struct ActiveDocumentResponse {
    pub document: Option<DocumentResponse>,
}

pub async fn upload_document(
    State(state): State<AppState>,
    Path(facility_id): Path<Uuid>,
    AuthenticatedUser(caller): AuthenticatedUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DocumentDetailResponse>)> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("file") => {
                file_name = field.file_name().map(|n| n.to_string());
                content_type = field.content_type().map(|mime| mime.to_string());
                let data = field.bytes().await.map_err(|err| {
                    error!(error = %err, "failed to read file bytes");
                    AppError::bad_request(format!("failed to read file bytes: {err}"))
                })?;
                file_bytes = Some(data.to_vec());
            }
            Some("title") => {
                title = Some(field.text().await.map_err(|err| {
                    AppError::bad_request(format!("invalid title: {err}"))
                })?);
            }
            Some("description") => {
                description = Some(field.text().await.map_err(|err| {
                    AppError::bad_request(format!("invalid description: {err}"))
                })?);
            }
            _ => {}
        }
    }

    let file_bytes = file_bytes.ok_or_else(|| AppError::bad_request("file field is required"))?;
    let file_name = file_name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("filename is required"))?;
    let title = title.ok_or_else(|| AppError::bad_request("title field is required"))?;

    let request = UploadRequest {
        facility_id,
        file: UploadFile {
            file_name,
            bytes: file_bytes,
            mime_type: content_type,
        },
        title,
        description,
    };

    let document = documents::upload(
        &state.stores,
        &caller,
        request,
        state.config.max_upload_bytes,
    )
    .await
    .inspect_err(|err| error!(error = %err, facility_id = %facility_id, "upload failed"))?;

    Ok((
        StatusCode::CREATED,
        Json(DocumentDetailResponse {
            document: document.into(),
        }),
    ))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> AppResult<StatusCode> {
    documents::retire(&state.stores, &caller, document_id).await?;
    info!(document_id = %document_id, identity_id = %caller.identity_id, "document deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Streams the stored bytes back for inline viewing.
pub async fn document_content(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    let (document, bytes) =
        documents::document_content(&state.stores, &caller, document_id).await?;

    let mut headers = HeaderMap::new();
    let content_type = document
        .mime_type
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);
    if let Some(disposition) = documents::inline_content_disposition(&document.file_name)
        .and_then(|value| HeaderValue::from_str(&value).ok())
    {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }

    Ok((headers, bytes))
}

pub async fn list_facility_documents(
    State(state): State<AppState>,
    Path(facility_id): Path<Uuid>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> AppResult<Json<Vec<DocumentResponse>>> {
    let documents = documents::documents_for_facility(&state.stores, &caller, facility_id).await?;
    Ok(Json(documents.into_iter().map(Into::into).collect()))
}

pub async fn active_facility_document(
    State(state): State<AppState>,
    Path(facility_id): Path<Uuid>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> AppResult<Json<ActiveDocumentResponse>> {
    gate::require_facility_access(&state.stores, &caller, facility_id).await?;
    let document = documents::active_document(&state.stores, facility_id).await?;
    Ok(Json(ActiveDocumentResponse {
        document: document.map(Into::into),
    }))
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}
