//! Upload, publication and retirement of a facility's document.

use std::path::Path;

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::gate::{self, Caller};
use super::{guard, EngineError, EngineResult, Stores, ACTIVE_DOCUMENT_CONFLICT};
use crate::models::{Document, NewDocument};
use crate::storage::ObjectUpload;

const STORAGE_PREFIX: &str = "documents";
const SUFFIX_LEN: usize = 12;
const MAX_EXTENSION_LEN: usize = 10;

pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

pub struct UploadRequest {
    pub facility_id: Uuid,
    pub file: UploadFile,
    pub title: String,
    pub description: Option<String>,
}

pub async fn upload(
    stores: &Stores,
    caller: &Caller,
    request: UploadRequest,
    max_bytes: usize,
) -> EngineResult<Document> {
    let UploadRequest {
        facility_id,
        file,
        title,
        description,
    } = request;

    gate::require_facility_access(stores, caller, facility_id).await?;

    if stores.metadata.facility(facility_id).await?.is_none() {
        return Err(EngineError::NotFound("facility"));
    }

    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(EngineError::Validation("title must not be empty".to_string()));
    }
    if file.bytes.is_empty() {
        return Err(EngineError::Validation("file must not be empty".to_string()));
    }
    if file.bytes.len() > max_bytes {
        return Err(EngineError::Validation(format!(
            "file exceeds the maximum upload size of {max_bytes} bytes"
        )));
    }
    let description = description
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    if guard::has_active_document(stores, facility_id).await? {
        return Err(EngineError::Conflict(ACTIVE_DOCUMENT_CONFLICT.to_string()));
    }

    let storage_key = storage_key(
        facility_id,
        &file.file_name,
        Utc::now().timestamp_millis(),
        &random_suffix(),
    );
    let mime_type = file.mime_type.filter(|value| !value.is_empty()).or_else(|| {
        mime_guess::from_path(&file.file_name)
            .first()
            .map(|mime| mime.to_string())
    });
    let size_bytes = file.bytes.len() as i64;

    stores
        .objects
        .put_object(ObjectUpload {
            key: storage_key.clone(),
            bytes: file.bytes,
            content_type: mime_type.clone(),
            content_disposition: inline_content_disposition(&file.file_name),
        })
        .await
        .map_err(|err| {
            error!(error = %err, storage_key = %storage_key, "failed to store document");
            EngineError::from(err)
        })?;

    let public_url = stores.objects.public_url(&storage_key);

    let inserted = stores
        .metadata
        .insert_document(NewDocument {
            id: Uuid::new_v4(),
            title,
            description,
            file_name: file.file_name,
            storage_key: storage_key.clone(),
            public_url,
            size_bytes,
            mime_type,
            facility_id,
            uploaded_by: caller.identity_id,
            active: true,
        })
        .await;

    let document = match inserted {
        Ok(document) => document,
        Err(err) => {
            error!(
                error = %err,
                storage_key = %storage_key,
                facility_id = %facility_id,
                "document row insert failed after object upload; removing orphaned object"
            );
            if let Err(cleanup) = stores.objects.delete_object(&storage_key).await {
                error!(
                    error = %cleanup,
                    storage_key = %storage_key,
                    "orphaned object could not be removed"
                );
            }
            return Err(err.into());
        }
    };

    info!(
        document_id = %document.id,
        facility_id = %facility_id,
        storage_key = %document.storage_key,
        size_bytes = document.size_bytes,
        "document published"
    );
    Ok(document)
}

/// Deletes the object first and the row second, so a row is never lost while its object
/// still exists.
pub async fn retire(stores: &Stores, caller: &Caller, document_id: Uuid) -> EngineResult<()> {
    let document = stores
        .metadata
        .document(document_id)
        .await?
        .ok_or(EngineError::NotFound("document"))?;

    gate::require_facility_access(stores, caller, document.facility_id).await?;

    stores
        .objects
        .delete_object(&document.storage_key)
        .await
        .map_err(|err| {
            warn!(
                error = %err,
                document_id = %document_id,
                storage_key = %document.storage_key,
                "object deletion failed; keeping document row"
            );
            EngineError::from(err)
        })?;

    match stores.metadata.delete_document(document_id).await {
        Ok(true) => {}
        Ok(false) => debug!(document_id = %document_id, "document row already removed"),
        Err(err) => {
            error!(
                error = %err,
                document_id = %document_id,
                storage_key = %document.storage_key,
                "object deleted but document row remains"
            );
            return Err(EngineError::Incomplete {
                operation: "retire document",
                completed: vec!["object deleted"],
                message: err.to_string(),
            });
        }
    }

    info!(
        document_id = %document_id,
        facility_id = %document.facility_id,
        "document retired"
    );
    Ok(())
}

pub async fn active_document(
    stores: &Stores,
    facility_id: Uuid,
) -> EngineResult<Option<Document>> {
    let mut active = stores.metadata.active_documents(facility_id).await?;
    if active.len() > 1 {
        warn!(
            facility_id = %facility_id,
            count = active.len(),
            "facility has more than one active document"
        );
    }
    Ok(if active.is_empty() {
        None
    } else {
        Some(active.swap_remove(0))
    })
}

pub async fn documents_for_facility(
    stores: &Stores,
    caller: &Caller,
    facility_id: Uuid,
) -> EngineResult<Vec<Document>> {
    gate::require_facility_access(stores, caller, facility_id).await?;
    Ok(stores.metadata.documents_for_facility(facility_id).await?)
}

pub async fn document_content(
    stores: &Stores,
    caller: &Caller,
    document_id: Uuid,
) -> EngineResult<(Document, Vec<u8>)> {
    let document = stores
        .metadata
        .document(document_id)
        .await?
        .ok_or(EngineError::NotFound("document"))?;

    gate::require_facility_access(stores, caller, document.facility_id).await?;

    let bytes = stores
        .objects
        .get_object(&document.storage_key)
        .await?;

    Ok((document, bytes))
}

/// `documents/<facility>/<unix millis>-<suffix>[.<ext>]`
pub fn storage_key(
    facility_id: Uuid,
    file_name: &str,
    timestamp_millis: i64,
    suffix: &str,
) -> String {
    match file_extension(file_name) {
        Some(ext) => format!("{STORAGE_PREFIX}/{facility_id}/{timestamp_millis}-{suffix}.{ext}"),
        None => format!("{STORAGE_PREFIX}/{facility_id}/{timestamp_millis}-{suffix}"),
    }
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect()
}

fn file_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|ch| ch.is_ascii_alphanumeric())
        })
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn inline_content_disposition(filename: &str) -> Option<String> {
    if filename.is_empty() {
        return None;
    }

    let sanitized: String = filename
        .chars()
        .map(|ch| match ch {
            '"' | '\\' => '_',
            _ => ch,
        })
        .collect();

    let encoded =
        percent_encoding::utf8_percent_encode(&sanitized, percent_encoding::NON_ALPHANUMERIC);
    Some(format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    ))
}
