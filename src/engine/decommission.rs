//! Ordered, best-effort removal of an identity or a facility and everything hanging off it.

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::gate::{self, Caller};
use super::{assignments, EngineError, EngineResult, Stores};
use crate::credentials::CredentialError;

#[derive(Debug, Clone, Default, Serialize)]
pub struct IdentityDecommissionReport {
    pub documents_removed: usize,
    pub objects_removed: usize,
    /// Keys whose object deletion failed; their rows were removed anyway.
    pub failed_object_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FacilityDecommissionReport {
    pub assignments_removed: usize,
    pub documents_removed: usize,
    /// Objects of the removed documents. They stay in the bucket until removed by hand.
    pub orphaned_object_keys: Vec<String>,
}

/// Removes an identity's documents (objects, then rows) and finally the identity itself.
///
/// Object failures do not stop the sequence. A failed account deletion returns
/// [`EngineError::Incomplete`]; running the call again is safe and only retries what is left.
pub async fn delete_identity(
    stores: &Stores,
    caller: &Caller,
    identity_id: Uuid,
) -> EngineResult<IdentityDecommissionReport> {
    gate::require_admin(caller)?;
    if caller.identity_id == identity_id {
        return Err(EngineError::Validation(
            "administrators cannot delete their own account".to_string(),
        ));
    }

    let documents = stores.metadata.documents_by_uploader(identity_id).await?;
    let mut report = IdentityDecommissionReport::default();

    for document in &documents {
        match stores.objects.delete_object(&document.storage_key).await {
            Ok(()) => report.objects_removed += 1,
            Err(err) => {
                warn!(
                    error = %err,
                    identity_id = %identity_id,
                    storage_key = %document.storage_key,
                    "object deletion failed; continuing"
                );
                report.failed_object_keys.push(document.storage_key.clone());
            }
        }
    }

    report.documents_removed = stores
        .metadata
        .delete_documents_by_uploader(identity_id)
        .await
        .map_err(|err| EngineError::Incomplete {
            operation: "delete identity",
            completed: vec!["objects deleted"],
            message: err.to_string(),
        })?;

    match stores.credentials.delete_account(identity_id).await {
        Ok(()) => {}
        Err(CredentialError::NotFound) if report.documents_removed > 0 => {
            warn!(identity_id = %identity_id, "account already gone; removed leftover documents");
        }
        Err(CredentialError::NotFound) => return Err(EngineError::NotFound("identity")),
        Err(err) => {
            error!(
                error = %err,
                identity_id = %identity_id,
                documents_removed = report.documents_removed,
                "documents removed but account deletion failed"
            );
            return Err(EngineError::Incomplete {
                operation: "delete identity",
                completed: vec!["objects deleted", "document rows deleted"],
                message: err.to_string(),
            });
        }
    }

    info!(
        identity_id = %identity_id,
        documents_removed = report.documents_removed,
        objects_removed = report.objects_removed,
        failed_objects = report.failed_object_keys.len(),
        "identity decommissioned"
    );
    Ok(report)
}

/// Removes a facility's assignments, document rows and the facility row.
///
/// Storage objects are left in place and reported in
/// [`FacilityDecommissionReport::orphaned_object_keys`].
pub async fn delete_facility(
    stores: &Stores,
    caller: &Caller,
    facility_id: Uuid,
) -> EngineResult<FacilityDecommissionReport> {
    gate::require_admin(caller)?;

    if stores.metadata.facility(facility_id).await?.is_none() {
        return Err(EngineError::NotFound("facility"));
    }

    let mut report = FacilityDecommissionReport {
        assignments_removed: assignments::unassign_facility(stores, facility_id).await?,
        ..Default::default()
    };

    let removed = stores
        .metadata
        .delete_documents_for_facility(facility_id)
        .await
        .map_err(|err| EngineError::Incomplete {
            operation: "delete facility",
            completed: vec!["assignments deleted"],
            message: err.to_string(),
        })?;
    report.documents_removed = removed.len();
    report.orphaned_object_keys = removed
        .into_iter()
        .map(|document| document.storage_key)
        .collect();
    for key in &report.orphaned_object_keys {
        warn!(facility_id = %facility_id, storage_key = %key, "object left without document row");
    }

    let deleted = stores
        .metadata
        .delete_facility(facility_id)
        .await
        .map_err(|err| EngineError::Incomplete {
            operation: "delete facility",
            completed: vec!["assignments deleted", "document rows deleted"],
            message: err.to_string(),
        })?;
    if !deleted {
        warn!(facility_id = %facility_id, "facility row vanished during deletion");
    }

    info!(
        facility_id = %facility_id,
        assignments_removed = report.assignments_removed,
        documents_removed = report.documents_removed,
        "facility decommissioned"
    );
    Ok(report)
}
