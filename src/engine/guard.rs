//! Read-only invariant checks.
//!
//! These are early rejections only. The metadata store re-enforces both invariants on the
//! guarded insert, so a write that races past a check still fails with a conflict.

use uuid::Uuid;

use super::{EngineResult, Stores};

pub async fn has_active_document(stores: &Stores, facility_id: Uuid) -> EngineResult<bool> {
    Ok(stores.metadata.has_active_document(facility_id).await?)
}

pub async fn has_assignment(stores: &Stores, facility_id: Uuid) -> EngineResult<bool> {
    Ok(stores.metadata.has_assignment(facility_id).await?)
}
