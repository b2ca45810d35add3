//! The one-account-per-facility edge.

use std::collections::HashMap;

use tracing::info;
use uuid::Uuid;

use super::gate::{self, Caller};
use super::{guard, EngineError, EngineResult, Stores, ASSIGNMENT_CONFLICT};
use crate::models::{Assignment, Document, Facility, NewAssignment, Profile, Role};

/// A staff profile with the facility it is linked to, if any.
#[derive(Debug, Clone)]
pub struct StaffMember {
    pub profile: Profile,
    pub facility: Option<Facility>,
}

/// Links an identity to a facility. The guard rejects early; the store's uniqueness rule
/// rejects a concurrent writer that slipped past it.
pub async fn assign(
    stores: &Stores,
    identity_id: Uuid,
    facility_id: Uuid,
) -> EngineResult<Assignment> {
    if guard::has_assignment(stores, facility_id).await? {
        return Err(EngineError::Conflict(ASSIGNMENT_CONFLICT.to_string()));
    }

    let assignment = stores
        .metadata
        .insert_assignment(NewAssignment {
            id: Uuid::new_v4(),
            identity_id,
            facility_id,
        })
        .await?;

    info!(
        assignment_id = %assignment.id,
        identity_id = %identity_id,
        facility_id = %facility_id,
        "assignment created"
    );
    Ok(assignment)
}

pub async fn unassign_identity(stores: &Stores, identity_id: Uuid) -> EngineResult<usize> {
    let removed = stores
        .metadata
        .delete_assignments_for_identity(identity_id)
        .await?;
    if removed > 0 {
        info!(identity_id = %identity_id, removed, "identity unassigned");
    }
    Ok(removed)
}

pub async fn unassign_facility(stores: &Stores, facility_id: Uuid) -> EngineResult<usize> {
    let removed = stores
        .metadata
        .delete_assignments_for_facility(facility_id)
        .await?;
    if removed > 0 {
        info!(facility_id = %facility_id, removed, "facility unassigned");
    }
    Ok(removed)
}

pub async fn assignment_for_identity(
    stores: &Stores,
    identity_id: Uuid,
) -> EngineResult<Option<Assignment>> {
    Ok(stores.metadata.assignment_for_identity(identity_id).await?)
}

pub async fn list_assignments(stores: &Stores) -> EngineResult<Vec<Assignment>> {
    Ok(stores.metadata.list_assignments().await?)
}

/// Admin-facing link of an existing staff account to a facility.
pub async fn link_staff(
    stores: &Stores,
    caller: &Caller,
    identity_id: Uuid,
    facility_id: Uuid,
) -> EngineResult<Assignment> {
    gate::require_admin(caller)?;

    let profile = stores
        .metadata
        .profile(identity_id)
        .await?
        .ok_or(EngineError::NotFound("identity"))?;
    if profile.role() != Some(Role::Staff) {
        return Err(EngineError::Validation(
            "only staff accounts can be assigned to a facility".to_string(),
        ));
    }
    if stores.metadata.facility(facility_id).await?.is_none() {
        return Err(EngineError::NotFound("facility"));
    }

    assign(stores, identity_id, facility_id).await
}

/// Admin-facing removal of every facility link an account holds.
pub async fn unlink_staff(
    stores: &Stores,
    caller: &Caller,
    identity_id: Uuid,
) -> EngineResult<usize> {
    gate::require_admin(caller)?;
    unassign_identity(stores, identity_id).await
}

/// Staff profiles with their facility, for the admin user list.
pub async fn staff_directory(stores: &Stores, caller: &Caller) -> EngineResult<Vec<StaffMember>> {
    gate::require_admin(caller)?;

    let profiles = stores.metadata.list_profiles(Role::Staff).await?;
    let facilities: HashMap<Uuid, Facility> = stores
        .metadata
        .list_facilities(false)
        .await?
        .into_iter()
        .map(|facility| (facility.id, facility))
        .collect();
    let assigned: HashMap<Uuid, Uuid> = list_assignments(stores)
        .await?
        .into_iter()
        .map(|assignment| (assignment.identity_id, assignment.facility_id))
        .collect();

    Ok(profiles
        .into_iter()
        .map(|profile| {
            let facility = assigned
                .get(&profile.identity_id)
                .and_then(|facility_id| facilities.get(facility_id))
                .cloned();
            StaffMember { profile, facility }
        })
        .collect())
}

/// The caller's own facility and its documents, newest first.
pub async fn own_facility(
    stores: &Stores,
    caller: &Caller,
) -> EngineResult<Option<(Facility, Vec<Document>)>> {
    let Some(assignment) = assignment_for_identity(stores, caller.identity_id).await? else {
        return Ok(None);
    };
    let facility = stores
        .metadata
        .facility(assignment.facility_id)
        .await?
        .ok_or(EngineError::NotFound("facility"))?;
    let documents = stores
        .metadata
        .documents_for_facility(assignment.facility_id)
        .await?;
    Ok(Some((facility, documents)))
}
