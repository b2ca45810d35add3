//! Caller identity and role checks that run before any privileged mutation.

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{EngineError, EngineResult, Stores};
use crate::models::Role;

/// An authenticated identity with the role recorded in its profile.
#[derive(Debug, Clone, Serialize)]
pub struct Caller {
    pub identity_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Resolves a bearer credential to a [`Caller`].
///
/// The role always comes from the profile row, never from the token, so a demoted or
/// deactivated account loses access without waiting for its token to expire.
pub async fn authenticate(stores: &Stores, token: &str) -> EngineResult<Caller> {
    let identity_id = stores
        .credentials
        .account_by_token(token)
        .await
        .map_err(|err| {
            debug!(error = %err, "bearer credential rejected");
            EngineError::Unauthenticated
        })?;

    let profile = stores
        .metadata
        .profile(identity_id)
        .await?
        .ok_or(EngineError::Unauthenticated)?;

    if !profile.active {
        debug!(identity_id = %identity_id, "inactive profile attempted access");
        return Err(EngineError::Unauthenticated);
    }

    let role = profile.role().ok_or_else(|| {
        warn!(identity_id = %identity_id, role = %profile.role, "profile has unknown role");
        EngineError::Unauthenticated
    })?;

    Ok(Caller {
        identity_id,
        email: profile.email,
        full_name: profile.full_name,
        role,
    })
}

pub fn require_admin(caller: &Caller) -> EngineResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(EngineError::Permission("admin role required".to_string()))
    }
}

/// Admins reach every facility; staff only the facility they are assigned to.
pub async fn require_facility_access(
    stores: &Stores,
    caller: &Caller,
    facility_id: Uuid,
) -> EngineResult<()> {
    if caller.is_admin() {
        return Ok(());
    }

    let assigned = stores
        .metadata
        .assignment_for_facility(facility_id)
        .await?
        .is_some_and(|assignment| assignment.identity_id == caller.identity_id);

    if assigned {
        Ok(())
    } else {
        Err(EngineError::Permission(
            "account is not assigned to this facility".to_string(),
        ))
    }
}
