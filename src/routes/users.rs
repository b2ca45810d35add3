use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::documents::{to_iso, DocumentResponse};
use super::facilities::FacilityResponse;
use crate::auth::AuthenticatedUser;
use crate::engine::assignments::{self, StaffMember};
use crate::engine::decommission::{self, IdentityDecommissionReport};
use crate::engine::provisioning::{self, StaffAccountRequest};
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub facility_id: Uuid,
}

#[derive(Deserialize)]
pub struct AssignFacilityRequest {
    pub facility_id: Uuid,
}

#[derive(Serialize)]
pub struct CreateUserResponse {
    pub id: Uuid,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub active: bool,
    pub created_at: String,
    pub facility: Option<FacilityResponse>,
}

impl From<StaffMember> for UserResponse {
    fn from(member: StaffMember) -> Self {
        Self {
            id: member.profile.identity_id,
            email: member.profile.email,
            full_name: member.profile.full_name,
            role: member.profile.role,
            active: member.profile.active,
            created_at: to_iso(member.profile.created_at),
            facility: member.facility.map(Into::into),
        }
    }
}

#[derive(Serialize)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub identity_id: Uuid,
    pub facility_id: Uuid,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct OwnFacilityResponse {
    pub facility: Option<FacilityResponse>,
    pub documents: Vec<DocumentResponse>,
}

pub async fn list_users(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> AppResult<Json<Vec<UserResponse>>> {
    let staff = assignments::staff_directory(&state.stores, &caller).await?;
    Ok(Json(staff.into_iter().map(Into::into).collect()))
}

pub async fn create_user(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<CreateUserResponse>)> {
    let request = StaffAccountRequest {
        email: payload.email,
        password: payload.password,
        full_name: payload.full_name,
        facility_id: payload.facility_id,
    };
    let id = provisioning::create_staff_account(&state.stores, &caller, request).await?;
    info!(identity_id = %id, created_by = %caller.identity_id, "staff account created");
    Ok((StatusCode::CREATED, Json(CreateUserResponse { id })))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(identity_id): Path<Uuid>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> AppResult<Json<IdentityDecommissionReport>> {
    let report = decommission::delete_identity(&state.stores, &caller, identity_id).await?;
    Ok(Json(report))
}

pub async fn assign_facility(
    State(state): State<AppState>,
    Path(identity_id): Path<Uuid>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Json(payload): Json<AssignFacilityRequest>,
) -> AppResult<(StatusCode, Json<AssignmentResponse>)> {
    let assignment =
        assignments::link_staff(&state.stores, &caller, identity_id, payload.facility_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(AssignmentResponse {
            id: assignment.id,
            identity_id: assignment.identity_id,
            facility_id: assignment.facility_id,
            created_at: to_iso(assignment.created_at),
        }),
    ))
}

pub async fn unassign_facility(
    State(state): State<AppState>,
    Path(identity_id): Path<Uuid>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> AppResult<StatusCode> {
    assignments::unlink_staff(&state.stores, &caller, identity_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn own_facility(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> AppResult<Json<OwnFacilityResponse>> {
    let response = match assignments::own_facility(&state.stores, &caller).await? {
        Some((facility, documents)) => OwnFacilityResponse {
            facility: Some(facility.into()),
            documents: documents.into_iter().map(Into::into).collect(),
        },
        None => OwnFacilityResponse {
            facility: None,
            documents: Vec::new(),
        },
    };
    Ok(Json(response))
}
