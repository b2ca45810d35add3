use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::documents::{to_iso, DocumentResponse};
use crate::auth::AuthenticatedUser;
use crate::engine::decommission::{self, FacilityDecommissionReport};
use crate::engine::facilities::{self, FacilityInput};
use crate::error::{AppError, AppResult};
use crate::models::{Facility, FacilityChangeset};
use crate::state::AppState;
use crate::utils::json::{nullable_text, optional_bool, required_text};

#[derive(Deserialize)]
pub struct CreateFacilityRequest {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub responsible_person: Option<String>,
    pub operating_hours: Option<String>,
}

#[derive(Serialize, Clone)]
pub struct FacilityResponse {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub responsible_person: Option<String>,
    pub operating_hours: Option<String>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Facility> for FacilityResponse {
    fn from(facility: Facility) -> Self {
        Self {
            id: facility.id,
            name: facility.name,
            address: facility.address,
            phone: facility.phone,
            email: facility.email,
            responsible_person: facility.responsible_person,
            operating_hours: facility.operating_hours,
            active: facility.active,
            created_at: to_iso(facility.created_at),
            updated_at: to_iso(facility.updated_at),
        }
    }
}

#[derive(Serialize)]
pub struct FacilityWithDocumentResponse {
    pub facility: FacilityResponse,
    pub document: Option<DocumentResponse>,
}

pub async fn list_facilities(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> AppResult<Json<Vec<FacilityResponse>>> {
    let facilities = facilities::list(&state.stores, &caller).await?;
    Ok(Json(facilities.into_iter().map(Into::into).collect()))
}

pub async fn create_facility(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Json(payload): Json<CreateFacilityRequest>,
) -> AppResult<(StatusCode, Json<FacilityResponse>)> {
    let input = FacilityInput {
        name: payload.name,
        address: payload.address,
        phone: payload.phone,
        email: payload.email,
        responsible_person: payload.responsible_person,
        operating_hours: payload.operating_hours,
    };
    let facility = facilities::create(&state.stores, &caller, input).await?;
    Ok((StatusCode::CREATED, Json(facility.into())))
}

pub async fn update_facility(
    State(state): State<AppState>,
    Path(facility_id): Path<Uuid>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Json(body): Json<Value>,
) -> AppResult<Json<FacilityResponse>> {
    let changes = FacilityChangeset {
        name: required_text(&body, "name").map_err(AppError::bad_request)?,
        address: required_text(&body, "address").map_err(AppError::bad_request)?,
        phone: nullable_text(&body, "phone").map_err(AppError::bad_request)?,
        email: nullable_text(&body, "email").map_err(AppError::bad_request)?,
        responsible_person: nullable_text(&body, "responsible_person")
            .map_err(AppError::bad_request)?,
        operating_hours: nullable_text(&body, "operating_hours")
            .map_err(AppError::bad_request)?,
        active: optional_bool(&body, "active").map_err(AppError::bad_request)?,
    };

    let facility = facilities::update(&state.stores, &caller, facility_id, changes).await?;
    Ok(Json(facility.into()))
}

pub async fn delete_facility(
    State(state): State<AppState>,
    Path(facility_id): Path<Uuid>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> AppResult<Json<FacilityDecommissionReport>> {
    let report = decommission::delete_facility(&state.stores, &caller, facility_id).await?;
    Ok(Json(report))
}
