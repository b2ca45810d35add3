use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    auth::AuthenticatedUser,
    engine::{gate::Caller, EngineError},
    error::{AppError, AppResult},
    state::AppState,
};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let session = state
        .stores
        .credentials
        .sign_in(&payload.email, &payload.password)
        .await
        .map_err(EngineError::from)?;

    // A deactivated or profile-less account holds valid credentials but no access.
    let profile = state
        .stores
        .metadata
        .profile(session.identity_id)
        .await
        .map_err(EngineError::from)?;
    if !profile.is_some_and(|profile| profile.active) {
        return Err(AppError::unauthorized());
    }

    info!(identity_id = %session.identity_id, "signed in");
    Ok(Json(LoginResponse {
        access_token: session.access_token,
        token_type: "Bearer".to_string(),
        expires_in: session.expires_in,
    }))
}

pub async fn me(AuthenticatedUser(caller): AuthenticatedUser) -> Json<Caller> {
    Json(caller)
}
