pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;

use crate::engine::gate::{self, Caller};
use crate::{error::AppError, state::AppState};

/// Bearer-authenticated caller, resolved through the credential store and profile on every
/// request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Caller);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized())?;

        let caller = gate::authenticate(&state.stores, bearer.token()).await?;
        Ok(AuthenticatedUser(caller))
    }
}
