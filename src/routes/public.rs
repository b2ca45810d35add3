//! Unauthenticated listing of facilities and their published documents.

use axum::{
    extract::{Json, Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
};
use uuid::Uuid;

use super::facilities::FacilityWithDocumentResponse;
use crate::engine::facilities;
use crate::error::{AppError, AppResult};
use crate::qr;
use crate::state::AppState;

pub async fn list_published(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<FacilityWithDocumentResponse>>> {
    let listing = facilities::published(&state.stores).await?;
    Ok(Json(
        listing
            .into_iter()
            .map(|entry| FacilityWithDocumentResponse {
                facility: entry.facility.into(),
                document: entry.document.map(Into::into),
            })
            .collect(),
    ))
}

pub async fn facility_qr_code(
    State(state): State<AppState>,
    Path(facility_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let url = facilities::published_url(&state.stores, facility_id).await?;
    let png = tokio::task::spawn_blocking(move || qr::encode_url_as_png(&url))
        .await
        .map_err(|err| AppError::internal(format!("QR encoding task failed: {err}")))??;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=300"),
    );
    Ok((headers, png))
}
