use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;

pub mod auth;
pub mod documents;
pub mod facilities;
pub mod health;
pub mod public;
pub mod users;

// Room for the multipart framing and text fields around the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed
                    .parse::<HeaderValue>()
                    .inspect_err(|_| warn!(origin = %trimmed, "ignoring invalid CORS origin"))
                    .ok()
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(headers))
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let public_routes = Router::new()
        .route("/facilities", get(public::list_published))
        .route("/facilities/:id/qr", get(public::facility_qr_code));

    let facilities_routes = Router::new()
        .route(
            "/",
            get(facilities::list_facilities).post(facilities::create_facility),
        )
        .route(
            "/:id",
            delete(facilities::delete_facility).patch(facilities::update_facility),
        )
        .route(
            "/:id/documents",
            get(documents::list_facility_documents).post(documents::upload_document),
        )
        .route("/:id/document", get(documents::active_facility_document));

    let documents_routes = Router::new()
        .route("/:id", delete(documents::delete_document))
        .route("/:id/content", get(documents::document_content));

    let users_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/:id", delete(users::delete_user))
        .route(
            "/:id/assignment",
            post(users::assign_facility).delete(users::unassign_facility),
        );

    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/public", public_routes)
        .nest("/api/facilities", facilities_routes)
        .nest("/api/documents", documents_routes)
        .nest("/api/users", users_routes)
        .route("/api/me/facility", get(users::own_facility))
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(body_limit))
}
