//! services/api/src/web/router.rs
//!
//! Builds the Axum router: public routes, role-gated staff routes, the body
//! limit and CORS.

use crate::config::Config;
use crate::error::ApiError;
use crate::web::{
    middleware::{require_staff, ROLE_HEADER},
    rest::{
        create_class_handler, create_exam_handler, create_result_handler, create_session_handler,
        delete_class_handler, delete_exam_handler, delete_result_handler, delete_session_handler,
        get_result_handler, import_errors_handler, import_status_handler, import_template_handler,
        list_classes_handler, list_exams_handler, list_sessions_handler, search_results_handler,
        start_import_handler, update_class_handler, update_exam_handler, update_result_handler,
        update_session_handler,
    },
    state::AppState,
    ws_handler::import_ws_handler,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// The request body limit for an upload of at most `max_upload_bytes`.
pub fn upload_body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES)
}

/// CORS for the configured browser origin, which sends the role header itself
/// when no proxy sits in front of the API.
pub fn cors_layer(config: &Config) -> Result<CorsLayer, ApiError> {
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT, HeaderName::from_static(ROLE_HEADER)]))
}

pub fn create_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let cors = cors_layer(&app_state.config)?;
    let body_limit = upload_body_limit(app_state.config.max_upload_bytes);

    // Public routes (no role required)
    let public_routes = Router::new()
        .route("/results/search", get(search_results_handler))
        .route("/sessions", get(list_sessions_handler))
        .route("/imports/template.xlsx", get(import_template_handler));

    // Staff routes (admin or staff role required)
    let staff_routes = Router::new()
        .route("/imports", post(start_import_handler))
        .route("/imports/{id}", get(import_status_handler))
        .route("/imports/{id}/errors.xlsx", get(import_errors_handler))
        .route("/imports/{id}/ws", get(import_ws_handler))
        .route("/results", post(create_result_handler))
        .route(
            "/results/{id}",
            get(get_result_handler)
                .put(update_result_handler)
                .delete(delete_result_handler),
        )
        .route("/sessions", post(create_session_handler))
        .route(
            "/sessions/{id}",
            put(update_session_handler).delete(delete_session_handler),
        )
        .route("/classes", get(list_classes_handler).post(create_class_handler))
        .route(
            "/classes/{id}",
            put(update_class_handler).delete(delete_class_handler),
        )
        .route("/exams", get(list_exams_handler).post(create_exam_handler))
        .route(
            "/exams/{id}",
            put(update_exam_handler).delete(delete_exam_handler),
        )
        .layer(axum_middleware::from_fn(require_staff));

    Ok(Router::new()
        .merge(public_routes)
        .merge(staff_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(app_state))
}
