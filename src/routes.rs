// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers::quiz, state::AppState, utils::jwt::auth_middleware};

/// Assembles the main application router.
///
/// * Session routes are open: anonymous users may take a quiz; only the
///   attempt-history route requires a token.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, session registry).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let quiz_routes = Router::new()
        .route("/categories", get(quiz::list_categories))
        .route("/sessions", post(quiz::start_session))
        .route(
            "/sessions/{id}",
            get(quiz::get_session).delete(quiz::discard_session),
        )
        .route("/sessions/{id}/answers", post(quiz::record_answer))
        .route("/sessions/{id}/next", post(quiz::go_next))
        .route("/sessions/{id}/previous", post(quiz::go_previous))
        .route("/sessions/{id}/jump", post(quiz::jump_to))
        .route("/sessions/{id}/submit", post(quiz::submit_session))
        .route("/sessions/{id}/result", get(quiz::get_result))
        .route("/sessions/{id}/retake", post(quiz::retake_session))
        // Protected routes
        .merge(
            Router::new()
                .route("/attempts", get(quiz::list_attempts))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    Router::new()
        .nest("/api/quiz", quiz_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
