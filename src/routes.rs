// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, auth, preferences, quiz, results},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Public routes: registration, login, share-link lookup and quiz playing.
/// * Everything else sits behind `auth_middleware`.
/// * Applies global middleware (Trace, CORS) and injects the shared state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        // Protected auth routes
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .route("/me", get(auth::me))
                .layer(auth_layer.clone()),
        );

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes).post(quiz::create_quiz))
        .route("/{id}", get(quiz::get_quiz).delete(quiz::delete_quiz))
        .route("/{id}/share", get(quiz::share_quiz))
        .layer(auth_layer.clone());

    // Participants do not need an account; the start handler reads the token itself
    let attempt_routes = Router::new()
        .route("/", post(attempt::start_attempt))
        .route("/{id}", get(attempt::get_attempt).delete(attempt::leave))
        .route("/{id}/participant", post(attempt::submit_participant))
        .route("/{id}/select", post(attempt::select_option))
        .route("/{id}/next", post(attempt::next_question))
        .route("/{id}/retake", post(attempt::retake))
        .route("/{id}/answer-key", get(attempt::answer_key));

    let result_routes = Router::new()
        .route("/", get(results::leaderboard))
        .route("/export", get(results::export_leaderboard))
        .layer(auth_layer.clone());

    let preference_routes = Router::new()
        .route(
            "/theme",
            get(preferences::get_theme).put(preferences::set_theme),
        )
        .layer(auth_layer);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/results", result_routes)
        .nest("/api/preferences", preference_routes)
        .route("/api/play", get(quiz::play_lookup))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
