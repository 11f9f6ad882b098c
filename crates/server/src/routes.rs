use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::gateway;

pub mod auth;
pub mod tasks;
pub mod web;

pub use auth::ServerState;

/// Build the full application router: the three route groups plus the
/// gateway layers (HTTPS enforcement, CORS, request tracing).
pub fn build_router(cors: CorsLayer, state: ServerState) -> Router {
    // Browser-facing routes at the root
    let web_routes = Router::new()
        .route("/", get(web::index))
        .route("/health", get(web::health));

    // Task CRUD, caller must be authenticated
    let task_routes = Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/:id",
            get(tasks::get_task).put(tasks::update_task).delete(tasks::delete_task),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    Router::new()
        .merge(web_routes)
        .nest("/tasks", task_routes)
        .nest("/auth", auth_routes)
        .with_state(state.clone())
        .layer(cors)
        // Outside CORS so the transport check sees every request, preflights
        // included, before anything else answers.
        .layer(middleware::from_fn_with_state(state, gateway::enforce_https))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
