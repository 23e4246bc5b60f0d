pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod sse;

use std::sync::Arc;

use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Router;

use self::handlers::AppState;
use self::middleware::ApiAuth;

/// Build the axum router with public and protected route split.
pub fn build_router(state: Arc<AppState>, auth: ApiAuth) -> Router {
    let auth = Arc::new(auth);

    // Public routes (no auth)
    let public_routes = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health));

    // Protected routes (with auth middleware)
    let protected_routes = Router::new()
        .route("/v1/models", get(handlers::models))
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .layer(axum_middleware::from_fn_with_state(
            auth.clone(),
            |state: axum::extract::State<Arc<ApiAuth>>,
             req: axum::extract::Request,
             next: axum_middleware::Next| {
                middleware::auth_middleware(state.0, req, next)
            },
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(axum_middleware::from_fn(logging::logging_middleware))
        .with_state(state)
}
