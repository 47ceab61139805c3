//! HTTP routes
//!
//! Two routers, one per listener:
//! - API: capture endpoints (`/send`, optional Twilio route) and `/health`
//! - Web: query/delete API under `/api/v1`, stats, and the `/ws` feed
//!
//! Both get the same middleware stack: request tracing, CORS (answers
//! preflights before anything else runs), then the shared-secret check.

mod health;
mod messages;
mod middleware;
mod send;
mod ws;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Twilio's Messages resource path
pub const TWILIO_MESSAGES_PATH: &str = "/2010-04-01/Accounts/:account_sid/Messages.json";

/// Router for the capture listener
pub fn api_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/send", post(send::send))
        .route("/health", get(health::health));

    if state.config.twilio_compat {
        router = router.route(TWILIO_MESSAGES_PATH, post(send::twilio_send));
    }

    with_middleware(router, state)
}

/// Router for the web/query listener
pub fn web_router(state: AppState) -> Router {
    let router = Router::new()
        .route(
            "/api/v1/messages",
            get(messages::list_messages).delete(messages::delete_messages),
        )
        .route("/api/v1/messages/search", get(messages::search_messages))
        .route(
            "/api/v1/messages/:id",
            get(messages::get_message).delete(messages::delete_message),
        )
        .route("/api/v1/stats", get(health::stats))
        .route("/api/v1/health", get(health::health))
        .route("/ws", get(ws::ws_handler));

    with_middleware(router, state)
}

// Order matters - last added runs first
fn with_middleware(router: Router<AppState>, state: AppState) -> Router {
    router
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::cors,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
