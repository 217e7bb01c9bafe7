use crate::infrastructure::http::controllers::{conversations, messages, system};
use crate::infrastructure::http::middleware::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/conversations", get(conversations::list_conversations))
        .route("/api/conversations/:id", get(conversations::get_conversation))
        .route(
            "/api/conversations/:id/messages",
            get(conversations::list_messages).post(messages::process_message),
        )
        .route(
            "/api/conversations/:id/assign",
            post(conversations::assign_conversation),
        )
        .route(
            "/api/conversations/:id/escalate",
            post(conversations::escalate_conversation),
        )
        .route(
            "/api/conversations/:id/ai-mode",
            put(conversations::set_ai_mode),
        )
        .route(
            "/api/conversations/:id/close",
            post(conversations::close_conversation),
        )
        .route("/api/conversations/:id/logout", post(conversations::logout))
        .route("/api/metrics/summary", get(system::metrics_summary))
        .route("/api/cache/invalidate", post(system::invalidate_cache));

    Router::new()
        .route("/health", get(system::health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
