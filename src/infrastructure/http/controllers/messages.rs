use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    domain::entities::ProcessMessageRequest,
    infrastructure::http::middleware::AppState,
};

/// Inbound customer message from a channel adapter.
///
/// The body is always a `ProcessMessageResponse`. Rejected input answers 400,
/// a failed pipeline answers 500 with the degraded reply and quick replies.
pub async fn process_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(request): Json<ProcessMessageRequest>,
) -> impl IntoResponse {
    let response = state
        .message_service
        .process_message(&conversation_id, request)
        .await;

    let status = if response.success {
        StatusCode::OK
    } else if response.metadata.source.is_none() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, Json(response))
}
