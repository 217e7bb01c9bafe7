use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    application::services::LogoutResponse,
    domain::entities::{
        AssignRequest, Conversation, ConversationFilter, ConversationListResponse,
        EscalateRequest, Message, SetAiModeRequest,
    },
    infrastructure::http::middleware::{ApiResult, AppState},
};

#[derive(Debug, Deserialize)]
pub struct MessageListQuery {
    pub limit: Option<i64>,
}

// GET /api/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(filter): Query<ConversationFilter>,
) -> ApiResult<Json<ConversationListResponse>> {
    let conversations = state.conversation_service.get_conversations(filter).await?;
    Ok(Json(conversations))
}

// GET /api/conversations/:id
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Conversation>> {
    let conversation = state.conversation_service.get_conversation(&id).await?;
    Ok(Json(conversation))
}

// GET /api/conversations/:id/messages?limit=
pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<MessageListQuery>,
) -> ApiResult<Json<Vec<Message>>> {
    let messages = state
        .conversation_service
        .get_messages(&id, query.limit)
        .await?;
    Ok(Json(messages))
}

// POST /api/conversations/:id/assign
pub async fn assign_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AssignRequest>,
) -> ApiResult<Json<Conversation>> {
    let conversation = state
        .conversation_service
        .assign(&id, &request.agent_id)
        .await?;
    Ok(Json(conversation))
}

// POST /api/conversations/:id/escalate
pub async fn escalate_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<EscalateRequest>,
) -> ApiResult<Json<Conversation>> {
    let conversation = state.conversation_service.escalate(&id, request).await?;
    Ok(Json(conversation))
}

// PUT /api/conversations/:id/ai-mode
pub async fn set_ai_mode(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SetAiModeRequest>,
) -> ApiResult<Json<Conversation>> {
    let conversation = state
        .conversation_service
        .set_ai_mode(&id, request.mode)
        .await?;
    Ok(Json(conversation))
}

// POST /api/conversations/:id/close
pub async fn close_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Conversation>> {
    let conversation = state.conversation_service.close(&id).await?;
    Ok(Json(conversation))
}

// POST /api/conversations/:id/logout
pub async fn logout(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<LogoutResponse>> {
    let response = state.conversation_service.logout(&id).await?;
    Ok(Json(response))
}
