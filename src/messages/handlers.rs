use axum::{
    extract::State,
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::repo_types::{Message, Thread};
use crate::{
    auth::{extractors::AuthUser, repo_types::User},
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    state::AppState,
};

pub const MAX_BODY_LEN: usize = 5000;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/messages", get(list_messages).post(send_message))
        .route("/messages/threads", get(list_threads))
        .route("/messages/with/:user_id", get(conversation))
        .route("/messages/:id", delete(delete_message))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub to: i64,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct ThreadsResponse {
    pub threads: Vec<Thread>,
}

fn validate_body(raw: &str) -> ApiResult<&str> {
    let body = raw.trim();
    if body.is_empty() {
        return Err(ApiError::bad_request("Message body is required"));
    }
    if body.chars().count() > MAX_BODY_LEN {
        return Err(ApiError::bad_request("Message body is too long"));
    }
    Ok(body)
}

#[instrument(skip(state, payload))]
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<SendMessageRequest>,
) -> ApiResult<Json<SendMessageResponse>> {
    let body = validate_body(&payload.body)?;
    if payload.to == user_id {
        return Err(ApiError::bad_request("Can't send a message to yourself"));
    }
    if !User::exists(&state.db, payload.to).await? {
        warn!(user_id, to = payload.to, "message to unknown user");
        return Err(ApiError::not_found("Recipient not found"));
    }

    let msg = Message::create(&state.db, user_id, payload.to, body).await?;
    info!(message_id = %msg.id, from = user_id, to = payload.to, "message sent");
    Ok(Json(SendMessageResponse { success: true }))
}

#[instrument(skip(state))]
pub async fn list_messages(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<MessagesResponse>> {
    let messages = Message::list_for_user(&state.db, user_id).await?;
    Ok(Json(MessagesResponse { messages }))
}

#[instrument(skip(state))]
pub async fn list_threads(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<ThreadsResponse>> {
    let threads = Thread::list_for_user(&state.db, user_id).await?;
    Ok(Json(ThreadsResponse { threads }))
}

#[instrument(skip(state))]
pub async fn conversation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(other): ApiPath<i64>,
) -> ApiResult<Json<MessagesResponse>> {
    let messages = Message::list_between(&state.db, user_id, other).await?;
    Ok(Json(MessagesResponse { messages }))
}

/// Only the sender may delete a message; anything else looks like a missing id.
#[instrument(skip(state))]
pub async fn delete_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(raw_id): ApiPath<String>,
) -> ApiResult<Json<SendMessageResponse>> {
    let not_found = || ApiError::not_found("Message not found");
    let id = Uuid::parse_str(raw_id.trim()).map_err(|_| not_found())?;
    if !Message::delete_own(&state.db, id, user_id).await? {
        warn!(user_id, message_id = %id, "delete of missing or foreign message");
        return Err(not_found());
    }
    info!(user_id, message_id = %id, "message deleted");
    Ok(Json(SendMessageResponse { success: true }))
}
