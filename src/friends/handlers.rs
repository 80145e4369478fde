use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::repo::{list_friends, CreateOutcome};
use super::repo_types::{Answer, FriendRequest};
use crate::{
    auth::{
        dto::MessageResponse,
        extractors::AuthUser,
        repo_types::{User, UserSummary},
    },
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/friend-request/:id", post(send_request))
        .route("/friend-request/:id/respond", post(respond))
        .route("/friend-requests", get(incoming))
        .route("/friend-requests/outgoing", get(outgoing))
        .route("/friends", get(friends))
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct RequestsResponse {
    pub requests: Vec<FriendRequest>,
}

#[derive(Debug, Serialize)]
pub struct FriendsResponse {
    pub friends: Vec<UserSummary>,
}

fn parse_target(raw: &str, from: i64) -> ApiResult<i64> {
    let to = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| ApiError::bad_request("Invalid user id"))?;
    if to == from {
        return Err(ApiError::bad_request("Can't send friend request to yourself"));
    }
    Ok(to)
}

#[instrument(skip(state))]
pub async fn send_request(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(raw_to): ApiPath<String>,
) -> ApiResult<Json<MessageResponse>> {
    let to = parse_target(&raw_to, user_id)?;

    if !User::exists(&state.db, to).await? {
        return Err(ApiError::not_found("User not found"));
    }
    if FriendRequest::find_between(&state.db, user_id, to).await?.is_some() {
        warn!(from = user_id, to, "duplicate friend request");
        return Err(ApiError::bad_request("Request already exists"));
    }

    match FriendRequest::create(&state.db, user_id, to).await? {
        CreateOutcome::Created(req) => {
            info!(request_id = %req.id, from = user_id, to, "friend request sent");
            Ok(Json(MessageResponse::new("Friend request sent")))
        }
        CreateOutcome::AlreadyExists => {
            warn!(from = user_id, to, "friend request raced with an existing one");
            Err(ApiError::bad_request("Request already exists"))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn respond(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(raw_id): ApiPath<String>,
    ApiJson(payload): ApiJson<RespondRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let not_found = || ApiError::not_found("Request not found");
    let id = Uuid::parse_str(raw_id.trim()).map_err(|_| not_found())?;

    let request = FriendRequest::find_by_id(&state.db, id)
        .await?
        .ok_or_else(not_found)?;
    if request.to_user_id != user_id {
        warn!(user_id, request_id = %id, "respond to someone else's request");
        return Err(ApiError::forbidden("Not authorized to modify this request"));
    }
    let action =
        Answer::parse(&payload.action).ok_or_else(|| ApiError::bad_request("Invalid action"))?;

    let updated = FriendRequest::respond(&state.db, id, user_id, action.status())
        .await?
        .ok_or_else(|| ApiError::bad_request("Request already handled"))?;

    info!(request_id = %id, status = updated.status.as_str(), "friend request answered");
    Ok(Json(MessageResponse::new(format!(
        "Request {}",
        updated.status.as_str()
    ))))
}

#[instrument(skip(state))]
pub async fn incoming(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<RequestsResponse>> {
    let requests = FriendRequest::list_incoming_pending(&state.db, user_id).await?;
    Ok(Json(RequestsResponse { requests }))
}

#[instrument(skip(state))]
pub async fn outgoing(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<RequestsResponse>> {
    let requests = FriendRequest::list_outgoing_pending(&state.db, user_id).await?;
    Ok(Json(RequestsResponse { requests }))
}

#[instrument(skip(state))]
pub async fn friends(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<FriendsResponse>> {
    let friends = list_friends(&state.db, user_id).await?;
    Ok(Json(FriendsResponse { friends }))
}
