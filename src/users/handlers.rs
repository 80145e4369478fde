use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    auth::{extractors::AuthUser, repo_types::UserSummary},
    error::ApiResult,
    extract::ApiQuery,
    skills::services::contains_pattern,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/users", get(search_users))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
}

/// People to start a conversation with. A blank name finds nobody.
#[instrument(skip(state))]
pub async fn search_users(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiQuery(q): ApiQuery<UserQuery>,
) -> ApiResult<Json<UsersResponse>> {
    if q.name.trim().is_empty() {
        return Ok(Json(UsersResponse { users: vec![] }));
    }
    let users = UserSummary::search_by_name(&state.db, &contains_pattern(&q.name), user_id).await?;
    debug!(user_id, count = users.len(), "user search");
    Ok(Json(UsersResponse { users }))
}
