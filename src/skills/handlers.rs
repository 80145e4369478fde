use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use super::dto::{
    AddSkillRequest, MySkillsResponse, SearchRequest, SearchResponse, SkillsResponse,
    SuccessResponse,
};
use super::repo_types::{Skill, SkillType};
use super::services::{clean_skill_name, contains_pattern};
use crate::{
    auth::{dto::MessageResponse, extractors::AuthUser},
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/browseskills", get(browse_skills))
        .route("/myskills", get(my_skills))
        .route("/searchskills", post(search_skills))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/addskill", post(add_skill))
        .route("/deleteskill/:skill_name", delete(delete_skill))
}

#[instrument(skip(state, payload))]
pub async fn add_skill(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<AddSkillRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let skill_type = SkillType::parse(payload.skill_type.as_deref()).ok_or_else(|| {
        warn!(user_id, raw = ?payload.skill_type, "invalid skill type");
        ApiError::bad_request("Skill type must be 'offer' or 'need'")
    })?;
    let name = clean_skill_name(&payload.card)
        .ok_or_else(|| ApiError::bad_request("Skill name is required"))?;

    let skill = Skill::create(&state.db, user_id, name, skill_type).await?;
    info!(user_id, skill_id = %skill.id, skill = %skill.skill_name, kind = ?skill.skill_type, "skill added");
    Ok(Json(MessageResponse::new("Skill added successfully")))
}

#[instrument(skip(state))]
pub async fn browse_skills(State(state): State<AppState>) -> ApiResult<Json<SkillsResponse>> {
    let skills = Skill::list_all(&state.db).await?;
    Ok(Json(SkillsResponse { skills }))
}

#[instrument(skip(state))]
pub async fn my_skills(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<MySkillsResponse>> {
    let my_skills = Skill::list_by_user(&state.db, user_id).await?;
    Ok(Json(MySkillsResponse { my_skills }))
}

#[instrument(skip(state))]
pub async fn delete_skill(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(skill_name): ApiPath<String>,
) -> ApiResult<Json<SuccessResponse>> {
    let deleted = Skill::delete_one_by_name(&state.db, user_id, &skill_name).await?;
    info!(user_id, skill = %skill_name, deleted, "delete skill");
    Ok(Json(SuccessResponse { success: true }))
}

/// Search failures keep the `{results, error}` shape so clients can render both.
#[instrument(skip(state))]
pub async fn search_skills(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SearchRequest>,
) -> Response {
    match Skill::search(&state.db, &contains_pattern(&payload.search)).await {
        Ok(results) => Json(SearchResponse {
            results,
            error: String::new(),
        })
        .into_response(),
        Err(e) => {
            error!(error = %format!("{:#}", e), "search skills failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SearchResponse {
                    results: Vec::new(),
                    error: "Search failed".into(),
                }),
            )
                .into_response()
        }
    }
}
