use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::repo::{find_matches, SkillMatch};
use super::services::SkillProfile;
use crate::{
    auth::extractors::AuthUser, error::ApiResult, extract::ApiQuery, skills::repo_types::Skill,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/matchskills", get(match_skills))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchQuery {
    #[serde(default)]
    pub include_connected: bool,
}

#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub matches: Vec<SkillMatch>,
}

#[instrument(skip(state))]
pub async fn match_skills(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiQuery(q): ApiQuery<MatchQuery>,
) -> ApiResult<Json<MatchesResponse>> {
    let mine = Skill::list_by_user(&state.db, user_id).await?;
    let profile = SkillProfile::from_skills(&mine);
    if profile.is_empty() {
        return Ok(Json(MatchesResponse { matches: vec![] }));
    }

    let matches = find_matches(&state.db, user_id, &profile, q.include_connected).await?;
    debug!(user_id, count = matches.len(), "matches computed");
    Ok(Json(MatchesResponse { matches }))
}
