use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use super::services::SkillProfile;
use crate::skills::repo_types::SkillType;

/// One complementary user and the skill names that matched.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SkillMatch {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub skills: Vec<String>,
}

/// Other verified users whose skills complement `profile`, grouped per user.
///
/// Unless `include_connected` is set, users who already exchanged a message
/// with `user_id`, or have a pending/accepted request with them in either
/// direction, are left out. Declined requests do not hide a user. Users are
/// ranked by how many distinct skill names matched.
pub async fn find_matches(
    db: &PgPool,
    user_id: i64,
    profile: &SkillProfile,
    include_connected: bool,
) -> anyhow::Result<Vec<SkillMatch>> {
    let rows = sqlx::query_as::<_, SkillMatch>(
        r#"
        SELECT s.user_id,
               u.first_name,
               u.last_name,
               array_agg(DISTINCT s.skill_name ORDER BY s.skill_name) AS skills
          FROM skills s
          JOIN users u ON u.id = s.user_id
         WHERE s.user_id <> $1
           AND u.verified
           AND (
                (s.skill_type = 'offer' AND s.skill_name = ANY($2))
             OR (s.skill_type = 'need'  AND s.skill_name = ANY($3))
           )
           AND ($4 OR NOT EXISTS (
                SELECT 1 FROM messages m
                 WHERE (m.from_user_id = $1 AND m.to_user_id = s.user_id)
                    OR (m.from_user_id = s.user_id AND m.to_user_id = $1)
           ))
           AND ($4 OR NOT EXISTS (
                SELECT 1 FROM friend_requests f
                 WHERE f.status IN ('pending', 'accepted')
                   AND ((f.from_user_id = $1 AND f.to_user_id = s.user_id)
                     OR (f.from_user_id = s.user_id AND f.to_user_id = $1))
           ))
         GROUP BY s.user_id, u.first_name, u.last_name
         ORDER BY COUNT(DISTINCT s.skill_name) DESC, s.user_id ASC
        "#,
    )
    .bind(user_id)
    .bind(profile.wanted_from_others(SkillType::Offer))
    .bind(profile.wanted_from_others(SkillType::Need))
    .bind(include_connected)
    .fetch_all(db)
    .await
    .context("find skill matches")?;
    Ok(rows)
}
