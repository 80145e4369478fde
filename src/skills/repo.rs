use anyhow::Context;
use sqlx::PgPool;

use super::repo_types::{Skill, SkillType};

const SKILL_COLUMNS: &str = "id, user_id, skill_name, skill_type, created_at";

impl Skill {
    pub async fn create(
        db: &PgPool,
        user_id: i64,
        skill_name: &str,
        skill_type: SkillType,
    ) -> anyhow::Result<Skill> {
        let skill = sqlx::query_as::<_, Skill>(&format!(
            r#"
            INSERT INTO skills (id, user_id, skill_name, skill_type)
            VALUES ($1, $2, $3, $4)
            RETURNING {SKILL_COLUMNS}
            "#
        ))
        .bind(uuid::Uuid::new_v4())
        .bind(user_id)
        .bind(skill_name)
        .bind(skill_type)
        .fetch_one(db)
        .await
        .context("insert skill")?;
        Ok(skill)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Skill>> {
        let rows = sqlx::query_as::<_, Skill>(&format!(
            "SELECT {SKILL_COLUMNS} FROM skills ORDER BY created_at ASC"
        ))
        .fetch_all(db)
        .await
        .context("list skills")?;
        Ok(rows)
    }

    pub async fn list_by_user(db: &PgPool, user_id: i64) -> anyhow::Result<Vec<Skill>> {
        let rows = sqlx::query_as::<_, Skill>(&format!(
            "SELECT {SKILL_COLUMNS} FROM skills WHERE user_id = $1 ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("list skills by user")?;
        Ok(rows)
    }

    /// Delete one skill with this name owned by `user_id`. Returns whether a row went away.
    pub async fn delete_one_by_name(
        db: &PgPool,
        user_id: i64,
        skill_name: &str,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            DELETE FROM skills
             WHERE id = (
                SELECT id FROM skills
                 WHERE user_id = $1 AND skill_name = $2
                 ORDER BY created_at ASC
                 LIMIT 1
             )
            "#,
        )
        .bind(user_id)
        .bind(skill_name)
        .execute(db)
        .await
        .context("delete skill")?;
        Ok(res.rows_affected() > 0)
    }

    /// Case-insensitive substring search on the skill name.
    pub async fn search(db: &PgPool, pattern: &str) -> anyhow::Result<Vec<Skill>> {
        let rows = sqlx::query_as::<_, Skill>(&format!(
            r#"
            SELECT {SKILL_COLUMNS} FROM skills
             WHERE skill_name ILIKE $1 ESCAPE '\'
             ORDER BY skill_name ASC, created_at ASC
            "#
        ))
        .bind(pattern)
        .fetch_all(db)
        .await
        .context("search skills")?;
        Ok(rows)
    }
}
