use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Message, Thread};

impl Message {
    pub async fn create(db: &PgPool, from: i64, to: i64, body: &str) -> anyhow::Result<Message> {
        let msg = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, from_user_id, to_user_id, body)
            VALUES ($1, $2, $3, $4)
            RETURNING id, from_user_id, to_user_id, body, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(from)
        .bind(to)
        .bind(body)
        .fetch_one(db)
        .await
        .context("insert message")?;
        Ok(msg)
    }

    /// Everything sent or received by `user_id`, newest first.
    pub async fn list_for_user(db: &PgPool, user_id: i64) -> anyhow::Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, from_user_id, to_user_id, body, created_at
              FROM messages
             WHERE from_user_id = $1 OR to_user_id = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("list messages")?;
        Ok(rows)
    }

    /// Conversation between two users, oldest first.
    pub async fn list_between(db: &PgPool, a: i64, b: i64) -> anyhow::Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, from_user_id, to_user_id, body, created_at
              FROM messages
             WHERE (from_user_id = $1 AND to_user_id = $2)
                OR (from_user_id = $2 AND to_user_id = $1)
             ORDER BY created_at ASC
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_all(db)
        .await
        .context("list conversation")?;
        Ok(rows)
    }

    /// Delete a message sent by `from_user_id`. Returns `false` when there
    /// is no such message or someone else sent it.
    pub async fn delete_own(db: &PgPool, id: Uuid, from_user_id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM messages WHERE id = $1 AND from_user_id = $2")
            .bind(id)
            .bind(from_user_id)
            .execute(db)
            .await
            .context("delete message")?;
        Ok(res.rows_affected() > 0)
    }
}

impl Thread {
    pub async fn list_for_user(db: &PgPool, user_id: i64) -> anyhow::Result<Vec<Thread>> {
        let rows = sqlx::query_as::<_, Thread>(
            r#"
            WITH mine AS (
                SELECT CASE WHEN from_user_id = $1 THEN to_user_id ELSE from_user_id END AS counterpart,
                       body,
                       created_at
                  FROM messages
                 WHERE from_user_id = $1 OR to_user_id = $1
            ),
            ranked AS (
                SELECT counterpart, body, created_at,
                       ROW_NUMBER() OVER (PARTITION BY counterpart ORDER BY created_at DESC) AS rn,
                       COUNT(*) OVER (PARTITION BY counterpart) AS message_count
                  FROM mine
            )
            SELECT r.counterpart AS user_id,
                   u.first_name,
                   u.last_name,
                   r.body AS last_message,
                   r.created_at AS last_at,
                   r.message_count
              FROM ranked r
              LEFT JOIN users u ON u.id = r.counterpart
             WHERE r.rn = 1
             ORDER BY r.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("list threads")?;
        Ok(rows)
    }
}
