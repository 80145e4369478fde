use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{FriendRequest, RequestStatus};
use crate::auth::repo_types::UserSummary;

const REQUEST_COLUMNS: &str = "id, from_user_id, to_user_id, status, created_at";

/// Result of trying to open a request between two users.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(FriendRequest),
    AlreadyExists,
}

impl FriendRequest {
    /// Any request between the two users, in either direction.
    pub async fn find_between(db: &PgPool, a: i64, b: i64) -> anyhow::Result<Option<FriendRequest>> {
        let row = sqlx::query_as::<_, FriendRequest>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS} FROM friend_requests
             WHERE (from_user_id = $1 AND to_user_id = $2)
                OR (from_user_id = $2 AND to_user_id = $1)
             LIMIT 1
            "#
        ))
        .bind(a)
        .bind(b)
        .fetch_optional(db)
        .await
        .context("find friend request between users")?;
        Ok(row)
    }

    /// Insert a pending request. The unordered-pair unique index turns a
    /// concurrent duplicate into `AlreadyExists`.
    pub async fn create(db: &PgPool, from: i64, to: i64) -> anyhow::Result<CreateOutcome> {
        let row = sqlx::query_as::<_, FriendRequest>(&format!(
            r#"
            INSERT INTO friend_requests (id, from_user_id, to_user_id, status)
            VALUES ($1, $2, $3, 'pending')
            ON CONFLICT DO NOTHING
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(from)
        .bind(to)
        .fetch_optional(db)
        .await
        .context("insert friend request")?;
        Ok(match row {
            Some(r) => CreateOutcome::Created(r),
            None => CreateOutcome::AlreadyExists,
        })
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<FriendRequest>> {
        let row = sqlx::query_as::<_, FriendRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find friend request")?;
        Ok(row)
    }

    pub async fn list_incoming_pending(db: &PgPool, user_id: i64) -> anyhow::Result<Vec<FriendRequest>> {
        let rows = sqlx::query_as::<_, FriendRequest>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS} FROM friend_requests
             WHERE to_user_id = $1 AND status = 'pending'
             ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("list incoming requests")?;
        Ok(rows)
    }

    pub async fn list_outgoing_pending(db: &PgPool, user_id: i64) -> anyhow::Result<Vec<FriendRequest>> {
        let rows = sqlx::query_as::<_, FriendRequest>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS} FROM friend_requests
             WHERE from_user_id = $1 AND status = 'pending'
             ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("list outgoing requests")?;
        Ok(rows)
    }

    /// Move a pending request addressed to `to_user_id` into `status`.
    /// Returns `None` when it was no longer pending.
    pub async fn respond(
        db: &PgPool,
        id: Uuid,
        to_user_id: i64,
        status: RequestStatus,
    ) -> anyhow::Result<Option<FriendRequest>> {
        let row = sqlx::query_as::<_, FriendRequest>(&format!(
            r#"
            UPDATE friend_requests
               SET status = $3
             WHERE id = $1 AND to_user_id = $2 AND status = 'pending'
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(to_user_id)
        .bind(status)
        .fetch_optional(db)
        .await
        .context("respond to friend request")?;
        Ok(row)
    }
}

/// Users connected to `user_id` through an accepted request.
pub async fn list_friends(db: &PgPool, user_id: i64) -> anyhow::Result<Vec<UserSummary>> {
    let rows = sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT u.id, u.first_name, u.last_name
          FROM friend_requests f
          JOIN users u
            ON u.id = CASE WHEN f.from_user_id = $1 THEN f.to_user_id ELSE f.from_user_id END
         WHERE f.status = 'accepted'
           AND (f.from_user_id = $1 OR f.to_user_id = $1)
         ORDER BY u.first_name, u.last_name, u.id
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list friends")?;
    Ok(rows)
}
