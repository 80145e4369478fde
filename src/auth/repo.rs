use anyhow::Context;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::auth::repo_types::{User, UserSummary};

// Token columns stay out of `User`; they are only ever matched in WHERE clauses.
const USER_COLUMNS: &str =
    "id, first_name, last_name, login, password_hash, verified, created_at";

/// Fields needed to insert a fresh, unverified user.
pub struct NewUser<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub login: &'a str,
    pub password_hash: &'a str,
    pub verification_token: &'a str,
}

impl User {
    /// Find a user by login (email).
    pub async fn find_by_login(db: &PgPool, login: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE login = $1"
        ))
        .bind(login)
        .fetch_optional(db)
        .await
        .context("find user by login")?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    pub async fn exists(db: &PgPool, id: i64) -> anyhow::Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(id)
                .fetch_one(db)
                .await
                .context("check user exists")?;
        Ok(exists)
    }

    /// Create a new unverified user. Returns `None` when the login is taken.
    pub async fn create(db: &PgPool, new: NewUser<'_>) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (first_name, last_name, login, password_hash, verification_token)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (login) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.login)
        .bind(new.password_hash)
        .bind(new.verification_token)
        .fetch_optional(db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    /// Overwrite a registration that was never verified with fresh details
    /// and a new verification token. Returns `None` for verified accounts.
    pub async fn refresh_unverified(db: &PgPool, new: NewUser<'_>) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET first_name = $1, last_name = $2, password_hash = $4, verification_token = $5
             WHERE login = $3 AND NOT verified
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.login)
        .bind(new.password_hash)
        .bind(new.verification_token)
        .fetch_optional(db)
        .await
        .context("refresh unverified user")?;
        Ok(user)
    }

    /// Mark the owner of `token` verified and consume the token.
    pub async fn verify_by_token(db: &PgPool, token: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET verified = TRUE, verification_token = NULL
             WHERE verification_token = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(token)
        .fetch_optional(db)
        .await
        .context("verify user by token")?;
        Ok(user)
    }

    pub async fn set_reset_token(
        db: &PgPool,
        id: i64,
        token: &str,
        expires: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET reset_token = $2, reset_token_expires = $3 WHERE id = $1")
            .bind(id)
            .bind(token)
            .bind(expires)
            .execute(db)
            .await
            .context("store reset token")?;
        Ok(())
    }

    /// Replace the password of the holder of an unexpired reset token.
    /// Returns `false` when no such token exists.
    pub async fn reset_password(
        db: &PgPool,
        token: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2, reset_token = NULL, reset_token_expires = NULL
             WHERE reset_token = $1 AND reset_token_expires > $3
            "#,
        )
        .bind(token)
        .bind(password_hash)
        .bind(now)
        .execute(db)
        .await
        .context("reset password")?;
        Ok(res.rows_affected() > 0)
    }
}

impl UserSummary {
    /// Verified users other than `exclude` whose first, last or full name
    /// contains `pattern` (an ILIKE pattern).
    pub async fn search_by_name(
        db: &PgPool,
        pattern: &str,
        exclude: i64,
    ) -> anyhow::Result<Vec<UserSummary>> {
        let rows = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, first_name, last_name
              FROM users
             WHERE verified
               AND id <> $2
               AND (first_name ILIKE $1 ESCAPE '\'
                 OR last_name ILIKE $1 ESCAPE '\'
                 OR (first_name || ' ' || last_name) ILIKE $1 ESCAPE '\')
             ORDER BY first_name, last_name, id
             LIMIT 50
            "#,
        )
        .bind(pattern)
        .bind(exclude)
        .fetch_all(db)
        .await
        .context("search users by name")?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::insert_user;
    use time::Duration;

    fn new_user<'a>(login: &'a str, token: &'a str) -> NewUser<'a> {
        NewUser {
            first_name: "Ada",
            last_name: "Lovelace",
            login,
            password_hash: "hash",
            verification_token: token,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn duplicate_login_is_not_created(db: PgPool) {
        assert!(User::create(&db, new_user("ada@example.com", "t1")).await.unwrap().is_some());
        assert!(User::create(&db, new_user("ada@example.com", "t2")).await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn verification_token_is_consumed(db: PgPool) {
        let user = User::create(&db, new_user("ada@example.com", "tok"))
            .await
            .unwrap()
            .unwrap();
        assert!(!user.verified);

        let verified = User::verify_by_token(&db, "tok").await.unwrap().unwrap();
        assert_eq!(verified.id, user.id);
        assert!(verified.verified);
        assert!(User::verify_by_token(&db, "tok").await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn reset_token_expires_and_is_single_use(db: PgPool) {
        let id = insert_user(&db, "Grace", true).await;
        let now = OffsetDateTime::now_utc();
        User::set_reset_token(&db, id, "reset", now + Duration::minutes(10))
            .await
            .unwrap();

        let late = now + Duration::minutes(11);
        assert!(!User::reset_password(&db, "reset", "late", late).await.unwrap());
        assert!(User::reset_password(&db, "reset", "new-hash", now).await.unwrap());
        assert!(!User::reset_password(&db, "reset", "again", now).await.unwrap());

        let user = User::find_by_id(&db, id).await.unwrap().unwrap();
        assert_eq!(user.password_hash, "new-hash");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn only_unverified_registrations_are_refreshed(db: PgPool) {
        User::create(&db, new_user("ada@example.com", "old")).await.unwrap();
        let fresh = NewUser {
            first_name: "Augusta",
            password_hash: "other",
            ..new_user("ada@example.com", "new")
        };
        let user = User::refresh_unverified(&db, fresh).await.unwrap().unwrap();
        assert_eq!(user.first_name, "Augusta");
        assert_eq!(user.password_hash, "other");
        assert!(User::verify_by_token(&db, "old").await.unwrap().is_none());
        assert!(User::verify_by_token(&db, "new").await.unwrap().is_some());

        let again = User::refresh_unverified(&db, new_user("ada@example.com", "third"))
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn name_search_skips_caller_and_unverified(db: PgPool) {
        let me = insert_user(&db, "Alan", true).await;
        let alana = insert_user(&db, "Alana", true).await;
        insert_user(&db, "Alanis", false).await;
        insert_user(&db, "Bob", true).await;

        let found = UserSummary::search_by_name(&db, "%ALAN%", me).await.unwrap();
        let ids: Vec<i64> = found.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![alana]);

        let full = UserSummary::search_by_name(&db, "%alana test%", me).await.unwrap();
        assert_eq!(full.len(), 1);
    }
}
