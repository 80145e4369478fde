//! Fixtures shared by the database-backed tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::mail::{Mailer, OutgoingMail};
use crate::state::AppState;

/// Insert a user and return its id. The login is derived from `first_name`.
pub async fn insert_user(db: &PgPool, first_name: &str, verified: bool) -> i64 {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO users (first_name, last_name, login, password_hash, verified)
        VALUES ($1, 'Test', $2, 'x', $3)
        RETURNING id
        "#,
    )
    .bind(first_name)
    .bind(format!("{}@example.com", first_name.to_lowercase()))
    .bind(verified)
    .fetch_one(db)
    .await
    .unwrap();
    id
}

pub async fn insert_skill(db: &PgPool, user_id: i64, name: &str, kind: &str) {
    sqlx::query("INSERT INTO skills (id, user_id, skill_name, skill_type) VALUES ($1, $2, $3, $4)")
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(name)
        .bind(kind)
        .execute(db)
        .await
        .unwrap();
}

/// Insert a message sent `minutes_ago` minutes in the past.
pub async fn insert_message(db: &PgPool, from: i64, to: i64, body: &str, minutes_ago: i32) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO messages (id, from_user_id, to_user_id, body, created_at)
        VALUES ($1, $2, $3, $4, now() - make_interval(mins => $5))
        "#,
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(body)
    .bind(minutes_ago)
    .execute(db)
    .await
    .unwrap();
    id
}

pub async fn insert_request(db: &PgPool, from: i64, to: i64, status: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO friend_requests (id, from_user_id, to_user_id, status) VALUES ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(status)
    .execute(db)
    .await
    .unwrap();
    id
}

/// Test state backed by a real pool and the given mailer.
pub fn state_with(db: PgPool, mailer: Arc<dyn Mailer>) -> AppState {
    AppState {
        db,
        mailer,
        ..AppState::fake()
    }
}

/// Mailer whose transport is always down.
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _mail: OutgoingMail) -> anyhow::Result<()> {
        anyhow::bail!("smtp unavailable")
    }
}

/// Mailer that keeps every message it is handed.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingMail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}
