use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    #[serde(rename = "from")]
    pub from_user_id: i64,
    #[serde(rename = "to")]
    pub to_user_id: i64,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A conversation derived by grouping messages on the counterpart.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub user_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub last_message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_at: OffsetDateTime,
    pub message_count: i64,
}
