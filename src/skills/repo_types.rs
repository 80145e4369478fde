use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Whether a user teaches a skill or wants to learn it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SkillType {
    Offer,
    Need,
}

impl SkillType {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim) {
            None | Some("") | Some("offer") => Some(Self::Offer),
            Some("need") => Some(Self::Need),
            Some(_) => None,
        }
    }

    pub fn complement(self) -> Self {
        match self {
            Self::Offer => Self::Need,
            Self::Need => Self::Offer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: Uuid,
    pub user_id: i64,
    pub skill_name: String,
    #[serde(rename = "type")]
    pub skill_type: SkillType,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
