use serde::{Deserialize, Serialize};

use super::repo_types::Skill;

#[derive(Debug, Deserialize)]
pub struct AddSkillRequest {
    pub card: String,
    #[serde(rename = "type")]
    pub skill_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Serialize)]
pub struct SkillsResponse {
    pub skills: Vec<Skill>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MySkillsResponse {
    pub my_skills: Vec<Skill>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<Skill>,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}
