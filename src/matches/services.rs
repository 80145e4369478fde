use std::collections::BTreeSet;

use crate::skills::repo_types::{Skill, SkillType};

/// The caller's skill names split by direction.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SkillProfile {
    pub offered: Vec<String>,
    pub needed: Vec<String>,
}

impl SkillProfile {
    pub fn from_skills(skills: &[Skill]) -> Self {
        let mut offered = BTreeSet::new();
        let mut needed = BTreeSet::new();
        for s in skills {
            match s.skill_type {
                SkillType::Offer => offered.insert(s.skill_name.clone()),
                SkillType::Need => needed.insert(s.skill_name.clone()),
            };
        }
        Self {
            offered: offered.into_iter().collect(),
            needed: needed.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.offered.is_empty() && self.needed.is_empty()
    }

    /// Names a counterpart must list with type `kind` to complement this profile.
    pub fn wanted_from_others(&self, kind: SkillType) -> &[String] {
        // they offer what we need, they need what we offer
        match kind.complement() {
            SkillType::Need => &self.needed,
            SkillType::Offer => &self.offered,
        }
    }
}
