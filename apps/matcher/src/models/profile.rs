use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user's skills and job preferences. Read-only for the duration of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub email: String,
    pub skills: Vec<String>,
    pub desired_title: String,
    pub location: String,
}

impl Profile {
    /// Builds a profile with its skill list normalised.
    pub fn new(
        email: impl Into<String>,
        skills: impl IntoIterator<Item = impl AsRef<str>>,
        desired_title: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        let email: String = email.into();
        let desired_title: String = desired_title.into();
        let location: String = location.into();
        Self {
            email: email.trim().to_string(),
            skills: normalize_skills(skills),
            desired_title: desired_title.trim().to_string(),
            location: location.trim().to_string(),
        }
    }
}

/// Trims each skill, drops empties and removes case-insensitive duplicates.
/// The first spelling of a duplicated skill wins.
pub fn normalize_skills(skills: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    skills
        .into_iter()
        .filter_map(|s| {
            let trimmed = s.as_ref().trim();
            if trimmed.is_empty() || !seen.insert(trimmed.to_lowercase()) {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}
