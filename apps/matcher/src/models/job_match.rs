use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::sources::Posting;

/// A posting that scored above the acceptance threshold for one profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct JobMatch {
    pub email: String,
    /// Identity of the source posting; `(email, posting_key)` is unique.
    pub posting_key: String,
    pub title: String,
    pub score: f64,
    pub redirect_url: String,
    pub description: String,
    pub company: String,
    pub location: String,
    pub salary_max: Option<f64>,
    pub matched_at: DateTime<Utc>,
}

impl JobMatch {
    pub fn from_posting(email: &str, posting: &Posting, score: f64) -> Self {
        Self {
            email: email.to_string(),
            posting_key: posting.key(),
            title: posting.title.clone(),
            score: score.clamp(0.0, 1.0),
            redirect_url: posting.redirect_url.clone(),
            description: posting.description.clone(),
            company: posting.company.clone(),
            location: posting.location.clone(),
            salary_max: posting.salary_max,
            matched_at: Utc::now(),
        }
    }
}
