//! Posting Source — external job-listing search behind a trait.
//!
//! The pipeline only sees `PostingSource`; `AdzunaSource` is the production backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod adzuna;

pub use adzuna::AdzunaSource;

/// Longest response-body prefix kept for diagnostics.
pub const BODY_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("posting source returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("posting source request failed: {0}")]
    Transport(String),

    #[error("posting source response could not be decoded: {0}")]
    Decode(String),
}

impl SourceError {
    /// HTTP status of the failed call, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Search derived from a profile's desired title and location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    pub keywords: String,
    pub location: String,
    pub page_size: u32,
}

/// One externally sourced job listing. Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Posting {
    pub external_id: Option<String>,
    pub title: String,
    pub description: String,
    pub company: String,
    pub location: String,
    pub redirect_url: String,
    pub salary_max: Option<f64>,
}

impl Posting {
    /// Dedup identity: the external id when supplied, else (title, company, location).
    pub fn key(&self) -> String {
        match self.external_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => format!("id:{id}"),
            _ => format!(
                "composite:{}|{}|{}",
                self.title.trim().to_lowercase(),
                self.company.trim().to_lowercase(),
                self.location.trim().to_lowercase()
            ),
        }
    }
}

#[async_trait]
pub trait PostingSource: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Posting>, SourceError>;
}

/// Returns at most `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
