//! Profile Store — durable profiles and accepted matches.
//!
//! Every method is individually safe under concurrent callers; the scheduler and
//! user-triggered runs share one `Arc<dyn ProfileStore>` and nothing else.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::job_match::JobMatch;
use crate::models::profile::Profile;

pub mod memory;
pub mod postgres;

pub use memory::MemoryProfileStore;
pub use postgres::PgProfileStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("profile '{0}' does not exist")]
    MissingProfile(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, email: &str) -> Result<Option<Profile>, StoreError>;

    /// Creates or overwrites the profile keyed by its email. Existing matches are kept.
    async fn save_profile(&self, profile: &Profile) -> Result<(), StoreError>;

    /// Writes one match atomically. A match for the same `(email, posting_key)`
    /// is replaced rather than duplicated.
    async fn append_match(&self, job_match: &JobMatch) -> Result<(), StoreError>;

    /// Matches for one user, highest score first.
    async fn list_matches(&self, email: &str) -> Result<Vec<JobMatch>, StoreError>;

    /// Every known profile email, in a stable order.
    async fn list_emails(&self) -> Result<Vec<String>, StoreError>;
}
