//! Match Pipeline — Posting Source → Match Oracle → Profile Store for one user.
//!
//! Fetch failures and unknown profiles abort the run. Scoring and persistence
//! failures are isolated to the posting they happened on.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::MatchConfig;
use crate::matching::oracle::{score_posting, MatchOracle};
use crate::models::job_match::JobMatch;
use crate::models::profile::Profile;
use crate::sources::{PostingSource, SearchQuery, SourceError};
use crate::store::{ProfileStore, StoreError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no profile found for '{0}'")]
    UnknownProfile(String),

    #[error("posting source unavailable: {0}")]
    SourceUnavailable(#[source] SourceError),

    #[error("profile store error: {0}")]
    Store(#[from] StoreError),

    #[error("pipeline run for '{email}' timed out after {after:?}")]
    TimedOut { email: String, after: Duration },
}

impl PipelineError {
    /// The pipeline stage that failed, for logs and API responses.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::UnknownProfile(_) => "load_profile",
            PipelineError::SourceUnavailable(_) => "fetch_postings",
            PipelineError::Store(_) => "profile_store",
            PipelineError::TimedOut { .. } => "run",
        }
    }
}

/// Per-run counters, logged when the run finishes.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub fetched: usize,
    pub degraded: usize,
    pub accepted: usize,
    pub persisted: usize,
    pub failed_writes: usize,
}

/// Derives the posting search from a profile's preferences.
pub fn search_query(profile: &Profile, config: &MatchConfig) -> SearchQuery {
    SearchQuery {
        keywords: profile.desired_title.clone(),
        location: profile.location.clone(),
        page_size: config.page_size,
    }
}

#[derive(Clone)]
pub struct MatchPipeline {
    store: Arc<dyn ProfileStore>,
    source: Arc<dyn PostingSource>,
    oracle: Arc<dyn MatchOracle>,
    config: MatchConfig,
}

impl MatchPipeline {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        source: Arc<dyn PostingSource>,
        oracle: Arc<dyn MatchOracle>,
        config: MatchConfig,
    ) -> Self {
        Self {
            store,
            source,
            oracle,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    /// Runs matching for one user and returns the matches that were accepted
    /// and durably written during this run.
    pub async fn run(&self, email: &str) -> Result<Vec<JobMatch>, PipelineError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        info!(%run_id, email, started_at = %Utc::now(), "Pipeline run started");

        let result = self.execute(email, run_id).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok((matches, summary)) => info!(
                %run_id,
                email,
                elapsed_ms,
                fetched = summary.fetched,
                degraded = summary.degraded,
                accepted = summary.accepted,
                persisted = summary.persisted,
                failed_writes = summary.failed_writes,
                "Pipeline run finished with {} matches",
                matches.len()
            ),
            Err(e) => warn!(%run_id, email, elapsed_ms, stage = e.stage(), "Pipeline run failed: {e}"),
        }

        result.map(|(matches, _)| matches)
    }

    /// Creates or overwrites a profile, then runs matching for it inline.
    pub async fn save_profile_and_run(
        &self,
        profile: &Profile,
    ) -> Result<Vec<JobMatch>, PipelineError> {
        self.store.save_profile(profile).await?;
        info!("Saved profile for {}", profile.email);
        self.run(&profile.email).await
    }

    async fn execute(
        &self,
        email: &str,
        run_id: Uuid,
    ) -> Result<(Vec<JobMatch>, RunSummary), PipelineError> {
        let profile = self
            .store
            .get_profile(email)
            .await?
            .ok_or_else(|| PipelineError::UnknownProfile(email.to_string()))?;

        let query = search_query(&profile, &self.config);
        info!(
            %run_id,
            "Searching for '{}' in '{}' with {} skills",
            query.keywords,
            query.location,
            profile.skills.len()
        );

        let postings = self.source.search(&query).await.map_err(|e| {
            error!(%run_id, status = ?e.status(), "Error fetching postings: {e}");
            PipelineError::SourceUnavailable(e)
        })?;

        let mut summary = RunSummary {
            fetched: postings.len(),
            ..RunSummary::default()
        };
        let mut accepted = Vec::new();

        for posting in &postings {
            let score = score_posting(
                self.oracle.as_ref(),
                &posting.description,
                &profile.skills,
                &self.config,
            )
            .await;
            if score.degraded {
                summary.degraded += 1;
            }
            info!(%run_id, "Job '{}' scored {:.2}", posting.title, score.value);

            if score.value > self.config.threshold {
                accepted.push(JobMatch::from_posting(&profile.email, posting, score.value));
            }
        }
        summary.accepted = accepted.len();

        let mut persisted = Vec::with_capacity(accepted.len());
        for job_match in accepted {
            match self.store.append_match(&job_match).await {
                Ok(()) => {
                    info!(%run_id, "Saved match '{}' for {}", job_match.title, email);
                    persisted.push(job_match);
                }
                Err(e) => {
                    summary.failed_writes += 1;
                    error!(
                        %run_id,
                        posting_key = %job_match.posting_key,
                        "Failed to persist match '{}': {e}",
                        job_match.title
                    );
                }
            }
        }
        summary.persisted = persisted.len();

        Ok((persisted, summary))
    }
}
