//! In-process fakes for the pipeline's collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::MatchConfig;
use crate::llm_client::LlmError;
use crate::matching::oracle::MatchOracle;
use crate::matching::pipeline::MatchPipeline;
use crate::models::job_match::JobMatch;
use crate::models::profile::Profile;
use crate::sources::{Posting, PostingSource, SearchQuery, SourceError};
use crate::store::{MemoryProfileStore, ProfileStore, StoreError};

/// Replies chosen by the first description fragment found in the prompt.
#[derive(Default)]
pub struct ScriptedOracle {
    rules: Vec<(String, Option<String>)>,
    default: Option<String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn always(reply: &str) -> Self {
        Self {
            default: Some(reply.to_string()),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    /// `None` as a reply simulates a transport failure for that posting.
    pub fn by_fragment(rules: &[(&str, Option<&str>)]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|(fragment, reply)| (fragment.to_string(), reply.map(str::to_string)))
                .collect(),
            ..Default::default()
        }
    }

    /// Every reply arrives only after `delay` has passed.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl MatchOracle for ScriptedOracle {
    async fn complete(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self
            .rules
            .iter()
            .find(|(fragment, _)| prompt.contains(fragment.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default.clone());
        reply.ok_or(LlmError::Api {
            status: 500,
            message: "oracle offline".to_string(),
        })
    }
}

pub enum SourceBehavior {
    Postings(Vec<Posting>),
    Fail(u16),
    Hang,
}

/// Posting source keyed by query location; unknown locations get `fallback`.
pub struct FakeSource {
    by_location: HashMap<String, SourceBehavior>,
    fallback: Vec<Posting>,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn returning(postings: Vec<Posting>) -> Self {
        Self {
            by_location: HashMap::new(),
            fallback: postings,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self::returning(vec![]).with_location("*", SourceBehavior::Fail(status))
    }

    pub fn with_location(mut self, location: &str, behavior: SourceBehavior) -> Self {
        self.by_location.insert(location.to_string(), behavior);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostingSource for FakeSource {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Posting>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .by_location
            .get(&query.location)
            .or_else(|| self.by_location.get("*"));
        match behavior {
            Some(SourceBehavior::Postings(postings)) => Ok(postings.clone()),
            Some(SourceBehavior::Fail(status)) => Err(SourceError::Status {
                status: *status,
                body: "upstream error".to_string(),
            }),
            Some(SourceBehavior::Hang) => std::future::pending().await,
            None => Ok(self.fallback.clone()),
        }
    }
}

/// Memory store whose match writes fail for the listed titles.
pub struct FlakyStore {
    inner: MemoryProfileStore,
    failing_titles: HashSet<String>,
}

impl FlakyStore {
    pub fn failing_on(titles: &[&str]) -> Self {
        Self {
            inner: MemoryProfileStore::new(),
            failing_titles: titles.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[async_trait]
impl ProfileStore for FlakyStore {
    async fn get_profile(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        self.inner.get_profile(email).await
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        self.inner.save_profile(profile).await
    }

    async fn append_match(&self, job_match: &JobMatch) -> Result<(), StoreError> {
        if self.failing_titles.contains(&job_match.title) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.append_match(job_match).await
    }

    async fn list_matches(&self, email: &str) -> Result<Vec<JobMatch>, StoreError> {
        self.inner.list_matches(email).await
    }

    async fn list_emails(&self) -> Result<Vec<String>, StoreError> {
        self.inner.list_emails().await
    }
}

pub fn sample_profile(email: &str) -> Profile {
    Profile::new(email, ["Python", "AWS"], "Software Developer", "Remote")
}

pub fn backend_posting() -> Posting {
    Posting {
        external_id: Some("4711".to_string()),
        title: "Backend Engineer".to_string(),
        description: "Needs Python and AWS".to_string(),
        company: "Acme".to_string(),
        location: "Remote".to_string(),
        redirect_url: "http://x".to_string(),
        salary_max: Some(120000.0),
    }
}

pub fn posting(id: &str, title: &str, description: &str) -> Posting {
    Posting {
        external_id: Some(id.to_string()),
        title: title.to_string(),
        description: description.to_string(),
        company: "Acme".to_string(),
        location: "Remote".to_string(),
        redirect_url: format!("http://jobs/{id}"),
        salary_max: None,
    }
}

pub fn pipeline(
    store: Arc<dyn ProfileStore>,
    source: Arc<dyn PostingSource>,
    oracle: Arc<dyn MatchOracle>,
) -> MatchPipeline {
    MatchPipeline::new(store, source, oracle, MatchConfig::default())
}
