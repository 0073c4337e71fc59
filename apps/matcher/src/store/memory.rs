use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ProfileStore, StoreError};
use crate::models::job_match::JobMatch;
use crate::models::profile::Profile;

#[derive(Default)]
struct MemoryState {
    profiles: HashMap<String, Profile>,
    matches: HashMap<String, Vec<JobMatch>>,
}

/// In-memory store for tests and local development. Data is lost on restart.
///
/// Profiles and matches sit behind one lock so the profile check and the
/// match write happen atomically.
#[derive(Default)]
pub struct MemoryProfileStore {
    state: RwLock<MemoryState>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored matches across all users.
    #[cfg(test)]
    pub async fn match_count(&self) -> usize {
        self.state.read().await.matches.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_profile(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.state.read().await.profiles.get(email).cloned())
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .profiles
            .insert(profile.email.clone(), profile.clone());
        Ok(())
    }

    async fn append_match(&self, job_match: &JobMatch) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.profiles.contains_key(&job_match.email) {
            return Err(StoreError::MissingProfile(job_match.email.clone()));
        }
        let rows = state.matches.entry(job_match.email.clone()).or_default();
        match rows
            .iter_mut()
            .find(|m| m.posting_key == job_match.posting_key)
        {
            Some(existing) => *existing = job_match.clone(),
            None => rows.push(job_match.clone()),
        }
        Ok(())
    }

    async fn list_matches(&self, email: &str) -> Result<Vec<JobMatch>, StoreError> {
        let mut rows = self
            .state
            .read()
            .await
            .matches
            .get(email)
            .cloned()
            .unwrap_or_default();
        rows.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(rows)
    }

    async fn list_emails(&self) -> Result<Vec<String>, StoreError> {
        let mut emails: Vec<String> = self.state.read().await.profiles.keys().cloned().collect();
        emails.sort();
        Ok(emails)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::sources::Posting;

    fn profile(email: &str) -> Profile {
        Profile::new(email, ["Python", "AWS"], "Software Developer", "Remote")
    }

    fn job_match(email: &str, title: &str, score: f64) -> JobMatch {
        let posting = Posting {
            title: title.to_string(),
            company: "Acme".to_string(),
            ..Default::default()
        };
        JobMatch::from_posting(email, &posting, score)
    }

    #[tokio::test]
    async fn test_save_then_get_profile() {
        let store = MemoryProfileStore::new();
        store.save_profile(&profile("a@x.com")).await.unwrap();
        let loaded = store.get_profile("a@x.com").await.unwrap().unwrap();
        assert_eq!(loaded.skills, vec!["Python", "AWS"]);
        assert!(store.get_profile("b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_profile_overwrites_and_keeps_matches() {
        let store = MemoryProfileStore::new();
        store.save_profile(&profile("a@x.com")).await.unwrap();
        store
            .append_match(&job_match("a@x.com", "Backend", 0.9))
            .await
            .unwrap();

        let updated = Profile::new("a@x.com", ["Rust"], "Systems Engineer", "Berlin");
        store.save_profile(&updated).await.unwrap();

        assert_eq!(store.get_profile("a@x.com").await.unwrap(), Some(updated));
        assert_eq!(store.list_matches("a@x.com").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_append_match_requires_profile() {
        let store = MemoryProfileStore::new();
        let err = store
            .append_match(&job_match("ghost@x.com", "Backend", 0.9))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingProfile(email) if email == "ghost@x.com"));
        assert_eq!(store.match_count().await, 0);
    }

    #[tokio::test]
    async fn test_append_match_upserts_by_posting_key() {
        let store = MemoryProfileStore::new();
        store.save_profile(&profile("a@x.com")).await.unwrap();
        store
            .append_match(&job_match("a@x.com", "Backend", 0.6))
            .await
            .unwrap();
        store
            .append_match(&job_match("a@x.com", "Backend", 0.8))
            .await
            .unwrap();

        let rows = store.list_matches("a@x.com").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].score, 0.8);
    }

    #[tokio::test]
    async fn test_list_matches_orders_by_score_desc() {
        let store = MemoryProfileStore::new();
        store.save_profile(&profile("a@x.com")).await.unwrap();
        for (title, score) in [("Low", 0.4), ("High", 0.95), ("Mid", 0.7)] {
            store
                .append_match(&job_match("a@x.com", title, score))
                .await
                .unwrap();
        }
        let titles: Vec<_> = store
            .list_matches("a@x.com")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["High", "Mid", "Low"]);
    }

    #[tokio::test]
    async fn test_concurrent_appends_for_same_user_are_all_kept() {
        let store = Arc::new(MemoryProfileStore::new());
        store.save_profile(&profile("a@x.com")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append_match(&job_match("a@x.com", &format!("Job {i}"), 0.5))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.list_matches("a@x.com").await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_list_emails_is_sorted() {
        let store = MemoryProfileStore::new();
        for email in ["c@x.com", "a@x.com", "b@x.com"] {
            store.save_profile(&profile(email)).await.unwrap();
        }
        assert_eq!(
            store.list_emails().await.unwrap(),
            vec!["a@x.com", "b@x.com", "c@x.com"]
        );
    }
}
