use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::{ProfileStore, StoreError};
use crate::models::job_match::JobMatch;
use crate::models::profile::Profile;

/// Postgres-backed store. Concurrency comes from the pool; each match write
/// runs in its own transaction.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get_profile(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        Ok(sqlx::query_as::<_, Profile>(
            "SELECT email, skills, desired_title, location FROM profiles WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (email, skills, desired_title, location, updated_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (email) DO UPDATE
            SET skills = EXCLUDED.skills,
                desired_title = EXCLUDED.desired_title,
                location = EXCLUDED.location,
                updated_at = now()
            "#,
        )
        .bind(&profile.email)
        .bind(&profile.skills)
        .bind(&profile.desired_title)
        .bind(&profile.location)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_match(&self, job_match: &JobMatch) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Lock the profile row so it cannot disappear between the check and the write.
        let owner: Option<String> =
            sqlx::query_scalar("SELECT email FROM profiles WHERE email = $1 FOR SHARE")
                .bind(&job_match.email)
                .fetch_optional(&mut *tx)
                .await?;
        if owner.is_none() {
            return Err(StoreError::MissingProfile(job_match.email.clone()));
        }

        sqlx::query(
            r#"
            INSERT INTO matches
                (email, posting_key, title, score, redirect_url, description,
                 company, location, salary_max, matched_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (email, posting_key) DO UPDATE
            SET title = EXCLUDED.title,
                score = EXCLUDED.score,
                redirect_url = EXCLUDED.redirect_url,
                description = EXCLUDED.description,
                company = EXCLUDED.company,
                location = EXCLUDED.location,
                salary_max = EXCLUDED.salary_max,
                matched_at = EXCLUDED.matched_at
            "#,
        )
        .bind(&job_match.email)
        .bind(&job_match.posting_key)
        .bind(&job_match.title)
        .bind(job_match.score)
        .bind(&job_match.redirect_url)
        .bind(&job_match.description)
        .bind(&job_match.company)
        .bind(&job_match.location)
        .bind(job_match.salary_max)
        .bind(job_match.matched_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(
            "Stored match {} for {}",
            job_match.posting_key, job_match.email
        );
        Ok(())
    }

    async fn list_matches(&self, email: &str) -> Result<Vec<JobMatch>, StoreError> {
        Ok(sqlx::query_as::<_, JobMatch>(
            r#"
            SELECT email, posting_key, title, score, redirect_url, description,
                   company, location, salary_max, matched_at
            FROM matches
            WHERE email = $1
            ORDER BY score DESC, matched_at DESC
            "#,
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_emails(&self) -> Result<Vec<String>, StoreError> {
        Ok(
            sqlx::query_scalar("SELECT email FROM profiles ORDER BY email")
                .fetch_all(&self.pool)
                .await?,
        )
    }
}
