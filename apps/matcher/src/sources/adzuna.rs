use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{truncate_chars, Posting, PostingSource, SearchQuery, SourceError, BODY_PREVIEW_CHARS};
use crate::config::MAX_PAGE_SIZE;

const ADZUNA_API_URL: &str = "https://api.adzuna.com";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<AdzunaJob>,
}

#[derive(Debug, Deserialize)]
struct AdzunaJob {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    company: Option<DisplayName>,
    #[serde(default)]
    location: Option<DisplayName>,
    #[serde(default)]
    redirect_url: String,
    #[serde(default)]
    salary_max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DisplayName {
    #[serde(default)]
    display_name: String,
}

impl From<AdzunaJob> for Posting {
    fn from(job: AdzunaJob) -> Self {
        let external_id = job.id.and_then(|v| match v {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        Posting {
            external_id,
            title: job.title,
            description: job.description,
            company: job.company.map(|c| c.display_name).unwrap_or_default(),
            location: job.location.map(|l| l.display_name).unwrap_or_default(),
            redirect_url: job.redirect_url,
            salary_max: job.salary_max,
        }
    }
}

/// Adzuna job search client. One page per query, never more than ten results.
#[derive(Clone)]
pub struct AdzunaSource {
    client: Client,
    base_url: String,
    country: String,
    app_id: String,
    app_key: String,
}

impl AdzunaSource {
    pub fn new(app_id: String, app_key: String, country: String) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: ADZUNA_API_URL.to_string(),
            country,
            app_id,
            app_key,
        })
    }

    /// Points the client at a different host (used against local stubs).
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl PostingSource for AdzunaSource {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Posting>, SourceError> {
        let page_size = query.page_size.clamp(1, MAX_PAGE_SIZE);
        let url = format!("{}/v1/api/jobs/{}/search/1", self.base_url, self.country);
        let page_size_param = page_size.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("app_id", self.app_id.as_str()),
                ("app_key", self.app_key.as_str()),
                ("what", query.keywords.as_str()),
                ("where", query.location.as_str()),
                ("results_per_page", page_size_param.as_str()),
                ("content-type", "application/json"),
            ])
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        debug!(
            status = status.as_u16(),
            body = truncate_chars(&body, BODY_PREVIEW_CHARS),
            "Adzuna search response"
        );

        if !status.is_success() {
            warn!("Adzuna search returned {status}");
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: truncate_chars(&body, BODY_PREVIEW_CHARS).to_string(),
            });
        }

        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        Ok(parsed
            .results
            .into_iter()
            .take(page_size as usize)
            .map(Posting::from)
            .collect())
    }
}
