use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Upper bound on postings requested per search.
pub const MAX_PAGE_SIZE: u32 = 10;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub adzuna_app_id: String,
    pub adzuna_app_key: String,
    pub adzuna_country: String,
    pub port: u16,
    pub rust_log: String,
    /// `postgres` (default) or `memory` for local development without a database.
    pub store_backend: String,
    pub matching: MatchConfig,
    pub scheduler_enabled: bool,
    pub sweep_interval: Duration,
    pub run_timeout: Duration,
}

/// Constants that shape one pipeline run. Identical for every call.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// A posting is accepted only when its score is strictly greater than this.
    pub threshold: f64,
    /// Score used whenever the oracle reply cannot be decoded.
    pub fallback_score: f64,
    /// Descriptions are cut to this many characters before being sent to the oracle.
    pub description_prefix_chars: usize,
    pub page_size: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            fallback_score: 0.5,
            description_prefix_chars: 2000,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            bail!("MATCH_THRESHOLD must be within [0, 1], got {}", self.threshold);
        }
        if !(0.0..=1.0).contains(&self.fallback_score) {
            bail!(
                "FALLBACK_SCORE must be within [0, 1], got {}",
                self.fallback_score
            );
        }
        if self.description_prefix_chars == 0 {
            bail!("DESCRIPTION_PREFIX_CHARS must be positive");
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            bail!(
                "PAGE_SIZE must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            );
        }
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let store_backend = std::env::var("STORE").unwrap_or_else(|_| "postgres".to_string());
        let database_url = if store_backend == "memory" {
            std::env::var("DATABASE_URL").unwrap_or_default()
        } else {
            require_env("DATABASE_URL")?
        };

        let defaults = MatchConfig::default();
        let matching = MatchConfig {
            threshold: parse_env("MATCH_THRESHOLD", defaults.threshold)?,
            fallback_score: parse_env("FALLBACK_SCORE", defaults.fallback_score)?,
            description_prefix_chars: parse_env(
                "DESCRIPTION_PREFIX_CHARS",
                defaults.description_prefix_chars,
            )?,
            page_size: parse_env("PAGE_SIZE", defaults.page_size)?,
        };
        matching.validate()?;

        Ok(Config {
            database_url,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            adzuna_app_id: require_env("ADZUNA_APP_ID")?,
            adzuna_app_key: require_env("ADZUNA_APP_KEY")?,
            adzuna_country: std::env::var("ADZUNA_COUNTRY").unwrap_or_else(|_| "us".to_string()),
            port: parse_env("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            store_backend,
            matching,
            scheduler_enabled: std::env::var("SCHEDULER_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
            sweep_interval: Duration::from_secs(parse_env("SWEEP_INTERVAL_SECS", 86_400u64)?),
            run_timeout: Duration::from_secs(parse_env("RUN_TIMEOUT_SECS", 300u64)?),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim(), "1" | "true" | "TRUE" | "True" | "yes")
}
