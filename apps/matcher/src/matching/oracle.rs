//! Match Oracle — untrusted text scorer plus the strict decode-with-fallback wrapper.
//!
//! The oracle is only trusted to return *text*. `score_posting` owns everything
//! else: prompt shaping, decoding, clamping and the fallback.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::config::MatchConfig;
use crate::llm_client::{strip_json_fences, LlmClient, LlmError};
use crate::matching::prompts::{score_prompt, SCORE_SYSTEM};
use crate::sources::truncate_chars;

#[async_trait]
pub trait MatchOracle: Send + Sync {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError>;
}

#[async_trait]
impl MatchOracle for LlmClient {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        self.call_text(prompt, system).await
    }
}

/// A posting's score, always within [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub value: f64,
    /// True when the oracle failed and the fallback was substituted.
    pub degraded: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("reply is empty")]
    Empty,

    #[error("reply is not a number: {0}")]
    NotANumber(String),

    #[error("score is not finite")]
    NonFinite,
}

/// Formats skills as the delimited list the prompt expects.
pub fn format_skills(skills: &[String]) -> String {
    skills.join(", ")
}

/// Decodes an oracle reply into a raw (unclamped) score.
///
/// Accepted shapes: a bare decimal, a JSON number, or a JSON object with a
/// numeric `score` field, optionally wrapped in code fences.
pub fn decode_score(reply: &str) -> Result<f64, DecodeError> {
    let text = strip_json_fences(reply).trim();
    if text.is_empty() {
        return Err(DecodeError::Empty);
    }

    let value = match text.parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            let parsed: Value = serde_json::from_str(text)
                .map_err(|_| DecodeError::NotANumber(truncate_chars(text, 50).to_string()))?;
            number_from_json(&parsed)
                .ok_or_else(|| DecodeError::NotANumber(truncate_chars(text, 50).to_string()))?
        }
    };

    if !value.is_finite() {
        return Err(DecodeError::NonFinite);
    }
    Ok(value)
}

fn number_from_json(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Object(map) => match map.get("score")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        },
        _ => None,
    }
}

/// Scores one posting description against a skill set. Never fails.
pub async fn score_posting(
    oracle: &dyn MatchOracle,
    description: &str,
    skills: &[String],
    config: &MatchConfig,
) -> Score {
    let excerpt = truncate_chars(description, config.description_prefix_chars);
    let prompt = score_prompt(excerpt, &format_skills(skills));

    let decoded = match oracle.complete(&prompt, SCORE_SYSTEM).await {
        Ok(reply) => decode_score(&reply).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match decoded {
        Ok(value) => Score {
            value: value.clamp(0.0, 1.0),
            degraded: false,
        },
        Err(reason) => {
            warn!(
                "Oracle degraded for job '{}...': {reason}; using fallback {}",
                truncate_chars(description, 50),
                config.fallback_score
            );
            Score {
                value: config.fallback_score.clamp(0.0, 1.0),
                degraded: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::testing::ScriptedOracle;

    fn skills() -> Vec<String> {
        vec!["Python".to_string(), "AWS".to_string()]
    }

    #[test]
    fn test_decode_bare_decimal() {
        assert_eq!(decode_score("0.85"), Ok(0.85));
        assert_eq!(decode_score("  0.4\n"), Ok(0.4));
        assert_eq!(decode_score("1"), Ok(1.0));
    }

    #[test]
    fn test_decode_json_shapes() {
        assert_eq!(decode_score("{\"score\": 0.7}"), Ok(0.7));
        assert_eq!(decode_score("{\"score\": \"0.6\"}"), Ok(0.6));
        assert_eq!(decode_score("```json\n{\"score\": 0.9}\n```"), Ok(0.9));
        assert_eq!(decode_score("```\n0.2\n```"), Ok(0.2));
    }

    #[test]
    fn test_decode_rejects_non_numbers() {
        assert_eq!(decode_score(""), Err(DecodeError::Empty));
        assert!(matches!(decode_score("N/A"), Err(DecodeError::NotANumber(_))));
        assert!(matches!(decode_score("abc"), Err(DecodeError::NotANumber(_))));
        assert!(matches!(
            decode_score("Score: 0.8"),
            Err(DecodeError::NotANumber(_))
        ));
        assert!(matches!(
            decode_score("{\"fit\": 0.8}"),
            Err(DecodeError::NotANumber(_))
        ));
        assert!(matches!(decode_score("[0.8]"), Err(DecodeError::NotANumber(_))));
    }

    #[test]
    fn test_decode_rejects_non_finite() {
        assert_eq!(decode_score("NaN"), Err(DecodeError::NonFinite));
        assert_eq!(decode_score("inf"), Err(DecodeError::NonFinite));
    }

    #[test]
    fn test_format_skills() {
        assert_eq!(format_skills(&skills()), "Python, AWS");
        assert_eq!(format_skills(&[]), "");
    }

    #[tokio::test]
    async fn test_score_is_clamped_high() {
        let oracle = ScriptedOracle::always("1.7");
        let score = score_posting(&oracle, "desc", &skills(), &MatchConfig::default()).await;
        assert_eq!(score, Score { value: 1.0, degraded: false });
    }

    #[tokio::test]
    async fn test_score_is_clamped_low() {
        let oracle = ScriptedOracle::always("-0.4");
        let score = score_posting(&oracle, "desc", &skills(), &MatchConfig::default()).await;
        assert_eq!(score.value, 0.0);
        assert!(!score.degraded);
    }

    #[tokio::test]
    async fn test_malformed_reply_uses_fallback() {
        let oracle = ScriptedOracle::always("abc");
        let score = score_posting(&oracle, "desc", &skills(), &MatchConfig::default()).await;
        assert_eq!(score, Score { value: 0.5, degraded: true });
    }

    #[tokio::test]
    async fn test_transport_error_uses_fallback() {
        let oracle = ScriptedOracle::failing();
        let score = score_posting(&oracle, "desc", &skills(), &MatchConfig::default()).await;
        assert_eq!(score, Score { value: 0.5, degraded: true });
    }

    #[tokio::test]
    async fn test_prompt_carries_truncated_description_and_skills() {
        let oracle = ScriptedOracle::always("0.5");
        let description = format!("{}TAIL", "a".repeat(2000));
        score_posting(&oracle, &description, &skills(), &MatchConfig::default()).await;

        let prompts = oracle.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(&"a".repeat(2000)));
        assert!(!prompts[0].contains("TAIL"));
        assert!(prompts[0].contains("Python, AWS"));
    }
}
