use crate::model::TableSummary;
use itertools::Itertools;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Oracle output failed validation after {attempts} attempts:\n{}", format_attempts(.errors))]
    OracleValidation { attempts: usize, errors: Vec<String> },

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Upstream request to {url} failed ({status}): {message}")]
    Upstream {
        url: String,
        status: String,
        message: String,
    },

    #[error("No table found: {reason}")]
    ResolutionExhausted {
        reason: String,
        candidates: Vec<TableSummary>,
    },

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    pub fn exhausted(reason: impl Into<String>) -> Self {
        AgentError::ResolutionExhausted {
            reason: reason.into(),
            candidates: Vec::new(),
        }
    }

    /// Whether the failure is the "inconclusive" outcome rather than a hard error.
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, AgentError::ResolutionExhausted { .. })
    }
}

fn format_attempts(errors: &[String]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, e)| format!("  attempt {}: {}", i + 1, e))
        .join("\n")
}

pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_attempt() {
        let err = AgentError::OracleValidation {
            attempts: 2,
            errors: vec!["missing tableId".to_string(), "not valid JSON".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("after 2 attempts"));
        assert!(msg.contains("attempt 1: missing tableId"));
        assert!(msg.contains("attempt 2: not valid JSON"));
    }

    #[test]
    fn only_exhaustion_is_inconclusive() {
        assert!(AgentError::exhausted("nothing matched").is_inconclusive());
        assert!(!AgentError::Cancelled.is_inconclusive());
    }
}
