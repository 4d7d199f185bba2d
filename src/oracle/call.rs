//! Schema-validated oracle call
//!
//! Bounded retry loop: every answer is parsed, schema-checked and
//! deserialized; on failure the rejected answer and the validation errors are
//! appended to the conversation and the oracle is asked again.

use super::schema::{strip_code_fence, validate};
use super::{ChatMessage, Oracle, OracleRequest};
use crate::cancel::guarded;
use crate::error::{AgentError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const DEFAULT_MAX_RETRIES: usize = 5;

/// Fixed part of one oracle call: what to do and the shape of the answer.
#[derive(Debug, Clone)]
pub struct OracleTask {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

impl OracleTask {
    pub fn new(name: impl Into<String>, description: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
        }
    }
}

pub struct SchemaValidatedCall<'a> {
    oracle: &'a dyn Oracle,
    cancel: &'a CancellationToken,
    max_retries: usize,
}

impl<'a> SchemaValidatedCall<'a> {
    pub fn new(oracle: &'a dyn Oracle, cancel: &'a CancellationToken, max_retries: usize) -> Self {
        Self {
            oracle,
            cancel,
            max_retries: max_retries.max(1),
        }
    }

    pub async fn call<T: DeserializeOwned>(&self, task: &OracleTask, context: &[ChatMessage]) -> Result<T> {
        self.call_checked(task, context, |_: &T| Ok(())).await
    }

    /// Like [`call`](Self::call), with an extra semantic check on the typed value.
    /// A check failure is retried exactly like a schema violation.
    pub async fn call_checked<T, F>(&self, task: &OracleTask, context: &[ChatMessage], check: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> std::result::Result<(), String>,
    {
        let mut messages = Vec::with_capacity(context.len() + 1);
        messages.push(ChatMessage::system(task.description.clone()));
        messages.extend_from_slice(context);

        let mut errors: Vec<String> = Vec::new();

        for attempt in 1..=self.max_retries {
            debug!("Oracle call '{}' attempt {} of {}", task.name, attempt, self.max_retries);
            let request = OracleRequest {
                name: task.name.clone(),
                description: task.description.clone(),
                schema: task.schema.clone(),
                messages: messages.clone(),
            };
            let raw = guarded(self.cancel, self.oracle.complete(&request)).await?;

            let problem = match parse_answer::<T>(&task.schema, &raw)? {
                Ok(value) => match check(&value) {
                    Ok(()) => return Ok(value),
                    Err(problem) => problem,
                },
                Err(problem) => problem,
            };

            warn!("Oracle call '{}' attempt {} rejected: {}", task.name, attempt, problem);
            errors.push(problem.clone());
            messages.push(ChatMessage::assistant(raw));
            messages.push(ChatMessage::user(format!(
                "RETRY ATTEMPT {}: your previous answer was rejected.\nErrors so far:\n{}\nAnswer again, following the schema exactly.",
                attempt,
                errors
                    .iter()
                    .enumerate()
                    .map(|(i, e)| format!("{}. {}", i + 1, e))
                    .collect::<Vec<_>>()
                    .join("\n")
            )));
        }

        Err(AgentError::OracleValidation {
            attempts: self.max_retries,
            errors,
        })
    }
}

/// Outer `Result` is for broken schemas, inner for rejected answers.
fn parse_answer<T: DeserializeOwned>(schema: &Value, raw: &str) -> Result<std::result::Result<T, String>> {
    let json: Value = match serde_json::from_str(strip_code_fence(raw)) {
        Ok(v) => v,
        Err(e) => return Ok(Err(format!("answer is not valid JSON: {}", e))),
    };
    let violations = validate(schema, &json)?;
    if !violations.is_empty() {
        return Ok(Err(violations.join("; ")));
    }
    Ok(serde_json::from_value::<T>(json).map_err(|e| format!("answer does not match expected shape: {}", e)))
}
