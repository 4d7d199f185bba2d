//! Oracle boundary
//!
//! The natural-language service is a black box: it receives a task, a target
//! JSON schema and chat context, and returns raw text. Nothing untyped leaves
//! this module; [`SchemaValidatedCall`] turns raw text into a typed value or
//! an error.

pub mod call;
pub mod schema;

pub use call::*;
pub use schema::*;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message in chat-completion format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String, // "system", "user", "assistant"
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

/// One structured-output request.
#[derive(Debug, Clone)]
pub struct OracleRequest {
    /// Function name the answer is returned through, e.g. `select_table`.
    pub name: String,
    pub description: String,
    pub schema: serde_json::Value,
    pub messages: Vec<ChatMessage>,
}

#[async_trait]
pub trait Oracle: Send + Sync {
    /// Raw answer text for `request`. Transport failures are errors; malformed
    /// answers are not, they are caught by validation.
    async fn complete(&self, request: &OracleRequest) -> Result<String>;
}
