//! OpenAI-compatible oracle
//!
//! Each [`OracleRequest`] becomes one `/chat/completions` call with a single
//! function whose parameters are the request schema, and the model is forced
//! to call it. The raw `arguments` string is the answer.

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::oracle::{Oracle, OracleRequest};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

pub struct LlmClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: String, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let api_key = config
            .oracle_api_key
            .clone()
            .ok_or_else(|| AgentError::Config("OPENAI_API_KEY is not set".to_string()))?;
        Ok(Self::new(api_key, config.oracle_base_url.clone(), config.oracle_model.clone()))
    }

    fn request_body(&self, request: &OracleRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "functions": [{
                "name": request.name,
                "description": request.description,
                "parameters": request.schema,
            }],
            "function_call": { "name": request.name },
            "temperature": 0.1,
        });

        if self.model.starts_with("gpt-5") || self.model.contains("o1") {
            body["max_completion_tokens"] = json!(2000);
            // These models only accept the default temperature.
            if let Some(obj) = body.as_object_mut() {
                obj.remove("temperature");
            }
        } else {
            body["max_tokens"] = json!(2000);
        }
        body
    }
}

/// Pull the answer text out of a chat completion.
fn extract_answer(response: &Value) -> Result<String> {
    if let Some(error) = response.get("error") {
        return Err(AgentError::Oracle(format!("LLM API error: {}", error)));
    }

    let choices = response
        .get("choices")
        .and_then(|c| c.as_array())
        .ok_or_else(|| AgentError::Oracle("No choices array in LLM response".to_string()))?;
    let message = choices
        .first()
        .map(|c| &c["message"])
        .ok_or_else(|| AgentError::Oracle("Empty choices array in LLM response".to_string()))?;

    if let Some(arguments) = message["function_call"]["arguments"].as_str() {
        return Ok(arguments.to_string());
    }
    // Plain content still goes through validation and gets retried there.
    message["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| AgentError::Oracle("LLM response has neither function_call nor content".to_string()))
}

#[async_trait]
impl Oracle for LlmClient {
    async fn complete(&self, request: &OracleRequest) -> Result<String> {
        debug!("Calling {} for '{}' with {} messages", self.model, request.name, request.messages.len());
        let body = self.request_body(request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Oracle(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::Oracle(format!("LLM API error ({}): {}", status, error_text)));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| AgentError::Oracle(format!("Failed to parse LLM response: {}", e)))?;
        extract_answer(&response_json)
    }
}
