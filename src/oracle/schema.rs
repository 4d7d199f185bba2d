//! JSON schema construction and validation for oracle answers.

use crate::error::{AgentError, Result};
use serde_json::{json, Map, Value};

pub fn string(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

pub fn string_enum<I, S>(values: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let values: Vec<Value> = values.into_iter().map(|v| Value::String(v.into())).collect();
    json!({ "type": "string", "enum": values })
}

pub fn integer(minimum: i64) -> Value {
    json!({ "type": "integer", "minimum": minimum })
}

pub fn array_of(items: Value, max_items: Option<usize>) -> Value {
    let mut schema = json!({ "type": "array", "items": items });
    if let Some(max) = max_items {
        schema["maxItems"] = json!(max);
    }
    schema
}

/// Closed object: unknown properties are rejected.
pub fn object(properties: Vec<(String, Value)>, required: &[String]) -> Value {
    let mut props = Map::new();
    for (name, schema) in properties {
        props.insert(name, schema);
    }
    json!({
        "type": "object",
        "properties": props,
        "required": required,
        "additionalProperties": false,
    })
}

/// Remove a surrounding markdown code fence, if the model added one.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Validate `instance` against `schema`, collecting every violation.
pub fn validate(schema: &Value, instance: &Value) -> Result<Vec<String>> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| AgentError::Oracle(format!("invalid response schema: {}", e)))?;
    Ok(validator
        .iter_errors(instance)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{}: {}", path, e)
            }
        })
        .collect())
}
