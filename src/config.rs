//! Agent configuration
//!
//! Defaults, overridable from the environment (`.env` is loaded by the binary)
//! and then from CLI flags.

use crate::error::{AgentError, Result};
use crate::oracle::DEFAULT_MAX_RETRIES;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const PRODUCTION_API_URL: &str = "https://data.ssb.no/api/pxwebapi/v2/";
pub const QA_API_URL: &str = "https://data.qa.ssb.no/api/pxwebapi/v2/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverStrategy {
    Keyword,
    Hierarchical,
}

impl FromStr for ResolverStrategy {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "keyword" | "search" => Ok(ResolverStrategy::Keyword),
            "hierarchical" | "navigation" | "tree" => Ok(ResolverStrategy::Hierarchical),
            other => Err(AgentError::Config(format!("unknown resolver strategy '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub api_base_url: String,
    pub qa_api_base_url: String,
    pub use_qa: bool,
    pub language: String,
    pub oracle_model: String,
    pub oracle_base_url: String,
    #[serde(skip_serializing)]
    pub oracle_api_key: Option<String>,
    pub max_retries: usize,
    pub max_depth: usize,
    pub max_breadth: usize,
    pub num_keywords: usize,
    pub search_page_size: usize,
    /// Category values listed per dimension in prompts before eliding.
    pub max_listed_values: usize,
    pub max_notes_chars: usize,
    pub strategy: ResolverStrategy,
    /// One oracle call per dimension, issued concurrently.
    pub per_dimension_selection: bool,
    pub refine_intent: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_base_url: PRODUCTION_API_URL.to_string(),
            qa_api_base_url: QA_API_URL.to_string(),
            use_qa: false,
            language: "en".to_string(),
            oracle_model: "gpt-4o".to_string(),
            oracle_base_url: "https://api.openai.com/v1".to_string(),
            oracle_api_key: None,
            max_retries: DEFAULT_MAX_RETRIES,
            max_depth: 5,
            max_breadth: 3,
            num_keywords: 5,
            search_page_size: 20,
            max_listed_values: 50,
            max_notes_chars: 1500,
            strategy: ResolverStrategy::Keyword,
            per_dimension_selection: false,
            refine_intent: true,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AgentConfig::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("STAT_API_BASE_URL") {
            config.api_base_url = v;
        }
        if let Some(v) = get("STAT_API_QA_BASE_URL") {
            config.qa_api_base_url = v;
        }
        if let Some(v) = get("STAT_API_USE_QA") {
            config.use_qa = parse_value("STAT_API_USE_QA", &v)?;
        }
        if let Some(v) = get("STAT_API_LANG") {
            config.language = v;
        }
        if let Some(v) = get("OPENAI_MODEL") {
            config.oracle_model = v;
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            config.oracle_base_url = v;
        }
        config.oracle_api_key = get("OPENAI_API_KEY");
        if let Some(v) = get("AGENT_MAX_RETRIES") {
            config.max_retries = parse_value("AGENT_MAX_RETRIES", &v)?;
        }
        if let Some(v) = get("AGENT_MAX_DEPTH") {
            config.max_depth = parse_value("AGENT_MAX_DEPTH", &v)?;
        }
        if let Some(v) = get("AGENT_MAX_BREADTH") {
            config.max_breadth = parse_value("AGENT_MAX_BREADTH", &v)?;
        }
        if let Some(v) = get("AGENT_NUM_KEYWORDS") {
            config.num_keywords = parse_value("AGENT_NUM_KEYWORDS", &v)?;
        }
        if let Some(v) = get("AGENT_SEARCH_PAGE_SIZE") {
            config.search_page_size = parse_value("AGENT_SEARCH_PAGE_SIZE", &v)?;
        }
        if let Some(v) = get("AGENT_MAX_LISTED_VALUES") {
            config.max_listed_values = parse_value("AGENT_MAX_LISTED_VALUES", &v)?;
        }
        if let Some(v) = get("AGENT_MAX_NOTES_CHARS") {
            config.max_notes_chars = parse_value("AGENT_MAX_NOTES_CHARS", &v)?;
        }
        if let Some(v) = get("AGENT_STRATEGY") {
            config.strategy = v.parse()?;
        }
        if let Some(v) = get("AGENT_PER_DIMENSION_SELECTION") {
            config.per_dimension_selection = parse_value("AGENT_PER_DIMENSION_SELECTION", &v)?;
        }
        if let Some(v) = get("AGENT_REFINE_INTENT") {
            config.refine_intent = parse_value("AGENT_REFINE_INTENT", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("max_retries", self.max_retries),
            ("max_depth", self.max_depth),
            ("max_breadth", self.max_breadth),
            ("num_keywords", self.num_keywords),
            ("search_page_size", self.search_page_size),
        ] {
            if value == 0 {
                return Err(AgentError::Config(format!("{} must be at least 1", name)));
            }
        }
        Ok(())
    }

    /// Base URL of the table API this request should talk to.
    pub fn data_source_url(&self) -> &str {
        if self.use_qa {
            &self.qa_api_base_url
        } else {
            &self.api_base_url
        }
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse::<T>()
        .map_err(|_| AgentError::Config(format!("{}='{}' is not a valid value", key, raw)))
}
