//! Table resolution
//!
//! Turns a request into exactly one table id, either by walking the folder
//! tree or by keyword search. Both strategies end in the same ranking step.

pub mod keyword;
pub mod navigator;
pub mod ranking;

pub use keyword::{KeywordResolver, SearchMode};
pub use navigator::HierarchicalNavigator;
pub use ranking::{choose_table, NO_MATCH};

use crate::config::{AgentConfig, ResolverStrategy};
use crate::context::RequestContext;
use crate::error::Result;
use crate::oracle::ChatMessage;
use async_trait::async_trait;

#[async_trait]
pub trait TableResolver: Send + Sync {
    /// Id of the single table that should answer `query`.
    async fn resolve(&self, ctx: RequestContext<'_>, query: &str, history: &[ChatMessage]) -> Result<String>;
}

/// Resolver for the configured strategy.
pub fn for_config(config: &AgentConfig) -> Box<dyn TableResolver> {
    match config.strategy {
        ResolverStrategy::Hierarchical => Box::new(HierarchicalNavigator::new(config.max_depth, config.max_breadth)),
        ResolverStrategy::Keyword => Box::new(KeywordResolver::new(config.num_keywords, config.search_page_size)),
    }
}
