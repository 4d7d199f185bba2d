//! Keyword search resolution
//!
//! The oracle proposes short literal keywords; the search endpoint is queried
//! with them and the hits are ranked like navigation candidates.

use super::ranking::choose_table;
use super::TableResolver;
use crate::context::RequestContext;
use crate::error::{AgentError, Result};
use crate::model::TableSummary;
use crate::oracle::schema::{array_of, object, string};
use crate::oracle::{ChatMessage, OracleTask};
use async_trait::async_trait;
use futures::future::try_join_all;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{info, warn};

const MAX_KEYWORD_WORDS: usize = 3;

lazy_static! {
    static ref LITERAL_KEYWORD: Regex = Regex::new(r"^[\p{L}\p{N}][\p{L}\p{N} \-]*$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// One search with all keywords joined by spaces.
    Joined,
    /// One search per keyword, run concurrently, hits merged in first-seen order.
    PerKeyword,
}

#[derive(Debug, Deserialize)]
struct Keywords {
    keywords: Vec<String>,
}

pub struct KeywordResolver {
    pub num_keywords: usize,
    pub page_size: usize,
    pub mode: SearchMode,
}

impl KeywordResolver {
    pub fn new(num_keywords: usize, page_size: usize) -> Self {
        Self {
            num_keywords: num_keywords.max(1),
            page_size: page_size.max(1),
            mode: SearchMode::Joined,
        }
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    fn keyword_task(&self) -> OracleTask {
        let description = format!(
            "You turn a request for statistics into search keywords for a catalogue of statistical tables.\n\
             The search matches words literally in table titles and variable names, so give at most {} short keywords \
             of one to three plain words each, in the catalogue's language. No operators, quotes or wildcards.\n\
             Keywords name the subject being measured, never the filter values: leave out place and region names, \
             years and other periods, numbers, and whole sentences.",
            self.num_keywords
        );
        let schema = object(
            vec![(
                "keywords".to_string(),
                array_of(string("one to three plain words"), Some(self.num_keywords)),
            )],
            &["keywords".to_string()],
        );
        OracleTask::new("search_keywords", description, schema)
    }

    async fn search(&self, ctx: RequestContext<'_>, keywords: &[String]) -> Result<Vec<TableSummary>> {
        match self.mode {
            SearchMode::Joined => {
                let query = keywords.join(" ");
                ctx.progress.nav(format!("Searching tables for \"{}\"", query));
                ctx.fetch(ctx.api.search_tables(&query, self.page_size)).await
            }
            SearchMode::PerKeyword => {
                for keyword in keywords {
                    ctx.progress.nav(format!("Searching tables for \"{}\"", keyword));
                }
                let pages = ctx
                    .fetch(try_join_all(
                        keywords.iter().map(|k| ctx.api.search_tables(k, self.page_size)),
                    ))
                    .await?;
                let mut seen = HashSet::new();
                Ok(pages
                    .into_iter()
                    .flatten()
                    .filter(|t| seen.insert(t.id.clone()))
                    .collect())
            }
        }
    }
}

/// Lower-case, dedupe and keep only short literal keywords.
pub fn sanitize_keywords(raw: &[String]) -> (Vec<String>, Vec<String>) {
    let mut kept: Vec<String> = Vec::new();
    let mut dropped = Vec::new();
    for keyword in raw {
        let keyword = keyword.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        if keyword.is_empty() || kept.contains(&keyword) {
            continue;
        }
        if keyword.split(' ').count() > MAX_KEYWORD_WORDS || !LITERAL_KEYWORD.is_match(&keyword) {
            dropped.push(keyword);
        } else {
            kept.push(keyword);
        }
    }
    (kept, dropped)
}

#[async_trait]
impl TableResolver for KeywordResolver {
    async fn resolve(&self, ctx: RequestContext<'_>, query: &str, history: &[ChatMessage]) -> Result<String> {
        let mut context = history.to_vec();
        context.push(ChatMessage::user(query.to_string()));
        let answer: Keywords = ctx.oracle_call().call(&self.keyword_task(), &context).await?;

        let (keywords, dropped) = sanitize_keywords(&answer.keywords);
        for keyword in &dropped {
            warn!("Dropping search keyword '{}'", keyword);
            ctx.progress.log(format!("Ignoring search keyword \"{}\"", keyword));
        }
        if keywords.is_empty() {
            return Err(AgentError::exhausted("no usable search keywords"));
        }
        info!("Searching with keywords {:?}", keywords);

        let hits = self.search(ctx, &keywords).await?;
        for hit in &hits {
            ctx.progress.log(format!("Found table {}: {}", hit.id, hit.label));
        }
        if hits.is_empty() {
            return Err(AgentError::exhausted(format!(
                "search for {} returned no tables",
                keywords.join(", ")
            )));
        }
        choose_table(ctx, query, history, hits).await
    }
}
