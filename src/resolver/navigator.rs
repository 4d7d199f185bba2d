//! Hierarchical navigation
//!
//! Breadth-limited walk down the folder tree. Each level fetches every
//! frontier folder concurrently, collects the tables it finds, and asks the
//! oracle which children (at most `max_breadth`) to explore next. The walk
//! stops after `max_depth` levels or when no unvisited folder is left.

use super::ranking::choose_table;
use super::TableResolver;
use crate::context::RequestContext;
use crate::error::{AgentError, Result};
use crate::model::{NavigationEntry, NodeKind, NodeRef, TableSummary};
use crate::oracle::schema::{array_of, object, string_enum};
use crate::oracle::{ChatMessage, OracleTask};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::info;

#[derive(Debug, Deserialize)]
struct FrontierChoice {
    selected: Vec<String>,
}

pub struct HierarchicalNavigator {
    pub max_depth: usize,
    pub max_breadth: usize,
}

impl HierarchicalNavigator {
    pub fn new(max_depth: usize, max_breadth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
            max_breadth: max_breadth.max(1),
        }
    }

    fn frontier_task(&self, options: &[(NodeRef, String)]) -> OracleTask {
        let listing: Vec<String> = options.iter().map(|(node, label)| format!("- {}: {}", node, label)).collect();
        let description = format!(
            "You navigate a catalogue of statistical tables to find the table that answers the user's request.\n\
             Pick up to {} entries to explore next: folders to open, or tables that look like direct answers.\n\
             Prefer the entries most specific to the request.\n\nEntries:\n{}",
            self.max_breadth,
            listing.join("\n")
        );
        let mut selected = array_of(
            string_enum(options.iter().map(|(node, _)| node.to_string())),
            Some(self.max_breadth),
        );
        selected["minItems"] = serde_json::json!(1);
        OracleTask::new(
            "select_entries",
            description,
            object(vec![("selected".to_string(), selected)], &["selected".to_string()]),
        )
    }

    /// Walk the tree and return every table seen, in discovery order.
    pub async fn collect_candidates(
        &self,
        ctx: RequestContext<'_>,
        query: &str,
        history: &[ChatMessage],
    ) -> Result<Vec<TableSummary>> {
        let mut frontier = vec![NodeRef::root()];
        let mut visited: HashSet<String> = HashSet::new();
        let mut candidates: Vec<TableSummary> = Vec::new();
        let mut candidate_ids: HashSet<String> = HashSet::new();

        for depth in 1..=self.max_depth {
            let folders: Vec<String> = frontier
                .iter()
                .filter(|n| n.kind == NodeKind::Folder)
                .filter(|n| visited.insert(n.id.clone()))
                .map(|n| n.id.clone())
                .collect();
            if folders.is_empty() {
                info!("Navigation stopped at depth {}: no folders left in frontier", depth);
                break;
            }

            let listings = ctx
                .fetch(try_join_all(folders.iter().map(|id| ctx.api.folder_contents(id))))
                .await?;

            let mut seen: HashSet<NodeRef> = HashSet::new();
            let mut children: Vec<(NodeRef, NavigationEntry)> = Vec::new();
            for entry in listings.into_iter().flatten() {
                if let Some(node) = entry.node() {
                    if seen.insert(node.clone()) {
                        children.push((node, entry));
                    }
                }
            }

            for (_, entry) in &children {
                if let NavigationEntry::Table(table) = entry {
                    if candidate_ids.insert(table.id.clone()) {
                        ctx.progress.log(format!("Found table {}: {}", table.id, table.label));
                        candidates.push(table.clone());
                    }
                }
            }

            let options: Vec<(NodeRef, String)> = children
                .iter()
                .filter(|(node, _)| node.kind == NodeKind::Table || !visited.contains(&node.id))
                .map(|(node, entry)| (node.clone(), entry.label().to_string()))
                .collect();
            if !options.iter().any(|(node, _)| node.kind == NodeKind::Folder) {
                info!("Navigation exhausted at depth {}: no unvisited folders", depth);
                break;
            }
            if depth == self.max_depth {
                info!("Navigation reached max depth {}", self.max_depth);
                break;
            }

            let mut context = history.to_vec();
            context.push(ChatMessage::user(query.to_string()));
            let choice: FrontierChoice = ctx.oracle_call().call(&self.frontier_task(&options), &context).await?;

            let labels: HashMap<&NodeRef, &str> = options.iter().map(|(n, l)| (n, l.as_str())).collect();
            let mut next = Vec::new();
            for raw in &choice.selected {
                let node: NodeRef = raw.parse()?;
                if node.kind == NodeKind::Folder {
                    let label = labels.get(&node).copied().unwrap_or_default();
                    ctx.progress.nav(format!("Exploring {}", label));
                }
                if !next.contains(&node) {
                    next.push(node);
                }
            }
            frontier = next;
        }

        Ok(candidates)
    }
}

#[async_trait]
impl TableResolver for HierarchicalNavigator {
    async fn resolve(&self, ctx: RequestContext<'_>, query: &str, history: &[ChatMessage]) -> Result<String> {
        let candidates = self.collect_candidates(ctx, query, history).await?;
        match candidates.len() {
            0 => Err(AgentError::exhausted(format!(
                "no table found within {} navigation levels",
                self.max_depth
            ))),
            1 => choose_table(ctx, query, history, candidates).await,
            n => {
                info!("Fetching summaries for {} candidate tables", n);
                let summaries = ctx
                    .fetch(try_join_all(candidates.iter().map(|c| ctx.api.table_summary(&c.id))))
                    .await?;
                choose_table(ctx, query, history, summaries).await
            }
        }
    }
}
