//! Value selection
//!
//! One oracle call whose schema has a selection object per remaining
//! dimension (required when the dimension cannot be eliminated), or, in
//! per-dimension mode, one concurrent call per dimension.

use super::describe::{describe_dimension, truncate_chars};
use super::intent::{RawSelection, SelectionIntent};
use crate::context::RequestContext;
use crate::error::Result;
use crate::model::{Dimension, TableMetadata};
use crate::oracle::schema::object;
use crate::oracle::{ChatMessage, OracleTask};
use futures::future::try_join_all;
use std::collections::HashMap;
use tracing::info;

const RULES: &str = "You translate a request for statistics into value selections on one table.\n\
Selection forms, use exactly one per dimension:\n\
- itemSelection: list of category keys.\n\
- wildcard: true selects every value.\n\
- top / bottom: {count, offset} selects the first / last `count` values in the listed order, skipping `offset`.\n\
- range: {start, end} selects the keys from start to end inclusive, in the listed order.\n\
- from: a key; selects it and every value after it.\n\
- to: a key; selects every value up to and including it.\n\
Rules, in priority order:\n\
1. If a listed category already means \"all\" or \"total\" and that is what the user wants, select that key instead of using wildcard.\n\
2. Leave out optional dimensions the request does not mention; do not fill them with wildcard.\n\
3. For a time dimension with no period requested, select the latest period.\n\
4. Use category keys exactly as listed. Never invent keys.";

pub struct ValueSelector<'a> {
    ctx: RequestContext<'a>,
}

impl<'a> ValueSelector<'a> {
    pub fn new(ctx: RequestContext<'a>) -> Self {
        Self { ctx }
    }

    fn task(&self, table: &TableMetadata, dims: &[&Dimension]) -> OracleTask {
        let cap = self.ctx.config.max_listed_values;
        let mut description = format!("{}\n\nTable {}: {}\n", RULES, table.id, table.label);
        if !table.notes.is_empty() {
            description.push_str(&format!(
                "Notes: {}\n",
                truncate_chars(&table.notes.join(" "), self.ctx.config.max_notes_chars)
            ));
        }
        for dim in dims {
            description.push('\n');
            description.push_str(&describe_dimension(dim, cap));
            description.push('\n');
        }

        let properties = dims
            .iter()
            .map(|d| (d.key.clone(), RawSelection::schema()))
            .collect();
        let required: Vec<String> = dims
            .iter()
            .filter(|d| !d.eliminable)
            .map(|d| d.key.clone())
            .collect();
        OracleTask::new("select_values", description, object(properties, &required))
    }

    async fn ask(
        &self,
        table: &TableMetadata,
        dims: &[&Dimension],
        context: &[ChatMessage],
    ) -> Result<Vec<(String, SelectionIntent)>> {
        let task = self.task(table, dims);
        let answer: HashMap<String, RawSelection> = self
            .ctx
            .oracle_call()
            .call_checked(&task, context, |answer: &HashMap<String, RawSelection>| {
                let problems: Vec<String> = answer
                    .iter()
                    .filter_map(|(key, raw)| raw.clone().into_intent().err().map(|e| format!("{}: {}", key, e)))
                    .collect();
                if problems.is_empty() {
                    Ok(())
                } else {
                    Err(problems.join("; "))
                }
            })
            .await?;

        let mut intents = Vec::new();
        for dim in dims {
            if let Some(raw) = answer.get(&dim.key) {
                // Checked above, so this cannot fail.
                if let Ok(intent) = raw.clone().into_intent() {
                    intents.push((dim.key.clone(), intent));
                }
            }
        }
        Ok(intents)
    }

    /// Selection intents in dimension order. Optional dimensions the oracle
    /// left out are absent from the result.
    pub async fn select(
        &self,
        query: &str,
        history: &[ChatMessage],
        table: &TableMetadata,
    ) -> Result<Vec<(String, SelectionIntent)>> {
        let mut context = history.to_vec();
        context.push(ChatMessage::user(query.to_string()));
        let dims: Vec<&Dimension> = table.dimensions().iter().collect();

        if !self.ctx.config.per_dimension_selection || dims.len() <= 1 {
            return self.ask(table, &dims, &context).await;
        }

        info!("Selecting values for {} dimensions concurrently", dims.len());
        let per_dimension = try_join_all(dims.iter().map(|dim| {
            let context = &context;
            async move { self.ask(table, std::slice::from_ref(dim), context).await }
        }))
        .await?;
        Ok(per_dimension.into_iter().flatten().collect())
    }
}
