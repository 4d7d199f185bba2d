//! Dimension selection
//!
//! Decides, for each optional dimension or dimension with alternate code
//! lists, whether to keep it, drop it, or swap in a code list. The table is
//! taken by value and returned rewritten.

use super::describe::list_entries;
use crate::context::RequestContext;
use crate::error::Result;
use crate::model::{Dimension, TableMetadata};
use crate::oracle::schema::{object, string_enum};
use crate::oracle::{ChatMessage, OracleTask};
use std::collections::HashMap;
use tracing::info;

pub const INCLUDED: &str = "INCLUDED";
pub const OMITTED: &str = "OMITTED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimensionChoice {
    Included,
    Omitted,
    CodeList(String),
}

impl DimensionChoice {
    fn parse(raw: &str) -> Self {
        match raw {
            INCLUDED => DimensionChoice::Included,
            OMITTED => DimensionChoice::Omitted,
            id => DimensionChoice::CodeList(id.to_string()),
        }
    }
}

/// Choices the oracle may pick from for `dim`.
pub fn choices(dim: &Dimension) -> Vec<String> {
    let mut choices: Vec<String> = if dim.code_lists.is_empty() {
        vec![INCLUDED.to_string()]
    } else {
        dim.code_lists.iter().map(|c| c.id.clone()).collect()
    };
    if dim.eliminable {
        choices.push(OMITTED.to_string());
    }
    choices
}

pub fn needs_selection(table: &TableMetadata) -> bool {
    table
        .dimensions()
        .iter()
        .any(|d| d.eliminable || !d.code_lists.is_empty())
}

const GUIDELINES: &str = "You decide which dimensions of a statistical table are needed to answer the user's request.\n\
For each dimension listed, pick exactly one option:\n\
- INCLUDED: keep the dimension with its own values.\n\
- OMITTED: drop the dimension; the table is then summed over it.\n\
- a code list id: keep the dimension but use that alternative grouping of values.\n\
Include a dimension only if the request implies it. When there is no signal for a dimension, omit it. \
Choose a code list when its grouping matches the level of detail the user asks for.";

fn dimension_prompt(dim: &Dimension, cap: usize) -> String {
    let options = choices(dim);
    let listing = if dim.code_lists.is_empty() {
        let labels: Vec<String> = dim.categories().iter().map(|c| c.label.clone()).collect();
        list_entries(&labels, cap)
    } else {
        let labels: Vec<String> = dim
            .code_lists
            .iter()
            .map(|c| format!("{}: {}", c.id, c.label))
            .collect();
        list_entries(&labels, cap)
    };
    format!(
        "Dimension {} \"{}\"\n  options: {}\n  values:\n{}",
        dim.key,
        dim.label,
        options.join(", "),
        listing
            .lines()
            .map(|l| format!("    {}", l))
            .collect::<Vec<_>>()
            .join("\n")
    )
}

pub struct DimensionSelector<'a> {
    ctx: RequestContext<'a>,
}

impl<'a> DimensionSelector<'a> {
    pub fn new(ctx: RequestContext<'a>) -> Self {
        Self { ctx }
    }

    /// Choice per dimension. Dimensions with a single option get it without
    /// asking; the rest are decided in one oracle call.
    async fn decide(
        &self,
        query: &str,
        history: &[ChatMessage],
        table: &TableMetadata,
    ) -> Result<Vec<(String, DimensionChoice)>> {
        let mut decided = Vec::new();
        let mut open: Vec<&Dimension> = Vec::new();
        for dim in table.dimensions() {
            let options = choices(dim);
            if options.len() == 1 {
                decided.push((dim.key.clone(), DimensionChoice::parse(&options[0])));
            } else {
                open.push(dim);
            }
        }
        if open.is_empty() {
            return Ok(decided);
        }

        let cap = self.ctx.config.max_listed_values;
        let properties: Vec<(String, serde_json::Value)> = open
            .iter()
            .map(|d| (d.key.clone(), string_enum(choices(d))))
            .collect();
        let required: Vec<String> = open.iter().map(|d| d.key.clone()).collect();
        let description = format!(
            "{}\n\nTable {}: {}\n\n{}",
            GUIDELINES,
            table.id,
            table.label,
            open.iter().map(|d| dimension_prompt(d, cap)).collect::<Vec<_>>().join("\n\n")
        );
        let task = OracleTask::new("select_dimensions", description, object(properties, &required));

        let mut context = history.to_vec();
        context.push(ChatMessage::user(query.to_string()));
        let answer: HashMap<String, String> = self.ctx.oracle_call().call(&task, &context).await?;

        for key in required {
            if let Some(raw) = answer.get(&key) {
                let choice = DimensionChoice::parse(raw);
                decided.push((key, choice));
            }
        }
        Ok(decided)
    }

    /// Decide every dimension and apply the answer to `table`.
    pub async fn select(&self, query: &str, history: &[ChatMessage], mut table: TableMetadata) -> Result<TableMetadata> {
        if !needs_selection(&table) {
            return Ok(table);
        }

        let decided = self.decide(query, history, &table).await?;
        for (key, choice) in decided {
            match choice {
                DimensionChoice::Included => {}
                DimensionChoice::Omitted => {
                    if let Some(dim) = table.remove_dimension(&key) {
                        info!("Omitting dimension {} from table {}", key, table.id);
                        self.ctx.progress.info(format!("Leaving out \"{}\"", dim.label));
                    }
                }
                DimensionChoice::CodeList(id) => {
                    let code_list = self.ctx.fetch(self.ctx.api.code_list(&id)).await?;
                    if let Some(dim) = table.dimension_mut(&key) {
                        dim.apply_code_list(&code_list);
                        self.ctx
                            .progress
                            .info(format!("Using grouping \"{}\" for \"{}\"", code_list.label, key));
                    }
                }
            }
        }
        Ok(table)
    }
}
