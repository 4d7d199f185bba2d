//! Conversation history handed in by the caller.

use crate::model::{DataSet, TableMetadata};
use crate::oracle::ChatMessage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub sender: Sender,
    pub text: String,
    #[serde(default)]
    pub table: Option<TableContext>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { sender: Sender::User, text: text.into(), table: None }
    }

    pub fn assistant(text: impl Into<String>, table: Option<TableContext>) -> Self {
        Self { sender: Sender::Assistant, text: text.into(), table }
    }
}

/// A table answered in an earlier turn, with how much of each dimension was shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableContext {
    pub table_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub dimensions: Vec<DimensionContext>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionContext {
    pub key: String,
    pub label: String,
    pub selected_values: usize,
    pub total_available_values: usize,
}

impl TableContext {
    pub fn from_result(table: &TableMetadata, data: &DataSet) -> Self {
        let dimensions = table
            .dimensions()
            .iter()
            .map(|dim| {
                let selected_values = data
                    .dimensions
                    .iter()
                    .position(|d| d.key == dim.key)
                    .map(|pos| data.size[pos])
                    .unwrap_or(0);
                DimensionContext {
                    key: dim.key.clone(),
                    label: dim.label.clone(),
                    selected_values,
                    total_available_values: dim.categories().len(),
                }
            })
            .collect();
        Self {
            table_id: table.id.clone(),
            label: table.label.clone(),
            dimensions,
        }
    }

    pub fn annotation(&self) -> String {
        let dims: Vec<String> = self
            .dimensions
            .iter()
            .map(|d| format!("{}: {} of {} values", d.label, d.selected_values, d.total_available_values))
            .collect();
        if dims.is_empty() {
            format!("[table {}: {}]", self.table_id, self.label)
        } else {
            format!("[table {}: {}; {}]", self.table_id, self.label, dims.join("; "))
        }
    }
}

pub fn to_messages(history: &[Turn]) -> Vec<ChatMessage> {
    history
        .iter()
        .map(|turn| {
            let content = match &turn.table {
                Some(table) => format!("{}\n{}", turn.text, table.annotation()),
                None => turn.text.clone(),
            };
            match turn.sender {
                Sender::User => ChatMessage::user(content),
                Sender::Assistant => ChatMessage::assistant(content),
            }
        })
        .collect()
}

/// Most recent table answered in this conversation.
pub fn last_table(history: &[Turn]) -> Option<&TableContext> {
    history.iter().rev().find_map(|t| t.table.as_ref())
}
