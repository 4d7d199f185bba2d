use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Short description of a table, as listed by navigation and search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub first_period: Option<String>,
    #[serde(default)]
    pub last_period: Option<String>,
    #[serde(default)]
    pub variable_names: Vec<String>,
}

impl TableSummary {
    /// One-line rendering used in ranking prompts.
    pub fn describe(&self) -> String {
        let period = match (&self.first_period, &self.last_period) {
            (Some(first), Some(last)) => format!(" [{}-{}]", first, last),
            (Some(first), None) => format!(" [from {}]", first),
            (None, Some(last)) => format!(" [to {}]", last),
            (None, None) => String::new(),
        };
        let variables = if self.variable_names.is_empty() {
            String::new()
        } else {
            format!(" variables: {}", self.variable_names.join(", "))
        };
        format!("{}: {}{}{}", self.id, self.label, period, variables)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderInfo {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One child of a navigation folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NavigationEntry {
    Table(TableSummary),
    FolderInformation(FolderInfo),
    /// Headings and anything else the API may list; carries no navigable id.
    #[serde(other)]
    Other,
}

impl NavigationEntry {
    pub fn node(&self) -> Option<NodeRef> {
        match self {
            NavigationEntry::Table(t) => Some(NodeRef::table(&t.id)),
            NavigationEntry::FolderInformation(f) => Some(NodeRef::folder(&f.id)),
            NavigationEntry::Other => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            NavigationEntry::Table(t) => &t.label,
            NavigationEntry::FolderInformation(f) => &f.label,
            NavigationEntry::Other => "",
        }
    }
}

/// `GET navigation/{folderId}` response body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderContents {
    #[serde(default)]
    pub folder_contents: Vec<NavigationEntry>,
}

/// `GET tables?query=...` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub tables: Vec<TableSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Folder,
    Table,
}

/// Typed navigation node, rendered to the oracle as `folder:<id>` / `table:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub id: String,
}

impl NodeRef {
    pub fn folder(id: impl Into<String>) -> Self {
        Self { kind: NodeKind::Folder, id: id.into() }
    }

    pub fn table(id: impl Into<String>) -> Self {
        Self { kind: NodeKind::Table, id: id.into() }
    }

    pub fn root() -> Self {
        Self::folder("")
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NodeKind::Folder => write!(f, "folder:{}", self.id),
            NodeKind::Table => write!(f, "table:{}", self.id),
        }
    }
}

impl FromStr for NodeRef {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| AgentError::Metadata(format!("'{}' is not a type:id pair", s)))?;
        let id = id.trim();
        match kind.trim() {
            "folder" => Ok(NodeRef::folder(id)),
            "table" => Ok(NodeRef::table(id)),
            other => Err(AgentError::Metadata(format!("unknown node type '{}'", other))),
        }
    }
}
