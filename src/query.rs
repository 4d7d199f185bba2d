//! Query assembly
//!
//! Ordered list of `(parameter, value)` pairs serialized once at the end.
//! A `codeList[dim]` fragment precedes `valueCodes[dim]` whenever the
//! dimension's categories came from a substituted code list.

use crate::model::TableMetadata;
use crate::selection::SelectionExpr;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFragment {
    pub name: String,
    pub value: String,
}

impl QueryFragment {
    fn new(name: String, value: String) -> Self {
        Self { name, value }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedQuery {
    pub table_id: String,
    pub fragments: Vec<QueryFragment>,
}

impl ResolvedQuery {
    pub fn assemble(table: &TableMetadata, selections: &[(String, SelectionExpr)]) -> Self {
        let mut fragments = Vec::with_capacity(selections.len() * 2);
        for dim in table.dimensions() {
            let Some((_, expr)) = selections.iter().find(|(key, _)| key == &dim.key) else {
                continue;
            };
            if let Some(code_list) = &dim.applied_code_list {
                fragments.push(QueryFragment::new(format!("codeList[{}]", dim.key), code_list.clone()));
            }
            fragments.push(QueryFragment::new(format!("valueCodes[{}]", dim.key), expr.to_string()));
        }
        Self {
            table_id: table.id.clone(),
            fragments,
        }
    }

    pub fn query_string(&self) -> String {
        self.fragments
            .iter()
            .map(|f| format!("{}={}", f.name, f.value))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn value_codes(&self, dimension: &str) -> Option<&str> {
        let name = format!("valueCodes[{}]", dimension);
        self.fragments.iter().find(|f| f.name == name).map(|f| f.value.as_str())
    }
}
