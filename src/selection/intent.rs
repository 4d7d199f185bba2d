//! Selection intents
//!
//! The oracle answers per dimension with an object carrying at most one of
//! `itemSelection`, `wildcard`, `top`, `bottom`, `range`, `from`, `to`.
//! [`RawSelection`] mirrors that wire shape; [`SelectionIntent`] is the closed
//! sum type the rest of the crate works with.

use crate::oracle::schema::{array_of, integer, object, string};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionIntent {
    Items(Vec<String>),
    Wildcard,
    Top { count: u32, offset: Option<u32> },
    Bottom { count: u32, offset: Option<u32> },
    Range { start: String, end: String },
    From(String),
    To(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordinal {
    pub count: u32,
    #[serde(default)]
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSelection {
    #[serde(default)]
    pub item_selection: Option<Vec<String>>,
    #[serde(default)]
    pub wildcard: Option<bool>,
    #[serde(default)]
    pub top: Option<Ordinal>,
    #[serde(default)]
    pub bottom: Option<Ordinal>,
    #[serde(default)]
    pub range: Option<RawRange>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

impl RawSelection {
    /// Collapse the wire object into one intent.
    ///
    /// No populated variant means "all". More than one is contradictory and
    /// rejected, naming the clashing fields.
    pub fn into_intent(self) -> Result<SelectionIntent, String> {
        let mut populated: Vec<(&'static str, SelectionIntent)> = Vec::new();
        if let Some(items) = self.item_selection {
            populated.push(("itemSelection", SelectionIntent::Items(items)));
        }
        if self.wildcard == Some(true) {
            populated.push(("wildcard", SelectionIntent::Wildcard));
        }
        if let Some(o) = self.top {
            populated.push(("top", SelectionIntent::Top { count: o.count, offset: o.offset }));
        }
        if let Some(o) = self.bottom {
            populated.push(("bottom", SelectionIntent::Bottom { count: o.count, offset: o.offset }));
        }
        if let Some(r) = self.range {
            populated.push(("range", SelectionIntent::Range { start: r.start, end: r.end }));
        }
        if let Some(from) = self.from {
            populated.push(("from", SelectionIntent::From(from)));
        }
        if let Some(to) = self.to {
            populated.push(("to", SelectionIntent::To(to)));
        }

        match populated.len() {
            0 => Ok(SelectionIntent::Wildcard),
            1 => Ok(populated.remove(0).1),
            _ => Err(format!(
                "contradictory selection, more than one of: {}",
                populated.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(", ")
            )),
        }
    }

    /// JSON schema for one dimension's selection object.
    pub fn schema() -> Value {
        let ordinal = object(
            vec![
                ("count".to_string(), integer(1)),
                ("offset".to_string(), integer(0)),
            ],
            &["count".to_string()],
        );
        let range = object(
            vec![
                ("start".to_string(), string("first category key, inclusive")),
                ("end".to_string(), string("last category key, inclusive")),
            ],
            &["start".to_string(), "end".to_string()],
        );
        object(
            vec![
                (
                    "itemSelection".to_string(),
                    array_of(string("category key"), None),
                ),
                ("wildcard".to_string(), json!({ "type": "boolean" })),
                ("top".to_string(), ordinal.clone()),
                ("bottom".to_string(), ordinal),
                ("range".to_string(), range),
                ("from".to_string(), string("category key; selects it and everything after")),
                ("to".to_string(), string("category key; selects everything up to and including it")),
            ],
            &[],
        )
    }
}
