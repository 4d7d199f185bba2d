//! Selection compilation
//!
//! Turns a [`SelectionIntent`] into the wire expression for one dimension,
//! checked against the dimension's current categories (after any code-list
//! substitution). Keys the oracle invented are dropped; when nothing valid is
//! left the selection widens to `*`. Every repair is returned as a diagnostic
//! so the caller can report it.

use super::intent::SelectionIntent;
use crate::model::{Dimension, TableMetadata};
use itertools::Itertools;
use std::collections::HashSet;
use std::fmt;

const SUGGESTION_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionExpr {
    All,
    Items(Vec<String>),
    Top { count: u32, offset: Option<u32> },
    Bottom { count: u32, offset: Option<u32> },
    Range { start: String, end: String },
    From(String),
    To(String),
}

impl fmt::Display for SelectionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionExpr::All => write!(f, "*"),
            SelectionExpr::Items(keys) => write!(f, "{}", keys.join(",")),
            SelectionExpr::Top { count, offset: None } => write!(f, "[TOP({})]", count),
            SelectionExpr::Top { count, offset: Some(o) } => write!(f, "[TOP({},{})]", count, o),
            SelectionExpr::Bottom { count, offset: None } => write!(f, "[BOTTOM({})]", count),
            SelectionExpr::Bottom { count, offset: Some(o) } => write!(f, "[BOTTOM({},{})]", count, o),
            SelectionExpr::Range { start, end } => write!(f, "[RANGE({},{})]", start, end),
            SelectionExpr::From(start) => write!(f, "[FROM({})]", start),
            SelectionExpr::To(end) => write!(f, "[TO({})]", end),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    pub expr: SelectionExpr,
    pub diagnostics: Vec<String>,
}

impl Compiled {
    fn clean(expr: SelectionExpr) -> Self {
        Self { expr, diagnostics: Vec::new() }
    }
}

/// Closest existing key for a key that does not exist, matched on keys and labels.
fn suggest(dim: &Dimension, invalid: &str) -> Option<String> {
    let needle = invalid.to_lowercase();
    dim.categories()
        .iter()
        .map(|c| {
            let by_key = strsim::jaro_winkler(&needle, &c.key.to_lowercase());
            let by_label = strsim::jaro_winkler(&needle, &c.label.to_lowercase());
            (by_key.max(by_label), &c.key)
        })
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.clone())
}

fn describe_invalid(dim: &Dimension, keys: &[String]) -> String {
    keys.iter()
        .map(|k| match suggest(dim, k) {
            Some(s) => format!("'{}' (did you mean '{}'?)", k, s),
            None => format!("'{}'", k),
        })
        .join(", ")
}

pub fn compile(dim: &Dimension, intent: &SelectionIntent) -> Compiled {
    match intent {
        SelectionIntent::Wildcard => Compiled::clean(SelectionExpr::All),
        SelectionIntent::Top { count, offset } => Compiled::clean(SelectionExpr::Top {
            count: *count,
            offset: *offset,
        }),
        SelectionIntent::Bottom { count, offset } => Compiled::clean(SelectionExpr::Bottom {
            count: *count,
            offset: *offset,
        }),
        SelectionIntent::Items(keys) => compile_items(dim, keys),
        SelectionIntent::Range { start, end } => compile_range(dim, start, end),
        SelectionIntent::From(start) => compile_bound(dim, start, "from", SelectionExpr::From),
        SelectionIntent::To(end) => compile_bound(dim, end, "to", SelectionExpr::To),
    }
}

fn compile_items(dim: &Dimension, keys: &[String]) -> Compiled {
    let known: HashSet<&str> = dim.category_keys().collect();
    let keys: Vec<String> = keys.iter().unique().cloned().collect();
    let (valid, invalid): (Vec<String>, Vec<String>) = keys.into_iter().partition(|k| known.contains(k.as_str()));

    if valid.is_empty() {
        let diagnostic = if invalid.is_empty() {
            format!("Dimension {}: empty item selection, selecting all values", dim.key)
        } else {
            format!(
                "Dimension {}: none of the selected keys exist: {}; selecting all values",
                dim.key,
                describe_invalid(dim, &invalid)
            )
        };
        return Compiled {
            expr: SelectionExpr::All,
            diagnostics: vec![diagnostic],
        };
    }

    let mut diagnostics = Vec::new();
    if !invalid.is_empty() {
        diagnostics.push(format!(
            "Dimension {}: ignoring invalid keys {}",
            dim.key,
            describe_invalid(dim, &invalid)
        ));
    }
    Compiled {
        expr: SelectionExpr::Items(valid),
        diagnostics,
    }
}

fn compile_range(dim: &Dimension, start: &str, end: &str) -> Compiled {
    match (dim.has_category(start), dim.has_category(end)) {
        (true, true) => Compiled::clean(SelectionExpr::Range {
            start: start.to_string(),
            end: end.to_string(),
        }),
        (false, true) => Compiled {
            expr: SelectionExpr::To(end.to_string()),
            diagnostics: vec![format!(
                "Dimension {}: range start {} does not exist; selecting everything up to '{}'",
                dim.key,
                describe_invalid(dim, &[start.to_string()]),
                end
            )],
        },
        (true, false) => Compiled {
            expr: SelectionExpr::From(start.to_string()),
            diagnostics: vec![format!(
                "Dimension {}: range end {} does not exist; selecting everything from '{}'",
                dim.key,
                describe_invalid(dim, &[end.to_string()]),
                start
            )],
        },
        (false, false) => Compiled {
            expr: SelectionExpr::All,
            diagnostics: vec![format!(
                "Dimension {}: range bounds {} do not exist; selecting all values",
                dim.key,
                describe_invalid(dim, &[start.to_string(), end.to_string()])
            )],
        },
    }
}

fn compile_bound(dim: &Dimension, key: &str, kind: &str, build: fn(String) -> SelectionExpr) -> Compiled {
    if dim.has_category(key) {
        return Compiled::clean(build(key.to_string()));
    }
    Compiled {
        expr: SelectionExpr::All,
        diagnostics: vec![format!(
            "Dimension {}: '{}' bound {} does not exist; selecting all values",
            dim.key,
            kind,
            describe_invalid(dim, &[key.to_string()])
        )],
    }
}

/// Compile every selected dimension, in table order.
///
/// Dimensions without an intent are left out; intents naming dimensions the
/// table no longer has are reported and ignored.
pub fn compile_all(
    table: &TableMetadata,
    intents: &[(String, SelectionIntent)],
) -> (Vec<(String, SelectionExpr)>, Vec<String>) {
    let mut compiled = Vec::new();
    let mut diagnostics = Vec::new();

    let known: HashSet<&str> = table.dimension_keys().collect();
    for (key, _) in intents {
        if !known.contains(key.as_str()) {
            diagnostics.push(format!("Ignoring selection for unknown dimension {}", key));
        }
    }

    for dim in table.dimensions() {
        if let Some((_, intent)) = intents.iter().find(|(k, _)| k == &dim.key) {
            let result = compile(dim, intent);
            diagnostics.extend(result.diagnostics);
            compiled.push((dim.key.clone(), result.expr));
        }
    }
    (compiled, diagnostics)
}
