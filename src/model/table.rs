//! Table metadata
//!
//! Owned, ordered view of one table's dimensions as returned by
//! `GET tables/{id}/metadata` (JSON-stat2). Category order is the API's
//! ordinal order and is preserved exactly, since TOP/BOTTOM/RANGE selections
//! are interpreted against it.

use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Dimension keys/labels conventionally used for the time axis.
const TIME_NAMES: &[&str] = &["tid", "time", "year", "år", "quarter", "kvartal", "month", "måned", "period"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub key: String,
    pub label: String,
}

impl Category {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub decimals: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeListKind {
    Aggregation,
    Valueset,
    #[serde(other)]
    Other,
}

/// Reference to an alternate code list advertised by a dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeListRef {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: CodeListKind,
}

/// A code list as returned by `GET codeLists/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeList {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: CodeListKind,
    pub values: Vec<CodeListValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeListValue {
    pub code: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub key: String,
    pub label: String,
    categories: Vec<Category>,
    #[serde(default)]
    pub units: BTreeMap<String, Unit>,
    #[serde(default)]
    pub eliminable: bool,
    #[serde(default)]
    pub code_lists: Vec<CodeListRef>,
    /// Set once a code list has replaced the native categories.
    #[serde(default)]
    pub applied_code_list: Option<String>,
}

impl Dimension {
    pub fn new(key: impl Into<String>, label: impl Into<String>, categories: Vec<Category>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            categories,
            units: BTreeMap::new(),
            eliminable: false,
            code_lists: Vec::new(),
            applied_code_list: None,
        }
    }

    pub fn eliminable(mut self, eliminable: bool) -> Self {
        self.eliminable = eliminable;
        self
    }

    pub fn with_code_lists(mut self, code_lists: Vec<CodeListRef>) -> Self {
        self.code_lists = code_lists;
        self
    }

    pub fn with_units(mut self, units: BTreeMap<String, Unit>) -> Self {
        self.units = units;
        self
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn has_category(&self, key: &str) -> bool {
        self.categories.iter().any(|c| c.key == key)
    }

    pub fn category_keys(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.key.as_str())
    }

    pub fn last_category(&self) -> Option<&Category> {
        self.categories.last()
    }

    pub fn is_time(&self) -> bool {
        let key = self.key.to_lowercase();
        let label = self.label.to_lowercase();
        TIME_NAMES
            .iter()
            .any(|name| key == *name || label == *name || label.starts_with(&format!("{} ", name)))
    }

    /// Swap the native category set for the entries of `code_list`.
    ///
    /// Unit metadata is keyed by native categories and no longer applies.
    pub fn apply_code_list(&mut self, code_list: &CodeList) {
        self.categories = code_list
            .values
            .iter()
            .map(|v| Category::new(v.code.clone(), v.label.clone()))
            .collect();
        self.units.clear();
        self.label = format!("{} ({})", self.label, code_list.label);
        self.applied_code_list = Some(code_list.id.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub notes: Vec<String>,
    dimensions: Vec<Dimension>,
}

impl TableMetadata {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        notes: Vec<String>,
        dimensions: Vec<Dimension>,
    ) -> Result<Self> {
        let id = id.into();
        let mut seen = HashSet::new();
        for dim in &dimensions {
            if !seen.insert(dim.key.as_str()) {
                return Err(AgentError::Metadata(format!(
                    "table {} has duplicate dimension key '{}'",
                    id, dim.key
                )));
            }
        }
        Ok(Self {
            id,
            label: label.into(),
            notes,
            dimensions,
        })
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn dimension(&self, key: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.key == key)
    }

    pub fn dimension_mut(&mut self, key: &str) -> Option<&mut Dimension> {
        self.dimensions.iter_mut().find(|d| d.key == key)
    }

    pub fn remove_dimension(&mut self, key: &str) -> Option<Dimension> {
        let pos = self.dimensions.iter().position(|d| d.key == key)?;
        Some(self.dimensions.remove(pos))
    }

    pub fn dimension_keys(&self) -> impl Iterator<Item = &str> {
        self.dimensions.iter().map(|d| d.key.as_str())
    }

    /// Parse a JSON-stat2 metadata document.
    pub fn from_json_stat(table_id: &str, value: serde_json::Value) -> Result<Self> {
        let raw: RawMetadata = serde_json::from_value(value)
            .map_err(|e| AgentError::Metadata(format!("table {}: {}", table_id, e)))?;
        let mut raw_dims = raw.dimension;
        let mut dimensions = Vec::with_capacity(raw.id.len());
        for key in &raw.id {
            let raw_dim = raw_dims.remove(key).ok_or_else(|| {
                AgentError::Metadata(format!(
                    "table {} lists dimension '{}' without a definition",
                    table_id, key
                ))
            })?;
            dimensions.push(raw_dim.into_dimension(key)?);
        }
        let id = raw
            .extension
            .and_then(|e| e.px)
            .and_then(|px| px.tableid)
            .unwrap_or_else(|| table_id.to_string());
        TableMetadata::new(id, raw.label, raw.note, dimensions)
    }
}

#[derive(Deserialize)]
pub(crate) struct RawMetadata {
    pub label: String,
    #[serde(default)]
    pub note: Vec<String>,
    pub id: Vec<String>,
    pub dimension: HashMap<String, RawDimension>,
    #[serde(default)]
    extension: Option<RawTableExtension>,
}

#[derive(Deserialize)]
struct RawTableExtension {
    #[serde(default)]
    px: Option<RawPx>,
}

#[derive(Deserialize)]
struct RawPx {
    #[serde(default)]
    tableid: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct RawDimension {
    label: String,
    category: RawCategory,
    #[serde(default)]
    extension: Option<RawDimensionExtension>,
}

#[derive(Deserialize)]
struct RawCategory {
    #[serde(default)]
    index: Option<RawIndex>,
    #[serde(default)]
    label: HashMap<String, String>,
    #[serde(default)]
    unit: BTreeMap<String, Unit>,
}

/// JSON-stat allows the category index as either a key list or a key -> position map.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawIndex {
    List(Vec<String>),
    Map(HashMap<String, usize>),
}

#[derive(Deserialize)]
struct RawDimensionExtension {
    #[serde(default)]
    elimination: bool,
    #[serde(default, rename = "codeLists")]
    code_lists: Vec<CodeListRef>,
}

impl RawDimension {
    pub(crate) fn into_dimension(self, key: &str) -> Result<Dimension> {
        let RawCategory { index, label, unit } = self.category;
        let ordered_keys: Vec<String> = match index {
            Some(RawIndex::List(keys)) => keys,
            Some(RawIndex::Map(map)) => {
                let mut pairs: Vec<(String, usize)> = map.into_iter().collect();
                pairs.sort_by_key(|(_, pos)| *pos);
                pairs.into_iter().map(|(k, _)| k).collect()
            }
            None if label.len() <= 1 => label.keys().cloned().collect(),
            None => {
                return Err(AgentError::Metadata(format!(
                    "dimension '{}' has {} categories but no index",
                    key,
                    label.len()
                )))
            }
        };
        let categories = ordered_keys
            .into_iter()
            .map(|k| {
                let text = label.get(&k).cloned().unwrap_or_else(|| k.clone());
                Category::new(k, text)
            })
            .collect();
        let (eliminable, code_lists) = match self.extension {
            Some(ext) => (ext.elimination, ext.code_lists),
            None => (false, Vec::new()),
        };
        Ok(Dimension::new(key, self.label, categories)
            .eliminable(eliminable)
            .with_code_lists(code_lists)
            .with_units(unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata_doc() -> serde_json::Value {
        json!({
            "label": "07459: Population, by region, sex and year",
            "note": ["Figures as of 1 January."],
            "id": ["Region", "Kjonn", "Tid"],
            "size": [2, 2, 3],
            "extension": { "px": { "tableid": "07459" } },
            "dimension": {
                "Region": {
                    "label": "region",
                    "category": {
                        "index": { "0301": 1, "0000": 0 },
                        "label": { "0000": "The whole country", "0301": "Oslo" }
                    },
                    "extension": {
                        "elimination": true,
                        "codeLists": [
                            { "id": "agg_KommSummer", "label": "Municipalities", "type": "Aggregation" },
                            { "id": "vs_Fylker", "label": "Counties", "type": "Valueset" }
                        ]
                    }
                },
                "Kjonn": {
                    "label": "sex",
                    "category": { "index": ["1", "2"], "label": { "1": "Males", "2": "Females" } },
                    "extension": { "elimination": true }
                },
                "Tid": {
                    "label": "year",
                    "category": {
                        "index": { "2022": 0, "2023": 1, "2024": 2 },
                        "label": { "2022": "2022", "2023": "2023", "2024": "2024" },
                        "unit": { "2024": { "base": "persons", "decimals": 0 } }
                    }
                }
            }
        })
    }

    #[test]
    fn parses_json_stat_in_index_order() {
        let table = TableMetadata::from_json_stat("07459", metadata_doc()).unwrap();
        assert_eq!(table.id, "07459");
        assert_eq!(table.notes.len(), 1);
        assert_eq!(table.dimension_keys().collect::<Vec<_>>(), vec!["Region", "Kjonn", "Tid"]);

        let region = table.dimension("Region").unwrap();
        assert_eq!(region.category_keys().collect::<Vec<_>>(), vec!["0000", "0301"]);
        assert!(region.eliminable);
        assert_eq!(region.code_lists.len(), 2);
        assert_eq!(region.code_lists[1].kind, CodeListKind::Valueset);

        let tid = table.dimension("Tid").unwrap();
        assert!(!tid.eliminable);
        assert!(tid.is_time());
        assert_eq!(tid.last_category().unwrap().key, "2024");
        assert_eq!(tid.units["2024"].base, "persons");
    }

    #[test]
    fn rejects_duplicate_dimension_keys() {
        let dims = vec![
            Dimension::new("Tid", "year", vec![]),
            Dimension::new("Tid", "year", vec![]),
        ];
        let err = TableMetadata::new("1", "t", vec![], dims).unwrap_err();
        assert!(matches!(err, AgentError::Metadata(_)));
    }

    #[test]
    fn code_list_replaces_categories_and_extends_label() {
        let mut dim = Dimension::new(
            "Region",
            "region",
            vec![Category::new("0301", "Oslo"), Category::new("4601", "Bergen")],
        );
        let list = CodeList {
            id: "vs_Fylker".to_string(),
            label: "Counties".to_string(),
            kind: CodeListKind::Valueset,
            values: vec![
                CodeListValue { code: "03".to_string(), label: "Oslo".to_string() },
                CodeListValue { code: "46".to_string(), label: "Vestland".to_string() },
            ],
        };
        dim.apply_code_list(&list);
        assert_eq!(dim.category_keys().collect::<Vec<_>>(), vec!["03", "46"]);
        assert!(!dim.has_category("0301"));
        assert_eq!(dim.label, "region (Counties)");
        assert_eq!(dim.applied_code_list.as_deref(), Some("vs_Fylker"));
    }

    #[test]
    fn missing_index_is_an_error_for_multi_category_dimensions() {
        let doc = json!({
            "label": "t",
            "id": ["A"],
            "dimension": {
                "A": { "label": "a", "category": { "label": { "x": "X", "y": "Y" } } }
            }
        });
        assert!(TableMetadata::from_json_stat("t", doc).is_err());
    }
}
