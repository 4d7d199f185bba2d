//! Fetched table data (JSON-stat2 dataset).

use crate::error::{AgentError, Result};
use crate::model::table::{Dimension, RawDimension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    pub label: String,
    pub dimensions: Vec<Dimension>,
    /// Category count per dimension, in dimension order.
    pub size: Vec<usize>,
    /// Flattened values, row-major with the last dimension varying fastest.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataRow<'a> {
    pub labels: Vec<&'a str>,
    pub value: Option<f64>,
}

#[derive(Deserialize)]
struct RawDataSet {
    #[serde(default)]
    label: String,
    id: Vec<String>,
    size: Vec<usize>,
    dimension: HashMap<String, RawDimension>,
    #[serde(default)]
    value: Vec<Option<f64>>,
}

impl DataSet {
    pub fn from_json_stat(value: serde_json::Value) -> Result<Self> {
        let raw: RawDataSet = serde_json::from_value(value)
            .map_err(|e| AgentError::Metadata(format!("invalid dataset: {}", e)))?;
        if raw.id.len() != raw.size.len() {
            return Err(AgentError::Metadata(format!(
                "dataset has {} dimensions but {} sizes",
                raw.id.len(),
                raw.size.len()
            )));
        }
        let mut raw_dims = raw.dimension;
        let mut dimensions = Vec::with_capacity(raw.id.len());
        for (key, size) in raw.id.iter().zip(&raw.size) {
            let dim = raw_dims
                .remove(key)
                .ok_or_else(|| AgentError::Metadata(format!("dataset dimension '{}' is undefined", key)))?
                .into_dimension(key)?;
            if dim.categories().len() != *size {
                return Err(AgentError::Metadata(format!(
                    "dataset dimension '{}' has {} categories, size says {}",
                    key,
                    dim.categories().len(),
                    size
                )));
            }
            dimensions.push(dim);
        }
        let expected: usize = raw.size.iter().product();
        if raw.value.len() != expected {
            return Err(AgentError::Metadata(format!(
                "dataset has {} values, expected {}",
                raw.value.len(),
                expected
            )));
        }
        Ok(Self {
            label: raw.label,
            dimensions,
            size: raw.size,
            values: raw.value,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Category labels for the value at flat position `index`.
    fn labels_at(&self, mut index: usize) -> Vec<&str> {
        let mut labels = vec![""; self.dimensions.len()];
        for (pos, dim) in self.dimensions.iter().enumerate().rev() {
            let size = self.size[pos];
            let category = index % size;
            index /= size;
            labels[pos] = dim.categories()[category].label.as_str();
        }
        labels
    }

    pub fn rows(&self) -> impl Iterator<Item = DataRow<'_>> + '_ {
        self.values.iter().enumerate().map(move |(i, value)| DataRow {
            labels: self.labels_at(i),
            value: *value,
        })
    }

    pub fn header(&self) -> Vec<&str> {
        self.dimensions.iter().map(|d| d.label.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rows_vary_last_dimension_fastest() {
        let doc = json!({
            "label": "Population",
            "id": ["Region", "Tid"],
            "size": [2, 2],
            "dimension": {
                "Region": { "label": "region", "category": { "index": ["0301", "4601"], "label": { "0301": "Oslo", "4601": "Bergen" } } },
                "Tid": { "label": "year", "category": { "index": ["2023", "2024"], "label": { "2023": "2023", "2024": "2024" } } }
            },
            "value": [1.0, 2.0, 3.0, null]
        });
        let data = DataSet::from_json_stat(doc).unwrap();
        let rows: Vec<_> = data.rows().collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].labels, vec!["Oslo", "2024"]);
        assert_eq!(rows[1].value, Some(2.0));
        assert_eq!(rows[2].labels, vec!["Bergen", "2023"]);
        assert_eq!(rows[3].value, None);
        assert_eq!(data.header(), vec!["region", "year"]);
    }

    #[test]
    fn rejects_value_count_mismatch() {
        let doc = json!({
            "id": ["Tid"],
            "size": [2],
            "dimension": {
                "Tid": { "label": "year", "category": { "index": ["2023", "2024"] } }
            },
            "value": [1.0]
        });
        assert!(DataSet::from_json_stat(doc).is_err());
    }
}
