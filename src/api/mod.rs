//! Table API
//!
//! Read-only contract of the hierarchical table service. The pipeline only
//! talks to [`TableApi`]; [`HttpTableApi`] is the reqwest implementation.

pub mod client;

pub use client::HttpTableApi;

use crate::error::Result;
use crate::model::{CodeList, DataSet, NavigationEntry, TableMetadata, TableSummary};
use crate::query::ResolvedQuery;
use async_trait::async_trait;

#[async_trait]
pub trait TableApi: Send + Sync {
    /// Children of a navigation folder. The empty id is the root.
    async fn folder_contents(&self, folder_id: &str) -> Result<Vec<NavigationEntry>>;

    /// Literal-match search over table titles and variable names.
    async fn search_tables(&self, query: &str, page_size: usize) -> Result<Vec<TableSummary>>;

    async fn table_summary(&self, table_id: &str) -> Result<TableSummary>;

    async fn table_metadata(&self, table_id: &str) -> Result<TableMetadata>;

    async fn code_list(&self, code_list_id: &str) -> Result<CodeList>;

    async fn table_data(&self, query: &ResolvedQuery) -> Result<DataSet>;
}
