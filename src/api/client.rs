use super::TableApi;
use crate::error::{AgentError, Result};
use crate::model::{CodeList, DataSet, FolderContents, NavigationEntry, SearchResults, TableMetadata, TableSummary};
use crate::query::ResolvedQuery;
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

#[derive(Clone)]
pub struct HttpTableApi {
    client: reqwest::Client,
    base_url: Url,
    language: String,
}

impl HttpTableApi {
    pub fn new(base_url: &str, language: impl Into<String>) -> Result<Self> {
        // Url::join drops the last path segment unless the base ends with '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| AgentError::Config(format!("invalid table API URL '{}': {}", base_url, e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            language: language.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| AgentError::Config(format!("invalid path '{}': {}", path, e)))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("lang", &self.language);
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Data URL for `query`; fragment values are percent-encoded as they are appended.
    fn data_url(&self, query: &ResolvedQuery) -> Result<Url> {
        let mut url = self.url(
            &format!("tables/{}/data", query.table_id),
            &[("outputFormat", "json-stat2".to_string())],
        )?;
        {
            let mut pairs = url.query_pairs_mut();
            for fragment in &query.fragments {
                pairs.append_pair(&fragment.name, &fragment.value);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await.map_err(|e| AgentError::Upstream {
            url: url.to_string(),
            status: "no response".to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::Upstream {
                url: url.to_string(),
                status: status.to_string(),
                message,
            });
        }

        response.json::<T>().await.map_err(|e| AgentError::Upstream {
            url: url.to_string(),
            status: status.to_string(),
            message: format!("unreadable body: {}", e),
        })
    }
}

#[async_trait]
impl TableApi for HttpTableApi {
    async fn folder_contents(&self, folder_id: &str) -> Result<Vec<NavigationEntry>> {
        let path = if folder_id.is_empty() {
            "navigation".to_string()
        } else {
            format!("navigation/{}", folder_id)
        };
        let contents: FolderContents = self.get_json(self.url(&path, &[])?).await?;
        Ok(contents.folder_contents)
    }

    async fn search_tables(&self, query: &str, page_size: usize) -> Result<Vec<TableSummary>> {
        let url = self.url(
            "tables",
            &[("query", query.to_string()), ("pageSize", page_size.to_string())],
        )?;
        let results: SearchResults = self.get_json(url).await?;
        Ok(results.tables)
    }

    async fn table_summary(&self, table_id: &str) -> Result<TableSummary> {
        self.get_json(self.url(&format!("tables/{}", table_id), &[])?).await
    }

    async fn table_metadata(&self, table_id: &str) -> Result<TableMetadata> {
        let doc: serde_json::Value = self
            .get_json(self.url(&format!("tables/{}/metadata", table_id), &[])?)
            .await?;
        TableMetadata::from_json_stat(table_id, doc)
    }

    async fn code_list(&self, code_list_id: &str) -> Result<CodeList> {
        self.get_json(self.url(&format!("codeLists/{}", code_list_id), &[])?).await
    }

    async fn table_data(&self, query: &ResolvedQuery) -> Result<DataSet> {
        let doc: serde_json::Value = self.get_json(self.data_url(query)?).await?;
        DataSet::from_json_stat(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Dimension};
    use crate::selection::SelectionExpr;

    #[test]
    fn builds_urls_under_the_base_path() {
        let api = HttpTableApi::new("https://data.ssb.no/api/pxwebapi/v2", "en").unwrap();
        let url = api
            .url("tables", &[("query", "population region".to_string()), ("pageSize", "20".to_string())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://data.ssb.no/api/pxwebapi/v2/tables?lang=en&query=population+region&pageSize=20"
        );
    }

    fn data_query(values: &[&str]) -> ResolvedQuery {
        let alder = Dimension::new("Alder", "age", values.iter().map(|v| Category::new(*v, *v)).collect());
        let table = TableMetadata::new("07459", "Population", vec![], vec![alder]).unwrap();
        let keys = values.iter().map(|v| v.to_string()).collect();
        ResolvedQuery::assemble(&table, &[("Alder".to_string(), SelectionExpr::Items(keys))])
    }

    #[test]
    fn data_url_carries_format_language_and_fragments() {
        let api = HttpTableApi::new("https://data.ssb.no/api/pxwebapi/v2/", "en").unwrap();
        let url = api.data_url(&data_query(&["000", "001"])).unwrap();
        assert_eq!(url.path(), "/api/pxwebapi/v2/tables/07459/data");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("lang".to_string(), "en".to_string()),
                ("outputFormat".to_string(), "json-stat2".to_string()),
                ("valueCodes[Alder]".to_string(), "000,001".to_string()),
            ]
        );
    }

    #[test]
    fn data_url_encodes_reserved_characters_in_keys() {
        let api = HttpTableApi::new("https://data.ssb.no/api/pxwebapi/v2", "en").unwrap();
        let query = data_query(&["105+", "a&b#c"]);
        assert_eq!(query.query_string(), "valueCodes[Alder]=105+,a&b#c");

        let url = api.data_url(&query).unwrap();
        let sent = url
            .query_pairs()
            .find(|(name, _)| name == "valueCodes[Alder]")
            .map(|(_, value)| value.into_owned());
        assert_eq!(sent.as_deref(), Some("105+,a&b#c"));
        assert_eq!(url.query_pairs().count(), 3);
    }

    #[tokio::test]
    async fn transport_failure_is_reported_as_upstream() {
        let api = HttpTableApi::new("http://127.0.0.1:1/v2", "en").unwrap();
        let err = api.table_summary("07459").await.unwrap_err();
        match err {
            AgentError::Upstream { url, status, .. } => {
                assert_eq!(url, "http://127.0.0.1:1/v2/tables/07459?lang=en");
                assert_eq!(status, "no response");
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_unparseable_base() {
        assert!(matches!(HttpTableApi::new("not a url", "en"), Err(AgentError::Config(_))));
    }
}
