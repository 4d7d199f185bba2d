#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use statq::api::TableApi;
use statq::context::RequestContext;
use statq::model::{
    Category, CodeList, DataSet, Dimension, FolderInfo, NavigationEntry, TableMetadata, TableSummary,
};
use statq::oracle::{Oracle, OracleRequest};
use statq::progress::{self, ProgressEvent, ProgressSender};
use statq::query::ResolvedQuery;
use statq::{AgentConfig, AgentError, Outcome, QueryAgent, QueryRequest, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

type Responder = Box<dyn Fn(&OracleRequest) -> String + Send + Sync>;

enum Reply {
    Fixed(String),
    Computed(Responder),
}

/// Oracle stub answering from per-task queues, keyed by the request name.
#[derive(Default)]
pub struct ScriptedOracle {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, name: &str, answer: Value) -> Self {
        self.answer_raw(name, &answer.to_string())
    }

    pub fn answer_raw(self, name: &str, raw: &str) -> Self {
        self.push(name, Reply::Fixed(raw.to_string()))
    }

    pub fn answer_with<F>(self, name: &str, responder: F) -> Self
    where
        F: Fn(&OracleRequest) -> String + Send + Sync + 'static,
    {
        self.push(name, Reply::Computed(Box::new(responder)))
    }

    fn push(self, name: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn requests(&self, name: &str) -> Vec<OracleRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.name == name)
            .cloned()
            .collect()
    }

    pub fn request_names(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|r| r.name.clone()).collect()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&request.name)
            .and_then(|queue| queue.pop_front());
        match reply {
            Some(Reply::Fixed(raw)) => Ok(raw),
            Some(Reply::Computed(responder)) => Ok(responder(request)),
            None => Err(AgentError::Oracle(format!("no scripted answer for '{}'", request.name))),
        }
    }
}

/// In-memory table service: folder graph, search index, metadata, code lists.
#[derive(Default)]
pub struct MemoryApi {
    folders: HashMap<String, Vec<NavigationEntry>>,
    tables: Vec<TableSummary>,
    metadata: HashMap<String, TableMetadata>,
    code_lists: HashMap<String, CodeList>,
    folder_requests: Mutex<Vec<String>>,
    search_requests: Mutex<Vec<String>>,
    data_requests: Mutex<Vec<ResolvedQuery>>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folder(mut self, id: &str, entries: Vec<NavigationEntry>) -> Self {
        self.folders.insert(id.to_string(), entries);
        self
    }

    pub fn with_table(mut self, summary: TableSummary, metadata: Option<TableMetadata>) -> Self {
        if let Some(metadata) = metadata {
            self.metadata.insert(summary.id.clone(), metadata);
        }
        self.tables.push(summary);
        self
    }

    pub fn with_code_list(mut self, code_list: CodeList) -> Self {
        self.code_lists.insert(code_list.id.clone(), code_list);
        self
    }

    pub fn folder_requests(&self) -> Vec<String> {
        self.folder_requests.lock().unwrap().clone()
    }

    pub fn search_requests(&self) -> Vec<String> {
        self.search_requests.lock().unwrap().clone()
    }

    pub fn data_requests(&self) -> Vec<ResolvedQuery> {
        self.data_requests.lock().unwrap().clone()
    }

    fn not_found(path: String) -> AgentError {
        AgentError::Upstream {
            url: path,
            status: "404 Not Found".to_string(),
            message: "no such resource".to_string(),
        }
    }

    /// Categories the data call returns for one dimension of `query`.
    fn selected_categories(&self, query: &ResolvedQuery, dim: &Dimension) -> Option<Vec<Category>> {
        let value_codes = query.value_codes(&dim.key)?;
        let code_list_name = format!("codeList[{}]", dim.key);
        let available: Vec<Category> = match query.fragments.iter().find(|f| f.name == code_list_name) {
            Some(fragment) => self
                .code_lists
                .get(&fragment.value)
                .map(|c| c.values.iter().map(|v| Category::new(&v.code, &v.label)).collect())
                .unwrap_or_default(),
            None => dim.categories().to_vec(),
        };
        if value_codes == "*" || value_codes.starts_with('[') {
            return Some(available);
        }
        let keys: Vec<&str> = value_codes.split(',').collect();
        Some(available.into_iter().filter(|c| keys.contains(&c.key.as_str())).collect())
    }
}

#[async_trait]
impl TableApi for MemoryApi {
    async fn folder_contents(&self, folder_id: &str) -> Result<Vec<NavigationEntry>> {
        self.folder_requests.lock().unwrap().push(folder_id.to_string());
        self.folders
            .get(folder_id)
            .cloned()
            .ok_or_else(|| Self::not_found(format!("navigation/{}", folder_id)))
    }

    async fn search_tables(&self, query: &str, page_size: usize) -> Result<Vec<TableSummary>> {
        self.search_requests.lock().unwrap().push(query.to_string());
        let words: Vec<String> = query.split_whitespace().map(|w| w.to_lowercase()).collect();
        Ok(self
            .tables
            .iter()
            .filter(|t| {
                let haystack = format!("{} {}", t.label, t.variable_names.join(" ")).to_lowercase();
                words.iter().any(|w| haystack.contains(w.as_str()))
            })
            .take(page_size)
            .cloned()
            .collect())
    }

    async fn table_summary(&self, table_id: &str) -> Result<TableSummary> {
        self.tables
            .iter()
            .find(|t| t.id == table_id)
            .cloned()
            .ok_or_else(|| Self::not_found(format!("tables/{}", table_id)))
    }

    async fn table_metadata(&self, table_id: &str) -> Result<TableMetadata> {
        self.metadata
            .get(table_id)
            .cloned()
            .ok_or_else(|| Self::not_found(format!("tables/{}/metadata", table_id)))
    }

    async fn code_list(&self, code_list_id: &str) -> Result<CodeList> {
        self.code_lists
            .get(code_list_id)
            .cloned()
            .ok_or_else(|| Self::not_found(format!("codeLists/{}", code_list_id)))
    }

    async fn table_data(&self, query: &ResolvedQuery) -> Result<DataSet> {
        self.data_requests.lock().unwrap().push(query.clone());
        let table = self.table_metadata(&query.table_id).await?;

        let mut dimensions = Vec::new();
        for dim in table.dimensions() {
            if let Some(categories) = self.selected_categories(query, dim) {
                dimensions.push(Dimension::new(&dim.key, &dim.label, categories));
            }
        }
        let size: Vec<usize> = dimensions.iter().map(|d| d.categories().len()).collect();
        let count: usize = size.iter().product();
        Ok(DataSet {
            label: table.label.clone(),
            dimensions,
            size,
            values: (0..count).map(|i| Some(i as f64)).collect(),
        })
    }
}

pub fn summary(id: &str, label: &str, variables: &[&str]) -> TableSummary {
    TableSummary {
        id: id.to_string(),
        label: label.to_string(),
        first_period: Some("2020".to_string()),
        last_period: Some("2022".to_string()),
        variable_names: variables.iter().map(|v| v.to_string()).collect(),
    }
}

pub fn folder(id: &str, label: &str) -> NavigationEntry {
    NavigationEntry::FolderInformation(FolderInfo {
        id: id.to_string(),
        label: label.to_string(),
        description: None,
    })
}

pub fn table_entry(summary: &TableSummary) -> NavigationEntry {
    NavigationEntry::Table(summary.clone())
}

pub fn categories(pairs: &[(&str, &str)]) -> Vec<Category> {
    pairs.iter().map(|(k, l)| Category::new(*k, *l)).collect()
}

pub fn years() -> Dimension {
    Dimension::new("Tid", "year", categories(&[("2020", "2020"), ("2021", "2021"), ("2022", "2022")]))
}

pub fn regions() -> Dimension {
    Dimension::new("Region", "region", categories(&[("EU", "European Union"), ("NO", "Norway")]))
}

/// `{Tid: {2020, 2021, 2022}, Region: {EU, NO}}`
pub fn population_table(dimensions: Vec<Dimension>) -> (TableSummary, TableMetadata) {
    let summary = summary("07459", "Population by region", &["region", "year"]);
    let metadata = TableMetadata::new("07459", "Population by region", vec![], dimensions).unwrap();
    (summary, metadata)
}

pub struct Harness {
    pub oracle: Arc<ScriptedOracle>,
    pub api: Arc<MemoryApi>,
    pub config: AgentConfig,
}

impl Harness {
    pub fn new(oracle: ScriptedOracle, api: MemoryApi) -> Self {
        Self {
            oracle: Arc::new(oracle),
            api: Arc::new(api),
            config: AgentConfig::default(),
        }
    }

    pub fn agent(&self) -> QueryAgent {
        QueryAgent::new(self.config.clone(), self.oracle.clone(), self.api.clone())
    }

    /// Run one request to completion and drain its event stream.
    pub async fn run(&self, request: QueryRequest) -> (Outcome, Vec<ProgressEvent>) {
        self.run_with(request, &CancellationToken::new()).await
    }

    pub async fn run_with(&self, request: QueryRequest, cancel: &CancellationToken) -> (Outcome, Vec<ProgressEvent>) {
        let (tx, rx) = progress::channel();
        let outcome = self.agent().run(&request, tx, cancel).await;
        (outcome, rx.collect().await)
    }

    /// Context for driving a single stage directly.
    pub fn context<'a>(&'a self, progress: &'a ProgressSender, cancel: &'a CancellationToken) -> RequestContext<'a> {
        RequestContext {
            config: &self.config,
            oracle: self.oracle.as_ref(),
            api: self.api.as_ref(),
            progress,
            cancel,
        }
    }
}
