//! Query Agent
//!
//! Runs one request end to end:
//! refine intent -> resolve table -> fetch metadata -> select dimensions ->
//! select values -> compile and assemble the query -> fetch data.
//!
//! Every stage reports through the request's [`ProgressSender`]. Whatever
//! happens, the stream ends with exactly one terminal event (`result`,
//! `abort` or `error`) and is closed when `run` returns.

use crate::api::TableApi;
use crate::config::AgentConfig;
use crate::context::RequestContext;
use crate::error::{AgentError, Result};
use crate::history::{self, TableContext, Turn};
use crate::model::{DataSet, TableSummary};
use crate::oracle::schema::{object, string};
use crate::oracle::{ChatMessage, Oracle, OracleTask};
use crate::progress::ProgressSender;
use crate::query::ResolvedQuery;
use crate::resolver::{self, TableResolver};
use crate::selection::{compile_all, DimensionSelector, ValueSelector};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Content of the terminal error event for a cancelled request.
pub const CANCELLED_MESSAGE: &str = "request cancelled";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub history: Vec<Turn>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }
}

/// Payload of the `result` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub table: TableContext,
    pub query: ResolvedQuery,
    pub data: DataSet,
}

#[derive(Debug)]
pub enum Outcome {
    Completed(Box<Answer>),
    Aborted {
        reason: String,
        candidates: Vec<TableSummary>,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefinedIntent {
    query: String,
    #[serde(default)]
    reuse_previous_table: bool,
}

pub struct QueryAgent {
    config: AgentConfig,
    oracle: Arc<dyn Oracle>,
    api: Arc<dyn TableApi>,
    resolver: Box<dyn TableResolver>,
}

impl QueryAgent {
    pub fn new(config: AgentConfig, oracle: Arc<dyn Oracle>, api: Arc<dyn TableApi>) -> Self {
        let resolver = resolver::for_config(&config);
        Self {
            config,
            oracle,
            api,
            resolver,
        }
    }

    /// Run one request. `progress` is consumed so the stream closes with the request.
    pub async fn run(&self, request: &QueryRequest, progress: ProgressSender, cancel: &CancellationToken) -> Outcome {
        let span = info_span!("request", id = %Uuid::new_v4());
        async {
            info!("Query: {}", request.query);
            let ctx = RequestContext {
                config: &self.config,
                oracle: self.oracle.as_ref(),
                api: self.api.as_ref(),
                progress: &progress,
                cancel,
            };

            match self.execute(ctx, request).await {
                Ok(answer) => match serde_json::to_string(&answer) {
                    Ok(content) => {
                        progress.result(content);
                        Outcome::Completed(Box::new(answer))
                    }
                    Err(e) => fail(&progress, AgentError::from(e)),
                },
                Err(AgentError::ResolutionExhausted { reason, candidates }) => {
                    progress.log(format!("No conclusive table: {}", reason));
                    let content = serde_json::to_string(&candidates).unwrap_or_else(|_| "[]".to_string());
                    progress.abort(content);
                    Outcome::Aborted { reason, candidates }
                }
                Err(e) => fail(&progress, e),
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, ctx: RequestContext<'_>, request: &QueryRequest) -> Result<Answer> {
        let history = history::to_messages(&request.history);
        let previous = history::last_table(&request.history);

        let refined = if self.config.refine_intent && !request.history.is_empty() {
            let refined = self.refine(ctx, request, &history, previous).await?;
            ctx.progress.info(format!("Interpreted request as: {}", refined.query));
            refined
        } else {
            RefinedIntent {
                query: request.query.clone(),
                reuse_previous_table: false,
            }
        };
        let query = refined.query.as_str();

        let table_id = match previous {
            Some(previous) if refined.reuse_previous_table => {
                ctx.progress.nav(format!("Reusing table {}: {}", previous.table_id, previous.label));
                previous.table_id.clone()
            }
            _ => self.resolver.resolve(ctx, query, &history).await?,
        };

        let table = ctx.fetch(ctx.api.table_metadata(&table_id)).await?;
        ctx.progress.nav(format!("Reading table {}: {}", table.id, table.label));

        let table = DimensionSelector::new(ctx).select(query, &history, table).await?;
        let intents = ValueSelector::new(ctx).select(query, &history, &table).await?;

        let (selections, diagnostics) = compile_all(&table, &intents);
        for diagnostic in diagnostics {
            ctx.progress.log(diagnostic);
        }

        let resolved = ResolvedQuery::assemble(&table, &selections);
        ctx.progress.log(format!("Query for table {}: {}", resolved.table_id, resolved.query_string()));

        let data = ctx.fetch(ctx.api.table_data(&resolved)).await?;
        info!("Fetched {} values from table {}", data.len(), table.id);

        Ok(Answer {
            table: TableContext::from_result(&table, &data),
            query: resolved,
            data,
        })
    }

    async fn refine(
        &self,
        ctx: RequestContext<'_>,
        request: &QueryRequest,
        history: &[ChatMessage],
        previous: Option<&TableContext>,
    ) -> Result<RefinedIntent> {
        let mut description = String::from(
            "You rewrite the user's latest message into one self-contained request for statistics, \
             resolving references to earlier turns. Keep every period, place and breakdown the user asked for.",
        );
        let mut properties = vec![(
            "query".to_string(),
            string("the complete request, understandable without the conversation"),
        )];
        let mut required = vec!["query".to_string()];

        if let Some(previous) = previous {
            description.push_str(&format!(
                "\nThe previous answer used table {} ({}). Set reusePreviousTable to true only if the new request \
                 can be answered from that same table.",
                previous.table_id, previous.label
            ));
            properties.push((
                "reusePreviousTable".to_string(),
                json!({ "type": "boolean" }),
            ));
            required.push("reusePreviousTable".to_string());
        }

        let task = OracleTask::new("refine_request", description, object(properties, &required));
        let mut context = history.to_vec();
        context.push(ChatMessage::user(request.query.clone()));
        ctx.oracle_call().call(&task, &context).await
    }
}

fn fail(progress: &ProgressSender, error: AgentError) -> Outcome {
    let message = match error {
        AgentError::Cancelled => CANCELLED_MESSAGE.to_string(),
        other => other.to_string(),
    };
    progress.error(message.clone());
    Outcome::Failed { message }
}
