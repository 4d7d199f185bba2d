use crate::context::RequestContext;
use crate::error::{AgentError, Result};
use crate::model::TableSummary;
use crate::oracle::schema::{object, string, string_enum};
use crate::oracle::{ChatMessage, OracleTask};
use serde::Deserialize;
use tracing::info;

/// Answer meaning "none of these tables fits".
pub const NO_MATCH: &str = "NONE";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableChoice {
    table_id: String,
    #[serde(default)]
    reasoning: Option<String>,
}

fn ranking_task(candidates: &[TableSummary]) -> OracleTask {
    let listing: Vec<String> = candidates.iter().map(|c| format!("- {}", c.describe())).collect();
    let description = format!(
        "You pick the one statistical table that best answers the user's request.\n\
         Prefer tables whose variables cover everything the request asks for and whose time span includes the requested period.\n\
         Answer {} if none of the candidates can answer the request.\n\nCandidates:\n{}",
        NO_MATCH,
        listing.join("\n")
    );
    let mut ids: Vec<String> = candidates.iter().map(|c| c.id.clone()).collect();
    ids.push(NO_MATCH.to_string());
    let schema = object(
        vec![
            ("reasoning".to_string(), string("one or two sentences on why the table fits")),
            ("tableId".to_string(), string_enum(ids)),
        ],
        &["tableId".to_string()],
    );
    OracleTask::new("select_table", description, schema)
}

/// Pick one table id out of `candidates`.
///
/// A single candidate is taken as is. The oracle declining every candidate
/// yields `ResolutionExhausted` carrying them, so the caller can offer them.
pub async fn choose_table(
    ctx: RequestContext<'_>,
    query: &str,
    history: &[ChatMessage],
    candidates: Vec<TableSummary>,
) -> Result<String> {
    match candidates.len() {
        0 => Err(AgentError::exhausted("no candidate tables")),
        1 => {
            let only = &candidates[0];
            ctx.progress.nav(format!("Selected table {}: {}", only.id, only.label));
            Ok(only.id.clone())
        }
        n => {
            info!("Ranking {} candidate tables", n);
            let mut context = history.to_vec();
            context.push(ChatMessage::user(query.to_string()));
            let choice: TableChoice = ctx.oracle_call().call(&ranking_task(&candidates), &context).await?;

            if choice.table_id == NO_MATCH {
                return Err(AgentError::ResolutionExhausted {
                    reason: format!("none of the {} candidate tables fits the request", n),
                    candidates,
                });
            }
            let label = candidates
                .iter()
                .find(|c| c.id == choice.table_id)
                .map(|c| c.label.as_str())
                .unwrap_or_default();
            ctx.progress.nav(format!("Selected table {}: {}", choice.table_id, label));
            if let Some(reasoning) = choice.reasoning {
                ctx.progress.log(format!("Table choice: {}", reasoning));
            }
            Ok(choice.table_id)
        }
    }
}
