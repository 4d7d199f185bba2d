use anyhow::{Context, Result};
use clap::Parser;
use statq::history::Turn;
use statq::model::DataSet;
use statq::progress::{self, EventType};
use statq::{AgentConfig, HttpTableApi, LlmClient, Outcome, QueryAgent, QueryRequest, ResolverStrategy};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "statq")]
#[command(about = "Answer questions in plain language with data from a statistical table API")]
struct Args {
    /// The question, e.g. "population in Oslo 2020 to 2022"
    query: String,

    /// Table resolution strategy: keyword or hierarchical
    #[arg(long)]
    strategy: Option<ResolverStrategy>,

    /// Folders explored per navigation level
    #[arg(long)]
    breadth: Option<usize>,

    /// Maximum navigation depth
    #[arg(long)]
    depth: Option<usize>,

    /// Use the QA table API
    #[arg(long)]
    qa: bool,

    /// One value-selection call per dimension
    #[arg(long)]
    per_dimension: bool,

    /// Write the fetched rows to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// JSON file with earlier conversation turns
    #[arg(long)]
    history_file: Option<PathBuf>,
}

fn load_history(path: &Path) -> Result<Vec<Turn>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing history in {}", path.display()))
}

fn write_csv(path: &Path, data: &DataSet) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    let mut header: Vec<&str> = data.header();
    header.push("value");
    writer.write_record(&header)?;
    for row in data.rows() {
        let mut record: Vec<String> = row.labels.iter().map(|l| l.to_string()).collect();
        record.push(row.value.map(|v| v.to_string()).unwrap_or_default());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn print_rows(data: &DataSet) {
    println!("\n=== {} ===", data.label);
    println!("{}\tvalue", data.header().join("\t"));
    for row in data.rows() {
        let value = row.value.map(|v| v.to_string()).unwrap_or_else(|| "..".to_string());
        println!("{}\t{}", row.labels.join("\t"), value);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::rfc_3339())
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,statq=info")))
        .init();

    let args = Args::parse();

    let mut config = AgentConfig::from_env()?;
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    if let Some(breadth) = args.breadth {
        config.max_breadth = breadth;
    }
    if let Some(depth) = args.depth {
        config.max_depth = depth;
    }
    config.use_qa |= args.qa;
    config.per_dimension_selection |= args.per_dimension;
    config.validate()?;

    let history = match &args.history_file {
        Some(path) => load_history(path)?,
        None => Vec::new(),
    };

    let api = HttpTableApi::new(config.data_source_url(), config.language.clone())?;
    let llm = LlmClient::from_config(&config)?;
    info!("Using {} with strategy {:?}", api.base_url(), config.strategy);

    let agent = QueryAgent::new(config, Arc::new(llm), Arc::new(api));
    let request = QueryRequest::new(args.query).with_history(history);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling request");
            on_interrupt.cancel();
        }
    });

    let (sender, mut receiver) = progress::channel();
    let printer = async {
        while let Some(event) = receiver.recv().await {
            match event.event_type {
                EventType::Result => {}
                EventType::Abort => println!("[abort] no conclusive table; candidates: {}", event.content),
                _ => println!("[{:?}] {}", event.event_type, event.content),
            }
        }
    };
    let (outcome, _) = tokio::join!(agent.run(&request, sender, &cancel), printer);

    match outcome {
        Outcome::Completed(answer) => {
            print_rows(&answer.data);
            println!("\nquery: {}", answer.query.query_string());
            if let Some(path) = &args.csv {
                write_csv(path, &answer.data)?;
                println!("wrote {}", path.display());
            }
            Ok(())
        }
        Outcome::Aborted { reason, .. } => anyhow::bail!("no conclusive table: {}", reason),
        Outcome::Failed { message } => anyhow::bail!(message),
    }
}
