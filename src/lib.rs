pub mod api;
pub mod cancel;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod llm;
pub mod model;
pub mod oracle;
pub mod pipeline;
pub mod progress;
pub mod query;
pub mod resolver;
pub mod selection;

pub use api::{HttpTableApi, TableApi};
pub use config::{AgentConfig, ResolverStrategy};
pub use error::{AgentError, Result};
pub use history::{TableContext, Turn};
pub use llm::LlmClient;
pub use oracle::Oracle;
pub use pipeline::{Answer, Outcome, QueryAgent, QueryRequest};
pub use progress::{EventType, ProgressEvent, ProgressReceiver, ProgressSender};
