use crate::api::TableApi;
use crate::cancel::guarded;
use crate::config::AgentConfig;
use crate::error::Result;
use crate::oracle::{Oracle, SchemaValidatedCall};
use crate::progress::ProgressSender;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Everything a pipeline stage needs for one request.
#[derive(Clone, Copy)]
pub struct RequestContext<'a> {
    pub config: &'a AgentConfig,
    pub oracle: &'a dyn Oracle,
    pub api: &'a dyn TableApi,
    pub progress: &'a ProgressSender,
    pub cancel: &'a CancellationToken,
}

impl<'a> RequestContext<'a> {
    pub fn oracle_call(&self) -> SchemaValidatedCall<'a> {
        SchemaValidatedCall::new(self.oracle, self.cancel, self.config.max_retries)
    }

    /// Await an upstream call, giving up early if the request is cancelled.
    pub async fn fetch<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        guarded(self.cancel, fut).await
    }
}
