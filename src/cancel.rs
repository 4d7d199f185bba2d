use crate::error::{AgentError, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Run `fut` unless `token` fires first.
pub async fn guarded<F, T>(token: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(AgentError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_token_wins() {
        let token = CancellationToken::new();
        token.cancel();
        let result: Result<()> = guarded(&token, std::future::pending()).await;
        assert!(matches!(result, Err(AgentError::Cancelled)));
    }

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let token = CancellationToken::new();
        let result = guarded(&token, async { Ok(7) }).await.unwrap();
        assert_eq!(result, 7);
    }
}
