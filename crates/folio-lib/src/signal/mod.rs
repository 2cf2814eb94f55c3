//! Process signal handling for graceful shutdown.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Turns SIGINT (Ctrl+C) or SIGTERM into a cancelled [`CancellationToken`].
///
/// Hand `token()` clones to whatever must stop on shutdown (the HTTP
/// server in `serve`), then `spawn()` the handler.
pub struct SignalHandler {
    token: CancellationToken,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Use an existing token, so an external caller can also cancel it.
    pub fn with_token(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run [`listen`](Self::listen) on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.listen().await })
    }

    /// Wait for SIGINT, SIGTERM or an outside cancellation, then cancel the token.
    pub async fn listen(&self) {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT, shutting down");
            }
            _ = Self::sigterm() => {
                tracing::info!("Received SIGTERM, shutting down");
            }
            _ = self.token.cancelled() => {
                tracing::debug!("shutdown requested");
            }
        }
        self.token.cancel();
    }

    #[cfg(unix)]
    async fn sigterm() {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(not(unix))]
    async fn sigterm() {
        std::future::pending::<()>().await;
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn new_handler_is_not_cancelled() {
        let handler = SignalHandler::new();
        assert!(!handler.token().is_cancelled());
    }

    #[test]
    fn shared_token_is_observed_by_the_handler() {
        let token = CancellationToken::new();
        let handler = SignalHandler::with_token(token.clone());
        token.cancel();
        assert!(handler.token().is_cancelled());
    }

    #[tokio::test]
    async fn spawned_listener_exits_when_token_is_cancelled() {
        let handler = SignalHandler::new();
        let token = handler.token();
        let task = handler.spawn();

        token.cancel();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("listener should stop within timeout")
            .expect("listener should not panic");
    }
}
