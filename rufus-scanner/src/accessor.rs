use crate::error::{LoadError, Result};
use crate::page::PageSnapshot;
use crate::renderer::RenderSession;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct AccessorConfig {
    /// Upper bound on a single navigation
    pub navigation_timeout: Duration,
    /// Upper bound on waiting for the page to go idle
    pub idle_timeout: Duration,
    /// Fixed pause after the page goes idle
    pub settle_delay: Duration,
}

impl Default for AccessorConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(1),
        }
    }
}

/// Loads pages through one rendering session and snapshots them.
pub struct PageAccessor<S: RenderSession> {
    session: S,
    config: AccessorConfig,
}

impl<S: RenderSession> PageAccessor<S> {
    pub fn new(session: S, config: AccessorConfig) -> Self {
        Self { session, config }
    }

    /// Navigates to `url`, waits for it to settle and extracts text, title
    /// and anchors.
    pub async fn load(&mut self, url: &str) -> Result<PageSnapshot> {
        bounded(self.config.navigation_timeout, self.session.navigate(url)).await?;
        bounded(self.config.idle_timeout, self.session.wait_for_idle()).await?;

        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }

        let snapshot = PageSnapshot {
            url: url.to_string(),
            body_text: self.session.extract_text().await?,
            title: self.session.title().await?,
            anchors: self.session.extract_links().await?,
        };

        debug!(
            url = %url,
            text_len = snapshot.body_text.len(),
            anchors = snapshot.anchors.len(),
            "Page loaded"
        );
        Ok(snapshot)
    }

    /// Releases the underlying session.
    pub async fn close(mut self) -> S {
        self.session.close().await;
        self.session
    }
}

async fn bounded<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(LoadError::Timeout(limit)),
    }
}
