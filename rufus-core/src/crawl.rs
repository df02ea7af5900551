use crate::error::CrawlError;
use crate::model::{CrawlRun, PageRecord};
use crate::report::{Report, finalize};
use chrono::Utc;
use futures::future::BoxFuture;
use indicatif::{ProgressBar, ProgressStyle};
use rufus_scanner::{
    AccessorConfig, ChatOracle, ClassificationGateway, Classifier, HttpRenderer,
    LINK_CONTEXT_LIMIT, LinkCandidate, Oracle, PageAccessor, RenderSession, Renderer,
};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, trace, warn};
use url::Url;

pub const DEFAULT_MAX_DEPTH: usize = 2;

/// Options for configuring a crawl operation
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub base_url: String,
    pub instruction: String,
    pub max_depth: usize,
    pub accessor: AccessorConfig,
    /// Wall-clock limit for the whole crawl
    pub deadline: Option<Duration>,
    pub show_progress_bars: bool,
}

impl CrawlOptions {
    pub fn new(base_url: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            instruction: instruction.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            accessor: AccessorConfig::default(),
            deadline: None,
            show_progress_bars: false,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_accessor(mut self, accessor: AccessorConfig) -> Self {
        self.accessor = accessor;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Where a single page visit is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Loading,
    Classified,
    Recursing,
    Leaf,
    Failed,
    Cancelled,
}

/// Prepends `https://` when no scheme is given and ensures a trailing slash.
/// The result is the scope prefix for the whole crawl.
pub fn normalize_base_url(input: &str) -> Result<String, CrawlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CrawlError::InvalidBaseUrl(input.to_string()));
    }

    let lower = trimmed.to_ascii_lowercase();
    let mut candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    if !candidate.ends_with('/') {
        candidate.push('/');
    }

    let mut parsed =
        Url::parse(&candidate).map_err(|_| CrawlError::InvalidBaseUrl(input.to_string()))?;
    if parsed.host_str().is_none() {
        return Err(CrawlError::InvalidBaseUrl(input.to_string()));
    }
    parsed.set_fragment(None);
    Ok(parsed.to_string())
}

/// Plain prefix match against the normalized base URL.
pub fn in_scope(base_url: &str, url: &str) -> bool {
    url.starts_with(base_url)
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

struct Traversal<'a, C: ?Sized> {
    run: &'a CrawlRun,
    classifier: &'a C,
    cancel: &'a CancellationToken,
    progress_bar: Option<&'a ProgressBar>,
    progress_callback: Option<&'a CrawlProgressCallback>,
}

impl<'a, C: Classifier + ?Sized> Traversal<'a, C> {
    /// Runs `fut` unless the crawl is cancelled first.
    async fn cancellable<T>(&self, fut: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            out = fut => Some(out),
        }
    }

    fn report_progress(&self, url: &str, depth: usize) {
        let message = format!(
            "Crawling depth {}: {} ({} pages visited)",
            depth,
            url,
            self.run.visited_count()
        );
        if let Some(pb) = self.progress_bar {
            pb.set_message(message.clone());
            pb.tick();
        }
        if let Some(callback) = self.progress_callback {
            callback(message);
        }
    }

    /// Depth-first visit of `url`. Links are classified and followed one at a
    /// time, so a followed link's subtree completes before the next sibling
    /// is considered. Everything logged inside runs under a `visit` span
    /// carrying the URL and depth.
    fn visit<'s, S: RenderSession>(
        &'s self,
        accessor: &'s mut PageAccessor<S>,
        url: String,
        depth: usize,
    ) -> BoxFuture<'s, ()> {
        let span = info_span!("visit", url = %url, depth);
        Box::pin(async move {
            if depth > self.run.max_depth() || self.cancel.is_cancelled() {
                return;
            }
            if !self.run.begin_visit(&url, depth) {
                debug!(url = %url, depth, "Already visited, skipping");
                return;
            }

            let instruction = self.run.instruction();
            let keywords = match self
                .cancellable(
                    self.run
                        .keywords_or_init(|| self.classifier.expand_keywords(instruction)),
                )
                .await
            {
                Some(keywords) => keywords,
                None => return trace_state(&url, VisitState::Cancelled),
            };

            self.report_progress(&url, depth);
            info!(url = %url, depth, "Crawling");
            trace_state(&url, VisitState::Loading);

            let page = match self.cancellable(accessor.load(&url)).await {
                Some(Ok(page)) => page,
                Some(Err(e)) => {
                    warn!(url = %url, depth, error = %e, "Failed to load page, abandoning branch");
                    return trace_state(&url, VisitState::Failed);
                }
                None => return trace_state(&url, VisitState::Cancelled),
            };

            let relevant = match self
                .cancellable(self.classifier.classify_page_relevance(
                    &page.body_text,
                    instruction,
                    keywords,
                ))
                .await
            {
                Some(relevant) => relevant,
                None => return trace_state(&url, VisitState::Cancelled),
            };

            self.run.record_verdict(&url, relevant);
            if relevant {
                info!(url = %url, depth, "Found relevant content");
                self.run.record_relevant_page(PageRecord {
                    url: url.clone(),
                    depth,
                    content: page.body_text.clone(),
                    crawl_time: Utc::now(),
                    title: page.title.clone(),
                    matched_keywords: keywords.to_vec(),
                });
            }
            trace_state(&url, VisitState::Classified);

            if depth >= self.run.max_depth() {
                return trace_state(&url, VisitState::Leaf);
            }
            trace_state(&url, VisitState::Recursing);

            let base_url = self.run.base_url();
            let mut considered: HashSet<&str> = HashSet::new();

            for anchor in &page.anchors {
                if self.cancel.is_cancelled() {
                    return trace_state(&url, VisitState::Cancelled);
                }
                if !considered.insert(anchor.href.as_str()) {
                    continue;
                }
                if !in_scope(base_url, &anchor.href) {
                    trace!(link = %anchor.href, "Out of scope");
                    continue;
                }
                if self.run.is_visited(&anchor.href) {
                    continue;
                }

                let candidate = LinkCandidate::from_anchor(anchor, LINK_CONTEXT_LIMIT);
                let follow = match self
                    .cancellable(self.classifier.classify_link_follow(
                        &candidate,
                        instruction,
                        keywords,
                    ))
                    .await
                {
                    Some(follow) => follow,
                    None => return trace_state(&url, VisitState::Cancelled),
                };

                if follow {
                    debug!(from = %url, link = %anchor.href, "Following link");
                    self.visit(&mut *accessor, anchor.href.clone(), depth + 1)
                        .await;
                }
            }
        }
        .instrument(span))
    }
}

fn trace_state(url: &str, state: VisitState) {
    trace!(url = %url, state = ?state, "Visit state");
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message("Starting crawl...");
    pb
}

/// Execute a crawl with the given options.
///
/// Only base URL validation and session setup can fail. Page and
/// classification failures are contained, and a cancelled or timed out crawl
/// still yields a report of everything recorded so far, flagged as cancelled.
pub async fn execute_crawl<R, C>(
    options: CrawlOptions,
    renderer: &R,
    classifier: &C,
    cancel: CancellationToken,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<Report, CrawlError>
where
    R: Renderer,
    C: Classifier + ?Sized,
{
    let CrawlOptions {
        base_url,
        instruction,
        max_depth,
        accessor,
        deadline,
        show_progress_bars,
    } = options;

    let base_url = normalize_base_url(&base_url)?;
    let run = CrawlRun::new(base_url.clone(), instruction, max_depth);
    info!(base_url = %base_url, max_depth, "Starting crawl");

    let session = renderer.launch().await?;
    let mut accessor = PageAccessor::new(session, accessor);

    let token = cancel.child_token();
    let watchdog = deadline.map(|limit| {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            warn!(deadline = ?limit, "Crawl deadline reached, cancelling");
            token.cancel();
        })
    });

    let progress_bar = show_progress_bars.then(spinner);
    let traversal = Traversal {
        run: &run,
        classifier,
        cancel: &token,
        progress_bar: progress_bar.as_ref(),
        progress_callback: progress_callback.as_ref(),
    };

    traversal.visit(&mut accessor, base_url, 0).await;

    if let Some(handle) = watchdog {
        handle.abort();
    }
    accessor.close().await;

    let cancelled = token.is_cancelled();
    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Crawl {}! {} pages visited, {} relevant",
            if cancelled { "cancelled" } else { "complete" },
            run.visited_count(),
            run.relevant_count()
        ));
    }
    info!(
        visited = run.visited_count(),
        relevant = run.relevant_count(),
        cancelled,
        "Crawl finished"
    );

    Ok(finalize(&run, cancelled))
}

/// Crawls `base_url` with an HTTP renderer and a chat-completions classifier
/// configured from the environment.
pub async fn crawl(
    base_url: &str,
    instruction: &str,
    max_depth: usize,
) -> Result<Report, CrawlError> {
    crawl_with_oracle(base_url, instruction, max_depth, ChatOracle::from_env()?).await
}

/// Same as [`crawl`], classifying through the given oracle.
pub async fn crawl_with_oracle<O: Oracle>(
    base_url: &str,
    instruction: &str,
    max_depth: usize,
    oracle: O,
) -> Result<Report, CrawlError> {
    let classifier = ClassificationGateway::new(oracle);
    let renderer = HttpRenderer::default();
    let options = CrawlOptions::new(base_url, instruction).with_max_depth(max_depth);

    execute_crawl(options, &renderer, &classifier, CancellationToken::new(), None).await
}
