use crate::frontier::Frontier;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;

/// Snapshot of a page judged relevant. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub depth: usize,
    pub content: String,
    pub crawl_time: DateTime<Utc>,
    pub title: String,
    pub matched_keywords: Vec<String>,
}

#[derive(Debug, Default)]
struct RunResults {
    /// Verdict per visited URL, in visitation order
    relevance: IndexMap<String, bool>,
    /// Relevant URLs per depth; a level exists once traversal began there
    depth_index: BTreeMap<usize, Vec<String>>,
    pages: IndexMap<String, PageRecord>,
}

/// State of a single crawl: its inputs, the visited set, the shared keyword
/// set and everything recorded so far.
///
/// Safe to share across tasks; every mutation goes through a lock or the
/// keyword cell.
#[derive(Debug)]
pub struct CrawlRun {
    base_url: String,
    instruction: String,
    max_depth: usize,
    started_at: DateTime<Utc>,
    keywords: OnceCell<Vec<String>>,
    frontier: Frontier,
    results: Mutex<RunResults>,
}

impl CrawlRun {
    /// `base_url` must already be normalized; it is the scope prefix.
    pub fn new(
        base_url: impl Into<String>,
        instruction: impl Into<String>,
        max_depth: usize,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            instruction: instruction.into(),
            max_depth,
            started_at: Utc::now(),
            keywords: OnceCell::new(),
            frontier: Frontier::new(),
            results: Mutex::new(RunResults::default()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    fn results(&self) -> MutexGuard<'_, RunResults> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts traversal of `url` at `depth`. Returns `false` if the URL was
    /// already entered in this run.
    ///
    /// A new URL gets a provisional `false` verdict so that the relevance map
    /// always covers exactly the visited set, even when a load fails.
    pub fn begin_visit(&self, url: &str, depth: usize) -> bool {
        if !self.frontier.try_enter(url) {
            return false;
        }
        let mut results = self.results();
        results.relevance.insert(url.to_string(), false);
        results.depth_index.entry(depth).or_default();
        true
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.frontier.contains(url)
    }

    /// Returns the run's keyword set, computing it with `init` on first use.
    /// Concurrent callers wait for the single in-flight computation.
    pub async fn keywords_or_init<F, Fut>(&self, init: F) -> &[String]
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Vec<String>>,
    {
        self.keywords.get_or_init(init).await
    }

    /// The keyword set, or empty if it has not been computed yet.
    pub fn keywords(&self) -> Vec<String> {
        self.keywords.get().cloned().unwrap_or_default()
    }

    /// Records the classification of a visited URL. Unvisited URLs are ignored.
    pub fn record_verdict(&self, url: &str, relevant: bool) {
        let mut results = self.results();
        if let Some(verdict) = results.relevance.get_mut(url) {
            *verdict = relevant;
        }
    }

    /// Stores the record of a relevant page and indexes it under its depth.
    /// Returns `false` if a record for the URL already exists.
    pub fn record_relevant_page(&self, record: PageRecord) -> bool {
        let mut results = self.results();
        if results.pages.contains_key(&record.url) {
            return false;
        }
        results.relevance.insert(record.url.clone(), true);
        results
            .depth_index
            .entry(record.depth)
            .or_default()
            .push(record.url.clone());
        results.pages.insert(record.url.clone(), record);
        true
    }

    pub fn visited_count(&self) -> usize {
        self.frontier.len()
    }

    pub fn relevant_count(&self) -> usize {
        self.results().relevance.values().filter(|v| **v).count()
    }

    pub fn relevance_map(&self) -> IndexMap<String, bool> {
        self.results().relevance.clone()
    }

    pub fn depth_index(&self) -> BTreeMap<usize, Vec<String>> {
        self.results().depth_index.clone()
    }

    pub fn page_records(&self) -> IndexMap<String, PageRecord> {
        self.results().pages.clone()
    }
}
