// Report generation from a finished crawl run

use crate::crawl::extract_url_path;
use crate::error::ReportWriteError;
use crate::model::{CrawlRun, PageRecord};
use chrono::{DateTime, Local, Utc};
use indexmap::IndexMap;
use rufus_scanner::page::truncate_chars;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const SEPARATOR: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";
const RULE: &str = "────────────────────────────────────────────────────────────────────────────────";

/// Characters of page content shown per page in text reports
const EXCERPT_LIMIT: usize = 300;

/// Highest numeric suffix tried before giving up on a report file name
const MAX_NAME_ATTEMPTS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Json,
    Text,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ReportFormat::Json),
            "text" | "txt" => Some(ReportFormat::Text),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Text => "txt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub base_url: String,
    pub instruction: String,
    pub crawl_time: DateTime<Utc>,
    pub total_pages: usize,
    pub relevant_pages: usize,
    pub keywords_used: Vec<String>,
    pub max_depth: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthSummary {
    pub urls: Vec<String>,
    pub count: usize,
}

/// Final result of a crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub relevance_map: IndexMap<String, bool>,
    pub depth_analysis: BTreeMap<usize, DepthSummary>,
    pub page_data: IndexMap<String, PageRecord>,
}

impl Report {
    /// Relevant URLs at `depth`, empty if the level was never reached.
    pub fn relevant_at(&self, depth: usize) -> &[String] {
        self.depth_analysis
            .get(&depth)
            .map(|summary| summary.urls.as_slice())
            .unwrap_or(&[])
    }

    pub fn relevant_urls(&self) -> impl Iterator<Item = &str> {
        self.relevance_map
            .iter()
            .filter(|(_, relevant)| **relevant)
            .map(|(url, _)| url.as_str())
    }
}

/// Assembles the report from a run's accumulated state.
pub fn finalize(run: &CrawlRun, cancelled: bool) -> Report {
    let relevance_map = run.relevance_map();
    let depth_analysis = run
        .depth_index()
        .into_iter()
        .map(|(depth, urls)| {
            let count = urls.len();
            (depth, DepthSummary { urls, count })
        })
        .collect();

    Report {
        metadata: ReportMetadata {
            base_url: run.base_url().to_string(),
            instruction: run.instruction().to_string(),
            crawl_time: run.started_at(),
            total_pages: relevance_map.len(),
            relevant_pages: relevance_map.values().filter(|v| **v).count(),
            keywords_used: run.keywords(),
            max_depth: run.max_depth(),
            cancelled,
        },
        relevance_map,
        depth_analysis,
        page_data: run.page_records(),
    }
}

pub fn generate_json_report(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

pub fn generate_text_report(report: &Report) -> String {
    let meta = &report.metadata;
    let mut out = String::new();

    // Header
    out.push_str(SEPARATOR);
    out.push_str("\n                           RUFUS CRAWL REPORT\n");
    out.push_str(SEPARATOR);
    out.push_str("\n\n");

    out.push_str(&format!("Base URL:       {}\n", meta.base_url));
    out.push_str(&format!("Instruction:    {}\n", meta.instruction));
    out.push_str(&format!(
        "Crawl Date:     {}\n",
        meta.crawl_time.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "Status:         {}\n",
        if meta.cancelled { "Cancelled" } else { "Completed" }
    ));
    out.push_str(&format!("Max Depth:      {}\n", meta.max_depth));
    out.push_str(&format!("Pages Visited:  {}\n", meta.total_pages));
    out.push_str(&format!("Relevant Pages: {}\n", meta.relevant_pages));
    if meta.keywords_used.is_empty() {
        out.push_str("Keywords:       (none)\n");
    } else {
        out.push_str("Keywords:\n");
        out.push_str(&wrap_text(&meta.keywords_used.join(", "), 80, "  "));
    }
    out.push('\n');

    section(&mut out, "DEPTH ANALYSIS");
    if report.depth_analysis.is_empty() {
        out.push_str("  (no pages visited)\n");
    }
    for (depth, summary) in &report.depth_analysis {
        out.push_str(&format!("Depth {}: {} relevant\n", depth, summary.count));
        for url in &summary.urls {
            out.push_str(&format!("  {}\n", extract_url_path(url)));
        }
    }
    out.push('\n');

    if !report.page_data.is_empty() {
        section(&mut out, "RELEVANT PAGES");
        for (idx, page) in report.page_data.values().enumerate() {
            let title = if page.title.is_empty() { "(untitled)" } else { &page.title };
            out.push_str(&format!("[{}] {}\n", idx + 1, title));
            out.push_str(&format!("URL:      {}\n", page.url));
            out.push_str(&format!("Depth:    {}\n", page.depth));
            out.push_str("\nExcerpt:\n");
            out.push_str(&wrap_text(truncate_chars(&page.content, EXCERPT_LIMIT), 80, "  "));
            out.push('\n');
            out.push_str(RULE);
            out.push_str("\n\n");
        }
    }

    section(&mut out, "RELEVANCE MAP");
    for (url, relevant) in &report.relevance_map {
        let marker = if *relevant { "✓" } else { "✗" };
        out.push_str(&format!("  {} {}\n", marker, url));
    }
    out.push('\n');

    // Footer
    out.push_str(SEPARATOR);
    out.push_str("\n                              End of Report\n");
    out.push_str(SEPARATOR);
    out.push_str("\n\nGenerated by Rufus - a relevance-guided web crawler\n\n");

    out
}

fn section(out: &mut String, title: &str) {
    out.push_str(SEPARATOR);
    out.push('\n');
    out.push_str(title);
    out.push('\n');
    out.push_str(SEPARATOR);
    out.push_str("\n\n");
}

pub fn render_report(report: &Report, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Json => generate_json_report(report),
        ReportFormat::Text => Ok(generate_text_report(report)),
    }
}

/// `crawl_report_<YYYYMMDD_HHMMSS>.<ext>`, with `_<n>` before the extension
/// when `attempt` is non-zero.
pub fn report_file_name(
    timestamp: DateTime<Local>,
    format: ReportFormat,
    attempt: usize,
) -> String {
    let stamp = timestamp.format("%Y%m%d_%H%M%S");
    if attempt == 0 {
        format!("crawl_report_{}.{}", stamp, format.extension())
    } else {
        format!("crawl_report_{}_{}.{}", stamp, attempt, format.extension())
    }
}

/// Writes `content` to `path`, refusing to replace an existing file.
pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Serializes `report` into a fresh timestamped file under `dir` and returns
/// its path. Existing files are never overwritten.
pub fn write_report(
    report: &Report,
    dir: &Path,
    format: ReportFormat,
) -> Result<PathBuf, ReportWriteError> {
    let content = render_report(report, format)?;
    fs::create_dir_all(dir).map_err(|source| ReportWriteError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let now = Local::now();
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(report_file_name(now, format, attempt));
        match save_report(&content, &path) {
            Ok(()) => return Ok(path),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(source) => return Err(ReportWriteError::Io { path, source }),
        }
    }

    Err(ReportWriteError::NameExhausted(dir.to_path_buf()))
}

fn wrap_text(text: &str, width: usize, indent: &str) -> String {
    let mut result = String::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.chars().count() + word.chars().count() + 1 > width - indent.len()
            && !current_line.is_empty()
        {
            result.push_str(indent);
            result.push_str(&current_line);
            result.push('\n');
            current_line.clear();
        }

        if !current_line.is_empty() {
            current_line.push(' ');
        }
        current_line.push_str(word);
    }

    if !current_line.is_empty() {
        result.push_str(indent);
        result.push_str(&current_line);
        result.push('\n');
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text_respects_width() {
        let wrapped = wrap_text("alpha beta gamma delta epsilon", 14, "  ");
        for line in wrapped.lines() {
            assert!(line.chars().count() <= 14, "line too long: {line:?}");
            assert!(line.starts_with("  "));
        }
        assert_eq!(wrapped.split_whitespace().count(), 5);
    }

    #[test]
    fn test_wrap_text_empty() {
        assert_eq!(wrap_text("   ", 80, "  "), "");
    }
}
