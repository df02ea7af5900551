// Tests for report generation functionality

use chrono::{Local, TimeZone, Utc};
use rufus_core::model::{CrawlRun, PageRecord};
use rufus_core::report::{
    Report, ReportFormat, finalize, generate_json_report, generate_text_report,
    report_file_name, write_report,
};
use tempfile::TempDir;

fn sample_run() -> CrawlRun {
    let run = CrawlRun::new("https://example.com/", "pricing information", 2);
    run.begin_visit("https://example.com/", 0);
    run.begin_visit("https://example.com/pricing", 1);
    run.begin_visit("https://example.com/careers", 1);
    run.record_verdict("https://example.com/", false);
    run.record_verdict("https://example.com/pricing", true);
    run.record_relevant_page(PageRecord {
        url: "https://example.com/pricing".to_string(),
        depth: 1,
        content: "Plans start at $10 per month".to_string(),
        crawl_time: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        title: "Pricing".to_string(),
        matched_keywords: vec!["pricing".to_string()],
    });
    run
}

fn sample_report() -> Report {
    finalize(&sample_run(), false)
}

// ============================================================================
// Report Format Tests
// ============================================================================

#[test]
fn test_report_format_from_str() {
    assert!(matches!(ReportFormat::from_str("json"), Some(ReportFormat::Json)));
    assert!(matches!(ReportFormat::from_str("text"), Some(ReportFormat::Text)));
    assert!(matches!(ReportFormat::from_str("txt"), Some(ReportFormat::Text)));
}

#[test]
fn test_report_format_from_str_case_insensitive() {
    assert!(matches!(ReportFormat::from_str("JSON"), Some(ReportFormat::Json)));
    assert!(matches!(ReportFormat::from_str("Text"), Some(ReportFormat::Text)));
}

#[test]
fn test_report_format_from_str_invalid() {
    assert!(ReportFormat::from_str("csv").is_none());
    assert!(ReportFormat::from_str("").is_none());
}

// ============================================================================
// Finalize Tests
// ============================================================================

#[test]
fn test_finalize_metadata() {
    let report = sample_report();
    let meta = &report.metadata;

    assert_eq!(meta.base_url, "https://example.com/");
    assert_eq!(meta.instruction, "pricing information");
    assert_eq!(meta.total_pages, 3);
    assert_eq!(meta.relevant_pages, 1);
    assert_eq!(meta.max_depth, 2);
    assert!(meta.keywords_used.is_empty());
    assert!(!meta.cancelled);
}

#[test]
fn test_finalize_depth_analysis_counts() {
    let report = sample_report();

    assert_eq!(report.depth_analysis.len(), 2);
    assert_eq!(report.depth_analysis[&0].count, 0);
    assert_eq!(report.depth_analysis[&1].count, 1);
    assert_eq!(report.depth_analysis[&1].urls, vec!["https://example.com/pricing"]);
}

#[test]
fn test_finalize_relevance_map_matches_visits() {
    let report = sample_report();
    let relevant: Vec<&str> = report.relevant_urls().collect();

    assert_eq!(report.relevance_map.len(), report.metadata.total_pages);
    assert_eq!(relevant, vec!["https://example.com/pricing"]);
    assert_eq!(report.page_data.len(), 1);
}

#[test]
fn test_finalize_carries_cancelled_flag() {
    let report = finalize(&sample_run(), true);
    assert!(report.metadata.cancelled);
}

// ============================================================================
// Serialization Tests
// ============================================================================

#[test]
fn test_json_report_layout() {
    let json = generate_json_report(&sample_report()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["metadata"]["base_url"], "https://example.com/");
    assert_eq!(value["metadata"]["total_pages"], 3);
    assert_eq!(value["relevance_map"]["https://example.com/pricing"], true);
    assert_eq!(value["depth_analysis"]["1"]["count"], 1);
    assert_eq!(
        value["depth_analysis"]["1"]["urls"][0],
        "https://example.com/pricing"
    );
    assert_eq!(value["page_data"]["https://example.com/pricing"]["title"], "Pricing");
    assert_eq!(value["page_data"]["https://example.com/pricing"]["depth"], 1);
}

#[test]
fn test_json_report_preserves_visitation_order() {
    let json = generate_json_report(&sample_report()).unwrap();
    let root = json.find("\"https://example.com/\"").unwrap();
    let pricing = json.find("\"https://example.com/pricing\"").unwrap();
    let careers = json.find("\"https://example.com/careers\"").unwrap();

    assert!(root < pricing);
    assert!(pricing < careers);
}

#[test]
fn test_json_report_reads_back() {
    let report = sample_report();
    let json = generate_json_report(&report).unwrap();
    let parsed: Report = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, report);
}

#[test]
fn test_text_report_sections() {
    let text = generate_text_report(&sample_report());

    assert!(text.contains("RUFUS CRAWL REPORT"));
    assert!(text.contains("Base URL:       https://example.com/"));
    assert!(text.contains("Status:         Completed"));
    assert!(text.contains("DEPTH ANALYSIS"));
    assert!(text.contains("Depth 1: 1 relevant"));
    assert!(text.contains("  /pricing"));
    assert!(text.contains("[1] Pricing"));
    assert!(text.contains("Plans start at $10 per month"));
    assert!(text.contains("✓ https://example.com/pricing"));
    assert!(text.contains("✗ https://example.com/careers"));
    assert!(text.contains("Keywords:       (none)"));
}

#[test]
fn test_text_report_cancelled_status() {
    let text = generate_text_report(&finalize(&sample_run(), true));
    assert!(text.contains("Status:         Cancelled"));
}

// ============================================================================
// Persistence Tests
// ============================================================================

#[test]
fn test_report_file_name() {
    let ts = Local.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap();

    assert_eq!(
        report_file_name(ts, ReportFormat::Json, 0),
        "crawl_report_20240301_090507.json"
    );
    assert_eq!(
        report_file_name(ts, ReportFormat::Text, 2),
        "crawl_report_20240301_090507_2.txt"
    );
}

#[test]
fn test_write_report_creates_file() {
    let dir = TempDir::new().unwrap();
    let report = sample_report();

    let path = write_report(&report, dir.path(), ReportFormat::Json).unwrap();

    assert!(path.starts_with(dir.path()));
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("crawl_report_"));
    assert!(name.ends_with(".json"));

    let written: Report =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, report);
}

#[test]
fn test_write_report_never_overwrites() {
    let dir = TempDir::new().unwrap();
    let report = sample_report();

    let first = write_report(&report, dir.path(), ReportFormat::Text).unwrap();
    let second = write_report(&report, dir.path(), ReportFormat::Text).unwrap();

    assert_ne!(first, second);
    assert!(first.exists());
    assert!(second.exists());
}

#[test]
fn test_write_report_creates_missing_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("reports").join("today");

    let path = write_report(&sample_report(), &nested, ReportFormat::Json).unwrap();

    assert!(nested.is_dir());
    assert!(path.exists());
}

#[test]
fn test_write_report_fails_when_dir_is_a_file() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, "x").unwrap();

    let result = write_report(&sample_report(), &blocker, ReportFormat::Json);
    assert!(result.is_err());
}
