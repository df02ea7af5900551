use rufus::commands::{command_argument_builder, crawl_command};
use rufus::handlers::*;
use rufus_core::report::ReportFormat;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;

fn crawl_matches(args: &[&str]) -> clap::ArgMatches {
    let mut argv = vec!["crawl"];
    argv.extend_from_slice(args);
    crawl_command().try_get_matches_from(argv).unwrap()
}

// ============================================================================
// Depth Input Tests
// ============================================================================

#[test]
fn test_parse_depth_input_default() {
    assert_eq!(parse_depth_input("").unwrap(), 2);
    assert_eq!(parse_depth_input("   \n").unwrap(), 2);
}

#[test]
fn test_parse_depth_input_number() {
    assert_eq!(parse_depth_input("0").unwrap(), 0);
    assert_eq!(parse_depth_input(" 4 ").unwrap(), 4);
}

#[test]
fn test_parse_depth_input_invalid() {
    assert!(parse_depth_input("deep").is_err());
    assert!(parse_depth_input("-1").is_err());
}

// ============================================================================
// Input Resolution Tests
// ============================================================================

#[test]
fn test_resolve_inputs_from_flags_never_prompts() {
    let mut input = Cursor::new(Vec::new());
    let mut output = Vec::new();

    let inputs = resolve_inputs(
        Some("https://example.com".to_string()),
        Some("pricing information".to_string()),
        None,
        &mut input,
        &mut output,
    )
    .unwrap();

    assert_eq!(
        inputs,
        CrawlInputs {
            base_url: "https://example.com".to_string(),
            instruction: "pricing information".to_string(),
            max_depth: 2,
        }
    );
    assert!(output.is_empty());
}

#[test]
fn test_resolve_inputs_fully_interactive() {
    let mut input = Cursor::new(b"example.com\npricing information\n3\n".to_vec());
    let mut output = Vec::new();

    let inputs = resolve_inputs(None, None, None, &mut input, &mut output).unwrap();

    assert_eq!(inputs.base_url, "example.com");
    assert_eq!(inputs.instruction, "pricing information");
    assert_eq!(inputs.max_depth, 3);

    let shown = String::from_utf8(output).unwrap();
    assert!(shown.contains("Enter the base URL to crawl:"));
    assert!(shown.contains("Enter your search instruction:"));
    assert!(shown.contains("Enter maximum crawl depth (default 2):"));
}

#[test]
fn test_resolve_inputs_empty_depth_uses_default() {
    let mut input = Cursor::new(b"example.com\npricing\n\n".to_vec());
    let mut output = Vec::new();

    let inputs = resolve_inputs(None, None, None, &mut input, &mut output).unwrap();

    assert_eq!(inputs.max_depth, 2);
}

#[test]
fn test_resolve_inputs_reprompts_invalid_depth() {
    let mut input = Cursor::new(b"example.com\npricing\nlots\n1\n".to_vec());
    let mut output = Vec::new();

    let inputs = resolve_inputs(None, None, None, &mut input, &mut output).unwrap();

    assert_eq!(inputs.max_depth, 1);
    let shown = String::from_utf8(output).unwrap();
    assert!(shown.contains("'lots' is not a valid depth"));
}

#[test]
fn test_resolve_inputs_only_missing_instruction() {
    let mut input = Cursor::new(b"\ncareers pages\n".to_vec());
    let mut output = Vec::new();

    let inputs = resolve_inputs(
        Some("https://example.com".to_string()),
        None,
        None,
        &mut input,
        &mut output,
    )
    .unwrap();

    // the blank answer is rejected and asked again; depth is not prompted
    assert_eq!(inputs.instruction, "careers pages");
    assert_eq!(inputs.max_depth, 2);
    let shown = String::from_utf8(output).unwrap();
    assert!(shown.contains("A value is required"));
    assert!(!shown.contains("maximum crawl depth"));
}

#[test]
fn test_resolve_inputs_explicit_depth_not_prompted() {
    let mut input = Cursor::new(b"example.com\npricing\n".to_vec());
    let mut output = Vec::new();

    let inputs = resolve_inputs(None, None, Some(0), &mut input, &mut output).unwrap();

    assert_eq!(inputs.max_depth, 0);
}

#[test]
fn test_resolve_inputs_closed_input_is_error() {
    let mut input = Cursor::new(Vec::new());
    let mut output = Vec::new();

    let result = resolve_inputs(None, None, None, &mut input, &mut output);
    assert!(result.is_err());
}

// ============================================================================
// Argument Parsing Tests
// ============================================================================

#[test]
fn test_crawl_settings_defaults() {
    let settings = crawl_settings(&crawl_matches(&[]), false);

    assert_eq!(settings.url, None);
    assert_eq!(settings.instruction, None);
    assert_eq!(settings.max_depth, None);
    assert_eq!(settings.output, PathBuf::from("."));
    assert_eq!(settings.format, ReportFormat::Json);
    assert_eq!(settings.accessor.settle_delay, Duration::from_millis(1000));
    assert_eq!(settings.accessor.navigation_timeout, Duration::from_secs(30));
    assert_eq!(settings.renderer.timeout, Duration::from_secs(30));
    assert_eq!(settings.deadline, None);
    assert!(settings.show_progress);
    assert_eq!(settings.log_file, Some(PathBuf::from("rufus.log")));
}

#[test]
fn test_crawl_settings_from_flags() {
    let matches = crawl_matches(&[
        "--url",
        "https://example.com",
        "-i",
        "pricing information",
        "-d",
        "1",
        "--format",
        "text",
        "--settle-ms",
        "0",
        "--timeout",
        "5",
        "--deadline",
        "120",
        "--no-progress",
        "--no-log-file",
    ]);
    let settings = crawl_settings(&matches, false);

    assert_eq!(settings.url.as_deref(), Some("https://example.com"));
    assert_eq!(settings.instruction.as_deref(), Some("pricing information"));
    assert_eq!(settings.max_depth, Some(1));
    assert_eq!(settings.format, ReportFormat::Text);
    assert_eq!(settings.accessor.settle_delay, Duration::ZERO);
    assert_eq!(settings.accessor.idle_timeout, Duration::from_secs(5));
    assert_eq!(settings.renderer.timeout, Duration::from_secs(5));
    assert_eq!(settings.deadline, Some(Duration::from_secs(120)));
    assert!(!settings.show_progress);
    assert_eq!(settings.log_file, None);
}

#[test]
fn test_timeout_above_default_reaches_renderer() {
    let settings = crawl_settings(&crawl_matches(&["--timeout", "60"]), false);

    assert_eq!(settings.accessor.navigation_timeout, Duration::from_secs(60));
    assert_eq!(settings.accessor.idle_timeout, Duration::from_secs(60));
    assert_eq!(settings.renderer.timeout, Duration::from_secs(60));
    assert_eq!(settings.renderer.max_redirects, 5);
}

#[test]
fn test_quiet_disables_progress() {
    let settings = crawl_settings(&crawl_matches(&[]), true);
    assert!(!settings.show_progress);
}

#[test]
fn test_crawl_options_from_settings() {
    let settings = crawl_settings(&crawl_matches(&["--deadline", "10"]), false);
    let options = settings.crawl_options(CrawlInputs {
        base_url: "example.com".to_string(),
        instruction: "pricing".to_string(),
        max_depth: 3,
    });

    assert_eq!(options.base_url, "example.com");
    assert_eq!(options.max_depth, 3);
    assert_eq!(options.deadline, Some(Duration::from_secs(10)));
}

#[test]
fn test_invalid_format_rejected() {
    let result = crawl_command().try_get_matches_from(["crawl", "--format", "csv"]);
    assert!(result.is_err());
}

#[test]
fn test_log_file_conflicts_with_no_log_file() {
    let result = crawl_command().try_get_matches_from([
        "crawl",
        "--log-file",
        "x.log",
        "--no-log-file",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_top_level_quiet_and_subcommand() {
    let matches = command_argument_builder()
        .try_get_matches_from(["rufus", "-q", "crawl", "-u", "example.com"])
        .unwrap();

    assert!(matches.get_flag("quiet"));
    let (name, sub) = matches.subcommand().unwrap();
    assert_eq!(name, "crawl");
    assert_eq!(sub.get_one::<String>("url").unwrap(), "example.com");
}

#[test]
fn test_expand_output_dir_tilde() {
    let expanded = expand_output_dir("~/reports");
    assert!(!expanded.to_string_lossy().starts_with('~'));
    assert!(expanded.ends_with("reports"));

    assert_eq!(expand_output_dir("out"), PathBuf::from("out"));
}
