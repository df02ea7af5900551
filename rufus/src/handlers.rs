use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use rufus_core::crawl::{CrawlOptions, DEFAULT_MAX_DEPTH, execute_crawl};
use rufus_core::report::{Report, ReportFormat, write_report};
use rufus_scanner::{
    AccessorConfig, ChatOracle, ClassificationGateway, HttpRenderer, RendererConfig,
};
use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const EXIT_OK: i32 = 0;
pub const EXIT_CRAWL_FAILED: i32 = 1;
pub const EXIT_REPORT_FAILED: i32 = 2;

/// Typed view of the `crawl` subcommand's arguments
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub url: Option<String>,
    pub instruction: Option<String>,
    pub max_depth: Option<usize>,
    pub output: PathBuf,
    pub format: ReportFormat,
    pub accessor: AccessorConfig,
    pub renderer: RendererConfig,
    pub deadline: Option<Duration>,
    pub show_progress: bool,
    pub log_file: Option<PathBuf>,
}

/// Inputs every crawl needs, after prompting for whatever was missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlInputs {
    pub base_url: String,
    pub instruction: String,
    pub max_depth: usize,
}

impl CrawlSettings {
    pub fn crawl_options(&self, inputs: CrawlInputs) -> CrawlOptions {
        CrawlOptions {
            base_url: inputs.base_url,
            instruction: inputs.instruction,
            max_depth: inputs.max_depth,
            accessor: self.accessor.clone(),
            deadline: self.deadline,
            show_progress_bars: self.show_progress,
        }
    }
}

pub fn crawl_settings(args: &ArgMatches, quiet: bool) -> CrawlSettings {
    let output = args
        .get_one::<String>("output")
        .map(|dir| expand_output_dir(dir))
        .unwrap_or_else(|| PathBuf::from("."));
    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Json);

    // --timeout bounds both the accessor steps and the HTTP client itself
    let timeout = args
        .get_one::<u64>("timeout")
        .map(|secs| Duration::from_secs(*secs));
    let defaults = AccessorConfig::default();
    let accessor = AccessorConfig {
        navigation_timeout: timeout.unwrap_or(defaults.navigation_timeout),
        idle_timeout: timeout.unwrap_or(defaults.idle_timeout),
        settle_delay: args
            .get_one::<u64>("settle-ms")
            .map(|ms| Duration::from_millis(*ms))
            .unwrap_or(defaults.settle_delay),
    };
    let renderer = match timeout {
        Some(timeout) => RendererConfig {
            timeout,
            ..Default::default()
        },
        None => RendererConfig::default(),
    };

    let log_file = if args.get_flag("no-log-file") {
        None
    } else {
        args.get_one::<PathBuf>("log-file").cloned()
    };

    CrawlSettings {
        url: args.get_one::<String>("url").cloned(),
        instruction: args.get_one::<String>("instruction").cloned(),
        max_depth: args.get_one::<usize>("max-depth").copied(),
        output,
        format,
        accessor,
        renderer,
        deadline: args
            .get_one::<u64>("deadline")
            .map(|secs| Duration::from_secs(*secs)),
        show_progress: !quiet && !args.get_flag("no-progress"),
        log_file,
    }
}

/// Expands a leading `~` in the report directory.
pub fn expand_output_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Parses the interactive depth answer. An empty answer means the default.
pub fn parse_depth_input(input: &str) -> Result<usize> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_MAX_DEPTH);
    }
    trimmed
        .parse::<usize>()
        .with_context(|| format!("'{}' is not a valid depth", trimmed))
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, msg: &str) -> Result<String> {
    write!(output, "{} ", msg.bright_cyan().bold())?;
    output.flush()?;

    let mut response = String::new();
    if input.read_line(&mut response)? == 0 {
        bail!("Input closed before a value was entered");
    }
    Ok(response.trim().to_string())
}

fn prompt_required<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    msg: &str,
) -> Result<String> {
    loop {
        let value = prompt(input, output, msg)?;
        if !value.is_empty() {
            return Ok(value);
        }
        writeln!(output, "{} A value is required", "✗".red().bold())?;
    }
}

/// Fills in missing crawl inputs from `input`. The depth is only asked for
/// when neither the URL nor the instruction came from the command line.
pub fn resolve_inputs<R: BufRead, W: Write>(
    url: Option<String>,
    instruction: Option<String>,
    max_depth: Option<usize>,
    input: &mut R,
    output: &mut W,
) -> Result<CrawlInputs> {
    let url = url.filter(|u| !u.trim().is_empty());
    let instruction = instruction.filter(|i| !i.trim().is_empty());
    let fully_interactive = url.is_none() && instruction.is_none();

    let base_url = match url {
        Some(url) => url.trim().to_string(),
        None => prompt_required(input, output, "Enter the base URL to crawl:")?,
    };
    let instruction = match instruction {
        Some(instruction) => instruction.trim().to_string(),
        None => prompt_required(input, output, "Enter your search instruction:")?,
    };

    let max_depth = match max_depth {
        Some(depth) => depth,
        None if fully_interactive => loop {
            let raw = prompt(input, output, "Enter maximum crawl depth (default 2):")?;
            match parse_depth_input(&raw) {
                Ok(depth) => break depth,
                Err(e) => writeln!(output, "{} {}", "✗".red().bold(), e)?,
            }
        },
        None => DEFAULT_MAX_DEPTH,
    };

    Ok(CrawlInputs {
        base_url,
        instruction,
        max_depth,
    })
}

/// Installs the global subscriber: stderr output plus an optional plain-text
/// log file. `RUST_LOG` overrides the default level.
pub fn init_tracing(log_file: Option<&Path>, quiet: bool) -> Result<()> {
    let default_level = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

pub fn print_summary(report: &Report, saved_to: Option<&Path>) {
    let meta = &report.metadata;

    println!();
    print_divider();
    if meta.cancelled {
        println!("{}", "  CRAWL STOPPED EARLY (partial results)".yellow().bold());
    } else {
        println!("{}", "  CRAWL COMPLETED".bright_white().bold());
    }
    print_divider();
    println!();

    println!("{} Base URL:       {}", "→".blue(), meta.base_url.bright_white());
    println!("{} Pages visited:  {}", "→".blue(), meta.total_pages);
    println!(
        "{} Relevant pages: {}",
        "→".blue(),
        meta.relevant_pages.to_string().green().bold()
    );
    if !meta.keywords_used.is_empty() {
        println!("{} Keywords:       {}", "→".blue(), meta.keywords_used.join(", "));
    }

    for (depth, summary) in &report.depth_analysis {
        if summary.urls.is_empty() {
            continue;
        }
        println!("\n  Depth {}:", depth);
        for url in &summary.urls {
            println!("    {} {}", "✓".green(), url);
        }
    }
    println!();

    if let Some(path) = saved_to {
        println!(
            "{} Report saved to {}",
            "✓".green().bold(),
            path.display().to_string().bright_white()
        );
    }
}

/// Runs the `crawl` command end to end and returns the process exit code.
pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) -> i32 {
    let settings = crawl_settings(sub_matches, quiet);

    if let Err(e) = init_tracing(settings.log_file.as_deref(), quiet) {
        eprintln!("{} {:#}", "⚠".yellow().bold(), e);
    }

    let inputs = {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        match resolve_inputs(
            settings.url.clone(),
            settings.instruction.clone(),
            settings.max_depth,
            &mut input,
            &mut output,
        ) {
            Ok(inputs) => inputs,
            Err(e) => {
                eprintln!("{} {:#}", "✗".red().bold(), e);
                return EXIT_CRAWL_FAILED;
            }
        }
    };

    let oracle = match ChatOracle::from_env() {
        Ok(oracle) => oracle,
        Err(e) => {
            error!(error = %e, "Classifier setup failed");
            eprintln!("{} {}", "✗".red().bold(), e);
            return EXIT_CRAWL_FAILED;
        }
    };
    let classifier = ClassificationGateway::new(oracle);
    let renderer = HttpRenderer::new(settings.renderer.clone());

    if !quiet {
        println!("\n{} Target:      {}", "→".blue(), inputs.base_url.bright_white());
        println!("{} Instruction: {}", "→".blue(), inputs.instruction);
        println!("{} Max depth:   {}", "→".blue(), inputs.max_depth);
        println!("\n{}", "Starting crawl...".bright_white().bold());
    }

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping crawl");
                cancel.cancel();
            }
        })
    };

    let options = settings.crawl_options(inputs);
    let result = execute_crawl(options, &renderer, &classifier, cancel, None).await;
    interrupt.abort();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Crawl failed");
            eprintln!("{} Crawl failed: {}", "✗".red().bold(), e);
            return EXIT_CRAWL_FAILED;
        }
    };

    match write_report(&report, &settings.output, settings.format) {
        Ok(path) => {
            info!(path = %path.display(), "Report saved");
            print_summary(&report, Some(&path));
            EXIT_OK
        }
        Err(e) => {
            error!(error = %e, "Failed to save report");
            print_summary(&report, None);
            eprintln!("{} {}", "✗".red().bold(), e);
            EXIT_REPORT_FAILED
        }
    }
}
