use crate::CLAP_STYLING;
use clap::{arg, command};

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("rufus")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("rufus")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(crawl_command())
}

/// The `crawl` subcommand. Running `rufus` with no subcommand behaves like
/// `rufus crawl` with every input prompted for.
pub fn crawl_command() -> clap::Command {
    command!("crawl")
        .about(
            "Crawl a site depth-first, following only links a language model judges \
        relevant to your instruction, and save a relevance report.",
        )
        .arg(
            arg!(-u --"url" <URL>)
                .required(false)
                .help("Base URL to crawl; only links under it are followed (prompted if omitted)"),
        )
        .arg(
            arg!(-i --"instruction" <TEXT>)
                .required(false)
                .help("What you are looking for, in plain language (prompted if omitted)"),
        )
        .arg(
            arg!(-d --"max-depth" <DEPTH>)
                .required(false)
                .help("Maximum link depth below the base URL [default: 2]")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            arg!(-o --"output" <DIR>)
                .required(false)
                .help("Directory the report is written to")
                .default_value("."),
        )
        .arg(
            arg!(-f --"format" <FORMAT>)
                .required(false)
                .help("Report format: json, text")
                .value_parser(["json", "text"])
                .default_value("json"),
        )
        .arg(
            arg!(--"settle-ms" <MS>)
                .required(false)
                .help("Pause after each page loads, in milliseconds")
                .value_parser(clap::value_parser!(u64))
                .default_value("1000"),
        )
        .arg(
            arg!(-t --"timeout" <SECS>)
                .required(false)
                .help("Page load timeout in seconds")
                .value_parser(clap::value_parser!(u64))
                .default_value("30"),
        )
        .arg(
            arg!(--"deadline" <SECS>)
                .required(false)
                .help("Stop the whole crawl after this many seconds and save a partial report")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            arg!(--"no-progress")
                .required(false)
                .help("Disable the progress spinner")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(--"log-file" <PATH>)
                .required(false)
                .help("File that log events are appended to")
                .value_parser(clap::value_parser!(std::path::PathBuf))
                .default_value("rufus.log")
                .conflicts_with("no-log-file"),
        )
        .arg(
            arg!(--"no-log-file")
                .required(false)
                .help("Only log to the terminal")
                .action(clap::ArgAction::SetTrue),
        )
}
