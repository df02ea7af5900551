pub mod crawl;
pub mod error;
pub mod frontier;
pub mod model;
pub mod report;

pub use crawl::{
    CrawlOptions, CrawlProgressCallback, DEFAULT_MAX_DEPTH, crawl, crawl_with_oracle, execute_crawl,
};
pub use error::{CrawlError, ReportWriteError};
pub use model::{CrawlRun, PageRecord};
pub use report::{Report, ReportFormat, write_report};

use colored::Colorize;

pub fn print_banner() {
    let banner = r#"
    ____         ____
   / __ \__  __ / __/_  _______
  / /_/ / / / // /_/ / / / ___/
 / _, _/ /_/ // __/ /_/ (__  )
/_/ |_|\__,_//_/  \__,_/____/
"#;
    eprintln!("{}", banner.cyan());
    eprintln!(
        "  {} {}\n",
        "relevance-guided web crawler".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
