use rufus::commands::{command_argument_builder, crawl_command};
use rufus::handlers::handle_crawl;
use rufus_core::print_banner;

#[tokio::main]
async fn main() {
    // A missing .env is fine; the environment may already be set
    dotenvy::dotenv().ok();

    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    let code = match chosen_command.subcommand() {
        Some(("crawl", primary_command)) => handle_crawl(primary_command, quiet).await,
        None => {
            // No subcommand: prompt for everything
            let defaults = crawl_command().get_matches_from(["crawl"]);
            handle_crawl(&defaults, quiet).await
        }
        _ => unreachable!("clap should ensure we don't get here"),
    };

    std::process::exit(code);
}
