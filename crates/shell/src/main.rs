use clap::Parser;

use sg_shell::bootstrap;
use sg_shell::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    bootstrap::init_tracing();

    let config = bootstrap::load_config(args.config.as_deref())?;

    match args.command {
        Command::CheckConfig => {
            if !cli::check_config(&config) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Match {
            url,
            resource_type,
            page,
        } => cli::match_url(&config, &url, &resource_type, page.as_deref()),
        Command::Rules { export } => cli::rules(&config, export),
    }
}
