mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use convertbox::config::Config;
use convertbox::handlers::GhostscriptLocator;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "convertbox=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Serve(args) => convertbox::api::run(config, args.address).await?,
        Commands::Locate => {
            let locator = GhostscriptLocator::from_config(&config.compression);
            match locator.locate() {
                Some(path) => println!("ghostscript: {}", path.display()),
                None => println!(
                    "ghostscript: not found (searched {}); \
                     PDF compression uses the in-process rewrite",
                    config.compression.binaries.join(", ")
                ),
            }
        }
    }

    Ok(())
}
