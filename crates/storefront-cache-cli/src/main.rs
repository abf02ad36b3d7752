mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use storefront_cache::config::loader;
use storefront_cache::{CatalogCache, ConfigError, init_tracing};

use cli::{Cli, Commands};
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        let code = if e.downcast_ref::<ConfigError>().is_some() {
            2
        } else {
            1
        };
        std::process::exit(code);
    }
}

async fn run() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = loader::load_config(cli.config.as_deref())?;
    init_tracing(&config.logging, cli.log_level.as_deref());

    let cache = CatalogCache::new(&config.cache);
    let result = match &cli.command {
        Commands::Status => commands::status::status(&config, &cache).await,
        Commands::Invalidate(args) => commands::invalidate::invalidate(&cache, args.target).await,
    };

    cache.shutdown().await;
    tracing::debug!("storefront-cache finished");
    result
}
