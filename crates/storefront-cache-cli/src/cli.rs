use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "storefront-cache")]
#[command(about = "Inspect and invalidate the storefront catalog cache")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ./storefront.toml when present)
    #[arg(short, long, global = true, env = "STOREFRONT_CONFIG")]
    pub config: Option<String>,

    /// Log level (overrides logging.level from config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the cache backend and report its state
    Status,
    /// Remove every cached entry of a domain
    Invalidate(InvalidateArgs),
}

#[derive(clap::Args)]
pub struct InvalidateArgs {
    /// Which domain to invalidate
    pub target: InvalidateTarget,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum InvalidateTarget {
    ProductLists,
    CategoryTrees,
    PopularProducts,
    All,
}
