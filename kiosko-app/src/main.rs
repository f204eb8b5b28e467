use anyhow::Result;
use clap::Parser;
use kiosko_common::observability::{init_logging, LogConfig};
use kiosko_config::KioskoConfigLoader;
use std::path::PathBuf;

mod harness;

/// Scrape El País opinion articles across a matrix of cloud browsers.
#[derive(Debug, Parser)]
#[command(name = "kiosko", version, about)]
struct Cli {
    /// Configuration file (YAML); KIOSKO__* environment variables override it.
    #[arg(short, long, default_value = "kiosko.yaml")]
    config: PathBuf,

    /// Run sessions one after another instead of in parallel.
    #[arg(long)]
    sequential: bool,

    /// Cap on concurrently open sessions (parallel mode).
    #[arg(long)]
    max_parallel: Option<usize>,

    /// Global deadline for the whole run, in seconds.
    #[arg(long)]
    deadline: Option<u64>,

    /// Use a local WebDriver endpoint instead of the cloud grid.
    #[arg(long)]
    local: bool,

    /// Local WebDriver endpoint, e.g. a chromedriver instance.
    #[arg(long, default_value = "http://localhost:9515")]
    webdriver_url: String,

    /// Run the local browser without a visible window.
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = KioskoConfigLoader::new().with_file(&cli.config).load()?;

    let log_path = init_logging(LogConfig {
        emit_stderr: true,
        ..LogConfig::default()
    })?;
    tracing::info!(config = %cli.config.display(), log = %log_path.display(), "kiosko starting");

    harness::run(cfg, &cli).await
}
