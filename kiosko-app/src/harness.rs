//! Wires configuration into the orchestrator and renders the run summary.

use crate::Cli;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use kiosko_common::{CapabilityDescriptor, RunStatus, ScrapeRunResult};
use kiosko_config::{KioskoConfig, RunModeConfig};
use kiosko_drivers::caps::Credentials;
use kiosko_drivers::remote::{DriverConfig, RemoteSessionFactory};
use kiosko_drivers::report::StatusReporter;
use kiosko_runner::{Orchestrator, RunMode};
use kiosko_scraper::analyze::repeated_words;
use kiosko_scraper::pipeline::{ImageSink, PipelineConfig};
use kiosko_storage::{ImageStore, ResultsWriter};
use kiosko_translate::{build_chain, ChainOptions, TranslationChain};
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

const DASHBOARD_URL: &str = "https://automate.browserstack.com/dashboard";

/// [`ImageSink`] backed by the on-disk image store.
struct DiskImages(ImageStore);

#[async_trait]
impl ImageSink for DiskImages {
    async fn store(&self, article_id: &str, url: &Url) -> Option<PathBuf> {
        self.0.download(article_id, url).await
    }
}

pub async fn run(cfg: KioskoConfig, cli: &Cli) -> Result<()> {
    let descriptors: Vec<CapabilityDescriptor> =
        cfg.sessions.iter().map(|s| s.to_descriptor()).collect();
    if descriptors.is_empty() {
        bail!("no sessions configured; add at least one entry under `sessions`");
    }

    let driver_config = build_driver_config(&cfg, cli)?;
    let factory = Arc::new(RemoteSessionFactory::new(driver_config));

    let translator = build_translator(&cfg)?;
    let images = ImageStore::new(&cfg.storage.images_dir, cfg.scrape.request_timeout())
        .context("failed to prepare image directory")?;
    let writer =
        ResultsWriter::new(&cfg.storage.data_dir).context("failed to prepare data directory")?;

    let pipeline = PipelineConfig {
        listing_url: Url::parse(&cfg.scrape.listing_url).context("invalid listing URL")?,
        max_articles: cfg.scrape.max_articles,
        retry_attempts: cfg.scrape.retry_attempts,
        retry_backoff: cfg.scrape.retry_backoff(),
        navigation_timeout: cfg.scrape.request_timeout(),
        target_lang: cfg.translate.target_lang.clone(),
    };

    let mode = resolve_mode(&cfg, cli);
    let deadline = cli.deadline.map(std::time::Duration::from_secs).or_else(|| cfg.run.deadline());

    let orchestrator = Orchestrator::new(
        factory,
        pipeline,
        translator.map(Arc::new),
        Arc::new(DiskImages(images)),
        deadline,
    );

    tracing::info!(sessions = descriptors.len(), ?mode, "starting scrape run");
    let results = orchestrator.run_all(&descriptors, mode).await;

    let written = writer.write(&results)?;
    print_summary(&results, &written, cli.local);

    if results.iter().all(|r| r.status == RunStatus::Failed) {
        bail!("every session failed");
    }
    Ok(())
}

fn build_driver_config(cfg: &KioskoConfig, cli: &Cli) -> Result<DriverConfig> {
    let base_url = Url::parse(&cfg.scrape.base_url).context("invalid base URL")?;

    if cli.local {
        return Ok(DriverConfig {
            webdriver_url: cli.webdriver_url.clone(),
            credentials: None,
            connect_timeout: cfg.provider.connect_timeout(),
            navigation_timeout: cfg.scrape.request_timeout(),
            base_url,
            headless: cli.headless,
            reporter: None,
        });
    }

    let (Some(username), Some(access_key)) = (&cfg.provider.username, &cfg.provider.access_key)
    else {
        bail!(
            "provider credentials missing; set KIOSKO__PROVIDER__USERNAME and \
             KIOSKO__PROVIDER__ACCESS_KEY, or pass --local"
        );
    };

    let reporter = StatusReporter::new(&cfg.provider.api_url, username, access_key)
        .context("invalid provider API URL")?;

    Ok(DriverConfig {
        webdriver_url: cfg.provider.hub_url.clone(),
        credentials: Some(Credentials {
            username: username.clone(),
            access_key: access_key.clone(),
        }),
        connect_timeout: cfg.provider.connect_timeout(),
        navigation_timeout: cfg.scrape.request_timeout(),
        base_url,
        headless: false,
        reporter: Some(reporter),
    })
}

fn build_translator(cfg: &KioskoConfig) -> Result<Option<TranslationChain>> {
    if cfg.translate.target_lang.is_empty() {
        tracing::info!("translation disabled (empty target language)");
        return Ok(None);
    }
    let chain = build_chain(&ChainOptions {
        source_lang: cfg.translate.source_lang.clone(),
        rapid_api_key: cfg.translate.rapid_api_key.clone(),
        attempt_timeout: cfg.translate.attempt_timeout(),
    })?;
    Ok(Some(chain))
}

fn resolve_mode(cfg: &KioskoConfig, cli: &Cli) -> RunMode {
    if cli.sequential {
        return RunMode::Sequential;
    }
    match cfg.run.mode {
        RunModeConfig::Sequential => RunMode::Sequential,
        RunModeConfig::Parallel => RunMode::Parallel {
            max_parallel: cli.max_parallel.unwrap_or(cfg.run.max_parallel),
        },
    }
}

fn print_summary(results: &[ScrapeRunResult], written: &std::path::Path, local: bool) {
    let passed = results
        .iter()
        .filter(|r| r.status == RunStatus::Passed)
        .count();

    println!();
    println!("=== Scrape run summary ===");
    println!("Sessions: {} total, {} passed, {} failed", results.len(), passed, results.len() - passed);
    println!();

    for result in results {
        let verdict = match result.status {
            RunStatus::Passed => "PASS",
            RunStatus::Failed => "FAIL",
        };
        println!(
            "[{verdict}] {} — {} articles ({} ms)",
            result.descriptor.label(),
            result.articles.len(),
            result.elapsed_ms
        );
        if let Some(detail) = &result.error_detail {
            println!("       {detail}");
        }
    }

    let titles: Vec<&str> = results
        .iter()
        .flat_map(|r| &r.articles)
        .map(|a| a.translated_title.as_deref().unwrap_or(&a.title))
        .collect();
    let repeats = repeated_words(titles);
    if !repeats.is_empty() {
        println!();
        println!("Words repeated across more than two headlines:");
        for wc in &repeats {
            println!("  {:>3}  {}", wc.count, wc.word);
        }
    }

    println!();
    println!("Results written to {}", written.display());
    if !local {
        println!("Session details: {DASHBOARD_URL}");
    }
}
