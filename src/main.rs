use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use price_scout::driver::{ChromeDriverFactory, DriverFactory, HtmlDriverFactory};
use price_scout::{AppConfig, CatalogScraper, Filter, PriceSearch, ScrapeEvent, SiteConfig, report};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DriverKind {
    /// Headless Chrome, for catalogs rendered by JavaScript
    Chrome,
    /// Plain HTTP fetch and static HTML parsing
    Html,
}

#[derive(Debug, Parser)]
#[command(name = "price-scout", version, about = "Find the cheapest matching products across online catalogs")]
struct Cli {
    /// Brand to match (optional)
    #[arg(long)]
    brand: Option<String>,

    /// Model to match; prompted for when missing
    #[arg(long)]
    model: Option<String>,

    /// Number of cheapest results to show
    #[arg(long)]
    top: Option<usize>,

    /// Restrict the search to these sites (repeatable)
    #[arg(long = "site")]
    sites: Vec<String>,

    #[arg(long, value_enum, default_value_t = DriverKind::Chrome)]
    driver: DriverKind,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,

    /// Print the configured sites as TOML and exit
    #[arg(long)]
    list_sites: bool,

    /// Extra configuration file layered over config/
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Serialize)]
struct SiteList<'a> {
    sites: &'a [SiteConfig],
}

fn prompt(label: &str) -> Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn ask_brand() -> Result<Option<String>> {
    Ok(prompt("Brand (leave empty for any): ")?.filter(|b| !b.is_empty()))
}

fn ask_model() -> Result<String> {
    loop {
        match prompt("Model: ")? {
            Some(model) if !model.is_empty() => return Ok(model),
            Some(_) => println!("The model cannot be empty."),
            None => bail!("no model given"),
        }
    }
}

/// Keeps one live line on stderr with the per-source match counts.
fn spawn_progress(mut events: mpsc::UnboundedReceiver<ScrapeEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        while let Some(event) = events.recv().await {
            match event {
                ScrapeEvent::RecordFound { source, total } => {
                    counts.insert(source, total);
                }
                ScrapeEvent::PageLoaded { source, .. } | ScrapeEvent::PageEmpty { source, .. } => {
                    counts.entry(source).or_insert(0);
                }
            }
            let line = counts
                .iter()
                .map(|(source, total)| format!("{}: {}", source, total))
                .collect::<Vec<_>>()
                .join(" | ");
            eprint!("\rMatches found  {}", line);
        }
        if !counts.is_empty() {
            eprintln!();
        }
    })
}

fn driver_factory(kind: DriverKind, config: &AppConfig) -> Result<Arc<dyn DriverFactory>> {
    let factory: Arc<dyn DriverFactory> = match kind {
        DriverKind::Chrome => Arc::new(ChromeDriverFactory::new(config.browser.clone())),
        DriverKind::Html => Arc::new(
            HtmlDriverFactory::new(
                config.browser.user_agent.as_deref(),
                config.search.request_timeout(),
            )
            .context("failed to set up the HTML driver")?,
        ),
    };
    Ok(factory)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("price_scout=info".parse()?),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    if cli.list_sites {
        print!("{}", toml::to_string_pretty(&SiteList { sites: &config.sites })?);
        return Ok(());
    }

    let sites = config.selected_sites(&cli.sites);
    if sites.is_empty() {
        bail!("no configured site matches {:?}", cli.sites);
    }

    let brand = match cli.brand {
        Some(brand) => Some(brand),
        None if cli.model.is_none() => ask_brand()?,
        None => None,
    };
    let model = match cli.model.filter(|m| !m.trim().is_empty()) {
        Some(model) => model,
        None => ask_model()?,
    };
    let filter = Filter::new(brand.as_deref(), &model);
    if filter.is_unrestricted() {
        warn!("Model {:?} has no letters or digits; every card will pass the model check", model);
    }
    let top_k = cli.top.unwrap_or(config.search.top_k).max(1);

    info!(
        "Searching {} site(s) for brand={:?} model={:?}",
        sites.len(),
        filter.brand,
        filter.model
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let progress = spawn_progress(rx);

    let search = PriceSearch::new(
        CatalogScraper::new(config.scraper.clone()).with_events(tx),
        driver_factory(cli.driver, &config)?,
        sites,
        config.search.source_timeout(),
    );
    let result = search.run(&filter, top_k).await;

    // Dropping the search drops the last event sender and ends the progress task.
    drop(search);
    progress.await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", report::render(&result));
    }

    Ok(())
}
