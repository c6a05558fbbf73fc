//! Multi-source search: one independent session per catalog, then ranking.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::aggregator::{PriceSummary, aggregate};
use crate::driver::DriverFactory;
use crate::models::{Filter, ProductRecord, SiteConfig};
use crate::scraper::{CatalogScraper, ScrapeStats};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Completed,
    /// The session hit the source timeout; records found until then are kept.
    TimedOut,
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: String,
    #[serde(flatten)]
    pub status: SourceStatus,
    pub records_found: usize,
    pub stats: Option<ScrapeStats>,
    pub elapsed_ms: u64,
    #[serde(skip)]
    pub records: Vec<ProductRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub filter: Filter,
    pub started_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
    pub ranked: Vec<ProductRecord>,
    pub summary: Option<PriceSummary>,
}

impl SearchReport {
    /// True when no source produced a single matching record.
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    pub fn cheapest(&self) -> Option<&ProductRecord> {
        self.ranked.first()
    }
}

pub struct PriceSearch {
    scraper: Arc<CatalogScraper>,
    factory: Arc<dyn DriverFactory>,
    sites: Vec<SiteConfig>,
    source_timeout: Duration,
}

impl PriceSearch {
    pub fn new(
        scraper: CatalogScraper,
        factory: Arc<dyn DriverFactory>,
        sites: Vec<SiteConfig>,
        source_timeout: Duration,
    ) -> Self {
        Self {
            scraper: Arc::new(scraper),
            factory,
            sites,
            source_timeout,
        }
    }

    /// Scrapes every site concurrently and ranks the cheapest `top_k` matches.
    ///
    /// A source that fails or times out never prevents the others from ranking.
    pub async fn run(&self, filter: &Filter, top_k: usize) -> SearchReport {
        let started_at = Utc::now();

        let (names, handles): (Vec<String>, Vec<_>) = self
            .sites
            .iter()
            .cloned()
            .map(|site| {
                let scraper = Arc::clone(&self.scraper);
                let factory = Arc::clone(&self.factory);
                let filter = filter.clone();
                let timeout = self.source_timeout;
                let name = site.name.clone();
                let handle = tokio::spawn(async move {
                    run_source(&scraper, factory.as_ref(), &filter, &site, timeout).await
                });
                (name, handle)
            })
            .unzip();

        let sources: Vec<SourceReport> = join_all(handles)
            .await
            .into_iter()
            .zip(names)
            .map(|(joined, name)| match joined {
                Ok(report) => report,
                Err(e) => {
                    error!("{}: scrape task failed: {}", name, e);
                    SourceReport {
                        source: name,
                        status: SourceStatus::Unavailable {
                            reason: format!("scrape task failed: {}", e),
                        },
                        records_found: 0,
                        stats: None,
                        elapsed_ms: 0,
                        records: Vec::new(),
                    }
                }
            })
            .collect();

        let ranked = aggregate(
            sources.iter().map(|s| (s.source.as_str(), s.records.clone())),
            top_k,
        );
        let summary = PriceSummary::from_records(&ranked);

        info!(
            "Search finished: {} ranked results from {} sources",
            ranked.len(),
            sources.len()
        );

        SearchReport {
            filter: filter.clone(),
            started_at,
            sources,
            ranked,
            summary,
        }
    }
}

/// One source session. The driver is closed on every path once it was opened.
async fn run_source(
    scraper: &CatalogScraper,
    factory: &dyn DriverFactory,
    filter: &Filter,
    site: &SiteConfig,
    timeout: Duration,
) -> SourceReport {
    let start = Instant::now();

    let driver = match factory.open(site).await {
        Ok(driver) => driver,
        Err(e) => {
            warn!("{}: driver could not start: {}", site.name, e);
            return SourceReport {
                source: site.name.clone(),
                status: SourceStatus::Unavailable { reason: e.to_string() },
                records_found: 0,
                stats: None,
                elapsed_ms: start.elapsed().as_millis() as u64,
                records: Vec::new(),
            };
        }
    };

    let mut records = Vec::new();
    let outcome = tokio::time::timeout(
        timeout,
        scraper.scrape_into(filter, site, driver.as_ref(), &mut records),
    )
    .await;

    if let Err(e) = driver.close().await {
        warn!("{}: driver teardown failed: {}", site.name, e);
    }

    let (status, stats) = match outcome {
        Ok(Ok(stats)) => (SourceStatus::Completed, Some(stats)),
        Ok(Err(e)) => {
            warn!("{}: source unavailable: {}", site.name, e);
            (SourceStatus::Unavailable { reason: e.to_string() }, None)
        }
        Err(_) => {
            warn!(
                "{}: timed out after {}s, keeping {} records",
                site.name,
                timeout.as_secs(),
                records.len()
            );
            (SourceStatus::TimedOut, None)
        }
    };

    SourceReport {
        source: site.name.clone(),
        status,
        records_found: records.len(),
        stats,
        elapsed_ms: start.elapsed().as_millis() as u64,
        records,
    }
}
