//! Paginated card extraction.
//!
//! One traversal walks a source's result pages in order: load, wait for the
//! card container, count cards once, then extract each card by index. Handles
//! are never kept across attempts; every attempt re-queries the card list and
//! takes the entry at the same index, so a re-render between attempts only
//! costs a retry.

use serde::Serialize;
use std::collections::HashSet;
use tokio::sync::mpsc;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ScraperConfig;
use crate::driver::{DriverError, ElementHandle, PageDriver};
use crate::models::{Availability, Filter, MISSING_NAME, MISSING_PRICE, NameSource, Pagination, ProductRecord, SiteConfig};
use crate::url_builder::build_url;
use crate::utils::error::{AppError, Result};
use crate::utils::text::name_from_slug;

/// Progress notifications for live counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeEvent {
    PageLoaded { source: String, page: u32, cards: usize },
    PageEmpty { source: String, page: u32 },
    RecordFound { source: String, total: usize },
}

/// Counters for one source traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeStats {
    pub pages: u32,
    pub cards_seen: usize,
    pub records: usize,
    pub skipped: usize,
    pub dropped: usize,
    pub stale_retries: usize,
}

enum CardOutcome {
    Record(ProductRecord),
    Skipped(&'static str),
}

pub struct CatalogScraper {
    config: ScraperConfig,
    events: Option<mpsc::UnboundedSender<ScrapeEvent>>,
}

impl CatalogScraper {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config, events: None }
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<ScrapeEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn scrape<D: PageDriver + ?Sized>(
        &self,
        filter: &Filter,
        site: &SiteConfig,
        driver: &D,
    ) -> Result<Vec<ProductRecord>> {
        let mut records = Vec::new();
        self.scrape_into(filter, site, driver, &mut records).await?;
        Ok(records)
    }

    /// Walks every result page of `site`, appending matching records to `sink`
    /// as they are found.
    ///
    /// Records already in `sink` stay usable if the caller drops this future.
    /// Fails only when the first page cannot be loaded at all.
    pub async fn scrape_into<D: PageDriver + ?Sized>(
        &self,
        filter: &Filter,
        site: &SiteConfig,
        driver: &D,
        sink: &mut Vec<ProductRecord>,
    ) -> Result<ScrapeStats> {
        let mut stats = ScrapeStats::default();
        let mut page: u32 = 1;
        let mut url = build_url(filter, site, Some(page))?;
        let mut visited = HashSet::from([url.clone()]);

        loop {
            if stats.pages >= self.config.max_pages {
                warn!(
                    "{}: stopping after {} pages (max_pages reached)",
                    site.name, self.config.max_pages
                );
                break;
            }
            stats.pages += 1;

            // LoadPage
            if let Err(e) = self.navigate(driver, &url).await {
                if stats.pages == 1 {
                    return Err(AppError::SourceUnavailable {
                        source_name: site.name.clone(),
                        message: e.to_string(),
                    });
                }
                warn!("{}: page {} unreachable, keeping {} records: {}", site.name, page, sink.len(), e);
                break;
            }
            metrics::counter!("scout_pages_total", "source" => site.name.clone()).increment(1);
            debug!("{}: loaded page {} ({})", site.name, page, url);

            // WaitReady
            let ready = match driver
                .wait_for_any(&site.selectors.card, self.config.wait_timeout())
                .await
            {
                Ok(ready) => ready,
                Err(e) => {
                    warn!("{}: waiting for cards on page {} failed: {}", site.name, page, e);
                    false
                }
            };

            if ready {
                self.extract_page(filter, site, driver, page, sink, &mut stats).await;
            } else {
                warn!(
                    "{}: no cards on page {} within {}ms",
                    site.name, page, self.config.wait_timeout_ms
                );
                self.emit(ScrapeEvent::PageEmpty {
                    source: site.name.clone(),
                    page,
                });
            }

            // Paginate
            match self.next_page(filter, site, driver, page, &url).await? {
                // A link cycle back to any loaded page would repeat its records.
                Some(next) if !visited.insert(next.clone()) => {
                    debug!("{}: next page {} was already loaded, stopping", site.name, next);
                    break;
                }
                Some(next) => {
                    page += 1;
                    url = next;
                }
                None => break,
            }
        }

        info!(
            "{}: {} records from {} cards over {} pages ({} skipped, {} dropped)",
            site.name, stats.records, stats.cards_seen, stats.pages, stats.skipped, stats.dropped
        );
        Ok(stats)
    }

    async fn navigate<D: PageDriver + ?Sized>(&self, driver: &D, url: &str) -> std::result::Result<(), DriverError> {
        let strategy = FixedInterval::new(self.config.navigation_retry_delay()).take(self.config.navigation_retries);
        Retry::spawn(strategy, || driver.navigate(url)).await
    }

    async fn extract_page<D: PageDriver + ?Sized>(
        &self,
        filter: &Filter,
        site: &SiteConfig,
        driver: &D,
        page: u32,
        sink: &mut Vec<ProductRecord>,
        stats: &mut ScrapeStats,
    ) {
        // Identity within the page is the index; the count is taken once.
        let total = match driver.query_all(&site.selectors.card).await {
            Ok(cards) => cards.len(),
            Err(e) => {
                warn!("{}: listing cards on page {} failed: {}", site.name, page, e);
                0
            }
        };
        stats.cards_seen += total;
        self.emit(ScrapeEvent::PageLoaded {
            source: site.name.clone(),
            page,
            cards: total,
        });

        for idx in 0..total {
            if let Some(record) = self.extract_card(filter, site, driver, idx, stats).await {
                sink.push(record);
                stats.records += 1;
                metrics::counter!("scout_records_total", "source" => site.name.clone()).increment(1);
                self.emit(ScrapeEvent::RecordFound {
                    source: site.name.clone(),
                    total: sink.len(),
                });
            }
        }
    }

    /// Bounded retry loop for one card. Only staleness is retried.
    async fn extract_card<D: PageDriver + ?Sized>(
        &self,
        filter: &Filter,
        site: &SiteConfig,
        driver: &D,
        idx: usize,
        stats: &mut ScrapeStats,
    ) -> Option<ProductRecord> {
        let mut attempts_left = self.config.card_retry_attempts;

        while attempts_left > 0 {
            match self.read_card(filter, site, driver, idx).await {
                Ok(CardOutcome::Record(record)) => return Some(record),
                Ok(CardOutcome::Skipped(reason)) => {
                    debug!("{}: card {} skipped: {}", site.name, idx, reason);
                    stats.skipped += 1;
                    return None;
                }
                Err(e) if e.is_stale() => {
                    attempts_left -= 1;
                    stats.stale_retries += 1;
                    metrics::counter!("scout_stale_retries_total", "source" => site.name.clone()).increment(1);
                    if attempts_left > 0 {
                        tokio::time::sleep(self.config.stale_backoff()).await;
                    }
                }
                Err(e) => {
                    debug!("{}: card {} dropped: {}", site.name, idx, e);
                    self.drop_card(site, stats);
                    return None;
                }
            }
        }

        debug!(
            "{}: card {} dropped after {} stale attempts",
            site.name, idx, self.config.card_retry_attempts
        );
        self.drop_card(site, stats);
        None
    }

    fn drop_card(&self, site: &SiteConfig, stats: &mut ScrapeStats) {
        stats.dropped += 1;
        metrics::counter!("scout_cards_dropped_total", "source" => site.name.clone()).increment(1);
    }

    /// One extraction attempt from a freshly resolved handle.
    async fn read_card<D: PageDriver + ?Sized>(
        &self,
        filter: &Filter,
        site: &SiteConfig,
        driver: &D,
        idx: usize,
    ) -> std::result::Result<CardOutcome, DriverError> {
        // A shorter list than counted means the page re-rendered under us.
        let handle = driver
            .query_all(&site.selectors.card)
            .await?
            .get(idx)
            .copied()
            .ok_or(DriverError::Stale)?;

        if let Some(sold_out) = site.selectors.sold_out.as_deref().filter(|s| !s.is_empty()) {
            if driver.exists(handle, sold_out).await? {
                return Ok(CardOutcome::Skipped("sold out"));
            }
        }

        let name = self
            .read_name(site, driver, handle)
            .await?
            .unwrap_or_else(|| MISSING_NAME.to_string());
        if !filter.matches(&name) {
            return Ok(CardOutcome::Skipped("filtered out"));
        }

        let price = driver
            .text(handle, Some(&site.selectors.price))
            .await?
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| MISSING_PRICE.to_string());

        let availability = self.read_availability(site, driver, handle).await?;

        Ok(CardOutcome::Record(ProductRecord::new(name, price, availability, &site.name)))
    }

    async fn read_name<D: PageDriver + ?Sized>(
        &self,
        site: &SiteConfig,
        driver: &D,
        handle: ElementHandle,
    ) -> std::result::Result<Option<String>, DriverError> {
        let name = match site.name_source {
            NameSource::Text => driver.text(handle, Some(&site.selectors.name)).await?,
            NameSource::HrefSlug => driver
                .attr(handle, Some(&site.selectors.name), "href")
                .await?
                .and_then(|href| name_from_slug(&href)),
        };
        Ok(name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()))
    }

    async fn read_availability<D: PageDriver + ?Sized>(
        &self,
        site: &SiteConfig,
        driver: &D,
        handle: ElementHandle,
    ) -> std::result::Result<Availability, DriverError> {
        for rule in &site.availability.rules {
            if driver.exists(handle, &rule.selector).await? {
                return Ok(rule.status);
            }
        }
        Ok(site.availability.fallback)
    }

    /// Pagination marker lookup, retried on staleness within the card budget.
    async fn find_marker<D: PageDriver + ?Sized>(
        &self,
        site: &SiteConfig,
        driver: &D,
        marker: &str,
    ) -> std::result::Result<Vec<ElementHandle>, DriverError> {
        let mut attempts_left = self.config.card_retry_attempts;
        loop {
            match driver.query_all(marker).await {
                Err(e) if e.is_stale() && attempts_left > 1 => {
                    attempts_left -= 1;
                    metrics::counter!("scout_stale_retries_total", "source" => site.name.clone()).increment(1);
                    tokio::time::sleep(self.config.stale_backoff()).await;
                }
                outcome => return outcome,
            }
        }
    }

    /// Next page URL, or `None` when traversal is done.
    async fn next_page<D: PageDriver + ?Sized>(
        &self,
        filter: &Filter,
        site: &SiteConfig,
        driver: &D,
        page: u32,
        current_url: &str,
    ) -> Result<Option<String>> {
        let Some(marker) = site.pagination_marker() else {
            return Ok(None);
        };

        match &site.pagination {
            Pagination::None => Ok(None),
            Pagination::Param { .. } => match self.find_marker(site, driver, marker).await {
                Ok(found) if !found.is_empty() => Ok(Some(build_url(filter, site, Some(page + 1))?)),
                Ok(_) => {
                    debug!("{}: no pagination marker on page {}", site.name, page);
                    Ok(None)
                }
                Err(e) => {
                    warn!("{}: pagination check on page {} failed: {}", site.name, page, e);
                    Ok(None)
                }
            },
            Pagination::Link => Ok(self.follow_link(site, driver, marker, current_url).await),
        }
    }

    async fn follow_link<D: PageDriver + ?Sized>(
        &self,
        site: &SiteConfig,
        driver: &D,
        marker: &str,
        current_url: &str,
    ) -> Option<String> {
        let link = match self.find_marker(site, driver, marker).await {
            Ok(found) => *found.first()?,
            Err(e) => {
                warn!("{}: next-page lookup failed: {}", site.name, e);
                return None;
            }
        };

        let href = match driver.attr(link, None, "href").await {
            Ok(href) => href?,
            Err(e) => {
                warn!("{}: reading next-page link failed: {}", site.name, e);
                return None;
            }
        };

        let next = match Url::parse(current_url).and_then(|base| base.join(href.trim())) {
            Ok(next) => next.to_string(),
            Err(e) => {
                warn!("{}: bad next-page link {:?}: {}", site.name, href, e);
                return None;
            }
        };

        // A link back to the same page would never terminate.
        (next != current_url).then_some(next)
    }

    fn emit(&self, event: ScrapeEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}
