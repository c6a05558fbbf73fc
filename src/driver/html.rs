use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::driver::{DriverError, DriverFactory, ElementHandle, PageDriver};
use crate::models::SiteConfig;

/// Where documents come from.
#[derive(Clone)]
enum PageSource {
    Http(reqwest::Client),
    /// Offline snapshots keyed by exact URL.
    Fixtures(Arc<HashMap<String, String>>),
}

/// The parsed current document and the selectors handles were issued for.
///
/// A handle id packs `generation << 32 | slot << 24 | index`, so repeated
/// queries reuse ids and nothing grows with the number of calls.
struct DocumentState {
    url: Option<String>,
    document: Html,
    generation: u32,
    selectors: Vec<String>,
}

impl Default for DocumentState {
    fn default() -> Self {
        Self {
            url: None,
            document: Html::new_document(),
            generation: 0,
            selectors: Vec::new(),
        }
    }
}

const MAX_SELECTOR_SLOTS: usize = 1 << 8;
const MAX_INDEX: usize = 1 << 24;

impl DocumentState {
    fn slot_for(&mut self, selector: &str) -> Result<u64, DriverError> {
        let slot = match self.selectors.iter().position(|s| s == selector) {
            Some(slot) => slot,
            None if self.selectors.len() < MAX_SELECTOR_SLOTS => {
                self.selectors.push(selector.to_string());
                self.selectors.len() - 1
            }
            None => return Err(DriverError::Protocol("too many distinct selectors on one page".to_string())),
        };
        Ok(slot as u64)
    }

    fn handle(&self, slot: u64, index: usize) -> ElementHandle {
        ElementHandle::new(u64::from(self.generation) << 32 | slot << 24 | index as u64)
    }

    /// Selector and index behind `handle`, or `Stale` when it predates the current document.
    fn resolve(&self, handle: ElementHandle) -> Result<(&str, usize), DriverError> {
        let id = handle.id();
        if (id >> 32) as u32 != self.generation {
            return Err(DriverError::Stale);
        }
        let slot = ((id >> 24) & 0xff) as usize;
        let index = (id & 0xff_ffff) as usize;
        let selector = self.selectors.get(slot).ok_or(DriverError::Stale)?;
        Ok((selector, index))
    }
}

/// Page driver for catalogs that render server-side.
///
/// Runs no JavaScript. A handle stays valid until the next navigation; using it
/// afterwards reports [`DriverError::Stale`], like a re-rendered browser page.
pub struct HtmlDriver {
    source: PageSource,
    state: Mutex<DocumentState>,
}

fn parse_selector(selector: &str) -> Result<Selector, DriverError> {
    Selector::parse(selector).map_err(|e| DriverError::InvalidSelector(format!("{}: {:?}", selector, e)))
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

impl HtmlDriver {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            source: PageSource::Http(client),
            state: Mutex::new(DocumentState::default()),
        }
    }

    pub fn with_fixtures<I, U, H>(pages: I) -> Self
    where
        I: IntoIterator<Item = (U, H)>,
        U: Into<String>,
        H: Into<String>,
    {
        let pages = pages
            .into_iter()
            .map(|(url, html)| (url.into(), html.into()))
            .collect();
        Self::from_source(PageSource::Fixtures(Arc::new(pages)))
    }

    fn from_source(source: PageSource) -> Self {
        Self {
            source,
            state: Mutex::new(DocumentState::default()),
        }
    }

    pub fn current_url(&self) -> Option<String> {
        self.state.lock().ok().and_then(|state| state.url.clone())
    }

    async fn fetch(&self, url: &str) -> Result<String, DriverError> {
        let navigation_error = |message: String| DriverError::Navigation {
            url: url.to_string(),
            message,
        };

        match &self.source {
            PageSource::Http(client) => {
                let response = client
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| navigation_error(e.to_string()))?;
                response.text().await.map_err(|e| navigation_error(e.to_string()))
            }
            PageSource::Fixtures(pages) => pages
                .get(url)
                .cloned()
                .ok_or_else(|| navigation_error("no fixture for url".to_string())),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut DocumentState) -> Result<T, DriverError>) -> Result<T, DriverError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| DriverError::Protocol("document state poisoned".to_string()))?;
        f(&mut state)
    }

    /// Resolves `handle` and hands the element to `f`.
    fn with_element<T>(
        &self,
        handle: ElementHandle,
        f: impl FnOnce(ElementRef<'_>) -> Result<T, DriverError>,
    ) -> Result<T, DriverError> {
        self.with_state(|state| {
            let (selector, index) = state.resolve(handle)?;
            let selector = parse_selector(selector)?;
            let element = state
                .document
                .select(&selector)
                .nth(index)
                .ok_or(DriverError::Stale)?;
            f(element)
        })
    }
}

fn scoped<'a>(element: ElementRef<'a>, selector: Option<&str>) -> Result<Option<ElementRef<'a>>, DriverError> {
    match selector {
        None => Ok(Some(element)),
        Some(selector) => {
            let selector = parse_selector(selector)?;
            Ok(element.select(&selector).next())
        }
    }
}

#[async_trait]
impl PageDriver for HtmlDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let html = self.fetch(url).await?;
        self.with_state(|state| {
            state.url = Some(url.to_string());
            state.document = Html::parse_document(&html);
            state.generation = state.generation.wrapping_add(1);
            state.selectors.clear();
            Ok(())
        })
    }

    async fn wait_for_any(&self, selector: &str, _timeout: Duration) -> Result<bool, DriverError> {
        // Static documents are complete once fetched.
        let selector = parse_selector(selector)?;
        self.with_state(|state| Ok(state.document.select(&selector).next().is_some()))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DriverError> {
        let parsed = parse_selector(selector)?;
        self.with_state(|state| {
            let count = state.document.select(&parsed).count().min(MAX_INDEX);
            let slot = state.slot_for(selector)?;
            Ok((0..count).map(|index| state.handle(slot, index)).collect())
        })
    }

    async fn text(&self, handle: ElementHandle, selector: Option<&str>) -> Result<Option<String>, DriverError> {
        self.with_element(handle, |element| Ok(scoped(element, selector)?.map(element_text)))
    }

    async fn attr(
        &self,
        handle: ElementHandle,
        selector: Option<&str>,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        self.with_element(handle, |element| {
            Ok(scoped(element, selector)?.and_then(|el| el.value().attr(name).map(str::to_string)))
        })
    }

    async fn exists(&self, handle: ElementHandle, selector: &str) -> Result<bool, DriverError> {
        self.with_element(handle, |element| Ok(scoped(element, Some(selector))?.is_some()))
    }

    async fn close(&self) -> Result<(), DriverError> {
        if let Ok(mut state) = self.state.lock() {
            *state = DocumentState::default();
        }
        Ok(())
    }
}

/// Opens an [`HtmlDriver`] per source, sharing one HTTP client or fixture set.
#[derive(Clone)]
pub struct HtmlDriverFactory {
    source: PageSource,
}

impl HtmlDriverFactory {
    pub fn new(user_agent: Option<&str>, request_timeout: Duration) -> Result<Self, DriverError> {
        let mut builder = reqwest::Client::builder().timeout(request_timeout);
        if let Some(user_agent) = user_agent {
            builder = builder.user_agent(user_agent);
        }
        let client = builder
            .build()
            .map_err(|e| DriverError::Launch(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            source: PageSource::Http(client),
        })
    }

    pub fn with_fixtures<I, U, H>(pages: I) -> Self
    where
        I: IntoIterator<Item = (U, H)>,
        U: Into<String>,
        H: Into<String>,
    {
        let pages = pages
            .into_iter()
            .map(|(url, html)| (url.into(), html.into()))
            .collect();
        Self {
            source: PageSource::Fixtures(Arc::new(pages)),
        }
    }
}

#[async_trait]
impl DriverFactory for HtmlDriverFactory {
    async fn open(&self, _site: &SiteConfig) -> Result<Box<dyn PageDriver>, DriverError> {
        Ok(Box::new(HtmlDriver::from_source(self.source.clone())))
    }
}
