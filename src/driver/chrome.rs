use async_trait::async_trait;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::BrowserConfig;
use crate::driver::{DriverError, DriverFactory, ElementHandle, PageDriver};
use crate::models::SiteConfig;

/// Headless Chrome session: one browser process and one tab.
///
/// CDP calls are blocking and run on the blocking pool. Handles are CDP node
/// ids, which Chrome invalidates when the page re-renders.
pub struct ChromeDriver {
    _browser: Browser,
    tab: Arc<Tab>,
    closed: AtomicBool,
}

impl ChromeDriver {
    pub fn launch(config: &BrowserConfig) -> Result<Self, DriverError> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false) // Often needed in containerized environments
            .args(vec![
                std::ffi::OsStr::new("--no-sandbox"),
                std::ffi::OsStr::new("--disable-dev-shm-usage"),
                std::ffi::OsStr::new("--disable-gpu"),
                std::ffi::OsStr::new("--disable-extensions"),
            ])
            .build()
            .map_err(|e| DriverError::Launch(format!("invalid launch options: {}", e)))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options).map_err(|e| DriverError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| DriverError::Launch(format!("failed to open tab: {}", e)))?;

        if let Some(user_agent) = &config.user_agent {
            tab.set_user_agent(user_agent, None, None)
                .map_err(|e| DriverError::Launch(format!("failed to set user agent: {}", e)))?;
        }

        Ok(Self {
            _browser: browser,
            tab,
            closed: AtomicBool::new(false),
        })
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, DriverError>
    where
        F: FnOnce(&Tab) -> Result<T, DriverError> + Send + 'static,
        T: Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || op(&tab))
            .await
            .map_err(|e| DriverError::Protocol(format!("driver task failed: {}", e)))?
    }
}

/// Maps a CDP failure onto the driver taxonomy.
///
/// Chrome reports invalidated node ids with several messages depending on which
/// domain call hit them; all of them mean the handle is stale.
fn classify(err: anyhow::Error) -> DriverError {
    let message = format!("{:#}", err);
    let lower = message.to_lowercase();
    if lower.contains("no node with given id")
        || lower.contains("could not find node with given id")
        || lower.contains("node with given id does not belong")
        || lower.contains("cannot find context with specified id")
        || lower.contains("node is detached")
    {
        DriverError::Stale
    } else {
        DriverError::Protocol(message)
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    let lower = format!("{:#}", err).to_lowercase();
    lower.contains("no element found")
        || lower.contains("couldn't find element")
        || lower.contains("could not find element")
}

fn resolve(tab: &Tab, handle: ElementHandle) -> Result<Element<'_>, DriverError> {
    let node_id = u32::try_from(handle.id())
        .map_err(|_| DriverError::Protocol(format!("invalid node id {}", handle.id())))?;
    Element::new(tab, node_id).map_err(classify)
}

/// Resolves `handle`, then its first descendant matching `selector` if one is given.
fn scoped<'a>(
    tab: &'a Tab,
    handle: ElementHandle,
    selector: Option<&str>,
) -> Result<Option<Element<'a>>, DriverError> {
    let element = resolve(tab, handle)?;
    match selector {
        None => Ok(Some(element)),
        Some(selector) => match element.find_element(selector) {
            Ok(child) => Ok(Some(child)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(classify(e)),
        },
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let target = url.to_string();
        self.blocking(move |tab| {
            tab.navigate_to(&target)
                .and_then(|tab| tab.wait_until_navigated())
                .map(|_| ())
                .map_err(|e| DriverError::Navigation {
                    url: target.clone(),
                    message: e.to_string(),
                })
        })
        .await
    }

    async fn wait_for_any(&self, selector: &str, timeout: Duration) -> Result<bool, DriverError> {
        let selector = selector.to_string();
        self.blocking(move |tab| {
            match tab.wait_for_element_with_custom_timeout(&selector, timeout) {
                Ok(_) => Ok(true),
                Err(e) => match classify(e) {
                    DriverError::Stale => Err(DriverError::Stale),
                    _ => Ok(false),
                },
            }
        })
        .await
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DriverError> {
        let selector = selector.to_string();
        self.blocking(move |tab| match tab.find_elements(&selector) {
            Ok(elements) => Ok(elements
                .iter()
                .map(|el| ElementHandle::new(u64::from(el.node_id)))
                .collect()),
            Err(e) if is_not_found(&e) => Ok(Vec::new()),
            Err(e) => Err(classify(e)),
        })
        .await
    }

    async fn text(&self, handle: ElementHandle, selector: Option<&str>) -> Result<Option<String>, DriverError> {
        let selector = selector.map(str::to_string);
        self.blocking(move |tab| {
            match scoped(tab, handle, selector.as_deref())? {
                Some(element) => element.get_inner_text().map(Some).map_err(classify),
                None => Ok(None),
            }
        })
        .await
    }

    async fn attr(
        &self,
        handle: ElementHandle,
        selector: Option<&str>,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let selector = selector.map(str::to_string);
        let name = name.to_string();
        self.blocking(move |tab| {
            match scoped(tab, handle, selector.as_deref())? {
                Some(element) => element.get_attribute_value(&name).map_err(classify),
                None => Ok(None),
            }
        })
        .await
    }

    async fn exists(&self, handle: ElementHandle, selector: &str) -> Result<bool, DriverError> {
        let selector = selector.to_string();
        self.blocking(move |tab| {
            let element = resolve(tab, handle)?;
            match element.find_elements(&selector) {
                Ok(children) => Ok(!children.is_empty()),
                Err(e) if is_not_found(&e) => Ok(false),
                Err(e) => Err(classify(e)),
            }
        })
        .await
    }

    async fn close(&self) -> Result<(), DriverError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.blocking(|tab| tab.close(true).map(|_| ()).map_err(classify))
            .await
    }
}

/// Launches a fresh headless browser for every source.
pub struct ChromeDriverFactory {
    config: BrowserConfig,
}

impl ChromeDriverFactory {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DriverFactory for ChromeDriverFactory {
    async fn open(&self, site: &SiteConfig) -> Result<Box<dyn PageDriver>, DriverError> {
        tracing::debug!("Launching headless browser for {}", site.name);
        let config = self.config.clone();
        let driver = tokio::task::spawn_blocking(move || ChromeDriver::launch(&config))
            .await
            .map_err(|e| DriverError::Launch(format!("launch task failed: {}", e)))??;
        Ok(Box::new(driver))
    }
}
