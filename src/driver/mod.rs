//! Page driver abstraction.
//!
//! A driver owns one browsing session over a live document. Element handles
//! are only valid until the document re-renders or navigates; after that any
//! call using them fails with [`DriverError::Stale`].

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::models::SiteConfig;

pub mod chrome;
pub mod html;

pub use chrome::{ChromeDriver, ChromeDriverFactory};
pub use html::{HtmlDriver, HtmlDriverFactory};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("stale element reference")]
    Stale,

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("driver protocol error: {0}")]
    Protocol(String),
}

impl DriverError {
    pub fn is_stale(&self) -> bool {
        matches!(self, DriverError::Stale)
    }
}

/// Opaque reference to an element of the current document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(u64);

impl ElementHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// Waits until at least one element matches `selector`. `false` on timeout.
    async fn wait_for_any(&self, selector: &str, timeout: Duration) -> Result<bool, DriverError>;

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DriverError>;

    /// Text of `handle`, or of its first descendant matching `selector`.
    /// `None` when the descendant does not exist.
    async fn text(&self, handle: ElementHandle, selector: Option<&str>) -> Result<Option<String>, DriverError>;

    /// Attribute of `handle`, or of its first descendant matching `selector`.
    async fn attr(
        &self,
        handle: ElementHandle,
        selector: Option<&str>,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    async fn exists(&self, handle: ElementHandle, selector: &str) -> Result<bool, DriverError>;

    /// Tears the session down. Safe to call more than once.
    async fn close(&self) -> Result<(), DriverError>;
}

/// Opens one driver session per source.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn open(&self, site: &SiteConfig) -> Result<Box<dyn PageDriver>, DriverError>;
}
