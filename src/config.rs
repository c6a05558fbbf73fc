use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use validator::Validate;

use crate::models::SiteConfig;
use crate::sites;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub browser: BrowserConfig,
    pub search: SearchConfig,
    /// Catalog sources; empty means the built-in sites.
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
}

/// Traversal tuning for the card extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub wait_timeout_ms: u64,
    pub card_retry_attempts: u32,
    pub stale_backoff_ms: u64,
    pub max_pages: u32,
    pub navigation_retries: usize,
    pub navigation_retry_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub chrome_path: Option<String>,
    pub user_agent: Option<String>,
    pub headless: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub top_k: usize,
    pub source_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: 15_000,
            card_retry_attempts: 3,
            stale_backoff_ms: 200,
            max_pages: 50,
            navigation_retries: 2,
            navigation_retry_delay_ms: 500,
        }
    }
}

impl ScraperConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn stale_backoff(&self) -> Duration {
        Duration::from_millis(self.stale_backoff_ms)
    }

    pub fn navigation_retry_delay(&self) -> Duration {
        Duration::from_millis(self.navigation_retry_delay_ms)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            user_agent: None,
            headless: true,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            source_timeout_secs: 300,
            request_timeout_secs: 30,
        }
    }
}

impl SearchConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig::default(),
            browser: BrowserConfig::default(),
            search: SearchConfig::default(),
            sites: sites::builtin(),
        }
    }
}

impl AppConfig {
    /// Layers built-in defaults, `config/{default,RUN_MODE,local}`, an optional
    /// explicit file and `SCOUT__*` environment variables.
    pub fn load(extra_file: Option<&Path>) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let defaults = Config::try_from(&AppConfig {
            sites: Vec::new(),
            ..AppConfig::default()
        })?;

        let mut builder = Config::builder()
            .add_source(defaults)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = extra_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let s = builder
            .add_source(Environment::with_prefix("SCOUT").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if config.sites.is_empty() {
            config.sites = sites::builtin();
        }

        if config.browser.chrome_path.is_none() {
            config.browser.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scraper.wait_timeout_ms == 0 {
            return Err(ConfigError::Message("Scraper wait_timeout_ms must be greater than 0".into()));
        }

        if self.scraper.card_retry_attempts == 0 {
            return Err(ConfigError::Message("Scraper card_retry_attempts must be greater than 0".into()));
        }

        if self.scraper.max_pages == 0 {
            return Err(ConfigError::Message("Scraper max_pages must be greater than 0".into()));
        }

        if self.search.top_k == 0 {
            return Err(ConfigError::Message("Search top_k must be greater than 0".into()));
        }

        if self.search.source_timeout_secs == 0 {
            return Err(ConfigError::Message("Search source_timeout_secs must be greater than 0".into()));
        }

        let mut seen = std::collections::HashSet::new();
        for site in &self.sites {
            site.validate()
                .map_err(|e| ConfigError::Message(format!("Invalid site '{}': {}", site.name, e)))?;
            if !seen.insert(site.name.as_str()) {
                return Err(ConfigError::Message(format!("Duplicate site name '{}'", site.name)));
            }
        }

        Ok(())
    }

    /// Sites whose name matches one of `names` (case-insensitive); all sites when `names` is empty.
    pub fn selected_sites(&self, names: &[String]) -> Vec<SiteConfig> {
        if names.is_empty() {
            return self.sites.clone();
        }
        self.sites
            .iter()
            .filter(|site| names.iter().any(|n| n.eq_ignore_ascii_case(&site.name)))
            .cloned()
            .collect()
    }
}
