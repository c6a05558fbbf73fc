pub mod aggregator;
pub mod config;
pub mod driver;
pub mod models;
pub mod price;
pub mod report;
pub mod scraper;
pub mod search;
pub mod sites;
pub mod url_builder;
pub mod utils;

// Re-export commonly used types
pub use aggregator::{PriceSummary, aggregate};
pub use config::AppConfig;
pub use models::{Availability, Filter, ProductRecord, SiteConfig};
pub use scraper::{CatalogScraper, ScrapeEvent, ScrapeStats};
pub use search::{PriceSearch, SearchReport, SourceReport, SourceStatus};
pub use utils::error::{AppError, Result};
