use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::{Validate, ValidationError};

use crate::models::Availability;

/// Declarative description of one catalog source.
///
/// Selectors are opaque to the engine and handed to the page driver as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_site_config"))]
pub struct SiteConfig {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub search_url_template: String,
    /// Placeholder name to pre-encoded value, substituted verbatim.
    #[serde(default)]
    pub extra_params: HashMap<String, String>,
    #[serde(default)]
    pub pagination: Pagination,
    pub selectors: Selectors,
    #[serde(default)]
    pub name_source: NameSource,
    #[serde(default)]
    pub availability: AvailabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Pagination {
    /// Increment `param_name` while the pagination marker is present.
    Param { param_name: String },
    /// Follow the marker element's `href` while it is present.
    Link,
    /// Single result page.
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selectors {
    pub card: String,
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub sold_out: Option<String>,
    #[serde(default)]
    pub pagination_marker: Option<String>,
}

/// Where a card's display name comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NameSource {
    /// Inner text of `selectors.name`.
    #[default]
    Text,
    /// Last path segment of the `href` on `selectors.name`, e.g.
    /// `.../msi-rtx-4060-ventus-p-1234.html` becomes `msi rtx 4060 ventus`.
    HrefSlug,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRule {
    pub selector: String,
    pub status: Availability,
}

/// Ordered marker rules; the first rule whose selector is present on the card wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityConfig {
    #[serde(default)]
    pub rules: Vec<AvailabilityRule>,
    #[serde(default = "default_fallback")]
    pub fallback: Availability,
}

fn default_fallback() -> Availability {
    Availability::Unavailable
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            fallback: default_fallback(),
        }
    }
}

impl SiteConfig {
    pub fn pagination_marker(&self) -> Option<&str> {
        self.selectors
            .pagination_marker
            .as_deref()
            .filter(|m| !m.is_empty())
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn validate_site_config(site: &SiteConfig) -> Result<(), ValidationError> {
    if !site.search_url_template.contains("{terms}") {
        return Err(invalid(
            "missing_terms_placeholder",
            "search_url_template must contain {terms}",
        ));
    }

    if site.selectors.card.trim().is_empty() || site.selectors.name.trim().is_empty() {
        return Err(invalid(
            "missing_selector",
            "card and name selectors must not be empty",
        ));
    }

    match &site.pagination {
        Pagination::Param { param_name } if param_name.trim().is_empty() => {
            return Err(invalid("empty_param_name", "pagination param_name must not be empty"));
        }
        Pagination::Param { .. } | Pagination::Link if site.pagination_marker().is_none() => {
            return Err(invalid(
                "missing_pagination_marker",
                "param and link pagination require selectors.pagination_marker",
            ));
        }
        _ => {}
    }

    for rule in &site.availability.rules {
        if rule.selector.trim().is_empty() {
            return Err(invalid("empty_availability_selector", "availability rule selector must not be empty"));
        }
    }

    Ok(())
}
