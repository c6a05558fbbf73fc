use regex::Regex;
use std::sync::OnceLock;
use url::form_urlencoded;

use crate::models::{Filter, Pagination, SiteConfig};
use crate::utils::error::{AppError, Result};

/// Delimiter between brand and model in the raw search phrase.
pub const TERM_DELIMITER: &str = "+";

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid"))
}

/// Raw search phrase: non-empty brand and model joined with [`TERM_DELIMITER`].
pub fn search_phrase(filter: &Filter) -> String {
    [filter.brand.as_deref(), Some(filter.model.as_str())]
        .into_iter()
        .flatten()
        .filter(|term| !term.is_empty())
        .collect::<Vec<_>>()
        .join(TERM_DELIMITER)
}

/// Query-string encoding of `phrase`: `+` becomes `%2B`, space becomes `+`,
/// non-ASCII is UTF-8 percent-escaped.
pub fn encode_terms(phrase: &str) -> String {
    form_urlencoded::byte_serialize(phrase.as_bytes()).collect()
}

/// Builds the catalog URL for `filter` on `site`.
///
/// In param pagination mode a `page` index appends `param_name=page`. Every
/// `{placeholder}` in the template must be resolved by `{terms}` or an
/// `extra_params` entry.
pub fn build_url(filter: &Filter, site: &SiteConfig, page: Option<u32>) -> Result<String> {
    let terms = encode_terms(&search_phrase(filter));

    let mut unresolved = None;
    let url = placeholder_regex()
        .replace_all(&site.search_url_template, |caps: &regex::Captures| {
            let key = &caps[1];
            if key == "terms" {
                terms.clone()
            } else if let Some(value) = site.extra_params.get(key) {
                value.clone()
            } else {
                unresolved.get_or_insert_with(|| key.to_string());
                caps[0].to_string()
            }
        })
        .into_owned();

    if let Some(placeholder) = unresolved {
        return Err(AppError::UnresolvedPlaceholder {
            site: site.name.clone(),
            placeholder,
        });
    }

    match (&site.pagination, page) {
        (Pagination::Param { param_name }, Some(page)) => {
            let sep = if url.contains('?') { '&' } else { '?' };
            Ok(format!("{url}{sep}{param_name}={page}"))
        }
        _ => Ok(url),
    }
}
