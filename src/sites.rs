//! Built-in catalog sources, used when the configuration lists none.

use std::collections::HashMap;

use crate::models::{
    Availability, AvailabilityConfig, AvailabilityRule, NameSource, Pagination, Selectors, SiteConfig,
};

pub fn builtin() -> Vec<SiteConfig> {
    vec![bpm_power(), esse_shop()]
}

pub fn bpm_power() -> SiteConfig {
    SiteConfig {
        name: "BPM-Power".to_string(),
        search_url_template: "https://www.bpm-power.com/it/ricerca?k={terms}".to_string(),
        extra_params: HashMap::new(),
        pagination: Pagination::Param {
            param_name: "page".to_string(),
        },
        selectors: Selectors {
            card: "#divGridProducts .bordoCat".to_string(),
            name: "h4.nomeprod_category".to_string(),
            price: "p.prezzoCat".to_string(),
            sold_out: Some("span.dispoNo".to_string()),
            pagination_marker: Some("ul.pagination li.page-item".to_string()),
        },
        name_source: NameSource::Text,
        availability: AvailabilityConfig {
            rules: vec![
                AvailabilityRule {
                    selector: "span.dispoSi".to_string(),
                    status: Availability::Available,
                },
                AvailabilityRule {
                    selector: "span.dispoUltimi".to_string(),
                    status: Availability::Available,
                },
            ],
            fallback: Availability::Unavailable,
        },
    }
}

pub fn esse_shop() -> SiteConfig {
    let mut extra_params = HashMap::new();
    // Category facet, already percent-encoded (trailing space is part of the facet value).
    extra_params.insert("cat".to_string(), "Schede%20video%20".to_string());

    SiteConfig {
        name: "EsseShop".to_string(),
        search_url_template: "https://www.esseshop.it/?s={terms}&feat[Categoria][0]={cat}".to_string(),
        extra_params,
        pagination: Pagination::Param {
            param_name: "page".to_string(),
        },
        selectors: Selectors {
            card: "#sniperfast_results_wrapper div.sniperfast_product".to_string(),
            name: "div.sniperfast_prod_name".to_string(),
            price: "div.sniperfast_prod_price".to_string(),
            sold_out: Some("span.label.label-arriving".to_string()),
            pagination_marker: Some("a.next_page".to_string()),
        },
        name_source: NameSource::Text,
        availability: AvailabilityConfig {
            rules: vec![AvailabilityRule {
                selector: "span.label.label-ready".to_string(),
                status: Availability::ReadySoon,
            }],
            fallback: Availability::Available,
        },
    }
}
