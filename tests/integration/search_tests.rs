use super::*;
use std::sync::Arc;
use price_scout::models::Filter;
use price_scout::{CatalogScraper, PriceSearch, SourceStatus};

fn two_shops() -> (Vec<SiteConfig>, Vec<(String, String)>) {
    let sites = vec![
        test_site("BPM-Power", "https://bpm.test/ricerca?k={terms}", Pagination::None),
        test_site(
            "EsseShop",
            "https://esse.test/?s={terms}",
            Pagination::Param {
                param_name: "page".to_string(),
            },
        ),
    ];
    let pages = vec![
        (
            "https://bpm.test/ricerca?k=4060".to_string(),
            page(
                &[card("MSI RTX 4060 Ventus", "330.66 €"), card("MSI RTX 4070", "599.00 €")],
                None,
            ),
        ),
        (
            "https://esse.test/?s=4060&page=1".to_string(),
            page(&[card("Gigabyte RTX 4060 Eagle", "301,90 €")], Some("#")),
        ),
        (
            "https://esse.test/?s=4060&page=2".to_string(),
            page(&[card("Zotac RTX 4060 Twin", "284,59 €")], None),
        ),
    ];
    (sites, pages)
}

#[tokio::test]
async fn test_cheapest_across_two_sources() {
    let (sites, pages) = two_shops();
    let search = PriceSearch::new(
        CatalogScraper::new(fast_config()),
        Arc::new(fixture_factory(pages)),
        sites,
        Duration::from_secs(10),
    );

    let report = search.run(&Filter::new(None, "4060"), 1).await;

    assert_eq!(report.ranked.len(), 1);
    assert_eq!(report.ranked[0].name, "Zotac RTX 4060 Twin");
    assert_eq!(report.ranked[0].source, "EsseShop");
    assert_eq!(report.ranked[0].price_value, 284.59);
    assert!(report.sources.iter().all(|s| s.status == SourceStatus::Completed));
    assert_eq!(report.sources[0].records_found, 1);
    assert_eq!(report.sources[1].records_found, 2);
}

#[tokio::test]
async fn test_ranking_orders_all_sources() {
    let (sites, pages) = two_shops();
    let search = PriceSearch::new(
        CatalogScraper::new(fast_config()),
        Arc::new(fixture_factory(pages)),
        sites,
        Duration::from_secs(10),
    );

    let report = search.run(&Filter::new(None, "4060"), 5).await;

    let prices: Vec<f64> = report.ranked.iter().map(|r| r.price_value).collect();
    assert_eq!(prices, vec![284.59, 301.90, 330.66]);
    let summary = report.summary.expect("priced records give a summary");
    assert_eq!(summary.priced_count, 3);
    assert_eq!(summary.most_expensive.source, "BPM-Power");
}

#[tokio::test]
async fn test_timed_out_source_keeps_partial_records() {
    let (sites, pages) = two_shops();
    let factory = Arc::new(
        ScriptedFactory::new(pages).script("EsseShop", SiteScript::Stall("https://esse.test/?s=4060&page=2".to_string())),
    );
    let search = PriceSearch::new(
        CatalogScraper::new(fast_config()),
        factory.clone(),
        sites,
        Duration::from_millis(300),
    );

    let report = search.run(&Filter::new(None, "4060"), 5).await;

    let esse = &report.sources[1];
    assert_eq!(esse.status, SourceStatus::TimedOut);
    assert_eq!(esse.records_found, 1);
    assert!(esse.stats.is_none());

    let names: Vec<_> = report.ranked.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Gigabyte RTX 4060 Eagle", "MSI RTX 4060 Ventus"]);
    assert_eq!(factory.closed_count(), 2);
}

#[tokio::test]
async fn test_unavailable_source_does_not_block_ranking() {
    let (sites, pages) = two_shops();
    let factory = Arc::new(
        ScriptedFactory::new(pages)
            .script("BPM-Power", SiteScript::Fixtures)
            .script("EsseShop", SiteScript::FailLaunch("chrome missing".to_string())),
    );
    let search = PriceSearch::new(
        CatalogScraper::new(fast_config()),
        factory.clone(),
        sites,
        Duration::from_secs(10),
    );

    let report = search.run(&Filter::new(None, "4060"), 5).await;

    assert_eq!(
        report.sources[1].status,
        SourceStatus::Unavailable {
            reason: "failed to launch browser: chrome missing".to_string()
        }
    );
    assert_eq!(report.ranked.len(), 1);
    assert_eq!(report.ranked[0].source, "BPM-Power");
    assert_eq!(factory.closed_count(), 1);
}

#[tokio::test]
async fn test_no_matches_anywhere() {
    let (sites, pages) = two_shops();
    let search = PriceSearch::new(
        CatalogScraper::new(fast_config()),
        Arc::new(fixture_factory(pages)),
        sites,
        Duration::from_secs(10),
    );

    // Neither page is keyed for this search phrase, so both first pages fail.
    let report = search.run(&Filter::new(None, "b580"), 5).await;

    assert!(report.is_empty());
    assert!(report.summary.is_none());
    assert!(
        report
            .sources
            .iter()
            .all(|s| matches!(s.status, SourceStatus::Unavailable { .. }))
    );
}

#[tokio::test]
async fn test_report_serializes_to_json() -> anyhow::Result<()> {
    let (sites, pages) = two_shops();
    let search = PriceSearch::new(
        CatalogScraper::new(fast_config()),
        Arc::new(fixture_factory(pages)),
        sites,
        Duration::from_secs(10),
    );

    let report = search.run(&Filter::new(None, "4060"), 2).await;
    let json: serde_json::Value = serde_json::to_value(&report)?;

    assert_eq!(json["ranked"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["sources"][0]["status"], "completed");
    assert_eq!(json["filter"]["model"], "4060");
    assert!(json["sources"][0].get("records").is_none());
    Ok(())
}
