use super::*;
use price_scout::models::{Filter, MISSING_PRICE};
use price_scout::{AppError, CatalogScraper};

fn fixtures(pages: &[(&str, String)]) -> HtmlDriver {
    HtmlDriver::with_fixtures(pages.iter().map(|(url, html)| (url.to_string(), html.clone())))
}

#[tokio::test]
async fn test_param_pagination_stops_when_marker_disappears() -> anyhow::Result<()> {
    let site = test_site(
        "Param Shop",
        "https://param.test/search?q={terms}",
        Pagination::Param {
            param_name: "page".to_string(),
        },
    );
    let driver = fixtures(&[
        (
            "https://param.test/search?q=4060&page=1",
            page(&[card("MSI RTX 4060 Ventus", "330,66 €")], Some("#")),
        ),
        (
            "https://param.test/search?q=4060&page=2",
            page(&[card("Zotac RTX 4060 Twin", "284,59 €")], Some("#")),
        ),
        (
            "https://param.test/search?q=4060&page=3",
            page(&[card("Asus RTX 4060 Dual", "310,00 €")], None),
        ),
    ]);

    let mut records = Vec::new();
    let stats = CatalogScraper::new(fast_config())
        .scrape_into(&Filter::new(None, "4060"), &site, &driver, &mut records)
        .await?;

    assert_eq!(stats.pages, 3);
    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["MSI RTX 4060 Ventus", "Zotac RTX 4060 Twin", "Asus RTX 4060 Dual"]);
    Ok(())
}

#[tokio::test]
async fn test_link_pagination_follows_relative_hrefs() -> anyhow::Result<()> {
    let site = test_site("Link Shop", "https://link.test/list?q={terms}", Pagination::Link);
    let driver = fixtures(&[
        (
            "https://link.test/list?q=4060",
            page(&[card("MSI RTX 4060 Ventus", "330,66 €")], Some("/list?q=4060&p=2")),
        ),
        (
            "https://link.test/list?q=4060&p=2",
            page(&[card("Zotac RTX 4060 Twin", "284,59 €")], Some("list?q=4060&p=3")),
        ),
        (
            "https://link.test/list?q=4060&p=3",
            page(&[card("Asus RTX 4060 Dual", "310,00 €")], None),
        ),
    ]);

    let mut records = Vec::new();
    let stats = CatalogScraper::new(fast_config())
        .scrape_into(&Filter::new(None, "4060"), &site, &driver, &mut records)
        .await?;

    assert_eq!(stats.pages, 3);
    assert_eq!(records.len(), 3);
    assert_eq!(driver.current_url().as_deref(), Some("https://link.test/list?q=4060&p=3"));
    Ok(())
}

#[tokio::test]
async fn test_link_back_to_same_page_stops() -> anyhow::Result<()> {
    let site = test_site("Loop Shop", "https://loop.test/list?q={terms}", Pagination::Link);
    let driver = fixtures(&[(
        "https://loop.test/list?q=4060",
        page(&[card("MSI RTX 4060 Ventus", "330,66 €")], Some("?q=4060")),
    )]);

    let stats = CatalogScraper::new(fast_config())
        .scrape_into(&Filter::new(None, "4060"), &site, &driver, &mut Vec::new())
        .await?;
    assert_eq!(stats.pages, 1);
    Ok(())
}

#[tokio::test]
async fn test_link_cycle_between_two_pages_stops() -> anyhow::Result<()> {
    let site = test_site("Cycle Shop", "https://cycle.test/list?q={terms}", Pagination::Link);
    let driver = fixtures(&[
        (
            "https://cycle.test/list?q=4060",
            page(&[card("MSI RTX 4060 Ventus", "330,66 €")], Some("/list?q=4060&p=2")),
        ),
        (
            "https://cycle.test/list?q=4060&p=2",
            page(&[card("Zotac RTX 4060 Twin", "284,59 €")], Some("/list?q=4060")),
        ),
    ]);

    let mut records = Vec::new();
    let stats = CatalogScraper::new(fast_config())
        .scrape_into(&Filter::new(None, "4060"), &site, &driver, &mut records)
        .await?;

    assert_eq!(stats.pages, 2);
    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["MSI RTX 4060 Ventus", "Zotac RTX 4060 Twin"]);
    Ok(())
}

#[tokio::test]
async fn test_max_pages_caps_endless_marker() -> anyhow::Result<()> {
    let site = test_site(
        "Endless Shop",
        "https://endless.test/?q={terms}",
        Pagination::Param {
            param_name: "p".to_string(),
        },
    );
    let pages: Vec<(String, String)> = (1..=10)
        .map(|n| {
            (
                format!("https://endless.test/?q=4060&p={}", n),
                page(&[card(&format!("RTX 4060 #{}", n), "300 €")], Some("#")),
            )
        })
        .collect();
    let driver = HtmlDriver::with_fixtures(pages);

    let config = ScraperConfig {
        max_pages: 4,
        ..fast_config()
    };
    let mut records = Vec::new();
    let stats = CatalogScraper::new(config)
        .scrape_into(&Filter::new(None, "4060"), &site, &driver, &mut records)
        .await?;

    assert_eq!(stats.pages, 4);
    assert_eq!(records.len(), 4);
    assert_eq!(records[3].name, "RTX 4060 #4");
    Ok(())
}

#[tokio::test]
async fn test_empty_page_still_paginates() -> anyhow::Result<()> {
    let site = test_site(
        "Gap Shop",
        "https://gap.test/?q={terms}",
        Pagination::Param {
            param_name: "p".to_string(),
        },
    );
    let driver = fixtures(&[
        ("https://gap.test/?q=4060&p=1", page(&[], Some("#"))),
        (
            "https://gap.test/?q=4060&p=2",
            page(&[card("Zotac RTX 4060 Twin", "284,59 €")], None),
        ),
    ]);

    let config = ScraperConfig {
        wait_timeout_ms: 10,
        ..fast_config()
    };
    let records = CatalogScraper::new(config)
        .scrape(&Filter::new(None, "4060"), &site, &driver)
        .await?;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Zotac RTX 4060 Twin");
    Ok(())
}

#[tokio::test]
async fn test_sold_out_and_availability_markers() -> anyhow::Result<()> {
    let site = test_site("Stock Shop", "https://stock.test/?q={terms}", Pagination::None);
    let driver = fixtures(&[(
        "https://stock.test/?q=4060",
        page(
            &[
                card_with("MSI RTX 4060 Ventus", "330,66 €", r#"<span class="sold-out">Esaurito</span>"#),
                card_with("Zotac RTX 4060 Twin", "284,59 €", r#"<span class="ready-soon">In arrivo</span>"#),
                card("Asus RTX 4060 Dual", "310,00 €"),
            ],
            None,
        ),
    )]);

    let mut records = Vec::new();
    let stats = CatalogScraper::new(fast_config())
        .scrape_into(&Filter::new(None, "4060"), &site, &driver, &mut records)
        .await?;

    assert_eq!(stats.skipped, 1);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "Zotac RTX 4060 Twin");
    assert_eq!(records[0].availability, Availability::ReadySoon);
    assert_eq!(records[1].availability, Availability::Available);
    Ok(())
}

#[tokio::test]
async fn test_href_slug_names_and_missing_price() -> anyhow::Result<()> {
    let mut site = test_site("Slug Shop", "https://slug.test/?q={terms}", Pagination::None);
    site.selectors.name = "a.product".to_string();
    site.name_source = NameSource::HrefSlug;

    let html = page(
        &[
            r#"<li class="card"><a class="product" href="/msi-rtx-4060-ventus-p-101.html">MSI...</a><span class="price">330,66 €</span></li>"#.to_string(),
            r#"<li class="card"><a class="product" href="/zotac-rtx-4060-twin-p-102.html">Zotac...</a></li>"#.to_string(),
        ],
        None,
    );
    let driver = fixtures(&[("https://slug.test/?q=4060", html)]);

    let records = CatalogScraper::new(fast_config())
        .scrape(&Filter::new(None, "4060"), &site, &driver)
        .await?;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "msi rtx 4060 ventus");
    assert_eq!(records[0].price_value, 330.66);
    assert_eq!(records[1].name, "zotac rtx 4060 twin");
    assert_eq!(records[1].price, MISSING_PRICE);
    assert!(records[1].price_value.is_infinite());
    Ok(())
}

#[tokio::test]
async fn test_brand_and_model_filtering() -> anyhow::Result<()> {
    let site = test_site("Filter Shop", "https://filter.test/?q={terms}", Pagination::None);
    let driver = fixtures(&[(
        "https://filter.test/?q=msi%2B4060",
        page(
            &[
                card("MSI GeForce RTX 4060 Ventus", "330,66 €"),
                card("MSI GeForce RTX 4060 Ti Gaming", "450,00 €"),
                card("MSI GeForce RTX 14060 Concept", "999,00 €"),
                card("Zotac RTX 4060 Twin", "284,59 €"),
            ],
            None,
        ),
    )]);

    let records = CatalogScraper::new(fast_config())
        .scrape(&Filter::new(Some("MSI"), "4060"), &site, &driver)
        .await?;

    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["MSI GeForce RTX 4060 Ventus", "MSI GeForce RTX 4060 Ti Gaming"]);
    Ok(())
}

#[tokio::test]
async fn test_stale_reads_recover_across_pages() -> anyhow::Result<()> {
    let site = test_site("Stale Shop", "https://stale.test/?q={terms}", Pagination::None);
    let inner = fixtures(&[(
        "https://stale.test/?q=4060",
        page(
            &[card("MSI RTX 4060 Ventus", "330,66 €"), card("Zotac RTX 4060 Twin", "284,59 €")],
            None,
        ),
    )]);
    let driver = StaleInjector::new(inner, 2);

    let mut records = Vec::new();
    let stats = CatalogScraper::new(fast_config())
        .scrape_into(&Filter::new(None, "4060"), &site, &driver, &mut records)
        .await?;

    assert_eq!(records.len(), 2);
    assert_eq!(stats.stale_retries, 2);
    assert_eq!(stats.dropped, 0);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_first_page() {
    let site = test_site("Offline Shop", "https://offline.test/?q={terms}", Pagination::None);
    let driver = fixtures(&[]);

    let err = CatalogScraper::new(fast_config())
        .scrape(&Filter::new(None, "4060"), &site, &driver)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::SourceUnavailable { .. }));
    assert!(err.to_string().starts_with("Source unavailable: Offline Shop"));
}

#[tokio::test]
async fn test_unreachable_later_page_keeps_records() -> anyhow::Result<()> {
    let site = test_site(
        "Flaky Shop",
        "https://flaky.test/?q={terms}",
        Pagination::Param {
            param_name: "p".to_string(),
        },
    );
    let driver = fixtures(&[(
        "https://flaky.test/?q=4060&p=1",
        page(&[card("MSI RTX 4060 Ventus", "330,66 €")], Some("#")),
    )]);

    let mut records = Vec::new();
    let stats = CatalogScraper::new(fast_config())
        .scrape_into(&Filter::new(None, "4060"), &site, &driver, &mut records)
        .await?;

    assert_eq!(stats.pages, 2);
    assert_eq!(records.len(), 1);
    Ok(())
}
