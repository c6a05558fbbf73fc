use super::*;
use price_scout::models::Filter;
use price_scout::{AppError, CatalogScraper};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_factory() -> HtmlDriverFactory {
    HtmlDriverFactory::new(Some("price-scout-test/1.0"), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_http_driver_scrapes_served_pages() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "msi+4060"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(
            &[card("MSI RTX 4060 Ventus", "330,66 €"), card("MSI RTX 4070", "599,00 €")],
            Some("#"),
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(
            &[card("MSI RTX 4060 Gaming X", "349,90 €")],
            None,
        )))
        .mount(&server)
        .await;

    let site = test_site(
        "Mock Shop",
        &format!("{}/search?q={{terms}}", server.uri()),
        Pagination::Param {
            param_name: "page".to_string(),
        },
    );
    let driver = http_factory().open(&site).await?;
    let records = CatalogScraper::new(fast_config())
        .scrape(&Filter::new(Some("msi"), "4060"), &site, driver.as_ref())
        .await?;
    driver.close().await?;

    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["MSI RTX 4060 Ventus", "MSI RTX 4060 Gaming X"]);
    Ok(())
}

#[tokio::test]
async fn test_http_error_status_makes_source_unavailable() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let site = test_site("Down Shop", &format!("{}/?q={{terms}}", server.uri()), Pagination::None);
    let driver = http_factory().open(&site).await?;
    let err = CatalogScraper::new(fast_config())
        .scrape(&Filter::new(None, "4060"), &site, driver.as_ref())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::SourceUnavailable { ref source_name, .. } if source_name == "Down Shop"));
    // One attempt plus one navigation retry.
    assert_eq!(server.received_requests().await.map(|r| r.len()), Some(2));
    Ok(())
}

#[tokio::test]
async fn test_http_driver_sends_configured_user_agent() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", "price-scout-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(&[card("Zotac RTX 4060", "284,59 €")], None)))
        .expect(1)
        .mount(&server)
        .await;

    let site = test_site("Agent Shop", &format!("{}/?q={{terms}}", server.uri()), Pagination::None);
    let driver = http_factory().open(&site).await?;
    let records = CatalogScraper::new(fast_config())
        .scrape(&Filter::new(None, "4060"), &site, driver.as_ref())
        .await?;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].price_value, 284.59);
    Ok(())
}
