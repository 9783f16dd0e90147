//! Rate limit handling against a live HTTP endpoint

use crate::support::{listing_page, test_config};
use nyaa_harvest::{HarvestError, Harvester, SearchOptions};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_rate_limited_page_is_retried() {
    let server = MockServer::start().await;

    // Mounted first, so it answers the first two requests
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("p", "1"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("p", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[5, 6], 1, 1)))
        .expect(1)
        .mount(&server)
        .await;

    let harvester = Harvester::new(test_config(&server, 1));
    harvester.initialize().await.expect("Failed to initialize");

    let cursor = harvester
        .search("demo", SearchOptions::default())
        .await
        .expect("Search should succeed after backing off");
    assert_eq!(cursor.data().count, 2);

    harvester.shutdown().await;
}

#[tokio::test]
async fn test_rate_limit_retries_are_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = test_config(&server, 1);
    config.retry.max_attempts = 3;
    let harvester = Harvester::new(config);
    harvester.initialize().await.expect("Failed to initialize");

    let result = harvester.search("demo", SearchOptions::default()).await;
    assert!(matches!(
        result,
        Err(HarvestError::RateLimitExhausted { attempts: 3, .. })
    ));

    harvester.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_interrupts_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let mut config = test_config(&server, 1);
    config.retry.max_attempts = 0;
    config.pool.cooldown_ms = 200;
    config.retry.max_backoff_ms = 10_000;
    let harvester = Arc::new(Harvester::new(config));
    harvester.initialize().await.expect("Failed to initialize");

    let searching = {
        let harvester = harvester.clone();
        tokio::spawn(async move { harvester.search("demo", SearchOptions::default()).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    harvester.shutdown().await;

    let result = tokio::time::timeout(Duration::from_secs(5), searching)
        .await
        .expect("Search did not stop after shutdown")
        .expect("Search task panicked");
    assert!(matches!(
        result,
        Err(HarvestError::Cancelled) | Err(HarvestError::ContextClosed { .. })
    ));
}
