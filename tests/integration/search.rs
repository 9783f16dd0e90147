//! End-to-end searches over HTTP workers

use crate::support::{detail_page, harvester_for, listing_page, wait_until};
use nyaa_harvest::{ConfigError, DetailOptions, FilterParams, HarvestError, SearchOptions};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_listing(server: &MockServer, page: u32, ids: &[u64], total: u32, delay_ms: u64) {
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("q", "demo"))
        .and(query_param("p", page.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(ids, page, total))
                .insert_header("content-type", "text/html")
                .set_delay(Duration::from_millis(delay_ms)),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_pages_merge_in_page_order() {
    let server = MockServer::start().await;

    // Page 1 answers last; its records must still come first
    mount_listing(&server, 1, &[101, 102], 3, 150).await;
    mount_listing(&server, 2, &[201], 3, 50).await;
    mount_listing(&server, 3, &[301, 302], 3, 0).await;

    let harvester = harvester_for(&server, 3).await;
    let cursor = harvester
        .search("demo", SearchOptions::default().with_page_list(vec![3, 1, 2]))
        .await
        .expect("Search failed");

    let data = cursor.data();
    let ids: Vec<u64> = data.records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![101, 102, 201, 301, 302]);
    assert_eq!(data.count, 5);
    assert_eq!(data.metadata.current, 3);
    assert_eq!(data.metadata.total, 3);
    assert!(!data.metadata.has_next_page);

    let base = server.uri();
    assert_eq!(data.records[0].links.page, format!("{}/view/101", base));
    assert_eq!(data.records[0].links.torrent, format!("{}/download/101.torrent", base));

    harvester.shutdown().await;
}

#[tokio::test]
async fn test_details_loaded_for_every_record() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &[7, 8], 1, 0).await;

    for (id, submitter) in [(7, "alice"), (8, "bob")] {
        Mock::given(method("GET"))
            .and(path(format!("/view/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(submitter)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let harvester = harvester_for(&server, 2).await;
    let options = SearchOptions::default().with_details(Some(DetailOptions {
        submitter: true,
        ..DetailOptions::none()
    }));
    let cursor = harvester.search("demo", options).await.expect("Search failed");

    let data = cursor.data();
    assert_eq!(data.metadata.current, 1);
    assert!(!data.has_next_page());

    let submitters: Vec<String> = data
        .records
        .iter()
        .map(|record| {
            let details = record.details.as_ref().expect("Details not loaded");
            assert!(details.files.is_none());
            details.submitter.as_ref().expect("Missing submitter").name.clone()
        })
        .collect();
    assert_eq!(submitters, vec!["alice", "bob"]);

    harvester.shutdown().await;
}

#[tokio::test]
async fn test_failing_page_fails_whole_search() {
    let server = MockServer::start().await;
    // Page 1 may be dropped mid-flight once page 2 fails
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("p", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[1], 1, 2)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("p", "2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let harvester = harvester_for(&server, 2).await;
    let result = harvester
        .search("demo", SearchOptions::default().with_pages(1, 2))
        .await;

    assert!(matches!(
        result,
        Err(HarvestError::Status { status: 404, .. })
    ));

    // Every reservation made by the failed search is returned
    let pool = harvester.pool().expect("Harvester not initialized");
    wait_until("all workers are listening", || pool.listening_count() == 2).await;
    assert_eq!(pool.reserved_count(), 0);

    harvester.shutdown().await;
}

#[tokio::test]
async fn test_invalid_category_is_rejected_before_fetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let harvester = harvester_for(&server, 1).await;
    let options = SearchOptions::default().with_filter(FilterParams::new(
        Some("not.a.category".to_string()),
        Default::default(),
    ));

    let result = harvester.search("demo", options).await;
    assert!(matches!(
        result,
        Err(HarvestError::Config(ConfigError::InvalidCategory(_)))
    ));

    harvester.shutdown().await;
}

#[tokio::test]
async fn test_details_by_identifier() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/view/42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("carol")))
        .expect(2)
        .mount(&server)
        .await;

    let harvester = harvester_for(&server, 1).await;
    let options = Some(DetailOptions {
        submitter: true,
        ..DetailOptions::none()
    });

    for identifier in ["42".to_string(), format!("{}/view/42", server.uri())] {
        let detail = harvester
            .details(&identifier, options)
            .await
            .expect("Detail lookup failed");
        let submitter = detail.submitter.expect("Missing submitter");
        assert_eq!(submitter.name, "carol");
        assert_eq!(submitter.url, format!("{}/user/carol", server.uri()));
    }

    assert!(matches!(
        harvester.details("latest", options).await,
        Err(HarvestError::InvalidIdentifier(_))
    ));

    harvester.shutdown().await;
}
