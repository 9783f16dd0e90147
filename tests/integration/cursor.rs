//! Continuing a search page by page

use crate::support::{detail_page, harvester_for, listing_page};
use nyaa_harvest::{DetailOptions, HarvestError, SearchOptions};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Three pages: [1, 2], [3], [4]
async fn three_pages(server: &MockServer) {
    let pages: [(u32, &[u64]); 3] = [(1, &[1, 2]), (2, &[3]), (3, &[4])];
    for (page, ids) in pages {
        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("p", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(ids, page, 3)))
            .expect(1)
            .mount(server)
            .await;
    }
}

fn ids(records: &[nyaa_harvest::TorrentRecord]) -> Vec<u64> {
    records.iter().map(|r| r.id).collect()
}

#[tokio::test]
async fn test_add_next_page_until_exhausted() {
    let server = MockServer::start().await;
    three_pages(&server).await;
    let harvester = harvester_for(&server, 2).await;

    let mut cursor = harvester
        .search("demo", SearchOptions::default())
        .await
        .expect("Search failed");
    assert!(cursor.has_next_page());

    cursor.add_next_page(1).await.expect("Page 2 failed");
    assert_eq!(ids(&cursor.data().records), vec![1, 2, 3]);
    assert_eq!(cursor.data().metadata.current, 2);

    cursor.add_next_page(1).await.expect("Page 3 failed");
    assert_eq!(ids(&cursor.data().records), vec![1, 2, 3, 4]);
    assert_eq!(cursor.data().count, 4);
    assert!(!cursor.has_next_page());

    // Past the last page: no request, nothing changes
    cursor.add_next_page(1).await.expect("No-op should succeed");
    assert_eq!(cursor.data().count, 4);

    let err = cursor.get_next_page(1).await.unwrap_err();
    assert!(err.is_no_further_page());
    assert!(matches!(err, HarvestError::NoFurtherPage));

    harvester.shutdown().await;
}

#[tokio::test]
async fn test_get_next_page_leaves_cursor_untouched() {
    let server = MockServer::start().await;
    three_pages(&server).await;
    let harvester = harvester_for(&server, 2).await;

    let cursor = harvester
        .search("demo", SearchOptions::default())
        .await
        .expect("Search failed");

    let following = cursor.get_next_page(2).await.expect("Continuation failed");
    assert_eq!(ids(&following.records), vec![3, 4]);
    assert_eq!(following.metadata.current, 3);
    assert!(!following.has_next_page());

    assert_eq!(ids(&cursor.data().records), vec![1, 2]);
    assert_eq!(cursor.data().metadata.current, 1);

    harvester.shutdown().await;
}

/// Pages 1 and 2 with one detail page per record
async fn two_pages_with_details(server: &MockServer) {
    let pages: [(u32, &[u64]); 2] = [(1, &[11, 12]), (2, &[21])];
    for (page, ids) in pages {
        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("p", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(ids, page, 2)))
            .mount(server)
            .await;
        for id in ids {
            Mock::given(method("GET"))
                .and(path(format!("/view/{}", id)))
                .respond_with(
                    ResponseTemplate::new(200).set_body_string(detail_page(&format!("user{}", id))),
                )
                .expect(1)
                .mount(server)
                .await;
        }
    }
}

fn submitter_options() -> SearchOptions {
    SearchOptions::default().with_details(Some(DetailOptions {
        submitter: true,
        ..DetailOptions::none()
    }))
}

fn submitters(records: &[nyaa_harvest::TorrentRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            record
                .details
                .as_ref()
                .and_then(|details| details.submitter.as_ref())
                .map(|submitter| submitter.name.clone())
                .expect("Details not loaded")
        })
        .collect()
}

#[tokio::test]
async fn test_add_next_page_carries_detail_mask() {
    let server = MockServer::start().await;
    two_pages_with_details(&server).await;
    let harvester = harvester_for(&server, 2).await;

    let mut cursor = harvester
        .search("demo", submitter_options())
        .await
        .expect("Search failed");
    assert_eq!(submitters(&cursor.data().records), vec!["user11", "user12"]);

    cursor.add_next_page(1).await.expect("Page 2 failed");

    // Page 1 records keep their details; each detail page is requested once
    assert_eq!(ids(&cursor.data().records), vec![11, 12, 21]);
    assert_eq!(
        submitters(&cursor.data().records),
        vec!["user11", "user12", "user21"]
    );

    harvester.shutdown().await;
    server.verify().await;
}

#[tokio::test]
async fn test_get_next_page_loads_details_for_new_page_only() {
    let server = MockServer::start().await;
    two_pages_with_details(&server).await;
    let harvester = harvester_for(&server, 2).await;

    let cursor = harvester
        .search("demo", submitter_options())
        .await
        .expect("Search failed");
    let following = cursor.get_next_page(1).await.expect("Continuation failed");

    assert_eq!(ids(&following.records), vec![21]);
    assert_eq!(submitters(&following.records), vec!["user21"]);
    assert_eq!(submitters(&cursor.data().records), vec!["user11", "user12"]);

    harvester.shutdown().await;
    server.verify().await;
}
