//! Scheduling across concurrent aggregations

use crate::support::{wait_until, GatedFactory};
use nyaa_harvest::{Config, HarvestError, Harvester, SearchOptions};
use std::sync::Arc;

fn gated_config(concurrency: u32) -> Config {
    let mut config = Config::default();
    config.pool.concurrency = concurrency;
    config.pool.cooldown_ms = 0;
    config
}

#[tokio::test]
async fn test_third_page_waits_for_a_free_worker() {
    let factory = GatedFactory::new();
    let harvester = Arc::new(Harvester::new(gated_config(2)));
    harvester
        .initialize_with(factory.clone())
        .await
        .expect("Failed to initialize");
    let pool = harvester.pool().expect("Harvester not initialized").clone();

    let first = {
        let harvester = harvester.clone();
        tokio::spawn(async move {
            harvester
                .search("demo", SearchOptions::default().with_pages(1, 2))
                .await
        })
    };
    wait_until("both workers are reserved", || pool.reserved_count() == 2).await;

    let second = {
        let harvester = harvester.clone();
        tokio::spawn(async move {
            harvester
                .search("demo", SearchOptions::default().only_page(3))
                .await
        })
    };
    wait_until("page 3 is queued", || pool.queued_len() == 1).await;
    assert_eq!(pool.reserved_count(), 2);

    // One finished page hands its worker straight to the queued request
    factory.open(1);
    wait_until("the queue drains", || pool.queued_len() == 0).await;
    assert_eq!(pool.reserved_count(), 2);

    factory.open(2);
    let first = first.await.expect("Task panicked").expect("Pages 1-2 failed");
    let second = second.await.expect("Task panicked").expect("Page 3 failed");

    assert_eq!(first.data().metadata.current, 2);
    assert_eq!(second.data().metadata.current, 3);

    wait_until("all workers are listening", || pool.listening_count() == 2).await;
    harvester.shutdown().await;
}

#[tokio::test]
async fn test_requests_after_shutdown_are_rejected() {
    let factory = GatedFactory::new();
    let harvester = Harvester::new(gated_config(1));
    harvester
        .initialize_with(factory)
        .await
        .expect("Failed to initialize");

    harvester.shutdown().await;

    assert!(matches!(
        harvester.request_worker().await,
        Err(HarvestError::PoolClosed)
    ));
    assert!(harvester.pool().expect("Harvester not initialized").is_closed());
}
