mod common;

use std::time::Duration;

use common::{MemoryCache, MemoryConnector, fast_policy, memory_link};
use keystone::{
    cache::link::{CacheLink, SetMode},
    error::AppError,
};

async fn wait_for_failed_pings(cache: &MemoryCache, count: u32) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while cache.failed_pings() < count {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("liveness loop kept probing");
}

#[tokio::test]
async fn test_connect_fails_fast_when_store_unreachable() {
    let cache = MemoryCache::new();
    let connector = MemoryConnector::new(cache);
    connector.set_accept(false);

    let result = CacheLink::connect(connector.clone(), fast_policy(5)).await;

    assert!(matches!(result, Err(AppError::Connection(_))));
    assert_eq!(connector.connects(), 1, "no retry at startup");
}

#[tokio::test]
async fn test_connect_fails_fast_when_first_ping_fails() {
    let cache = MemoryCache::new();
    cache.plan_pings(&[false]);
    let connector = MemoryConnector::new(cache);

    let result = CacheLink::connect(connector.clone(), fast_policy(5)).await;

    assert!(matches!(result, Err(AppError::Connection(msg)) if msg.contains("ping refused")));
    assert_eq!(connector.connects(), 1);
}

#[tokio::test]
async fn test_connect_fails_fast_when_connect_hangs() {
    let cache = MemoryCache::new();
    let connector = MemoryConnector::new(cache);
    connector.set_stall(true);

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        CacheLink::connect(connector.clone(), fast_policy(5)),
    )
    .await
    .expect("startup gave up on the hung connect");

    assert!(matches!(result, Err(AppError::Connection(msg)) if msg.contains("timed out")));
}

#[tokio::test]
async fn test_hung_reconnects_count_toward_exhaustion() {
    let cache = MemoryCache::new();
    let connector = MemoryConnector::new(cache.clone());
    let link = CacheLink::connect(connector.clone(), fast_policy(3)).await.unwrap();

    connector.set_stall(true);
    cache.set_healthy(false);

    let failure = tokio::time::timeout(Duration::from_secs(3), link.closed())
        .await
        .expect("loop gives up despite hung reconnects");
    assert!(failure.ping.contains("ping refused"));
    assert!(failure.rebuild.contains("connect timed out"), "rebuild error: {}", failure.rebuild);
    assert_eq!(cache.failed_pings(), 3);
    assert!(matches!(link.get("k").await, Err(AppError::CacheExhausted { .. })));
}

#[tokio::test]
async fn test_basic_operations() {
    let (link, cache, _connector) = memory_link().await;

    assert!(link.set("k", "v", Duration::from_secs(60), SetMode::Always).await.unwrap());
    assert_eq!(link.get("k").await.unwrap().as_deref(), Some("v"));
    assert!(!link.set("k", "w", Duration::from_secs(60), SetMode::IfAbsent).await.unwrap());
    assert_eq!(cache.raw("k").as_deref(), Some("v"));

    assert!(link.delete("k").await.unwrap());
    assert!(!link.delete("k").await.unwrap());
    assert_eq!(link.get("k").await.unwrap(), None);

    assert_eq!(link.incr("n").await.unwrap(), 1);
    assert_eq!(link.incr("n").await.unwrap(), 2);
}

#[tokio::test]
async fn test_exhaustion_during_construction_carries_both_errors() {
    let cache = MemoryCache::new();
    // The startup ping passes, every later ping and reconnect fails.
    cache.plan_pings(&[true]);
    cache.set_healthy(false);
    let connector = MemoryConnector::new(cache.clone());
    connector.plan_connects(&[true]);
    connector.set_accept(false);

    let result = CacheLink::connect(connector.clone(), fast_policy(3)).await;

    match result {
        Err(AppError::CacheExhausted { ping, rebuild }) => {
            assert!(ping.contains("ping refused"), "ping error: {ping}");
            assert!(rebuild.contains("connection refused"), "rebuild error: {rebuild}");
        }
        Err(other) => panic!("expected exhaustion, got {other}"),
        Ok(_) => panic!("expected exhaustion, got a live link"),
    }
    assert_eq!(cache.failed_pings(), 3);
    assert_eq!(connector.connects(), 1 + 3);
}

#[tokio::test]
async fn test_failures_below_max_retries_recover() {
    let cache = MemoryCache::new();
    let connector = MemoryConnector::new(cache.clone());
    let link = CacheLink::connect(connector.clone(), fast_policy(5)).await.unwrap();

    cache.set_healthy(false);
    connector.set_accept(false);
    wait_for_failed_pings(&cache, 2).await;
    cache.set_healthy(true);
    connector.set_accept(true);

    tokio::time::sleep(Duration::from_millis(80)).await;

    assert!(link.failure().is_none());
    assert!(cache.failed_pings() < 5);
    assert!(link.set("k", "v", Duration::from_secs(60), SetMode::Always).await.unwrap());
    assert_eq!(link.get("k").await.unwrap().as_deref(), Some("v"));
}

#[tokio::test]
async fn test_retry_counter_resets_after_success() {
    let cache = MemoryCache::new();
    let connector = MemoryConnector::new(cache.clone());
    connector.set_accept(false);
    connector.plan_connects(&[true]);
    let link = CacheLink::connect(connector.clone(), fast_policy(3)).await.unwrap();

    // Two failures, one success, two failures: never three in a row.
    cache.plan_pings(&[false, false, true, false, false]);
    wait_for_failed_pings(&cache, 4).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    cache.set_healthy(true);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(link.failure().is_none());
    assert!(link.get("anything").await.is_ok());
}

#[tokio::test]
async fn test_rebuild_swaps_the_connection() {
    let first = MemoryCache::new();
    let connector = MemoryConnector::new(first.clone());
    let link = CacheLink::connect(connector.clone(), fast_policy(3)).await.unwrap();
    link.set("old", "1", Duration::from_secs(60), SetMode::Always).await.unwrap();

    let second = MemoryCache::new();
    connector.retarget(second.clone());
    first.set_healthy(false);
    wait_for_failed_pings(&first, 1).await;
    tokio::time::sleep(Duration::from_millis(5)).await;

    link.set("new", "2", Duration::from_secs(60), SetMode::Always).await.unwrap();
    assert!(second.contains("new"));
    assert!(!first.contains("new"));
    assert!(link.failure().is_none());
}

#[tokio::test]
async fn test_exhaustion_after_startup_fails_operations() {
    let cache = MemoryCache::new();
    let connector = MemoryConnector::new(cache.clone());
    let link = CacheLink::connect(connector.clone(), fast_policy(3)).await.unwrap();

    cache.set_healthy(false);
    connector.set_accept(false);

    let failure = tokio::time::timeout(Duration::from_secs(2), link.closed())
        .await
        .expect("loop gives up");
    assert!(failure.ping.contains("ping refused"));
    assert!(failure.rebuild.contains("connection refused"));
    assert_eq!(link.failure(), Some(failure));

    // Healing the store does not revive a link that gave up.
    cache.set_healthy(true);
    assert!(matches!(link.get("k").await, Err(AppError::CacheExhausted { .. })));
    assert!(matches!(
        link.set("k", "v", Duration::from_secs(1), SetMode::Always).await,
        Err(AppError::CacheExhausted { .. })
    ));
}
