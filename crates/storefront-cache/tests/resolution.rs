//! Backend resolution: no-remote default, fallback on failure, single-flight.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{FakeRemote, LevelCounter, SpyFactory, in_process_cache, remote_cache};
use storefront_cache::{
    BackendMode, CacheSettings, CatalogCache, NoopMetrics, ProductListPayload, ProductSummary,
};

fn public_listing() -> ProductListPayload {
    ProductListPayload::new(vec![ProductSummary::new("p1")])
}

#[tokio::test]
async fn no_remote_configured_never_creates_a_client() {
    let (cache, factory) = in_process_cache();

    cache
        .set_product_list("public", &public_listing())
        .await
        .unwrap();
    let cached = cache.get_product_list("public").await;

    assert_eq!(cached, Some(public_listing()));
    assert_eq!(factory.creates(), 0);
    assert_eq!(FakeRemote::count(&factory.remote.connects), 0);
    assert_eq!(cache.backend_mode(), BackendMode::InProcess);
}

#[tokio::test]
async fn construction_does_not_resolve() {
    let (cache, factory) = remote_cache(FakeRemote::new());

    assert_eq!(cache.backend_mode(), BackendMode::Unresolved);
    assert_eq!(factory.creates(), 0);
}

#[tokio::test]
async fn refused_connect_falls_back_with_one_error_log() {
    let logs = LevelCounter::default();
    let _guard = logs.install();

    let remote = FakeRemote::refusing();
    let (cache, factory) = remote_cache(remote.clone());

    cache
        .set_product_list("public", &public_listing())
        .await
        .unwrap();
    let cached = cache.get_product_list("public").await;

    assert_eq!(cached, Some(public_listing()));
    assert_eq!(cache.backend_mode(), BackendMode::InProcess);
    assert_eq!(logs.errors(), 1);
    assert_eq!(factory.creates(), 1);
    assert_eq!(FakeRemote::count(&remote.connects), 1);
    // The half-open client is released.
    assert_eq!(FakeRemote::count(&remote.disconnects), 1);
    assert_eq!(FakeRemote::count(&remote.sets), 0);
}

#[tokio::test]
async fn fallback_is_permanent_for_the_instance() {
    let logs = LevelCounter::default();
    let _guard = logs.install();

    let remote = FakeRemote::refusing();
    let (cache, factory) = remote_cache(remote.clone());

    for round in 0..5 {
        let scope = format!("page-{round}");
        cache
            .set_product_list(&scope, &public_listing())
            .await
            .unwrap();
        assert!(cache.get_product_list(&scope).await.is_some());
        cache.invalidate_category_trees().await;
    }

    // The store comes back, but this instance does not look again.
    remote.refuse_connect.store(false, Ordering::SeqCst);
    assert!(cache.get_product_list("page-0").await.is_some());

    assert_eq!(factory.creates(), 1);
    assert_eq!(FakeRemote::count(&remote.connects), 1);
    assert_eq!(logs.errors(), 1);
    assert_eq!(cache.backend_mode(), BackendMode::InProcess);
}

#[tokio::test]
async fn client_creation_failure_falls_back() {
    let logs = LevelCounter::default();
    let _guard = logs.install();

    let factory = SpyFactory::failing();
    let cache = CatalogCache::builder(CacheSettings::with_remote("not a url"))
        .remote_factory(factory.clone())
        .metrics(Arc::new(NoopMetrics))
        .build();

    assert_eq!(cache.resolve().await, BackendMode::InProcess);
    assert_eq!(factory.creates(), 1);
    assert_eq!(FakeRemote::count(&factory.remote.connects), 0);
    assert_eq!(logs.errors(), 1);

    cache
        .set_product_list("public", &public_listing())
        .await
        .unwrap();
    assert_eq!(
        cache.get_product_list("public").await,
        Some(public_listing())
    );
}

#[tokio::test(start_paused = true)]
async fn hung_connect_times_out_into_fallback() {
    let remote = FakeRemote::new();
    // Longer than the default 2s operation bound.
    remote.connect_delay_ms.store(60_000, Ordering::SeqCst);
    let (cache, _factory) = remote_cache(remote.clone());

    assert_eq!(cache.resolve().await, BackendMode::InProcess);
    assert_eq!(FakeRemote::count(&remote.connects), 1);
}

#[tokio::test]
async fn reachable_remote_is_used() {
    let remote = FakeRemote::new();
    let (cache, factory) = remote_cache(remote.clone());

    assert_eq!(cache.resolve().await, BackendMode::Remote);
    cache
        .set_product_list("public", &public_listing())
        .await
        .unwrap();

    assert!(remote.contains("product-list:public"));
    assert_eq!(
        cache.get_product_list("public").await,
        Some(public_listing())
    );
    assert_eq!(factory.creates(), 1);
    assert_eq!(FakeRemote::count(&remote.connects), 1);
    assert_eq!(cache.stats().local_entries, None);
}

#[tokio::test(start_paused = true)]
async fn concurrent_first_calls_share_one_resolution() {
    let remote = FakeRemote::new();
    remote.connect_delay_ms.store(50, Ordering::SeqCst);
    let (cache, factory) = remote_cache(remote.clone());
    let cache = Arc::new(cache);

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..16 {
        let cache = Arc::clone(&cache);
        tasks.spawn(async move { cache.get_product_list(&format!("scope-{i}")).await });
    }
    while let Some(result) = tasks.join_next().await {
        assert!(result.unwrap().is_none());
    }

    assert_eq!(factory.creates(), 1);
    assert_eq!(FakeRemote::count(&remote.connects), 1);
    assert_eq!(FakeRemote::count(&remote.gets), 16);
    assert_eq!(cache.backend_mode(), BackendMode::Remote);
}

#[tokio::test(start_paused = true)]
async fn concurrent_first_calls_fall_back_together() {
    let logs = LevelCounter::default();
    let _guard = logs.install();

    let remote = FakeRemote::refusing();
    remote.connect_delay_ms.store(50, Ordering::SeqCst);
    let (cache, factory) = remote_cache(remote.clone());

    let (a, b, c) = tokio::join!(
        cache.get_category_tree("en"),
        cache.get_popular_products("homepage"),
        cache.invalidate_product_lists(),
    );

    assert!(a.is_none());
    assert!(b.is_none());
    assert_eq!(c, 0);
    assert_eq!(factory.creates(), 1);
    assert_eq!(FakeRemote::count(&remote.connects), 1);
    assert_eq!(logs.errors(), 1);
}
