//! Template cache coalescing and failure handling.

mod common;

use std::sync::Arc;
use std::time::Duration;

use collection_view_lib::error::FetchError;
use collection_view_lib::template::TemplateCache;
use collection_view_lib::template::TemplateDefinition;
use collection_view_lib::template::TemplateLookup;
use common::CountingFetcher;
use common::SharedFetcher;

fn cache_with(fetcher: CountingFetcher) -> (TemplateCache, Arc<CountingFetcher>) {
    let fetcher = Arc::new(fetcher);
    (TemplateCache::new(SharedFetcher(Arc::clone(&fetcher))), fetcher)
}

#[tokio::test]
async fn test_concurrent_requests_share_one_fetch() {
    let (cache, fetcher) = cache_with(
        CountingFetcher::new()
            .with_templates(&["T"])
            .with_delay(Duration::from_millis(20)),
    );

    let lookups = [cache.get("T"), cache.get("T"), cache.get("T")];
    assert!(lookups.iter().all(|l| matches!(l, TemplateLookup::Pending(_))));
    assert_eq!(cache.pending_count(), 1);

    let [a, b, c] = lookups;
    let (a, b, c) = tokio::join!(a.resolve(), b.resolve(), c.resolve());
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

    assert_eq!(fetcher.calls("T"), 1);
    assert!(Arc::ptr_eq(&a, &b) && Arc::ptr_eq(&b, &c));
    assert!(cache.contains("T"));
    assert_eq!(cache.pending_count(), 0);
}

#[tokio::test]
async fn test_cached_definition_is_ready() {
    let (cache, fetcher) = cache_with(CountingFetcher::new().with_templates(&["T"]));

    cache.get("T").resolve().await.unwrap();
    assert!(matches!(cache.get("T"), TemplateLookup::Ready(_)));
    assert_eq!(fetcher.calls("T"), 1);
}

#[tokio::test]
async fn test_different_names_fetch_independently() {
    let (cache, fetcher) = cache_with(CountingFetcher::new().with_templates(&["A", "B"]));

    let failures = cache.preload(["A", "B", "A"]).await;
    assert!(failures.is_empty());
    assert_eq!(fetcher.calls("A"), 1);
    assert_eq!(fetcher.calls("B"), 1);
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn test_failure_is_shared_and_not_cached() {
    let (cache, fetcher) = cache_with(
        CountingFetcher::new()
            .with_templates(&["T"])
            .with_delay(Duration::from_millis(10)),
    );
    fetcher.fail("T");

    let (a, b) = tokio::join!(cache.get("T").resolve(), cache.get("T").resolve());
    let (a, b) = (a.unwrap_err(), b.unwrap_err());
    assert!(matches!(a, FetchError::Network { .. }));
    assert_eq!(a, b);
    assert_eq!(fetcher.calls("T"), 1);
    assert!(!cache.contains("T"));
    assert_eq!(cache.pending_count(), 0);

    // A later request starts a new fetch.
    fetcher.recover("T");
    let definition = cache.get("T").resolve().await.unwrap();
    assert_eq!(definition.name, "T");
    assert_eq!(fetcher.calls("T"), 2);
}

#[tokio::test]
async fn test_preload_reports_failures() {
    let (cache, _) = cache_with(CountingFetcher::new().with_templates(&["A"]));

    let failures = cache.preload(["A", "Missing"]).await;
    assert_eq!(failures, vec![("Missing".to_string(), FetchError::NotFound("Missing".to_string()))]);
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let (cache, fetcher) = cache_with(CountingFetcher::new().with_templates(&["T"]));

    cache.get("T").resolve().await.unwrap();
    cache.invalidate();
    assert!(cache.is_empty());

    cache.get("T").resolve().await.unwrap();
    assert_eq!(fetcher.calls("T"), 2);
}

#[tokio::test]
async fn test_fetch_runs_after_lookup_is_dropped() {
    let (cache, fetcher) = cache_with(CountingFetcher::new().with_templates(&["T"]));

    drop(cache.get("T"));
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(fetcher.calls("T"), 1);
    assert_eq!(cache.pending_count(), 0);
    assert!(cache.contains("T"));
}

#[tokio::test]
async fn test_invalidate_keeps_in_flight_fetch() {
    let (cache, fetcher) = cache_with(
        CountingFetcher::new()
            .with_templates(&["T"])
            .with_delay(Duration::from_millis(20)),
    );

    let lookup = cache.get("T");
    cache.invalidate();
    assert_eq!(cache.pending_count(), 1);

    let definition = lookup.resolve().await.unwrap();
    assert_eq!(definition.name, "T");
    assert!(cache.contains("T"));
    assert!(matches!(cache.get("T"), TemplateLookup::Ready(_)));
    assert_eq!(fetcher.calls("T"), 1);
}

#[test]
fn test_blocking_lookup_stores_definition() {
    let (cache, fetcher) = cache_with(CountingFetcher::new().with_template(
        TemplateDefinition::new("Sized").with_size(120.0, 40.0),
    ));

    let definition = cache.get_blocking("Sized").unwrap();
    assert_eq!(definition.width, Some(120.0));
    assert!(cache.contains("Sized"));

    cache.get_blocking("Sized").unwrap();
    assert_eq!(fetcher.calls("Sized"), 1);
}

#[test]
fn test_inserted_definition_skips_fetcher() {
    let (cache, fetcher) = cache_with(CountingFetcher::new());

    cache.insert(TemplateDefinition::new("Local"));
    assert!(matches!(cache.get("Local"), TemplateLookup::Ready(_)));
    assert_eq!(fetcher.calls("Local"), 0);
}
