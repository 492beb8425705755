use crate::cache::CacheService;

#[test]
fn test_cache_key_format() {
    let id = "c0a80101-0000-4000-8000-000000000001";
    assert_eq!(CacheService::key("report", id), format!("report:{}", id));
    assert_eq!(CacheService::key("task", "abc"), "task:abc");
}

#[tokio::test]
async fn test_disabled_cache_is_a_noop() {
    let cache = CacheService::disabled();
    assert!(!cache.is_available());

    cache.set("key", &"value".to_string(), 30).await;
    let value: Option<String> = cache.get("key").await;
    assert!(value.is_none());

    // Delete on a disabled cache must not panic either.
    cache.delete("key").await;
}

#[tokio::test]
async fn test_connect_without_url_disables_cache() {
    let cache = CacheService::connect(None).await;
    assert!(!cache.is_available());
}
