//! Integration tests for the Redis session database against the in-memory
//! key-value service.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use sessiondb_core::{Clock, Database, Expiry, KeyValueService, RemoteStore, SessionError, SyncPayload};
use sessiondb_redis::RedisDatabase;
use sessiondb_testing::{Call, ManualClock, MemoryService};
use std::sync::Arc;
use std::time::Duration;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 9, 30, 0).unwrap()
}

fn database() -> (RedisDatabase<MemoryService>, MemoryService, ManualClock) {
    let service = MemoryService::new();
    let clock = ManualClock::new(start());
    let db = RedisDatabase::with_service(service.clone()).with_clock(clock.clone());
    (db, service, clock)
}

fn store_with(key: &str, value: serde_json::Value) -> RemoteStore {
    let mut store = RemoteStore::new();
    store.set(key, value).unwrap();
    store
}

// =============================================================================
// Load
// =============================================================================

#[tokio::test]
async fn test_load_unknown_session_is_empty() {
    let (db, service, _) = database();

    for id in ["never-written", "", "with:colon", "ünïcode"] {
        assert!(db.load(id).await.is_empty());
    }
    assert!(service.is_connected());
    assert_eq!(service.connect_count(), 1);
}

#[tokio::test]
async fn test_load_connects_and_pings_first() {
    let (db, service, _) = database();

    db.load("s1").await;

    assert_eq!(
        service.calls(),
        vec![Call::Connect, Call::Ping, Call::Get("s1".to_string())]
    );
}

#[tokio::test]
async fn test_load_with_connect_failure_is_empty() {
    let (db, service, _) = database();
    service.insert_raw("s1", store_with("x", json!(1)).serialize().unwrap());
    service.fail_connect(true);

    assert!(db.load("s1").await.is_empty());
    assert!(!service.is_connected());
}

#[tokio::test]
async fn test_load_with_ping_failure_is_empty() {
    let (db, service, _) = database();
    service.insert_raw("s1", store_with("x", json!(1)).serialize().unwrap());
    service.fail_ping(true);

    assert!(db.load("s1").await.is_empty());
    assert!(!service.calls().contains(&Call::Get("s1".to_string())));
}

#[tokio::test]
async fn test_load_malformed_bytes_is_empty() {
    let (db, service, _) = database();
    service.insert_raw("s1", b"\xff\xfe definitely not a store".to_vec());

    assert!(db.load("s1").await.is_empty());
}

#[tokio::test]
async fn test_load_truncated_store_is_empty() {
    let (db, service, _) = database();
    let mut bytes = store_with("x", json!({"nested": [1, 2, 3]}))
        .serialize()
        .unwrap();
    bytes.truncate(bytes.len() / 2);
    service.insert_raw("s1", bytes);

    assert!(db.load("s1").await.is_empty());
}

#[tokio::test]
async fn test_load_non_byte_value_is_empty() {
    let (db, service, _) = database();
    service.insert_foreign("s1", "hash");

    assert!(db.load("s1").await.is_empty());
}

#[tokio::test]
async fn test_load_transport_failure_is_empty() {
    let (db, service, _) = database();
    service.insert_raw("s1", store_with("x", json!(1)).serialize().unwrap());
    db.load("warm-up").await;
    service.fail_reads(true);

    assert!(db.load("s1").await.is_empty());
}

// =============================================================================
// try_load
// =============================================================================

#[tokio::test]
async fn test_try_load_distinguishes_missing_from_failure() {
    let (db, service, _) = database();

    assert!(db.try_load("s1").await.unwrap().is_none());

    service.fail_reads(true);
    let err = db.try_load("s1").await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_try_load_reports_decode_failure() {
    let (db, service, _) = database();
    service.insert_raw("s1", b"{not json".to_vec());

    let err = db.try_load("s1").await.unwrap_err();
    assert!(matches!(err, SessionError::Deserialization(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_try_load_reports_connect_failure() {
    let (db, service, _) = database();
    service.fail_connect(true);

    let err = db.try_load("s1").await.unwrap_err();
    assert!(err.is_retryable());
}

// =============================================================================
// Sync
// =============================================================================

#[tokio::test]
async fn test_update_then_load_round_trips() {
    let (db, _, clock) = database();
    let mut store = store_with("user", json!({"id": 7, "roles": ["admin"]}));
    store.set("visits", 3).unwrap();
    let store = store.with_lifetime(clock.now() + chrono::Duration::seconds(120));

    db.sync(SyncPayload::update("s1", store.clone())).await;

    assert_eq!(db.load("s1").await, store);
}

#[tokio::test]
async fn test_update_without_lifetime_never_expires() {
    let (db, service, _) = database();

    db.sync(SyncPayload::update("s1", store_with("x", json!(1))))
        .await;

    assert_eq!(service.expiry("s1"), Some(Expiry::Never));
    assert_eq!(Expiry::Never.ttl_seconds(), Some(0));
}

#[tokio::test]
async fn test_update_ttl_follows_lifetime() {
    let (db, service, clock) = database();
    let store = RemoteStore::new().with_lifetime(clock.now() + chrono::Duration::seconds(60));

    db.sync(SyncPayload::update("s1", store)).await;

    let expiry = service.expiry("s1").unwrap();
    assert_eq!(expiry.ttl_seconds(), Some(60));
}

#[tokio::test]
async fn test_update_ttl_uses_time_of_sync() {
    let (db, service, clock) = database();
    let store = RemoteStore::new().with_lifetime(start() + chrono::Duration::seconds(60));

    clock.advance(Duration::from_secs(45));
    db.sync(SyncPayload::update("s1", store)).await;

    assert_eq!(service.expiry("s1").unwrap().ttl_seconds(), Some(15));
}

#[tokio::test]
async fn test_update_with_past_lifetime_removes_session() {
    let (db, service, clock) = database();
    db.sync(SyncPayload::update("s1", store_with("x", json!(1))))
        .await;
    assert!(service.contains("s1"));

    let expired = store_with("x", json!(2)).with_lifetime(clock.now() - chrono::Duration::seconds(1));
    db.sync(SyncPayload::update("s1", expired)).await;

    assert!(!service.contains("s1"));
    assert!(db.load("s1").await.is_empty());
    assert!(
        !service
            .calls()
            .iter()
            .any(|call| matches!(call, Call::Set { expiry: Expiry::Elapsed, .. }))
    );
}

#[tokio::test]
async fn test_destroy_then_load_is_empty() {
    let (db, service, _) = database();
    db.sync(SyncPayload::update("s1", store_with("x", json!(1))))
        .await;
    db.sync(SyncPayload::update("s2", store_with("y", json!(2))))
        .await;

    db.sync(SyncPayload::destroy("s1")).await;

    assert!(db.load("s1").await.is_empty());
    assert_eq!(db.load("s2").await.get::<i64>("y"), Some(2));
    assert_eq!(service.len(), 1);
}

#[tokio::test]
async fn test_destroy_missing_session_is_harmless() {
    let (db, service, _) = database();
    db.sync(SyncPayload::update("other", store_with("y", json!(2))))
        .await;

    db.sync(SyncPayload::destroy("ghost")).await;
    db.sync(SyncPayload::destroy("ghost")).await;

    assert!(service.contains("other"));
    assert_eq!(db.load("other").await.get::<i64>("y"), Some(2));
}

#[tokio::test]
async fn test_write_failure_is_dropped() {
    let (db, service, _) = database();
    db.load("warm-up").await;
    service.fail_writes(true);

    db.sync(SyncPayload::update("s1", store_with("x", json!(1))))
        .await;

    service.fail_writes(false);
    assert!(db.load("s1").await.is_empty());
}

#[tokio::test]
async fn test_sync_before_load_connects() {
    let (db, service, _) = database();

    db.sync(SyncPayload::update("s1", store_with("x", json!(1))))
        .await;

    assert!(service.is_connected());
    assert!(service.contains("s1"));
}

// =============================================================================
// Async writes
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_async_sync_returns_before_write_completes() {
    let service = MemoryService::new().with_write_delay(Duration::from_secs(5));
    let db = RedisDatabase::with_service(service.clone()).with_async(true);
    db.load("warm-up").await;

    let started = tokio::time::Instant::now();
    db.sync(SyncPayload::update("s1", store_with("x", json!(1))))
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(service.completed_writes(), 0);
    assert_eq!(db.pending_writes(), 1);

    db.flush().await;
    assert_eq!(service.completed_writes(), 1);
    assert_eq!(db.pending_writes(), 0);
    assert_eq!(db.load("s1").await.get::<i64>("x"), Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_blocking_sync_waits_for_write() {
    let service = MemoryService::new().with_write_delay(Duration::from_secs(5));
    let db = RedisDatabase::with_service(service.clone());
    db.load("warm-up").await;

    let started = tokio::time::Instant::now();
    db.sync(SyncPayload::update("s1", store_with("x", json!(1))))
        .await;

    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(service.completed_writes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_async_mode_can_be_switched_off() {
    let service = MemoryService::new().with_write_delay(Duration::from_secs(1));
    let db = RedisDatabase::with_service(service.clone()).with_async(true);
    db.load("warm-up").await;

    db.sync(SyncPayload::update("a", store_with("x", json!(1))))
        .await;
    db.set_async(false);
    db.sync(SyncPayload::update("b", store_with("x", json!(2))))
        .await;

    assert!(service.contains("b"));
    db.flush().await;
    assert!(service.contains("a"));
}

#[tokio::test(start_paused = true)]
async fn test_async_writes_are_bounded() {
    let service = MemoryService::new().with_write_delay(Duration::from_millis(200));
    let db = RedisDatabase::with_service(service.clone())
        .with_async(true)
        .with_max_async_writes(2);
    db.load("warm-up").await;

    for i in 0..10 {
        db.sync(SyncPayload::update(format!("s{}", i), store_with("i", json!(i))))
            .await;
        assert!(db.pending_writes() <= 2);
    }

    db.flush().await;
    assert_eq!(service.len(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_async_write_failure_is_absorbed() {
    let service = MemoryService::new();
    let db = RedisDatabase::with_service(service.clone()).with_async(true);
    db.load("warm-up").await;
    service.fail_writes(true);

    db.sync(SyncPayload::update("s1", store_with("x", json!(1))))
        .await;
    db.flush().await;

    assert!(!service.contains("s1"));
}

// =============================================================================
// Connection lifecycle
// =============================================================================

#[tokio::test]
async fn test_close_then_load_reconnects() {
    let (db, service, _) = database();
    db.sync(SyncPayload::update("s1", store_with("x", json!(1))))
        .await;

    db.close().await.unwrap();
    assert!(!service.is_connected());
    db.close().await.unwrap();

    assert_eq!(db.load("s1").await.get::<i64>("x"), Some(1));
    assert!(service.is_connected());
    assert_eq!(service.connect_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_loads_connect_once() {
    let service = MemoryService::new().with_connect_delay(Duration::from_millis(50));
    let db = Arc::new(RedisDatabase::with_service(service.clone()));
    let barrier = Arc::new(tokio::sync::Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                db.load(&format!("s{}", i)).await
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().is_empty());
    }

    assert_eq!(service.connect_count(), 1);
    assert_eq!(
        service.calls().iter().filter(|call| **call == Call::Ping).count(),
        1
    );
}

#[tokio::test]
async fn test_usable_as_trait_object() {
    let service = MemoryService::new();
    let db: Arc<dyn Database> = Arc::new(RedisDatabase::with_service(service.clone()));

    db.sync(SyncPayload::update("s1", store_with("x", json!(1))))
        .await;
    assert_eq!(db.load("s1").await.get::<i64>("x"), Some(1));
    db.close().await.unwrap();
}

// =============================================================================
// End-to-end scenario
// =============================================================================

#[tokio::test]
async fn test_session_lifecycle() {
    let (db, service, clock) = database();

    assert!(db.load("s1").await.is_empty());

    let store = store_with("x", json!(1)).with_lifetime(clock.now() + chrono::Duration::seconds(30));
    db.sync(SyncPayload::update("s1", store)).await;
    assert!(service.raw("s1").is_some());
    assert_eq!(service.expiry("s1").unwrap().ttl_seconds(), Some(30));

    let loaded = db.load("s1").await;
    assert_eq!(loaded.get::<i64>("x"), Some(1));
    assert_eq!(loaded.data.len(), 1);

    db.sync(SyncPayload::destroy("s1")).await;
    assert!(db.load("s1").await.is_empty());
}
