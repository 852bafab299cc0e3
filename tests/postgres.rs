//! Integration tests against a real Postgres database.
//!
//! Run with DATABASE_URL pointing at a scratch database:
//!
//!     DATABASE_URL=postgres://localhost/qrtrack_test cargo test -- --ignored

use std::sync::Once;
use std::time::Duration;

use qrtrack::models::{ItemUpdate, NewItem, NewUser};
use qrtrack::{AppError, Config, PgStorage, SessionStore, Storage};

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "qrtrack=debug".into()),
            )
            .with_test_writer()
            .init();
    });
}

async fn storage() -> PgStorage {
    init_tracing();
    let config = Config::from_env().expect("DATABASE_URL must be set for integration tests");
    PgStorage::connect(&config)
        .await
        .expect("failed to connect and migrate")
}

fn unique_username(prefix: &str) -> String {
    format!(
        "{}-{}",
        prefix,
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_username_conflicts_and_fresh_username_round_trips() {
    let storage = storage().await;
    let username = unique_username("alice");

    let created = storage
        .create_user(NewUser::new(&username, "hash"))
        .await
        .unwrap();

    let by_id = storage.get_user(created.id).await.unwrap().unwrap();
    assert_eq!(by_id.username, username);

    let by_name = storage
        .get_user_by_username(&username)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_name.id, created.id);

    let err = storage
        .create_user(NewUser::new(&username, "other-hash"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err}");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn fresh_item_has_code_zero_count_and_is_active() {
    let storage = storage().await;
    let user = storage
        .create_user(NewUser::new(unique_username("owner"), "hash"))
        .await
        .unwrap();

    let item = storage
        .create_item(NewItem::new(user.id, "toolbox").with_description("red lid"))
        .await
        .unwrap();

    assert_eq!(item.qr_code_id.len(), 10);
    assert!(item.qr_code_id.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(item.scan_count, 0);
    assert!(item.last_scanned_at.is_none());
    assert!(item.is_active);
    assert_eq!(item.description.as_deref(), Some("red lid"));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn lookup_by_code_matches_lookup_by_id() {
    let storage = storage().await;
    let user = storage
        .create_user(NewUser::new(unique_username("owner"), "hash"))
        .await
        .unwrap();
    let item = storage.create_item(NewItem::new(user.id, "ladder")).await.unwrap();

    let by_id = storage.get_item(item.id).await.unwrap().unwrap();
    let by_code = storage
        .get_item_by_qr_code(&item.qr_code_id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(by_id.id, by_code.id);
    assert_eq!(by_id.qr_code_id, by_code.qr_code_id);
    assert_eq!(by_id.name, by_code.name);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn listing_is_scoped_to_the_owner() {
    let storage = storage().await;
    let alice = storage
        .create_user(NewUser::new(unique_username("alice"), "hash"))
        .await
        .unwrap();
    let bob = storage
        .create_user(NewUser::new(unique_username("bob"), "hash"))
        .await
        .unwrap();

    let a1 = storage.create_item(NewItem::new(alice.id, "drill")).await.unwrap();
    let a2 = storage.create_item(NewItem::new(alice.id, "saw")).await.unwrap();
    storage.create_item(NewItem::new(bob.id, "hammer")).await.unwrap();

    let listed = storage.list_items_by_user(alice.id).await.unwrap();
    let ids: Vec<i64> = listed.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![a1.id, a2.id]);
    assert!(listed.iter().all(|i| i.user_id == alice.id));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn partial_update_touches_only_named_fields() {
    let storage = storage().await;
    let user = storage
        .create_user(NewUser::new(unique_username("owner"), "hash"))
        .await
        .unwrap();
    let item = storage
        .create_item(NewItem::new(user.id, "bike").with_description("blue"))
        .await
        .unwrap();

    let updated = storage
        .update_item(item.id, ItemUpdate::default().name("ebike"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, "ebike");
    assert_eq!(updated.description.as_deref(), Some("blue"));
    assert!(updated.is_active);

    let cleared = storage
        .update_item(item.id, ItemUpdate::default().description(None).is_active(false))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cleared.name, "ebike");
    assert!(cleared.description.is_none());
    assert!(!cleared.is_active);

    let missing = storage
        .update_item(i64::MAX, ItemUpdate::default().name("ghost"))
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn scan_increments_by_one_and_stamps_the_time() {
    let storage = storage().await;
    let user = storage
        .create_user(NewUser::new(unique_username("owner"), "hash"))
        .await
        .unwrap();
    let item = storage.create_item(NewItem::new(user.id, "crate")).await.unwrap();

    let before = chrono::Utc::now();
    let scanned = storage
        .increment_scan_count(item.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(scanned.scan_count, 1);
    let stamped = scanned.last_scanned_at.expect("scan must stamp the time");
    assert!(stamped >= before - chrono::Duration::seconds(5));

    let again = storage
        .increment_scan_count(item.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.scan_count, 2);

    let missing = storage.increment_scan_count(i64::MAX).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_scans_never_lose_counts() {
    let storage = storage().await;
    let user = storage
        .create_user(NewUser::new(unique_username("owner"), "hash"))
        .await
        .unwrap();
    let item = storage.create_item(NewItem::new(user.id, "pallet")).await.unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..20 {
        let storage = storage.clone();
        let id = item.id;
        tasks.spawn(async move { storage.increment_scan_count(id).await });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap().unwrap();
    }

    let settled = storage.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(settled.scan_count, 20);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn delete_removes_the_item_and_reports_honestly() {
    let storage = storage().await;
    let user = storage
        .create_user(NewUser::new(unique_username("owner"), "hash"))
        .await
        .unwrap();
    let item = storage.create_item(NewItem::new(user.id, "tarp")).await.unwrap();

    assert!(storage.delete_item(item.id).await.unwrap());
    assert!(storage.get_item(item.id).await.unwrap().is_none());
    assert!(storage
        .get_item_by_qr_code(&item.qr_code_id)
        .await
        .unwrap()
        .is_none());

    // Second delete finds nothing.
    assert!(!storage.delete_item(item.id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn session_round_trip_and_expiry() {
    init_tracing();
    let config = Config::from_env().expect("DATABASE_URL must be set for integration tests");
    let storage = PgStorage::connect(&config).await.unwrap();
    let sessions = storage.session_store(&config);

    let sid = unique_username("sid");
    let payload = serde_json::json!({ "user_id": 42, "flash": "created" });

    sessions.set(&sid, payload.clone()).await.unwrap();
    assert_eq!(sessions.get(&sid).await.unwrap(), Some(payload.clone()));

    // touch rewrites expires_at: a zero-TTL store touching a live session
    // moves its expiry to now, so the session reads back as gone.
    let zero_ttl = qrtrack::PgSessionStore::new(storage.pool().clone(), Duration::ZERO);
    zero_ttl.touch(&sid).await.unwrap();
    assert!(sessions.get(&sid).await.unwrap().is_none());

    // A fresh set revives it, and a normal touch keeps it live.
    sessions.set(&sid, payload).await.unwrap();
    sessions.touch(&sid).await.unwrap();
    assert!(sessions.get(&sid).await.unwrap().is_some());

    sessions.destroy(&sid).await.unwrap();
    assert!(sessions.get(&sid).await.unwrap().is_none());

    // A zero-TTL store writes sessions that are already expired.
    let expired = qrtrack::PgSessionStore::new(storage.pool().clone(), Duration::ZERO);
    let sid = unique_username("sid-expired");
    expired.set(&sid, serde_json::json!({})).await.unwrap();
    assert!(expired.get(&sid).await.unwrap().is_none());
    assert!(expired.purge_expired().await.unwrap() >= 1);
}
