//! Storage backend tests
//!
//! Every backend must satisfy the same contract: atomic insert with
//! uniqueness, indivisible visit accounting, consistent snapshots and
//! durability across reopen.

use std::sync::Arc;

use chrono::Utc;
use minilink::errors::MinilinkError;
use minilink::storages::file::FileStorage;
use minilink::storages::sqlite::SqliteStorage;
use minilink::storages::{Storage, UrlRecord, VisitEvent};
use tempfile::TempDir;

fn sample_record(code: &str) -> UrlRecord {
    UrlRecord {
        code: code.to_string(),
        target: "https://example.com/some/page".to_string(),
        created_at: Utc::now(),
        expires_at: None,
        click: 0,
    }
}

fn sample_visit(ip: &str) -> VisitEvent {
    VisitEvent {
        visited_at: Utc::now(),
        ip: Some(ip.to_string()),
        country: None,
        city: None,
    }
}

// Shared contract checks, run against each backend

async fn check_insert_and_get(storage: Arc<dyn Storage>) {
    assert!(storage.get("missing").await.is_none());

    storage.insert(sample_record("abc123")).await.unwrap();

    let record = storage.get("abc123").await.expect("record should exist");
    assert_eq!(record.code, "abc123");
    assert_eq!(record.target, "https://example.com/some/page");
    assert_eq!(record.click, 0);
    assert!(record.expires_at.is_none());
}

async fn check_duplicate_insert_rejected(storage: Arc<dyn Storage>) {
    storage.insert(sample_record("dup")).await.unwrap();

    let mut second = sample_record("dup");
    second.target = "https://example.com/other".to_string();

    let result = storage.insert(second).await;
    assert!(matches!(result, Err(MinilinkError::ShortcodeTaken(_))));

    // The loser must not have clobbered the original record
    let record = storage.get("dup").await.unwrap();
    assert_eq!(record.target, "https://example.com/some/page");
}

async fn check_visit_accounting(storage: Arc<dyn Storage>) {
    storage.insert(sample_record("visited")).await.unwrap();

    for i in 0..3 {
        storage
            .record_visit("visited", sample_visit(&format!("203.0.113.{}", i)))
            .await
            .unwrap();
    }

    let record = storage.get("visited").await.unwrap();
    assert_eq!(record.click, 3);

    let snapshot = storage.snapshot("visited").await.unwrap();
    assert_eq!(snapshot.clicks, 3);
    assert_eq!(snapshot.visits.len(), 3);

    // The visit log is append-only and ordered
    let ips: Vec<_> = snapshot.visits.iter().filter_map(|v| v.ip.clone()).collect();
    assert_eq!(ips, vec!["203.0.113.0", "203.0.113.1", "203.0.113.2"]);
}

async fn check_visit_unknown_code(storage: Arc<dyn Storage>) {
    let result = storage.record_visit("ghost", sample_visit("203.0.113.1")).await;
    assert!(matches!(result, Err(MinilinkError::NotFound(_))));
    assert!(storage.snapshot("ghost").await.is_none());
}

async fn check_concurrent_inserts_single_winner(storage: Arc<dyn Storage>) {
    let s1 = storage.clone();
    let s2 = storage.clone();

    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { s1.insert(sample_record("race")).await }),
        tokio::spawn(async move { s2.insert(sample_record("race")).await }),
    );

    let results = [r1.unwrap(), r2.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(MinilinkError::ShortcodeTaken(_))))
            .count(),
        1
    );
}

async fn check_concurrent_visits_no_lost_updates(storage: Arc<dyn Storage>) {
    storage.insert(sample_record("busy")).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let storage = storage.clone();
        handles.push(tokio::spawn(async move {
            storage
                .record_visit("busy", sample_visit(&format!("198.51.100.{}", i)))
                .await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let snapshot = storage.snapshot("busy").await.unwrap();
    assert_eq!(snapshot.clicks, 20);
    assert_eq!(snapshot.visits.len(), 20);
}

// ============ File backend ============

mod file_storage_tests {
    use super::*;

    fn open(dir: &TempDir) -> Arc<dyn Storage> {
        let path = dir.path().join("links.json");
        Arc::new(FileStorage::new(path.to_str().unwrap()).unwrap())
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let dir = TempDir::new().unwrap();
        check_insert_and_get(open(&dir)).await;
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let dir = TempDir::new().unwrap();
        check_duplicate_insert_rejected(open(&dir)).await;
    }

    #[tokio::test]
    async fn test_visit_accounting() {
        let dir = TempDir::new().unwrap();
        check_visit_accounting(open(&dir)).await;
    }

    #[tokio::test]
    async fn test_visit_unknown_code() {
        let dir = TempDir::new().unwrap();
        check_visit_unknown_code(open(&dir)).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_single_winner() {
        let dir = TempDir::new().unwrap();
        check_concurrent_inserts_single_winner(open(&dir)).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_visits_no_lost_updates() {
        let dir = TempDir::new().unwrap();
        check_concurrent_visits_no_lost_updates(open(&dir)).await;
    }

    #[tokio::test]
    async fn test_durability_across_reopen() {
        let dir = TempDir::new().unwrap();

        {
            let storage = open(&dir);
            storage.insert(sample_record("keep")).await.unwrap();
            storage
                .record_visit("keep", sample_visit("203.0.113.7"))
                .await
                .unwrap();
        }

        let reopened = open(&dir);
        let record = reopened.get("keep").await.expect("record should survive");
        assert_eq!(record.target, "https://example.com/some/page");
        assert_eq!(record.click, 1);

        let snapshot = reopened.snapshot("keep").await.unwrap();
        assert_eq!(snapshot.clicks, 1);
        assert_eq!(snapshot.visits.len(), 1);
        assert_eq!(snapshot.visits[0].ip.as_deref(), Some("203.0.113.7"));
    }

    #[tokio::test]
    async fn test_expiry_survives_reopen_unchanged() {
        let dir = TempDir::new().unwrap();
        let expires_at = Utc::now() + chrono::Duration::hours(24);

        {
            let storage = open(&dir);
            let mut record = sample_record("expiring");
            record.expires_at = Some(expires_at);
            storage.insert(record).await.unwrap();
        }

        let reopened = open(&dir);
        let record = reopened.get("expiring").await.unwrap();
        assert_eq!(
            record.expires_at.unwrap().timestamp(),
            expires_at.timestamp()
        );
    }

    #[tokio::test]
    async fn test_backend_name() {
        let dir = TempDir::new().unwrap();
        assert_eq!(open(&dir).get_backend_name().await, "file");
    }
}

// ============ SQLite backend ============

mod sqlite_storage_tests {
    use super::*;

    async fn open(dir: &TempDir) -> Arc<dyn Storage> {
        let path = dir.path().join("links.db");
        Arc::new(
            SqliteStorage::new_async(path.to_str().unwrap())
                .await
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let dir = TempDir::new().unwrap();
        check_insert_and_get(open(&dir).await).await;
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let dir = TempDir::new().unwrap();
        check_duplicate_insert_rejected(open(&dir).await).await;
    }

    #[tokio::test]
    async fn test_visit_accounting() {
        let dir = TempDir::new().unwrap();
        check_visit_accounting(open(&dir).await).await;
    }

    #[tokio::test]
    async fn test_visit_unknown_code() {
        let dir = TempDir::new().unwrap();
        check_visit_unknown_code(open(&dir).await).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_single_winner() {
        let dir = TempDir::new().unwrap();
        check_concurrent_inserts_single_winner(open(&dir).await).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_visits_no_lost_updates() {
        let dir = TempDir::new().unwrap();
        check_concurrent_visits_no_lost_updates(open(&dir).await).await;
    }

    #[tokio::test]
    async fn test_durability_across_reopen() {
        let dir = TempDir::new().unwrap();

        {
            let storage = open(&dir).await;
            storage.insert(sample_record("keep")).await.unwrap();
            storage
                .record_visit("keep", sample_visit("203.0.113.7"))
                .await
                .unwrap();
        }

        let reopened = open(&dir).await;
        let record = reopened.get("keep").await.expect("record should survive");
        assert_eq!(record.click, 1);

        let snapshot = reopened.snapshot("keep").await.unwrap();
        assert_eq!(snapshot.clicks, 1);
        assert_eq!(snapshot.visits.len(), 1);
        assert_eq!(snapshot.visits[0].ip.as_deref(), Some("203.0.113.7"));
    }

    #[tokio::test]
    async fn test_visit_geo_fields_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = open(&dir).await;

        storage.insert(sample_record("geo")).await.unwrap();
        storage
            .record_visit(
                "geo",
                VisitEvent {
                    visited_at: Utc::now(),
                    ip: Some("8.8.8.8".to_string()),
                    country: Some("US".to_string()),
                    city: Some("Mountain View".to_string()),
                },
            )
            .await
            .unwrap();

        let snapshot = storage.snapshot("geo").await.unwrap();
        assert_eq!(snapshot.visits[0].country.as_deref(), Some("US"));
        assert_eq!(snapshot.visits[0].city.as_deref(), Some("Mountain View"));
    }

    #[tokio::test]
    async fn test_backend_name() {
        let dir = TempDir::new().unwrap();
        assert_eq!(open(&dir).await.get_backend_name().await, "sqlite");
    }
}
