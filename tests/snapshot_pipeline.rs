//! Queue/fetch coordination with a mock rendering worker.

mod helpers;

use std::sync::Arc;

use chrono::Duration;
use httptest::{matchers::*, responders::*, Expectation, Server};
use serde_json::json;
use sqlx::SqlitePool;
use tempfile::TempDir;

use helpers::{
    create_test_context, create_test_pool, create_test_pool_with_path, create_test_site,
    manual_clock, test_start,
};
use site_monitor::app::commands;
use site_monitor::storage::{latest_snapshot_for_site, latest_snapshot_time, upsert_snapshot};
use site_monitor::{
    CacheStore, Config, ManualClock, MemoryCacheStore, QueueOutcome, SnapshotCoordinator,
    SqliteCacheStore,
};

struct Fixture {
    coordinator: SnapshotCoordinator,
    pool: SqlitePool,
    cache: Arc<dyn CacheStore>,
    clock: Arc<ManualClock>,
}

async fn fixture(server: &Server) -> Fixture {
    let clock = manual_clock();
    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new(clock.clone()));
    let pool = create_test_pool().await;
    let coordinator = SnapshotCoordinator::new(
        reqwest::Client::new(),
        &server.url_str("/"),
        pool.clone(),
        cache.clone(),
        clock.clone(),
    );
    Fixture {
        coordinator,
        pool,
        cache,
        clock,
    }
}

fn domains(names: &[&str]) -> Vec<String> {
    names.iter().map(|d| d.to_string()).collect()
}

fn expect_enqueue(server: &Server, body: serde_json::Value) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/fetch-domains"),
            request::body(json_decoded(eq(body))),
        ])
        .respond_with(status_code(200).body(r#"{"queued":true}"#)),
    );
}

#[tokio::test]
async fn test_queue_skips_domains_already_in_progress() {
    let server = Server::run();
    expect_enqueue(&server, json!({"domains": ["a.com", "b.com"]}));
    let f = fixture(&server).await;

    let outcome = f.coordinator.queue(&domains(&["a.com", "b.com", "a.com"])).await.unwrap();
    assert_eq!(outcome, QueueOutcome::Queued(domains(&["a.com", "b.com"])));

    // Everything already in progress: no request reaches the worker
    let outcome = f.coordinator.queue(&domains(&["b.com", "a.com"])).await.unwrap();
    assert_eq!(outcome, QueueOutcome::NothingToQueue);

    let status = f.coordinator.status().await.unwrap();
    assert_eq!(status.in_progress, domains(&["a.com", "b.com"]));
    assert_eq!(status.pending.len(), 2);
}

#[tokio::test]
async fn test_queue_submits_only_new_domains() {
    let server = Server::run();
    expect_enqueue(&server, json!({"domains": ["a.com"]}));
    expect_enqueue(&server, json!({"domains": ["c.com"]}));
    let f = fixture(&server).await;

    f.coordinator.queue(&domains(&["a.com"])).await.unwrap();
    let outcome = f.coordinator.queue(&domains(&["a.com", "c.com"])).await.unwrap();
    assert_eq!(outcome, QueueOutcome::Queued(domains(&["c.com"])));
}

#[tokio::test]
async fn test_rejected_queue_changes_nothing() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/fetch-domains"))
            .respond_with(status_code(503).body("busy")),
    );
    let f = fixture(&server).await;

    let outcome = f.coordinator.queue(&domains(&["a.com"])).await.unwrap();
    assert_eq!(outcome, QueueOutcome::Failed("HTTP 503: busy".to_string()));

    let status = f.coordinator.status().await.unwrap();
    assert!(status.in_progress.is_empty());
    assert!(status.pending.is_empty());
}

#[tokio::test]
async fn test_domains_become_ready_after_sixty_seconds() {
    let server = Server::run();
    expect_enqueue(&server, json!({"domains": ["a.com"]}));
    let f = fixture(&server).await;

    f.coordinator.queue(&domains(&["a.com"])).await.unwrap();
    assert!(f.coordinator.ready_domains().await.unwrap().is_empty());

    f.clock.advance(Duration::seconds(59));
    assert!(f.coordinator.ready_domains().await.unwrap().is_empty());

    f.clock.advance(Duration::seconds(1));
    assert_eq!(f.coordinator.ready_domains().await.unwrap(), domains(&["a.com"]));
}

#[tokio::test]
async fn test_successful_fetch_stores_snapshot_and_clears_state() {
    let server = Server::run();
    expect_enqueue(&server, json!({"domains": ["a.com"]}));
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/get-results"),
            request::query(url_decoded(contains(("domain", "a.com")))),
        ])
        .respond_with(json_encoded(json!({"a.com": "<html><body>A</body></html>"}))),
    );
    let f = fixture(&server).await;
    let site_id = create_test_site(&f.pool, "https://a.com", None).await;

    f.coordinator.queue(&domains(&["a.com"])).await.unwrap();
    f.clock.advance(Duration::seconds(60));

    let report = f.coordinator.fetch(&domains(&["a.com"])).await.unwrap();
    assert_eq!(report.successful, domains(&["a.com"]));
    assert!(report.failed.is_empty());

    let snapshot = latest_snapshot_for_site(&f.pool, site_id)
        .await
        .unwrap()
        .expect("snapshot stored");
    assert_eq!(snapshot.domain, "a.com");
    assert_eq!(snapshot.html_content, "<html><body>A</body></html>");
    assert_eq!(snapshot.updated_at, test_start() + Duration::seconds(60));

    let status = f.coordinator.status().await.unwrap();
    assert!(status.in_progress.is_empty());
    assert!(status.pending.is_empty());
    // Emptied collections are removed, not stored empty
    assert_eq!(f.cache.get("html_fetch_pending").await.unwrap(), None);
    assert_eq!(f.cache.get("html_fetch_in_progress").await.unwrap(), None);
}

#[tokio::test]
async fn test_missing_content_leaves_domain_pending() {
    let server = Server::run();
    expect_enqueue(&server, json!({"domains": ["a.com"]}));
    server.expect(
        Expectation::matching(request::method_path("GET", "/get-results"))
            .respond_with(json_encoded(json!({}))),
    );
    let f = fixture(&server).await;
    create_test_site(&f.pool, "https://a.com", None).await;

    f.coordinator.queue(&domains(&["a.com"])).await.unwrap();
    f.clock.advance(Duration::seconds(61));

    let report = f.coordinator.fetch(&domains(&["a.com"])).await.unwrap();
    assert!(report.successful.is_empty());
    assert_eq!(report.failed, domains(&["a.com"]));

    let status = f.coordinator.status().await.unwrap();
    assert_eq!(status.in_progress, domains(&["a.com"]));
    assert_eq!(status.pending, vec![("a.com".to_string(), 61)]);
    assert_eq!(status.ready, domains(&["a.com"]));
}

#[tokio::test]
async fn test_worker_error_leaves_domain_pending() {
    let server = Server::run();
    expect_enqueue(&server, json!({"domains": ["a.com"]}));
    server.expect(
        Expectation::matching(request::method_path("GET", "/get-results"))
            .respond_with(status_code(500)),
    );
    let f = fixture(&server).await;

    f.coordinator.queue(&domains(&["a.com"])).await.unwrap();
    let report = f.coordinator.fetch(&domains(&["a.com"])).await.unwrap();
    assert_eq!(report.failed, domains(&["a.com"]));
    assert_eq!(f.coordinator.status().await.unwrap().pending.len(), 1);
}

#[tokio::test]
async fn test_fetch_without_matching_site_discards_content() {
    let server = Server::run();
    expect_enqueue(&server, json!({"domains": ["orphan.com"]}));
    server.expect(
        Expectation::matching(request::method_path("GET", "/get-results"))
            .respond_with(json_encoded(json!({"orphan.com": "<html></html>"}))),
    );
    let f = fixture(&server).await;
    create_test_site(&f.pool, "https://a.com", None).await;

    f.coordinator.queue(&domains(&["orphan.com"])).await.unwrap();
    let report = f.coordinator.fetch(&domains(&["orphan.com"])).await.unwrap();
    assert_eq!(report.successful, domains(&["orphan.com"]));

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM site_snapshots")
        .fetch_one(&f.pool)
        .await
        .unwrap();
    assert_eq!(rows, 0);
    assert!(f.coordinator.status().await.unwrap().pending.is_empty());
}

#[tokio::test]
async fn test_domains_needing_fetch_respects_freshness() {
    let server = Server::run();
    let f = fixture(&server).await;
    let a = create_test_site(&f.pool, "https://a.com", None).await;
    create_test_site(&f.pool, "https://a.com/blog", None).await;
    create_test_site(&f.pool, "https://b.com", None).await;
    create_test_site(&f.pool, "no-scheme.com", None).await;

    upsert_snapshot(&f.pool, a, "a.com", "<html></html>", test_start())
        .await
        .unwrap();
    assert_eq!(
        latest_snapshot_time(&f.pool, "a.com").await.unwrap(),
        Some(test_start())
    );

    f.clock.advance(Duration::minutes(30));
    assert_eq!(
        f.coordinator.domains_needing_fetch(false).await.unwrap(),
        domains(&["b.com"])
    );
    assert_eq!(
        f.coordinator.domains_needing_fetch(true).await.unwrap(),
        domains(&["a.com", "b.com"])
    );

    f.clock.advance(Duration::minutes(31));
    assert_eq!(
        f.coordinator.domains_needing_fetch(false).await.unwrap(),
        domains(&["a.com", "b.com"])
    );
}

#[tokio::test]
async fn test_clear_forgets_transient_state() {
    let server = Server::run();
    expect_enqueue(&server, json!({"domains": ["a.com"]}));
    let f = fixture(&server).await;

    f.coordinator.queue(&domains(&["a.com"])).await.unwrap();
    f.coordinator.clear().await.unwrap();

    let status = f.coordinator.status().await.unwrap();
    assert!(status.in_progress.is_empty());
    assert!(status.pending.is_empty());
}

#[tokio::test]
async fn test_status_flags_in_progress_without_pending() {
    let server = Server::run();
    let f = fixture(&server).await;
    f.cache
        .put(
            "html_fetch_in_progress",
            json!(["stuck.com"]),
            std::time::Duration::from_secs(3600),
        )
        .await
        .unwrap();

    let status = f.coordinator.status().await.unwrap();
    let warnings = status.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("not marked as pending"));
}

#[tokio::test]
async fn test_transient_state_expires_after_an_hour() {
    let server = Server::run();
    expect_enqueue(&server, json!({"domains": ["a.com"]}));
    let f = fixture(&server).await;

    f.coordinator.queue(&domains(&["a.com"])).await.unwrap();
    f.clock.advance(Duration::hours(1));

    let status = f.coordinator.status().await.unwrap();
    assert!(status.in_progress.is_empty());
    assert!(status.pending.is_empty());
}

#[tokio::test]
async fn test_sqlite_cache_state_is_shared_between_pools() {
    let server = Server::run();
    expect_enqueue(&server, json!({"domains": ["a.com"]}));

    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("shared.db");
    let clock = manual_clock();

    let first_pool = create_test_pool_with_path(&db_path).await;
    let first = SnapshotCoordinator::new(
        reqwest::Client::new(),
        &server.url_str("/"),
        first_pool.clone(),
        Arc::new(SqliteCacheStore::new(first_pool, clock.clone())),
        clock.clone(),
    );
    first.queue(&domains(&["a.com"])).await.unwrap();

    let second_pool = create_test_pool_with_path(&db_path).await;
    let second = SnapshotCoordinator::new(
        reqwest::Client::new(),
        &server.url_str("/"),
        second_pool.clone(),
        Arc::new(SqliteCacheStore::new(second_pool, clock.clone())),
        clock.clone(),
    );
    // Already in progress according to the shared table: no second POST
    assert_eq!(
        second.queue(&domains(&["a.com"])).await.unwrap(),
        QueueOutcome::NothingToQueue
    );

    clock.advance(Duration::seconds(60));
    assert_eq!(second.ready_domains().await.unwrap(), domains(&["a.com"]));
}

#[tokio::test]
async fn test_fetch_ready_command_fetches_only_ready_domains() {
    let server = Server::run();
    expect_enqueue(&server, json!({"domains": ["a.com"]}));
    expect_enqueue(&server, json!({"domains": ["b.com"]}));
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/get-results"),
            request::query(url_decoded(contains(("domain", "a.com")))),
        ])
        .respond_with(json_encoded(json!({"a.com": "<html>a</html>"}))),
    );

    let config = Config {
        worker_url: Some(server.url_str("/")),
        ..Default::default()
    };
    let (ctx, clock) = create_test_context(config).await;
    create_test_site(&ctx.pool, "https://a.com", None).await;
    let coordinator = ctx.coordinator().expect("worker configured");

    coordinator.queue(&domains(&["a.com"])).await.unwrap();
    clock.advance(Duration::seconds(30));
    coordinator.queue(&domains(&["b.com"])).await.unwrap();
    clock.advance(Duration::seconds(30));

    let report = commands::fetch_ready(&ctx).await.unwrap();
    assert_eq!(report.successful, domains(&["a.com"]));
    assert!(report.failed.is_empty());

    let status = commands::html_status(&ctx, false)
        .await
        .unwrap()
        .expect("report");
    assert_eq!(status.in_progress, domains(&["b.com"]));
}

#[tokio::test]
async fn test_html_commands_require_worker_url() {
    let (ctx, _clock) = create_test_context(Config::default()).await;
    let error = commands::fetch_ready(&ctx).await.unwrap_err();
    assert!(error.to_string().contains("worker URL"));
}

#[tokio::test]
async fn test_concurrent_queues_submit_each_domain_once() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/fetch-domains"),
            request::body(json_decoded(eq(json!({"domains": ["a.com"]})))),
        ])
        .times(1)
        .respond_with(delay_and_then(
            std::time::Duration::from_millis(300),
            status_code(200),
        )),
    );

    let clock = manual_clock();
    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new(clock.clone()));
    let pool = create_test_pool().await;
    let coordinator = || {
        SnapshotCoordinator::new(
            reqwest::Client::new(),
            &server.url_str("/"),
            pool.clone(),
            cache.clone(),
            clock.clone(),
        )
    };
    let (first, second) = (coordinator(), coordinator());

    let requested = domains(&["a.com"]);
    let (a, b) = tokio::join!(first.queue(&requested), second.queue(&requested));
    let mut outcomes = vec![a.unwrap(), b.unwrap()];
    outcomes.sort_by_key(|outcome| matches!(outcome, QueueOutcome::NothingToQueue));
    assert_eq!(
        outcomes,
        vec![
            QueueOutcome::Queued(domains(&["a.com"])),
            QueueOutcome::NothingToQueue
        ]
    );

    let status = first.status().await.unwrap();
    assert_eq!(status.in_progress, domains(&["a.com"]));
    assert_eq!(status.pending.len(), 1);
}

#[tokio::test]
async fn test_failed_submission_releases_claim_for_retry() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/fetch-domains"))
            .times(2)
            .respond_with(httptest::cycle![status_code(502), status_code(200)]),
    );
    let f = fixture(&server).await;

    let outcome = f.coordinator.queue(&domains(&["a.com"])).await.unwrap();
    assert!(matches!(outcome, QueueOutcome::Failed(_)));
    assert_eq!(f.cache.get("html_fetch_in_progress").await.unwrap(), None);

    let outcome = f.coordinator.queue(&domains(&["a.com"])).await.unwrap();
    assert_eq!(outcome, QueueOutcome::Queued(domains(&["a.com"])));
}

#[tokio::test]
async fn test_empty_content_is_stored_as_snapshot() {
    let server = Server::run();
    expect_enqueue(&server, json!({"domains": ["a.com"]}));
    server.expect(
        Expectation::matching(request::method_path("GET", "/get-results"))
            .respond_with(json_encoded(json!({"a.com": ""}))),
    );
    let f = fixture(&server).await;
    let site_id = create_test_site(&f.pool, "https://a.com", None).await;

    f.coordinator.queue(&domains(&["a.com"])).await.unwrap();
    let report = f.coordinator.fetch(&domains(&["a.com"])).await.unwrap();
    assert_eq!(report.successful, domains(&["a.com"]));

    let snapshot = latest_snapshot_for_site(&f.pool, site_id)
        .await
        .unwrap()
        .expect("snapshot stored");
    assert_eq!(snapshot.html_content, "");
    assert!(f.coordinator.status().await.unwrap().pending.is_empty());
}
