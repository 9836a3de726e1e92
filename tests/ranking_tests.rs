//! Integration tests for the refresh pipeline.
//!
//! Serves canned result pages from a local HTTP server and drives the
//! ranking service end to end: scrape, progress composition and the
//! observations landing in the store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mockito::Matcher;
use rankarr::db::{Store, StoreOptions, TxnMode};
use rankarr::engines::{
    EngineError, EngineRegistry, GOOGLE_COM_ID, GOOGLE_UK_ID, GoogleEngine, ScrapeOptions,
    SearchEngine,
};
use rankarr::models::{Category, Domain, EntityId, Keyword, RANK_NOT_FOUND};
use rankarr::progress::ProgressSink;
use rankarr::services::RankingService;
use tempfile::TempDir;

fn open_store() -> (TempDir, Store) {
    let dir = TempDir::new().expect("temp dir");
    let store = Store::open(dir.path().join("rankarr.redb"), StoreOptions::default())
        .expect("failed to open store");
    (dir, store)
}

/// Engine pointed at the test server, with pacing disabled so crawls run at
/// full speed.
fn test_engine(id: EntityId, base_url: &str) -> GoogleEngine {
    GoogleEngine::new(
        id,
        "google.test",
        "Google/Test",
        base_url,
        ScrapeOptions {
            page_delay: Duration::ZERO,
            scan_limit: 100,
            request_timeout: Duration::from_secs(5),
        },
    )
    .expect("engine")
}

fn recording() -> (Arc<dyn ProgressSink>, Arc<Mutex<Vec<i32>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let seen = Arc::clone(&seen);
        Arc::new(move |value: i32| seen.lock().expect("lock").push(value))
    };
    (sink, seen)
}

fn result_line(target: &str) -> String {
    format!("<div><div><div><a href=\"/url?q={target}\">r</a></div></div></div>")
}

fn results_page(rows: &str, next_href: Option<&str>) -> String {
    let footer = next_href.map_or_else(String::new, |href| {
        format!("<footer><div></div><div></div><div><a href=\"{href}\">next</a></div></footer>")
    });
    format!("<html><body><div id=\"main\">{rows}</div>{footer}</body></html>")
}

#[tokio::test]
async fn test_refresh_keyword_records_one_observation_per_engine() {
    let mut server = mockito::Server::new_async().await;
    let mut rows = String::new();
    rows.push_str(&result_line("https://other-one.example/page"));
    rows.push_str(&result_line("https://other-two.example/page"));
    rows.push_str(&result_line("https://example.com/landing"));
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("q".into(), "rust kv store".into()))
        .with_header("content-type", "text/html")
        .with_body(results_page(&rows, None))
        .expect(2)
        .create_async()
        .await;

    let mut registry = EngineRegistry::new();
    registry.register(Arc::new(test_engine(GOOGLE_COM_ID, &server.url())));
    registry.register(Arc::new(test_engine(GOOGLE_UK_ID, &server.url())));

    let (_dir, store) = open_store();
    let service = RankingService::new(store.clone(), Arc::new(registry));

    let mut domain = Domain::new("https://example.com");
    domain.add_engine(GOOGLE_COM_ID);
    domain.add_engine(GOOGLE_UK_ID);
    let keyword = Keyword::new("rust kv store");

    let (progress, _) = recording();
    service
        .refresh_keyword(&keyword, &domain, progress)
        .await
        .expect("refresh");
    mock.assert_async().await;

    let txn = store.begin(TxnMode::ReadOnly).expect("txn");
    let on_com = store
        .last_ranking(&txn, &keyword, GOOGLE_COM_ID)
        .expect("last")
        .expect("observation recorded");
    let on_uk = store
        .last_ranking(&txn, &keyword, GOOGLE_UK_ID)
        .expect("last")
        .expect("observation recorded");

    assert_eq!(on_com.rank, 3);
    assert_eq!(on_uk.rank, 3);
    // The stored URL is the matched result, not the search page.
    assert_eq!(on_com.page_url, "https://example.com/landing");
    // One pass, one shared timestamp across engines.
    assert_eq!(on_com.timestamp, on_uk.timestamp);
    assert_eq!(store.rankings(&txn, &keyword, GOOGLE_COM_ID).expect("rankings").len(), 1);
}

#[tokio::test]
async fn test_missing_domain_records_not_found_sentinel() {
    let mut server = mockito::Server::new_async().await;
    let mut rows = String::new();
    rows.push_str(&result_line("https://other-one.example/page"));
    rows.push_str(&result_line("https://other-two.example/page"));
    server
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("q".into(), "rust kv store".into()))
        .with_header("content-type", "text/html")
        .with_body(results_page(&rows, None))
        .create_async()
        .await;

    let mut registry = EngineRegistry::new();
    registry.register(Arc::new(test_engine(GOOGLE_COM_ID, &server.url())));

    let (_dir, store) = open_store();
    let service = RankingService::new(store.clone(), Arc::new(registry));

    let mut domain = Domain::new("https://example.com");
    domain.add_engine(GOOGLE_COM_ID);
    let keyword = Keyword::new("rust kv store");

    let (progress, seen) = recording();
    service
        .refresh_keyword(&keyword, &domain, progress)
        .await
        .expect("refresh");

    let txn = store.begin(TxnMode::ReadOnly).expect("txn");
    let last = store
        .last_ranking(&txn, &keyword, GOOGLE_COM_ID)
        .expect("last")
        .expect("sentinel recorded");
    assert_eq!(last.rank, RANK_NOT_FOUND);
    assert!(!last.is_found());
    assert_eq!(last.page_url, "");

    // Even a miss finishes with the full scan limit reported.
    assert_eq!(seen.lock().expect("lock").last(), Some(&100));
}

#[tokio::test]
async fn test_progress_accumulates_across_engines_without_normalizing() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("q".into(), "rust kv store".into()))
        .with_header("content-type", "text/html")
        .with_body(results_page(&result_line("https://other.example/page"), None))
        .expect(2)
        .create_async()
        .await;

    let mut registry = EngineRegistry::new();
    registry.register(Arc::new(test_engine(GOOGLE_COM_ID, &server.url())));
    registry.register(Arc::new(test_engine(GOOGLE_UK_ID, &server.url())));

    let (_dir, store) = open_store();
    let service = RankingService::new(store.clone(), Arc::new(registry));

    let mut domain = Domain::new("https://example.com");
    domain.add_engine(GOOGLE_COM_ID);
    domain.add_engine(GOOGLE_UK_ID);
    let keyword = Keyword::new("rust kv store");

    let (progress, seen) = recording();
    service
        .refresh_keyword(&keyword, &domain, progress)
        .await
        .expect("refresh");

    // Two engines at a limit of 100 each: the run ends at 200.
    assert_eq!(*seen.lock().expect("lock"), vec![100, 200]);
}

#[tokio::test]
async fn test_crawl_follows_next_link_and_rank_continues() {
    let mut server = mockito::Server::new_async().await;
    let mut first_rows = String::new();
    first_rows.push_str(&result_line("https://other-one.example/page"));
    first_rows.push_str(&result_line("https://other-two.example/page"));
    let first = server
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("q".into(), "rust kv store".into()))
        .with_header("content-type", "text/html")
        .with_body(results_page(&first_rows, Some("/results/page2")))
        .create_async()
        .await;

    let mut second_rows = String::new();
    second_rows.push_str(&result_line("https://other-three.example/page"));
    second_rows.push_str(&result_line("https://example.com/deep/landing"));
    let second = server
        .mock("GET", "/results/page2")
        .with_header("content-type", "text/html")
        .with_body(results_page(&second_rows, None))
        .create_async()
        .await;

    let engine = test_engine(GOOGLE_COM_ID, &server.url());
    let (progress, seen) = recording();
    let outcome = engine
        .rank_query("https://example.com", "rust kv store", progress.as_ref())
        .await
        .expect("rank query");
    first.assert_async().await;
    second.assert_async().await;

    // Two candidates on page one, the fourth overall matches on page two.
    assert_eq!(outcome.rank, 4);
    assert_eq!(outcome.page_url, "https://example.com/deep/landing");
    assert_eq!(*seen.lock().expect("lock"), vec![2, 100]);
}

#[tokio::test]
async fn test_refresh_domain_covers_every_keyword() {
    let mut server = mockito::Server::new_async().await;
    let rows = result_line("https://example.com/landing");
    let first = server
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("q".into(), "rust kv store".into()))
        .with_header("content-type", "text/html")
        .with_body(results_page(&rows, None))
        .create_async()
        .await;
    let second = server
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("q".into(), "search rank tracker".into()))
        .with_header("content-type", "text/html")
        .with_body(results_page(&rows, None))
        .create_async()
        .await;

    let mut registry = EngineRegistry::new();
    registry.register(Arc::new(test_engine(GOOGLE_COM_ID, &server.url())));

    let (_dir, store) = open_store();
    let service = RankingService::new(store.clone(), Arc::new(registry));

    let mut domain = Domain::new("https://example.com");
    domain.add_engine(GOOGLE_COM_ID);

    let txn = store.begin(TxnMode::ReadWrite).expect("txn");
    store
        .store_domain(&txn, &domain, &Category::all_domains())
        .expect("store domain");
    let keywords = store
        .import_keywords(&txn, &domain, "rust kv store\nsearch rank tracker\n")
        .expect("import");
    txn.commit().expect("commit");

    let (progress, seen) = recording();
    service
        .refresh_domain(&domain, progress)
        .await
        .expect("refresh");
    first.assert_async().await;
    second.assert_async().await;

    let txn = store.begin(TxnMode::ReadOnly).expect("txn");
    for keyword in &keywords {
        let last = store
            .last_ranking(&txn, keyword, GOOGLE_COM_ID)
            .expect("last")
            .expect("observation recorded");
        assert_eq!(last.rank, 1);
    }
    // Keyword contributions chain: each run of 100 starts where the last
    // one stopped.
    assert_eq!(*seen.lock().expect("lock"), vec![100, 200]);
}

#[tokio::test]
async fn test_unresolvable_engine_fails_the_refresh() {
    let (_dir, store) = open_store();
    let service = RankingService::new(store.clone(), Arc::new(EngineRegistry::new()));

    let rogue = EntityId::new();
    let mut domain = Domain::new("https://example.com");
    domain.add_engine(rogue);
    let keyword = Keyword::new("rust kv store");

    let (progress, _) = recording();
    let err = service
        .refresh_keyword(&keyword, &domain, progress)
        .await
        .expect_err("unknown engine must fail");
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::UnknownEngine(id)) if *id == rogue
    ));

    let txn = store.begin(TxnMode::ReadOnly).expect("txn");
    assert!(store.rankings(&txn, &keyword, rogue).expect("rankings").is_empty());
}
