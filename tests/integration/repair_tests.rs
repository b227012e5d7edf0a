//! Integration tests for the repair passes
//!
//! A store is populated by a real crawl against a wiremock server, then
//! repaired the way `kosh-repair` would.

use kosh_crawler::config::{parse_config, Config};
use kosh_crawler::crawler::{run_crawl, CrawlOptions};
use kosh_crawler::extract::fingerprint;
use kosh_crawler::repair::{dedup_fetched, resanitize, run_repair, RepairOptions, RepairTarget};
use kosh_crawler::storage::{FetchedContent, FrontierStore, SqliteStore};
use kosh_crawler::{Canonicalizer, InclusionFilter};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TARGETS: [RepairTarget; 4] = [
    RepairTarget::Seen,
    RepairTarget::Crawled,
    RepairTarget::Forbidden,
    RepairTarget::Fetched,
];

fn content_page(heading: &str, body: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!(
        r#"<html><body>
        <h1 class="firstHeading">{heading}</h1>
        <div class="poem">{body}</div>
        {anchors}
        </body></html>"#
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

/// Crawls a site where two URLs carry the same poem under different headings
async fn crawled_store(server: &MockServer) -> Arc<SqliteStore> {
    mount_page(
        server,
        "/",
        content_page("Index", "welcome", &["/madhushala", "/madhushala-full", "/gone"]),
    )
    .await;
    mount_page(
        server,
        "/madhushala",
        content_page("Madhushala", "mitti ka tan<br>masti ka man", &[]),
    )
    .await;
    mount_page(
        server,
        "/madhushala-full",
        content_page("Madhushala (complete)", "mitti ka tan<br>  masti ka   man", &[]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;

    let store = Arc::new(SqliteStore::new_in_memory().unwrap());
    let options = CrawlOptions {
        base_domain: format!("{}/", server.uri()),
        max_urls_to_process: 10,
        only_base_domain_urls: true,
        num_workers: 1,
    };
    run_crawl(store.clone(), &Config::default(), &options)
        .await
        .unwrap();
    store
}

fn snapshot(store: &SqliteStore) -> (Vec<String>, Vec<String>, Vec<String>, Vec<FetchedContent>) {
    let mut seen: Vec<String> = store
        .seen_records(1000, 0)
        .unwrap()
        .into_iter()
        .map(|r| r.url)
        .collect();
    let mut crawled: Vec<String> = store
        .crawled_records(1000, 0)
        .unwrap()
        .into_iter()
        .map(|r| r.url)
        .collect();
    let mut forbidden = store.forbidden_urls(1000, 0).unwrap();
    let mut fetched = store.fetched_records(1000, 0).unwrap();
    seen.sort();
    crawled.sort();
    forbidden.sort();
    fetched.sort_by(|a, b| a.url.cmp(&b.url));
    (seen, crawled, forbidden, fetched)
}

#[tokio::test]
async fn test_dedup_keeps_shorter_heading() {
    let server = MockServer::start().await;
    let store = crawled_store(&server).await;
    let body_hash = fingerprint("mitti ka tan\nmasti ka man");

    assert_eq!(store.get_matching_content(&body_hash).unwrap().len(), 2);

    let report = dedup_fetched(store.as_ref(), false).unwrap();

    assert_eq!(report.removed, 1);
    let remaining = store.get_matching_content(&body_hash).unwrap();
    assert_eq!(remaining, vec![format!("{}/madhushala", server.uri())]);
    let row = store.read_fetched_content(&remaining[0]).unwrap().unwrap();
    assert_eq!(row.heading, "Madhushala");
}

#[tokio::test]
async fn test_dedup_is_idempotent() {
    let server = MockServer::start().await;
    let store = crawled_store(&server).await;

    dedup_fetched(store.as_ref(), false).unwrap();
    let once = snapshot(&store);

    let second = dedup_fetched(store.as_ref(), false).unwrap();
    assert_eq!(second.mutations(), 0);
    assert_eq!(snapshot(&store), once);
}

#[tokio::test]
async fn test_resanitize_on_fresh_crawl_is_a_no_op() {
    let server = MockServer::start().await;
    let store = crawled_store(&server).await;
    let canonicalizer = Canonicalizer::new(&server.uri()).unwrap();
    let filter = InclusionFilter::with_defaults();
    let before = snapshot(&store);

    for target in TARGETS {
        for dry_run in [true, false] {
            let report = resanitize(store.as_ref(), &canonicalizer, &filter, target, dry_run).unwrap();
            assert_eq!(report.mutations(), 0, "{} dry_run={}", target, dry_run);
            assert_eq!(report.examined, report.unchanged);
        }
    }

    assert_eq!(snapshot(&store), before);
}

#[tokio::test]
async fn test_dry_run_never_mutates() {
    let server = MockServer::start().await;
    let store = crawled_store(&server).await;
    store
        .add_seen(&format!("{}/stale/#frag", server.uri()), None, None)
        .unwrap();
    store
        .add_seen(&format!("{}/index.php?oldid=42", server.uri()), None, None)
        .unwrap();
    let canonicalizer = Canonicalizer::new(&server.uri()).unwrap();
    let filter = InclusionFilter::with_defaults();
    let before = snapshot(&store);

    let summary = run_repair(
        store.as_ref(),
        &canonicalizer,
        &filter,
        RepairOptions {
            target: RepairTarget::Seen,
            dedup: true,
            dry_run: true,
        },
    )
    .unwrap();

    assert_eq!(summary.resanitize.rewritten, 1);
    assert_eq!(summary.resanitize.removed, 1);
    assert_eq!(summary.dedup.map(|d| d.removed), Some(1));
    assert_eq!(snapshot(&store), before);
}

#[tokio::test]
async fn test_tightened_rules_remove_rows() {
    let server = MockServer::start().await;
    let store = crawled_store(&server).await;
    let canonicalizer = Canonicalizer::new(&server.uri()).unwrap();
    let config = parse_config(
        r#"
        [[exclude]]
        contains = "madhushala-full"
        reason = "duplicate edition"
        "#,
    )
    .unwrap();
    let filter = InclusionFilter::new(config.exclusion_rules());
    let excluded = format!("{}/madhushala-full", server.uri());

    for target in TARGETS {
        resanitize(store.as_ref(), &canonicalizer, &filter, target, false).unwrap();
    }

    assert!(!store.is_seen(&excluded).unwrap());
    assert!(!store.is_crawled(&excluded).unwrap());
    assert!(!store.is_content_fetched(&excluded).unwrap());
    assert!(store.is_content_fetched(&format!("{}/madhushala", server.uri())).unwrap());
    // Forbidden rows that still pass the filter stay
    assert!(store.is_forbidden(&format!("{}/gone", server.uri())).unwrap());
}
