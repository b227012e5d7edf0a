//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end against a real SQLite store.

use kosh_crawler::config::{parse_config, Config};
use kosh_crawler::crawler::{run_crawl, CrawlOptions, CrawlReport};
use kosh_crawler::storage::{FrontierStore, SqliteStore};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a content page in the default MediaWiki layout
fn content_page(heading: &str, body: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!(
        r#"<html><head><title>{heading}</title></head><body>
        <h1 class="firstHeading">{heading}</h1>
        <div class="poem">{body}</div>
        {anchors}
        </body></html>"#
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

fn options(base: &str, budget: usize) -> CrawlOptions {
    CrawlOptions {
        base_domain: format!("{}/", base),
        max_urls_to_process: budget,
        only_base_domain_urls: true,
        num_workers: 1,
    }
}

async fn crawl(store: &Arc<SqliteStore>, options: &CrawlOptions) -> CrawlReport {
    run_crawl(store.clone(), &Config::default(), options)
        .await
        .expect("crawl should finish")
}

fn seen_set(store: &SqliteStore) -> BTreeSet<String> {
    store
        .seen_records(1000, 0)
        .unwrap()
        .into_iter()
        .map(|record| record.url)
        .collect()
}

fn assert_crawled_and_forbidden_disjoint(store: &SqliteStore) {
    for url in store.forbidden_urls(1000, 0).unwrap() {
        assert!(
            !store.is_crawled(&url).unwrap(),
            "{} is both crawled and forbidden",
            url
        );
    }
}

#[tokio::test]
async fn test_seed_page_links_are_enqueued() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        content_page(
            "Home",
            "welcome",
            &["/a", &format!("{}/b", base), "http://other.org/c"],
        ),
    )
    .await;

    let store = Arc::new(SqliteStore::new_in_memory().unwrap());
    let report = crawl(&store, &options(&base, 1)).await;

    let expected: BTreeSet<String> = [base.clone(), format!("{}/a", base), format!("{}/b", base)]
        .into_iter()
        .collect();
    assert_eq!(seen_set(&store), expected);
    assert!(!store.is_seen("http://other.org/c").unwrap());
    assert_eq!(report.fetch_attempts, 1);
    assert_eq!(report.new_urls, 2);
    assert!(store.is_crawled(&base).unwrap());
    assert!(store.is_content_fetched(&base).unwrap());
}

#[tokio::test]
async fn test_not_found_page_is_forbidden() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/", content_page("Home", "welcome", &["/a"])).await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = Arc::new(SqliteStore::new_in_memory().unwrap());
    let report = crawl(&store, &options(&base, 10)).await;

    let a = format!("{}/a", base);
    assert!(store.is_forbidden(&a).unwrap());
    assert!(!store.is_crawled(&a).unwrap());
    assert!(!store.is_content_fetched(&a).unwrap());
    assert!(!store.is_seen(&a).unwrap());
    assert_eq!(report.fetch_attempts, 2);
    assert_eq!(report.forbidden, 1);
}

#[tokio::test]
async fn test_budget_caps_fetch_attempts() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        content_page("Home", "welcome", &["/p1", "/p2", "/p3", "/p4"]),
    )
    .await;
    for route in ["/p1", "/p2", "/p3", "/p4"] {
        mount_page(&server, route, content_page(route, "text", &[])).await;
    }

    let store = Arc::new(SqliteStore::new_in_memory().unwrap());
    let report = crawl(&store, &options(&base, 2)).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(report.fetch_attempts, 2);
    assert_eq!(store.count_seen().unwrap(), 5);
    assert_eq!(store.count_crawled().unwrap(), 2);
    assert_eq!(store.count_frontier().unwrap(), 3);
}

#[tokio::test]
async fn test_crawl_resumes_from_persisted_frontier() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("frontier.db");

    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(content_page("Home", "welcome", &["/p1", "/p2"])))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/p1", content_page("One", "first", &[])).await;
    mount_page(&server, "/p2", content_page("Two", "second", &[])).await;

    {
        let store = Arc::new(SqliteStore::new(&db_path).unwrap());
        crawl(&store, &options(&base, 1)).await;
        assert_eq!(store.count_frontier().unwrap(), 2);
    }

    let store = Arc::new(SqliteStore::new(&db_path).unwrap());
    let report = crawl(&store, &options(&base, 10)).await;

    assert_eq!(report.fetch_attempts, 2);
    assert_eq!(store.count_crawled().unwrap(), 3);
    assert_eq!(store.count_fetched().unwrap(), 3);
    assert_eq!(store.count_frontier().unwrap(), 0);
}

#[tokio::test]
async fn test_redirect_target_becomes_effective_url() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/", content_page("Home", "welcome", &["/old"])).await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
        .mount(&server)
        .await;
    mount_page(&server, "/new", content_page("New", "moved here", &["/from-new"])).await;

    let store = Arc::new(SqliteStore::new_in_memory().unwrap());
    crawl(&store, &options(&base, 2)).await;

    let old = format!("{}/old", base);
    let new = format!("{}/new", base);
    assert!(store.is_seen(&new).unwrap());
    assert!(store.is_crawled(&new).unwrap());
    assert!(store.is_content_fetched(&new).unwrap());
    assert!(!store.is_content_fetched(&old).unwrap());
    // The source is terminal too, so it is never fetched again
    assert!(store.is_crawled(&old).unwrap());
    assert!(store.is_seen(&format!("{}/from-new", base)).unwrap());
}

#[tokio::test]
async fn test_off_domain_redirect_is_dropped() {
    let other = MockServer::start().await;
    mount_page(&other, "/", content_page("Elsewhere", "text", &["/x"])).await;

    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/", content_page("Home", "welcome", &["/away"])).await;
    let location = format!("{}/", other.uri());
    Mock::given(method("GET"))
        .and(path("/away"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", location.as_str()))
        .mount(&server)
        .await;

    let store = Arc::new(SqliteStore::new_in_memory().unwrap());
    let report = crawl(&store, &options(&base, 10)).await;

    assert_eq!(report.dropped_redirects, 1);
    assert!(store.is_forbidden(&format!("{}/away", base)).unwrap());
    assert!(!store.is_seen(&other.uri()).unwrap());
    assert_eq!(store.count_fetched().unwrap(), 1);
}

#[tokio::test]
async fn test_pages_without_content_are_forbidden_and_not_harvested() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        content_page("Home", "welcome", &["/missing", "/partial", "/empty"]),
    )
    .await;
    mount_page(
        &server,
        "/missing",
        r#"<html><body><div class="noarticletext">No such page</div><a href="/hidden1">x</a></body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &server,
        "/partial",
        r#"<html><body><h1 class="firstHeading">Only heading</h1><a href="/hidden2">x</a></body></html>"#
            .to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let store = Arc::new(SqliteStore::new_in_memory().unwrap());
    let report = crawl(&store, &options(&base, 10)).await;

    assert_eq!(report.no_content, 1);
    assert_eq!(report.partial_content, 1);
    for route in ["/missing", "/partial", "/empty"] {
        let url = format!("{}{}", base, route);
        assert!(store.is_forbidden(&url).unwrap(), "{} should be forbidden", url);
        assert!(!store.is_content_fetched(&url).unwrap());
    }
    assert!(!store.is_seen(&format!("{}/hidden1", base)).unwrap());
    assert!(!store.is_seen(&format!("{}/hidden2", base)).unwrap());
    assert_crawled_and_forbidden_disjoint(&store);
}

#[tokio::test]
async fn test_excluded_links_are_not_enqueued() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        content_page(
            "Home",
            "welcome",
            &[
                "/wiki/Special:Random",
                "/w/index.php?title=Home&action=edit",
                "/share/facebook",
                "#top",
                "mailto:editor@example.org",
                "/wiki/Poem",
            ],
        ),
    )
    .await;

    let store = Arc::new(SqliteStore::new_in_memory().unwrap());
    let report = crawl(&store, &options(&base, 1)).await;

    assert_eq!(report.new_urls, 1);
    let expected: BTreeSet<String> = [base.clone(), format!("{}/wiki/Poem", base)]
        .into_iter()
        .collect();
    assert_eq!(seen_set(&store), expected);
}

#[tokio::test]
async fn test_configured_exclusions_replace_defaults() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        content_page("Home", "welcome", &["/private/a", "/wiki/Special:Random"]),
    )
    .await;

    let config = parse_config(
        r#"
        [[exclude]]
        path-prefix = "/private"
        reason = "members only"
        "#,
    )
    .unwrap();

    let store = Arc::new(SqliteStore::new_in_memory().unwrap());
    run_crawl(store.clone(), &config, &options(&base, 1))
        .await
        .unwrap();

    assert!(!store.is_seen(&format!("{}/private/a", base)).unwrap());
    assert!(store.is_seen(&format!("{}/wiki/Special:Random", base)).unwrap());
}

#[tokio::test]
async fn test_off_domain_links_followed_when_filter_disabled() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        content_page("Home", "welcome", &["http://other.org/c"]),
    )
    .await;

    let store = Arc::new(SqliteStore::new_in_memory().unwrap());
    let options = CrawlOptions {
        only_base_domain_urls: false,
        ..options(&base, 1)
    };
    crawl(&store, &options).await;

    assert!(store.is_seen("http://other.org/c").unwrap());
}

#[tokio::test]
async fn test_multiple_workers_share_store_and_budget() {
    let server = MockServer::start().await;
    let base = server.uri();
    let routes: Vec<String> = (0..10).map(|i| format!("/poem/{}", i)).collect();
    let route_refs: Vec<&str> = routes.iter().map(String::as_str).collect();
    mount_page(&server, "/", content_page("Home", "welcome", &route_refs)).await;
    for (i, route) in routes.iter().enumerate() {
        mount_page(
            &server,
            route,
            content_page(&format!("Poem {}", i), &format!("verse {}", i), &["/", "/poem/0"]),
        )
        .await;
    }

    let store = Arc::new(SqliteStore::new_in_memory().unwrap());
    let options = CrawlOptions {
        num_workers: 4,
        ..options(&base, 100)
    };
    let report = crawl(&store, &options).await;

    assert_eq!(store.count_seen().unwrap(), 11);
    assert_eq!(store.count_crawled().unwrap(), 11);
    assert_eq!(store.count_fetched().unwrap(), 11);
    assert!(report.fetch_attempts >= 11);
    assert!(server.received_requests().await.unwrap().len() as u64 == report.fetch_attempts);
    assert_crawled_and_forbidden_disjoint(&store);
}

#[tokio::test]
async fn test_shared_budget_is_exact_across_workers() {
    let server = MockServer::start().await;
    let base = server.uri();
    let routes: Vec<String> = (0..20).map(|i| format!("/p{}", i)).collect();
    let route_refs: Vec<&str> = routes.iter().map(String::as_str).collect();
    mount_page(&server, "/", content_page("Home", "welcome", &route_refs)).await;
    for route in &routes {
        mount_page(&server, route, content_page(route, "text", &[])).await;
    }

    let store = Arc::new(SqliteStore::new_in_memory().unwrap());
    let options = CrawlOptions {
        num_workers: 3,
        ..options(&base, 6)
    };
    let report = crawl(&store, &options).await;

    assert_eq!(report.fetch_attempts, 6);
    assert_eq!(server.received_requests().await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_stale_rows_do_not_starve_the_seed() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/", content_page("Home", "welcome", &[])).await;

    let config = parse_config(
        r#"
        [crawler]
        batch-size = 2
        "#,
    )
    .unwrap();

    // The frontier is read in random order; repeat to cover many orderings
    for _ in 0..10 {
        let store = Arc::new(SqliteStore::new_in_memory().unwrap());
        for i in 0..6 {
            store
                .add_seen(&format!("{}/wiki/Special:Random{}", base, i), None, None)
                .unwrap();
        }

        let report = run_crawl(store.clone(), &config, &options(&base, 10))
            .await
            .unwrap();

        assert_eq!(report.fetch_attempts, 1);
        assert!(store.is_crawled(&base).unwrap());
        assert_eq!(store.count_seen().unwrap(), 1);
        assert_eq!(store.count_frontier().unwrap(), 0);
    }
}

#[tokio::test]
async fn test_fetch_timeout_forbids_and_continues() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        content_page("Home", "welcome", &["/slow", "/fast"]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html(content_page("Slow", "late", &[])).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;
    mount_page(&server, "/fast", content_page("Fast", "quick", &[])).await;

    let config = parse_config(
        r#"
        [crawler]
        fetch-timeout-ms = 200
        "#,
    )
    .unwrap();

    let store = Arc::new(SqliteStore::new_in_memory().unwrap());
    let report = run_crawl(store.clone(), &config, &options(&base, 10))
        .await
        .unwrap();

    let slow = format!("{}/slow", base);
    let fast = format!("{}/fast", base);
    assert_eq!(report.fetch_attempts, 3);
    assert!(store.is_forbidden(&slow).unwrap());
    assert!(!store.is_crawled(&slow).unwrap());
    assert!(!store.is_content_fetched(&slow).unwrap());
    assert!(store.is_crawled(&fast).unwrap());
    assert!(store.is_content_fetched(&fast).unwrap());
    assert_crawled_and_forbidden_disjoint(&store);
}
