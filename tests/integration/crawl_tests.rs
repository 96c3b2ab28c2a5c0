//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the
//! reqwest-backed crawler end-to-end against them.

use crawlspace::config::{CrawlerConfig, ExecutorKind, UserAgentConfig};
use crawlspace::crawler::RequestError;
use crawlspace::{CrawlOptions, CrawlOutcome, Crawler, PageState};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_crawler_config(depth: u32, executor: ExecutorKind) -> CrawlerConfig {
    CrawlerConfig {
        depth,
        max_concurrent_requests: 4,
        executor,
        request_timeout: 5,
        max_redirects: 5,
    }
}

fn test_user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: None,
    }
}

fn crawler(executor: ExecutorKind) -> Crawler {
    Crawler::from_config(&test_crawler_config(2, executor), &test_user_agent())
        .expect("Failed to build crawler")
}

fn html(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|link| format!("<a href=\"{}\">{}</a>", link, link))
        .collect();
    format!("<html><head><title>Test</title></head><body>{}</body></html>", anchors)
}

async fn mount_page(server: &MockServer, route: &str, links: &[&str]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html(links), "text/html"))
        .mount(server)
        .await;
}

/// Collects the outcomes handed to the page callbacks
#[derive(Clone, Default)]
struct Outcomes {
    successes: Arc<Mutex<Vec<CrawlOutcome>>>,
    failures: Arc<Mutex<Vec<CrawlOutcome>>>,
}

impl Outcomes {
    fn attach(&self, options: CrawlOptions) -> CrawlOptions {
        let successes = Arc::clone(&self.successes);
        let failures = Arc::clone(&self.failures);
        options
            .on_success(move |outcome| successes.lock().unwrap().push(outcome))
            .on_failure(move |outcome| failures.lock().unwrap().push(outcome))
    }

    fn success_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self
            .successes
            .lock()
            .unwrap()
            .iter()
            .map(|outcome| outcome.url.clone())
            .collect();
        urls.sort();
        urls
    }

    fn failures(&self) -> Vec<CrawlOutcome> {
        self.failures.lock().unwrap().clone()
    }
}

fn sorted(mut urls: Vec<String>) -> Vec<String> {
    urls.sort();
    urls
}

#[tokio::test]
async fn test_full_crawl_follows_links_to_depth() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_page(&mock_server, "/", &["/a", "/b"]).await;
    mount_page(&mock_server, "/a", &["/c"]).await;
    mount_page(&mock_server, "/b", &[]).await;

    // Only discovered at the last level, so never fetched
    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let outcomes = Outcomes::default();
    let crawler = crawler(ExecutorKind::Pooled);
    let crawled = crawler
        .run(outcomes.attach(CrawlOptions::new(format!("{}/", base)).depth(2)))
        .await
        .unwrap();

    let expected = vec![
        format!("{}/", base),
        format!("{}/a", base),
        format!("{}/b", base),
    ];
    assert_eq!(sorted(crawled), expected);
    assert_eq!(outcomes.success_urls(), expected);
    assert!(outcomes.failures().is_empty());

    let state = crawler.state();
    assert!(state.complete);
    assert!(state.being_crawled_urls.is_empty());
    assert_eq!(crawler.page_state(&format!("{}/c", base)), PageState::Unseen);
}

#[tokio::test]
async fn test_outcomes_carry_referer_and_body() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let seed = format!("{}/", base);

    mount_page(&mock_server, "/", &["/child"]).await;
    Mock::given(method("GET"))
        .and(path("/child"))
        .and(header("referer", seed.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>child</p>", "text/html"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcomes = Outcomes::default();
    crawler(ExecutorKind::Pooled)
        .run(outcomes.attach(CrawlOptions::new(seed.as_str())))
        .await
        .unwrap();

    let successes = outcomes.successes.lock().unwrap().clone();
    let child = successes
        .iter()
        .find(|outcome| outcome.url.ends_with("/child"))
        .expect("child page was not crawled");
    assert_eq!(child.referer, seed);
    assert_eq!(child.status, Some(200));
    assert_eq!(child.content, "<p>child</p>");
    assert_eq!(child.body, child.content);

    let root = successes
        .iter()
        .find(|outcome| outcome.url == seed)
        .expect("seed was not crawled");
    assert_eq!(root.referer, "");
}

#[tokio::test]
async fn test_user_agent_header_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "TestBot/1.0.0"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("ok", "text/plain"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcomes = Outcomes::default();
    crawler(ExecutorKind::Pooled)
        .run(outcomes.attach(CrawlOptions::new(format!("{}/", mock_server.uri()))))
        .await
        .unwrap();

    assert_eq!(outcomes.success_urls().len(), 1);
}

#[tokio::test]
async fn test_not_found_reported_as_failure() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_page(&mock_server, "/", &["/missing"]).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_raw("<a href=\"/x\">x</a>", "text/html"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let outcomes = Outcomes::default();
    let crawler = crawler(ExecutorKind::Pooled);
    let crawled = crawler
        .run(outcomes.attach(CrawlOptions::new(format!("{}/", base)).depth(3)))
        .await
        .unwrap();

    // Failed URLs still count as crawled
    assert_eq!(crawled.len(), 2);

    let failures = outcomes.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].url, format!("{}/missing", base));
    assert_eq!(failures[0].status, Some(404));
    assert_eq!(failures[0].error, Some(RequestError::Status(404)));
    assert!(failures[0].content.contains("href"));
    assert_eq!(
        crawler.page_state(&format!("{}/missing", base)),
        PageState::Crawled
    );
}

#[tokio::test]
async fn test_server_error_and_unreachable_host() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let outcomes = Outcomes::default();
    crawler(ExecutorKind::Pooled)
        .run(outcomes.attach(CrawlOptions::new(format!("{}/", mock_server.uri()))))
        .await
        .unwrap();
    assert_eq!(outcomes.failures()[0].error, Some(RequestError::Status(503)));

    let outcomes = Outcomes::default();
    let crawled = crawler(ExecutorKind::Pooled)
        .run(outcomes.attach(CrawlOptions::new("http://127.0.0.1:9/")))
        .await
        .unwrap();

    assert_eq!(crawled, vec!["http://127.0.0.1:9/"]);
    let failures = outcomes.failures();
    assert_eq!(failures[0].status, None);
    assert!(failures[0].response.is_none());
}

#[tokio::test]
async fn test_depth_one_fetches_only_seed() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", &["/a"]).await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let crawled = crawler(ExecutorKind::Pooled)
        .run(CrawlOptions::new(format!("{}/", mock_server.uri())).depth(1))
        .await
        .unwrap();

    assert_eq!(crawled.len(), 1);
}

#[tokio::test]
async fn test_each_url_fetched_once() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    for (route, links) in [
        ("/", vec!["/a", "/b", "/"]),
        ("/a", vec!["/", "/b", "/a#top"]),
        ("/b", vec!["/a", "/"]),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(html(&links), "text/html"))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let crawled = crawler(ExecutorKind::Pooled)
        .run(CrawlOptions::new(format!("{}/", base)).depth(5))
        .await
        .unwrap();

    assert_eq!(crawled.len(), 3);
}

#[tokio::test]
async fn test_redirect_target_marked_visited() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .expect(1)
        .mount(&mock_server)
        .await;
    // Fetched once through the redirect, never dispatched on its own
    mount_page(&mock_server, "/new", &["/new", "/old"]).await;

    let outcomes = Outcomes::default();
    let crawler = crawler(ExecutorKind::Pooled);
    let crawled = crawler
        .run(outcomes.attach(CrawlOptions::new(format!("{}/old", base)).depth(3)))
        .await
        .unwrap();

    assert_eq!(crawled, vec![format!("{}/old", base)]);

    let successes = outcomes.successes.lock().unwrap().clone();
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].url, format!("{}/old", base));
    assert_eq!(
        successes[0].response.as_ref().unwrap().url,
        format!("{}/new", base)
    );

    assert_eq!(crawler.page_state(&format!("{}/new", base)), PageState::Visited);
    assert!(crawler
        .state()
        .visited_urls
        .contains(&format!("{}/new", base)));
}

#[tokio::test]
async fn test_non_html_links_not_followed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/notes.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<a href=\"/hidden\">x</a>", "text/plain"),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hidden"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let crawled = crawler(ExecutorKind::Pooled)
        .run(CrawlOptions::new(format!("{}/notes.txt", mock_server.uri())).depth(3))
        .await
        .unwrap();

    assert_eq!(crawled.len(), 1);
}

#[tokio::test]
async fn test_filter_excludes_urls() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_page(&mock_server, "/", &["/keep", "/private/secret"]).await;
    mount_page(&mock_server, "/keep", &[]).await;
    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let crawled = crawler(ExecutorKind::Pooled)
        .run(CrawlOptions::new(format!("{}/", base)).should_crawl(|url| !url.contains("/private/")))
        .await
        .unwrap();

    assert_eq!(
        sorted(crawled),
        vec![format!("{}/", base), format!("{}/keep", base)]
    );
}

#[tokio::test]
async fn test_queued_executor_crawls_in_discovery_order() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_page(&mock_server, "/", &["/one", "/two", "/three"]).await;
    mount_page(&mock_server, "/one", &[]).await;
    mount_page(&mock_server, "/two", &[]).await;
    mount_page(&mock_server, "/three", &[]).await;

    let crawled = crawler(ExecutorKind::Queued)
        .run(CrawlOptions::new(format!("{}/", base)))
        .await
        .unwrap();

    assert_eq!(
        crawled,
        vec![
            format!("{}/", base),
            format!("{}/one", base),
            format!("{}/two", base),
            format!("{}/three", base),
        ]
    );
}

#[tokio::test]
async fn test_finished_callback_and_session_end() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", &[]).await;

    let finished = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&finished);
    let crawler = crawler(ExecutorKind::Pooled);
    let seed = format!("{}/", mock_server.uri());

    let crawled = crawler
        .run(CrawlOptions::new(seed.as_str()).on_finished(move |urls| {
            *sink.lock().unwrap() = Some(urls);
        }))
        .await
        .unwrap();

    assert_eq!(finished.lock().unwrap().clone(), Some(crawled));
    assert!(matches!(
        crawler.crawl(CrawlOptions::new(seed.as_str())),
        Err(crawlspace::CrawlError::SessionFinished)
    ));
}

#[tokio::test]
async fn test_seed_with_fragment_dedups_against_links() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html(&["/"]), "text/html"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let crawled = crawler(ExecutorKind::Pooled)
        .run(CrawlOptions::new(format!("{}/#top", base)).depth(3))
        .await
        .unwrap();

    assert_eq!(crawled, vec![format!("{}/", base)]);
}

#[tokio::test]
async fn test_seed_with_unsorted_query_dedups_against_links() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(html(&["/?a=2&b=1"]), "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let crawled = crawler(ExecutorKind::Pooled)
        .run(CrawlOptions::new(format!("{}/?b=1&a=2", base)).depth(3))
        .await
        .unwrap();

    assert_eq!(crawled, vec![format!("{}/?a=2&b=1", base)]);
}

#[tokio::test]
async fn test_redirect_target_normalized_before_dedup() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/landing?z=1&a=2#intro"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/landing"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(html(&["/landing?a=2&z=1"]), "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let crawler = crawler(ExecutorKind::Pooled);
    let crawled = crawler
        .run(CrawlOptions::new(format!("{}/start", base)).depth(3))
        .await
        .unwrap();

    assert_eq!(crawled, vec![format!("{}/start", base)]);
    assert_eq!(
        crawler.page_state(&format!("{}/landing?a=2&z=1", base)),
        PageState::Visited
    );
}
