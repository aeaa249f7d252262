use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Router;
use sitesearch_core::SearchEngine;
use sitesearch_crawler::{crawl, CrawlConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone)]
struct Site {
    port: u16,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

fn page(title: &str, text: &str, links: &[&str]) -> Response {
    let anchors: String = links.iter().map(|l| format!(r#"<a href="{l}">link</a>"#)).collect();
    Html(format!("<html><head><title>{title}</title></head><body><p>{text}</p>{anchors}</body></html>"))
        .into_response()
}

async fn site(State(site): State<Site>, uri: Uri) -> Response {
    let now = site.active.fetch_add(1, Ordering::SeqCst) + 1;
    site.peak.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(10)).await;
    let resp = match uri.path() {
        "/" => page(
            "Home",
            "home words",
            &["/a", "/a#frag", "/b", "/missing", "/data.json", "/old", "/away"],
        ),
        "/a" => page("A", "alpha words", &["/deep"]),
        "/b" => page("B", "beta words", &["/"]),
        "/deep" => page("Deep", "deep words", &[]),
        "/data.json" => ([(header::CONTENT_TYPE, "application/json")], r#"{"words":"json"}"#).into_response(),
        "/old" => Redirect::permanent("/a").into_response(),
        // Same server under a different host name.
        "/away" => Redirect::permanent(&format!("http://localhost:{}/offsite", site.port)).into_response(),
        "/offsite" => page("Offsite", "offsite words", &[]),
        _ => (StatusCode::NOT_FOUND, "not found").into_response(),
    };
    site.active.fetch_sub(1, Ordering::SeqCst);
    resp
}

async fn serve_site() -> (String, Site) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let state = Site { port, active: Arc::default(), peak: Arc::default() };
    let app = Router::new().fallback(site).with_state(state.clone());
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (format!("http://127.0.0.1:{port}/"), state)
}

fn config(start: &str) -> CrawlConfig {
    let mut cfg = CrawlConfig::new(start);
    cfg.request_delay_ms = 0;
    cfg.timeout_secs = 5;
    cfg.disallowed_domains = vec!["localhost".into()];
    cfg
}

#[tokio::test]
async fn crawls_breadth_first_and_skips_non_pages() {
    let (start, _) = serve_site().await;
    let mut cfg = config(&start);
    cfg.parallelism = 1;
    let engine = Arc::new(SearchEngine::default());

    let summary = crawl(&cfg, Arc::clone(&engine)).await.unwrap();

    // "/", "/a", "/b", "/deep"; 404, json and both redirects yield nothing new.
    assert_eq!(summary.pages_fetched, 4);
    assert_eq!(summary.pages_indexed, 4);
    assert_eq!(engine.stats().documents, 4);
    assert_eq!(engine.rank("home"), vec![(0, 1)]);
    assert_eq!(engine.rank("alpha"), vec![(1, 1)]);
    assert_eq!(engine.rank("beta"), vec![(2, 1)]);
    assert_eq!(engine.rank("deep"), vec![(3, 1)]);
    assert!(engine.search("json").is_empty());
    assert!(engine.search("found").is_empty());
}

#[tokio::test]
async fn redirect_targets_are_deduped_and_filtered() {
    let (start, _) = serve_site().await;
    let engine = Arc::new(SearchEngine::default());

    crawl(&config(&start), Arc::clone(&engine)).await.unwrap();

    // "/old" lands on "/a", which must be ingested exactly once.
    let alpha = engine.rank("alpha");
    assert_eq!(alpha.len(), 1);
    assert_eq!(alpha[0].1, 1);
    let hits = engine.search("alpha");
    assert_eq!(hits[0].url, format!("{start}a"));
    // "/away" lands on a disallowed host.
    assert!(engine.search("offsite").is_empty());
    assert_eq!(engine.stats().documents, 4);
}

#[tokio::test]
async fn depth_limit_stops_link_following() {
    let (start, _) = serve_site().await;
    let mut cfg = config(&start);
    cfg.max_depth = 2;
    let engine = Arc::new(SearchEngine::default());

    let summary = crawl(&cfg, Arc::clone(&engine)).await.unwrap();

    assert_eq!(summary.pages_fetched, 3);
    assert!(engine.search("deep").is_empty());
    assert_eq!(engine.search("alpha").len(), 1);

    cfg.max_depth = 1;
    let engine = Arc::new(SearchEngine::default());
    let summary = crawl(&cfg, Arc::clone(&engine)).await.unwrap();
    assert_eq!(summary.pages_fetched, 1);
    assert_eq!(engine.stats().documents, 1);
}

#[tokio::test]
async fn parallelism_caps_concurrent_requests() {
    let (start, state) = serve_site().await;
    let mut cfg = config(&start);
    cfg.parallelism = 2;
    let engine = Arc::new(SearchEngine::default());

    let summary = crawl(&cfg, engine).await.unwrap();

    assert_eq!(summary.pages_fetched, 4);
    let peak = state.peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "peak concurrency {peak}");
}
