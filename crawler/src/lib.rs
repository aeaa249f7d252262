use anyhow::{Context, Result};
use clap::Args;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use reqwest::{header, Client};
use scraper::{Html, Selector};
use sitesearch_core::{PageOutcome, SearchEngine};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::sleep;
use url::Url;

lazy_static! {
    static ref SEL_TITLE: Selector = Selector::parse("title").expect("valid selector");
    static ref SEL_BLOCKS: Selector =
        Selector::parse("p,h1,h2,h3,h4,h5,h6,ul,ol,td").expect("valid selector");
    static ref SEL_LINKS: Selector = Selector::parse("a[href]").expect("valid selector");
}

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Args, Debug, Clone)]
pub struct CrawlConfig {
    /// Page the crawl starts from
    #[arg(long, env = "START_URL")]
    pub start_url: String,
    /// Maximum link depth; 0 is unlimited, 1 only fetches the start page
    #[arg(long, env = "MAX_DEPTH", default_value_t = 0)]
    pub max_depth: usize,
    /// Comma separated hosts to restrict the crawl to
    #[arg(long, env = "ALLOWED_DOMAINS", value_delimiter = ',')]
    pub allowed_domains: Vec<String>,
    /// Comma separated hosts never to fetch
    #[arg(long, env = "DISALLOWED_DOMAINS", value_delimiter = ',')]
    pub disallowed_domains: Vec<String>,
    /// Number of pages fetched concurrently
    #[arg(long, env = "PARALLELISM", default_value_t = 100)]
    pub parallelism: usize,
    /// Pause before each request, in milliseconds
    #[arg(long, env = "REQUEST_DELAY_MS", default_value_t = 5)]
    pub request_delay_ms: u64,
    #[arg(long, env = "USER_AGENT", default_value = "sitesearch/0.1")]
    pub user_agent: String,
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 12)]
    pub timeout_secs: u64,
}

impl CrawlConfig {
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            max_depth: 0,
            allowed_domains: Vec::new(),
            disallowed_domains: Vec::new(),
            parallelism: 100,
            request_delay_ms: 5,
            user_agent: "sitesearch/0.1".into(),
            timeout_secs: 12,
        }
    }

    pub fn allows_host(&self, host: &str) -> bool {
        let listed = |list: &[String]| list.iter().any(|d| d.trim().eq_ignore_ascii_case(host));
        if listed(&self.disallowed_domains) {
            return false;
        }
        let restricted = self.allowed_domains.iter().any(|d| !d.trim().is_empty());
        !restricted || listed(&self.allowed_domains)
    }

    /// The start page is depth 1.
    pub fn allows_depth(&self, depth: usize) -> bool {
        self.max_depth == 0 || depth <= self.max_depth
    }

    pub fn should_visit(&self, url: &Url, depth: usize) -> bool {
        matches!(url.scheme(), "http" | "https")
            && url.host_str().is_some_and(|h| self.allows_host(h))
            && self.allows_depth(depth)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CrawlSummary {
    pub pages_fetched: usize,
    pub pages_indexed: usize,
    pub failures: usize,
    pub elapsed: Duration,
}

/// Result of feeding one HTML page into the engine.
#[derive(Debug)]
pub struct PageScan {
    pub outcome: PageOutcome,
    pub links: Vec<Url>,
}

/// Url with the fragment dropped, used as the document key and for dedupe.
pub fn page_key(url: &Url) -> String {
    let mut u = url.clone();
    u.set_fragment(None);
    u.to_string()
}

/// Emit the title and every text block of `html` as page events for `url`,
/// signal completion, and return the absolute http(s) links found.
pub fn ingest_html(engine: &SearchEngine, url: &Url, html: &str) -> PageScan {
    let key = page_key(url);
    let doc = Html::parse_document(html);
    for title in doc.select(&SEL_TITLE) {
        let text = title.text().collect::<String>();
        engine.observe_title(&key, text.trim());
    }
    for block in doc.select(&SEL_BLOCKS) {
        let text = block.text().collect::<String>();
        engine.observe_text(&key, &text);
    }
    let outcome = engine.finish_page(&key);

    let links = doc
        .select(&SEL_LINKS)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| url.join(href).ok())
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .collect();
    PageScan { outcome, links }
}

/// State shared between the crawl loop and its fetch tasks.
struct Crawler {
    client: Client,
    config: CrawlConfig,
    engine: Arc<SearchEngine>,
    /// Page keys already claimed for fetching or ingestion.
    seen: Mutex<HashSet<String>>,
}

impl Crawler {
    /// Claim `url` for this crawl; false if filtered out or already claimed.
    fn claim(&self, url: &Url, depth: usize) -> bool {
        self.config.should_visit(url, depth) && self.seen.lock().insert(page_key(url))
    }
}

/// Crawl breadth first from `config.start_url`, feeding every page into
/// `engine`. Returns once the frontier is exhausted.
pub async fn crawl(config: &CrawlConfig, engine: Arc<SearchEngine>) -> Result<CrawlSummary> {
    let start = Url::parse(&config.start_url)
        .with_context(|| format!("invalid start url {:?}", config.start_url))?;
    let client = Client::builder()
        .user_agent(config.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    let crawler = Arc::new(Crawler {
        client,
        config: config.clone(),
        engine,
        seen: Mutex::new(HashSet::new()),
    });
    let delay = Duration::from_millis(config.request_delay_ms);
    let started = Instant::now();
    tracing::info!(
        start = %start,
        max_depth = config.max_depth,
        parallelism = config.parallelism,
        "crawl started"
    );

    let mut frontier: VecDeque<(Url, usize)> = VecDeque::from([(start, 1)]);
    let mut inflight: JoinSet<(Url, usize, Result<Option<PageScan>>)> = JoinSet::new();
    let mut summary = CrawlSummary::default();

    loop {
        while inflight.len() < config.parallelism.max(1) {
            let Some((url, depth)) = frontier.pop_front() else { break };
            if !crawler.claim(&url, depth) {
                continue;
            }
            let crawler = Arc::clone(&crawler);
            inflight.spawn(async move {
                sleep(delay).await;
                let scan = crawler.visit(&url, depth).await;
                (url, depth, scan)
            });
        }

        let Some(joined) = inflight.join_next().await else { break };
        match joined {
            Ok((_, depth, Ok(Some(scan)))) => {
                summary.pages_fetched += 1;
                if matches!(scan.outcome, PageOutcome::Indexed { .. }) {
                    summary.pages_indexed += 1;
                }
                if config.allows_depth(depth + 1) {
                    frontier.extend(scan.links.into_iter().map(|l| (l, depth + 1)));
                }
            }
            Ok((_, _, Ok(None))) => {}
            Ok((url, _, Err(err))) => {
                summary.failures += 1;
                tracing::warn!(url = %url, error = %err, "error processing page");
            }
            Err(err) => {
                summary.failures += 1;
                tracing::warn!(error = %err, "crawl task failed");
            }
        }
    }

    summary.elapsed = started.elapsed();
    tracing::info!(
        fetched = summary.pages_fetched,
        indexed = summary.pages_indexed,
        failures = summary.failures,
        elapsed_s = summary.elapsed.as_secs_f64(),
        "crawl finished"
    );
    Ok(summary)
}

impl Crawler {
    /// Fetch one page. `Ok(None)` for non-success or non-html responses, and
    /// for redirects landing on a filtered or already claimed url.
    async fn visit(&self, url: &Url, depth: usize) -> Result<Option<PageScan>> {
        tracing::debug!(url = %url, "processing");
        let resp = self.client.get(url.clone()).send().await?;
        // Index under the final url, which must pass the same filters.
        let final_url = resp.url().clone();
        if page_key(&final_url) != page_key(url) && !self.claim(&final_url, depth) {
            tracing::debug!(url = %url, target = %final_url, "redirect target skipped");
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Ok(None);
        }
        if let Some(ct) = resp.headers().get(header::CONTENT_TYPE) {
            if !ct.to_str().unwrap_or_default().starts_with("text/html") {
                return Ok(None);
            }
        }
        let bytes = resp.bytes().await?;
        if bytes.len() > MAX_BODY_BYTES {
            return Ok(None);
        }
        let body = String::from_utf8_lossy(&bytes);
        Ok(Some(ingest_html(&self.engine, &final_url, &body)))
    }
}
