// Bounded-depth sitemap crawler. Strictly sequential BFS: one fetch
// completes before the next begins, which bounds server load and keeps
// traversal order deterministic. The only synchronization is the
// in-progress flag guarding against re-entrant invocation.

use crate::dom::Document;
use crate::enumerate::{Enumeration, EnumerateOptions, enumerate, truncate_chars};
use crate::error::{Result, ScanError};
use crate::result::{CrawlOutcome, CrawlStatus, ElementDescriptor, PathStep, SitemapEntry};
use reqwest::Client;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Reports `(pages_analyzed, max_pages)` after each sitemap entry.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

pub const DEFAULT_MAX_DEPTH: usize = 2;
pub const DEFAULT_MAX_PAGES: usize = 30;

const MAX_LINK_TEXT_LEN: usize = 50;

/// Depth and page bounds for one crawl.
#[derive(Debug, Clone, Copy)]
pub struct CrawlLimits {
    pub max_depth: usize,
    pub max_pages: usize,
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Where a crawl begins. When the start URL is the currently open page,
/// its live document is analyzed directly instead of being re-fetched.
pub struct CrawlStart<'a> {
    pub url: Url,
    pub live: Option<&'a Document>,
}

/// One pending BFS expansion. Consumed exactly once.
struct CrawlTask {
    url: Url,
    depth: usize,
    path: Vec<PathStep>,
}

/// Mutable traversal state scoped to a single crawl invocation: the task
/// queue, the visited set and the in-progress sitemap. Never ambient.
struct CrawlerSession {
    queue: VecDeque<CrawlTask>,
    visited: HashSet<String>,
    pages: Vec<SitemapEntry>,
}

impl CrawlerSession {
    fn new(start_url: Url) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back(CrawlTask {
            url: start_url,
            depth: 0,
            path: Vec::new(),
        });
        Self {
            queue,
            visited: HashSet::new(),
            pages: Vec::new(),
        }
    }
}

/// The crawler itself holds only configuration and status; traversal
/// state lives in a [`CrawlerSession`] per invocation.
pub struct SiteCrawler {
    client: Client,
    timeout_secs: u64,
    in_progress: Arc<AtomicBool>,
    pages_analyzed: Arc<AtomicUsize>,
    progress_callback: Option<ProgressCallback>,
}

impl SiteCrawler {
    pub fn new() -> Self {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self {
            client: build_client(timeout_secs, None),
            timeout_secs,
            in_progress: Arc::new(AtomicBool::new(false)),
            pages_analyzed: Arc::new(AtomicUsize::new(0)),
            progress_callback: None,
        }
    }

    /// Attach a caller-supplied credential sent as a Cookie header on
    /// every fetch, in addition to the cookie store.
    pub fn with_cookie_header(mut self, cookie: &str) -> Self {
        self.client = build_client(self.timeout_secs, Some(cookie));
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn status(&self) -> CrawlStatus {
        CrawlStatus {
            in_progress: self.in_progress.load(Ordering::SeqCst),
            page_count: self.pages_analyzed.load(Ordering::SeqCst),
        }
    }

    /// Breadth-first crawl from `start`, bounded by `limits`.
    ///
    /// Returns [`ScanError::CrawlInProgress`] immediately if another crawl
    /// is running on this crawler; the running crawl is unaffected.
    /// Individual page failures are skipped, never fatal.
    pub async fn crawl(&self, start: CrawlStart<'_>, limits: CrawlLimits) -> Result<CrawlOutcome> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ScanError::CrawlInProgress);
        }
        let _guard = InProgressGuard(self.in_progress.clone());
        self.pages_analyzed.store(0, Ordering::SeqCst);

        let crawl_id = Uuid::new_v4();
        let origin = start.url.origin();
        let start_url = defragment(&start.url);
        info!(
            %crawl_id,
            url = %start_url,
            max_depth = limits.max_depth,
            max_pages = limits.max_pages,
            "starting crawl"
        );

        let mut session = CrawlerSession::new(start_url.clone());

        while session.pages.len() < limits.max_pages {
            let Some(task) = session.queue.pop_front() else {
                break;
            };
            if session.visited.contains(task.url.as_str()) || task.depth > limits.max_depth {
                continue;
            }
            session.visited.insert(task.url.to_string());

            debug!(depth = task.depth, url = %task.url, "analyzing page");
            let Some(scan) = self
                .analyze_page(&task.url, &start_url, start.live, session.pages.len())
                .await
            else {
                continue;
            };

            // Collect eligible destinations before the elements move into
            // the sitemap entry.
            let links: Vec<(Url, String)> = scan
                .elements
                .iter()
                .filter_map(|el| {
                    let href = el.href.as_deref()?;
                    let resolved = defragment(&task.url.join(href).ok()?);
                    (resolved.origin() == origin
                        && !session.visited.contains(resolved.as_str()))
                    .then(|| (resolved, truncate_chars(&el.text, MAX_LINK_TEXT_LEN)))
                })
                .collect();

            session.pages.push(SitemapEntry {
                url: task.url.to_string(),
                depth: task.depth,
                path: task.path.clone(),
                elements: scan.elements,
            });

            for (link, link_text) in links {
                let mut path = task.path.clone();
                path.push(PathStep {
                    url: task.url.to_string(),
                    link_text,
                });
                session.queue.push_back(CrawlTask {
                    url: link,
                    depth: task.depth + 1,
                    path,
                });
            }

            self.pages_analyzed
                .store(session.pages.len(), Ordering::SeqCst);
            if let Some(ref callback) = self.progress_callback {
                callback(session.pages.len(), limits.max_pages);
            }
        }

        info!(%crawl_id, pages = session.pages.len(), "crawl complete");

        let elements = flatten_elements(&session.pages);
        Ok(CrawlOutcome {
            crawl_id,
            pages: session.pages,
            elements,
        })
    }

    /// Analyze one page: the live document directly when it is the open
    /// page, otherwise a credentialed fetch plus static parse. `None`
    /// means "page unreachable" and the crawl moves on.
    async fn analyze_page(
        &self,
        url: &Url,
        start_url: &Url,
        live: Option<&Document>,
        page_index: usize,
    ) -> Option<Enumeration> {
        let options = EnumerateOptions {
            page_index: Some(page_index),
            base_url: Some(url.clone()),
            page_url: Some(url.to_string()),
            ..Default::default()
        };

        if let Some(live) = live
            && url == start_url
        {
            return Some(enumerate(live, &options));
        }

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "fetch failed, skipping page");
                return None;
            }
        };
        if !response.status().is_success() {
            debug!(url = %url, status = %response.status(), "skipping page");
            return None;
        }
        let is_html = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("text/html"));
        if !is_html {
            debug!(url = %url, "not an HTML page, skipping");
            return None;
        }
        let body = response.text().await.ok()?;
        let doc = Document::parse(&body);
        Some(enumerate(&doc, &options))
    }
}

impl Default for SiteCrawler {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the in-progress flag on every exit path.
struct InProgressGuard(Arc<AtomicBool>);

impl Drop for InProgressGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn build_client(timeout_secs: u64, cookie: Option<&str>) -> Client {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = cookie
        && let Ok(value) = HeaderValue::from_str(cookie)
    {
        headers.insert(COOKIE, value);
    }
    Client::builder()
        .user_agent("Waymark/0.2 (+https://github.com/waymarkhq/waymark)")
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .connect_timeout(std::time::Duration::from_secs(timeout_secs.div_ceil(2)))
        .redirect(reqwest::redirect::Policy::limited(5))
        .cookie_store(true)
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}

fn defragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

/// Flatten every page's elements, annotating each with the owning page's
/// depth and the link labels traversed to reach it.
fn flatten_elements(pages: &[SitemapEntry]) -> Vec<ElementDescriptor> {
    pages
        .iter()
        .flat_map(|page| {
            let labels: Vec<String> = page.path.iter().map(|s| s.link_text.clone()).collect();
            page.elements.iter().map(move |el| ElementDescriptor {
                navigation_path: Some(labels.clone()),
                depth: Some(page.depth),
                ..el.clone()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_html(server: &MockServer, route: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/html"),
            )
            .mount(server)
            .await;
    }

    fn start(url: &str) -> CrawlStart<'static> {
        CrawlStart {
            url: Url::parse(url).unwrap(),
            live: None,
        }
    }

    fn limits(max_depth: usize, max_pages: usize) -> CrawlLimits {
        CrawlLimits {
            max_depth,
            max_pages,
        }
    }

    /// Page A links to B, B links to C; with max_depth 1 the crawl yields
    /// exactly A (depth 0) and B (depth 1) and never touches C.
    #[tokio::test]
    async fn depth_bound_stops_before_grandchild_pages() {
        let server = MockServer::start().await;
        mount_html(
            &server,
            "/",
            format!(r#"<body><a href="{}/b">To B</a></body>"#, server.uri()),
        )
        .await;
        mount_html(
            &server,
            "/b",
            format!(r#"<body><a href="{}/c">To C</a></body>"#, server.uri()),
        )
        .await;
        // /c is intentionally unmounted; fetching it would 404 and count
        // as a skipped page, so instead we assert it is never recorded.

        let crawler = SiteCrawler::new();
        let outcome = crawler
            .crawl(start(&server.uri()), limits(1, 30))
            .await
            .unwrap();

        let urls: Vec<&str> = outcome.pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].ends_with('/'));
        assert!(urls[1].ends_with("/b"));
        assert_eq!(outcome.pages[0].depth, 0);
        assert_eq!(outcome.pages[1].depth, 1);
        assert!(outcome.pages.iter().all(|p| p.depth <= 1));
    }

    #[tokio::test]
    async fn page_cap_bounds_the_sitemap() {
        let server = MockServer::start().await;
        let mut root = String::from("<body>");
        for i in 1..=6 {
            root.push_str(&format!(
                r#"<a href="{}/page{}">Page {}</a>"#,
                server.uri(),
                i,
                i
            ));
        }
        root.push_str("</body>");
        mount_html(&server, "/", root).await;
        for i in 1..=6 {
            mount_html(
                &server,
                &format!("/page{i}"),
                "<body><button>Leaf</button></body>".into(),
            )
            .await;
        }

        let crawler = SiteCrawler::new();
        let outcome = crawler
            .crawl(start(&server.uri()), limits(3, 3))
            .await
            .unwrap();
        assert_eq!(outcome.pages.len(), 3);
    }

    #[tokio::test]
    async fn each_url_is_recorded_at_most_once() {
        let server = MockServer::start().await;
        // two different links to /b, and /b links back to the root
        mount_html(
            &server,
            "/",
            format!(
                r#"<body>
                    <a href="{0}/b">First</a>
                    <a href="{0}/b">Second</a>
                </body>"#,
                server.uri()
            ),
        )
        .await;
        mount_html(
            &server,
            "/b",
            format!(r#"<body><a href="{}/">Home</a></body>"#, server.uri()),
        )
        .await;

        let crawler = SiteCrawler::new();
        let outcome = crawler
            .crawl(start(&server.uri()), limits(5, 30))
            .await
            .unwrap();

        let mut urls: Vec<&str> = outcome.pages.iter().map(|p| p.url.as_str()).collect();
        let total = urls.len();
        urls.sort();
        urls.dedup();
        assert_eq!(urls.len(), total);
        assert_eq!(total, 2);
        // first path to /b wins
        assert_eq!(outcome.pages[1].path[0].link_text, "First");
    }

    #[tokio::test]
    async fn single_page_with_no_links_yields_one_entry() {
        let server = MockServer::start().await;
        mount_html(
            &server,
            "/",
            "<body><button>Only control</button></body>".into(),
        )
        .await;

        let crawler = SiteCrawler::new();
        let outcome = crawler
            .crawl(start(&server.uri()), limits(2, 30))
            .await
            .unwrap();
        assert_eq!(outcome.pages.len(), 1);
        assert_eq!(outcome.pages[0].depth, 0);
        assert!(outcome.pages[0].path.is_empty());
        assert_eq!(outcome.elements.len(), 1);
        assert_eq!(outcome.elements[0].depth, Some(0));
    }

    #[tokio::test]
    async fn second_crawl_while_running_is_rejected_and_first_completes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(b"<body><button>Slow</button></body>".to_vec(), "text/html")
                    .set_delay(std::time::Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let crawler = Arc::new(SiteCrawler::new());
        let uri = server.uri();

        let first = {
            let crawler = crawler.clone();
            let uri = uri.clone();
            tokio::spawn(async move { crawler.crawl(start(&uri), limits(1, 30)).await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(crawler.status().in_progress);
        let second = crawler.crawl(start(&uri), limits(1, 30)).await;
        assert!(matches!(second, Err(ScanError::CrawlInProgress)));

        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome.pages.len(), 1);
        assert!(!crawler.status().in_progress);
    }

    #[tokio::test]
    async fn unreachable_pages_are_skipped_without_aborting() {
        let server = MockServer::start().await;
        mount_html(
            &server,
            "/",
            format!(
                r#"<body>
                    <a href="{0}/missing">Broken</a>
                    <a href="{0}/ok">Works</a>
                </body>"#,
                server.uri()
            ),
        )
        .await;
        mount_html(&server, "/ok", "<body><button>Fine</button></body>".into()).await;
        // /missing is unmounted -> 404

        let crawler = SiteCrawler::new();
        let outcome = crawler
            .crawl(start(&server.uri()), limits(2, 30))
            .await
            .unwrap();

        let urls: Vec<&str> = outcome.pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls.len(), 2);
        assert!(!urls.iter().any(|u| u.contains("missing")));
    }

    #[tokio::test]
    async fn fragment_self_and_cross_origin_links_are_never_enqueued() {
        let server = MockServer::start().await;
        mount_html(
            &server,
            "/",
            format!(
                r##"<body>
                    <a href="#section">Jump</a>
                    <a href="{0}/">Self</a>
                    <a href="{0}/#top">Self with fragment</a>
                    <a href="https://elsewhere.example/page">External</a>
                </body>"##,
                server.uri()
            ),
        )
        .await;

        let crawler = SiteCrawler::new();
        let outcome = crawler
            .crawl(start(&server.uri()), limits(3, 30))
            .await
            .unwrap();
        assert_eq!(outcome.pages.len(), 1);
    }

    #[tokio::test]
    async fn progress_is_reported_after_each_page() {
        let server = MockServer::start().await;
        mount_html(
            &server,
            "/",
            format!(r#"<body><a href="{}/next">Next</a></body>"#, server.uri()),
        )
        .await;
        mount_html(&server, "/next", "<body><button>End</button></body>".into()).await;

        let seen: Arc<Mutex<Vec<(usize, usize)>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let crawler =
            SiteCrawler::new().with_progress_callback(Arc::new(move |current, total| {
                seen_clone.lock().unwrap().push((current, total));
            }));

        crawler
            .crawl(start(&server.uri()), limits(2, 30))
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(1, 30), (2, 30)]);
    }

    #[tokio::test]
    async fn flattened_elements_carry_navigation_path_and_depth() {
        let server = MockServer::start().await;
        mount_html(
            &server,
            "/",
            format!(
                r#"<body><a href="{}/products">Products</a></body>"#,
                server.uri()
            ),
        )
        .await;
        mount_html(
            &server,
            "/products",
            "<body><button>Add to cart</button></body>".into(),
        )
        .await;

        let crawler = SiteCrawler::new();
        let outcome = crawler
            .crawl(start(&server.uri()), limits(2, 30))
            .await
            .unwrap();

        let cart = outcome
            .elements
            .iter()
            .find(|el| el.text == "Add to cart")
            .unwrap();
        assert_eq!(cart.depth, Some(1));
        assert_eq!(cart.navigation_path.as_deref(), Some(&["Products".to_string()][..]));
        assert!(cart.id.starts_with("page-1-nav-"));
    }

    #[tokio::test]
    async fn live_document_is_analyzed_without_fetching_the_start_page() {
        let server = MockServer::start().await;
        // the server would answer 500 for the root; the crawl must use the
        // live document instead
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mount_html(&server, "/linked", "<body><button>There</button></body>".into()).await;

        let mut live = Document::parse_live(&format!(
            r#"<body><a href="{}/linked">Follow</a></body>"#,
            server.uri()
        ));
        // live page: give the anchor a layout box so it passes visibility
        let anchor = live.select_first("a").unwrap();
        live.set_rect(anchor, crate::dom::Rect::new(0.0, 0.0, 100.0, 20.0));

        let crawler = SiteCrawler::new();
        let outcome = crawler
            .crawl(
                CrawlStart {
                    url: Url::parse(&format!("{}/", server.uri())).unwrap(),
                    live: Some(&live),
                },
                limits(2, 30),
            )
            .await
            .unwrap();

        let urls: Vec<&str> = outcome.pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls.len(), 2);
        assert!(urls[1].ends_with("/linked"));
        assert_eq!(outcome.pages[0].elements[0].text, "Follow");
    }
}
