// The page agent: one per page context. Owns the shared page state, a
// crawler and a highlight tracker, and answers every coordinator
// request. Failures come back as payloads; nothing here may take the
// hosting page down.

use crate::highlight::HighlightTracker;
use crate::protocol::{AgentRequest, AgentResponse};
use crate::registry::{PageState, SharedPage};
use crate::resolve;
use std::sync::Arc;
use tracing::debug;
use url::Url;
use waymark_scanner::crawler::{CrawlLimits, CrawlStart, SiteCrawler};
use waymark_scanner::dom::{Document, NodeId};
use waymark_scanner::extract::{classify, extract_text};
use waymark_scanner::result::ElementDescriptor;

pub struct PageAgent {
    url: Url,
    page: SharedPage,
    crawler: SiteCrawler,
    tracker: HighlightTracker,
}

impl PageAgent {
    pub fn new(url: Url, doc: Document) -> Self {
        let page = PageState::shared(doc);
        let tracker = HighlightTracker::new(Arc::clone(&page));
        Self {
            url,
            page,
            crawler: SiteCrawler::new(),
            tracker,
        }
    }

    /// Swap in a configured crawler (timeouts, credential cookie,
    /// progress observer).
    pub fn with_crawler(mut self, crawler: SiteCrawler) -> Self {
        self.crawler = crawler;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Shared page state, for the embedding to keep layout and document
    /// mutations current.
    pub fn page(&self) -> SharedPage {
        Arc::clone(&self.page)
    }

    pub fn tracker(&self) -> &HighlightTracker {
        &self.tracker
    }

    /// Handle one coordinator request. Exactly one response per request.
    pub async fn handle(&self, request: AgentRequest) -> AgentResponse {
        match request {
            AgentRequest::EnumerateElements => {
                let mut page = self.page.lock().unwrap();
                let scan = page.rescan();
                debug!(
                    generation = scan.generation,
                    elements = scan.elements.len(),
                    "enumerated live page"
                );
                AgentResponse::Elements {
                    elements: scan.elements,
                    search_inputs: scan.search_inputs,
                }
            }

            AgentRequest::StartCrawl {
                max_depth,
                max_pages,
            } => {
                // Crawl against a snapshot of the live document so the
                // page lock is never held across a fetch.
                let live = self.page.lock().unwrap().doc.clone();
                let result = self
                    .crawler
                    .crawl(
                        CrawlStart {
                            url: self.url.clone(),
                            live: Some(&live),
                        },
                        CrawlLimits {
                            max_depth,
                            max_pages,
                        },
                    )
                    .await;
                match result {
                    Ok(outcome) => AgentResponse::CrawlComplete {
                        crawl_id: outcome.crawl_id,
                        page_count: outcome.pages.len(),
                        pages: outcome.pages,
                        elements: outcome.elements,
                    },
                    Err(e) => AgentResponse::Error {
                        error: e.to_string(),
                    },
                }
            }

            AgentRequest::GetCrawlStatus => {
                let status = self.crawler.status();
                AgentResponse::CrawlStatus {
                    in_progress: status.in_progress,
                    page_count: status.page_count,
                }
            }

            AgentRequest::HighlightTarget { target, tooltip } => AgentResponse::HighlightResult {
                success: self.tracker.start(target, &tooltip),
            },

            AgentRequest::ClearHighlight => {
                self.tracker.clear();
                AgentResponse::ClearResult { success: true }
            }

            AgentRequest::FillSearchInput {
                search_input_id,
                keyword,
            } => self.fill_search_input(&search_input_id, &keyword),
        }
    }

    fn fill_search_input(&self, search_input_id: &str, keyword: &str) -> AgentResponse {
        let mut page = self.page.lock().unwrap();

        let node = page
            .registry
            .lookup(search_input_id)
            .filter(|binding| binding.is_search_input && page.doc.is_attached(binding.node))
            .map(|binding| binding.node)
            .or_else(|| resolve::find_search_input(&page.doc, keyword));

        let Some(node) = node else {
            return AgentResponse::FillResult {
                success: false,
                search_button: None,
            };
        };

        page.doc.set_value(node, keyword);
        let search_button = find_submit_control(&page.doc, node)
            .and_then(|button| describe_control(&page.doc, button, search_input_id));

        AgentResponse::FillResult {
            success: true,
            search_button,
        }
    }
}

/// The submit control inside the filled input's enclosing form, if any.
fn find_submit_control(doc: &Document, input: NodeId) -> Option<NodeId> {
    let form = doc.ancestor_with_tag(input, "form")?;
    doc.descendants(form)
        .into_iter()
        .find(|&node| match doc.tag(node) {
            "button" => matches!(doc.attr(node, "type"), None | Some("submit")),
            "input" => doc.attr(node, "type") == Some("submit"),
            _ => false,
        })
}

fn describe_control(doc: &Document, node: NodeId, input_id: &str) -> Option<ElementDescriptor> {
    let text = extract_text(doc, node);
    if text.is_empty() {
        return None;
    }
    Some(ElementDescriptor {
        id: format!("{input_id}-submit"),
        tag: doc.tag(node).to_string(),
        text,
        element_type: classify(doc, node),
        aria_label: None,
        title: None,
        href: None,
        page_url: None,
        navigation_path: None,
        depth: None,
    })
}
