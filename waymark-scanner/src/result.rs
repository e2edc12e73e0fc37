// Serializable scan and crawl output. Everything here crosses the
// coordinator/agent boundary, so field names follow the wire contract
// (camelCase) rather than Rust convention.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One clickable candidate found by a scan.
///
/// The `id` is scan-local: it identifies the element only within the scan
/// generation that produced it. Durable identity across scans is the
/// normalized text, never the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDescriptor {
    pub id: String,
    pub tag: String,
    /// Trimmed, at most 100 characters, never empty.
    pub text: String,
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    /// Link labels traversed from the crawl start page to this element's
    /// page. Only present on crawl output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_path: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
}

/// A text/search input reported alongside clickable elements so a
/// coordinator can offer keyword fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchInput {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub input_type: String,
}

/// One hop of a navigation path: the page a link was found on and the
/// link's visible label.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStep {
    pub url: String,
    pub link_text: String,
}

/// A page recorded by the crawler. Immutable once pushed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapEntry {
    pub url: String,
    pub depth: usize,
    pub path: Vec<PathStep>,
    pub elements: Vec<ElementDescriptor>,
}

/// Completed crawl: the sitemap plus every element flattened and
/// annotated with its owning page's depth and navigation path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlOutcome {
    pub crawl_id: Uuid,
    pub pages: Vec<SitemapEntry>,
    pub elements: Vec<ElementDescriptor>,
}

/// Snapshot of crawler activity for status polling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStatus {
    pub in_progress: bool,
    pub page_count: usize,
}
