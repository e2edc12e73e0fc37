// Message contract between the background coordinator and the page
// agent. Every request gets exactly one response; field casing follows
// the extension wire format (camelCase, SCREAMING_SNAKE_CASE tags).

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use waymark_scanner::crawler::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES};
use waymark_scanner::result::{ElementDescriptor, SearchInput, SitemapEntry};

/// Session-boundary identity of "the element the user should click".
/// Carried across scan lifetimes, so resolution never trusts the id
/// alone: text is the durable part.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDescriptor {
    pub id: String,
    pub text: String,
    /// Optional precise lookup expression (`#id`, `.class`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default)]
    pub is_search_input: bool,
}

impl TargetDescriptor {
    pub fn from_element(el: &ElementDescriptor) -> Self {
        Self {
            id: el.id.clone(),
            text: el.text.clone(),
            selector: None,
            is_search_input: false,
        }
    }

    pub fn from_search_input(input: &SearchInput) -> Self {
        Self {
            id: input.id.clone(),
            text: input
                .placeholder
                .clone()
                .or_else(|| input.name.clone())
                .unwrap_or_default(),
            selector: None,
            is_search_input: true,
        }
    }
}

/// Requests the coordinator may send to the page agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum AgentRequest {
    EnumerateElements,
    StartCrawl {
        #[serde(default = "default_max_depth")]
        max_depth: usize,
        #[serde(default = "default_max_pages")]
        max_pages: usize,
    },
    GetCrawlStatus,
    HighlightTarget {
        target: TargetDescriptor,
        tooltip: String,
    },
    ClearHighlight,
    FillSearchInput {
        search_input_id: String,
        keyword: String,
    },
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

/// Responses from the page agent. Failure is always a payload, never a
/// panic across the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum AgentResponse {
    Elements {
        elements: Vec<ElementDescriptor>,
        search_inputs: Vec<SearchInput>,
    },
    CrawlComplete {
        crawl_id: Uuid,
        pages: Vec<SitemapEntry>,
        elements: Vec<ElementDescriptor>,
        page_count: usize,
    },
    CrawlStatus {
        in_progress: bool,
        page_count: usize,
    },
    HighlightResult {
        success: bool,
    },
    ClearResult {
        success: bool,
    },
    FillResult {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        search_button: Option<ElementDescriptor>,
    },
    Error {
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_crawl_defaults_match_the_extension() {
        let req: AgentRequest = serde_json::from_str(r#"{"type":"START_CRAWL"}"#).unwrap();
        match req {
            AgentRequest::StartCrawl {
                max_depth,
                max_pages,
            } => {
                assert_eq!(max_depth, 2);
                assert_eq!(max_pages, 30);
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn requests_round_trip_with_wire_casing() {
        let req = AgentRequest::FillSearchInput {
            search_input_id: "search-1-0".into(),
            keyword: "station".into(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""type":"FILL_SEARCH_INPUT""#));
        assert!(json.contains(r#""searchInputId""#));
        let back: AgentRequest = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, AgentRequest::FillSearchInput { .. }));
    }

    #[test]
    fn target_descriptor_uses_camel_case_fields() {
        let target = TargetDescriptor {
            id: "nav-1-3".into(),
            text: "로그인".into(),
            selector: None,
            is_search_input: false,
        };
        let json = serde_json::to_string(&target).unwrap();
        assert!(json.contains(r#""isSearchInput":false"#));
        assert!(!json.contains("selector"));
    }
}
