// Clickable-element enumeration. One fixed candidate-pattern set serves
// both the live page and detached (fetched) documents; detached trees have
// no layout, so the visibility gate is skipped for them.

use crate::dom::{Document, NodeId};
use crate::extract::{classify, extract_text, is_visible};
use crate::result::{ElementDescriptor, SearchInput};
use tracing::debug;
use url::Url;

const MAX_TEXT_LEN: usize = 100;

/// How scan-local ids are minted for one enumeration pass.
#[derive(Debug, Clone, Default)]
pub struct EnumerateOptions {
    /// Scan generation; ids carry it so stale descriptors are detectable.
    pub generation: u64,
    /// Set by the crawler: ids become `page-{n}-nav-{i}` instead of
    /// `nav-{gen}-{i}`.
    pub page_index: Option<usize>,
    /// Resolve hrefs to absolute form against this URL (fetched pages).
    pub base_url: Option<Url>,
    /// Recorded on every descriptor when analyzing a crawled page.
    pub page_url: Option<String>,
}

/// Binding of a scan-local id to the node it was minted for.
#[derive(Debug, Clone)]
pub struct Binding {
    pub id: String,
    pub node: NodeId,
    /// Text at scan time; resolution re-validates against the live text.
    pub text: String,
    pub is_search_input: bool,
}

/// Result of one enumeration pass over a document.
#[derive(Debug, Clone)]
pub struct Enumeration {
    pub generation: u64,
    pub elements: Vec<ElementDescriptor>,
    pub search_inputs: Vec<SearchInput>,
    /// Element bindings first, in enumeration order, then search inputs.
    pub bindings: Vec<Binding>,
}

/// Scan a document for interactive candidates and emit normalized
/// descriptors. Ids are unique within this pass only.
pub fn enumerate(doc: &Document, options: &EnumerateOptions) -> Enumeration {
    let check_visibility = !doc.is_detached();
    let mut elements = Vec::new();
    let mut search_inputs = Vec::new();
    let mut bindings = Vec::new();
    let mut input_bindings = Vec::new();

    let (mut total, mut invisible, mut no_text) = (0usize, 0usize, 0usize);

    for node in doc.all_elements() {
        if is_clickable_candidate(doc, node) {
            total += 1;
            if check_visibility && !is_visible(doc, node) {
                invisible += 1;
                continue;
            }
            let text = extract_text(doc, node);
            if text.is_empty() {
                no_text += 1;
                continue;
            }
            let text = truncate_chars(&text, MAX_TEXT_LEN);
            let id = match options.page_index {
                Some(page) => format!("page-{}-nav-{}", page, elements.len()),
                None => format!("nav-{}-{}", options.generation, elements.len()),
            };
            bindings.push(Binding {
                id: id.clone(),
                node,
                text: text.clone(),
                is_search_input: false,
            });
            elements.push(ElementDescriptor {
                id,
                tag: doc.tag(node).to_string(),
                text,
                element_type: classify(doc, node),
                aria_label: owned_attr(doc, node, "aria-label"),
                title: owned_attr(doc, node, "title"),
                href: resolved_href(doc, node, options.base_url.as_ref()),
                page_url: options.page_url.clone(),
                navigation_path: None,
                depth: None,
            });
        }

        if is_search_candidate(doc, node) {
            if check_visibility && !is_visible(doc, node) {
                continue;
            }
            let id = format!("search-{}-{}", options.generation, search_inputs.len());
            input_bindings.push(Binding {
                id: id.clone(),
                node,
                text: extract_text(doc, node),
                is_search_input: true,
            });
            search_inputs.push(SearchInput {
                id,
                placeholder: owned_attr(doc, node, "placeholder"),
                name: owned_attr(doc, node, "name"),
                input_type: doc.attr(node, "type").unwrap_or("text").to_string(),
            });
        }
    }

    bindings.extend(input_bindings);

    debug!(
        total,
        invisible,
        no_text,
        passed = elements.len(),
        inputs = search_inputs.len(),
        "enumeration pass complete"
    );

    Enumeration {
        generation: options.generation,
        elements,
        search_inputs,
        bindings,
    }
}

/// The fixed structural pattern set for clickable candidates.
fn is_clickable_candidate(doc: &Document, node: NodeId) -> bool {
    match doc.tag(node) {
        "button" => return true,
        "a" if doc.attr(node, "href").is_some() => return true,
        "input" => {
            if matches!(doc.attr(node, "type"), Some("submit") | Some("button")) {
                return true;
            }
        }
        "label" if doc.attr(node, "for").is_some() => return true,
        _ => {}
    }
    if matches!(
        doc.attr(node, "role"),
        Some("button") | Some("link") | Some("menuitem")
    ) {
        return true;
    }
    if doc.attr(node, "onclick").is_some() {
        return true;
    }
    if let Some(class) = doc.attr(node, "class")
        && class.to_ascii_lowercase().contains("btn")
    {
        // covers both the "btn" and "button" class-name heuristics
        return true;
    }
    doc.attr(node, "tabindex") == Some("0")
}

/// Text-entry inputs offered for keyword fill.
pub fn is_search_candidate(doc: &Document, node: NodeId) -> bool {
    doc.tag(node) == "input"
        && matches!(doc.attr(node, "type"), None | Some("text") | Some("search"))
}

fn owned_attr(doc: &Document, node: NodeId, name: &str) -> Option<String> {
    doc.attr(node, name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn resolved_href(doc: &Document, node: NodeId, base: Option<&Url>) -> Option<String> {
    let href = doc.attr(node, "href")?;
    match base {
        Some(base) => Some(
            base.join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string()),
        ),
        None => Some(href.to_string()),
    }
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Rect;

    const SURFACE: &str = r#"
        <body>
            <button>Order</button>
            <a href="/about">About us</a>
            <input type="submit" value="Send">
            <input type="button" value="Reset">
            <div role="button">Fake button</div>
            <span role="menuitem">Menu entry</span>
            <p onclick="go()">Inline handler</p>
            <div class="primary-btn">Styled</div>
            <label for="agree">I agree</label>
            <span tabindex="0">Focusable</span>
            <div>plain text</div>
            <a href="/empty"></a>
            <input type="search" placeholder="Search products" name="q">
        </body>
    "#;

    fn live_with_rects(html: &str) -> Document {
        let mut doc = Document::parse_live(html);
        let ids: Vec<_> = doc.all_elements().collect();
        for (i, node) in ids.into_iter().enumerate() {
            doc.set_rect(node, Rect::new(0.0, i as f32 * 24.0, 200.0, 20.0));
        }
        doc
    }

    #[test]
    fn every_pattern_in_the_candidate_set_is_picked_up() {
        let doc = live_with_rects(SURFACE);
        let scan = enumerate(&doc, &EnumerateOptions::default());
        let texts: Vec<&str> = scan.elements.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Order",
                "About us",
                "Send",
                "Reset",
                "Fake button",
                "Menu entry",
                "Inline handler",
                "Styled",
                "I agree",
                "Focusable",
            ]
        );
        // the empty-text anchor and the plain div are excluded
        assert!(!texts.iter().any(|t| t.is_empty()));
    }

    #[test]
    fn invisible_candidates_are_skipped_on_live_pages_only() {
        let html = r#"<body>
            <button style="display:none">Ghost</button>
            <button>Real</button>
        </body>"#;

        let mut live = Document::parse_live(html);
        let nodes: Vec<_> = live.all_elements().collect();
        for node in nodes {
            live.set_rect(node, Rect::new(0.0, 0.0, 50.0, 20.0));
        }
        let scan = enumerate(&live, &EnumerateOptions::default());
        assert_eq!(scan.elements.len(), 1);
        assert_eq!(scan.elements[0].text, "Real");

        // detached trees have no layout; the same markup keeps both
        let fetched = Document::parse(html);
        let scan = enumerate(&fetched, &EnumerateOptions::default());
        assert_eq!(scan.elements.len(), 2);
    }

    #[test]
    fn text_is_truncated_to_one_hundred_chars() {
        let long = "x".repeat(300);
        let doc = Document::parse(&format!("<body><button>{long}</button></body>"));
        let scan = enumerate(&doc, &EnumerateOptions::default());
        assert_eq!(scan.elements[0].text.chars().count(), 100);
    }

    #[test]
    fn detached_hrefs_resolve_against_the_page_url() {
        let doc = Document::parse(r#"<body><a href="/deep/page">Go</a></body>"#);
        let options = EnumerateOptions {
            base_url: Some(Url::parse("https://example.com/start").unwrap()),
            page_url: Some("https://example.com/start".into()),
            page_index: Some(2),
            ..Default::default()
        };
        let scan = enumerate(&doc, &options);
        assert_eq!(
            scan.elements[0].href.as_deref(),
            Some("https://example.com/deep/page")
        );
        assert_eq!(scan.elements[0].id, "page-2-nav-0");
        assert_eq!(
            scan.elements[0].page_url.as_deref(),
            Some("https://example.com/start")
        );
    }

    #[test]
    fn search_inputs_are_reported_with_their_own_ids() {
        let doc = live_with_rects(SURFACE);
        let options = EnumerateOptions {
            generation: 7,
            ..Default::default()
        };
        let scan = enumerate(&doc, &options);
        assert_eq!(scan.search_inputs.len(), 1);
        let input = &scan.search_inputs[0];
        assert_eq!(input.id, "search-7-0");
        assert_eq!(input.placeholder.as_deref(), Some("Search products"));
        assert_eq!(input.name.as_deref(), Some("q"));
        assert_eq!(input.input_type, "search");

        // bindings carry elements first, then inputs
        let last = scan.bindings.last().unwrap();
        assert!(last.is_search_input);
        assert_eq!(last.id, "search-7-0");
    }

    #[test]
    fn ids_are_scoped_to_the_generation() {
        let doc = live_with_rects("<body><button>One</button></body>");
        let a = enumerate(
            &doc,
            &EnumerateOptions {
                generation: 1,
                ..Default::default()
            },
        );
        let b = enumerate(
            &doc,
            &EnumerateOptions {
                generation: 2,
                ..Default::default()
            },
        );
        assert_eq!(a.elements[0].id, "nav-1-0");
        assert_eq!(b.elements[0].id, "nav-2-0");
    }
}
