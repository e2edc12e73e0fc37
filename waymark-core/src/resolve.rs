// Element resolution: maps a (possibly stale) target descriptor back
// onto a live node. Ordered fallback, first match wins; the only side
// effect ever permitted is the single re-scan when everything misses.
//
// Matching is deliberately fuzzy: generated ids are unstable across
// re-renders, so bidirectional substring containment on extracted text
// is the durable identity. It is a heuristic, not a guarantee; when two
// elements' texts contain each other, enumeration order decides.

use crate::protocol::TargetDescriptor;
use crate::registry::PageState;
use tracing::debug;
use waymark_scanner::dom::{Document, NodeId};
use waymark_scanner::enumerate::is_search_candidate;
use waymark_scanner::extract::extract_text;

/// Resolve `target` against the page. With `allow_rescan`, a miss
/// triggers one re-enumeration (fresh generation) and a single retry.
pub fn resolve(target: &TargetDescriptor, page: &mut PageState, allow_rescan: bool) -> Option<NodeId> {
    if let Some(node) = resolve_once(target, page) {
        return Some(node);
    }
    if allow_rescan {
        debug!(target = %target.id, "resolution miss, re-scanning once");
        page.rescan();
        return resolve_once(target, page);
    }
    None
}

fn resolve_once(target: &TargetDescriptor, page: &PageState) -> Option<NodeId> {
    // 1. Scan-local id, accepted only while the live text still agrees.
    //    Guards against a re-render handing the id to a different node.
    if let Some(binding) = page.registry.lookup(&target.id)
        && page.doc.is_attached(binding.node)
        && texts_compatible(&extract_text(&page.doc, binding.node), &target.text)
    {
        return Some(binding.node);
    }

    // 2. Precise structural hint, when the descriptor carries one.
    if let Some(selector) = target.selector.as_deref()
        && let Some(node) = page.doc.select_first(selector)
    {
        return Some(node);
    }

    // 3. Search-style inputs match by placeholder/name.
    if target.is_search_input
        && let Some(node) = find_search_input(&page.doc, &target.text)
    {
        return Some(node);
    }

    // 4. Any previously enumerated node whose current text matches.
    page.registry
        .bindings()
        .iter()
        .find(|binding| {
            page.doc.is_attached(binding.node)
                && texts_compatible(&extract_text(&page.doc, binding.node), &target.text)
        })
        .map(|binding| binding.node)
}

/// Locate a text/search input for `hint`: exact placeholder/name match,
/// then substring containment, then the first such input on the page.
pub fn find_search_input(doc: &Document, hint: &str) -> Option<NodeId> {
    let inputs: Vec<NodeId> = doc
        .all_elements()
        .filter(|&node| is_search_candidate(doc, node))
        .collect();

    let needle = hint.trim().to_lowercase();
    if !needle.is_empty() {
        if let Some(&node) = inputs.iter().find(|&&node| {
            attr_lower(doc, node, "placeholder").as_deref() == Some(needle.as_str())
                || attr_lower(doc, node, "name").as_deref() == Some(needle.as_str())
        }) {
            return Some(node);
        }
        if let Some(&node) = inputs.iter().find(|&&node| {
            attr_contains(doc, node, "placeholder", &needle)
                || attr_contains(doc, node, "name", &needle)
        }) {
            return Some(node);
        }
    }
    inputs.first().copied()
}

/// Bidirectional, case-insensitive substring containment. Empty strings
/// never match anything.
pub fn texts_compatible(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

fn attr_lower(doc: &Document, node: NodeId, name: &str) -> Option<String> {
    doc.attr(node, name).map(|v| v.trim().to_lowercase())
}

fn attr_contains(doc: &Document, node: NodeId, name: &str, needle: &str) -> bool {
    match attr_lower(doc, node, name) {
        Some(value) if !value.is_empty() => value.contains(needle) || needle.contains(&value),
        _ => false,
    }
}
