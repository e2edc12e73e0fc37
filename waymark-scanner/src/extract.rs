// Visibility and label extraction. These run on every candidate of every
// scan, so they stay pure and cheap: one rect read, no tree rewrites.

use crate::dom::{Document, NodeId};

/// Whether a live node renders at all. Hidden when display is suppressed
/// (inline `display:none` or the `hidden` attribute), visibility is
/// hidden, opacity is zero, or the layout box has no area.
pub fn is_visible(doc: &Document, node: NodeId) -> bool {
    if doc.attr(node, "hidden").is_some() {
        return false;
    }
    if let Some(style) = doc.attr(node, "style") {
        if style_property(style, "display") == Some("none") {
            return false;
        }
        if style_property(style, "visibility") == Some("hidden") {
            return false;
        }
        if let Some(opacity) = style_property(style, "opacity")
            && opacity.parse::<f32>().is_ok_and(|v| v == 0.0)
        {
            return false;
        }
    }
    match doc.client_rect(node) {
        Some(rect) => rect.width > 0.0 && rect.height > 0.0,
        None => false,
    }
}

/// Human-readable label for a node. Strict priority order: accessible
/// label, tooltip, rendered text, form value, image alternative text.
/// Empty string when none of them yield anything.
pub fn extract_text(doc: &Document, node: NodeId) -> String {
    if let Some(label) = non_empty(doc.attr(node, "aria-label")) {
        return label;
    }
    if let Some(title) = non_empty(doc.attr(node, "title")) {
        return title;
    }
    let inner = doc.inner_text(node);
    if !inner.trim().is_empty() {
        return inner.trim().to_string();
    }
    if let Some(value) = non_empty(doc.value(node)) {
        return value;
    }
    if let Some(alt) = non_empty(doc.attr(node, "alt")) {
        return alt;
    }
    String::new()
}

/// Interaction type of a node: explicit role, else tag-derived.
pub fn classify(doc: &Document, node: NodeId) -> String {
    if let Some(role) = non_empty(doc.attr(node, "role")) {
        return role;
    }
    match doc.tag(node) {
        "a" => "link".to_string(),
        "button" => "button".to_string(),
        "input" => match doc.attr(node, "type") {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => "input".to_string(),
        },
        tag => tag.to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Look up one declaration in an inline style string.
fn style_property<'a>(style: &'a str, name: &str) -> Option<&'a str> {
    style.split(';').find_map(|decl| {
        let (key, value) = decl.split_once(':')?;
        (key.trim().eq_ignore_ascii_case(name)).then(|| value.trim())
    })
}
