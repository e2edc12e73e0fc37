// Arena-backed element tree shared by the enumerator, the crawler and the
// resolution/tracking engine. Fetched markup is imported once from scraper's
// parse tree; live documents additionally carry viewport, scroll and
// per-node layout rects maintained by the embedding.

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Handle to a node inside one [`Document`]. Only meaningful for the
/// document that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Axis-aligned box in document coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Grow the box by `by` pixels on every side.
    pub fn inflate(&self, by: f32) -> Rect {
        Rect {
            x: self.x - by,
            y: self.y - by,
            width: self.width + by * 2.0,
            height: self.height + by * 2.0,
        }
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attrs: HashMap<String, String>,
    /// Text directly inside this element (child text nodes, concatenated).
    text: String,
    /// Form value, once written. Falls back to the `value` attribute.
    value: Option<String>,
    rect: Option<Rect>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A parsed HTML document.
///
/// Documents come in two flavors: *detached* trees built from fetched
/// markup (no layout exists, so rects are absent and visibility is not
/// meaningful) and *live* trees standing in for the currently open page,
/// where the embedding keeps rects, viewport and scroll position current.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
    detached: bool,
    viewport: Rect,
    scroll_x: f32,
    scroll_y: f32,
}

const DEFAULT_VIEWPORT: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 1280.0,
    height: 720.0,
};

impl Document {
    /// Parse fetched markup into a detached tree.
    pub fn parse(html: &str) -> Self {
        Self::parse_inner(html, true)
    }

    /// Parse markup as the currently open page. Layout starts empty; the
    /// embedding (or a test) supplies rects via [`Document::set_rect`].
    pub fn parse_live(html: &str) -> Self {
        Self::parse_inner(html, false)
    }

    fn parse_inner(html: &str, detached: bool) -> Self {
        let parsed = Html::parse_document(html);
        let mut doc = Document {
            nodes: Vec::new(),
            root: NodeId(0),
            detached,
            viewport: DEFAULT_VIEWPORT,
            scroll_x: 0.0,
            scroll_y: 0.0,
        };
        doc.root = doc.import_element(None, parsed.root_element());
        doc
    }

    fn import_element(&mut self, parent: Option<NodeId>, el: ElementRef) -> NodeId {
        let id = self.push_node(NodeData {
            tag: el.value().name().to_ascii_lowercase(),
            attrs: el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                .collect(),
            text: String::new(),
            value: None,
            rect: None,
            parent,
            children: Vec::new(),
        });
        for child in el.children() {
            if let Some(child_el) = ElementRef::wrap(child) {
                // Script and style subtrees never render text or controls.
                if matches!(child_el.value().name(), "script" | "style") {
                    continue;
                }
                let child_id = self.import_element(Some(id), child_el);
                self.nodes[id.0].children.push(child_id);
            } else if let Some(t) = child.value().as_text() {
                let data = &mut self.nodes[id.0];
                if !data.text.is_empty() {
                    data.text.push(' ');
                }
                data.text.push_str(&t.text);
            }
        }
        id
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(data);
        id
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `body` element, or the root when the markup has none.
    pub fn body(&self) -> NodeId {
        self.all_elements()
            .find(|&id| self.tag(id) == "body")
            .unwrap_or(self.root)
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.nodes[id.0].tag
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.0].attrs.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        self.nodes[id.0]
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    /// Current form value: an explicit write wins over the `value` attribute.
    pub fn value(&self, id: NodeId) -> Option<&str> {
        let data = &self.nodes[id.0];
        data.value.as_deref().or_else(|| {
            data.attrs.get("value").map(String::as_str)
        })
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) {
        self.nodes[id.0].value = Some(value.to_string());
    }

    pub fn direct_text(&self, id: NodeId) -> &str {
        &self.nodes[id.0].text
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        self.nodes[id.0].text = text.to_string();
    }

    /// Rendered text of the subtree, whitespace-collapsed and trimmed.
    pub fn inner_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        let collapsed: Vec<&str> = out.split_whitespace().collect();
        collapsed.join(" ")
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let data = &self.nodes[id.0];
        if !data.text.is_empty() {
            out.push(' ');
            out.push_str(&data.text);
        }
        for &child in &data.children {
            self.collect_text(child, out);
        }
    }

    /// Bounding box in document coordinates, if layout exists.
    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        self.nodes[id.0].rect
    }

    /// Bounding box relative to the viewport (what the page would report
    /// from a client-rect read).
    pub fn client_rect(&self, id: NodeId) -> Option<Rect> {
        self.nodes[id.0].rect.map(|r| Rect {
            x: r.x - self.scroll_x,
            y: r.y - self.scroll_y,
            ..r
        })
    }

    pub fn set_rect(&mut self, id: NodeId, rect: Rect) {
        self.nodes[id.0].rect = Some(rect);
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = Rect::new(0.0, 0.0, width, height);
    }

    pub fn scroll_to(&mut self, x: f32, y: f32) {
        self.scroll_x = x.max(0.0);
        self.scroll_y = y.max(0.0);
    }

    pub fn scroll_offset(&self) -> (f32, f32) {
        (self.scroll_x, self.scroll_y)
    }

    /// Vertically center the node in the viewport (block: center).
    pub fn scroll_into_view(&mut self, id: NodeId) {
        if let Some(rect) = self.nodes[id.0].rect {
            let target = rect.y + rect.height / 2.0 - self.viewport.height / 2.0;
            self.scroll_y = target.max(0.0);
        }
    }

    pub fn is_fully_in_viewport(&self, id: NodeId) -> bool {
        match self.client_rect(id) {
            Some(rect) => self.viewport.contains(&rect),
            None => false,
        }
    }

    /// A node is attached while its parent chain still reaches the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Every attached element in document (preorder) position.
    pub fn all_elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut order = Vec::new();
        self.preorder(self.root, &mut order);
        order.into_iter()
    }

    fn preorder(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for &child in &self.nodes[id.0].children {
            self.preorder(child, out);
        }
    }

    /// Preorder descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &child in &self.nodes[id.0].children {
            self.preorder(child, &mut out);
        }
        out
    }

    /// Nearest ancestor (excluding the node itself) with the given tag.
    pub fn ancestor_with_tag(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        let mut current = self.nodes[id.0].parent;
        while let Some(node) = current {
            if self.tag(node) == tag {
                return Some(node);
            }
            current = self.nodes[node.0].parent;
        }
        None
    }

    /// Create a floating element. It is not attached until passed to
    /// [`Document::append_child`].
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeData {
            tag: tag.to_ascii_lowercase(),
            attrs: HashMap::new(),
            text: String::new(),
            value: None,
            rect: None,
            parent: None,
            children: Vec::new(),
        })
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Detach a subtree. The handle stays valid but the node (and its
    /// descendants) stop being attached.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
        self.nodes[id.0].parent = None;
    }

    /// Minimal structural lookup: `#id`, `.class`, `[attr=value]`, `tag`,
    /// `tag.class` and `tag#id`. First match in document order wins.
    pub fn select_first(&self, expr: &str) -> Option<NodeId> {
        let expr = expr.trim();
        if expr.is_empty() {
            return None;
        }
        if let Some(rest) = expr.strip_prefix('[') {
            let inner = rest.strip_suffix(']')?;
            let (name, value) = inner.split_once('=')?;
            let value = value.trim_matches('"').trim_matches('\'');
            return self
                .all_elements()
                .find(|&id| self.attr(id, name.trim()) == Some(value));
        }
        let (tag, qualifier) = match expr.find(['#', '.']) {
            Some(0) => (None, &expr[..]),
            Some(pos) => (Some(&expr[..pos]), &expr[pos..]),
            None => (Some(expr), ""),
        };
        self.all_elements().find(|&id| {
            if let Some(tag) = tag
                && self.tag(id) != tag
            {
                return false;
            }
            match qualifier.split_at_checked(1) {
                Some(("#", wanted)) => self.attr(id, "id") == Some(wanted),
                Some((".", wanted)) => self
                    .attr(id, "class")
                    .is_some_and(|c| c.split_whitespace().any(|cls| cls == wanted)),
                _ => true,
            }
        })
    }
}
