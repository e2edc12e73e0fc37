// Live highlight tracker. Owns the overlay and label nodes and keeps
// them glued to the anchored element by polling its client rect every
// display frame. Pages under guidance mutate freely (accordions expand,
// spinners replace buttons); polling attachment + bounding box per frame
// is the only reliable way to stay locked on without page-specific
// change notifications.

use crate::protocol::TargetDescriptor;
use crate::registry::SharedPage;
use crate::resolve;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::debug;
use waymark_scanner::dom::{NodeId, Rect};

/// Cadence of the tracking loop, one tick per display refresh.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Minimum gap between re-resolution attempts while the anchor is gone.
pub const RERESOLVE_THROTTLE: Duration = Duration::from_millis(500);

const OVERLAY_PADDING: f32 = 8.0;
const LABEL_OFFSET: f32 = 60.0;
const LABEL_WIDTH: f32 = 200.0;
const LABEL_HEIGHT: f32 = 40.0;

pub const OVERLAY_CLASS: &str = "waymark-highlight";
pub const LABEL_CLASS: &str = "waymark-tooltip";

/// One live highlight: the anchored node (a lookup, never ownership),
/// the presentation nodes, and the re-resolution throttle state.
struct HighlightSession {
    target: TargetDescriptor,
    anchored: Option<NodeId>,
    overlay: NodeId,
    label: NodeId,
    last_rect: Option<Rect>,
    last_reresolve: Instant,
}

#[derive(Default)]
struct TrackerInner {
    session: Option<HighlightSession>,
    task: Option<JoinHandle<()>>,
}

/// Idle ⇄ Highlighting state machine over the shared page. At most one
/// session lives at a time; every exit path releases the overlay nodes.
pub struct HighlightTracker {
    page: SharedPage,
    inner: Arc<Mutex<TrackerInner>>,
}

impl HighlightTracker {
    pub fn new(page: SharedPage) -> Self {
        Self {
            page,
            inner: Arc::new(Mutex::new(TrackerInner::default())),
        }
    }

    /// Begin highlighting `target`. Any previous session is cleared
    /// first. Returns false (and stays Idle) when the target cannot be
    /// resolved even after a rescan.
    pub fn start(&self, target: TargetDescriptor, tooltip: &str) -> bool {
        self.clear();

        let mut inner = self.inner.lock().unwrap();
        let mut page = self.page.lock().unwrap();

        let Some(node) = resolve::resolve(&target, &mut page, true) else {
            debug!(target = %target.id, text = %target.text, "highlight target not found");
            return false;
        };

        if !page.doc.is_fully_in_viewport(node) {
            page.doc.scroll_into_view(node);
        }
        let rect = page.doc.client_rect(node);

        let body = page.doc.body();
        let overlay = page.doc.create_element("div");
        page.doc.set_attr(overlay, "class", OVERLAY_CLASS);
        page.doc.append_child(body, overlay);

        let label = page.doc.create_element("div");
        page.doc.set_attr(label, "class", LABEL_CLASS);
        page.doc.set_text(label, tooltip);
        page.doc.append_child(body, label);

        if let Some(rect) = rect {
            page.doc.set_rect(overlay, rect.inflate(OVERLAY_PADDING));
            page.doc.set_rect(label, label_rect(&rect));
        }

        inner.session = Some(HighlightSession {
            target,
            anchored: Some(node),
            overlay,
            label,
            last_rect: rect,
            last_reresolve: Instant::now(),
        });
        drop(page);

        let page = Arc::clone(&self.page);
        let shared = Arc::clone(&self.inner);
        inner.task = Some(tokio::spawn(async move {
            let mut frames = tokio::time::interval(FRAME_INTERVAL);
            frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                frames.tick().await;
                if !frame_tick(&page, &shared) {
                    break;
                }
            }
        }));

        true
    }

    /// Stop tracking and remove all visuals. Synchronous: once this
    /// returns, no frame acts on the page. Safe to call while Idle.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        if let Some(session) = inner.session.take() {
            let mut page = self.page.lock().unwrap();
            page.doc.remove(session.overlay);
            page.doc.remove(session.label);
        }
    }

    /// One-shot click notification from the embedding: clicking the
    /// anchored element ends the session.
    pub fn notify_click(&self, node: NodeId) {
        let hit = {
            let inner = self.inner.lock().unwrap();
            inner
                .session
                .as_ref()
                .is_some_and(|s| s.anchored == Some(node))
        };
        if hit {
            self.clear();
        }
    }

    pub fn is_highlighting(&self) -> bool {
        self.inner.lock().unwrap().session.is_some()
    }

    /// The node the overlay is currently glued to, if any.
    pub fn anchored_node(&self) -> Option<NodeId> {
        self.inner
            .lock()
            .unwrap()
            .session
            .as_ref()
            .and_then(|s| s.anchored)
    }
}

/// One display frame. Returns false once the session is gone so the
/// loop unwinds even if the abort raced a tick.
fn frame_tick(page: &SharedPage, inner: &Arc<Mutex<TrackerInner>>) -> bool {
    let mut inner = inner.lock().unwrap();
    let Some(session) = inner.session.as_mut() else {
        return false;
    };
    let mut page = page.lock().unwrap();
    let state = &mut *page;

    let attached = session
        .anchored
        .is_some_and(|node| state.doc.is_attached(node));
    if !attached && session.last_reresolve.elapsed() >= RERESOLVE_THROTTLE {
        session.last_reresolve = Instant::now();
        match resolve::resolve(&session.target, state, true) {
            Some(node) => {
                debug!(target = %session.target.id, "re-anchored highlight after page mutation");
                session.anchored = Some(node);
            }
            None => {
                // Overlay stays where it was until something resolves
                // again or the session is cleared.
                session.anchored = None;
            }
        }
    }

    if let Some(node) = session.anchored
        && state.doc.is_attached(node)
        && let Some(rect) = state.doc.client_rect(node)
        && session.last_rect != Some(rect)
    {
        session.last_rect = Some(rect);
        state.doc.set_rect(session.overlay, rect.inflate(OVERLAY_PADDING));
        state.doc.set_rect(session.label, label_rect(&rect));
    }

    true
}

fn label_rect(anchor: &Rect) -> Rect {
    Rect::new(
        anchor.x + anchor.width / 2.0 - LABEL_WIDTH / 2.0,
        anchor.y - LABEL_OFFSET,
        LABEL_WIDTH,
        LABEL_HEIGHT,
    )
}
