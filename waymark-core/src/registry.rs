// Shared page state: the live document plus the scan registry that maps
// scan-local ids back to nodes. Ids are only trusted within the
// generation that minted them; everything else re-validates by text.

use std::sync::{Arc, Mutex};
use waymark_scanner::dom::Document;
use waymark_scanner::enumerate::{Binding, EnumerateOptions, Enumeration, enumerate};

/// The most recent enumeration of the live page, tagged with a
/// monotonically increasing scan generation.
#[derive(Debug, Default)]
pub struct ScanRegistry {
    generation: u64,
    latest: Option<Enumeration>,
}

impl ScanRegistry {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Reserve the next scan generation.
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Replace the registry contents with a fresh enumeration. Bindings
    /// from older generations are gone: their ids can no longer resolve.
    pub fn record(&mut self, scan: Enumeration) {
        self.latest = Some(scan);
    }

    pub fn latest(&self) -> Option<&Enumeration> {
        self.latest.as_ref()
    }

    pub fn lookup(&self, id: &str) -> Option<&Binding> {
        self.bindings().iter().find(|b| b.id == id)
    }

    pub fn bindings(&self) -> &[Binding] {
        self.latest
            .as_ref()
            .map(|scan| scan.bindings.as_slice())
            .unwrap_or(&[])
    }
}

/// One page context: the document and its scan registry, locked together
/// so a scan can never bind ids against a document it did not see.
#[derive(Debug)]
pub struct PageState {
    pub doc: Document,
    pub registry: ScanRegistry,
}

pub type SharedPage = Arc<Mutex<PageState>>;

impl PageState {
    pub fn new(doc: Document) -> Self {
        Self {
            doc,
            registry: ScanRegistry::default(),
        }
    }

    pub fn shared(doc: Document) -> SharedPage {
        Arc::new(Mutex::new(Self::new(doc)))
    }

    /// Enumerate the document under a fresh generation and record the
    /// result. Returns a clone of the enumeration for the caller.
    pub fn rescan(&mut self) -> Enumeration {
        let options = EnumerateOptions {
            generation: self.registry.next_generation(),
            ..Default::default()
        };
        let scan = enumerate(&self.doc, &options);
        self.registry.record(scan.clone());
        scan
    }
}
