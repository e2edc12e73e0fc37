pub mod crawler;
pub mod dom;
pub mod enumerate;
pub mod error;
pub mod extract;
pub mod result;

pub use crawler::{
    CrawlLimits, CrawlStart, DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES, ProgressCallback, SiteCrawler,
};
pub use dom::{Document, NodeId, Rect};
pub use enumerate::{Binding, EnumerateOptions, Enumeration, enumerate};
pub use error::ScanError;
pub use result::{
    CrawlOutcome, CrawlStatus, ElementDescriptor, PathStep, SearchInput, SitemapEntry,
};
