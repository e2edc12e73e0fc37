// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler helpers for convenience
pub use handlers::{KeywordResolver, guide_steps, load_cookie_value, score_match};
