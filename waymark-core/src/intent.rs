// Seam to the external intent resolver (the LLM-backed picker). The
// engine only ever sees this trait: a query plus the enumerated
// descriptors in, ranked candidates out.

use crate::protocol::TargetDescriptor;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use waymark_scanner::result::ElementDescriptor;

#[derive(Error, Debug)]
pub enum IntentError {
    #[error("intent resolver unavailable: {0}")]
    Unavailable(String),

    #[error("intent resolver returned malformed output: {0}")]
    Malformed(String),
}

/// One candidate the resolver proposes, best first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentChoice {
    pub target: TargetDescriptor,
    pub confidence: f32,
    /// True when clicking this leads toward the goal rather than being
    /// the goal itself (the user should search again on the next page).
    #[serde(default)]
    pub is_intermediate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub navigation_path: Vec<String>,
}

#[allow(async_fn_in_trait)]
pub trait IntentResolver {
    /// Rank the enumerated elements against the user's query. An empty
    /// vector means "nothing plausible found".
    async fn choose(
        &self,
        query: &str,
        elements: &[ElementDescriptor],
    ) -> Result<Vec<IntentChoice>, IntentError>;
}
