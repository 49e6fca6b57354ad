//! Run summaries returned by both stages.
//!
//! All types are `Serialize + Deserialize` so the binaries can emit them
//! with `--json` for scripting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to one document during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    /// Document name (PDF stem / image subdirectory name).
    pub name: String,
    /// File written or directory populated.
    pub path: PathBuf,
    /// Pages written.
    pub pages: usize,
    /// Why the document was passed over, if it was.
    pub skipped: Option<String>,
}

/// Result of a stage 1 run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderSummary {
    pub documents: Vec<DocumentReport>,
    pub total_pages: usize,
    pub duration_ms: u64,
}

/// Result of a stage 2 run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractSummary {
    pub documents: Vec<DocumentReport>,
    pub total_pages: usize,
    /// Output files removed by [`crate::config::OutputMode::Rebuild`].
    pub cleared_files: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    /// Rate-limit retries that eventually succeeded.
    pub rate_limit_retries: u32,
    pub duration_ms: u64,
}

impl ExtractSummary {
    /// Documents that produced at least one section.
    pub fn processed_documents(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| d.skipped.is_none())
            .count()
    }

    /// Documents passed over (no images, already extracted).
    pub fn skipped_documents(&self) -> usize {
        self.documents.len() - self.processed_documents()
    }
}
