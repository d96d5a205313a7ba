//! Clause input types produced by the extraction stage.
//!
//! Extraction and segmentation happen upstream; the pipeline receives
//! clauses with stable ids, raw text, and a precomputed embedding, and
//! never mutates them.

use serde::{Deserialize, Serialize};

/// A segmented unit of legal text, the atomic unit of verification.
///
/// `id` is unique within its document and stable across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clause {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: ClauseMetadata,
}

/// Positional metadata attached by the extractor. All fields optional;
/// extractors vary in what they recover.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClauseMetadata {
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Extraction output for one document: the unit the pipeline processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub document_id: String,
    pub clauses: Vec<Clause>,
}
