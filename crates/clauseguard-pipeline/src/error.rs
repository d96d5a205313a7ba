use clauseguard_index::IndexError;
use thiserror::Error;

/// Document runs fail only when the retrieval index cannot be loaded;
/// everything downstream degrades into per-clause results instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("retrieval unavailable: {0}")]
    Retrieval(#[from] IndexError),
}
