use thiserror::Error;

/// Any of these makes the whole retrieval index unusable, which is fatal
/// for a pipeline run rather than per-clause.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("regulation corpus not found: {}", .0.display())]
    CorpusNotFound(std::path::PathBuf),

    #[error("corpus line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("rule '{rule_id}' embedding has {got} dims, corpus uses {expected}")]
    DimensionMismatch {
        rule_id: String,
        got: usize,
        expected: usize,
    },

    #[error("io error reading corpus: {0}")]
    Io(#[from] std::io::Error),
}
