//! Retrieval layer: the in-memory regulation index and cosine search.

mod corpus;
mod error;

pub use corpus::RegulationIndex;
pub use error::IndexError;
