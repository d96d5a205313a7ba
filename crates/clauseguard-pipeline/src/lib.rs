//! Pipeline coordinator wiring retrieval, verification, risk, and
//! anomaly scoring into per-document compliance reports.

mod coordinator;
mod error;
mod health;

pub use coordinator::Coordinator;
pub use error::PipelineError;
pub use health::{HealthStatus, ProviderHealth};
