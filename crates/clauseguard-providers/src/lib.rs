//! Verdict providers: the capability trait, shared prompt and reply
//! parsing, and the Gemini, Mistral, and scripted backends.

pub mod gemini;
pub mod mistral;
pub mod parse;
pub mod prompt;
pub mod provider;
pub mod scripted;

pub use gemini::GeminiProvider;
pub use mistral::MistralProvider;
pub use provider::{CandidateRule, ProviderError, VerdictProvider, VerdictRequest};
pub use scripted::{verdict_reply, ScriptStep, ScriptedProvider};
