//! Provider construction from flags and environment.

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use clauseguard_core::Compliance;
use clauseguard_providers::{
    verdict_reply, GeminiProvider, MistralProvider, ScriptStep, ScriptedProvider, VerdictProvider,
};

#[derive(Args, Debug)]
pub struct ProviderArgs {
    /// Comma-separated provider priority order.
    #[arg(long, default_value = "gemini,mistral", value_delimiter = ',')]
    pub providers: Vec<String>,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Mistral API key.
    #[arg(long, env = "MISTRAL_API_KEY", hide_env_values = true)]
    pub mistral_api_key: Option<String>,

    /// Replace live providers with a deterministic offline stand-in;
    /// every clause comes back undetermined.
    #[arg(long)]
    pub offline: bool,
}

impl ProviderArgs {
    /// Build the provider order the orchestrator will consult.
    pub fn build(&self) -> Result<Vec<Arc<dyn VerdictProvider>>> {
        if self.offline {
            return Ok(vec![Arc::new(ScriptedProvider::with_script(
                "offline",
                vec![ScriptStep::Reply(verdict_reply(
                    Compliance::Undetermined,
                    0.0,
                    "offline mode; no live verification",
                    &[],
                ))],
            ))]);
        }

        let mut providers: Vec<Arc<dyn VerdictProvider>> = Vec::new();
        for name in &self.providers {
            match name.trim() {
                "gemini" => {
                    let Some(key) = &self.gemini_api_key else {
                        bail!("provider 'gemini' requires --gemini-api-key or GEMINI_API_KEY");
                    };
                    providers.push(Arc::new(GeminiProvider::new(key.clone())));
                }
                "mistral" => {
                    let Some(key) = &self.mistral_api_key else {
                        bail!("provider 'mistral' requires --mistral-api-key or MISTRAL_API_KEY");
                    };
                    providers.push(Arc::new(MistralProvider::new(key.clone())));
                }
                other => bail!("unknown provider '{other}' (expected gemini or mistral)"),
            }
        }
        if providers.is_empty() {
            bail!("no providers configured");
        }
        Ok(providers)
    }
}
