//! The external AI advisor: a chat-completions collaborator whose output is
//! untrusted and whose failures are always recovered by the caller.

mod client;
mod config;
pub mod prompts;

use async_trait::async_trait;

pub use client::ChatAdvisor;
pub use config::{AdvisorConfig, AdvisorConfigError, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use prompts::Prompt;

use crate::error::AdvisorError;

#[async_trait]
pub trait Advisor: Send + Sync {
    /// Send one prompt and return the trimmed reply text.
    async fn complete(&self, prompt: &Prompt) -> Result<String, AdvisorError>;

    fn enabled(&self) -> bool {
        true
    }
}

/// Used when no API key is configured; every call fails with
/// [`AdvisorError::Disabled`] so callers take their fallback path.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledAdvisor;

#[async_trait]
impl Advisor for DisabledAdvisor {
    async fn complete(&self, _prompt: &Prompt) -> Result<String, AdvisorError> {
        Err(AdvisorError::Disabled)
    }

    fn enabled(&self) -> bool {
        false
    }
}
