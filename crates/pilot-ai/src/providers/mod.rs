//! LLM Provider implementations

pub mod completions;

use crate::{Completion, CompletionOptions, Context, Error, Model, Result};
use async_trait::async_trait;

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Request a single, complete response from the LLM
    async fn complete(
        &self,
        model: &Model,
        context: &Context,
        options: &CompletionOptions,
    ) -> Result<Completion>;
}

/// Read the `retry-after` header as whole seconds
pub(crate) fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Convert a transport error, keeping timeouts distinguishable
pub(crate) fn map_send_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else {
        Error::Http(err)
    }
}
