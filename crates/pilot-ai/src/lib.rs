//! pilot-ai: clients for the remote services the assistant talks to
//!
//! This crate provides an OpenAI-compatible chat completions provider
//! (Mistral by default), a Tavily web search client and a SendGrid mail client.

pub mod error;
pub mod mail;
pub mod models;
pub mod providers;
pub mod search;
pub mod types;

#[cfg(test)]
mod test_server;

pub use error::{Error, Result};
pub use types::*;
