//! LLM provider layer for Toolrelay.
//!
//! # Architecture
//!
//! - [`traits::LlmProvider`] — trait the agent loop talks to
//! - [`http_provider::HttpProvider`] — OpenAI-compatible HTTP client
//! - [`error::ProviderError`] — transport, status, and decoding failures

pub mod error;
pub mod http_provider;
pub mod traits;

pub use error::ProviderError;
pub use http_provider::HttpProvider;
pub use traits::{LlmProvider, LlmRequestConfig};
