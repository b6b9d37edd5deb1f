//! Chat-completion client surface for the Amana assistant.
//!
//! Defines the message/request types and the `LlmClient` seam that the
//! classifier and response generator depend on, plus an OpenAI-compatible
//! HTTP client with bounded retries.
mod openai;
mod retry;
mod types;

pub use openai::{OpenAiClient, OpenAiConfig};
pub use types::{AiError, ChatRequest, ChatResponse, ChatUsage, LlmClient, Message, MessageRole};
