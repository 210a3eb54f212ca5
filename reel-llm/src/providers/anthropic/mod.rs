//! Anthropic messages API provider

pub mod chat;
pub mod client;
pub mod types;

pub use chat::{AnthropicChat, DEFAULT_ANTHROPIC_MODEL};
pub use client::AnthropicClient;
