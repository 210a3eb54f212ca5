//! OpenAI-compatible chat completions provider
//!
//! The client also talks to any service exposing the same
//! `chat/completions` surface, which is how the apply engine reaches its
//! merge model.

pub mod chat;
pub mod client;
pub mod types;

pub use chat::{OpenAIChat, DEFAULT_OPENAI_MODEL};
pub use client::OpenAIClient;
