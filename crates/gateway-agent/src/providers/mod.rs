//! Concrete [`crate::provider::ModelProvider`] implementations.

pub mod anthropic;

pub use anthropic::AnthropicProvider;
