//! Anthropic Messages API client.
//!
//! This crate provides:
//! - Free-text and structured (JSON schema) chat calls
//! - Prompt caching via ephemeral cache hints, with a process-wide
//!   registry of known cache prefixes
//! - Bounded in-flight concurrency and retry with backoff + jitter
//! - Token usage and dollar-cost accounting

pub mod cache;
pub mod client;
pub mod cost;
pub mod error;
pub mod parse;

pub use cache::{PromptCacheRegistry, PromptCacheStats};
pub use client::{ChatRequest, ChatResponse, LlmClient, LlmConfig, StopReason};
pub use cost::{rates_for_model, CostReport, ModelRates, SegmentCost, TokenUsage};
pub use error::{LlmError, LlmResult};
pub use parse::extract_json;
