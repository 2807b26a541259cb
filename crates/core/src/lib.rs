//! # scout core
//!
//! Domain types, traits, and error definitions for the scout research
//! assistant. This crate does no I/O; it defines the model every other crate
//! builds on.
//!
//! Every collaborator the agent loop depends on is a trait here:
//! - [`Provider`] turns a transcript into assistant text plus usage
//! - [`Tool`] is one named capability, collected in a [`ToolRegistry`]

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ProviderError, ToolError};
pub use message::{Message, Role, Transcript};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::{Tool, ToolCallRequest, ToolRegistry};
