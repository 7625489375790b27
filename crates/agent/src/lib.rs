//! Agent Runtime - intent resolution and tool dispatch
//!
//! This crate is the core of the serqet gateway. For each user query it:
//! - Loads a bounded window of recent conversation turns as context
//! - Asks the external intent resolver ("brain") for a structured intent
//! - Dispatches a recognised action to a domain record write
//! - Records the user and assistant turns and shapes the reply
//!
//! # Architecture
//!
//! 1. **Context** (`conversation`) - recent turns, re-ordered oldest-first
//! 2. **Intent Resolution** (`brain`) - single bounded HTTP call, no retry
//! 3. **Tool Dispatch** (`tools`) - typed decode of the action payload, then one write
//! 4. **Orchestration** (`runtime`) - ordering and failure isolation across the above
//!
//! # Failure Isolation
//!
//! Only the resolver is a hard dependency. History reads and writes, and tool
//! dispatch, degrade to the resolver's own reply instead of failing the request.

pub mod brain;
pub mod conversation;
pub mod runtime;
pub mod tools;

pub use brain::{HttpIntentClient, IntentClient, IntentClientError};
pub use runtime::{AgentError, AgentReply, AgentRuntime};
pub use tools::{DispatchError, DispatchOutcome, RecordStores, ToolCall, ToolDispatcher};
