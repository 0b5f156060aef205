//! Request Orchestration Module
//!
//! Ties sharding, storage and replication together per client operation.
//!
//! ## Core Concepts
//! - **Directory**: The smart orchestration service. Every mutating
//!   operation enters here, gets routed (local vs forwarded), and degrades
//!   to the pending queue when its primary is unreachable.
//! - **Edit routing**: Edits are classified by an explicit state machine
//!   (`EditRoute`) before execution, so the four-way branching is testable
//!   without the HTTP layer.
//! - **Handlers**: The axum layer: form posts for clients, JSON pushes
//!   between nodes, and the HTML listing view.

pub mod directory;
pub mod edit;
pub mod handlers;

#[cfg(test)]
mod tests;
