//! Integration test suite for chatbot-updater
//!
//! End-to-end tests of the update workflows against scripted mirrors, real
//! local git repositories and the compiled binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **update_flow**: checking for updates, mirror degradation, operator commands
//! - **rollback**: failed applies restore the tree byte for byte
//! - **scheduler**: due checks, notifications and persisted state
//! - **git_transport**: `GitCli` against real repositories
//! - **cli**: the `chatbot-updater` binary

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cli;
mod git_transport;
mod rollback;
mod scheduler;
mod update_flow;
