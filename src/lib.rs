// ABOUTME: Library root for bedrock-keeper - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod backup;
pub mod config;
pub mod console;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod keeper;
pub mod lock;
pub mod notify;
pub mod output;
pub mod process;
pub mod scheduler;
pub mod types;
pub mod update;
