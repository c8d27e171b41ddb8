//! Semcode MCP Server
//!
//! Model Context Protocol server exposing semantic code search to AI assistants.

pub mod protocol;
mod server;
pub mod tools;

pub use server::{start_server, McpServer};
