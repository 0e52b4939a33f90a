//! MCP tool server in front of the NanoGPT REST gateway.
//!
//! Each tool call becomes one HTTP request (two for the video fallback) and
//! the JSON reply is flattened into a single text block.

pub mod config;
pub mod gateway;
pub mod mcp_gateway;
pub mod tools;
