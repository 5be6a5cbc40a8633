//! MCP server
//!
//! Serves the Baker Ratio tools over stdio.

mod server;

pub use server::BakerRatioService;
