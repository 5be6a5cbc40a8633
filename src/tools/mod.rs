//! Service tools
//!
//! Validation-at-the-boundary functions behind the MCP server. Each returns
//! a serializable response or an error message.

pub mod detail;
pub mod formulas;
pub mod results;
pub mod status;
pub mod units;
