//! Baker Ratio Calculator Library
//!
//! Baker's formulas as fixed ratios to a base ingredient: authoring,
//! exact decimal scaling across metric units, and persistence.

pub mod authoring;
pub mod build_info;
pub mod calculator;
pub mod config;
pub mod db;
pub mod mcp;
pub mod measurement;
pub mod models;
pub mod ordering;
pub mod tools;
