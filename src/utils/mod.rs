//! Utility modules for the sales pipeline
//!
//! Contains shared functionality used by the validator and the fact builder:
//! - LazyFrame helpers: column projection and typed extraction from polars tables
//! - Timestamps: parsing of purchase/delivery/review timestamps

pub mod lazy_helpers;
pub mod timestamps;

// Re-export commonly used helpers
pub use lazy_helpers::{materialize_with_columns, text_values, f64_values, i64_values};
pub use timestamps::parse_timestamp;
