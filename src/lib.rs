//! E-commerce Sales Metrics
//!
//! Builds a denormalized sales fact table from normalized order, item,
//! product, customer and review tables, then derives business KPIs for a
//! target period against a comparison period.
//!
//! Module layout:
//! - `data`: source tables and CSV loading with Polars
//! - `schema`: required-column validation per table
//! - `facts`: the Fact Builder (joins, derived time and delivery features)
//! - `period`: target/comparison slicing of the fact table
//! - `metrics/`: pure KPI functions and the metric registry
//! - `analyzer`: coordinator running the whole pipeline
//! - `utils/`: polars extraction helpers, timestamp parsing

pub mod utils;
pub mod error;
pub mod data;
pub mod schema;
pub mod facts;
pub mod period;
pub mod config;
pub mod metrics;
pub mod analyzer;

// Re-export commonly used types
pub use analyzer::SalesAnalyzer;
pub use config::AnalysisConfig;
pub use data::SourceTables;
pub use error::{ConfigError, FactError, RegistryError, SchemaError};
pub use facts::{build_from_sources, build_sales_facts, BuildReport, FactBuild, FactTable, OrderStatus, SalesFact};
pub use metrics::*;
pub use period::{select_periods, FactSubset, MonthRange, PeriodSlices, PeriodWindow};
pub use schema::{validate_sources, validate_table, ValidationReport};
