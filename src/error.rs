//! Error taxonomy for the sales pipeline
//!
//! Each stage reports its own failures at its boundary:
//! - `SchemaError`: required column missing or of the wrong kind (Validator)
//! - `FactError`: values that break the typed contract during the join (Fact Builder)
//! - `ConfigError`: invalid period or bucket configuration (Period Selector, config)
//! - `RegistryError`: metric registration conflicts
//!
//! The metrics engine itself has no error type: every metric is total over
//! well-formed fact rows and reports degenerate cases as `MetricValue::Undefined`.

use thiserror::Error;

use crate::schema::ValidationReport;

/// Schema validation failed for one or more tables
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema validation failed for {}: {}", table_names(.0), describe_reports(.0))]
    Invalid(Vec<ValidationReport>),
}

fn table_names(reports: &[ValidationReport]) -> String {
    reports
        .iter()
        .map(|r| r.table.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_reports(reports: &[ValidationReport]) -> String {
    reports
        .iter()
        .map(|r| r.describe_failures())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure while building the sales fact table
///
/// No partial table is ever returned alongside one of these.
#[derive(Debug, Error)]
pub enum FactError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("{table}.{column} row {row}: invalid value {value:?} ({reason})")]
    InvalidValue {
        table: &'static str,
        column: &'static str,
        row: usize,
        value: String,
        reason: &'static str,
    },

    #[error("{table}.{column} row {row}: required value is null")]
    MissingValue {
        table: &'static str,
        column: &'static str,
        row: usize,
    },

    #[error("{table}: duplicate key {key:?} in column {column}")]
    DuplicateKey {
        table: &'static str,
        column: &'static str,
        key: String,
    },

    #[error("polars error in {context}: {source}")]
    Polars {
        context: String,
        #[source]
        source: polars::error::PolarsError,
    },
}

/// Invalid analysis configuration, detected before any filtering runs
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be between 1 and 12, got {value}")]
    MonthOutOfRange { field: &'static str, value: u32 },

    #[error("start month {start} is after end month {end}")]
    ReversedMonthRange { start: u32, end: u32 },

    #[error("delivery bucket edges must not be empty")]
    EmptyBucketEdges,

    #[error("delivery bucket edges must start at 0 days, got {0}")]
    BucketEdgesNotFromZero(u32),

    #[error("delivery bucket edges must be strictly increasing: {0:?}")]
    UnorderedBucketEdges(Vec<u32>),

    #[error("top-N cutoff must be at least 1")]
    ZeroTopN,

    #[error("comparison year must differ from the target year ({0})")]
    SameComparisonYear(i32),
}

/// Metric registration conflict
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("metric '{0}' is already registered")]
    Duplicate(String),
}
