//! Schema Validator
//!
//! Checks each raw table for its required columns and their kinds before any
//! join runs. Extra columns are ignored. A failing table is reported, never
//! coerced: the report lists every missing column and every kind mismatch,
//! plus the null count of each required column that is present.

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::Serialize;
use smallvec::SmallVec;

use crate::data::SourceTables;
use crate::error::SchemaError;

/// Logical kind a required column must have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    /// String column
    Text,
    /// Any integer or float column
    Numeric,
    /// Any integer column
    Integer,
    /// String, date or datetime column
    Timestamp,
    /// No dtype constraint (e.g. zip prefixes stored as text or number)
    Any,
}

impl ColumnKind {
    /// Whether a polars dtype satisfies this kind
    ///
    /// An all-null column (`DataType::Null`) satisfies every kind.
    pub fn accepts(self, dtype: &DataType) -> bool {
        if matches!(dtype, DataType::Null) {
            return true;
        }
        match self {
            ColumnKind::Text => matches!(dtype, DataType::String),
            ColumnKind::Numeric => is_integer(dtype) || matches!(dtype, DataType::Float32 | DataType::Float64),
            ColumnKind::Integer => is_integer(dtype),
            ColumnKind::Timestamp => {
                matches!(dtype, DataType::String | DataType::Date | DataType::Datetime(_, _))
            }
            ColumnKind::Any => true,
        }
    }
}

fn is_integer(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Required column: name + kind
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn column(name: &'static str, kind: ColumnKind) -> ColumnSpec {
    ColumnSpec { name, kind }
}

/// Named table with its required column set
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub table: &'static str,
    pub columns: &'static [ColumnSpec],
}

pub const ORDERS_SCHEMA: TableSchema = TableSchema {
    table: "orders",
    columns: &[
        column("order_id", ColumnKind::Text),
        column("customer_id", ColumnKind::Text),
        column("order_status", ColumnKind::Text),
        column("order_purchase_timestamp", ColumnKind::Timestamp),
        column("order_delivered_customer_date", ColumnKind::Timestamp),
        column("order_estimated_delivery_date", ColumnKind::Timestamp),
    ],
};

pub const ORDER_ITEMS_SCHEMA: TableSchema = TableSchema {
    table: "order_items",
    columns: &[
        column("order_id", ColumnKind::Text),
        column("order_item_id", ColumnKind::Integer),
        column("product_id", ColumnKind::Text),
        column("price", ColumnKind::Numeric),
        column("freight_value", ColumnKind::Numeric),
    ],
};

pub const PRODUCTS_SCHEMA: TableSchema = TableSchema {
    table: "products",
    columns: &[
        column("product_id", ColumnKind::Text),
        column("product_category_name", ColumnKind::Text),
    ],
};

pub const CUSTOMERS_SCHEMA: TableSchema = TableSchema {
    table: "customers",
    columns: &[
        column("customer_id", ColumnKind::Text),
        column("customer_state", ColumnKind::Text),
        column("customer_zip_code_prefix", ColumnKind::Any),
    ],
};

pub const REVIEWS_SCHEMA: TableSchema = TableSchema {
    table: "reviews",
    columns: &[
        column("review_id", ColumnKind::Text),
        column("order_id", ColumnKind::Text),
        column("review_score", ColumnKind::Integer),
    ],
};

/// Optional review timestamps used for the most-recent-review tie-break
pub const REVIEW_TIMESTAMP_COLUMNS: [&str; 2] = ["review_answer_timestamp", "review_creation_date"];

pub const PAYMENTS_SCHEMA: TableSchema = TableSchema {
    table: "payments",
    columns: &[
        column("order_id", ColumnKind::Text),
        column("payment_sequential", ColumnKind::Integer),
        column("payment_type", ColumnKind::Text),
        column("payment_installments", ColumnKind::Integer),
        column("payment_value", ColumnKind::Numeric),
    ],
};

/// A present column whose dtype does not satisfy its required kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeMismatch {
    pub column: String,
    pub expected: ColumnKind,
    pub actual: String,
}

/// Outcome of validating one table
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub table: String,
    pub row_count: usize,
    pub passed: bool,
    pub missing_columns: SmallVec<[String; 4]>,
    pub type_mismatches: SmallVec<[TypeMismatch; 2]>,
    /// Null count per required column that is present
    pub null_counts: BTreeMap<String, usize>,
}

impl ValidationReport {
    /// One-line description of what failed (empty if passed)
    pub fn describe_failures(&self) -> String {
        let mut parts = Vec::new();
        if !self.missing_columns.is_empty() {
            parts.push(format!("missing columns {:?}", self.missing_columns.as_slice()));
        }
        for mismatch in &self.type_mismatches {
            parts.push(format!(
                "column '{}' expected {:?}, found {}",
                mismatch.column, mismatch.expected, mismatch.actual
            ));
        }
        format!("{}: {}", self.table, parts.join(", "))
    }
}

/// Validate a table against its required columns
///
/// Pure check: the table is not modified and nothing is logged.
pub fn validate_table(df: &DataFrame, schema: &TableSchema) -> ValidationReport {
    let mut missing_columns = SmallVec::new();
    let mut type_mismatches = SmallVec::new();
    let mut null_counts = BTreeMap::new();

    for required in schema.columns {
        let Ok(column) = df.column(required.name) else {
            missing_columns.push(required.name.to_string());
            continue;
        };

        if !required.kind.accepts(column.dtype()) {
            type_mismatches.push(TypeMismatch {
                column: required.name.to_string(),
                expected: required.kind,
                actual: column.dtype().to_string(),
            });
        }

        null_counts.insert(required.name.to_string(), column.null_count());
    }

    ValidationReport {
        table: schema.table.to_string(),
        row_count: df.height(),
        passed: missing_columns.is_empty() && type_mismatches.is_empty(),
        missing_columns,
        type_mismatches,
        null_counts,
    }
}

/// Validate every source table; fails if any table fails
///
/// On success returns all reports (including null counts) so callers can
/// surface data-quality numbers without re-scanning.
pub fn validate_sources(sources: &SourceTables) -> Result<Vec<ValidationReport>, SchemaError> {
    let mut reports = vec![
        validate_table(&sources.orders, &ORDERS_SCHEMA),
        validate_table(&sources.order_items, &ORDER_ITEMS_SCHEMA),
        validate_table(&sources.products, &PRODUCTS_SCHEMA),
        validate_table(&sources.customers, &CUSTOMERS_SCHEMA),
        validate_table(&sources.reviews, &REVIEWS_SCHEMA),
    ];
    if let Some(payments) = &sources.payments {
        reports.push(validate_table(payments, &PAYMENTS_SCHEMA));
    }

    let failures: Vec<ValidationReport> = reports.iter().filter(|r| !r.passed).cloned().collect();
    if !failures.is_empty() {
        return Err(SchemaError::Invalid(failures));
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_table_passes_with_extra_columns() {
        let df = df![
            "product_id" => &["p1", "p2"],
            "product_category_name" => &[Some("toys"), None],
            "product_weight_g" => &[100i64, 200],
        ]
        .unwrap();

        let report = validate_table(&df, &PRODUCTS_SCHEMA);
        assert!(report.passed);
        assert!(report.missing_columns.is_empty());
        assert_eq!(report.null_counts["product_category_name"], 1);
        assert_eq!(report.null_counts["product_id"], 0);
        assert!(!report.null_counts.contains_key("product_weight_g"));
    }

    #[test]
    fn test_missing_column_fails() {
        let df = df![
            "order_id" => &["o1"],
            "price" => &[10.0],
        ]
        .unwrap();

        let report = validate_table(&df, &ORDER_ITEMS_SCHEMA);
        assert!(!report.passed);
        assert_eq!(
            report.missing_columns.as_slice(),
            &["order_item_id".to_string(), "product_id".to_string(), "freight_value".to_string()]
        );
    }

    #[test]
    fn test_wrong_kind_fails() {
        let df = df![
            "order_id" => &["o1"],
            "order_item_id" => &[1i64],
            "product_id" => &["p1"],
            "price" => &["fifty"],
            "freight_value" => &[1.5],
        ]
        .unwrap();

        let report = validate_table(&df, &ORDER_ITEMS_SCHEMA);
        assert!(!report.passed);
        assert_eq!(report.type_mismatches.len(), 1);
        assert_eq!(report.type_mismatches[0].column, "price");
        assert_eq!(report.type_mismatches[0].expected, ColumnKind::Numeric);
        assert!(report.describe_failures().contains("price"));
    }

    #[test]
    fn test_integer_columns_accept_ints_only() {
        assert!(ColumnKind::Integer.accepts(&DataType::Int32));
        assert!(ColumnKind::Integer.accepts(&DataType::UInt8));
        assert!(!ColumnKind::Integer.accepts(&DataType::Float64));
        assert!(ColumnKind::Numeric.accepts(&DataType::Float64));
        assert!(ColumnKind::Timestamp.accepts(&DataType::Date));
        assert!(ColumnKind::Text.accepts(&DataType::Null));
    }
}
