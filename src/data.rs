//! Data Loading and Management
//!
//! Holds the six normalized e-commerce tables as polars DataFrames and loads
//! them from the standard CSV export layout. Everything downstream of this
//! module works on already-loaded in-memory tables.

use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::Serialize;

/// File names of the standard dataset export
pub const ORDERS_FILE: &str = "orders_dataset.csv";
pub const ORDER_ITEMS_FILE: &str = "order_items_dataset.csv";
pub const PRODUCTS_FILE: &str = "products_dataset.csv";
pub const CUSTOMERS_FILE: &str = "customers_dataset.csv";
pub const REVIEWS_FILE: &str = "order_reviews_dataset.csv";
pub const PAYMENTS_FILE: &str = "order_payments_dataset.csv";

/// Raw source tables for one load
///
/// Payments are optional: nothing in the fact table depends on them, they
/// are validated when present.
#[derive(Debug, Clone)]
pub struct SourceTables {
    /// One row per order (status, timestamps, customer)
    pub orders: DataFrame,

    /// One row per order line item (price, freight, product)
    pub order_items: DataFrame,

    /// Product master data (category)
    pub products: DataFrame,

    /// Customer master data (state, zip prefix)
    pub customers: DataFrame,

    /// Order reviews (score, timestamps)
    pub reviews: DataFrame,

    /// Order payments
    pub payments: Option<DataFrame>,
}

/// Per-table summary for data-quality reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub table: &'static str,
    pub rows: usize,
    pub columns: Vec<String>,
    pub null_values: usize,
}

impl SourceTables {
    /// Load all datasets from a directory of CSV files
    ///
    /// The five core files are required; a missing payments file is logged
    /// and skipped.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        tracing::info!("Loading datasets from {}", dir.display());

        let orders = Self::load_csv(&dir.join(ORDERS_FILE))?;
        let order_items = Self::load_csv(&dir.join(ORDER_ITEMS_FILE))?;
        let products = Self::load_csv(&dir.join(PRODUCTS_FILE))?;
        let customers = Self::load_csv(&dir.join(CUSTOMERS_FILE))?;
        let reviews = Self::load_csv(&dir.join(REVIEWS_FILE))?;

        let payments_path = dir.join(PAYMENTS_FILE);
        let payments = if payments_path.exists() {
            Some(Self::load_csv(&payments_path)?)
        } else {
            tracing::warn!("{} not found, skipping payments", payments_path.display());
            None
        };

        let tables = SourceTables {
            orders,
            order_items,
            products,
            customers,
            reviews,
            payments,
        };

        for summary in tables.summary() {
            tracing::info!("  {}: {} rows, {} columns", summary.table, summary.rows, summary.columns.len());
        }

        Ok(tables)
    }

    /// Load one CSV file with a header row
    fn load_csv(path: &Path) -> Result<DataFrame> {
        CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.into()))
            .with_context(|| format!("Failed to create CSV reader: {}", path.display()))?
            .finish()
            .with_context(|| format!("Failed to load CSV: {}", path.display()))
    }

    /// Row count, column names and total null count for each loaded table
    pub fn summary(&self) -> Vec<TableSummary> {
        let mut tables: Vec<(&'static str, &DataFrame)> = vec![
            ("orders", &self.orders),
            ("order_items", &self.order_items),
            ("products", &self.products),
            ("customers", &self.customers),
            ("reviews", &self.reviews),
        ];
        if let Some(payments) = &self.payments {
            tables.push(("payments", payments));
        }

        tables
            .into_iter()
            .map(|(table, df)| TableSummary {
                table,
                rows: df.height(),
                columns: df.get_column_names().iter().map(|s| s.to_string()).collect(),
                null_values: df.get_columns().iter().map(|c| c.null_count()).sum(),
            })
            .collect()
    }
}
