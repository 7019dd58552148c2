//! Fact Builder
//!
//! Denormalizes the source tables into one `SalesFact` per order line item:
//!
//! ```text
//! order_items ─┬─ orders (required: orphan items are excluded and counted)
//!              ├─ products (left: "unknown" category when unmatched)
//!              ├─ customers via order (left: "unknown" state when unmatched)
//!              └─ reviews via order (left: most recent review, else null score)
//! ```
//!
//! Lookups are FxHashMap indexes built once per dimension table, so the
//! join is a single pass over the items. The resulting `FactTable` is
//! immutable; rebuilding is the only refresh path.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime};
use polars::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::data::SourceTables;
use crate::error::FactError;
use crate::schema::{self, REVIEW_TIMESTAMP_COLUMNS};
use crate::utils::{f64_values, i64_values, materialize_with_columns, parse_timestamp, text_values};

/// Category for a product row whose category name is missing
pub const UNCLASSIFIED_CATEGORY: &str = "unclassified";

/// Category for an item whose product id has no product row
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// State for an order whose customer is missing or has no state
pub const UNKNOWN_STATE: &str = "unknown";

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Approved,
    Invoiced,
    Processing,
    Shipped,
    Delivered,
    Canceled,
    Unavailable,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Approved => "approved",
            OrderStatus::Invoiced => "invoiced",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(OrderStatus::Created),
            "approved" => Ok(OrderStatus::Approved),
            "invoiced" => Ok(OrderStatus::Invoiced),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "canceled" | "cancelled" => Ok(OrderStatus::Canceled),
            "unavailable" => Ok(OrderStatus::Unavailable),
            _ => Err(()),
        }
    }
}

/// One denormalized sales row (one order line item)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesFact {
    pub order_id: String,
    pub order_item_id: u32,
    pub product_id: String,
    pub customer_id: String,
    pub order_status: OrderStatus,
    /// Item price. Freight is never folded in.
    pub revenue: f64,
    pub freight: f64,
    pub purchase_year: i32,
    /// Calendar month 1-12
    pub purchase_month: u32,
    /// Whole days from purchase to delivery, floored; None if undelivered
    pub delivery_days: Option<i64>,
    /// Delivered on or before the estimate; None if undelivered or no estimate
    pub on_time: Option<bool>,
    pub category: String,
    pub customer_state: String,
    /// Score of the order's most recent review, 1-5
    pub review_score: Option<u8>,
}

/// Immutable sales fact table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactTable {
    rows: Vec<SalesFact>,
}

impl FactTable {
    /// Wrap already-built rows
    pub fn from_rows(rows: Vec<SalesFact>) -> Self {
        FactTable { rows }
    }

    pub fn rows(&self) -> &[SalesFact] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sorted distinct purchase years present in the table
    pub fn available_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self
            .rows
            .iter()
            .map(|r| r.purchase_year)
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect();
        years.sort_unstable();
        years
    }
}

/// Integrity and fill counts from one build
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
    pub input_items: usize,
    pub fact_rows: usize,
    /// Items whose order id is absent from the orders table (excluded)
    pub orphan_items: usize,
    /// Distinct order ids referenced by orphan items, sorted
    pub orphan_order_ids: Vec<String>,
    /// Orphan items whose order id is null (not listed in `orphan_order_ids`)
    pub null_order_id_items: usize,
    /// Items whose product id has no product row (kept as "unknown")
    pub unknown_products: usize,
    /// Items whose order's customer has no customer row (kept as "unknown")
    pub unknown_customers: usize,
    /// Orders with more than one review, resolved to the most recent
    pub multi_review_orders: usize,
    /// Orders delivered before they were purchased (duration left null)
    pub inverted_deliveries: usize,
    /// Repeated product/customer ids (first row kept)
    pub duplicate_dimension_keys: usize,
}

/// Fact table plus the report of how it was built
#[derive(Debug, Clone)]
pub struct FactBuild {
    pub table: FactTable,
    pub report: BuildReport,
}

struct OrderRecord {
    customer_id: Option<String>,
    status: OrderStatus,
    purchased: NaiveDateTime,
    delivered: Option<NaiveDateTime>,
    estimated: Option<NaiveDateTime>,
}

struct ReviewPick {
    score: u8,
    timestamp: Option<NaiveDateTime>,
}

/// Validate all source tables, then build the fact table
pub fn build_from_sources(sources: &SourceTables) -> Result<FactBuild, FactError> {
    schema::validate_sources(sources)?;
    build_sales_facts(
        &sources.orders,
        &sources.order_items,
        &sources.products,
        &sources.customers,
        &sources.reviews,
    )
}

/// Join items → orders → products → customers → reviews into sales facts
///
/// The five tables are validated first; a schema failure aborts before any
/// join. An item with no matching order is the only row ever dropped.
pub fn build_sales_facts(
    orders: &DataFrame,
    items: &DataFrame,
    products: &DataFrame,
    customers: &DataFrame,
    reviews: &DataFrame,
) -> Result<FactBuild, FactError> {
    for (df, table_schema) in [
        (orders, &schema::ORDERS_SCHEMA),
        (items, &schema::ORDER_ITEMS_SCHEMA),
        (products, &schema::PRODUCTS_SCHEMA),
        (customers, &schema::CUSTOMERS_SCHEMA),
        (reviews, &schema::REVIEWS_SCHEMA),
    ] {
        let report = schema::validate_table(df, table_schema);
        if !report.passed {
            return Err(crate::error::SchemaError::Invalid(vec![report]).into());
        }
    }

    let mut report = BuildReport::default();

    let order_index = index_orders(orders)?;
    let product_index = index_products(products, &mut report.duplicate_dimension_keys)?;
    let customer_index = index_customers(customers, &mut report.duplicate_dimension_keys)?;
    let review_index = index_reviews(reviews, &mut report.multi_review_orders)?;

    let items_df = materialize_with_columns(
        items,
        &["order_id", "order_item_id", "product_id", "price", "freight_value"],
        "order_items",
    )?;
    let item_orders = text_values(&items_df, "order_id", "order_items")?;
    let item_seqs = i64_values(&items_df, "order_item_id", "order_items")?;
    let item_products = text_values(&items_df, "product_id", "order_items")?;
    let prices = f64_values(&items_df, "price", "order_items")?;
    let freights = f64_values(&items_df, "freight_value", "order_items")?;

    report.input_items = items_df.height();

    let mut orphan_ids: FxHashSet<String> = FxHashSet::default();
    let mut inverted_orders: FxHashSet<&str> = FxHashSet::default();
    let mut rows = Vec::with_capacity(items_df.height());

    for idx in 0..items_df.height() {
        // Orphans: no order id, or an id absent from orders
        let raw_order_id = item_orders[idx].as_deref();
        let Some((order_id, order)) = raw_order_id.and_then(|id| order_index.get_key_value(id)) else {
            report.orphan_items += 1;
            match raw_order_id {
                Some(id) => {
                    orphan_ids.insert(id.to_string());
                }
                None => report.null_order_id_items += 1,
            }
            continue;
        };

        let order_item_id = match item_seqs[idx] {
            Some(seq) => u32::try_from(seq).map_err(|_| FactError::InvalidValue {
                table: "order_items",
                column: "order_item_id",
                row: idx,
                value: seq.to_string(),
                reason: "item sequence must be a non-negative 32-bit integer",
            })?,
            None => return Err(missing("order_items", "order_item_id", idx)),
        };
        let revenue = prices[idx].ok_or_else(|| missing("order_items", "price", idx))?;
        let freight = freights[idx].ok_or_else(|| missing("order_items", "freight_value", idx))?;

        let product_id = item_products[idx].clone().unwrap_or_default();
        let category = match product_index.get(product_id.as_str()) {
            Some(Some(name)) => name.clone(),
            Some(None) => UNCLASSIFIED_CATEGORY.to_string(),
            None => {
                report.unknown_products += 1;
                UNKNOWN_CATEGORY.to_string()
            }
        };

        let customer_state = match order.customer_id.as_deref().and_then(|c| customer_index.get(c)) {
            Some(Some(state)) => state.clone(),
            Some(None) => UNKNOWN_STATE.to_string(),
            None => {
                report.unknown_customers += 1;
                UNKNOWN_STATE.to_string()
            }
        };

        let (delivery_days, on_time) = match order.delivered {
            Some(delivered) if delivered < order.purchased => {
                inverted_orders.insert(order_id.as_str());
                (None, None)
            }
            Some(delivered) => (
                // non-negative, so truncation is the floor
                Some((delivered - order.purchased).num_days()),
                order.estimated.map(|estimated| delivered <= estimated),
            ),
            None => (None, None),
        };

        rows.push(SalesFact {
            order_id: order_id.clone(),
            order_item_id,
            product_id,
            customer_id: order.customer_id.clone().unwrap_or_default(),
            order_status: order.status,
            revenue,
            freight,
            purchase_year: order.purchased.year(),
            purchase_month: order.purchased.month(),
            delivery_days,
            on_time,
            category,
            customer_state,
            review_score: review_index.get(order_id.as_str()).map(|r| r.score),
        });
    }

    report.fact_rows = rows.len();
    report.inverted_deliveries = inverted_orders.len();
    let mut orphan_order_ids: Vec<String> = orphan_ids.into_iter().collect();
    orphan_order_ids.sort_unstable();
    report.orphan_order_ids = orphan_order_ids;

    if report.orphan_items > 0 {
        tracing::warn!(
            "Excluded {} order items referencing {} unknown order ids",
            report.orphan_items,
            report.orphan_order_ids.len()
        );
    }
    if report.unknown_products > 0 || report.unknown_customers > 0 {
        tracing::debug!(
            "Filled {} unknown products and {} unknown customers",
            report.unknown_products,
            report.unknown_customers
        );
    }
    tracing::info!(
        "Built sales fact table: {} rows from {} items",
        report.fact_rows,
        report.input_items
    );

    Ok(FactBuild {
        table: FactTable::from_rows(rows),
        report,
    })
}

fn missing(table: &'static str, column: &'static str, row: usize) -> FactError {
    FactError::MissingValue { table, column, row }
}

fn parse_optional_timestamp(
    raw: Option<&str>,
    table: &'static str,
    column: &'static str,
    row: usize,
) -> Result<Option<NaiveDateTime>, FactError> {
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_timestamp(s).map(Some).ok_or_else(|| FactError::InvalidValue {
            table,
            column,
            row,
            value: s.to_string(),
            reason: "unparseable timestamp",
        }),
    }
}

/// order_id → order record; duplicate ids are fatal
fn index_orders(orders: &DataFrame) -> Result<FxHashMap<String, OrderRecord>, FactError> {
    let df = materialize_with_columns(
        orders,
        &[
            "order_id",
            "customer_id",
            "order_status",
            "order_purchase_timestamp",
            "order_delivered_customer_date",
            "order_estimated_delivery_date",
        ],
        "orders",
    )?;
    let ids = text_values(&df, "order_id", "orders")?;
    let customers = text_values(&df, "customer_id", "orders")?;
    let statuses = text_values(&df, "order_status", "orders")?;
    let purchased = text_values(&df, "order_purchase_timestamp", "orders")?;
    let delivered = text_values(&df, "order_delivered_customer_date", "orders")?;
    let estimated = text_values(&df, "order_estimated_delivery_date", "orders")?;

    let mut index = FxHashMap::default();
    index.reserve(df.height());

    for idx in 0..df.height() {
        let id = ids[idx].clone().ok_or_else(|| missing("orders", "order_id", idx))?;

        let status_raw = statuses[idx]
            .as_deref()
            .ok_or_else(|| missing("orders", "order_status", idx))?;
        let status = status_raw.parse::<OrderStatus>().map_err(|_| FactError::InvalidValue {
            table: "orders",
            column: "order_status",
            row: idx,
            value: status_raw.to_string(),
            reason: "unknown order status",
        })?;

        let purchased = parse_optional_timestamp(
            purchased[idx].as_deref(),
            "orders",
            "order_purchase_timestamp",
            idx,
        )?
        .ok_or_else(|| missing("orders", "order_purchase_timestamp", idx))?;

        let record = OrderRecord {
            customer_id: customers[idx].clone(),
            status,
            purchased,
            delivered: parse_optional_timestamp(
                delivered[idx].as_deref(),
                "orders",
                "order_delivered_customer_date",
                idx,
            )?,
            estimated: parse_optional_timestamp(
                estimated[idx].as_deref(),
                "orders",
                "order_estimated_delivery_date",
                idx,
            )?,
        };

        if index.insert(id.clone(), record).is_some() {
            return Err(FactError::DuplicateKey {
                table: "orders",
                column: "order_id",
                key: id,
            });
        }
    }

    Ok(index)
}

/// Build key → optional attribute lookup; first row wins on duplicates
fn index_dimension(
    df: &DataFrame,
    key_col: &'static str,
    value_col: &'static str,
    context: &'static str,
    duplicates: &mut usize,
) -> Result<FxHashMap<String, Option<String>>, FactError> {
    let projected = materialize_with_columns(df, &[key_col, value_col], context)?;
    let keys = text_values(&projected, key_col, context)?;
    let values = text_values(&projected, value_col, context)?;

    let mut index: FxHashMap<String, Option<String>> = FxHashMap::default();
    for (key, value) in keys.into_iter().zip(values) {
        let Some(key) = key else { continue };
        let value = value.filter(|v| !v.trim().is_empty());
        if index.contains_key(&key) {
            *duplicates += 1;
            continue;
        }
        index.insert(key, value);
    }

    Ok(index)
}

fn index_products(
    products: &DataFrame,
    duplicates: &mut usize,
) -> Result<FxHashMap<String, Option<String>>, FactError> {
    index_dimension(products, "product_id", "product_category_name", "products", duplicates)
}

fn index_customers(
    customers: &DataFrame,
    duplicates: &mut usize,
) -> Result<FxHashMap<String, Option<String>>, FactError> {
    index_dimension(customers, "customer_id", "customer_state", "customers", duplicates)
}

/// order_id → most recent review
///
/// Recency is the answer timestamp if the column exists, else the creation
/// date, else file order. Ties go to the later row, as do reviews without a
/// timestamp when compared against each other.
fn index_reviews(
    reviews: &DataFrame,
    multi_review_orders: &mut usize,
) -> Result<FxHashMap<String, ReviewPick>, FactError> {
    let timestamp_col = REVIEW_TIMESTAMP_COLUMNS.into_iter().find(|name| {
        reviews
            .column(name)
            .map(|c| schema::ColumnKind::Timestamp.accepts(c.dtype()))
            .unwrap_or(false)
    });

    let mut columns = vec!["order_id", "review_score"];
    if let Some(ts) = timestamp_col {
        columns.push(ts);
    }
    let df = materialize_with_columns(reviews, &columns, "reviews")?;
    let order_ids = text_values(&df, "order_id", "reviews")?;
    let scores = i64_values(&df, "review_score", "reviews")?;
    let timestamps = match timestamp_col {
        Some(ts) => text_values(&df, ts, "reviews")?,
        None => vec![None; df.height()],
    };

    let mut index: FxHashMap<String, ReviewPick> = FxHashMap::default();
    let mut multi: FxHashSet<String> = FxHashSet::default();

    for idx in 0..df.height() {
        let Some(order_id) = order_ids[idx].clone() else { continue };
        // A review row without a score carries nothing to aggregate
        let Some(raw_score) = scores[idx] else { continue };
        let score = u8::try_from(raw_score)
            .ok()
            .filter(|s| (1..=5).contains(s))
            .ok_or_else(|| FactError::InvalidValue {
                table: "reviews",
                column: "review_score",
                row: idx,
                value: raw_score.to_string(),
                reason: "review score must be within 1-5",
            })?;
        // Unparseable review timestamps only lose their tie-break weight
        let timestamp = timestamps[idx].as_deref().and_then(parse_timestamp);
        let pick = ReviewPick { score, timestamp };

        match index.get_mut(&order_id) {
            Some(current) => {
                multi.insert(order_id);
                let newer = match (pick.timestamp, current.timestamp) {
                    (Some(new), Some(old)) => new >= old,
                    (Some(_), None) => true,
                    (None, Some(_)) => false,
                    (None, None) => true,
                };
                if newer {
                    *current = pick;
                }
            }
            None => {
                index.insert(order_id, pick);
            }
        }
    }

    *multi_review_orders = multi.len();
    Ok(index)
}
