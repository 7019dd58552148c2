//! Operational KPIs: fulfillment, delivery time, status mix
//!
//! Evaluated per distinct order. "Delivered" means status `delivered`;
//! delivery-time averages only use orders that carry a delivery duration.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::facts::{OrderStatus, SalesFact};
use crate::metrics::value::{mean, ratio, MetricValue};
use crate::period::FactSubset;

/// Operational metrics for one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationalMetrics {
    pub total_orders: usize,
    pub delivered_orders: usize,
    /// delivered orders / distinct orders
    pub fulfillment_rate: MetricValue,
    /// canceled orders / distinct orders
    pub cancellation_rate: MetricValue,
    /// on-time deliveries / deliveries with a known estimate
    pub on_time_rate: MetricValue,
    pub average_delivery_days: MetricValue,
    /// Status → distinct order count
    pub status_distribution: BTreeMap<String, usize>,
}

fn first_row_per_order<'a>(subset: &FactSubset<'a>) -> FxHashMap<&'a str, &'a SalesFact> {
    let mut orders = FxHashMap::default();
    for row in subset.iter() {
        orders.entry(row.order_id.as_str()).or_insert(row);
    }
    orders
}

/// Status → distinct order count
pub fn status_distribution(subset: &FactSubset<'_>) -> BTreeMap<String, usize> {
    let mut distribution = BTreeMap::new();
    for row in first_row_per_order(subset).values() {
        *distribution.entry(row.order_status.as_str().to_string()).or_insert(0) += 1;
    }
    distribution
}

/// Mean delivery duration in days over delivered orders
pub fn average_delivery_days(subset: &FactSubset<'_>) -> MetricValue {
    let durations: Vec<i64> = first_row_per_order(subset)
        .values()
        .filter_map(|r| r.delivery_days)
        .collect();
    mean(durations.iter().map(|&d| d as f64).sum(), durations.len())
}

/// Fulfillment, cancellation, on-time rate, delivery time and status mix
pub fn operational_metrics(subset: &FactSubset<'_>) -> OperationalMetrics {
    let orders = first_row_per_order(subset);
    let total_orders = orders.len();

    let mut delivered_orders = 0usize;
    let mut canceled_orders = 0usize;
    let mut with_estimate = 0usize;
    let mut on_time = 0usize;
    let mut days_sum = 0.0;
    let mut days_count = 0usize;
    let mut status_distribution: BTreeMap<String, usize> = BTreeMap::new();

    for row in orders.values() {
        *status_distribution
            .entry(row.order_status.as_str().to_string())
            .or_insert(0) += 1;

        match row.order_status {
            OrderStatus::Delivered => delivered_orders += 1,
            OrderStatus::Canceled => canceled_orders += 1,
            _ => {}
        }

        if let Some(days) = row.delivery_days {
            days_sum += days as f64;
            days_count += 1;
        }
        if let Some(flag) = row.on_time {
            with_estimate += 1;
            if flag {
                on_time += 1;
            }
        }
    }

    OperationalMetrics {
        total_orders,
        delivered_orders,
        fulfillment_rate: ratio(delivered_orders as f64, total_orders as f64),
        cancellation_rate: ratio(canceled_orders as f64, total_orders as f64),
        on_time_rate: ratio(on_time as f64, with_estimate as f64),
        average_delivery_days: mean(days_sum, days_count),
        status_distribution,
    }
}
