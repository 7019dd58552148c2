//! Revenue metrics: totals, average order value, year-over-year growth
//!
//! AOV is always computed at order granularity: item revenues are summed per
//! distinct order first, then averaged over orders. Averaging item rows
//! directly would overstate AOV for multi-item orders.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::metrics::value::{growth_between, growth_pct, mean, MetricValue};
use crate::period::FactSubset;

/// Revenue totals for one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueSummary {
    /// Sum of item prices (freight excluded)
    pub total_revenue: f64,
    /// Distinct orders
    pub total_orders: usize,
    /// Line items
    pub total_items: usize,
    /// Mean order-level revenue
    pub average_order_value: MetricValue,
    /// Sum of freight values
    pub total_freight: f64,
    /// Revenue plus freight, reported separately from revenue
    pub gross_revenue_with_freight: f64,
}

/// Target vs comparison revenue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueComparison {
    pub target: RevenueSummary,
    pub comparison: RevenueSummary,
    pub revenue_growth_pct: MetricValue,
    pub order_growth_pct: MetricValue,
    pub aov_growth_pct: MetricValue,
}

/// Sum of item revenue
pub fn total_revenue(subset: &FactSubset<'_>) -> f64 {
    subset.iter().map(|r| r.revenue).sum()
}

/// Sum of freight
pub fn total_freight(subset: &FactSubset<'_>) -> f64 {
    subset.iter().map(|r| r.freight).sum()
}

/// Revenue per distinct order id
pub fn order_revenues<'a>(subset: &FactSubset<'a>) -> FxHashMap<&'a str, f64> {
    let mut orders: FxHashMap<&'a str, f64> = FxHashMap::default();
    for row in subset.iter() {
        *orders.entry(row.order_id.as_str()).or_insert(0.0) += row.revenue;
    }
    orders
}

/// Average order value over distinct orders
pub fn average_order_value(subset: &FactSubset<'_>) -> MetricValue {
    let orders = order_revenues(subset);
    mean(orders.values().sum(), orders.len())
}

/// Mean item price (per line item, not an order value)
pub fn average_item_price(subset: &FactSubset<'_>) -> MetricValue {
    mean(total_revenue(subset), subset.len())
}

/// Revenue summary for one period
pub fn summarize_revenue(subset: &FactSubset<'_>) -> RevenueSummary {
    let orders = order_revenues(subset);
    let total_revenue = total_revenue(subset);
    let total_freight = total_freight(subset);

    RevenueSummary {
        total_revenue,
        total_orders: orders.len(),
        total_items: subset.len(),
        average_order_value: mean(orders.values().sum(), orders.len()),
        total_freight,
        gross_revenue_with_freight: total_revenue + total_freight,
    }
}

/// Year-over-year revenue, order-count and AOV growth
pub fn compare_revenue(target: &FactSubset<'_>, comparison: &FactSubset<'_>) -> RevenueComparison {
    let target = summarize_revenue(target);
    let comparison = summarize_revenue(comparison);

    RevenueComparison {
        revenue_growth_pct: growth_pct(target.total_revenue, comparison.total_revenue),
        order_growth_pct: growth_pct(target.total_orders as f64, comparison.total_orders as f64),
        aov_growth_pct: growth_between(target.average_order_value, comparison.average_order_value),
        target,
        comparison,
    }
}
