//! Monthly revenue trends
//!
//! One point per calendar month that has sales, ascending. Month-over-month
//! growth pairs each point with the previous *present* month; gaps are not
//! filled with zeros.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::metrics::value::{growth_between, growth_pct, mean, MetricValue};
use crate::period::FactSubset;

/// Revenue, orders and AOV for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
    /// Calendar month 1-12
    pub month: u32,
    pub revenue: f64,
    pub orders: usize,
    pub average_order_value: MetricValue,
    /// Growth vs the previous present month; undefined for the first point
    pub revenue_growth_pct: MetricValue,
    pub order_growth_pct: MetricValue,
    pub aov_growth_pct: MetricValue,
}

/// Monthly series for a subset (at most 12 points)
pub fn monthly_trends(subset: &FactSubset<'_>) -> Vec<MonthlyPoint> {
    let mut by_month: BTreeMap<u32, FxHashMap<&str, f64>> = BTreeMap::new();
    for row in subset.iter() {
        *by_month
            .entry(row.purchase_month)
            .or_default()
            .entry(row.order_id.as_str())
            .or_insert(0.0) += row.revenue;
    }

    let mut points: Vec<MonthlyPoint> = Vec::with_capacity(by_month.len());
    for (month, orders) in by_month {
        let revenue: f64 = orders.values().sum();
        let average_order_value = mean(revenue, orders.len());

        let (revenue_growth_pct, order_growth_pct, aov_growth_pct) = match points.last() {
            Some(prev) => (
                growth_pct(revenue, prev.revenue),
                growth_pct(orders.len() as f64, prev.orders as f64),
                growth_between(average_order_value, prev.average_order_value),
            ),
            None => (MetricValue::Undefined, MetricValue::Undefined, MetricValue::Undefined),
        };

        points.push(MonthlyPoint {
            month,
            revenue,
            orders: orders.len(),
            average_order_value,
            revenue_growth_pct,
            order_growth_pct,
            aov_growth_pct,
        });
    }

    points
}

/// Revenue per month as (month, revenue) pairs
pub fn monthly_revenue(subset: &FactSubset<'_>) -> Vec<(u32, f64)> {
    monthly_trends(subset)
        .into_iter()
        .map(|p| (p.month, p.revenue))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::{fact, subset};
    use approx::assert_relative_eq;

    #[test]
    fn test_points_are_sorted_and_grouped() {
        let rows = vec![
            fact("o3", 1, 40.0, 2023, 3),
            fact("o1", 1, 10.0, 2023, 1),
            fact("o1", 2, 10.0, 2023, 1),
            fact("o2", 1, 30.0, 2023, 1),
        ];
        let points = monthly_trends(&subset(&rows, 2023));

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].month, 1);
        assert_relative_eq!(points[0].revenue, 50.0);
        assert_eq!(points[0].orders, 2);
        assert_eq!(points[0].average_order_value, MetricValue::Value(25.0));
        assert_eq!(points[1].month, 3);
    }

    #[test]
    fn test_growth_skips_missing_months() {
        let rows = vec![
            fact("o1", 1, 100.0, 2023, 1),
            fact("o2", 1, 150.0, 2023, 3),
            fact("o3", 1, 75.0, 2023, 4),
        ];
        let points = monthly_trends(&subset(&rows, 2023));

        assert_eq!(points[0].revenue_growth_pct, MetricValue::Undefined);
        // March compares against January, the previous present month
        assert_relative_eq!(points[1].revenue_growth_pct.value().unwrap(), 50.0, epsilon = 1e-9);
        assert_relative_eq!(points[2].revenue_growth_pct.value().unwrap(), -50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_order_and_aov_growth() {
        let rows = vec![
            // January: 2 orders, 100 revenue, AOV 50
            fact("o1", 1, 40.0, 2023, 1),
            fact("o2", 1, 60.0, 2023, 1),
            // February: 1 order, 75 revenue, AOV 75
            fact("o3", 1, 50.0, 2023, 2),
            fact("o3", 2, 25.0, 2023, 2),
        ];
        let points = monthly_trends(&subset(&rows, 2023));

        assert_eq!(points[0].order_growth_pct, MetricValue::Undefined);
        assert_eq!(points[0].aov_growth_pct, MetricValue::Undefined);
        assert_relative_eq!(points[1].order_growth_pct.value().unwrap(), -50.0, epsilon = 1e-9);
        assert_relative_eq!(points[1].aov_growth_pct.value().unwrap(), 50.0, epsilon = 1e-9);
        assert_relative_eq!(points[1].revenue_growth_pct.value().unwrap(), -25.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_revenue_month_gives_undefined_growth() {
        let rows = vec![fact("o1", 1, 0.0, 2023, 1), fact("o2", 1, 10.0, 2023, 2)];
        let points = monthly_trends(&subset(&rows, 2023));
        assert_eq!(points[1].revenue_growth_pct, MetricValue::Undefined);
        assert_eq!(points[1].aov_growth_pct, MetricValue::Undefined);
        // Order counts still grow from one order to one order
        assert_eq!(points[1].order_growth_pct, MetricValue::Value(0.0));
    }

    #[test]
    fn test_empty_subset_has_no_points() {
        let rows = vec![fact("o1", 1, 10.0, 2022, 1)];
        assert!(monthly_trends(&subset(&rows, 2023)).is_empty());
        assert!(monthly_revenue(&subset(&rows, 2023)).is_empty());
    }
}
