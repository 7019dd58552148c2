//! Category, state and product rankings
//!
//! Every ranking is returned in full, sorted by revenue descending with ties
//! broken by key ascending. Cutting to a top N is left to the caller
//! (`top_n` only slices, so changing N never changes the order).

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::facts::SalesFact;
use crate::metrics::value::{mean, ratio, MetricValue};
use crate::period::FactSubset;

/// Revenue and volume for one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedGroup {
    pub key: String,
    pub revenue: f64,
    pub items: usize,
    pub orders: usize,
    pub customers: usize,
    /// Share of the subset's total revenue, 0-1
    pub revenue_share: MetricValue,
    /// Mean item price within the group
    pub average_price: MetricValue,
}

#[derive(Default)]
struct GroupAccumulator<'a> {
    revenue: f64,
    items: usize,
    orders: FxHashSet<&'a str>,
    customers: FxHashSet<&'a str>,
}

/// Group a subset by a key and rank by revenue
pub fn rank_by<'a, F>(subset: &FactSubset<'a>, key: F) -> Vec<RankedGroup>
where
    F: Fn(&'a SalesFact) -> &'a str,
{
    let mut groups: FxHashMap<&'a str, GroupAccumulator<'a>> = FxHashMap::default();
    let mut total = 0.0;

    for row in subset.iter() {
        let acc = groups.entry(key(row)).or_default();
        acc.revenue += row.revenue;
        acc.items += 1;
        acc.orders.insert(row.order_id.as_str());
        acc.customers.insert(row.customer_id.as_str());
        total += row.revenue;
    }

    let mut ranked: Vec<RankedGroup> = groups
        .into_iter()
        .map(|(key, acc)| RankedGroup {
            key: key.to_string(),
            revenue: acc.revenue,
            items: acc.items,
            orders: acc.orders.len(),
            customers: acc.customers.len(),
            revenue_share: ratio(acc.revenue, total),
            average_price: mean(acc.revenue, acc.items),
        })
        .collect();

    ranked.sort_by(|a, b| b.revenue.total_cmp(&a.revenue).then_with(|| a.key.cmp(&b.key)));
    ranked
}

/// Revenue by product category
pub fn category_performance(subset: &FactSubset<'_>) -> Vec<RankedGroup> {
    rank_by(subset, |r| r.category.as_str())
}

/// Revenue by customer state
pub fn state_performance(subset: &FactSubset<'_>) -> Vec<RankedGroup> {
    rank_by(subset, |r| r.customer_state.as_str())
}

/// Revenue by product id
pub fn product_performance(subset: &FactSubset<'_>) -> Vec<RankedGroup> {
    rank_by(subset, |r| r.product_id.as_str())
}

/// First `n` entries of a ranking
pub fn top_n<T>(ranking: &[T], n: usize) -> &[T] {
    &ranking[..n.min(ranking.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::{fact_in, subset};
    use approx::assert_relative_eq;

    fn rows() -> Vec<SalesFact> {
        vec![
            fact_in("o1", 1, 100.0, "toys", "SP"),
            fact_in("o1", 2, 50.0, "garden", "SP"),
            fact_in("o2", 1, 150.0, "garden", "RJ"),
            fact_in("o3", 1, 100.0, "books", "MG"),
            fact_in("o4", 1, 25.0, "unknown", "unknown"),
        ]
    }

    #[test]
    fn test_category_ranking_order_and_ties() {
        let rows = rows();
        let ranking = category_performance(&subset(&rows, 2023));
        let keys: Vec<&str> = ranking.iter().map(|g| g.key.as_str()).collect();

        // garden 200, then books/toys tied at 100 (name ascending), unknown 25
        assert_eq!(keys, vec!["garden", "books", "toys", "unknown"]);
        assert_eq!(ranking[0].items, 2);
        assert_eq!(ranking[0].orders, 2);
        assert_eq!(ranking[0].average_price, MetricValue::Value(100.0));
        assert_relative_eq!(ranking[0].revenue_share.value().unwrap(), 200.0 / 425.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rankings_partition_total_revenue() {
        let rows = rows();
        let s = subset(&rows, 2023);
        let total: f64 = rows.iter().map(|r| r.revenue).sum();

        let by_category: f64 = category_performance(&s).iter().map(|g| g.revenue).sum();
        let by_state: f64 = state_performance(&s).iter().map(|g| g.revenue).sum();
        assert_relative_eq!(by_category, total, epsilon = 1e-9);
        assert_relative_eq!(by_state, total, epsilon = 1e-9);
    }

    #[test]
    fn test_state_ranking_counts_orders_once() {
        let rows = rows();
        let ranking = state_performance(&subset(&rows, 2023));
        let sp = ranking.iter().find(|g| g.key == "SP").unwrap();
        assert_relative_eq!(sp.revenue, 150.0);
        assert_eq!(sp.items, 2);
        assert_eq!(sp.orders, 1);
        assert_eq!(sp.average_price, MetricValue::Value(75.0));
    }

    #[test]
    fn test_top_n_is_a_prefix() {
        let rows = rows();
        let ranking = category_performance(&subset(&rows, 2023));
        assert_eq!(top_n(&ranking, 2), &ranking[..2]);
        assert_eq!(top_n(&ranking, 10).len(), ranking.len());
    }

    #[test]
    fn test_empty_subset_has_empty_ranking() {
        let rows: Vec<SalesFact> = Vec::new();
        assert!(product_performance(&subset(&rows, 2023)).is_empty());
    }
}
