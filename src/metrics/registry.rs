//! Metric registry and result bundle
//!
//! A registry is an ordered list of named pure functions over a pair of
//! period slices. Adding a KPI means registering another function; nothing
//! is subclassed and nothing is global. Evaluation produces a
//! `MetricsBundle` keyed by metric name, in registration order.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::ser::{Serialize, Serializer};

use crate::config::AnalysisConfig;
use crate::error::{ConfigError, RegistryError};
use crate::metrics::operational::{average_delivery_days, operational_metrics};
use crate::metrics::ranking::{category_performance, product_performance, state_performance, top_n, RankedGroup};
use crate::metrics::revenue::{compare_revenue, summarize_revenue};
use crate::metrics::satisfaction::{average_review_score, customer_satisfaction, BucketSatisfaction, DeliveryBuckets};
use crate::metrics::trends::{monthly_trends, MonthlyPoint};
use crate::metrics::value::MetricValue;
use crate::period::{FactSubset, PeriodSlices};

/// Ranked key → value entry
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RankedEntry {
    pub key: String,
    pub value: f64,
}

/// Month → value entry
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SeriesPoint {
    pub month: u32,
    pub value: MetricValue,
}

/// Shape of one metric result
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MetricOutput {
    Scalar(MetricValue),
    Count(usize),
    /// Ordered mapping, highest value first
    Ranking(Vec<RankedEntry>),
    /// Monthly series, ascending months
    Series(Vec<SeriesPoint>),
    Buckets(Vec<BucketSatisfaction>),
    Distribution(BTreeMap<String, usize>),
}

impl MetricOutput {
    pub fn as_scalar(&self) -> Option<MetricValue> {
        match self {
            MetricOutput::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<usize> {
        match self {
            MetricOutput::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_ranking(&self) -> Option<&[RankedEntry]> {
        match self {
            MetricOutput::Ranking(entries) => Some(entries),
            _ => None,
        }
    }
}

fn ranking(groups: Vec<RankedGroup>) -> MetricOutput {
    MetricOutput::Ranking(
        groups
            .into_iter()
            .map(|g| RankedEntry { key: g.key, value: g.revenue })
            .collect(),
    )
}

fn monthly_series(subset: &FactSubset<'_>, value: fn(&MonthlyPoint) -> MetricValue) -> MetricOutput {
    MetricOutput::Series(
        monthly_trends(subset)
            .iter()
            .map(|p| SeriesPoint { month: p.month, value: value(p) })
            .collect(),
    )
}

fn revenue_series(subset: &FactSubset<'_>) -> MetricOutput {
    monthly_series(subset, |p| MetricValue::Value(p.revenue))
}

/// Parameters shared by every metric in one evaluation
///
/// Built from an `AnalysisConfig`; threaded explicitly into each function.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricContext {
    pub buckets: DeliveryBuckets,
}

impl MetricContext {
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(MetricContext {
            buckets: config.delivery_buckets()?,
        })
    }
}

/// A registered metric: reads the slices, returns one output
pub type MetricFn = fn(&PeriodSlices<'_>, &MetricContext) -> MetricOutput;

/// Evaluated metrics, in registration order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricsBundle {
    entries: Vec<(String, MetricOutput)>,
}

impl MetricsBundle {
    pub fn get(&self, name: &str) -> Option<&MetricOutput> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Scalar metric by name
    pub fn scalar(&self, name: &str) -> Option<MetricValue> {
        self.get(name).and_then(MetricOutput::as_scalar)
    }

    /// Leading `n` entries of a ranking metric, for display cutoffs
    pub fn ranking_prefix(&self, name: &str, n: usize) -> Option<&[RankedEntry]> {
        self.get(name)
            .and_then(MetricOutput::as_ranking)
            .map(|entries| top_n(entries, n))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricOutput)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for MetricsBundle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(n, v)| (n, v)))
    }
}

/// Ordered set of named metric functions
#[derive(Debug, Clone, Default)]
pub struct MetricRegistry {
    entries: Vec<(String, MetricFn)>,
}

impl MetricRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric; names must be unique
    pub fn register(&mut self, name: impl Into<String>, metric: MetricFn) -> Result<(), RegistryError> {
        let name = name.into();
        if self.entries.iter().any(|(n, _)| *n == name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.entries.push((name, metric));
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evaluate every metric sequentially
    pub fn compute(&self, slices: &PeriodSlices<'_>, context: &MetricContext) -> MetricsBundle {
        MetricsBundle {
            entries: self
                .entries
                .iter()
                .map(|(name, metric)| (name.clone(), metric(slices, context)))
                .collect(),
        }
    }

    /// Evaluate every metric on the rayon pool
    ///
    /// Metrics only read the slices, so results match `compute` exactly.
    pub fn compute_parallel(&self, slices: &PeriodSlices<'_>, context: &MetricContext) -> MetricsBundle {
        MetricsBundle {
            entries: self
                .entries
                .par_iter()
                .map(|(name, metric)| (name.clone(), metric(slices, context)))
                .collect(),
        }
    }

    /// The full KPI set
    pub fn standard() -> Self {
        let metrics: [(&str, MetricFn); 31] = [
            // Revenue
            ("total_revenue", |s, _| {
                MetricOutput::Scalar(MetricValue::Value(summarize_revenue(&s.target).total_revenue))
            }),
            ("comparison_total_revenue", |s, _| {
                MetricOutput::Scalar(MetricValue::Value(summarize_revenue(&s.comparison).total_revenue))
            }),
            ("revenue_growth_pct", |s, _| {
                MetricOutput::Scalar(compare_revenue(&s.target, &s.comparison).revenue_growth_pct)
            }),
            ("total_orders", |s, _| MetricOutput::Count(summarize_revenue(&s.target).total_orders)),
            ("comparison_total_orders", |s, _| {
                MetricOutput::Count(summarize_revenue(&s.comparison).total_orders)
            }),
            ("order_growth_pct", |s, _| {
                MetricOutput::Scalar(compare_revenue(&s.target, &s.comparison).order_growth_pct)
            }),
            ("total_items", |s, _| MetricOutput::Count(s.target.len())),
            ("average_order_value", |s, _| {
                MetricOutput::Scalar(summarize_revenue(&s.target).average_order_value)
            }),
            ("comparison_average_order_value", |s, _| {
                MetricOutput::Scalar(summarize_revenue(&s.comparison).average_order_value)
            }),
            ("aov_growth_pct", |s, _| {
                MetricOutput::Scalar(compare_revenue(&s.target, &s.comparison).aov_growth_pct)
            }),
            ("total_freight", |s, _| {
                MetricOutput::Scalar(MetricValue::Value(summarize_revenue(&s.target).total_freight))
            }),
            ("gross_revenue_with_freight", |s, _| {
                MetricOutput::Scalar(MetricValue::Value(
                    summarize_revenue(&s.target).gross_revenue_with_freight,
                ))
            }),
            // Trends
            ("monthly_revenue", |s, _| revenue_series(&s.target)),
            ("comparison_monthly_revenue", |s, _| revenue_series(&s.comparison)),
            ("monthly_revenue_growth_pct", |s, _| monthly_series(&s.target, |p| p.revenue_growth_pct)),
            ("monthly_orders", |s, _| {
                monthly_series(&s.target, |p| MetricValue::Value(p.orders as f64))
            }),
            ("monthly_order_growth_pct", |s, _| monthly_series(&s.target, |p| p.order_growth_pct)),
            ("monthly_average_order_value", |s, _| {
                monthly_series(&s.target, |p| p.average_order_value)
            }),
            ("monthly_aov_growth_pct", |s, _| monthly_series(&s.target, |p| p.aov_growth_pct)),
            // Rankings
            ("category_revenue", |s, _| ranking(category_performance(&s.target))),
            ("state_revenue", |s, _| ranking(state_performance(&s.target))),
            ("product_revenue", |s, _| ranking(product_performance(&s.target))),
            // Satisfaction
            ("average_review_score", |s, _| MetricOutput::Scalar(average_review_score(&s.target))),
            ("review_score_by_delivery_days", |s, ctx| {
                MetricOutput::Buckets(customer_satisfaction(&s.target, &ctx.buckets).buckets)
            }),
            ("review_score_distribution", |s, ctx| {
                MetricOutput::Distribution(
                    customer_satisfaction(&s.target, &ctx.buckets)
                        .score_distribution
                        .into_iter()
                        .map(|share| (share.score.to_string(), share.orders))
                        .collect(),
                )
            }),
            // Operations, always over every order status
            ("fulfillment_rate", |s, _| {
                MetricOutput::Scalar(operational_metrics(&s.target_all_statuses).fulfillment_rate)
            }),
            ("cancellation_rate", |s, _| {
                MetricOutput::Scalar(operational_metrics(&s.target_all_statuses).cancellation_rate)
            }),
            ("on_time_rate", |s, _| {
                MetricOutput::Scalar(operational_metrics(&s.target_all_statuses).on_time_rate)
            }),
            ("average_delivery_days", |s, _| {
                MetricOutput::Scalar(average_delivery_days(&s.target_all_statuses))
            }),
            ("comparison_average_delivery_days", |s, _| {
                MetricOutput::Scalar(average_delivery_days(&s.comparison_all_statuses))
            }),
            ("order_status_distribution", |s, _| {
                MetricOutput::Distribution(operational_metrics(&s.target_all_statuses).status_distribution)
            }),
        ];

        MetricRegistry {
            entries: metrics
                .into_iter()
                .map(|(name, metric)| (name.to_string(), metric))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::{fact, subset};
    use crate::facts::{OrderStatus, SalesFact};
    use rustc_hash::FxHashSet;

    fn slices(rows: &[SalesFact]) -> PeriodSlices<'_> {
        PeriodSlices::new(subset(rows, 2023), subset(rows, 2022))
    }

    #[test]
    fn test_standard_names_are_unique() {
        let registry = MetricRegistry::standard();
        let names: FxHashSet<&str> = registry.names().collect();
        assert_eq!(names.len(), registry.len());
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = MetricRegistry::new();
        registry
            .register("item_count", |s, _| MetricOutput::Count(s.target.len()))
            .unwrap();
        let err = registry
            .register("item_count", |s, _| MetricOutput::Count(s.comparison.len()))
            .unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("item_count".to_string()));
    }

    #[test]
    fn test_custom_metric_is_evaluated() {
        let rows = vec![fact("o1", 1, 10.0, 2023, 1), fact("o2", 1, 5.0, 2022, 1)];
        let mut registry = MetricRegistry::new();
        registry
            .register("comparison_items", |s, _| MetricOutput::Count(s.comparison.len()))
            .unwrap();

        let bundle = registry.compute(&slices(&rows), &MetricContext::default());
        assert_eq!(bundle.get("comparison_items").and_then(MetricOutput::as_count), Some(1));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let rows = vec![
            fact("o1", 1, 10.0, 2023, 1),
            fact("o1", 2, 15.0, 2023, 1),
            fact("o2", 1, 30.0, 2023, 4),
            fact("o3", 1, 20.0, 2022, 2),
        ];
        let registry = MetricRegistry::standard();
        let s = slices(&rows);
        let ctx = MetricContext::default();

        let sequential = registry.compute(&s, &ctx);
        let parallel = registry.compute_parallel(&s, &ctx);
        assert_eq!(sequential, parallel);
        assert_eq!(sequential.names().collect::<Vec<_>>(), registry.names().collect::<Vec<_>>());
    }

    #[test]
    fn test_bundle_scalars() {
        let rows = vec![fact("o1", 1, 50.0, 2023, 1), fact("o1", 2, 70.0, 2023, 1)];
        let bundle = MetricRegistry::standard().compute(&slices(&rows), &MetricContext::default());

        assert_eq!(bundle.scalar("total_revenue"), Some(MetricValue::Value(120.0)));
        assert_eq!(bundle.scalar("average_order_value"), Some(MetricValue::Value(120.0)));
        assert_eq!(bundle.scalar("revenue_growth_pct"), Some(MetricValue::Undefined));
        assert_eq!(bundle.get("total_orders").and_then(MetricOutput::as_count), Some(1));
        assert_eq!(bundle.scalar("not_a_metric"), None);
    }

    #[test]
    fn test_monthly_order_and_aov_series() {
        let rows = vec![
            fact("o1", 1, 40.0, 2023, 1),
            fact("o2", 1, 60.0, 2023, 1),
            fact("o3", 1, 75.0, 2023, 3),
        ];
        let bundle = MetricRegistry::standard().compute(&slices(&rows), &MetricContext::default());

        let series = |name: &str| match bundle.get(name) {
            Some(MetricOutput::Series(points)) => points.iter().map(|p| (p.month, p.value)).collect::<Vec<_>>(),
            other => panic!("{} is not a series: {:?}", name, other),
        };

        assert_eq!(
            series("monthly_orders"),
            vec![(1, MetricValue::Value(2.0)), (3, MetricValue::Value(1.0))]
        );
        assert_eq!(
            series("monthly_average_order_value"),
            vec![(1, MetricValue::Value(50.0)), (3, MetricValue::Value(75.0))]
        );
        assert_eq!(
            series("monthly_order_growth_pct"),
            vec![(1, MetricValue::Undefined), (3, MetricValue::Value(-50.0))]
        );
        assert_eq!(
            series("monthly_aov_growth_pct"),
            vec![(1, MetricValue::Undefined), (3, MetricValue::Value(50.0))]
        );
    }

    #[test]
    fn test_operational_metrics_ignore_delivered_only_scope() {
        let mut canceled = fact("o2", 1, 30.0, 2023, 1);
        canceled.order_status = OrderStatus::Canceled;
        let rows = vec![fact("o1", 1, 10.0, 2023, 1), canceled];

        let scoped = PeriodSlices::delivered_only(subset(&rows, 2023), subset(&rows, 2022));
        let bundle = MetricRegistry::standard().compute(&scoped, &MetricContext::default());

        assert_eq!(bundle.scalar("total_revenue"), Some(MetricValue::Value(10.0)));
        assert_eq!(bundle.get("total_orders").and_then(MetricOutput::as_count), Some(1));
        assert_eq!(bundle.scalar("cancellation_rate"), Some(MetricValue::Value(0.5)));
        assert_eq!(bundle.scalar("fulfillment_rate"), Some(MetricValue::Value(0.5)));
    }

    #[test]
    fn test_ranking_prefix() {
        let mut rows = vec![
            fact("o1", 1, 10.0, 2023, 1),
            fact("o2", 1, 30.0, 2023, 1),
            fact("o3", 1, 20.0, 2023, 1),
        ];
        rows[0].category = "books".to_string();
        rows[1].category = "garden".to_string();
        let bundle = MetricRegistry::standard().compute(&slices(&rows), &MetricContext::default());

        let top: Vec<&str> = bundle
            .ranking_prefix("category_revenue", 2)
            .unwrap()
            .iter()
            .map(|e| e.key.as_str())
            .collect();
        assert_eq!(top, vec!["garden", "toys"]);
        assert_eq!(bundle.ranking_prefix("category_revenue", 10).map(<[_]>::len), Some(3));
        assert_eq!(bundle.ranking_prefix("total_revenue", 2), None);
    }

    #[test]
    fn test_bundle_serializes_as_ordered_map() {
        let rows = vec![fact("o1", 1, 10.0, 2023, 1)];
        let mut registry = MetricRegistry::new();
        registry
            .register("growth", |s, _| {
                MetricOutput::Scalar(compare_revenue(&s.target, &s.comparison).revenue_growth_pct)
            })
            .unwrap();
        registry.register("items", |s, _| MetricOutput::Count(s.target.len())).unwrap();

        let bundle = registry.compute(&slices(&rows), &MetricContext::default());
        let json = serde_json::to_string(&bundle).unwrap();
        assert_eq!(
            json,
            r#"{"growth":{"kind":"scalar","value":null},"items":{"kind":"count","value":1}}"#
        );
    }
}
