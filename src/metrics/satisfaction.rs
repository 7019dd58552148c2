//! Customer satisfaction vs delivery speed
//!
//! Reviews belong to orders, so everything here is evaluated per distinct
//! order: a three-item order contributes its review score once. Bucketing
//! only sees delivered orders (those with a delivery duration) and assigns
//! each to exactly one bucket.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::metrics::value::{mean, ratio, MetricValue};
use crate::period::FactSubset;

/// Default edges: 0-3, 4-7, 8+ days
pub const DEFAULT_BUCKET_EDGES: [u32; 3] = [0, 4, 8];

/// Validated delivery-duration bucket edges
///
/// Edge `i` is the inclusive lower bound of bucket `i`; the last bucket is
/// open-ended. Edges start at 0 and strictly increase, so every
/// non-negative duration lands in exactly one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct DeliveryBuckets {
    edges: Vec<u32>,
}

impl DeliveryBuckets {
    pub fn new(edges: Vec<u32>) -> Result<Self, ConfigError> {
        let Some(&first) = edges.first() else {
            return Err(ConfigError::EmptyBucketEdges);
        };
        if first != 0 {
            return Err(ConfigError::BucketEdgesNotFromZero(first));
        }
        if edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::UnorderedBucketEdges(edges));
        }
        Ok(DeliveryBuckets { edges })
    }

    pub fn edges(&self) -> &[u32] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Index of the bucket holding a duration in days
    pub fn bucket_of(&self, days: i64) -> usize {
        self.edges
            .iter()
            .rposition(|&edge| i64::from(edge) <= days)
            .unwrap_or(0)
    }

    /// Inclusive day range of a bucket; `None` upper bound for the last one
    pub fn bounds(&self, index: usize) -> (u32, Option<u32>) {
        let lower = self.edges[index];
        let upper = self.edges.get(index + 1).map(|next| next - 1);
        (lower, upper)
    }

    /// Label such as "0-3", "4-7", "8+" (or "5" for a one-day bucket)
    pub fn label(&self, index: usize) -> String {
        match self.bounds(index) {
            (lower, None) => format!("{}+", lower),
            (lower, Some(upper)) if upper == lower => lower.to_string(),
            (lower, Some(upper)) => format!("{}-{}", lower, upper),
        }
    }
}

impl Default for DeliveryBuckets {
    fn default() -> Self {
        DeliveryBuckets {
            edges: DEFAULT_BUCKET_EDGES.to_vec(),
        }
    }
}

impl TryFrom<Vec<u32>> for DeliveryBuckets {
    type Error = ConfigError;

    fn try_from(edges: Vec<u32>) -> Result<Self, Self::Error> {
        DeliveryBuckets::new(edges)
    }
}

impl From<DeliveryBuckets> for Vec<u32> {
    fn from(buckets: DeliveryBuckets) -> Self {
        buckets.edges
    }
}

/// Satisfaction for one delivery-duration bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketSatisfaction {
    pub label: String,
    pub min_days: u32,
    pub max_days: Option<u32>,
    pub delivered_orders: usize,
    pub reviewed_orders: usize,
    pub average_review_score: MetricValue,
}

/// Share of reviewed orders with a given score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreShare {
    pub score: u8,
    pub orders: usize,
    pub share: MetricValue,
}

/// Satisfaction metrics for one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatisfactionMetrics {
    pub average_review_score: MetricValue,
    pub reviewed_orders: usize,
    /// Scores 1-5, always five entries
    pub score_distribution: Vec<ScoreShare>,
    pub buckets: Vec<BucketSatisfaction>,
}

#[derive(Clone, Copy)]
struct OrderSatisfaction {
    delivery_days: Option<i64>,
    review_score: Option<u8>,
}

fn orders_in<'a>(subset: &FactSubset<'a>) -> FxHashMap<&'a str, OrderSatisfaction> {
    let mut orders = FxHashMap::default();
    for row in subset.iter() {
        // Delivery and review are order-level fields: every item agrees
        orders.entry(row.order_id.as_str()).or_insert(OrderSatisfaction {
            delivery_days: row.delivery_days,
            review_score: row.review_score,
        });
    }
    orders
}

/// Average review score over reviewed orders
pub fn average_review_score(subset: &FactSubset<'_>) -> MetricValue {
    let scores: Vec<u8> = orders_in(subset)
        .values()
        .filter_map(|o| o.review_score)
        .collect();
    mean(scores.iter().map(|&s| f64::from(s)).sum(), scores.len())
}

/// Overall score, score distribution and score by delivery bucket
pub fn customer_satisfaction(subset: &FactSubset<'_>, buckets: &DeliveryBuckets) -> SatisfactionMetrics {
    let orders = orders_in(subset);

    let mut distribution: BTreeMap<u8, usize> = (1..=5).map(|s| (s, 0)).collect();
    let mut score_sum = 0.0;
    let mut reviewed = 0usize;

    let mut delivered = vec![0usize; buckets.len()];
    let mut bucket_reviewed = vec![0usize; buckets.len()];
    let mut bucket_sum = vec![0.0f64; buckets.len()];

    for order in orders.values() {
        if let Some(score) = order.review_score {
            *distribution.entry(score).or_insert(0) += 1;
            score_sum += f64::from(score);
            reviewed += 1;
        }

        let Some(days) = order.delivery_days else { continue };
        let idx = buckets.bucket_of(days);
        delivered[idx] += 1;
        if let Some(score) = order.review_score {
            bucket_reviewed[idx] += 1;
            bucket_sum[idx] += f64::from(score);
        }
    }

    let score_distribution = distribution
        .into_iter()
        .map(|(score, count)| ScoreShare {
            score,
            orders: count,
            share: ratio(count as f64, reviewed as f64),
        })
        .collect();

    let buckets = (0..buckets.len())
        .map(|idx| {
            let (min_days, max_days) = buckets.bounds(idx);
            BucketSatisfaction {
                label: buckets.label(idx),
                min_days,
                max_days,
                delivered_orders: delivered[idx],
                reviewed_orders: bucket_reviewed[idx],
                average_review_score: mean(bucket_sum[idx], bucket_reviewed[idx]),
            }
        })
        .collect();

    SatisfactionMetrics {
        average_review_score: mean(score_sum, reviewed),
        reviewed_orders: reviewed,
        score_distribution,
        buckets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::SalesFact;
    use crate::metrics::fixtures::{delivered_fact, subset};
    use approx::assert_relative_eq;

    #[test]
    fn test_bucket_edges_validation() {
        assert_eq!(DeliveryBuckets::new(vec![]), Err(ConfigError::EmptyBucketEdges));
        assert_eq!(
            DeliveryBuckets::new(vec![1, 4]),
            Err(ConfigError::BucketEdgesNotFromZero(1))
        );
        assert_eq!(
            DeliveryBuckets::new(vec![0, 4, 4]),
            Err(ConfigError::UnorderedBucketEdges(vec![0, 4, 4]))
        );
        assert!(DeliveryBuckets::new(vec![0]).is_ok());
    }

    #[test]
    fn test_duration_lands_in_one_bucket() {
        let buckets = DeliveryBuckets::default();
        assert_eq!(buckets.bucket_of(0), 0);
        assert_eq!(buckets.bucket_of(3), 0);
        assert_eq!(buckets.bucket_of(4), 1);
        assert_eq!(buckets.bucket_of(5), 1);
        assert_eq!(buckets.bucket_of(7), 1);
        assert_eq!(buckets.bucket_of(8), 2);
        assert_eq!(buckets.bucket_of(120), 2);
    }

    #[test]
    fn test_labels() {
        let buckets = DeliveryBuckets::default();
        let labels: Vec<String> = (0..buckets.len()).map(|i| buckets.label(i)).collect();
        assert_eq!(labels, vec!["0-3", "4-7", "8+"]);

        let narrow = DeliveryBuckets::new(vec![0, 1, 2]).unwrap();
        assert_eq!(narrow.label(0), "0");
        assert_eq!(narrow.label(2), "2+");
    }

    #[test]
    fn test_five_day_delivery_is_only_in_middle_bucket() {
        let rows = vec![delivered_fact("o1", Some(5), Some(4))];
        let metrics = customer_satisfaction(&subset(&rows, 2023), &DeliveryBuckets::default());

        let counts: Vec<usize> = metrics.buckets.iter().map(|b| b.delivered_orders).collect();
        assert_eq!(counts, vec![0, 1, 0]);
        assert_eq!(metrics.buckets[1].label, "4-7");
        assert_eq!(metrics.buckets[1].average_review_score, MetricValue::Value(4.0));
        assert_eq!(metrics.buckets[0].average_review_score, MetricValue::Undefined);
    }

    #[test]
    fn test_orders_counted_once_and_undelivered_excluded() {
        let mut second_item = delivered_fact("o1", Some(2), Some(5));
        second_item.order_item_id = 2;
        let rows = vec![
            delivered_fact("o1", Some(2), Some(5)),
            second_item,
            delivered_fact("o2", Some(10), Some(1)),
            delivered_fact("o3", None, Some(3)),
            delivered_fact("o4", Some(6), None),
        ];
        let metrics = customer_satisfaction(&subset(&rows, 2023), &DeliveryBuckets::default());

        // o1=5, o2=1, o3=3 → 3.0 over 3 reviewed orders
        assert_eq!(metrics.reviewed_orders, 3);
        assert_relative_eq!(metrics.average_review_score.value().unwrap(), 3.0);

        // Delivered orders o1, o2, o4 partitioned exactly once
        let delivered: usize = metrics.buckets.iter().map(|b| b.delivered_orders).sum();
        assert_eq!(delivered, 3);
        assert_eq!(metrics.buckets[0].delivered_orders, 1);
        assert_eq!(metrics.buckets[1].delivered_orders, 1);
        assert_eq!(metrics.buckets[1].reviewed_orders, 0);
        assert_eq!(metrics.buckets[2].delivered_orders, 1);

        let five = metrics.score_distribution.iter().find(|s| s.score == 5).unwrap();
        assert_eq!(five.orders, 1);
        assert_relative_eq!(five.share.value().unwrap(), 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_subset_reports_no_data() {
        let rows: Vec<SalesFact> = Vec::new();
        let metrics = customer_satisfaction(&subset(&rows, 2023), &DeliveryBuckets::default());
        assert_eq!(metrics.average_review_score, MetricValue::Undefined);
        assert_eq!(metrics.score_distribution.len(), 5);
        assert!(metrics.score_distribution.iter().all(|s| s.share.is_undefined()));
        assert!(metrics.buckets.iter().all(|b| b.delivered_orders == 0));
        assert_eq!(average_review_score(&subset(&rows, 2023)), MetricValue::Undefined);
    }

    #[test]
    fn test_buckets_deserialize_with_validation() {
        let ok: DeliveryBuckets = serde_json::from_str("[0, 3, 10]").unwrap();
        assert_eq!(ok.edges(), &[0, 3, 10]);
        assert!(serde_json::from_str::<DeliveryBuckets>("[2, 3]").is_err());
    }
}
