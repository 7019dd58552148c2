//! Metric modules for sales analysis
//!
//! Each KPI family is implemented in its own module as pure functions over a
//! `FactSubset`. The registry wires them into a named, extensible set.

pub mod value;
pub mod revenue;
pub mod trends;
pub mod ranking;
pub mod satisfaction;
pub mod operational;
pub mod registry;

// Re-export metric functions
pub use value::{growth_pct, mean, ratio, MetricValue};
pub use revenue::{
    average_item_price, average_order_value, compare_revenue, order_revenues, summarize_revenue,
    total_freight, total_revenue, RevenueComparison, RevenueSummary,
};
pub use trends::{monthly_revenue, monthly_trends, MonthlyPoint};
pub use ranking::{category_performance, product_performance, rank_by, state_performance, top_n, RankedGroup};
pub use satisfaction::{
    average_review_score, customer_satisfaction, BucketSatisfaction, DeliveryBuckets, SatisfactionMetrics,
    ScoreShare, DEFAULT_BUCKET_EDGES,
};
pub use operational::{average_delivery_days, operational_metrics, status_distribution, OperationalMetrics};
pub use registry::{MetricContext, MetricFn, MetricOutput, MetricRegistry, MetricsBundle, RankedEntry, SeriesPoint};
