//! Analysis configuration
//!
//! Everything the engine needs to know about a run: which year to analyze,
//! which year to compare against, the month window, and the satisfaction
//! buckets. Values are passed explicitly to the period selector and the
//! metrics; nothing here is process-wide.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::metrics::satisfaction::{DeliveryBuckets, DEFAULT_BUCKET_EDGES};
use crate::period::MonthRange;

fn default_bucket_edges() -> Vec<u32> {
    DEFAULT_BUCKET_EDGES.to_vec()
}

/// Parameters for one analysis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub target_year: i32,

    /// Defaults to the year before `target_year`
    #[serde(default)]
    pub comparison_year: Option<i32>,

    #[serde(default)]
    pub start_month: Option<u32>,

    #[serde(default)]
    pub end_month: Option<u32>,

    /// Lower bounds (days) of the delivery-duration buckets
    #[serde(default = "default_bucket_edges")]
    pub delivery_bucket_edges: Vec<u32>,

    /// Display hint only; rankings are always computed in full
    #[serde(default)]
    pub top_n: Option<usize>,

    /// Restrict revenue, trend, ranking and satisfaction metrics to
    /// delivered orders; operational metrics still see every status
    #[serde(default)]
    pub delivered_only: bool,
}

impl AnalysisConfig {
    /// Full-year comparison of `target_year` against the previous year
    pub fn new(target_year: i32) -> Self {
        AnalysisConfig {
            target_year,
            comparison_year: None,
            start_month: None,
            end_month: None,
            delivery_bucket_edges: default_bucket_edges(),
            top_n: None,
            delivered_only: false,
        }
    }

    pub fn with_comparison_year(mut self, year: i32) -> Self {
        self.comparison_year = Some(year);
        self
    }

    pub fn with_months(mut self, start_month: Option<u32>, end_month: Option<u32>) -> Self {
        self.start_month = start_month;
        self.end_month = end_month;
        self
    }

    pub fn with_bucket_edges(mut self, edges: Vec<u32>) -> Self {
        self.delivery_bucket_edges = edges;
        self
    }

    pub fn with_top_n(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }

    pub fn with_delivered_only(mut self, delivered_only: bool) -> Self {
        self.delivered_only = delivered_only;
        self
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: AnalysisConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config JSON: {:?}", path))?;

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {:?}", path))?;

        Ok(config)
    }

    pub fn comparison_year(&self) -> i32 {
        self.comparison_year.unwrap_or(self.target_year - 1)
    }

    pub fn month_range(&self) -> Result<MonthRange, ConfigError> {
        MonthRange::resolve(self.start_month, self.end_month)
    }

    pub fn delivery_buckets(&self) -> Result<DeliveryBuckets, ConfigError> {
        DeliveryBuckets::new(self.delivery_bucket_edges.clone())
    }

    /// Check every field before any filtering runs
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.comparison_year() == self.target_year {
            return Err(ConfigError::SameComparisonYear(self.target_year));
        }
        self.month_range()?;
        self.delivery_buckets()?;
        if self.top_n == Some(0) {
            return Err(ConfigError::ZeroTopN);
        }
        Ok(())
    }
}
