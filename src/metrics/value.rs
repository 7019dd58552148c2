//! Metric value with an explicit undefined state
//!
//! Every ratio, mean and growth rate in the engine goes through these
//! helpers, so a zero denominator becomes `Undefined` and never NaN/inf.

use serde::Serialize;

/// A numeric result that may be undefined (zero denominator, no data)
///
/// Serializes as a JSON number or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Value(f64),
    Undefined,
}

impl MetricValue {
    /// Wrap a finite number; NaN or infinity becomes `Undefined`
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            MetricValue::Value(value)
        } else {
            MetricValue::Undefined
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            MetricValue::Value(v) => Some(v),
            MetricValue::Undefined => None,
        }
    }

    pub fn is_undefined(self) -> bool {
        matches!(self, MetricValue::Undefined)
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(MetricValue::Undefined, MetricValue::from_f64)
    }
}

/// numerator / denominator, undefined when the denominator is zero
pub fn ratio(numerator: f64, denominator: f64) -> MetricValue {
    if denominator == 0.0 {
        MetricValue::Undefined
    } else {
        MetricValue::from_f64(numerator / denominator)
    }
}

/// Mean of a sum over `count` items, undefined for zero items
pub fn mean(sum: f64, count: usize) -> MetricValue {
    ratio(sum, count as f64)
}

/// Percentage change (current - previous) / previous × 100
///
/// Undefined iff the base is zero.
pub fn growth_pct(current: f64, previous: f64) -> MetricValue {
    match ratio(current - previous, previous) {
        MetricValue::Value(v) => MetricValue::Value(v * 100.0),
        MetricValue::Undefined => MetricValue::Undefined,
    }
}

/// Growth between two possibly undefined values
pub fn growth_between(current: MetricValue, previous: MetricValue) -> MetricValue {
    match (current, previous) {
        (MetricValue::Value(c), MetricValue::Value(p)) => growth_pct(c, p),
        _ => MetricValue::Undefined,
    }
}
