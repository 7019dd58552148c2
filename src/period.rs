//! Period Selector
//!
//! Splits the fact table into a target and a comparison slice. Both slices
//! borrow rows from the same immutable `FactTable`; nothing is copied.

use serde::Serialize;

use crate::error::ConfigError;
use crate::facts::{FactTable, OrderStatus, SalesFact};

/// Inclusive calendar-month range, 1-12
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthRange {
    pub start: u32,
    pub end: u32,
}

impl MonthRange {
    pub const FULL_YEAR: MonthRange = MonthRange { start: 1, end: 12 };

    /// Resolve optional bounds into a range
    ///
    /// A lone start means start..=12, a lone end means 1..=end. A reversed
    /// range is an error, never swapped.
    pub fn resolve(start_month: Option<u32>, end_month: Option<u32>) -> Result<Self, ConfigError> {
        let start = start_month.unwrap_or(1);
        let end = end_month.unwrap_or(12);

        if !(1..=12).contains(&start) {
            return Err(ConfigError::MonthOutOfRange { field: "start_month", value: start });
        }
        if !(1..=12).contains(&end) {
            return Err(ConfigError::MonthOutOfRange { field: "end_month", value: end });
        }
        if start > end {
            return Err(ConfigError::ReversedMonthRange { start, end });
        }

        Ok(MonthRange { start, end })
    }

    pub fn contains(&self, month: u32) -> bool {
        (self.start..=self.end).contains(&month)
    }

    pub fn is_full_year(&self) -> bool {
        *self == Self::FULL_YEAR
    }
}

/// A year plus a month range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodWindow {
    pub year: i32,
    pub months: MonthRange,
}

impl PeriodWindow {
    pub fn contains(&self, fact: &SalesFact) -> bool {
        fact.purchase_year == self.year && self.months.contains(fact.purchase_month)
    }
}

/// Read-only view of the fact rows that fall inside one window
#[derive(Debug, Clone)]
pub struct FactSubset<'a> {
    pub window: PeriodWindow,
    rows: Vec<&'a SalesFact>,
}

impl<'a> FactSubset<'a> {
    /// Filter a table to a window
    pub fn from_table(facts: &'a FactTable, window: PeriodWindow) -> Self {
        Self::from_rows(facts.rows(), window)
    }

    /// Filter arbitrary rows to a window
    pub fn from_rows(rows: &'a [SalesFact], window: PeriodWindow) -> Self {
        FactSubset {
            window,
            rows: rows.iter().filter(|r| window.contains(r)).collect(),
        }
    }

    pub fn rows(&self) -> &[&'a SalesFact] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a SalesFact> + '_ {
        self.rows.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    /// Same window, delivered orders only
    pub fn delivered(&self) -> Self {
        FactSubset {
            window: self.window,
            rows: self
                .rows
                .iter()
                .copied()
                .filter(|r| r.order_status == OrderStatus::Delivered)
                .collect(),
        }
    }
}

/// Target and comparison slices of the same fact table
///
/// `target`/`comparison` are the sales scope that revenue, trend, ranking
/// and satisfaction metrics read. With `delivered_only` they hold delivered
/// orders only; the `*_all_statuses` views always keep every status for
/// the operational metrics.
#[derive(Debug, Clone)]
pub struct PeriodSlices<'a> {
    pub target: FactSubset<'a>,
    pub comparison: FactSubset<'a>,
    pub target_all_statuses: FactSubset<'a>,
    pub comparison_all_statuses: FactSubset<'a>,
    pub delivered_only: bool,
}

impl<'a> PeriodSlices<'a> {
    /// Slices whose sales scope covers every order status
    pub fn new(target: FactSubset<'a>, comparison: FactSubset<'a>) -> Self {
        PeriodSlices {
            target_all_statuses: target.clone(),
            comparison_all_statuses: comparison.clone(),
            target,
            comparison,
            delivered_only: false,
        }
    }

    /// Restrict the sales scope to delivered orders
    pub fn delivered_only(target: FactSubset<'a>, comparison: FactSubset<'a>) -> Self {
        PeriodSlices {
            target: target.delivered(),
            comparison: comparison.delivered(),
            target_all_statuses: target,
            comparison_all_statuses: comparison,
            delivered_only: true,
        }
    }
}

/// Partition a fact table into disjoint target and comparison subsets
///
/// Both years share the same month range. Configuration errors, including
/// a comparison year equal to the target year, are raised before any row is
/// looked at.
pub fn select_periods(
    facts: &FactTable,
    target_year: i32,
    comparison_year: i32,
    start_month: Option<u32>,
    end_month: Option<u32>,
    delivered_only: bool,
) -> Result<PeriodSlices<'_>, ConfigError> {
    if target_year == comparison_year {
        return Err(ConfigError::SameComparisonYear(target_year));
    }
    let months = MonthRange::resolve(start_month, end_month)?;

    let target = FactSubset::from_table(facts, PeriodWindow { year: target_year, months });
    let comparison = FactSubset::from_table(facts, PeriodWindow { year: comparison_year, months });

    let slices = if delivered_only {
        PeriodSlices::delivered_only(target, comparison)
    } else {
        PeriodSlices::new(target, comparison)
    };

    tracing::debug!(
        "Selected {} target rows ({}) and {} comparison rows ({}), months {}-{}, delivered only: {}",
        slices.target.len(),
        target_year,
        slices.comparison.len(),
        comparison_year,
        months.start,
        months.end,
        delivered_only
    );

    Ok(slices)
}
