//! Sales Analyzer - main coordinator for the metrics pipeline
//!
//! Runs validate → build once per set of source tables, then answers any
//! number of period analyses against the same immutable fact table.
//! Includes both sequential and parallel (Rayon) evaluation.

use std::time::Instant;

use crate::config::AnalysisConfig;
use crate::data::SourceTables;
use crate::error::{ConfigError, FactError};
use crate::facts::{build_sales_facts, BuildReport, FactBuild, FactTable};
use crate::metrics::registry::{MetricContext, MetricRegistry, MetricsBundle};
use crate::period::{select_periods, PeriodSlices};
use crate::schema::{validate_sources, ValidationReport};

/// Main sales analyzer
pub struct SalesAnalyzer {
    facts: FactTable,
    report: BuildReport,
    validation: Vec<ValidationReport>,
    registry: MetricRegistry,
}

impl SalesAnalyzer {
    /// Validate the source tables and build the fact table
    pub fn new(sources: &SourceTables) -> Result<Self, FactError> {
        tracing::info!("Initializing sales analyzer...");
        let start = Instant::now();

        let validation = validate_sources(sources)?;
        let FactBuild { table, report } = build_sales_facts(
            &sources.orders,
            &sources.order_items,
            &sources.products,
            &sources.customers,
            &sources.reviews,
        )?;

        tracing::info!(
            "Sales analyzer ready: {} fact rows, years {:?} ({:.2?})",
            table.len(),
            table.available_years(),
            start.elapsed()
        );

        Ok(SalesAnalyzer {
            facts: table,
            report,
            validation,
            registry: MetricRegistry::standard(),
        })
    }

    /// Wrap an already-built fact table
    pub fn from_build(build: FactBuild) -> Self {
        SalesAnalyzer {
            facts: build.table,
            report: build.report,
            validation: Vec::new(),
            registry: MetricRegistry::standard(),
        }
    }

    /// Replace the metric set
    pub fn with_registry(mut self, registry: MetricRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn facts(&self) -> &FactTable {
        &self.facts
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    /// Per-table validation reports (empty when built via `from_build`)
    pub fn validation_reports(&self) -> &[ValidationReport] {
        &self.validation
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Validate the config and slice the fact table
    pub fn select(&self, config: &AnalysisConfig) -> Result<(PeriodSlices<'_>, MetricContext), ConfigError> {
        let context = MetricContext::from_config(config)?;
        let slices = select_periods(
            &self.facts,
            config.target_year,
            config.comparison_year(),
            config.start_month,
            config.end_month,
            config.delivered_only,
        )?;
        Ok((slices, context))
    }

    /// Evaluate every registered metric sequentially
    pub fn analyze(&self, config: &AnalysisConfig) -> Result<MetricsBundle, ConfigError> {
        let (slices, context) = self.select(config)?;
        let start = Instant::now();
        let bundle = self.registry.compute(&slices, &context);
        tracing::debug!("Computed {} metrics ({:.2?})", bundle.len(), start.elapsed());
        Ok(bundle)
    }

    /// Evaluate every registered metric on the rayon pool
    pub fn analyze_parallel(&self, config: &AnalysisConfig) -> Result<MetricsBundle, ConfigError> {
        let (slices, context) = self.select(config)?;
        let start = Instant::now();
        let bundle = self.registry.compute_parallel(&slices, &context);
        tracing::debug!("Computed {} metrics in parallel ({:.2?})", bundle.len(), start.elapsed());
        Ok(bundle)
    }
}
