// Metrics report binary
//
// Loads the CSV export from DATA_DIR, builds the fact table and prints the
// metrics bundle as JSON on stdout.
// Usage: cargo run --features cli --bin metrics_report

use std::path::Path;

use anyhow::{Context, Result};
use ecommerce_metrics::{AnalysisConfig, SalesAnalyzer, SourceTables};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Optional numeric override from the environment
fn env_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{} must be a number, got '{}'", name, raw)),
        Err(_) => Ok(None),
    }
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ecommerce_metrics=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());

    let mut config = match std::env::var("CONFIG_PATH") {
        Ok(path) => AnalysisConfig::load(Path::new(&path))?,
        Err(_) => {
            let target_year = env_number::<i32>("TARGET_YEAR")?
                .context("TARGET_YEAR must be set when CONFIG_PATH is not")?;
            AnalysisConfig::new(target_year)
        }
    };

    // Environment overrides the config file
    if let Some(year) = env_number("TARGET_YEAR")? {
        config.target_year = year;
    }
    if let Some(year) = env_number("COMPARISON_YEAR")? {
        config.comparison_year = Some(year);
    }
    if let Some(month) = env_number("START_MONTH")? {
        config.start_month = Some(month);
    }
    if let Some(month) = env_number("END_MONTH")? {
        config.end_month = Some(month);
    }
    if let Ok(raw) = std::env::var("DELIVERED_ONLY") {
        config.delivered_only = matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
    }
    config.validate().context("Invalid analysis configuration")?;

    tracing::info!("Configuration:");
    tracing::info!("  DATA_DIR: {}", data_dir);
    tracing::info!("  target year: {}", config.target_year);
    tracing::info!("  comparison year: {}", config.comparison_year());
    tracing::info!("  months: {:?}..{:?}", config.start_month, config.end_month);
    tracing::info!("  delivered only: {}", config.delivered_only);

    let sources = SourceTables::load(&data_dir)?;
    let analyzer = SalesAnalyzer::new(&sources).context("Failed to build sales fact table")?;

    let report = analyzer.report();
    if report.orphan_items > 0 {
        tracing::warn!("{} order items had no matching order and were excluded", report.orphan_items);
    }

    let metrics = analyzer.analyze_parallel(&config)?;

    // Display cutoff for rankings; the bundle itself keeps them in full
    let top = config.top_n.map(|n| {
        serde_json::json!({
            "n": n,
            "categories": metrics.ranking_prefix("category_revenue", n),
            "states": metrics.ranking_prefix("state_revenue", n),
            "products": metrics.ranking_prefix("product_revenue", n),
        })
    });

    let output = serde_json::json!({
        "config": config,
        "comparison_year": config.comparison_year(),
        "available_years": analyzer.facts().available_years(),
        "build_report": report,
        "validation": analyzer.validation_reports(),
        "metrics": metrics,
        "top": top,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
