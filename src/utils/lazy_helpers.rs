//! LazyFrame materialization helpers with column validation
//!
//! The fact builder never touches a raw table directly: it projects the
//! columns it needs through `materialize_with_columns` and then pulls typed
//! vectors out of the projection. Casting happens here, once, so numeric
//! columns read as integers and text columns read as numbers (zip prefixes)
//! are handled in one place.

use polars::prelude::*;

use crate::error::FactError;

fn polars_err(context: &str) -> impl FnOnce(PolarsError) -> FactError + '_ {
    move |source| FactError::Polars {
        context: context.to_string(),
        source,
    }
}

/// Materialize a DataFrame with an explicit column list
///
/// # Arguments
/// * `df` - Source table
/// * `columns` - Required column names, in output order
/// * `context` - Context for error messages (e.g., "orders")
///
/// # Errors
/// Returns `FactError::Polars` if any column is missing or projection fails.
/// Callers run the schema validator first.
pub fn materialize_with_columns(
    df: &DataFrame,
    columns: &[&str],
    context: &str,
) -> Result<DataFrame, FactError> {
    let col_exprs: Vec<Expr> = columns.iter().map(|&name| col(name)).collect();

    df.clone()
        .lazy()
        .select(&col_exprs)
        .collect()
        .map_err(polars_err(context))
}

/// Read a column as optional strings, casting non-string dtypes to text
///
/// Temporal columns come back in polars' text rendering, which
/// `parse_timestamp` accepts.
pub fn text_values(
    df: &DataFrame,
    column: &str,
    context: &str,
) -> Result<Vec<Option<String>>, FactError> {
    let casted = df
        .column(column)
        .and_then(|c| c.cast(&DataType::String))
        .map_err(polars_err(context))?;
    let values = casted.str().map_err(polars_err(context))?;

    Ok(values
        .into_iter()
        .map(|opt| opt.map(|s| s.to_string()))
        .collect())
}

/// Read a numeric column as optional f64 values
pub fn f64_values(
    df: &DataFrame,
    column: &str,
    context: &str,
) -> Result<Vec<Option<f64>>, FactError> {
    let casted = df
        .column(column)
        .and_then(|c| c.cast(&DataType::Float64))
        .map_err(polars_err(context))?;
    let values = casted.f64().map_err(polars_err(context))?;

    Ok(values.into_iter().collect())
}

/// Read an integer column as optional i64 values
pub fn i64_values(
    df: &DataFrame,
    column: &str,
    context: &str,
) -> Result<Vec<Option<i64>>, FactError> {
    let casted = df
        .column(column)
        .and_then(|c| c.cast(&DataType::Int64))
        .map_err(polars_err(context))?;
    let values = casted.i64().map_err(polars_err(context))?;

    Ok(values.into_iter().collect())
}
