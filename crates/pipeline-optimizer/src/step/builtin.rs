//! Built-in steps.
//!
//! These cover the common numeric preprocessing operations so that a
//! persisted pipeline can be run without custom code (see the CLI). All
//! numeric steps leave non-numeric columns untouched.

use super::{StepDefinition, StepRegistry, StepSignature};
use crate::data::Data;
use crate::error::{PipelineError, Result};
use crate::params::Params;
use crate::utils::{integer_fits_dtype, map_numeric_columns};
use polars::prelude::*;
use serde_json::{Number, json};
use std::sync::Arc;

type BuiltinFn = fn(DataFrame, Option<Data>, &Params) -> Result<Data>;

/// Register every built-in step into `registry`, overriding any step
/// already registered under a built-in name.
pub fn register_all(registry: &mut StepRegistry) {
    let builtins: [(StepSignature, BuiltinFn); 7] = [
        (StepSignature::new("scale").param("factor", 2), scale),
        (StepSignature::new("offset").param("value", 1), offset),
        (StepSignature::new("standard_scale"), standard_scale),
        (StepSignature::new("min_max_scale"), min_max_scale),
        (
            StepSignature::new("drop_columns").required("columns"),
            drop_columns,
        ),
        (
            StepSignature::new("attach_target")
                .with_target()
                .param("column", json!("target")),
            attach_target,
        ),
        (
            StepSignature::new("select_column").required("column"),
            select_column,
        ),
    ];

    for (signature, func) in builtins {
        registry.replace(Arc::new(StepDefinition::new(signature, func)));
    }
}

/// Multiply numeric columns by `factor`.
pub fn scale(x: DataFrame, _y: Option<Data>, params: &Params) -> Result<Data> {
    let factor = params.number("factor")?.clone();
    let df = map_numeric_columns(x, |s| {
        with_scalar(s, &factor, |s, n| s * n, |s, n| s * n)
    })?;
    Ok(Data::Frame(df))
}

/// Add `value` to numeric columns.
pub fn offset(x: DataFrame, _y: Option<Data>, params: &Params) -> Result<Data> {
    let value = params.number("value")?.clone();
    let df = map_numeric_columns(x, |s| {
        with_scalar(s, &value, |s, n| s + n, |s, n| s + n)
    })?;
    Ok(Data::Frame(df))
}

/// Standardize numeric columns to zero mean and unit (population) variance.
pub fn standard_scale(x: DataFrame, _y: Option<Data>, _params: &Params) -> Result<Data> {
    let df = map_numeric_columns(x, |s| {
        let s = s.cast(&DataType::Float64)?;
        let ca = s.f64()?;
        let mean = ca.mean().unwrap_or(0.0);
        let std = ca.std(0).unwrap_or(0.0);
        let centered = &s - mean;
        if std == 0.0 || !std.is_finite() {
            Ok(&centered * 0.0)
        } else {
            Ok(&centered / std)
        }
    })?;
    Ok(Data::Frame(df))
}

/// Rescale numeric columns into `[0, 1]`.
pub fn min_max_scale(x: DataFrame, _y: Option<Data>, _params: &Params) -> Result<Data> {
    let df = map_numeric_columns(x, |s| {
        let s = s.cast(&DataType::Float64)?;
        let ca = s.f64()?;
        let min = ca.min().unwrap_or(0.0);
        let max = ca.max().unwrap_or(0.0);
        let shifted = &s - min;
        let range = max - min;
        if range == 0.0 {
            Ok(&shifted * 0.0)
        } else {
            Ok(&shifted / range)
        }
    })?;
    Ok(Data::Frame(df))
}

/// Drop the named columns.
pub fn drop_columns(x: DataFrame, _y: Option<Data>, params: &Params) -> Result<Data> {
    let columns = params.get_str_list("columns")?;
    if let Some(missing) = columns.iter().find(|name| x.column(name).is_err()) {
        return Err(PipelineError::ColumnNotFound(missing.clone()));
    }
    let df = x.drop_many(columns);
    Ok(Data::Frame(df))
}

/// Append the secondary input as a column named `column`.
///
/// A target frame contributes its first column.
pub fn attach_target(x: DataFrame, y: Option<Data>, params: &Params) -> Result<Data> {
    let column = params.get_str("column")?;
    let target = match y {
        Some(Data::Series(s)) => s,
        Some(Data::Frame(df)) => df
            .get_columns()
            .first()
            .map(|col| col.as_materialized_series().clone())
            .ok_or_else(|| {
                PipelineError::step_failed("attach_target", "target frame has no columns")
            })?,
        None => {
            return Err(PipelineError::step_failed(
                "attach_target",
                "no secondary input supplied",
            ));
        }
    };

    if target.len() != x.height() {
        return Err(PipelineError::step_failed(
            "attach_target",
            format!(
                "target has {} rows but the table has {}",
                target.len(),
                x.height()
            ),
        ));
    }

    let mut df = x;
    let mut target = target;
    target.rename(column.into());
    df.with_column(target)?;
    Ok(Data::Frame(df))
}

/// Return a single column as a Series.
pub fn select_column(x: DataFrame, _y: Option<Data>, params: &Params) -> Result<Data> {
    let column = params.get_str("column")?;
    let series = x
        .column(column)
        .map_err(|_| PipelineError::ColumnNotFound(column.to_string()))?
        .as_materialized_series()
        .clone();
    Ok(Data::Series(series))
}

/// Apply an arithmetic op with a JSON number.
///
/// Integer columns combined with an integer that fits their dtype stay
/// integer; anything else is computed in Float64.
fn with_scalar(
    s: &Series,
    n: &Number,
    int_op: impl Fn(&Series, i64) -> Series,
    float_op: impl Fn(&Series, f64) -> Series,
) -> PolarsResult<Series> {
    match n.as_i64() {
        Some(i) if integer_fits_dtype(i, s.dtype()) => Ok(int_op(s, i)),
        _ => {
            let f = n.as_f64().unwrap_or(f64::NAN);
            let s = s.cast(&DataType::Float64)?;
            Ok(float_op(&s, f))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame() -> DataFrame {
        df!("A" => [1i64, 2, 3], "B" => [4i64, 5, 6], "name" => ["a", "b", "c"]).unwrap()
    }

    #[test]
    fn test_scale_keeps_integers() {
        let out = scale(frame(), None, &Params::new().with("factor", 3))
            .unwrap()
            .into_frame();
        let expected =
            df!("A" => [3i64, 6, 9], "B" => [12i64, 15, 18], "name" => ["a", "b", "c"]).unwrap();
        assert!(out.equals(&expected));
    }

    #[test]
    fn test_scale_by_float() {
        let out = scale(frame(), None, &Params::new().with("factor", 0.5))
            .unwrap()
            .into_frame();
        let expected =
            df!("A" => [0.5f64, 1.0, 1.5], "B" => [2.0f64, 2.5, 3.0], "name" => ["a", "b", "c"])
                .unwrap();
        assert!(out.equals(&expected));
    }

    #[test]
    fn test_offset() {
        let out = offset(frame(), None, &Params::new().with("value", 1))
            .unwrap()
            .into_frame();
        let expected =
            df!("A" => [2i64, 3, 4], "B" => [5i64, 6, 7], "name" => ["a", "b", "c"]).unwrap();
        assert!(out.equals(&expected));
    }

    #[test]
    fn test_negative_offset_on_unsigned_column() {
        let df = df!("A" => [1u32, 2, 3]).unwrap();
        let out = offset(df, None, &Params::new().with("value", -1))
            .unwrap()
            .into_frame();
        let expected = df!("A" => [0.0f64, 1.0, 2.0]).unwrap();
        assert!(out.equals(&expected));
    }

    #[test]
    fn test_scale_factor_wider_than_column() {
        let df = df!("A" => [1i8, 2, 3]).unwrap();
        let out = scale(df, None, &Params::new().with("factor", 1000))
            .unwrap()
            .into_frame();
        let expected = df!("A" => [1000.0f64, 2000.0, 3000.0]).unwrap();
        assert!(out.equals(&expected));
    }

    #[test]
    fn test_scale_keeps_narrow_integers_when_factor_fits() {
        let df = df!("A" => [1i8, 2, 3]).unwrap();
        let out = scale(df, None, &Params::new().with("factor", 2))
            .unwrap()
            .into_frame();
        assert_eq!(out.column("A").unwrap().dtype(), &DataType::Int8);
    }

    #[test]
    fn test_standard_scale_uses_population_std() {
        let df = df!("A" => [1.0f64, 3.0], "C" => [5i64, 5], "name" => ["a", "b"]).unwrap();
        let out = standard_scale(df, None, &Params::new()).unwrap().into_frame();
        let expected =
            df!("A" => [-1.0f64, 1.0], "C" => [0.0f64, 0.0], "name" => ["a", "b"]).unwrap();
        assert!(out.equals(&expected));
    }

    #[test]
    fn test_min_max_scale_constant_column() {
        let df = df!("A" => [1i64, 2, 3], "C" => [7i64, 7, 7]).unwrap();
        let out = min_max_scale(df, None, &Params::new()).unwrap().into_frame();
        let expected = df!("A" => [0.0f64, 0.5, 1.0], "C" => [0.0f64, 0.0, 0.0]).unwrap();
        assert!(out.equals(&expected));
    }

    #[test]
    fn test_drop_columns() {
        let out = drop_columns(frame(), None, &Params::new().with("columns", json!(["B"])))
            .unwrap()
            .into_frame();
        assert_eq!(out.get_column_names_str(), vec!["A", "name"]);

        let err = drop_columns(frame(), None, &Params::new().with("columns", "Z")).unwrap_err();
        assert!(matches!(err, PipelineError::ColumnNotFound(ref c) if c == "Z"));
    }

    #[test]
    fn test_attach_target() {
        let y = Series::new("label".into(), [0i64, 1, 0]);
        let out = attach_target(
            frame(),
            Some(Data::Series(y)),
            &Params::new().with("column", "target"),
        )
        .unwrap()
        .into_frame();
        assert_eq!(out.width(), 4);
        assert!(out.column("target").is_ok());
    }

    #[test]
    fn test_attach_target_height_mismatch() {
        let y = Series::new("label".into(), [0i64, 1]);
        let err = attach_target(
            frame(),
            Some(Data::Series(y)),
            &Params::new().with("column", "target"),
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "STEP_FAILED");
    }

    #[test]
    fn test_select_column_returns_series() {
        let out = select_column(frame(), None, &Params::new().with("column", "B")).unwrap();
        let series = out.as_series().unwrap();
        assert_eq!(series.name().as_str(), "B");
        assert_eq!(series.len(), 3);
    }
}
