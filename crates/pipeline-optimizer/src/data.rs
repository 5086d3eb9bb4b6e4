//! The value threaded through a pipeline.
//!
//! Steps take a DataFrame and may return either a DataFrame or a Series
//! (typically the terminal step). The same type carries the optional
//! secondary input, which can be a label Series or a target DataFrame.

use polars::prelude::*;
use std::fmt;

/// A DataFrame or a Series.
///
/// Cloning is cheap: Polars columns are reference counted and copy on
/// write, so a clone behaves as an independent copy of the data.
#[derive(Debug, Clone)]
pub enum Data {
    Frame(DataFrame),
    Series(Series),
}

impl Data {
    /// Short name of the container kind, used in log and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Data::Frame(_) => "DataFrame",
            Data::Series(_) => "Series",
        }
    }

    pub fn is_frame(&self) -> bool {
        matches!(self, Data::Frame(_))
    }

    pub fn is_series(&self) -> bool {
        matches!(self, Data::Series(_))
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        match self {
            Data::Frame(df) => df.height(),
            Data::Series(s) => s.len(),
        }
    }

    /// `(rows, columns)`; a Series counts as one column.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Data::Frame(df) => df.shape(),
            Data::Series(s) => (s.len(), 1),
        }
    }

    pub fn as_frame(&self) -> Option<&DataFrame> {
        match self {
            Data::Frame(df) => Some(df),
            Data::Series(_) => None,
        }
    }

    pub fn as_series(&self) -> Option<&Series> {
        match self {
            Data::Frame(_) => None,
            Data::Series(s) => Some(s),
        }
    }

    /// Convert into a DataFrame. A Series becomes a single-column frame.
    pub fn into_frame(self) -> DataFrame {
        match self {
            Data::Frame(df) => df,
            Data::Series(s) => s.into_frame(),
        }
    }

    /// Return the Series, or the first column of a single-column frame.
    pub fn into_series(self) -> Option<Series> {
        match self {
            Data::Series(s) => Some(s),
            Data::Frame(df) if df.width() == 1 => df
                .get_columns()
                .first()
                .map(|col| col.as_materialized_series().clone()),
            Data::Frame(_) => None,
        }
    }

    /// Value equality; a frame never equals a series.
    pub fn equals(&self, other: &Data) -> bool {
        match (self, other) {
            (Data::Frame(a), Data::Frame(b)) => a.equals_missing(b),
            (Data::Series(a), Data::Series(b)) => a.equals_missing(b),
            _ => false,
        }
    }
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl From<DataFrame> for Data {
    fn from(df: DataFrame) -> Self {
        Data::Frame(df)
    }
}

impl From<Series> for Data {
    fn from(series: Series) -> Self {
        Data::Series(series)
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::Frame(df) => write!(f, "{df}"),
            Data::Series(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_and_kind() {
        let df = df!("A" => [1i64, 2, 3], "B" => [4i64, 5, 6]).unwrap();
        let data = Data::from(df);
        assert_eq!(data.kind(), "DataFrame");
        assert_eq!(data.shape(), (3, 2));

        let series = Series::new("y".into(), [0i64, 1, 0]);
        let data = Data::from(series);
        assert!(data.is_series());
        assert_eq!(data.shape(), (3, 1));
    }

    #[test]
    fn test_series_into_frame() {
        let series = Series::new("y".into(), [1.0f64, 2.0]);
        let frame = Data::from(series).into_frame();
        assert_eq!(frame.width(), 1);
        assert_eq!(frame.get_column_names()[0].as_str(), "y");
    }

    #[test]
    fn test_into_series_from_single_column_frame() {
        let df = df!("label" => [1i64, 0, 1]).unwrap();
        let series = Data::from(df).into_series().unwrap();
        assert_eq!(series.name().as_str(), "label");

        let wide = df!("A" => [1i64], "B" => [2i64]).unwrap();
        assert!(Data::from(wide).into_series().is_none());
    }

    #[test]
    fn test_equals() {
        let a = Data::from(df!("A" => [1i64, 2]).unwrap());
        let b = Data::from(df!("A" => [1i64, 2]).unwrap());
        let c = Data::from(Series::new("A".into(), [1i64, 2]));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
