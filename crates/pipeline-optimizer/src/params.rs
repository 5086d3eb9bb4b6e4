//! Bound keyword parameters for a step.
//!
//! Parameters are stored as JSON values so that any binding can be
//! persisted next to the step name and replayed after a reload.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// Ordered map of parameter name to bound value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Bind `name` to `value`, returning the previous binding.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parameter names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn require(&self, name: &str) -> Result<&Value> {
        self.get(name).ok_or_else(|| PipelineError::InvalidParameter {
            param: name.to_string(),
            reason: "no value bound".to_string(),
        })
    }

    /// Get a numeric parameter, preserving whether it was an integer.
    pub fn number(&self, name: &str) -> Result<&Number> {
        match self.require(name)? {
            Value::Number(n) => Ok(n),
            other => Err(type_mismatch(name, "a number", other)),
        }
    }

    pub fn get_f64(&self, name: &str) -> Result<f64> {
        self.number(name)?
            .as_f64()
            .ok_or_else(|| type_mismatch(name, "a finite number", &Value::Null))
    }

    pub fn get_i64(&self, name: &str) -> Result<i64> {
        let number = self.number(name)?;
        number
            .as_i64()
            .ok_or_else(|| type_mismatch(name, "an integer", &Value::Number(number.clone())))
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        match self.require(name)? {
            Value::Bool(b) => Ok(*b),
            other => Err(type_mismatch(name, "a boolean", other)),
        }
    }

    pub fn get_str(&self, name: &str) -> Result<&str> {
        match self.require(name)? {
            Value::String(s) => Ok(s),
            other => Err(type_mismatch(name, "a string", other)),
        }
    }

    /// Get a list of strings. A single string is accepted as a one-element list.
    pub fn get_str_list(&self, name: &str) -> Result<Vec<String>> {
        match self.require(name)? {
            Value::String(s) => Ok(vec![s.clone()]),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(type_mismatch(name, "a list of strings", other)),
                })
                .collect(),
            other => Err(type_mismatch(name, "a list of strings", other)),
        }
    }
}

fn type_mismatch(name: &str, expected: &str, found: &Value) -> PipelineError {
    PipelineError::InvalidParameter {
        param: name.to_string(),
        reason: format!("expected {expected}, found {found}"),
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Params(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_getters() {
        let params = Params::new()
            .with("factor", 3)
            .with("ratio", 0.5)
            .with("inplace", false)
            .with("column", "target")
            .with("columns", json!(["A", "B"]));

        assert_eq!(params.get_i64("factor").unwrap(), 3);
        assert_eq!(params.get_f64("factor").unwrap(), 3.0);
        assert_eq!(params.get_f64("ratio").unwrap(), 0.5);
        assert!(!params.get_bool("inplace").unwrap());
        assert_eq!(params.get_str("column").unwrap(), "target");
        assert_eq!(params.get_str_list("columns").unwrap(), vec!["A", "B"]);
        assert_eq!(params.get_str_list("column").unwrap(), vec!["target"]);
    }

    #[test]
    fn test_missing_parameter() {
        let err = Params::new().get_f64("factor").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
        assert!(err.to_string().contains("factor"));
    }

    #[test]
    fn test_wrong_type() {
        let params = Params::new().with("factor", "two");
        let err = params.get_f64("factor").unwrap_err();
        assert!(err.to_string().contains("expected a number"));

        let params = Params::new().with("factor", 2.5);
        assert!(params.get_i64("factor").is_err());
    }

    #[test]
    fn test_json_shape() {
        let params: Params = [("factor", 3)].into_iter().collect();
        assert_eq!(serde_json::to_value(&params).unwrap(), json!({ "factor": 3 }));
    }
}
