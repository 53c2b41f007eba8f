//! Projection of outgoing mutation payloads.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use crate::error::ApiError;
use crate::types::Params;

type TransformFn = dyn Fn(Params) -> Params + Send + Sync;

/// Either a key allowlist or an arbitrary transform of the payload.
pub enum Filter {
    Keys(HashSet<String>),
    Transform(Box<TransformFn>),
}

impl Filter {
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::Keys(keys.into_iter().map(Into::into).collect())
    }

    pub fn transform<F>(f: F) -> Self
    where
        F: Fn(Params) -> Params + Send + Sync + 'static,
    {
        Filter::Transform(Box::new(f))
    }

    /// Build a key filter from dynamic JSON. Only an array of strings is
    /// accepted; objects, scalars and mixed arrays are rejected.
    pub fn from_value(value: &Value) -> Result<Self, ApiError> {
        let Value::Array(items) = value else {
            return Err(ApiError::InvalidFilter(format!(
                "expected an array of keys, got {value}"
            )));
        };
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(ApiError::InvalidFilter(format!("non-string key {other}"))),
            })
            .collect::<Result<HashSet<_>, _>>()
            .map(Filter::Keys)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            Filter::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

pub fn filter_values(filter: &Filter, data: Params) -> Params {
    match filter {
        Filter::Keys(keys) => data.into_iter().filter(|(k, _)| keys.contains(k)).collect(),
        Filter::Transform(f) => f(data),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use super::*;

    fn data() -> Params {
        match json!({"a": 1, "b": 2, "c": 3}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn key_list_keeps_only_allowed_keys() {
        let out = filter_values(&Filter::keys(["a", "c"]), data());
        assert_eq!(Value::Object(out), json!({"a": 1, "c": 3}));
    }

    #[test]
    fn empty_key_list_drops_everything() {
        let out = filter_values(&Filter::keys(Vec::<String>::new()), data());
        assert!(out.is_empty());
    }

    #[test]
    fn keys_missing_from_data_are_ignored() {
        let out = filter_values(&Filter::keys(["a", "zzz"]), data());
        assert_eq!(Value::Object(out), json!({"a": 1}));
    }

    #[test]
    fn transform_result_is_returned_as_is_and_called_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let filter = Filter::transform(move |mut d| {
            counter.fetch_add(1, Ordering::SeqCst);
            d.insert("extra".to_string(), json!("x"));
            d
        });
        let out = filter_values(&filter, data());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            Value::Object(out),
            json!({"a": 1, "b": 2, "c": 3, "extra": "x"})
        );
    }

    #[test]
    fn from_value_accepts_string_array() {
        let filter = Filter::from_value(&json!(["b"])).unwrap();
        let out = filter_values(&filter, data());
        assert_eq!(Value::Object(out), json!({"b": 2}));
    }

    #[test]
    fn from_value_rejects_plain_mapping() {
        let err = Filter::from_value(&json!({"a": true})).unwrap_err();
        assert!(matches!(err, ApiError::InvalidFilter(_)));
    }

    #[test]
    fn from_value_rejects_non_string_keys() {
        let err = Filter::from_value(&json!(["a", 1])).unwrap_err();
        assert!(matches!(err, ApiError::InvalidFilter(_)));
    }
}
