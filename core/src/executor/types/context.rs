use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

/// Immutable value bag threaded down each branch of a walk.
///
/// Cloning is cheap (the map sits behind an `Arc`); every extension copies the
/// map, so a branch never observes values written by a sibling branch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkContext {
    values: Arc<BTreeMap<String, Value>>,
}

impl WorkContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a context from an initial payload
    pub fn from_payload<I, K>(payload: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let values = payload.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            values: Arc::new(values),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Return a new context with `key` set to `value`
    pub fn with(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut values = (*self.values).clone();
        values.insert(key.into(), value.into());
        Self {
            values: Arc::new(values),
        }
    }

    /// Return a new context holding `self` overlaid with every entry of `other`
    pub fn merge(&self, other: &WorkContext) -> Self {
        if other.is_empty() || Arc::ptr_eq(&self.values, &other.values) {
            return self.clone();
        }
        let mut values = (*self.values).clone();
        for (k, v) in other.values.iter() {
            values.insert(k.clone(), v.clone());
        }
        Self {
            values: Arc::new(values),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}
