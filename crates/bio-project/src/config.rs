//! Nested run configuration (`group -> key -> value`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ProjectError, ProjectResult};

/// Parsed solver configuration. Group names and keys are stored lowercase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunConfig {
    groups: Map<String, Value>,
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> ProjectResult<Self> {
        match value {
            Value::Object(groups) => Ok(Self { groups }),
            _ => Err(ProjectError::WrongType {
                key: "<root>".to_string(),
                expected: "object",
            }),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&Map<String, Value>> {
        self.groups
            .get(&name.to_ascii_lowercase())
            .and_then(Value::as_object)
    }

    pub fn insert(&mut self, group: &str, key: &str, value: impl Into<Value>) {
        self.ensure_group(group);
        if let Some(Value::Object(map)) = self.groups.get_mut(&group.to_ascii_lowercase()) {
            map.insert(key.to_ascii_lowercase(), value.into());
        }
    }

    /// Registers `name` as a (possibly empty) group.
    pub fn ensure_group(&mut self, name: &str) {
        self.groups
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    pub fn get(&self, group: &str, key: &str) -> Option<&Value> {
        self.group(group)?.get(&key.to_ascii_lowercase())
    }

    /// Depth-first search for `key` in any group; first match wins.
    pub fn search(&self, key: &str) -> Option<&Value> {
        search_in(&self.groups, &key.to_ascii_lowercase())
    }

    pub fn get_f64(&self, group: &str, key: &str) -> Option<f64> {
        self.get(group, key).and_then(as_f64)
    }

    pub fn get_i64(&self, group: &str, key: &str) -> Option<i64> {
        self.get(group, key).and_then(Value::as_i64)
    }

    pub fn get_bool(&self, group: &str, key: &str) -> Option<bool> {
        self.get(group, key).and_then(as_bool)
    }

    pub fn get_str(&self, group: &str, key: &str) -> Option<&str> {
        self.get(group, key).and_then(Value::as_str)
    }

    pub fn search_f64(&self, key: &str) -> Option<f64> {
        self.search(key).and_then(as_f64)
    }

    pub fn search_bool(&self, key: &str) -> Option<bool> {
        self.search(key).and_then(as_bool)
    }

    pub fn require_f64(&self, key: &str) -> ProjectResult<f64> {
        let value = self.search(key).ok_or_else(|| ProjectError::MissingKey {
            key: key.to_string(),
        })?;
        as_f64(value).ok_or_else(|| ProjectError::WrongType {
            key: key.to_string(),
            expected: "number",
        })
    }

    pub fn require_usize(&self, key: &str) -> ProjectResult<usize> {
        let value = self.search(key).ok_or_else(|| ProjectError::MissingKey {
            key: key.to_string(),
        })?;
        value
            .as_u64()
            .map(|v| v as usize)
            .ok_or_else(|| ProjectError::WrongType {
                key: key.to_string(),
                expected: "non-negative integer",
            })
    }
}

fn search_in<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(v) = map.get(key) {
        return Some(v);
    }
    map.values()
        .filter_map(Value::as_object)
        .find_map(|inner| search_in(inner, key))
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        _ => None,
    }
}
