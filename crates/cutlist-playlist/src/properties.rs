//! String property bags.

use serde::{Deserialize, Serialize};

/// Insertion-ordered name/value properties.
///
/// Values are stored as text; numeric accessors parse on read and fall back
/// to zero, so an absent `audio_index` reads as `0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    entries: Vec<(String, String)>,
}

impl Properties {
    /// Create an empty property bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a property value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a property as an integer (0 when absent or not numeric).
    pub fn get_int(&self, name: &str) -> i64 {
        self.get(name).map(parse_int).unwrap_or(0)
    }

    /// Get a property as a float (0.0 when absent or not numeric).
    pub fn get_double(&self, name: &str) -> f64 {
        self.get(name)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    /// Set a property, replacing any previous value.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Set an integer property.
    pub fn set_int(&mut self, name: &str, value: i64) {
        self.set(name, value.to_string());
    }

    /// Remove a property. Returns the previous value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Copy every property of `other` into `self`.
    pub fn inherit(&mut self, other: &Properties) {
        for (name, value) in other.iter() {
            self.set(name, value);
        }
    }
}

/// Leading-integer parse: `"12"`, `" -3"`, `"0.5"` (as 0), `"7px"` (as 7).
fn parse_int(value: &str) -> i64 {
    let value = value.trim();
    if let Ok(v) = value.parse::<i64>() {
        return v;
    }
    let end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(value.len());
    value[..end].parse().unwrap_or(0)
}
