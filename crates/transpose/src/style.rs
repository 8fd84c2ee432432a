//! Flat style maps applied to nodes.
//!
//! A [`Style`] is a key -> [`StyleValue`] map using the host's property names
//! (`opacity`, `backgroundColor`, `x`, `width`, ...). Values are either plain
//! numbers, resolved RGBA colours produced by interpolation, or keywords that
//! are passed through untouched (`"red"`, `"hidden"`, `"auto"`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Style key toggled by elements that leave without an exit animation.
pub const VISIBILITY: &str = "visibility";

/// Keyword value used to hide a node.
pub const HIDDEN: &str = "hidden";

/// A single style value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    /// Numeric value (opacity, x, width, ...). Lengths are unitless pixels.
    Number(f64),
    /// RGBA colour with components in `0.0..=1.0`.
    Color([f32; 4]),
    /// Any other value, kept verbatim.
    Keyword(String),
}

impl StyleValue {
    /// Parse a raw host value, accepting plain numbers and `px` lengths.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let numeric = trimmed.strip_suffix("px").unwrap_or(trimmed);
        match numeric.parse::<f64>() {
            Ok(value) => Self::Number(value),
            Err(_) => Self::Keyword(trimmed.to_string()),
        }
    }

    /// Try to extract a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Keyword(raw) => match Self::parse(raw) {
                Self::Number(value) => Some(value),
                _ => None,
            },
            Self::Color(_) => None,
        }
    }

    /// Try to extract a keyword.
    pub fn as_keyword(&self) -> Option<&str> {
        match self {
            Self::Keyword(raw) => Some(raw),
            _ => None,
        }
    }
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{}", value),
            Self::Color([r, g, b, a]) => {
                let channel = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
                if (a - 1.0).abs() < 1e-6 {
                    write!(f, "rgb({}, {}, {})", channel(*r), channel(*g), channel(*b))
                } else {
                    write!(
                        f,
                        "rgba({}, {}, {}, {})",
                        channel(*r),
                        channel(*g),
                        channel(*b),
                        a
                    )
                }
            }
            Self::Keyword(raw) => f.write_str(raw),
        }
    }
}

impl From<f64> for StyleValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for StyleValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        Self::Keyword(value.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        Self::Keyword(value)
    }
}

/// An ordered key -> value style map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Style(BTreeMap<String, StyleValue>);

impl Style {
    /// Create an empty style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<StyleValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or overwrite a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<StyleValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&StyleValue> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<StyleValue> {
        self.0.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `other` on top of this style; `other` wins on conflicts.
    pub fn merge(&mut self, other: &Style) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Return a copy of this style overlaid with `other`.
    pub fn merged(&self, other: &Style) -> Style {
        let mut out = self.clone();
        out.merge(other);
        out
    }
}

impl<K, V> FromIterator<(K, V)> for Style
where
    K: Into<String>,
    V: Into<StyleValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
