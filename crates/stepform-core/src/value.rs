//! Field values exchanged with the server.
//!
//! A serialized form is a [`FormData`] mapping from field name to a
//! [`FieldValue`]. The same shape is used for parsed location queries, so a
//! query can be merged into a request payload or written back into fields.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A serialized form payload: field name to value.
pub type FormData = BTreeMap<String, FieldValue>;

/// One serialized field value.
///
/// Serializes untagged, so the JSON shape is the natural one: `true`,
/// `"text"`, `["a", "b"]`, or `{"key": ["a"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// The checked state of a single checkbox.
    Bool(bool),
    /// A scalar text value.
    Text(String),
    /// An ordered multi-value field (`name[]`).
    List(Vec<String>),
    /// A dict of lists (`name[key][]`).
    Dict(BTreeMap<String, Vec<String>>),
}

impl FieldValue {
    /// Returns the scalar text, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list items, if this is a list value.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns `true` for values a browser would consider falsy: empty text,
    /// `false`, and empty collections.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bool(b) => !b,
            Self::Text(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Dict(map) => map.is_empty(),
        }
    }

    /// Collapses a single-element list to its scalar; other values are
    /// returned unchanged.
    #[must_use]
    pub fn collapse(self) -> Self {
        match self {
            Self::List(mut items) if items.len() == 1 => Self::Text(items.remove(0)),
            other => other,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::List(items) => write!(f, "{}", items.join(",")),
            Self::Dict(map) => {
                let parts: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{k}:{}", v.join(",")))
                    .collect();
                write!(f, "{}", parts.join(";"))
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

impl From<usize> for FieldValue {
    fn from(n: usize) -> Self {
        Self::Text(n.to_string())
    }
}
