//! Dot-path addressing inside a configuration tree.
//!
//! A [`DotPath`] names one location in a nested JSON object, e.g.
//! `sections.overviews.google.pinnedMetrics`. The free functions in this
//! module read and write through such a path:
//!
//! - [`get`] / [`get_or`] never fail; a missing or non-object intermediate
//!   node simply resolves to nothing.
//! - [`set`] creates intermediate objects as needed, overwriting any
//!   non-object value that sits in the way.
//!
//! ```rust
//! use adsight_core::path::{self, DotPath};
//! use serde_json::json;
//!
//! let mut tree = json!({});
//! let p = DotPath::parse("display.currency").unwrap();
//! path::set(&mut tree, &p, json!("EUR"));
//! assert_eq!(path::get(&tree, &p), Some(&json!("EUR")));
//! ```

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ============================================================================
// DotPath
// ============================================================================

/// A validated, dot-separated settings path.
///
/// Valid paths are non-empty and contain no empty segments, so
/// `""`, `".a"`, `"a."` and `"a..b"` are all rejected.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DotPath(Cow<'static, str>);

impl DotPath {
    /// Build a path from a string literal.
    ///
    /// Evaluated in a `const` item, an invalid literal is a compile error.
    pub const fn from_static(path: &'static str) -> Self {
        assert!(is_valid(path), "invalid settings path literal");
        Self(Cow::Borrowed(path))
    }

    /// Parse a path supplied at runtime.
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::invalid_path(path, "path is empty"));
        }
        if !is_valid(path) {
            return Err(Error::invalid_path(path, "path has an empty segment"));
        }
        Ok(Self(Cow::Owned(path.to_string())))
    }

    /// The path as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path's segments, outermost first.
    pub fn segments(&self) -> std::str::Split<'_, char> {
        self.0.split('.')
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// The parent path (if any) and the terminal key.
    pub fn split_leaf(&self) -> (Option<&str>, &str) {
        match self.0.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, &self.0),
        }
    }
}

const fn is_valid(path: &str) -> bool {
    let bytes = path.as_bytes();
    if bytes.is_empty() {
        return false;
    }
    let mut prev_dot = true;
    let mut i = 0;
    while i < bytes.len() {
        let dot = bytes[i] == b'.';
        if dot && prev_dot {
            return false;
        }
        prev_dot = dot;
        i += 1;
    }
    !prev_dot
}

impl fmt::Display for DotPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DotPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for DotPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for DotPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DotPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Tree access
// ============================================================================

/// Resolve `path` inside `tree`.
///
/// Returns `None` as soon as a segment is missing or an intermediate node is
/// not an object.
pub fn get<'a>(tree: &'a Value, path: &DotPath) -> Option<&'a Value> {
    let mut current = tree;
    for segment in path.segments() {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Resolve `path` inside `tree`, falling back to `default`.
pub fn get_or<'a>(tree: &'a Value, path: &DotPath, default: &'a Value) -> &'a Value {
    get(tree, path).unwrap_or(default)
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// A non-object root or intermediate value is replaced by an empty object.
/// The same tree is returned so calls can be chained.
pub fn set<'a>(tree: &'a mut Value, path: &DotPath, value: Value) -> &'a mut Value {
    *slot_mut(tree, path) = value;
    tree
}

/// Delete the terminal key of `path`, returning the removed value.
pub fn remove(tree: &mut Value, path: &DotPath) -> Option<Value> {
    let (parent, leaf) = path.split_leaf();
    let mut current = tree;
    if let Some(parent) = parent {
        for segment in parent.split('.') {
            current = current.as_object_mut()?.get_mut(segment)?;
        }
    }
    current.as_object_mut()?.remove(leaf)
}

/// Build the sparse override tree that changes only `path`.
pub fn sparse_patch(path: &DotPath, value: Value) -> Value {
    let mut patch = Value::Object(Map::new());
    set(&mut patch, path, value);
    patch
}

fn slot_mut<'a>(tree: &'a mut Value, path: &DotPath) -> &'a mut Value {
    let mut current = tree;
    for segment in path.segments() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        // Indexing an object by key inserts `null` for a missing entry.
        current = &mut current[segment];
    }
    current
}

// ============================================================================
// Tests
// ============================================================================
