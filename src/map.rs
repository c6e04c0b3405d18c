//! Ordered map type for GLYPH maps and struct fields.
//!
//! This module provides [`GlyphMap`], a wrapper around [`IndexMap`] that
//! maintains insertion order and enforces unique keys (last write wins).
//! Canonical emission sorts keys by their canonical byte sequence, but that is
//! the canonicalizer's job; the map itself preserves the order entries were
//! built in, which matters for round-tripping table rows in source order.
//!
//! ## Examples
//!
//! ```rust
//! use glyph::{GlyphMap, Value};
//!
//! let mut map = GlyphMap::new();
//! map.insert("name".to_string(), Value::from("Alice"));
//! map.insert("age".to_string(), Value::from(30));
//!
//! assert_eq!(map.len(), 2);
//! assert_eq!(map.get("name").and_then(|v| v.as_str()), Some("Alice"));
//! ```

use indexmap::IndexMap;
use std::collections::HashMap;

/// An insertion-ordered map of string keys to GLYPH values.
///
/// Keys are unique; inserting an existing key replaces its value in place.
///
/// # Examples
///
/// ```rust
/// use glyph::{GlyphMap, Value};
///
/// let mut map = GlyphMap::new();
/// map.insert("first".to_string(), Value::from(1));
/// map.insert("second".to_string(), Value::from(2));
///
/// let keys: Vec<_> = map.keys().cloned().collect();
/// assert_eq!(keys, vec!["first", "second"]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GlyphMap(IndexMap<String, crate::Value>);

impl GlyphMap {
    /// Creates an empty `GlyphMap`.
    #[must_use]
    pub fn new() -> Self {
        GlyphMap(IndexMap::new())
    }

    /// Creates an empty `GlyphMap` with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        GlyphMap(IndexMap::with_capacity(capacity))
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map already contained this key, the old value is returned and
    /// the entry keeps its original position.
    pub fn insert(&mut self, key: String, value: crate::Value) -> Option<crate::Value> {
        self.0.insert(key, value)
    }

    /// Removes a key from the map, returning its value if it was present.
    ///
    /// Uses shift-removal so remaining entries keep their relative order.
    pub fn remove(&mut self, key: &str) -> Option<crate::Value> {
        self.0.shift_remove(key)
    }

    /// Returns a reference to the value corresponding to the key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&crate::Value> {
        self.0.get(key)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut crate::Value> {
        self.0.get_mut(key)
    }

    /// Returns `true` if the map contains the key.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of entries in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the map contains no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the keys, in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, crate::Value> {
        self.0.keys()
    }

    /// Returns an iterator over the values, in insertion order.
    pub fn values(&self) -> indexmap::map::Values<'_, String, crate::Value> {
        self.0.values()
    }

    /// Returns an iterator over the key-value pairs, in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, crate::Value> {
        self.0.iter()
    }
}

impl From<HashMap<String, crate::Value>> for GlyphMap {
    fn from(map: HashMap<String, crate::Value>) -> Self {
        GlyphMap(map.into_iter().collect())
    }
}

impl From<GlyphMap> for HashMap<String, crate::Value> {
    fn from(map: GlyphMap) -> Self {
        map.0.into_iter().collect()
    }
}

impl IntoIterator for GlyphMap {
    type Item = (String, crate::Value);
    type IntoIter = indexmap::map::IntoIter<String, crate::Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a GlyphMap {
    type Item = (&'a String, &'a crate::Value);
    type IntoIter = indexmap::map::Iter<'a, String, crate::Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, crate::Value)> for GlyphMap {
    fn from_iter<T: IntoIterator<Item = (String, crate::Value)>>(iter: T) -> Self {
        GlyphMap(IndexMap::from_iter(iter))
    }
}
