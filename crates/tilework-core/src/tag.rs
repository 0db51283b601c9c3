//! Structured key-value tag used for persistent processor state.
//!
//! A [`TagStore`] is an insertion-ordered map from string keys to
//! [`TagValue`]s. Processors write their fields in `save_data` and read
//! them back in `load_data`; the core never interprets the contents.

use indexmap::IndexMap;

/// A single value in a [`TagStore`].
#[derive(Clone, Debug, PartialEq)]
pub enum TagValue {
    /// Unsigned byte.
    Byte(u8),
    /// Boolean flag.
    Bool(bool),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Opaque byte array.
    Bytes(Vec<u8>),
    /// Ordered list of values.
    List(Vec<TagValue>),
    /// Nested tag.
    Compound(TagStore),
}

/// Insertion-ordered map of named [`TagValue`]s.
///
/// # Examples
///
/// ```
/// use tilework_core::{TagStore, TagValue};
///
/// let mut tag = TagStore::new();
/// tag.set("fuel", TagValue::Int(12));
/// tag.set("lit", TagValue::Bool(true));
/// assert_eq!(tag.get_int("fuel"), Some(12));
/// assert_eq!(tag.get_bool("lit"), Some(true));
/// assert_eq!(tag.get_int("lit"), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TagStore {
    entries: IndexMap<String, TagValue>,
}

impl TagStore {
    /// Create an empty tag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: TagValue) -> Option<TagValue> {
        self.entries.insert(key.into(), value)
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.entries.get(key)
    }

    /// Remove a value, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<TagValue> {
        self.entries.shift_remove(key)
    }

    /// Whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tag has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Typed getter for [`TagValue::Byte`].
    pub fn get_byte(&self, key: &str) -> Option<u8> {
        match self.get(key)? {
            TagValue::Byte(v) => Some(*v),
            _ => None,
        }
    }

    /// Typed getter for [`TagValue::Bool`].
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            TagValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Typed getter for [`TagValue::Int`].
    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.get(key)? {
            TagValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Typed getter for [`TagValue::Long`].
    pub fn get_long(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            TagValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Typed getter for [`TagValue::Float`].
    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.get(key)? {
            TagValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Typed getter for [`TagValue::Double`].
    pub fn get_double(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            TagValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Typed getter for [`TagValue::String`].
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            TagValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// Typed getter for [`TagValue::Bytes`].
    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        match self.get(key)? {
            TagValue::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// Typed getter for [`TagValue::List`].
    pub fn get_list(&self, key: &str) -> Option<&[TagValue]> {
        match self.get(key)? {
            TagValue::List(v) => Some(v),
            _ => None,
        }
    }

    /// Typed getter for [`TagValue::Compound`].
    pub fn get_compound(&self, key: &str) -> Option<&TagStore> {
        match self.get(key)? {
            TagValue::Compound(v) => Some(v),
            _ => None,
        }
    }
}

impl FromIterator<(String, TagValue)> for TagStore {
    fn from_iter<I: IntoIterator<Item = (String, TagValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
