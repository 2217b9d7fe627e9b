//! Null-propagating reads over untyped JSON.
//!
//! Every accessor is total: a missing member or a type mismatch yields
//! `None`, so deep reads compose with `?` or `and_then` instead of nested
//! matches.
//!
//! ```
//! use fedistats_scanner::json::JsonExtractor;
//!
//! let value = serde_json::json!({ "software": { "name": "mastodon" } });
//! let name = JsonExtractor::new(&value)
//!     .field("software")
//!     .and_then(|s| s.field("name"))
//!     .and_then(|n| n.as_str());
//! assert_eq!(name, Some("mastodon"));
//! ```

use serde_json::{Number, Value};

#[derive(Debug, Clone, Copy)]
pub struct JsonExtractor<'a> {
    value: &'a Value,
}

impl<'a> JsonExtractor<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    /// Member `name` of a non-null object.
    pub fn field(&self, name: &str) -> Option<JsonExtractor<'a>> {
        self.value.as_object()?.get(name).map(JsonExtractor::new)
    }

    /// One extractor per array element. A non-array value is returned as a
    /// single element, since some servers emit a bare scalar where a list
    /// belongs.
    pub fn elements(&self) -> Vec<JsonExtractor<'a>> {
        match self.value {
            Value::Array(items) => items.iter().map(JsonExtractor::new).collect(),
            _ => vec![*self],
        }
    }

    /// Strict variant of [`elements`](Self::elements): `None` unless the
    /// value really is an array.
    pub fn as_array(&self) -> Option<Vec<JsonExtractor<'a>>> {
        self.value
            .as_array()
            .map(|items| items.iter().map(JsonExtractor::new).collect())
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.value.as_str()
    }

    pub fn as_number(&self) -> Option<&'a Number> {
        match self.value {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_bool()
    }

    /// String elements of this value, via [`elements`](Self::elements).
    pub fn string_elements(&self) -> Vec<String> {
        self.elements()
            .iter()
            .filter_map(|x| x.as_str())
            .map(str::to_string)
            .collect()
    }

    /// Follows a path of object members.
    pub fn path(&self, names: &[&str]) -> Option<JsonExtractor<'a>> {
        names
            .iter()
            .try_fold(*self, |current, name| current.field(name))
    }
}
