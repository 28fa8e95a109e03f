//! Keyed pack object with dotted-path lookup.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};

use super::value::{NULL, Value};

/// A pack object: unique string keys, no defined iteration order.
///
/// Derefs to the underlying `HashMap`, so plain key operations (`insert`,
/// `contains_key`, `iter`, ...) are available directly. [`get`](Self::get)
/// takes a dotted path rather than a single key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PackMap(HashMap<String, Value>);

macro_rules! typed_getters {
    ($($(#[$doc:meta])* $name:ident => $variant:ident : $ty:ty;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(&self, path: &str, default: $ty) -> $ty {
                match self.get(path) {
                    Value::$variant(v) => *v,
                    _ => default,
                }
            }
        )*
    };
}

impl PackMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(HashMap::with_capacity(capacity))
    }

    pub fn into_inner(self) -> HashMap<String, Value> {
        self.0
    }

    /// Resolves a `.`-separated path through nested maps.
    ///
    /// Returns `None` when a segment is missing or an intermediate value is
    /// not a map.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = match current {
                Value::Map(m) => m.0.get(segment)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Like [`lookup`](Self::lookup), but a miss yields [`Value::Null`].
    pub fn get(&self, path: &str) -> &Value {
        self.lookup(path).unwrap_or(&NULL)
    }

    /// Returns the string at `path`, or `default` when the path is missing or
    /// holds anything other than a string.
    pub fn get_str<'a>(&'a self, path: &str, default: &'a str) -> &'a str {
        match self.get(path) {
            Value::String(s) => s,
            _ => default,
        }
    }

    pub fn get_raw<'a>(&'a self, path: &str, default: &'a [u8]) -> &'a [u8] {
        match self.get(path) {
            Value::Raw(b) => b,
            _ => default,
        }
    }

    pub fn get_array(&self, path: &str) -> Option<&[Value]> {
        self.get(path).as_array()
    }

    pub fn get_map(&self, path: &str) -> Option<&PackMap> {
        self.get(path).as_map()
    }

    typed_getters! {
        get_bool => Bool: bool;
        get_i8 => Int8: i8;
        get_i16 => Int16: i16;
        /// Returns the `Int32` at `path`, or `default`.
        ///
        /// Only an exact `Int32` matches: an `Int8` or `Int64` at the same
        /// path yields `default`.
        get_i32 => Int32: i32;
        get_i64 => Int64: i64;
        get_u8 => UInt8: u8;
        get_u16 => UInt16: u16;
        get_u32 => UInt32: u32;
        get_u64 => UInt64: u64;
        get_f32 => Float32: f32;
        get_f64 => Float64: f64;
    }
}

impl Deref for PackMap {
    type Target = HashMap<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PackMap {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<HashMap<String, Value>> for PackMap {
    fn from(map: HashMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for PackMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for PackMap {
    type Item = (String, Value);
    type IntoIter = std::collections::hash_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PackMap {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::collections::hash_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for PackMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.0.keys().collect();
        keys.sort();
        f.write_str("{")?;
        for (i, key) in keys.into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key:?}: {}", self.0[key])?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PackMap {
        let inner: PackMap = [("x", Value::Int32(1)), ("y", Value::Int64(2))]
            .into_iter()
            .collect();
        let mut m = PackMap::new();
        m.insert("a".into(), Value::Map(inner));
        m.insert("name".into(), Value::from("js"));
        m.insert("flag".into(), Value::Bool(true));
        m.insert("nothing".into(), Value::Null);
        m
    }

    #[test]
    fn dotted_path_walks_maps() {
        let m = sample();
        assert_eq!(m.get("a.x"), &Value::Int32(1));
        assert_eq!(m.get_i32("a.x", -1), 1);
        assert_eq!(m.get_str("name", ""), "js");
        assert!(m.get_bool("flag", false));
    }

    #[test]
    fn miss_returns_null_and_default() {
        let m = sample();
        assert!(m.get("missing").is_null());
        assert!(m.lookup("missing").is_none());
        assert!(m.get("a.x.deeper").is_null());
        assert!(m.get("name.len").is_null());
        assert_eq!(m.get_i32("a.b.c", -1), -1);
        assert_eq!(m.get_str("a", "dflt"), "dflt");
    }

    #[test]
    fn explicit_null_is_distinguishable() {
        let m = sample();
        assert_eq!(m.lookup("nothing"), Some(&Value::Null));
        assert!(m.get("nothing").is_null());
    }

    #[test]
    fn typed_getters_do_not_convert() {
        let m = sample();
        // y is an Int64; no narrowing to i32.
        assert_eq!(m.get_i32("a.y", -1), -1);
        assert_eq!(m.get_i64("a.y", -1), 2);
        // x is an Int32; no widening to i64.
        assert_eq!(m.get_i64("a.x", -1), -1);
        assert_eq!(m.get_u32("a.x", 9), 9);
        assert_eq!(m.get_f64("a.x", 0.5), 0.5);
    }

    #[test]
    fn display_sorts_keys() {
        let m: PackMap = [("b", 2i8), ("a", 1i8)].into_iter().collect();
        assert_eq!(m.to_string(), r#"{"a": 1, "b": 2}"#);
    }
}
