//! mcpack — a pure-Rust codec for the mcpack v2 binary pack format.
//!
//! mcpack is a self-describing, tree-structured binary layout used to
//! exchange structured data with services that do not speak JSON. This crate
//! decodes untrusted buffers without panicking or reading out of bounds, and
//! encodes generic value trees back into the same layout.
//!
//! # Architecture
//!
//! - **`pack`** — Binary layout: tag model, item reader, value binder, encoder
//! - **`types`** — Generic `Value` and `PackMap` with dotted-path accessors
//! - **`ser` / `de`** — Serde bridge for Rust types (feature `serde`)
//!
//! # Example
//!
//! ```
//! use mcpack::{PackMap, Value};
//!
//! let mut user = PackMap::new();
//! user.insert("username".into(), Value::from("js"));
//! user.insert("age".into(), Value::Int32(10));
//!
//! let bytes = mcpack::marshal(&Value::Map(user)).unwrap();
//! let decoded = mcpack::decode(&bytes).unwrap();
//! assert_eq!(decoded.get_str("username", ""), "js");
//! assert_eq!(decoded.get_i32("age", 0), 10);
//! assert!(decoded.get("missing").is_null());
//! ```

pub mod error;
pub mod pack;
pub mod types;

#[cfg(feature = "serde")]
pub mod de;
#[cfg(feature = "serde")]
pub mod ser;

pub use error::{PackError, Result};
pub use pack::{Decoder, Encoder};
pub use types::{PackMap, Value};

#[cfg(feature = "serde")]
pub use de::{from_slice, from_value};
#[cfg(feature = "serde")]
pub use ser::{to_value, to_vec};

/// Decodes a pack buffer whose root item is an object.
///
/// Any structural problem yields [`PackError::InvalidPack`].
pub fn decode(buf: &[u8]) -> Result<PackMap> {
    Decoder::default().decode(buf)
}

/// Encodes a value tree. The root must be a [`Value::Map`]; anything without
/// a pack representation yields [`PackError::Marshal`].
pub fn marshal(value: &Value) -> Result<bytes::Bytes> {
    Encoder::default().marshal(value)
}
