//! Generic pack value types and path accessors.

mod map;
mod value;

pub use map::PackMap;
pub use value::Value;
