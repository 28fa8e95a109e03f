//! The mcpack v2 binary layout.
//!
//! Every item is a type tag, a one-byte name length, an optional payload
//! length (absent for fixed-width types, one byte for short items, four
//! little-endian bytes otherwise), the name and the payload. Objects and
//! arrays carry a four-byte little-endian element count followed by their
//! children. Multi-byte numbers are little-endian.

pub mod bind;
pub mod decode;
pub mod encode;
pub mod marker;
pub mod reader;

pub use decode::Decoder;
pub use encode::{Encoder, encode_value};
pub use reader::{ItemReader, PackItem, read_item};
