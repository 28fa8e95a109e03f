//! Pack decoding: bytes → `PackMap`.

use super::bind::bind_object;
use super::marker::PackType;
use super::reader::{DEFAULT_MAX_DEPTH, ItemReader};
use crate::error::{PackError, Result};
use crate::types::PackMap;

/// Leading bytes of a legacy v1 pack, which is not supported.
pub const V1_MAGIC: &[u8] = b"PCK";

/// Anything shorter cannot hold a root object header.
const MIN_PACK_LEN: usize = 4;

/// Configurable pack decoder.
///
/// ```
/// use mcpack::Decoder;
///
/// let decoder = Decoder::new().max_depth(16).max_input_len(Some(1 << 20));
/// assert!(decoder.decode(b"\x00\x00\x00\x00").is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    max_depth: usize,
    max_input_len: Option<usize>,
    allow_trailing_bytes: bool,
}

impl Default for Decoder {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_input_len: None,
            allow_trailing_bytes: true,
        }
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum container nesting depth, the root included.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Rejects buffers longer than `limit` bytes before parsing.
    pub fn max_input_len(mut self, limit: Option<usize>) -> Self {
        self.max_input_len = limit;
        self
    }

    /// Whether bytes after the root item are ignored (the default) or
    /// rejected.
    pub fn allow_trailing_bytes(mut self, allow: bool) -> Self {
        self.allow_trailing_bytes = allow;
        self
    }

    /// Decodes a buffer whose root item must be an object.
    pub fn decode(&self, buf: &[u8]) -> Result<PackMap> {
        let result = self.decode_root(buf);
        match &result {
            Ok(map) => tracing::trace!(len = buf.len(), members = map.len(), "decoded pack"),
            Err(e) => tracing::debug!(error = %e, len = buf.len(), "rejected pack"),
        }
        result
    }

    fn decode_root(&self, buf: &[u8]) -> Result<PackMap> {
        if buf.len() < MIN_PACK_LEN {
            return Err(PackError::invalid(format!(
                "buffer of {} bytes is too short",
                buf.len()
            )));
        }
        if let Some(limit) = self.max_input_len
            && buf.len() > limit
        {
            return Err(PackError::invalid(format!(
                "buffer of {} bytes exceeds the {limit}-byte limit",
                buf.len()
            )));
        }
        if buf.starts_with(V1_MAGIC) {
            return Err(PackError::invalid("v1 packs are not supported"));
        }

        let (root, end) = ItemReader::new(self.max_depth).read(buf, 0)?;
        if end != buf.len() {
            if !self.allow_trailing_bytes {
                return Err(PackError::invalid(format!(
                    "{} trailing bytes after root item",
                    buf.len() - end
                )));
            }
            tracing::trace!(trailing = buf.len() - end, "ignoring bytes after root item");
        }

        match root.pack_type() {
            PackType::Object => bind_object(&root),
            other => Err(PackError::invalid(format!(
                "root must be an object, got {other:?}"
            ))),
        }
    }
}
