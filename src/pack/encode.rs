//! Pack encoding: `Value` → bytes.

use bytes::{BufMut, Bytes, BytesMut};

use super::marker::{self, SizeClass};
use super::reader::DEFAULT_MAX_DEPTH;
use crate::error::{PackError, Result};
use crate::types::{PackMap, Value};

/// Longest map key the one-byte name length can carry. Shorter keys are
/// written NUL-terminated; a key of exactly this length is written bare and
/// must not itself end in NUL.
pub const MAX_KEY_LEN: usize = u8::MAX as usize;

/// Length of the long-class header reserved for a container before its
/// payload size is known.
const LONG_HEADER_LEN: usize = 6;

/// Name field of an item being written.
#[derive(Debug, Clone, Copy)]
enum Name<'a> {
    /// Array elements and the root.
    Empty,
    /// Object member, NUL-terminated when the terminator still fits.
    Key(&'a str),
}

impl Name<'_> {
    fn terminated(self) -> bool {
        matches!(self, Self::Key(k) if k.len() < MAX_KEY_LEN)
    }

    fn wire_len(self) -> Result<u8> {
        match self {
            Self::Empty => Ok(0),
            Self::Key(k) if k.len() < MAX_KEY_LEN => Ok(k.len() as u8 + 1),
            // A trailing NUL here would be stripped on decode.
            Self::Key(k) if k.len() == MAX_KEY_LEN && !k.ends_with('\0') => Ok(u8::MAX),
            Self::Key(k) if k.len() == MAX_KEY_LEN => Err(PackError::marshal(format!(
                "key of {MAX_KEY_LEN} bytes cannot end in NUL"
            ))),
            Self::Key(k) => Err(PackError::marshal(format!(
                "key of {} bytes exceeds the {MAX_KEY_LEN}-byte limit",
                k.len()
            ))),
        }
    }

    fn put(self, buf: &mut BytesMut) {
        if let Self::Key(k) = self {
            buf.put_slice(k.as_bytes());
            if self.terminated() {
                buf.put_u8(0);
            }
        }
    }
}

/// Serializes values into the pack layout.
///
/// Objects and arrays whose payload fits in one byte are written with the
/// short-class tags `0x90` / `0xA0`. Older decoders that match containers
/// only by the exact long tags `0x10` / `0x20` reject such packs; byte parity
/// with other producers is not guaranteed.
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    max_depth: usize,
}

impl Default for Encoder {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum container nesting depth, the root included.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Encodes a value whose root must be a `Map`.
    pub fn marshal(&self, value: &Value) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.marshal_into(&mut buf, value)?;
        Ok(buf.freeze())
    }

    /// Encodes a map as the root object.
    pub fn marshal_map(&self, map: &PackMap) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.write_root(&mut buf, map)?;
        Ok(buf.freeze())
    }

    /// Appends the encoding of `value` to `buf`. On error `buf` is left as it
    /// was.
    pub fn marshal_into(&self, buf: &mut BytesMut, value: &Value) -> Result<()> {
        match value {
            Value::Map(map) => self.write_root(buf, map),
            other => Err(PackError::marshal(format!(
                "root must be a map, got {}",
                other.type_name()
            ))),
        }
    }

    fn write_root(&self, buf: &mut BytesMut, map: &PackMap) -> Result<()> {
        let start = buf.len();
        let result = self.encode_map(buf, Name::Empty, map, self.max_depth);
        match &result {
            Ok(()) => tracing::trace!(len = buf.len() - start, "marshalled pack"),
            Err(e) => {
                buf.truncate(start);
                tracing::debug!(error = %e, "marshal failed");
            }
        }
        result
    }

    fn encode_item(
        &self,
        buf: &mut BytesMut,
        name: Name<'_>,
        value: &Value,
        depth_left: usize,
    ) -> Result<()> {
        match value {
            Value::Null => put_fixed(buf, marker::NULL, name, &[0]),
            Value::Bool(b) => put_fixed(buf, marker::BOOL, name, &[u8::from(*b)]),
            Value::Int8(v) => put_fixed(buf, marker::INT_8, name, &v.to_le_bytes()),
            Value::Int16(v) => put_fixed(buf, marker::INT_16, name, &v.to_le_bytes()),
            Value::Int32(v) => put_fixed(buf, marker::INT_32, name, &v.to_le_bytes()),
            Value::Int64(v) => put_fixed(buf, marker::INT_64, name, &v.to_le_bytes()),
            Value::UInt8(v) => put_fixed(buf, marker::UINT_8, name, &v.to_le_bytes()),
            Value::UInt16(v) => put_fixed(buf, marker::UINT_16, name, &v.to_le_bytes()),
            Value::UInt32(v) => put_fixed(buf, marker::UINT_32, name, &v.to_le_bytes()),
            Value::UInt64(v) => put_fixed(buf, marker::UINT_64, name, &v.to_le_bytes()),
            Value::Float32(v) => put_fixed(buf, marker::FLOAT_32, name, &v.to_le_bytes()),
            Value::Float64(v) => put_fixed(buf, marker::FLOAT_64, name, &v.to_le_bytes()),
            Value::String(s) => {
                // Strings travel NUL-terminated.
                put_variable_header(buf, marker::STRING, name, s.len() + 1)?;
                buf.put_slice(s.as_bytes());
                buf.put_u8(0);
                Ok(())
            }
            Value::Raw(b) => {
                put_variable_header(buf, marker::RAW, name, b.len())?;
                buf.put_slice(b);
                Ok(())
            }
            Value::Array(items) => self.encode_array(buf, name, items, depth_left),
            Value::Map(map) => self.encode_map(buf, name, map, depth_left),
        }
    }

    fn encode_array(
        &self,
        buf: &mut BytesMut,
        name: Name<'_>,
        items: &[Value],
        depth_left: usize,
    ) -> Result<()> {
        let start = begin_container(buf, marker::ARRAY, name, items.len(), depth_left)?;
        for item in items {
            self.encode_item(buf, Name::Empty, item, depth_left - 1)?;
        }
        finish_container(buf, start)
    }

    fn encode_map(
        &self,
        buf: &mut BytesMut,
        name: Name<'_>,
        map: &PackMap,
        depth_left: usize,
    ) -> Result<()> {
        let start = begin_container(buf, marker::OBJECT, name, map.len(), depth_left)?;
        for (key, item) in map {
            self.encode_item(buf, Name::Key(key), item, depth_left - 1)?;
        }
        finish_container(buf, start)
    }
}

/// Writes a long-class container header with a zero length placeholder, the
/// name and the element count. Returns the offset of the header.
fn begin_container(
    buf: &mut BytesMut,
    tag: u8,
    name: Name<'_>,
    count: usize,
    depth_left: usize,
) -> Result<usize> {
    if depth_left == 0 {
        return Err(PackError::marshal("container nesting exceeds depth limit"));
    }
    let count = u32::try_from(count)
        .map_err(|_| PackError::marshal(format!("{count} elements exceed the u32 count field")))?;
    let name_len = name.wire_len()?;

    let start = buf.len();
    buf.put_u8(tag);
    buf.put_u8(name_len);
    buf.put_u32_le(0);
    name.put(buf);
    buf.put_u32_le(count);
    Ok(start)
}

/// Patches the payload length of the container opened at `start`. Payloads
/// that fit in one byte are downgraded to the short class by sliding the
/// name and payload back over the unused length bytes.
fn finish_container(buf: &mut BytesMut, start: usize) -> Result<()> {
    let body_start = start + LONG_HEADER_LEN + buf[start + 1] as usize;
    let payload_len = buf.len() - body_start;

    if let Ok(len) = u8::try_from(payload_len) {
        let short_len = SizeClass::Short.header_len();
        buf[start] |= marker::SHORT_ITEM;
        buf[start + 2] = len;
        let end = buf.len();
        buf.copy_within(start + LONG_HEADER_LEN..end, start + short_len);
        buf.truncate(end - (LONG_HEADER_LEN - short_len));
    } else {
        let len = u32::try_from(payload_len).map_err(|_| {
            PackError::marshal(format!("payload of {payload_len} bytes exceeds u32 length"))
        })?;
        buf[start + 2..start + LONG_HEADER_LEN].copy_from_slice(&len.to_le_bytes());
    }
    Ok(())
}

fn put_fixed(buf: &mut BytesMut, tag: u8, name: Name<'_>, payload: &[u8]) -> Result<()> {
    debug_assert_eq!(payload.len(), (tag & marker::FIXED_ITEM) as usize);
    let name_len = name.wire_len()?;
    buf.put_u8(tag);
    buf.put_u8(name_len);
    name.put(buf);
    buf.put_slice(payload);
    Ok(())
}

/// Writes the header and name of a variable-length item, picking the short
/// class whenever the payload length fits in one byte.
fn put_variable_header(
    buf: &mut BytesMut,
    tag: u8,
    name: Name<'_>,
    payload_len: usize,
) -> Result<()> {
    let name_len = name.wire_len()?;
    if let Ok(len) = u8::try_from(payload_len) {
        buf.put_u8(tag | marker::SHORT_ITEM);
        buf.put_u8(name_len);
        buf.put_u8(len);
    } else {
        let len = u32::try_from(payload_len).map_err(|_| {
            PackError::marshal(format!("payload of {payload_len} bytes exceeds u32 length"))
        })?;
        buf.put_u8(tag);
        buf.put_u8(name_len);
        buf.put_u32_le(len);
    }
    name.put(buf);
    Ok(())
}

/// Encodes `value` with the default encoder settings.
pub fn encode_value(value: &Value) -> Result<Bytes> {
    Encoder::default().marshal(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::marker::*;

    fn single(key: &str, value: Value) -> Bytes {
        let map: PackMap = [(key, value)].into_iter().collect();
        Encoder::new().marshal_map(&map).unwrap()
    }

    #[test]
    fn encode_empty_root() {
        let bytes = Encoder::new().marshal_map(&PackMap::new()).unwrap();
        assert_eq!(&bytes[..], &[OBJECT | SHORT_ITEM, 0, 4, 0, 0, 0, 0]);
    }

    #[test]
    fn encode_fixed_int32_member() {
        let bytes = single("age", Value::Int32(10));
        assert_eq!(
            &bytes[..],
            &[
                OBJECT | SHORT_ITEM, 0, 14, // root header, payload 14
                1, 0, 0, 0, // count
                INT_32, 4, b'a', b'g', b'e', 0, // member header + name
                10, 0, 0, 0, // payload
            ]
        );
    }

    #[test]
    fn encode_short_string_with_terminator() {
        let bytes = single("u", Value::from("js"));
        assert_eq!(
            &bytes[7..],
            &[STRING | SHORT_ITEM, 2, 3, b'u', 0, b'j', b's', 0]
        );
    }

    #[test]
    fn encode_long_raw() {
        let payload = vec![0xAB; 300];
        let bytes = single("r", Value::Raw(payload));
        // Root payload exceeds 255 bytes as well.
        assert_eq!(bytes[0], OBJECT);
        let member = &bytes[6 + 4..];
        assert_eq!(member[0], RAW);
        assert_eq!(member[1], 2);
        assert_eq!(&member[2..6], &300u32.to_le_bytes());
        assert_eq!(&member[6..8], b"r\0");
        assert_eq!(member.len(), 8 + 300);
    }

    #[test]
    fn encode_bool_and_null() {
        let bytes = single("b", Value::Bool(true));
        assert_eq!(&bytes[7..], &[BOOL, 2, b'b', 0, 1]);
        let bytes = single("n", Value::Null);
        assert_eq!(&bytes[7..], &[NULL, 2, b'n', 0, 0]);
    }

    #[test]
    fn encode_array_elements_unnamed() {
        let bytes = single("a", Value::Array(vec![Value::UInt8(1), Value::UInt8(2)]));
        assert_eq!(
            &bytes[7..],
            &[ARRAY | SHORT_ITEM, 2, 10, b'a', 0, 2, 0, 0, 0, UINT_8, 0, 1, UINT_8, 0, 2]
        );
    }

    #[test]
    fn reject_non_map_root() {
        let err = Encoder::new().marshal(&Value::Int32(1)).unwrap_err();
        assert!(err.is_marshal());
        assert!(err.to_string().contains("int32"));
    }

    #[test]
    fn reject_long_key_without_partial_output() {
        let mut buf = BytesMut::from(&b"keep"[..]);
        let map: PackMap = [("k".repeat(MAX_KEY_LEN + 1), Value::Null)]
            .into_iter()
            .collect();
        let err = Encoder::new()
            .marshal_into(&mut buf, &Value::Map(map))
            .unwrap_err();
        assert!(err.is_marshal());
        assert_eq!(&buf[..], b"keep");

        let ok: PackMap = [("k".repeat(MAX_KEY_LEN), Value::Null)].into_iter().collect();
        assert!(Encoder::new().marshal_map(&ok).is_ok());
    }

    #[test]
    fn full_length_key_is_written_without_terminator() {
        let key = "k".repeat(MAX_KEY_LEN);
        let bytes = single(&key, Value::Int8(5));
        // The root payload exceeds 255 bytes, so its header is long.
        let member = &bytes[6 + 4..];
        assert_eq!(&member[..2], &[INT_8, u8::MAX]);
        assert_eq!(&member[2..2 + MAX_KEY_LEN], key.as_bytes());
        assert_eq!(&member[2 + MAX_KEY_LEN..], &[5]);

        let decoded = crate::decode(&bytes).unwrap();
        assert_eq!(decoded.get_i8(&key, 0), 5);
        assert_eq!(Encoder::new().marshal_map(&decoded).unwrap(), bytes);
    }

    #[test]
    fn reject_full_length_key_ending_in_nul() {
        let key = format!("{}\0", "k".repeat(MAX_KEY_LEN - 1));
        let map: PackMap = [(key, Value::Null)].into_iter().collect();
        assert!(Encoder::new().marshal_map(&map).unwrap_err().is_marshal());
    }

    #[test]
    fn container_header_shrinks_to_short_class() {
        let nested: PackMap = [("x", Value::UInt8(1))].into_iter().collect();
        let bytes = single("m", Value::Map(nested));
        assert_eq!(
            &bytes[..],
            &[
                OBJECT | SHORT_ITEM, 0, 18, 1, 0, 0, 0, // root
                OBJECT | SHORT_ITEM, 2, 9, b'm', 0, 1, 0, 0, 0, // member "m"
                UINT_8, 2, b'x', 0, 1,
            ]
        );
    }

    #[test]
    fn container_at_short_boundary() {
        // Array payload: 4-byte count plus one unnamed short raw item.
        for raw_len in [247, 248, 249] {
            let bytes = single("a", Value::Array(vec![Value::Raw(vec![7; raw_len])]));
            let member = &bytes[6 + 4..];
            let payload = 4 + 3 + raw_len;
            if payload <= 255 {
                assert_eq!(member[0], ARRAY | SHORT_ITEM);
                assert_eq!(member[2] as usize, payload);
            } else {
                assert_eq!(member[0], ARRAY);
                assert_eq!(&member[2..6], &(payload as u32).to_le_bytes());
            }
            let decoded = crate::decode(&bytes).unwrap();
            let items = decoded.get_array("a").unwrap();
            assert_eq!(items[0].as_raw().map(<[u8]>::len), Some(raw_len));
        }
    }

    #[test]
    fn reject_excessive_nesting() {
        let mut value = Value::Array(Vec::new());
        for _ in 0..4 {
            value = Value::Array(vec![value]);
        }
        let root: PackMap = [("deep", value)].into_iter().collect();
        assert!(Encoder::new().max_depth(6).marshal_map(&root).is_ok());
        assert!(Encoder::new().max_depth(5).marshal_map(&root).is_err());
    }
}
