//! Value binder: `PackItem` tree → `Value`.

use super::marker::PackType;
use super::reader::PackItem;
use crate::error::{PackError, Result};
use crate::types::{PackMap, Value};

/// Converts an item and its children into a generic value.
pub fn bind(item: &PackItem<'_>) -> Result<Value> {
    let value = match item.pack_type() {
        PackType::Object => Value::Map(bind_object(item)?),
        PackType::Array => Value::Array(
            item.children
                .iter()
                .map(bind)
                .collect::<Result<Vec<_>>>()?,
        ),
        PackType::String => {
            let text = match item.data.split_last() {
                Some((0, rest)) => rest,
                _ => item.data,
            };
            Value::String(String::from_utf8_lossy(text).into_owned())
        }
        PackType::Raw => Value::Raw(item.data.to_vec()),
        PackType::Null => Value::Null,
        PackType::Bool => Value::Bool(item.data.iter().any(|&b| b != 0)),
        PackType::Int8 => Value::Int8(i8::from_le_bytes(fixed(item)?)),
        PackType::Int16 => Value::Int16(i16::from_le_bytes(fixed(item)?)),
        PackType::Int32 => Value::Int32(i32::from_le_bytes(fixed(item)?)),
        PackType::Int64 => Value::Int64(i64::from_le_bytes(fixed(item)?)),
        PackType::UInt8 => Value::UInt8(u8::from_le_bytes(fixed(item)?)),
        PackType::UInt16 => Value::UInt16(u16::from_le_bytes(fixed(item)?)),
        PackType::UInt32 => Value::UInt32(u32::from_le_bytes(fixed(item)?)),
        PackType::UInt64 => Value::UInt64(u64::from_le_bytes(fixed(item)?)),
        PackType::Float32 => Value::Float32(f32::from_le_bytes(fixed(item)?)),
        PackType::Float64 => Value::Float64(f64::from_le_bytes(fixed(item)?)),
        PackType::Invalid => {
            return Err(PackError::invalid(format!(
                "invalid pack type 0x{:02X}",
                item.tag
            )));
        }
    };
    Ok(value)
}

/// Binds object members by name. Later duplicates replace earlier ones.
pub fn bind_object(item: &PackItem<'_>) -> Result<PackMap> {
    let mut map = PackMap::with_capacity(item.children.len());
    for child in &item.children {
        let key = String::from_utf8_lossy(child.key()).into_owned();
        let value = bind(child)?;
        if let Some(previous) = map.insert(key, value) {
            tracing::debug!(
                key = %String::from_utf8_lossy(child.key()),
                replaced = previous.type_name(),
                "duplicate object key overwrites earlier member"
            );
        }
    }
    Ok(map)
}

fn fixed<const N: usize>(item: &PackItem<'_>) -> Result<[u8; N]> {
    <[u8; N]>::try_from(item.data).map_err(|_| {
        PackError::invalid(format!(
            "{:?} payload must be {N} bytes, got {}",
            item.pack_type(),
            item.data.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::marker::*;

    fn scalar(tag: u8, data: &[u8]) -> PackItem<'_> {
        PackItem {
            tag,
            name: b"",
            data,
            children: Vec::new(),
        }
    }

    #[test]
    fn bind_numbers_little_endian() {
        assert_eq!(bind(&scalar(INT_8, &[0xFF])).unwrap(), Value::Int8(-1));
        assert_eq!(
            bind(&scalar(INT_16, &[0x34, 0x12])).unwrap(),
            Value::Int16(0x1234)
        );
        assert_eq!(
            bind(&scalar(UINT_32, &[1, 0, 0, 0x80])).unwrap(),
            Value::UInt32(0x8000_0001)
        );
        assert_eq!(
            bind(&scalar(INT_64, &(-5i64).to_le_bytes())).unwrap(),
            Value::Int64(-5)
        );
        assert_eq!(
            bind(&scalar(FLOAT_64, &1.5f64.to_le_bytes())).unwrap(),
            Value::Float64(1.5)
        );
        assert_eq!(
            bind(&scalar(FLOAT_32, &(-0.25f32).to_le_bytes())).unwrap(),
            Value::Float32(-0.25)
        );
    }

    #[test]
    fn bind_rejects_wrong_width() {
        let err = bind(&scalar(INT_32, &[1, 2])).unwrap_err();
        assert!(err.is_invalid_pack());
    }

    #[test]
    fn bind_bool_any_nonzero() {
        assert_eq!(bind(&scalar(BOOL, &[0])).unwrap(), Value::Bool(false));
        assert_eq!(bind(&scalar(BOOL, &[2])).unwrap(), Value::Bool(true));
    }

    #[test]
    fn bind_null_ignores_payload() {
        assert_eq!(bind(&scalar(NULL, &[0x7F])).unwrap(), Value::Null);
    }

    #[test]
    fn bind_string_terminator() {
        let with_nul = scalar(STRING | SHORT_ITEM, b"js\0");
        assert_eq!(bind(&with_nul).unwrap(), Value::from("js"));

        let without = scalar(STRING, b"js");
        assert_eq!(bind(&without).unwrap(), Value::from("js"));

        // Only one terminator is stripped.
        let double = scalar(STRING, b"a\0\0");
        assert_eq!(bind(&double).unwrap(), Value::from("a\0"));

        assert_eq!(bind(&scalar(STRING, b"")).unwrap(), Value::from(""));
    }

    #[test]
    fn bind_raw_keeps_terminator() {
        assert_eq!(
            bind(&scalar(RAW, b"ab\0")).unwrap(),
            Value::Raw(b"ab\0".to_vec())
        );
    }

    #[test]
    fn bind_object_duplicates_overwrite() {
        let obj = PackItem {
            tag: OBJECT,
            name: b"",
            data: b"",
            children: vec![
                PackItem {
                    name: b"k\0",
                    ..scalar(INT_8, &[1])
                },
                PackItem {
                    name: b"k",
                    ..scalar(INT_8, &[2])
                },
            ],
        };
        let map = bind_object(&obj).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get_i8("k", 0), 2);
    }

    #[test]
    fn bind_array_discards_names() {
        let arr = PackItem {
            tag: ARRAY,
            name: b"",
            data: b"",
            children: vec![
                PackItem {
                    name: b"ignored",
                    ..scalar(UINT_8, &[1])
                },
                scalar(UINT_8, &[2]),
            ],
        };
        assert_eq!(
            bind(&arr).unwrap(),
            Value::Array(vec![Value::UInt8(1), Value::UInt8(2)])
        );
    }

    #[test]
    fn bind_invalid_tag() {
        assert!(bind(&scalar(0x58, &[0; 8])).is_err());
    }
}
