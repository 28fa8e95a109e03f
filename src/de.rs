//! Serde bridge: `Value` → Rust types.
//!
//! Integer and float values are handed to visitors at their stored width;
//! serde's primitive visitors then accept any value that fits, so an `Int8`
//! field deserializes into an `i64` while an out-of-range `UInt64` does not
//! fit an `i32`. This is looser than the typed getters on `PackMap`, which
//! never convert.

use std::collections::hash_map;
use std::fmt;

use serde::de::{
    self, DeserializeOwned, DeserializeSeed, IntoDeserializer, MapAccess, SeqAccess, Visitor,
};
use serde::{Deserialize, forward_to_deserialize_any};

use crate::error::{PackError, Result};
use crate::pack::decode::Decoder;
use crate::types::{PackMap, Value};

/// Deserializes a `T` from a decoded value tree.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    T::deserialize(value)
}

/// Decodes pack bytes and deserializes the root object into a `T`.
pub fn from_slice<T: DeserializeOwned>(buf: &[u8]) -> Result<T> {
    let map = Decoder::default().decode(buf)?;
    from_value(Value::Map(map))
}

impl<'de> de::Deserializer<'de> for Value {
    type Error = PackError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Self::Null => visitor.visit_unit(),
            Self::Bool(b) => visitor.visit_bool(b),
            Self::Int8(v) => visitor.visit_i8(v),
            Self::Int16(v) => visitor.visit_i16(v),
            Self::Int32(v) => visitor.visit_i32(v),
            Self::Int64(v) => visitor.visit_i64(v),
            Self::UInt8(v) => visitor.visit_u8(v),
            Self::UInt16(v) => visitor.visit_u16(v),
            Self::UInt32(v) => visitor.visit_u32(v),
            Self::UInt64(v) => visitor.visit_u64(v),
            Self::Float32(v) => visitor.visit_f32(v),
            Self::Float64(v) => visitor.visit_f64(v),
            Self::String(s) => visitor.visit_string(s),
            Self::Raw(b) => visitor.visit_byte_buf(b),
            Self::Array(items) => visit_array(items, visitor),
            Self::Map(map) => visit_object(map, visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Self::Null => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self {
            Self::String(variant) => visitor.visit_enum(variant.into_deserializer()),
            Self::Map(map) if map.len() == 1 => {
                let Some((variant, value)) = map.into_iter().next() else {
                    return Err(PackError::invalid("enum map is empty"));
                };
                visitor.visit_enum(EnumDeserializer { variant, value })
            }
            other => Err(PackError::invalid(format!(
                "expected a string or single-entry map for an enum, got {}",
                other.type_name()
            ))),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }
}

impl IntoDeserializer<'_, PackError> for Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

fn visit_array<'de, V: Visitor<'de>>(items: Vec<Value>, visitor: V) -> Result<V::Value> {
    let len = items.len();
    let mut seq = SeqDeserializer {
        iter: items.into_iter(),
    };
    let out = visitor.visit_seq(&mut seq)?;
    if seq.iter.len() == 0 {
        Ok(out)
    } else {
        Err(de::Error::invalid_length(len, &"fewer elements in array"))
    }
}

fn visit_object<'de, V: Visitor<'de>>(map: PackMap, visitor: V) -> Result<V::Value> {
    let len = map.len();
    let mut access = MapDeserializer {
        iter: map.into_iter(),
        value: None,
    };
    let out = visitor.visit_map(&mut access)?;
    if access.iter.len() == 0 {
        Ok(out)
    } else {
        Err(de::Error::invalid_length(len, &"fewer entries in map"))
    }
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
}

impl<'de> SeqAccess<'de> for SeqDeserializer {
    type Error = PackError;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        match self.iter.next() {
            Some(value) => seed.deserialize(value).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapDeserializer {
    iter: hash_map::IntoIter<String, Value>,
    value: Option<Value>,
}

impl<'de> MapAccess<'de> for MapDeserializer {
    type Error = PackError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(key.into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        match self.value.take() {
            Some(value) => seed.deserialize(value),
            None => Err(PackError::invalid("map value requested before its key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct EnumDeserializer {
    variant: String,
    value: Value,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = PackError;
    type Variant = VariantDeserializer;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant = seed.deserialize(self.variant.into_deserializer())?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: Value,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = PackError;

    fn unit_variant(self) -> Result<()> {
        match self.value {
            Value::Null => Ok(()),
            other => Err(PackError::invalid(format!(
                "expected unit variant, got {}",
                other.type_name()
            ))),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(self.value)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        match self.value {
            Value::Array(items) => visit_array(items, visitor),
            other => Err(PackError::invalid(format!(
                "expected tuple variant, got {}",
                other.type_name()
            ))),
        }
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.value {
            Value::Map(map) => visit_object(map, visitor),
            other => Err(PackError::invalid(format!(
                "expected struct variant, got {}",
                other.type_name()
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any pack value")
    }

    fn visit_unit<E>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: de::Deserializer<'de>>(self, d: D) -> std::result::Result<Value, D::Error> {
        Value::deserialize(d)
    }

    fn visit_bool<E>(self, v: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i8<E>(self, v: i8) -> std::result::Result<Value, E> {
        Ok(Value::Int8(v))
    }

    fn visit_i16<E>(self, v: i16) -> std::result::Result<Value, E> {
        Ok(Value::Int16(v))
    }

    fn visit_i32<E>(self, v: i32) -> std::result::Result<Value, E> {
        Ok(Value::Int32(v))
    }

    fn visit_i64<E>(self, v: i64) -> std::result::Result<Value, E> {
        Ok(Value::Int64(v))
    }

    fn visit_u8<E>(self, v: u8) -> std::result::Result<Value, E> {
        Ok(Value::UInt8(v))
    }

    fn visit_u16<E>(self, v: u16) -> std::result::Result<Value, E> {
        Ok(Value::UInt16(v))
    }

    fn visit_u32<E>(self, v: u32) -> std::result::Result<Value, E> {
        Ok(Value::UInt32(v))
    }

    fn visit_u64<E>(self, v: u64) -> std::result::Result<Value, E> {
        Ok(Value::UInt64(v))
    }

    fn visit_f32<E>(self, v: f32) -> std::result::Result<Value, E> {
        Ok(Value::Float32(v))
    }

    fn visit_f64<E>(self, v: f64) -> std::result::Result<Value, E> {
        Ok(Value::Float64(v))
    }

    fn visit_str<E>(self, v: &str) -> std::result::Result<Value, E> {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_string<E>(self, v: String) -> std::result::Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_bytes<E>(self, v: &[u8]) -> std::result::Result<Value, E> {
        Ok(Value::Raw(v.to_vec()))
    }

    fn visit_byte_buf<E>(self, v: Vec<u8>) -> std::result::Result<Value, E> {
        Ok(Value::Raw(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Value, A::Error> {
        let mut map = PackMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::ser::{to_value, to_vec};

    #[derive(Debug, PartialEq, serde::Serialize, Deserialize)]
    struct Course {
        id: u64,
        title: String,
        price: f32,
        tags: Vec<String>,
        lecturer: Option<String>,
        kind: Kind,
    }

    #[derive(Debug, PartialEq, serde::Serialize, Deserialize)]
    enum Kind {
        Live,
        Recorded { minutes: u16 },
    }

    #[test]
    fn struct_round_trips_through_bytes() {
        let course = Course {
            id: 42,
            title: "math".into(),
            price: 9.5,
            tags: vec!["a".into(), "b".into()],
            lecturer: None,
            kind: Kind::Recorded { minutes: 90 },
        };
        let bytes = to_vec(&course).unwrap();
        let back: Course = from_slice(&bytes).unwrap();
        assert_eq!(back, course);
    }

    #[test]
    fn unit_variant_from_string() {
        let kind: Kind = from_value(Value::from("Live")).unwrap();
        assert_eq!(kind, Kind::Live);
    }

    #[test]
    fn integers_widen_when_lossless() {
        let wide: i64 = from_value(Value::Int8(-3)).unwrap();
        assert_eq!(wide, -3);
        let narrow: Result<i8> = from_value(Value::UInt64(300));
        assert!(narrow.is_err());
    }

    #[test]
    fn value_deserializes_from_itself() {
        let tree: Value = [("k", Value::Array(vec![Value::UInt16(7), Value::Null]))]
            .into_iter()
            .collect::<PackMap>()
            .into();
        let copy: Value = from_value(to_value(&tree).unwrap()).unwrap();
        assert_eq!(copy, tree);
    }

    #[test]
    fn type_mismatch_is_invalid_pack() {
        let err = from_value::<String>(Value::Int32(1)).unwrap_err();
        assert!(err.is_invalid_pack());
    }
}
