//! Pack type tag constants and tag classification.
//!
//! A tag byte carries the semantic type in its low seven bits and the short
//! size class in bit `0x80`. Types whose low nibble is non-zero are fixed
//! width: the nibble itself is the payload length.

// Containers
pub const OBJECT: u8 = 0x10;
pub const ARRAY: u8 = 0x20;

// Variable-length scalars
pub const STRING: u8 = 0x50;
pub const RAW: u8 = 0x60;

// Signed integers (low nibble = width)
pub const INT_8: u8 = 0x11;
pub const INT_16: u8 = 0x12;
pub const INT_32: u8 = 0x14;
pub const INT_64: u8 = 0x18;

// Unsigned integers (low nibble = width)
pub const UINT_8: u8 = 0x21;
pub const UINT_16: u8 = 0x22;
pub const UINT_32: u8 = 0x24;
pub const UINT_64: u8 = 0x28;

pub const BOOL: u8 = 0x31;
pub const NULL: u8 = 0x61;

// IEEE 754, little-endian
pub const FLOAT_32: u8 = 0x44;
pub const FLOAT_64: u8 = 0x48;

// Size-class and state masks.
pub const SHORT_ITEM: u8 = 0x80;
pub const FIXED_ITEM: u8 = 0x0F;
pub const DELETED_ITEM: u8 = 0x70;

/// Semantic type of a tagged item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackType {
    Object,
    Array,
    String,
    Raw,
    Null,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Invalid,
}

impl PackType {
    /// Returns the tag byte for this type with no size-class bits applied.
    ///
    /// `Invalid` has no tag and yields `None`.
    pub const fn base_tag(self) -> Option<u8> {
        let tag = match self {
            Self::Object => OBJECT,
            Self::Array => ARRAY,
            Self::String => STRING,
            Self::Raw => RAW,
            Self::Null => NULL,
            Self::Bool => BOOL,
            Self::Int8 => INT_8,
            Self::Int16 => INT_16,
            Self::Int32 => INT_32,
            Self::Int64 => INT_64,
            Self::UInt8 => UINT_8,
            Self::UInt16 => UINT_16,
            Self::UInt32 => UINT_32,
            Self::UInt64 => UINT_64,
            Self::Float32 => FLOAT_32,
            Self::Float64 => FLOAT_64,
            Self::Invalid => return None,
        };
        Some(tag)
    }

    /// Payload width for fixed-size types, `None` for variable-length ones.
    pub const fn fixed_width(self) -> Option<usize> {
        match self.base_tag() {
            Some(tag) if tag & FIXED_ITEM != 0 => Some((tag & FIXED_ITEM) as usize),
            _ => None,
        }
    }

    pub const fn is_container(self) -> bool {
        matches!(self, Self::Object | Self::Array)
    }
}

/// How an item's payload length is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeClass {
    /// Length is the low nibble of the tag; no length field.
    Fixed,
    /// One length byte.
    Short,
    /// Four length bytes, little-endian.
    Long,
}

impl SizeClass {
    /// Bytes taken by the tag, the name length and the length field.
    pub const fn header_len(self) -> usize {
        match self {
            Self::Fixed => 2,
            Self::Short => 3,
            Self::Long => 6,
        }
    }
}

/// Classifies a tag byte into its semantic type.
pub const fn semantic_type(tag: u8) -> PackType {
    match tag & !SHORT_ITEM {
        OBJECT => PackType::Object,
        ARRAY => PackType::Array,
        STRING => PackType::String,
        RAW => PackType::Raw,
        NULL => PackType::Null,
        BOOL => PackType::Bool,
        INT_8 => PackType::Int8,
        INT_16 => PackType::Int16,
        INT_32 => PackType::Int32,
        INT_64 => PackType::Int64,
        UINT_8 => PackType::UInt8,
        UINT_16 => PackType::UInt16,
        UINT_32 => PackType::UInt32,
        UINT_64 => PackType::UInt64,
        FLOAT_32 => PackType::Float32,
        FLOAT_64 => PackType::Float64,
        _ => PackType::Invalid,
    }
}

/// Classifies a tag byte into its size class. Fixed takes precedence over
/// the short bit.
pub const fn size_class(tag: u8) -> SizeClass {
    if tag & FIXED_ITEM != 0 {
        SizeClass::Fixed
    } else if tag & SHORT_ITEM != 0 {
        SizeClass::Short
    } else {
        SizeClass::Long
    }
}

/// Tombstone check as the legacy wire format defines it: an item counts as
/// deleted when none of the `DELETED_ITEM` bits are set.
pub const fn is_deleted(tag: u8) -> bool {
    tag & DELETED_ITEM == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_fixed_types() {
        assert_eq!(semantic_type(INT_32), PackType::Int32);
        assert_eq!(size_class(INT_32), SizeClass::Fixed);
        assert_eq!(PackType::Int32.fixed_width(), Some(4));
        assert_eq!(PackType::Float64.fixed_width(), Some(8));
        assert_eq!(PackType::Bool.fixed_width(), Some(1));
        assert_eq!(PackType::Null.fixed_width(), Some(1));
    }

    #[test]
    fn classify_variable_types() {
        assert_eq!(semantic_type(STRING), PackType::String);
        assert_eq!(size_class(STRING), SizeClass::Long);
        assert_eq!(semantic_type(STRING | SHORT_ITEM), PackType::String);
        assert_eq!(size_class(STRING | SHORT_ITEM), SizeClass::Short);
        assert_eq!(size_class(OBJECT | SHORT_ITEM), SizeClass::Short);
        assert_eq!(PackType::Raw.fixed_width(), None);
        assert_eq!(PackType::Object.fixed_width(), None);
    }

    #[test]
    fn deleted_polarity_is_inverted() {
        // Items are live while any of the 0x70 bits is present.
        assert!(!is_deleted(OBJECT));
        assert!(!is_deleted(INT_8));
        assert!(!is_deleted(NULL));
        assert!(!is_deleted(DELETED_ITEM));
        // A cleared type field marks a tombstone.
        assert!(is_deleted(0x00));
        assert!(is_deleted(0x0F));
        assert!(is_deleted(SHORT_ITEM));
    }

    #[test]
    fn classification_is_total() {
        for tag in 0..=u8::MAX {
            let ty = semantic_type(tag);
            if let Some(base) = ty.base_tag() {
                assert_eq!(base, tag & !SHORT_ITEM, "tag 0x{tag:02X}");
            }
            let _ = size_class(tag);
            let _ = is_deleted(tag);
        }
        assert_eq!(semantic_type(0x58), PackType::Invalid);
        assert_eq!(semantic_type(0x00), PackType::Invalid);
        assert_eq!(semantic_type(0x71), PackType::Invalid);
    }

    #[test]
    fn header_lengths() {
        assert_eq!(SizeClass::Fixed.header_len(), 2);
        assert_eq!(SizeClass::Short.header_len(), 3);
        assert_eq!(SizeClass::Long.header_len(), 6);
    }
}
