//! Item reader: bytes → borrowed `PackItem` tree.
//!
//! Every read and advance goes through [`take`], which performs a checked
//! addition against the end of the slice being read. Container children are
//! read from the parent's payload slice, so a child can never reach past its
//! parent.

use bytes::Buf;

use super::marker::{self, PackType, SizeClass};
use crate::error::{PackError, Result};

/// Smallest possible on-wire item: a one-byte fixed item or an empty short
/// item, both unnamed.
const MIN_ITEM_LEN: usize = 3;

/// Length of the element count that opens a container payload.
const COUNT_LEN: usize = 4;

/// Default container nesting limit.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// One tagged item, borrowing its name and payload from the input buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct PackItem<'a> {
    pub tag: u8,
    pub name: &'a [u8],
    /// Scalar payload, or the whole container body (count included).
    pub data: &'a [u8],
    /// Parsed children of a container, in wire order. Empty for scalars.
    pub children: Vec<PackItem<'a>>,
}

impl<'a> PackItem<'a> {
    pub fn pack_type(&self) -> PackType {
        marker::semantic_type(self.tag)
    }

    pub fn size_class(&self) -> SizeClass {
        marker::size_class(self.tag)
    }

    /// Bytes this item occupies on the wire: header, name and payload.
    pub fn wire_size(&self) -> usize {
        self.size_class().header_len() + self.name.len() + self.data.len()
    }

    /// The name with a single trailing NUL removed.
    pub fn key(&self) -> &'a [u8] {
        match self.name.split_last() {
            Some((0, rest)) => rest,
            _ => self.name,
        }
    }
}

/// Reads tagged items with a bounded container nesting depth.
#[derive(Debug, Clone, Copy)]
pub struct ItemReader {
    max_depth: usize,
}

impl Default for ItemReader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl ItemReader {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Reads one item starting at `offset` and returns it together with the
    /// offset immediately following it.
    pub fn read<'a>(&self, buf: &'a [u8], offset: usize) -> Result<(PackItem<'a>, usize)> {
        read_at(buf, offset, self.max_depth)
    }
}

/// Reads one item at `offset` with the default depth limit.
pub fn read_item(buf: &[u8], offset: usize) -> Result<(PackItem<'_>, usize)> {
    ItemReader::default().read(buf, offset)
}

fn read_at(buf: &[u8], offset: usize, depth_left: usize) -> Result<(PackItem<'_>, usize)> {
    let mut pos = offset;

    let tag = take(buf, &mut pos, 1)?.get_u8();
    let name_len = take(buf, &mut pos, 1)?.get_u8() as usize;

    if marker::is_deleted(tag) {
        return Err(PackError::invalid(format!(
            "deleted item 0x{tag:02X} at offset {offset}"
        )));
    }

    let payload_len = match marker::size_class(tag) {
        SizeClass::Fixed => (tag & marker::FIXED_ITEM) as usize,
        SizeClass::Short => take(buf, &mut pos, 1)?.get_u8() as usize,
        SizeClass::Long => take(buf, &mut pos, 4)?.get_u32_le() as usize,
    };

    let name = take(buf, &mut pos, name_len)?;
    let data = take(buf, &mut pos, payload_len)?;

    let children = match marker::semantic_type(tag) {
        PackType::Invalid => {
            return Err(PackError::invalid(format!(
                "unknown type tag 0x{tag:02X} at offset {offset}"
            )));
        }
        ty if ty.is_container() => read_children(data, depth_left)?,
        _ => Vec::new(),
    };

    Ok((
        PackItem {
            tag,
            name,
            data,
            children,
        },
        pos,
    ))
}

fn read_children(body: &[u8], depth_left: usize) -> Result<Vec<PackItem<'_>>> {
    if depth_left == 0 {
        return Err(PackError::invalid("container nesting exceeds depth limit"));
    }

    let mut pos = 0;
    let count = take(body, &mut pos, COUNT_LEN)?.get_u32_le() as usize;

    let room = (body.len() - COUNT_LEN) / MIN_ITEM_LEN;
    if count > room {
        return Err(PackError::invalid(format!(
            "declared {count} elements but payload only has room for {room}"
        )));
    }

    let mut children = Vec::with_capacity(count);
    while pos < body.len() {
        if children.len() == count {
            return Err(PackError::invalid(format!(
                "container holds more than its declared {count} elements"
            )));
        }
        let (child, next) = read_at(body, pos, depth_left - 1)?;
        children.push(child);
        pos = next;
    }

    if children.len() != count {
        return Err(PackError::invalid(format!(
            "declared {count} elements but found {}",
            children.len()
        )));
    }
    Ok(children)
}

/// Checked advance: returns `len` bytes at `*pos` and moves past them.
fn take<'a>(buf: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    let start = *pos;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= buf.len())
        .ok_or_else(|| {
            PackError::invalid(format!(
                "need {len} bytes at offset {start} but only {} available",
                buf.len().saturating_sub(start)
            ))
        })?;
    *pos = end;
    Ok(&buf[start..end])
}
