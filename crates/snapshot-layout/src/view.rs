// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Bounds-checked little-endian accessors over a byte slice.
//!
//! All field reads and writes in this crate go through [`ByteView`] and
//! [`ByteViewMut`]; nothing indexes the raw buffer directly.

use crate::LayoutError;

/// Read-only view over a packed little-endian buffer.
#[derive(Debug, Clone, Copy)]
pub struct ByteView<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteView<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns `len` bytes starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], LayoutError> {
        offset
            .checked_add(len)
            .and_then(|end| self.bytes.get(offset..end))
            .ok_or(LayoutError::OutOfBounds {
                offset,
                len,
                size: self.bytes.len(),
            })
    }

    /// Narrows the view to a sub-record.
    pub fn sub(&self, offset: usize, len: usize) -> Result<ByteView<'a>, LayoutError> {
        self.slice(offset, len).map(ByteView::new)
    }

    fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N], LayoutError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(offset, N)?);
        Ok(out)
    }

    pub fn u8_at(&self, offset: usize) -> Result<u8, LayoutError> {
        Ok(self.array::<1>(offset)?[0])
    }

    pub fn u16_at(&self, offset: usize) -> Result<u16, LayoutError> {
        self.array(offset).map(u16::from_le_bytes)
    }

    pub fn i16_at(&self, offset: usize) -> Result<i16, LayoutError> {
        self.array(offset).map(i16::from_le_bytes)
    }

    pub fn u32_at(&self, offset: usize) -> Result<u32, LayoutError> {
        self.array(offset).map(u32::from_le_bytes)
    }

    pub fn i32_at(&self, offset: usize) -> Result<i32, LayoutError> {
        self.array(offset).map(i32::from_le_bytes)
    }

    pub fn u64_at(&self, offset: usize) -> Result<u64, LayoutError> {
        self.array(offset).map(u64::from_le_bytes)
    }

    /// Decodes a fixed-length string field (see [`decode_fixed_str`]).
    pub fn fixed_str(&self, offset: usize, max_len: usize) -> Result<String, LayoutError> {
        self.slice(offset, max_len).map(decode_fixed_str)
    }
}

/// Mutable view over a packed little-endian buffer.
#[derive(Debug)]
pub struct ByteViewMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> ByteViewMut<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns a read-only view of the same bytes.
    pub fn as_view(&self) -> ByteView<'_> {
        ByteView::new(self.bytes)
    }

    pub fn slice_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8], LayoutError> {
        let size = self.bytes.len();
        match offset.checked_add(len) {
            Some(end) if end <= size => Ok(&mut self.bytes[offset..end]),
            _ => Err(LayoutError::OutOfBounds { offset, len, size }),
        }
    }

    pub fn put_bytes(&mut self, offset: usize, src: &[u8]) -> Result<(), LayoutError> {
        self.slice_mut(offset, src.len())?.copy_from_slice(src);
        Ok(())
    }

    pub fn put_u8(&mut self, offset: usize, v: u8) -> Result<(), LayoutError> {
        self.put_bytes(offset, &[v])
    }

    pub fn put_u16(&mut self, offset: usize, v: u16) -> Result<(), LayoutError> {
        self.put_bytes(offset, &v.to_le_bytes())
    }

    pub fn put_i16(&mut self, offset: usize, v: i16) -> Result<(), LayoutError> {
        self.put_bytes(offset, &v.to_le_bytes())
    }

    pub fn put_u32(&mut self, offset: usize, v: u32) -> Result<(), LayoutError> {
        self.put_bytes(offset, &v.to_le_bytes())
    }

    pub fn put_i32(&mut self, offset: usize, v: i32) -> Result<(), LayoutError> {
        self.put_bytes(offset, &v.to_le_bytes())
    }

    pub fn put_u64(&mut self, offset: usize, v: u64) -> Result<(), LayoutError> {
        self.put_bytes(offset, &v.to_le_bytes())
    }

    /// Writes `s` into a fixed field of `max_len` bytes, zero-filling the
    /// remainder. Text longer than the field is cut at a character boundary.
    pub fn put_fixed_str(&mut self, offset: usize, max_len: usize, s: &str) -> Result<(), LayoutError> {
        let field = self.slice_mut(offset, max_len)?;
        field.fill(0);
        let mut end = s.len().min(max_len);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        field[..end].copy_from_slice(&s.as_bytes()[..end]);
        Ok(())
    }
}

/// Decodes a fixed-length character field.
///
/// The field is not guaranteed to be NUL-terminated: decoding stops at the
/// first NUL or at the end of the field, whichever comes first. Invalid
/// UTF-8 is replaced rather than rejected.
pub fn decode_fixed_str(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_reads_little_endian() {
        let buf = [0x14, 0x00, 0x01, 0x00, 0xff, 0xff];
        let v = ByteView::new(&buf);
        assert_eq!(v.u32_at(0).unwrap(), 0x0001_0014);
        assert_eq!(v.i16_at(4).unwrap(), -1);
        assert_eq!(v.u16_at(4).unwrap(), 0xffff);
    }

    #[test]
    fn test_out_of_bounds() {
        let buf = [0u8; 8];
        let v = ByteView::new(&buf);
        assert_eq!(
            v.u64_at(1),
            Err(LayoutError::OutOfBounds { offset: 1, len: 8, size: 8 })
        );
        assert!(v.slice(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_decode_stops_at_nul() {
        assert_eq!(decode_fixed_str(b"CPU Package\0garbage"), "CPU Package");
    }

    #[test]
    fn test_decode_without_terminator() {
        // Field filled to capacity: all bytes belong to the string.
        let field = [b'A'; 32];
        assert_eq!(decode_fixed_str(&field), "A".repeat(32));
    }

    #[test]
    fn test_decode_empty_field() {
        assert_eq!(decode_fixed_str(&[0u8; 16]), "");
    }

    #[test]
    fn test_put_fixed_str_truncates_on_char_boundary() {
        let mut buf = [0xAAu8; 4];
        let mut v = ByteViewMut::new(&mut buf);
        // "aéé" is 5 bytes; the cut must not split the second 'é'.
        v.put_fixed_str(0, 4, "aéé").unwrap();
        assert_eq!(&buf, &[b'a', 0xc3, 0xa9, 0]);
        assert_eq!(decode_fixed_str(&buf), "aé");
    }

    #[test]
    fn test_put_fixed_str_zero_fills() {
        let mut buf = [0xAAu8; 6];
        ByteViewMut::new(&mut buf).put_fixed_str(0, 6, "C:").unwrap();
        assert_eq!(&buf, b"C:\0\0\0\0");
    }
}
