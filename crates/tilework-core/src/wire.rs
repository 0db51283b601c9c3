//! Little-endian wire primitives for the clone and payload protocols.
//!
//! All integers are little-endian. Strings and byte arrays are
//! length-prefixed with a `u32` length. Reads never panic: running off
//! the end of the buffer yields [`WireError::Truncated`].
//!
//! # Examples
//!
//! ```
//! use tilework_core::{PacketReader, PacketWriter, TilePos};
//!
//! let mut w = PacketWriter::new();
//! w.write_bool(true);
//! w.write_u32(7);
//! w.write_tile_pos(TilePos::new(3, -4));
//! let bytes = w.into_bytes();
//! assert_eq!(bytes.len(), 9);
//!
//! let mut r = PacketReader::new(&bytes);
//! assert!(r.read_bool().unwrap());
//! assert_eq!(r.read_u32().unwrap(), 7);
//! assert_eq!(r.read_tile_pos().unwrap(), TilePos::new(3, -4));
//! assert_eq!(r.remaining(), 0);
//! ```

use crate::error::WireError;
use crate::id::TilePos;

/// Growable little-endian byte sink.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrow the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // ── Primitive writers ───────────────────────────────────────

    /// Write a single byte.
    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Write a boolean as one byte (0 or 1).
    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    /// Write a little-endian i16.
    pub fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a little-endian u16.
    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a little-endian u32.
    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a little-endian i32.
    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a little-endian u64.
    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a little-endian f32.
    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a tile position as two little-endian i16 values.
    pub fn write_tile_pos(&mut self, pos: TilePos) {
        self.write_i16(pos.x);
        self.write_i16(pos.y);
    }

    /// Write raw bytes with no length prefix.
    pub fn write_raw(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    /// Write a length-prefixed byte array (u32 length + bytes).
    pub fn write_bytes(&mut self, b: &[u8]) {
        self.write_u32(b.len() as u32);
        self.buf.extend_from_slice(b);
    }

    /// Write a length-prefixed UTF-8 string (u32 length + bytes).
    pub fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }
}

/// Cursor over a borrowed little-endian byte slice.
#[derive(Clone, Debug)]
pub struct PacketReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    /// Start reading at the beginning of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The unread tail of the buffer.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < n {
            return Err(WireError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    // ── Primitive readers ───────────────────────────────────────

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take_array::<1>()?[0])
    }

    /// Read a boolean byte; anything other than 0 or 1 is rejected.
    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            byte => Err(WireError::InvalidBool { byte }),
        }
    }

    /// Read a little-endian i16.
    pub fn read_i16(&mut self) -> Result<i16, WireError> {
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    /// Read a little-endian u16.
    pub fn read_u16(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    /// Read a little-endian u32.
    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    /// Read a little-endian i32.
    pub fn read_i32(&mut self) -> Result<i32, WireError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    /// Read a little-endian u64.
    pub fn read_u64(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    /// Read a little-endian f32.
    pub fn read_f32(&mut self) -> Result<f32, WireError> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    /// Read a tile position written by [`PacketWriter::write_tile_pos`].
    pub fn read_tile_pos(&mut self) -> Result<TilePos, WireError> {
        let x = self.read_i16()?;
        let y = self.read_i16()?;
        Ok(TilePos::new(x, y))
    }

    /// Read exactly `n` raw bytes.
    pub fn read_raw(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        self.take(n)
    }

    /// Read a length-prefixed byte array.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], WireError> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> Result<&'a str, WireError> {
        let bytes = self.read_bytes()?;
        std::str::from_utf8(bytes).map_err(|_| WireError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_little_endian() {
        let mut w = PacketWriter::new();
        w.write_u32(0x0403_0201);
        w.write_i16(-2);
        assert_eq!(w.as_bytes(), &[1, 2, 3, 4, 0xFE, 0xFF]);
    }

    #[test]
    fn truncated_read_reports_shortfall() {
        let mut r = PacketReader::new(&[1, 2, 3]);
        assert_eq!(
            r.read_u32(),
            Err(WireError::Truncated {
                needed: 4,
                remaining: 3
            })
        );
        // A failed read consumes nothing.
        assert_eq!(r.remaining(), 3);
    }

    #[test]
    fn bool_rejects_other_bytes() {
        let mut r = PacketReader::new(&[2]);
        assert_eq!(r.read_bool(), Err(WireError::InvalidBool { byte: 2 }));
    }

    #[test]
    fn length_prefixed_str() {
        let mut w = PacketWriter::new();
        w.write_str("core:Furnace");
        w.write_u8(9);
        let bytes = w.into_bytes();
        let mut r = PacketReader::new(&bytes);
        assert_eq!(r.read_str().unwrap(), "core:Furnace");
        assert_eq!(r.read_u8().unwrap(), 9);
    }

    #[test]
    fn invalid_utf8_rejected() {
        let mut w = PacketWriter::new();
        w.write_bytes(&[0xFF, 0xFE]);
        let bytes = w.into_bytes();
        assert_eq!(
            PacketReader::new(&bytes).read_str(),
            Err(WireError::InvalidUtf8)
        );
    }

    #[test]
    fn length_prefix_past_end_is_truncated() {
        let mut w = PacketWriter::new();
        w.write_u32(100);
        w.write_u8(1);
        let bytes = w.into_bytes();
        assert!(matches!(
            PacketReader::new(&bytes).read_bytes(),
            Err(WireError::Truncated { needed: 100, .. })
        ));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn reader_never_overruns(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let mut r = PacketReader::new(&bytes);
            while r.remaining() > 0 {
                let before = r.remaining();
                if r.read_str().is_err() && r.read_u16().is_err() && r.read_u8().is_err() {
                    break;
                }
                prop_assert!(r.remaining() < before);
            }
            prop_assert!(r.position() <= bytes.len());
        }
    }
}
