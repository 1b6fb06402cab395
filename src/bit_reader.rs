//! Bit-level reader over a resident DEFLATE/zlib buffer.
//!
//! DEFLATE packs data elements starting at the least significant bit of each
//! byte (RFC 1951 §3.1.1). The reader keeps an explicit byte/bit cursor so
//! every element can be attributed to an exact bit range of the input.

use serde::Serialize;

use crate::error::{DecodeError, DecodeResult};

/// Snapshot of the reader cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub struct BitPosition {
    pub byte: usize,
    /// Always `< 8`.
    pub bit: u8,
}

impl BitPosition {
    pub fn from_bit_offset(bit_offset: usize) -> Self {
        Self {
            byte: bit_offset / 8,
            bit: (bit_offset % 8) as u8,
        }
    }

    #[inline]
    pub fn bit_offset(&self) -> usize {
        self.byte * 8 + self.bit as usize
    }
}

/// LSB-first bit reader for deflate streams
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_pos: usize,
    bit_pos: u8, // 0-7, bit position within current byte
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// Current cursor
    #[inline]
    pub fn position(&self) -> BitPosition {
        BitPosition {
            byte: self.byte_pos,
            bit: self.bit_pos,
        }
    }

    /// Absolute bit offset since the start of the buffer
    #[inline]
    pub fn bit_offset(&self) -> usize {
        self.byte_pos * 8 + self.bit_pos as usize
    }

    #[inline]
    pub fn bits_remaining(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bit_offset())
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.byte_pos >= self.data.len()
    }

    fn end_of_data(&self) -> DecodeError {
        DecodeError::UnexpectedEndOfData {
            bit_offset: self.bit_offset(),
        }
    }

    /// Read a single bit (LSB first per deflate spec)
    #[inline]
    pub fn read_bit(&mut self) -> DecodeResult<u32> {
        if self.byte_pos >= self.data.len() {
            return Err(self.end_of_data());
        }

        let bit = (self.data[self.byte_pos] >> self.bit_pos) & 1;
        self.bit_pos += 1;

        if self.bit_pos == 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }

        Ok(bit as u32)
    }

    /// Read `count` bits (1..=32), LSB first: the first bit read lands in
    /// bit 0 of the result.
    pub fn read_bits(&mut self, count: u8) -> DecodeResult<u32> {
        debug_assert!((1..=32).contains(&count));

        if self.bits_remaining() < count as usize {
            return Err(self.end_of_data());
        }

        let mut value = 0u32;
        for i in 0..count {
            value |= self.read_bit()? << i;
        }
        Ok(value)
    }

    /// Align to next byte boundary
    #[inline]
    pub fn align_to_byte(&mut self) {
        if self.bit_pos != 0 {
            self.byte_pos += 1;
            self.bit_pos = 0;
        }
    }

    /// Read a byte, discarding any partial byte first
    #[inline]
    pub fn read_byte(&mut self) -> DecodeResult<u8> {
        self.align_to_byte();
        if self.byte_pos >= self.data.len() {
            return Err(self.end_of_data());
        }
        let byte = self.data[self.byte_pos];
        self.byte_pos += 1;
        Ok(byte)
    }

    /// Read `count` raw bytes after aligning. The cursor stays put on failure.
    pub fn read_bytes(&mut self, count: usize) -> DecodeResult<&'a [u8]> {
        self.align_to_byte();
        let end = self
            .byte_pos
            .checked_add(count)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| self.end_of_data())?;
        let bytes = &self.data[self.byte_pos..end];
        self.byte_pos = end;
        Ok(bytes)
    }

    /// Read a 16-bit little-endian value (byte-aligned)
    #[inline]
    pub fn read_u16_le(&mut self) -> DecodeResult<u16> {
        let lo = self.read_byte()? as u16;
        let hi = self.read_byte()? as u16;
        Ok(lo | (hi << 8))
    }
}
