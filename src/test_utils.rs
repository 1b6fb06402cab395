#![allow(dead_code)]

use std::io::Write;

use flate2::write::{DeflateEncoder, ZlibEncoder};
use flate2::Compression;

/// Writes DEFLATE bit streams by hand, LSB-first like the format itself.
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_pos: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            bit_pos: 0,
        }
    }

    fn push_bit(&mut self, bit: u32) {
        if self.bit_pos == 0 {
            self.bytes.push(0);
        }
        if bit & 1 == 1 {
            *self.bytes.last_mut().unwrap() |= 1 << self.bit_pos;
        }
        self.bit_pos = (self.bit_pos + 1) % 8;
    }

    /// `count` bits of `value`, least significant first (header fields,
    /// extra bits)
    pub fn write_bits(&mut self, value: u32, count: u8) {
        for i in 0..count {
            self.push_bit(value >> i);
        }
    }

    /// A Huffman code, most significant bit first
    pub fn write_code(&mut self, code: u32, len: u8) {
        for i in (0..len).rev() {
            self.push_bit(code >> i);
        }
    }

    pub fn align(&mut self) {
        self.bit_pos = 0;
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.align();
        self.bytes.extend_from_slice(bytes);
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// Fixed literal/length code for `symbol` as `(code, length)`
pub fn fixed_code(symbol: u16) -> (u32, u8) {
    let entry = crate::huffman::fixed_litlen_table()
        .code_for(symbol)
        .unwrap();
    (entry.code as u32, entry.length)
}

/// Fixed-Huffman "abcdeabcd": five literals, then length 4 distance 5
pub fn abcdeabcd_fixed() -> Vec<u8> {
    let mut w = BitWriter::new();
    w.write_bits(1, 1); // BFINAL
    w.write_bits(1, 2); // BTYPE=01
    for &b in b"abcde" {
        let (code, len) = fixed_code(b as u16);
        w.write_code(code, len);
    }
    let (code, len) = fixed_code(258); // length 4
    w.write_code(code, len);
    w.write_code(4, 5); // distance code 4: 5 + 1 extra bit
    w.write_bits(0, 1);
    let (code, len) = fixed_code(256);
    w.write_code(code, len);
    w.finish()
}

/// Frame a raw DEFLATE stream with a zlib header and the Adler-32 of
/// `original`
pub fn zlib_wrap(deflate: &[u8], original: &[u8]) -> Vec<u8> {
    let mut out = vec![0x78, 0x01];
    out.extend_from_slice(deflate);
    out.extend_from_slice(&libdeflater::adler32(original).to_be_bytes());
    out
}

pub fn zlib_compress(data: &[u8], level: u32) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn raw_compress(data: &[u8], level: u32) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[macro_export]
macro_rules! assert_slices_eq {
    ($left:expr, $right:expr) => {
        $crate::assert_slices_eq!($left, $right, "slices differ");
    };
    ($left:expr, $right:expr, $msg:expr) => {
        let left = &$left[..];
        let right = &$right[..];
        if left != right {
            if left.len() != right.len() {
                panic!(
                    "assertion failed: `(left == right)`: {}\n  left len: {},\n right len: {}",
                    $msg,
                    left.len(),
                    right.len()
                );
            }
            for (i, (a, b)) in left.iter().zip(right.iter()).enumerate() {
                if a != b {
                    let start = i.saturating_sub(16);
                    let end = (i + 16).min(left.len());
                    panic!(
                        "assertion failed: `(left == right)`: {}\n at index {}\n  left[{:?}]: {:02X?}\n right[{:?}]: {:02X?}\n context around index {}:\n left:  {:02X?}\n right: {:02X?}",
                        $msg, i, i, a, i, b, i, &left[start..end], &right[start..end]
                    );
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_writer_order() {
        let mut w = BitWriter::new();
        w.write_bits(0b01, 2);
        w.write_code(0b110, 3);
        w.write_bits(0b101, 3);
        assert_eq!(w.finish(), vec![0b1010_1101]);
    }

    #[test]
    fn test_write_bytes_aligns() {
        let mut w = BitWriter::new();
        w.write_bits(1, 1);
        w.write_bytes(&[0xAB]);
        w.write_bits(1, 1);
        assert_eq!(w.finish(), vec![0x01, 0xAB, 0x01]);
    }
}
