//! Canonical Huffman codes (RFC 1951 §3.2.2).
//!
//! Tables are built from a per-symbol code length array and decoded one bit
//! at a time so that each symbol can be attributed to the exact bit span it
//! occupies. Codes are matched MSB-first: the first bit read from the stream
//! becomes the most significant bit of the candidate code.

use std::sync::OnceLock;

use serde::Serialize;

use crate::bit_reader::BitReader;
use crate::error::{DecodeError, DecodeResult};

/// Maximum code length for DEFLATE Huffman codes
pub const MAX_CODE_LENGTH: u8 = 15;

/// One assigned code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CanonicalCode {
    pub symbol: u16,
    pub code: u16,
    pub length: u8,
}

impl CanonicalCode {
    /// Code as a binary string, most significant bit first
    pub fn bits(&self) -> String {
        format!("{:0width$b}", self.code, width = self.length as usize)
    }
}

/// A decoded symbol and the bits it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub symbol: u16,
    pub code: u32,
    pub length: u8,
    pub bit_start: usize,
    pub bit_end: usize,
}

/// Canonical Huffman table
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    /// Assigned codes in increasing symbol order
    codes: Vec<CanonicalCode>,
    /// Number of codes of each length
    counts: [u16; 16],
    /// First canonical code of each length
    first_code: [u32; 16],
    /// Index into `sorted` where the codes of each length start
    offsets: [u16; 16],
    /// Symbols ordered by (length, symbol), i.e. by canonical code
    sorted: Vec<u16>,
    max_len: u8,
}

impl HuffmanTable {
    /// Build a table from code lengths, rejecting length sets that cannot
    /// form a prefix code.
    ///
    /// Incomplete codes are accepted: RFC 1951 allows e.g. a distance
    /// alphabet with a single one-bit code.
    pub fn build(lengths: &[u8]) -> DecodeResult<Self> {
        if lengths.is_empty() {
            return Err(DecodeError::code_lengths("empty code length array"));
        }
        if let Some(&len) = lengths.iter().find(|&&len| len > MAX_CODE_LENGTH) {
            return Err(DecodeError::code_lengths(format!(
                "code length {} exceeds {}",
                len, MAX_CODE_LENGTH
            )));
        }

        let counts = count_lengths(lengths);

        // Each length doubles the code space; running out means two codes
        // would share a prefix.
        let mut left = 1i32;
        for len in 1..=MAX_CODE_LENGTH as usize {
            left <<= 1;
            left -= counts[len] as i32;
            if left < 0 {
                return Err(DecodeError::code_lengths(format!(
                    "over-subscribed at length {}",
                    len
                )));
            }
        }

        Ok(Self::assign(lengths))
    }

    /// Canonical assignment without validation. Callers guarantee the
    /// lengths are at most 15 and not over-subscribed.
    fn assign(lengths: &[u8]) -> Self {
        let counts = count_lengths(lengths);

        let mut next_code = [0u32; 16];
        let mut code = 0u32;
        for bits in 1..=MAX_CODE_LENGTH as usize {
            code = (code + counts[bits - 1] as u32) << 1;
            next_code[bits] = code;
        }
        let first_code = next_code;

        let mut codes = Vec::new();
        for (symbol, &len) in lengths.iter().enumerate() {
            if len > 0 {
                codes.push(CanonicalCode {
                    symbol: symbol as u16,
                    code: next_code[len as usize] as u16,
                    length: len,
                });
                next_code[len as usize] += 1;
            }
        }

        let mut offsets = [0u16; 16];
        for len in 1..16 {
            offsets[len] = offsets[len - 1] + counts[len - 1];
        }

        let mut sorted = vec![0u16; codes.len()];
        let mut fill = offsets;
        for entry in &codes {
            let slot = &mut fill[entry.length as usize];
            sorted[*slot as usize] = entry.symbol;
            *slot += 1;
        }

        let max_len = lengths.iter().copied().max().unwrap_or(0);

        Self {
            codes,
            counts,
            first_code,
            offsets,
            sorted,
            max_len,
        }
    }

    /// Decode one symbol, reading bit by bit until a code matches.
    pub fn decode(&self, reader: &mut BitReader) -> DecodeResult<Decoded> {
        let bit_start = reader.bit_offset();
        let mut code = 0u32;

        for len in 1..=self.max_len as usize {
            code = (code << 1) | reader.read_bit()?;

            let count = self.counts[len] as u32;
            let first = self.first_code[len];
            if count > 0 && code >= first && code - first < count {
                let index = self.offsets[len] as usize + (code - first) as usize;
                return Ok(Decoded {
                    symbol: self.sorted[index],
                    code,
                    length: len as u8,
                    bit_start,
                    bit_end: reader.bit_offset(),
                });
            }
        }

        Err(DecodeError::InvalidHuffmanCode {
            code,
            bit_offset: bit_start,
        })
    }

    /// Assigned codes in increasing symbol order
    pub fn codes(&self) -> &[CanonicalCode] {
        &self.codes
    }

    /// Code assigned to `symbol`, if it is present in this table
    pub fn code_for(&self, symbol: u16) -> Option<CanonicalCode> {
        self.codes
            .binary_search_by_key(&symbol, |c| c.symbol)
            .ok()
            .map(|i| self.codes[i])
    }

    pub fn max_len(&self) -> u8 {
        self.max_len
    }

    /// True when no symbol has a code
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

fn count_lengths(lengths: &[u8]) -> [u16; 16] {
    let mut counts = [0u16; 16];
    for &len in lengths {
        if len > 0 {
            counts[len as usize] += 1;
        }
    }
    counts
}

/// Fixed literal/length table (BTYPE=01)
pub fn fixed_litlen_table() -> &'static HuffmanTable {
    static FIXED_LIT_LEN: OnceLock<HuffmanTable> = OnceLock::new();
    FIXED_LIT_LEN.get_or_init(|| {
        let mut lengths = [0u8; 288];
        lengths[..144].fill(8);
        lengths[144..256].fill(9);
        lengths[256..280].fill(7);
        lengths[280..].fill(8);
        HuffmanTable::assign(&lengths)
    })
}

/// Fixed distance table: 5-bit codes equal to the symbol
pub fn fixed_dist_table() -> &'static HuffmanTable {
    static FIXED_DIST: OnceLock<HuffmanTable> = OnceLock::new();
    FIXED_DIST.get_or_init(|| HuffmanTable::assign(&[5u8; 32]))
}
