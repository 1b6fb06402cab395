//! Hex dump of the compressed input with bit-range highlighting.
//!
//! Each line shows 16 bytes after an offset column. A byte fully covered by a
//! highlighted range is drawn as `[AB]`, a byte only partly covered (the first
//! or last byte of a range that does not start or end on a byte boundary) as
//! `(AB)`. In zlib streams the header and trailer bytes are lowercase so the
//! envelope stands apart from the DEFLATE data.

use std::fmt::Write;

use crate::format::StreamFormat;

const BYTES_PER_LINE: usize = 16;

/// Bytes touched by the bit range `[bit_start, bit_end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightRange {
    pub start_byte: usize,
    /// Inclusive
    pub end_byte: usize,
    /// First highlighted bit within `start_byte`, 0-7
    pub first_bit: u8,
    /// Last highlighted bit within `end_byte`, 0-7
    pub last_bit: u8,
}

impl HighlightRange {
    /// Returns `None` for an empty range.
    pub fn from_bits(bit_start: usize, bit_end: usize) -> Option<Self> {
        if bit_end <= bit_start {
            return None;
        }
        let last = bit_end - 1;
        Some(Self {
            start_byte: bit_start / 8,
            end_byte: last / 8,
            first_bit: (bit_start % 8) as u8,
            last_bit: (last % 8) as u8,
        })
    }

    pub fn contains(&self, byte: usize) -> bool {
        (self.start_byte..=self.end_byte).contains(&byte)
    }

    /// True when only some bits of `byte` belong to the range
    pub fn is_partial(&self, byte: usize) -> bool {
        (byte == self.start_byte && self.first_bit != 0)
            || (byte == self.end_byte && self.last_bit != 7)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    None,
    Full,
    Partial,
}

fn mark_for(byte: usize, ranges: &[HighlightRange]) -> Mark {
    let mut mark = Mark::None;
    for range in ranges.iter().filter(|r| r.contains(byte)) {
        if !range.is_partial(byte) {
            return Mark::Full;
        }
        mark = Mark::Partial;
    }
    mark
}

fn is_envelope(byte: usize, len: usize, format: StreamFormat) -> bool {
    format == StreamFormat::Zlib && (byte < 2 || byte + 4 >= len)
}

pub fn format_hex_dump(data: &[u8], ranges: &[HighlightRange], format: StreamFormat) -> String {
    let mut out = String::with_capacity(data.len() * 5);

    for (line, chunk) in data.chunks(BYTES_PER_LINE).enumerate() {
        let base = line * BYTES_PER_LINE;
        // Writing to a String cannot fail
        let _ = write!(out, "{:08x} ", base);

        for (i, &byte) in chunk.iter().enumerate() {
            let offset = base + i;
            if i == BYTES_PER_LINE / 2 {
                out.push(' ');
            }
            let hex = if is_envelope(offset, data.len(), format) {
                format!("{:02x}", byte)
            } else {
                format!("{:02X}", byte)
            };
            let (open, close) = match mark_for(offset, ranges) {
                Mark::Full => ('[', ']'),
                Mark::Partial => ('(', ')'),
                Mark::None => (' ', ' '),
            };
            out.push(open);
            out.push_str(&hex);
            out.push(close);
        }

        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        out.push('\n');
    }

    out
}
