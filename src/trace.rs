//! Trace model: blocks and the items decoded from them.
//!
//! Every item carries a half-open bit range `[bit_start, bit_end)` into the
//! compressed buffer. Items of a block are ordered by `bit_start` and never
//! straddle two blocks.

use std::fmt;

use serde::Serialize;

use crate::bit_reader::BitPosition;
use crate::zlib::ZlibHeader;

/// What a block is.
///
/// The two envelope kinds are markers for the zlib header and trailer bytes.
/// `Reserved` only appears on the block that failed with BTYPE = 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    ZlibHeader,
    Stored,
    FixedHuffman,
    DynamicHuffman,
    Reserved,
    ZlibTrailer,
}

impl BlockKind {
    pub fn from_btype(btype: u8) -> Self {
        match btype {
            0 => BlockKind::Stored,
            1 => BlockKind::FixedHuffman,
            2 => BlockKind::DynamicHuffman,
            _ => BlockKind::Reserved,
        }
    }

    /// True for blocks framed by a BFINAL/BTYPE header
    pub fn is_deflate(&self) -> bool {
        !matches!(self, BlockKind::ZlibHeader | BlockKind::ZlibTrailer)
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::ZlibHeader => "zlib header",
            BlockKind::Stored => "stored",
            BlockKind::FixedHuffman => "fixed Huffman",
            BlockKind::DynamicHuffman => "dynamic Huffman",
            BlockKind::Reserved => "reserved",
            BlockKind::ZlibTrailer => "zlib checksum",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One instruction from the code-length alphabet of a dynamic header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CodeLengthOp {
    /// Symbols 0-15
    Length { length: u8 },
    /// Symbol 16
    RepeatPrevious { length: u8, count: u8 },
    /// Symbols 17 and 18
    RepeatZero { count: u8 },
}

impl CodeLengthOp {
    /// Number of code lengths this instruction produces
    pub fn count(&self) -> usize {
        match *self {
            CodeLengthOp::Length { .. } => 1,
            CodeLengthOp::RepeatPrevious { count, .. } | CodeLengthOp::RepeatZero { count } => {
                count as usize
            }
        }
    }

    /// The code length being produced
    pub fn length(&self) -> u8 {
        match *self {
            CodeLengthOp::Length { length } | CodeLengthOp::RepeatPrevious { length, .. } => {
                length
            }
            CodeLengthOp::RepeatZero { .. } => 0,
        }
    }
}

/// Structured payload of a trace item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemKind {
    ZlibHeader(ZlibHeader),
    ZlibChecksum {
        checksum: u32,
    },
    /// BFINAL and BTYPE
    BlockHeader {
        is_final: bool,
        block_type: u8,
    },
    /// LEN and NLEN of a stored block
    StoredLength {
        len: u16,
        nlen: u16,
    },
    Literal {
        symbol: u8,
    },
    /// Length code, its extra bits, the distance code and its extra bits
    BackReference {
        length: u16,
        distance: u16,
        length_symbol: u16,
        distance_symbol: u16,
        resolved: Vec<u8>,
    },
    EndOfBlock,
    DynamicHeader {
        hlit: u16,
        hdist: u8,
        hclen: u8,
    },
    /// One 3-bit length of the code-length alphabet
    CodeLengthCode {
        symbol: u8,
        length: u8,
    },
    DynamicCodeLengthEntry {
        first_index: u16,
        op: CodeLengthOp,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceItem {
    pub bit_start: usize,
    pub bit_end: usize,
    pub block_index: usize,
    pub item_index: usize,
    /// Offset in the decompressed output where this item's bytes begin
    pub output_start: usize,
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl TraceItem {
    pub fn position(&self) -> BitPosition {
        BitPosition::from_bit_offset(self.bit_start)
    }

    pub fn bit_len(&self) -> usize {
        self.bit_end - self.bit_start
    }

    /// Bytes this item adds to the decompressed output
    pub fn output(&self) -> &[u8] {
        match &self.kind {
            ItemKind::Literal { symbol } => std::slice::from_ref(symbol),
            ItemKind::BackReference { resolved, .. } => resolved,
            ItemKind::ZlibHeader(_)
            | ItemKind::ZlibChecksum { .. }
            | ItemKind::BlockHeader { .. }
            | ItemKind::StoredLength { .. }
            | ItemKind::EndOfBlock
            | ItemKind::DynamicHeader { .. }
            | ItemKind::CodeLengthCode { .. }
            | ItemKind::DynamicCodeLengthEntry { .. } => &[],
        }
    }

    /// Range of the decompressed output produced by this item
    pub fn output_range(&self) -> std::ops::Range<usize> {
        self.output_start..self.output_start + self.output().len()
    }
}

impl fmt::Display for TraceItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>6}..{:<6}] ", self.bit_start, self.bit_end)?;
        match &self.kind {
            ItemKind::ZlibHeader(h) => write!(
                f,
                "zlib header: CM={} CINFO={} FCHECK={} FDICT={} FLEVEL={} ({})",
                h.compression_method,
                h.compression_info,
                h.fcheck,
                h.fdict,
                h.flevel,
                h.level_name()
            ),
            ItemKind::ZlibChecksum { checksum } => write!(f, "Adler-32: {:08X}", checksum),
            ItemKind::BlockHeader {
                is_final,
                block_type,
            } => {
                let last = if *is_final { ", final" } else { "" };
                write!(
                    f,
                    "block header: BTYPE={} ({}){}",
                    block_type,
                    BlockKind::from_btype(*block_type),
                    last
                )
            }
            ItemKind::StoredLength { len, nlen } => {
                write!(f, "LEN={} NLEN={:#06x}", len, nlen)
            }
            ItemKind::Literal { symbol } => {
                write!(f, "Literal: {} ({})", symbol, escape_bytes(&[*symbol]))
            }
            ItemKind::BackReference {
                length,
                distance,
                resolved,
                ..
            } => write!(
                f,
                "LZ77: length={}, distance={} -> \"{}\"",
                length,
                distance,
                escape_bytes(resolved)
            ),
            ItemKind::EndOfBlock => f.write_str("End of block"),
            ItemKind::DynamicHeader { hlit, hdist, hclen } => {
                write!(f, "HLIT={} HDIST={} HCLEN={}", hlit, hdist, hclen)
            }
            ItemKind::CodeLengthCode { symbol, length } => {
                write!(f, "code length code {}→{}", symbol, length)
            }
            ItemKind::DynamicCodeLengthEntry { first_index, op } => match op {
                CodeLengthOp::Length { length } => {
                    write!(f, "length[{}] = {}", first_index, length)
                }
                CodeLengthOp::RepeatPrevious { length, count } => {
                    write!(f, "length[{}..] = {} ×{}", first_index, length, count)
                }
                CodeLengthOp::RepeatZero { count } => {
                    write!(f, "length[{}..] = 0 ×{}", first_index, count)
                }
            },
        }
    }
}

/// One block of the trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeflateBlock {
    pub index: usize,
    pub kind: BlockKind,
    pub is_final: bool,
    pub start_bit: usize,
    pub end_bit: usize,
    /// Whole bytes the cursor advanced over this block
    pub size_bytes: usize,
    /// Offset of `decoded` within the full output
    pub output_start: usize,
    pub decoded: Vec<u8>,
    pub items: Vec<TraceItem>,
    /// False when decoding stopped inside this block
    pub complete: bool,
}

impl DeflateBlock {
    pub fn start(&self) -> BitPosition {
        BitPosition::from_bit_offset(self.start_bit)
    }

    pub fn bit_len(&self) -> usize {
        self.end_bit - self.start_bit
    }

    /// Bytes of the compressed input touched by this block
    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.start_bit / 8..self.end_bit.div_ceil(8)
    }

    /// Concatenate the output of every item; equals `decoded`.
    pub fn reconstruct(&self) -> Vec<u8> {
        self.items.iter().flat_map(|item| item.output()).copied().collect()
    }

    pub fn count_items(&self, pred: impl Fn(&ItemKind) -> bool) -> usize {
        self.items.iter().filter(|item| pred(&item.kind)).count()
    }
}

impl fmt::Display for DeflateBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self.start();
        write!(
            f,
            "#{} {} @ byte {} bit {}: {} bits, {} items",
            self.index,
            self.kind,
            start.byte,
            start.bit,
            self.bit_len(),
            self.items.len()
        )?;
        if self.kind.is_deflate() {
            write!(f, ", {} bytes out", self.decoded.len())?;
        }
        if self.is_final {
            f.write_str(", final")?;
        }
        if !self.complete {
            f.write_str(", INCOMPLETE")?;
        }
        Ok(())
    }
}

/// Render bytes for a one-line summary, escaping anything non-printable.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\'' | b'"' | b'\\' => {
                out.push('\\');
                out.push(b as char);
            }
            0x20..=0x7E => out.push(b as char),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            _ => out.push_str(&format!("\\x{:02x}", b)),
        }
    }
    out
}
