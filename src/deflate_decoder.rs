//! Tracing Deflate Decoder
//!
//! A full implementation of the DEFLATE block grammar (RFC 1951) that records
//! every element it consumes. Each block becomes a [`DeflateBlock`] holding
//! the bytes it produced and an ordered list of [`TraceItem`]s, each with the
//! exact bit range it was read from.
//!
//! # Architecture
//!
//! - `BitReader`: cursor over the compressed buffer
//! - `HuffmanTable`: canonical codes, decoded bit by bit
//! - `DeflateDecoder`: block state machine, owns the output buffer
//! - `BlockBuilder`: collects the items of the block being decoded
//!
//! When a block fails, the items and bytes it produced so far are kept and
//! the block is marked incomplete. Nothing after it is decoded: the position
//! of the next block depends on decoding this one.

use tracing::{debug, trace};

use crate::back_reference;
use crate::bit_reader::BitReader;
use crate::error::{DecodeError, DecodeResult};
use crate::huffman::{fixed_dist_table, fixed_litlen_table, HuffmanTable};
use crate::trace::{BlockKind, CodeLengthOp, DeflateBlock, ItemKind, TraceItem};

/// End of block symbol
const END_OF_BLOCK: u16 = 256;

/// Extra bits for length codes
pub static LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Base lengths for length codes 257-285
pub static LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];

/// Extra bits for distance codes
pub static DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Base distances for distance codes 0-29
pub static DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Code length alphabet order for dynamic Huffman
pub static CODELEN_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Items and bookkeeping for the block currently being decoded
pub(crate) struct BlockBuilder {
    index: usize,
    kind: BlockKind,
    is_final: bool,
    start_bit: usize,
    output_start: usize,
    /// Output bytes attributed to the items pushed so far
    produced: usize,
    items: Vec<TraceItem>,
}

impl BlockBuilder {
    pub(crate) fn new(index: usize, kind: BlockKind, start_bit: usize, output_start: usize) -> Self {
        Self {
            index,
            kind,
            is_final: false,
            start_bit,
            output_start,
            produced: 0,
            items: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, bit_start: usize, bit_end: usize, kind: ItemKind) {
        debug_assert!(bit_start < bit_end);
        debug_assert!(self.items.last().map_or(true, |prev| prev.bit_end <= bit_start));
        let item = TraceItem {
            bit_start,
            bit_end,
            block_index: self.index,
            item_index: self.items.len(),
            output_start: self.output_start + self.produced,
            kind,
        };
        self.produced += item.output().len();
        self.items.push(item);
    }

    pub(crate) fn finish(self, end_bit: usize, output: &[u8], complete: bool) -> DeflateBlock {
        DeflateBlock {
            index: self.index,
            kind: self.kind,
            is_final: self.is_final,
            start_bit: self.start_bit,
            end_bit,
            size_bytes: end_bit / 8 - self.start_bit / 8,
            output_start: self.output_start,
            decoded: output[self.output_start..].to_vec(),
            items: self.items,
            complete,
        }
    }
}

/// Main deflate decoder with per-element tracing
pub struct DeflateDecoder<'a> {
    reader: BitReader<'a>,
    output: Vec<u8>,
    blocks: Vec<DeflateBlock>,
}

impl<'a> DeflateDecoder<'a> {
    /// Create a new decoder
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            reader: BitReader::new(data),
            output: Vec::with_capacity(data.len() * 4),
            blocks: Vec::new(),
        }
    }

    /// Decode blocks until the one with BFINAL set
    pub fn decode(&mut self) -> DecodeResult<()> {
        while !self.decode_block()? {}
        Ok(())
    }

    /// Decode one block and append it to the trace. Returns BFINAL.
    ///
    /// A failed block is still appended, marked incomplete, unless not even
    /// its header could be read.
    pub fn decode_block(&mut self) -> DecodeResult<bool> {
        let mut block = BlockBuilder::new(
            self.blocks.len(),
            BlockKind::Reserved,
            self.reader.bit_offset(),
            self.output.len(),
        );

        let result = self.decode_block_body(&mut block);
        let is_final = block.is_final;

        if result.is_ok() || !block.items.is_empty() {
            let finished = block.finish(self.reader.bit_offset(), &self.output, result.is_ok());
            debug!(
                block = finished.index,
                kind = %finished.kind,
                start_bit = finished.start_bit,
                end_bit = finished.end_bit,
                items = finished.items.len(),
                bytes_out = finished.decoded.len(),
                "decoded block"
            );
            self.blocks.push(finished);
        }

        result.map(|()| is_final)
    }

    fn decode_block_body(&mut self, block: &mut BlockBuilder) -> DecodeResult<()> {
        let header_start = self.reader.bit_offset();
        let bfinal = self.reader.read_bit()?;
        let btype = self.reader.read_bits(2)? as u8;

        block.is_final = bfinal == 1;
        block.kind = BlockKind::from_btype(btype);
        block.push(
            header_start,
            self.reader.bit_offset(),
            ItemKind::BlockHeader {
                is_final: block.is_final,
                block_type: btype,
            },
        );

        match block.kind {
            BlockKind::Stored => self.decode_stored_block(block),
            BlockKind::FixedHuffman => {
                self.decode_huffman_block(block, fixed_litlen_table(), fixed_dist_table())
            }
            BlockKind::DynamicHuffman => self.decode_dynamic_block(block),
            BlockKind::Reserved | BlockKind::ZlibHeader | BlockKind::ZlibTrailer => {
                Err(DecodeError::InvalidBlockType { btype })
            }
        }
    }

    /// Decode a stored block (BTYPE=00)
    fn decode_stored_block(&mut self, block: &mut BlockBuilder) -> DecodeResult<()> {
        self.reader.align_to_byte();

        let len_start = self.reader.bit_offset();
        let len = self.reader.read_u16_le()?;
        let nlen = self.reader.read_u16_le()?;
        block.push(
            len_start,
            self.reader.bit_offset(),
            ItemKind::StoredLength { len, nlen },
        );

        if len ^ nlen != 0xFFFF {
            return Err(DecodeError::InvalidStoredBlock { len, nlen });
        }

        for _ in 0..len {
            let bit_start = self.reader.bit_offset();
            let byte = self.reader.read_byte()?;
            self.output.push(byte);
            block.push(
                bit_start,
                self.reader.bit_offset(),
                ItemKind::Literal { symbol: byte },
            );
        }

        Ok(())
    }

    /// Decode a block with dynamic Huffman codes (BTYPE=10)
    fn decode_dynamic_block(&mut self, block: &mut BlockBuilder) -> DecodeResult<()> {
        // Read header
        let header_start = self.reader.bit_offset();
        let hlit = self.reader.read_bits(5)? as usize + 257;
        let hdist = self.reader.read_bits(5)? as usize + 1;
        let hclen = self.reader.read_bits(4)? as usize + 4;
        block.push(
            header_start,
            self.reader.bit_offset(),
            ItemKind::DynamicHeader {
                hlit: hlit as u16,
                hdist: hdist as u8,
                hclen: hclen as u8,
            },
        );

        // Read code length code lengths
        let mut codelen_lengths = [0u8; 19];
        for &symbol in CODELEN_ORDER.iter().take(hclen) {
            let bit_start = self.reader.bit_offset();
            let length = self.reader.read_bits(3)? as u8;
            codelen_lengths[symbol] = length;
            block.push(
                bit_start,
                self.reader.bit_offset(),
                ItemKind::CodeLengthCode {
                    symbol: symbol as u8,
                    length,
                },
            );
        }

        let codelen_table = HuffmanTable::build(&codelen_lengths)?;
        trace!(codes = codelen_table.codes().len(), "built code length table");

        let all_lengths = self.read_code_lengths(block, &codelen_table, hlit + hdist)?;

        let (litlen_lengths, dist_lengths) = all_lengths.split_at(hlit);
        if litlen_lengths[END_OF_BLOCK as usize] == 0 {
            return Err(DecodeError::code_lengths("missing end-of-block code"));
        }

        let litlen_table = HuffmanTable::build(litlen_lengths)?;
        let dist_table = HuffmanTable::build(dist_lengths)?;
        trace!(
            litlen_codes = litlen_table.codes().len(),
            dist_codes = dist_table.codes().len(),
            "built dynamic tables"
        );

        self.decode_huffman_block(block, &litlen_table, &dist_table)
    }

    /// Decode the HLIT + HDIST code lengths with the code length table.
    fn read_code_lengths(
        &mut self,
        block: &mut BlockBuilder,
        codelen_table: &HuffmanTable,
        total: usize,
    ) -> DecodeResult<Vec<u8>> {
        let mut lengths: Vec<u8> = Vec::with_capacity(total);

        // Running out of input here means the header promised more lengths
        // than the stream carries.
        let incomplete = |e: DecodeError, actual: usize| match e {
            DecodeError::UnexpectedEndOfData { .. } => DecodeError::IncompleteCodeLengths {
                expected: total,
                actual,
            },
            other => other,
        };

        while lengths.len() < total {
            let first_index = lengths.len();
            let decoded = codelen_table
                .decode(&mut self.reader)
                .map_err(|e| incomplete(e, first_index))?;

            let op = match decoded.symbol {
                0..=15 => CodeLengthOp::Length {
                    length: decoded.symbol as u8,
                },
                16 => {
                    let length = *lengths.last().ok_or_else(|| {
                        DecodeError::code_lengths("repeat code 16 with no previous length")
                    })?;
                    let count = self
                        .reader
                        .read_bits(2)
                        .map_err(|e| incomplete(e, first_index))?
                        as u8
                        + 3;
                    CodeLengthOp::RepeatPrevious { length, count }
                }
                17 => {
                    let count = self
                        .reader
                        .read_bits(3)
                        .map_err(|e| incomplete(e, first_index))?
                        as u8
                        + 3;
                    CodeLengthOp::RepeatZero { count }
                }
                18 => {
                    let count = self
                        .reader
                        .read_bits(7)
                        .map_err(|e| incomplete(e, first_index))?
                        as u8
                        + 11;
                    CodeLengthOp::RepeatZero { count }
                }
                symbol => {
                    return Err(DecodeError::InvalidSymbol {
                        symbol,
                        alphabet: "code length",
                    })
                }
            };

            if first_index + op.count() > total {
                return Err(DecodeError::code_lengths(format!(
                    "repeat of {} at index {} overruns {} code lengths",
                    op.count(),
                    first_index,
                    total
                )));
            }

            lengths.extend(std::iter::repeat(op.length()).take(op.count()));
            block.push(
                decoded.bit_start,
                self.reader.bit_offset(),
                ItemKind::DynamicCodeLengthEntry {
                    first_index: first_index as u16,
                    op,
                },
            );
        }

        Ok(lengths)
    }

    /// Decode the symbols of a Huffman-coded block, fixed or dynamic
    fn decode_huffman_block(
        &mut self,
        block: &mut BlockBuilder,
        litlen_table: &HuffmanTable,
        dist_table: &HuffmanTable,
    ) -> DecodeResult<()> {
        loop {
            let litlen = litlen_table.decode(&mut self.reader)?;

            match litlen.symbol {
                0..=255 => {
                    let byte = litlen.symbol as u8;
                    self.output.push(byte);
                    block.push(
                        litlen.bit_start,
                        litlen.bit_end,
                        ItemKind::Literal { symbol: byte },
                    );
                }
                END_OF_BLOCK => {
                    block.push(litlen.bit_start, litlen.bit_end, ItemKind::EndOfBlock);
                    return Ok(());
                }
                257..=285 => {
                    let length = self.read_length(litlen.symbol)?;

                    let dist = dist_table.decode(&mut self.reader)?;
                    let distance = self.read_distance(dist.symbol)?;

                    let resolved = back_reference::copy_match(
                        length as usize,
                        distance as usize,
                        &mut self.output,
                    )?;

                    block.push(
                        litlen.bit_start,
                        self.reader.bit_offset(),
                        ItemKind::BackReference {
                            length,
                            distance,
                            length_symbol: litlen.symbol,
                            distance_symbol: dist.symbol,
                            resolved,
                        },
                    );
                }
                symbol => {
                    return Err(DecodeError::InvalidSymbol {
                        symbol,
                        alphabet: "literal/length",
                    })
                }
            }
        }
    }

    /// Length for symbol 257-285, reading its extra bits
    fn read_length(&mut self, symbol: u16) -> DecodeResult<u16> {
        let code = (symbol - 257) as usize;
        let extra_bits = LENGTH_EXTRA_BITS[code];
        let extra = if extra_bits > 0 {
            self.reader.read_bits(extra_bits)? as u16
        } else {
            0
        };
        Ok(LENGTH_BASE[code] + extra)
    }

    /// Distance for symbol 0-29, reading its extra bits
    fn read_distance(&mut self, symbol: u16) -> DecodeResult<u16> {
        let code = symbol as usize;
        if code >= DISTANCE_BASE.len() {
            return Err(DecodeError::InvalidSymbol {
                symbol,
                alphabet: "distance",
            });
        }
        let extra_bits = DISTANCE_EXTRA_BITS[code];
        let extra = if extra_bits > 0 {
            self.reader.read_bits(extra_bits)? as u16
        } else {
            0
        };
        Ok(DISTANCE_BASE[code] + extra)
    }

    /// Parse a byte-aligned envelope field into its own marker block.
    ///
    /// The marker holds a single item spanning every bit `parse` consumed.
    pub(crate) fn decode_marker(
        &mut self,
        kind: BlockKind,
        parse: impl FnOnce(&mut BitReader<'a>) -> DecodeResult<ItemKind>,
    ) -> DecodeResult<()> {
        self.reader.align_to_byte();
        let start = self.reader.bit_offset();
        let mut block = BlockBuilder::new(self.blocks.len(), kind, start, self.output.len());

        let result = parse(&mut self.reader);
        let end = self.reader.bit_offset();
        let result = match result {
            Ok(item) => {
                block.push(start, end, item);
                Ok(())
            }
            Err(e) => Err(e),
        };

        self.blocks.push(block.finish(end, &self.output, result.is_ok()));
        result
    }

    /// Recorded blocks
    pub fn blocks(&self) -> &[DeflateBlock] {
        &self.blocks
    }

    /// Decompressed bytes so far
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Current bit position
    pub fn bit_position(&self) -> usize {
        self.reader.bit_offset()
    }

    pub fn into_parts(self) -> (Vec<DeflateBlock>, Vec<u8>) {
        (self.blocks, self.output)
    }
}
