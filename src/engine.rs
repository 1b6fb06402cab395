//! Decode orchestration: zlib header, DEFLATE blocks, Adler-32 trailer.
//!
//! A pass never panics on bad input and never throws away progress. The
//! report carries every block decoded so far, the bytes they produced, and
//! the error that stopped the pass, if any.

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::deflate_decoder::DeflateDecoder;
use crate::error::DecodeError;
use crate::format::StreamFormat;
use crate::trace::{BlockKind, DeflateBlock, ItemKind, TraceItem};
use crate::zlib;

/// Result of one decode pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecodeReport {
    pub blocks: Vec<DeflateBlock>,
    pub output: Vec<u8>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<DecodeError>,
    /// Length of the compressed input
    pub input_len: usize,
}

fn serialize_error<S: Serializer>(
    error: &Option<DecodeError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

impl DecodeReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Blocks framed by a DEFLATE block header, without envelope markers
    pub fn deflate_blocks(&self) -> impl Iterator<Item = &DeflateBlock> {
        self.blocks.iter().filter(|b| b.kind.is_deflate())
    }

    /// Every item of every block, in stream order
    pub fn items(&self) -> impl Iterator<Item = &TraceItem> {
        self.blocks.iter().flat_map(|b| b.items.iter())
    }

    /// Item `item` of block `block`
    pub fn item(&self, block: usize, item: usize) -> Option<&TraceItem> {
        self.blocks.get(block)?.items.get(item)
    }

    /// Adler-32 recorded in the trailer, if it was reached
    pub fn checksum(&self) -> Option<u32> {
        self.items().find_map(|item| match item.kind {
            ItemKind::ZlibChecksum { checksum } => Some(checksum),
            _ => None,
        })
    }
}

/// Decode a zlib stream.
pub fn decode(data: &[u8]) -> DecodeReport {
    decode_format(data, StreamFormat::Zlib)
}

/// Decode a bare DEFLATE stream with no zlib envelope.
pub fn decode_raw(data: &[u8]) -> DecodeReport {
    decode_format(data, StreamFormat::Raw)
}

pub fn decode_format(data: &[u8], format: StreamFormat) -> DecodeReport {
    if data.is_empty() {
        return DecodeReport::default();
    }

    let mut decoder = DeflateDecoder::new(data);
    let result = match format {
        StreamFormat::Zlib => run_zlib(&mut decoder),
        StreamFormat::Raw => decoder.decode(),
    };

    let bit_position = decoder.bit_position();
    let (blocks, output) = decoder.into_parts();

    let error = match result {
        Ok(()) => {
            debug!(
                %format,
                blocks = blocks.len(),
                input_bytes = data.len(),
                output_bytes = output.len(),
                "decode complete"
            );
            None
        }
        Err(e) => {
            warn!(
                %format,
                bit_offset = bit_position,
                blocks = blocks.len(),
                output_bytes = output.len(),
                "decode stopped: {}",
                e
            );
            Some(e)
        }
    };

    DecodeReport {
        blocks,
        output,
        error,
        input_len: data.len(),
    }
}

fn run_zlib(decoder: &mut DeflateDecoder) -> Result<(), DecodeError> {
    decoder.decode_marker(BlockKind::ZlibHeader, |reader| {
        zlib::parse_header(reader).map(ItemKind::ZlibHeader)
    })?;
    decoder.decode()?;
    decoder.decode_marker(BlockKind::ZlibTrailer, |reader| {
        zlib::parse_trailer(reader).map(|checksum| ItemKind::ZlibChecksum { checksum })
    })
}
