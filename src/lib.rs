//! deflate-lens: a zlib/DEFLATE decoder that records where every element of
//! the compressed stream lives.
//!
//! [`engine::decode`] runs a full pass and returns a [`DecodeReport`]: the
//! blocks of the stream, each with its bit range, the items decoded from it
//! and the bytes it produced. A pass that hits malformed data stops and keeps
//! everything decoded up to that point.
//!
//! ```no_run
//! let compressed = std::fs::read("data.zz").unwrap();
//! let report = deflate_lens::decode(&compressed);
//! for block in &report.blocks {
//!     println!("{}", block);
//! }
//! ```

#[cfg(test)]
#[macro_use]
mod test_utils;

pub mod back_reference;
pub mod bit_reader;
pub mod cli;
pub mod deflate_decoder;
pub mod engine;
pub mod error;
pub mod format;
pub mod hex_dump;
pub mod huffman;
pub mod render;
pub mod trace;
pub mod utils;
pub mod zlib;


pub use bit_reader::{BitPosition, BitReader};
pub use engine::{decode, decode_format, decode_raw, DecodeReport};
pub use error::{DecodeError, DecodeResult, LensError, LensResult};
pub use format::StreamFormat;
pub use trace::{BlockKind, CodeLengthOp, DeflateBlock, ItemKind, TraceItem};
