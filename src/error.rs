use std::fmt;
use std::io;
use thiserror::Error;

/// Everything that can stop a decode pass.
///
/// None of these are retried: the engine keeps whatever it produced before
/// the failure and hands it back together with the error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of data at bit {bit_offset}")]
    UnexpectedEndOfData { bit_offset: usize },

    #[error("invalid block type: {btype}")]
    InvalidBlockType { btype: u8 },

    #[error("invalid stored block: LEN {len:#06x} is not the complement of NLEN {nlen:#06x}")]
    InvalidStoredBlock { len: u16, nlen: u16 },

    #[error("invalid code lengths: {0}")]
    InvalidCodeLengths(String),

    #[error("incomplete code lengths: got {actual} of {expected}")]
    IncompleteCodeLengths { expected: usize, actual: usize },

    #[error("invalid Huffman code {code:#b} at bit {bit_offset}")]
    InvalidHuffmanCode { code: u32, bit_offset: usize },

    #[error("invalid back-reference: distance {distance} with {available} bytes available")]
    InvalidBackReference { distance: usize, available: usize },

    #[error("invalid {alphabet} symbol: {symbol}")]
    InvalidSymbol { symbol: u16, alphabet: &'static str },
}

impl DecodeError {
    pub fn code_lengths<T: fmt::Display>(msg: T) -> Self {
        DecodeError::InvalidCodeLengths(msg.to_string())
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors surfaced by the command-line front end.
#[derive(Error, Debug)]
pub enum LensError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid compression level: {0}")]
    InvalidLevel(u8),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LensError {
    pub fn invalid_argument<T: fmt::Display>(msg: T) -> Self {
        LensError::InvalidArgument(msg.to_string())
    }
}

pub type LensResult<T> = Result<T, LensError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_human_readable() {
        let err = DecodeError::InvalidStoredBlock {
            len: 5,
            nlen: 0x1234,
        };
        assert_eq!(
            err.to_string(),
            "invalid stored block: LEN 0x0005 is not the complement of NLEN 0x1234"
        );

        let err = DecodeError::IncompleteCodeLengths {
            expected: 290,
            actual: 12,
        };
        assert_eq!(err.to_string(), "incomplete code lengths: got 12 of 290");
    }

    #[test]
    fn test_decode_error_wraps_into_lens_error() {
        let err: LensError = DecodeError::InvalidBlockType { btype: 3 }.into();
        assert_eq!(err.to_string(), "invalid block type: 3");
        assert!(matches!(err, LensError::Decode(_)));
    }

    #[test]
    fn test_invalid_argument_helper() {
        let err = LensError::invalid_argument(format!("Unknown option: {}", "--frob"));
        assert_eq!(err.to_string(), "Invalid argument: Unknown option: --frob");
    }
}
