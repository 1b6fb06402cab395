//! zlib envelope (RFC 1950): 2-byte header and big-endian Adler-32 trailer.
//!
//! Fields are recorded as read. Nothing here rejects a stream: FCHECK and
//! the checksum are exposed for display, not verified.

use serde::Serialize;

use crate::bit_reader::BitReader;
use crate::error::DecodeResult;

/// Parsed CMF/FLG pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZlibHeader {
    pub cmf: u8,
    pub flg: u8,
    pub compression_method: u8,
    pub compression_info: u8,
    pub fcheck: u8,
    pub fdict: u8,
    pub flevel: u8,
}

impl ZlibHeader {
    pub fn from_bytes(cmf: u8, flg: u8) -> Self {
        Self {
            cmf,
            flg,
            compression_method: cmf & 0x0F,
            compression_info: cmf >> 4,
            fcheck: flg & 0x1F,
            fdict: (flg >> 5) & 0x01,
            flevel: flg >> 6,
        }
    }

    /// LZ77 window size announced by CINFO
    pub fn window_size(&self) -> usize {
        1usize << (self.compression_info as u32 + 8).min(31)
    }

    /// Whether CMF*256 + FLG is a multiple of 31
    pub fn header_check_ok(&self) -> bool {
        ((self.cmf as u16) << 8 | self.flg as u16) % 31 == 0
    }

    pub fn level_name(&self) -> &'static str {
        match self.flevel {
            0 => "fastest",
            1 => "fast",
            2 => "default",
            _ => "maximum",
        }
    }
}

/// Read the two header bytes.
pub fn parse_header(reader: &mut BitReader) -> DecodeResult<ZlibHeader> {
    let cmf = reader.read_byte()?;
    let flg = reader.read_byte()?;
    Ok(ZlibHeader::from_bytes(cmf, flg))
}

/// Read the Adler-32 trailer, most significant byte first.
pub fn parse_trailer(reader: &mut BitReader) -> DecodeResult<u32> {
    let bytes = reader.read_bytes(4)?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;

    #[test]
    fn test_parse_default_header() {
        let data = [0x78, 0x9C];
        let mut reader = BitReader::new(&data);
        let header = parse_header(&mut reader).unwrap();

        assert_eq!(header.compression_method, 8);
        assert_eq!(header.compression_info, 7);
        assert_eq!(header.fcheck, 0x1C);
        assert_eq!(header.fdict, 0);
        assert_eq!(header.flevel, 2);
        assert_eq!(header.window_size(), 32 * 1024);
        assert!(header.header_check_ok());
        assert_eq!(header.level_name(), "default");
        assert_eq!(reader.bit_offset(), 16);
    }

    #[test]
    fn test_header_fields_not_validated() {
        let header = ZlibHeader::from_bytes(0x00, 0xFF);
        assert_eq!(header.compression_method, 0);
        assert_eq!(header.fcheck, 0x1F);
        assert_eq!(header.fdict, 1);
        assert_eq!(header.flevel, 3);
        assert!(!header.header_check_ok());
    }

    #[test]
    fn test_trailer_is_big_endian() {
        let data = [0x06, 0x2C, 0x02, 0x15];
        let mut reader = BitReader::new(&data);
        assert_eq!(parse_trailer(&mut reader).unwrap(), 0x062C0215);
    }

    #[test]
    fn test_trailer_aligns_first() {
        let data = [0xFF, 0x00, 0x00, 0x00, 0x01];
        let mut reader = BitReader::new(&data);
        reader.read_bits(5).unwrap();
        assert_eq!(parse_trailer(&mut reader).unwrap(), 1);
    }

    #[test]
    fn test_truncated_trailer() {
        let data = [0x00, 0x01];
        let mut reader = BitReader::new(&data);
        assert!(matches!(
            parse_trailer(&mut reader),
            Err(DecodeError::UnexpectedEndOfData { .. })
        ));
    }
}
