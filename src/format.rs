use std::fmt;
use std::path::Path;

/// Framing around the DEFLATE data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamFormat {
    /// RFC 1950: 2-byte header, DEFLATE blocks, Adler-32
    #[default]
    Zlib,
    /// Bare RFC 1951 blocks
    Raw,
}

impl StreamFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "zz" | "zlib" => Some(StreamFormat::Zlib),
            "deflate" | "raw" => Some(StreamFormat::Raw),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Guess from content: a zlib header has CM = 8 and passes FCHECK.
    pub fn detect(data: &[u8]) -> Self {
        match data {
            [cmf, flg, ..] if cmf & 0x0F == 8 => {
                if (u16::from(*cmf) << 8 | u16::from(*flg)) % 31 == 0 {
                    StreamFormat::Zlib
                } else {
                    StreamFormat::Raw
                }
            }
            _ => StreamFormat::Raw,
        }
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamFormat::Zlib => write!(f, "zlib"),
            StreamFormat::Raw => write!(f, "raw deflate"),
        }
    }
}
