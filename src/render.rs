//! Text and JSON views of a decode report for the command-line front end.

use std::fmt::Write as _;
use std::io::Write;
use std::ops::Range;
use std::path::Path;

use flate2::write::{DeflateEncoder, ZlibEncoder};
use flate2::Compression;
use serde::Serialize;
use tracing::debug;

use crate::cli::LensArgs;
use crate::engine::{self, DecodeReport};
use crate::error::{LensError, LensResult};
use crate::format::StreamFormat;
use crate::hex_dump::{format_hex_dump, HighlightRange};
use crate::trace::escape_bytes;
use crate::utils::CompressionStats;

/// One traced input
#[derive(Debug, Serialize)]
pub struct Inspection {
    pub name: String,
    #[serde(serialize_with = "serialize_display")]
    pub format: StreamFormat,
    pub stats: CompressionStats,
    #[serde(skip)]
    pub compressed: Vec<u8>,
    pub report: DecodeReport,
}

fn serialize_display<S: serde::Serializer>(
    format: &StreamFormat,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(format)
}

/// Compress `data` with flate2 in the requested framing.
pub fn compress(data: &[u8], level: u8, format: StreamFormat) -> LensResult<Vec<u8>> {
    let level = Compression::new(level as u32);
    let compressed = match format {
        StreamFormat::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), level);
            encoder.write_all(data)?;
            encoder.finish()?
        }
        StreamFormat::Raw => {
            let mut encoder = DeflateEncoder::new(Vec::new(), level);
            encoder.write_all(data)?;
            encoder.finish()?
        }
    };
    Ok(compressed)
}

/// Turn raw input into the stream to trace and its framing.
pub fn prepare(name: &str, data: Vec<u8>, args: &LensArgs) -> LensResult<(Vec<u8>, StreamFormat)> {
    if args.needs_compression() {
        let format = args.format.unwrap_or_default();
        let compressed = compress(&data, args.compression_level, format)?;
        debug!(
            input = name,
            original = data.len(),
            compressed = compressed.len(),
            level = args.compression_level,
            "compressed input"
        );
        return Ok((compressed, format));
    }

    let format = args
        .format
        .or_else(|| StreamFormat::from_path(Path::new(name)))
        .unwrap_or_else(|| StreamFormat::detect(&data));
    Ok((data, format))
}

pub fn inspect(name: &str, data: Vec<u8>, args: &LensArgs) -> LensResult<Inspection> {
    let (compressed, format) = prepare(name, data, args)?;
    let report = engine::decode_format(&compressed, format);
    Ok(Inspection {
        name: name.to_string(),
        format,
        stats: CompressionStats::from_report(&report),
        compressed,
        report,
    })
}

pub fn render_json(inspection: &Inspection) -> LensResult<String> {
    Ok(serde_json::to_string_pretty(inspection)?)
}

pub fn render_text(inspection: &Inspection, args: &LensArgs) -> LensResult<String> {
    let report = &inspection.report;
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(
        out,
        "{}: {}, {} blocks, {}",
        inspection.name,
        inspection.format,
        report.blocks.len(),
        inspection.stats.summary()
    );

    for block in &report.blocks {
        let _ = writeln!(out, "  {}", block);
        if args.items {
            for item in &block.items {
                let _ = writeln!(out, "      {}", item);
            }
        }
    }

    let mut ranges = Vec::new();
    if let Some((block, item)) = args.select {
        let selected = report.item(block, item).ok_or_else(|| {
            LensError::invalid_argument(format!("no item {}:{} in {}", block, item, inspection.name))
        })?;
        let _ = writeln!(out, "selected {}:{} {}", block, item, selected);
        let produced = selected.output_range();
        let _ = writeln!(
            out,
            "output {}..{}: {}",
            produced.start,
            produced.end,
            mark_output(&report.output, produced.clone())
        );
        ranges.extend(HighlightRange::from_bits(selected.bit_start, selected.bit_end));
    }

    if args.hex {
        out.push_str(&format_hex_dump(
            &inspection.compressed,
            &ranges,
            inspection.format,
        ));
    }

    if let Some(error) = &report.error {
        let _ = writeln!(out, "  stopped: {}", error);
    }

    Ok(out)
}

/// Decompressed text up to the end of `range`, with the bytes of `range`
/// wrapped in `[..]`. Items that produce nothing show the text before them.
pub fn mark_output(output: &[u8], range: Range<usize>) -> String {
    let end = range.end.min(output.len());
    let start = range.start.min(end);
    let before = escape_bytes(&output[..start]);
    if start == end {
        before
    } else {
        format!("{}[{}]", before, escape_bytes(&output[start..end]))
    }
}
