use serde::Serialize;

use crate::engine::DecodeReport;

/// Sizes of one traced stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompressionStats {
    pub original_size: usize,
    pub compressed_size: usize,
    /// compressed / original, 0.0 for empty output
    pub ratio: f64,
}

impl CompressionStats {
    pub fn new(original_size: usize, compressed_size: usize) -> Self {
        let ratio = if original_size == 0 {
            0.0
        } else {
            compressed_size as f64 / original_size as f64
        };
        Self {
            original_size,
            compressed_size,
            ratio,
        }
    }

    pub fn from_report(report: &DecodeReport) -> Self {
        Self::new(report.output.len(), report.input_len)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} -> {} ({} of original)",
            format_size(self.original_size),
            format_size(self.compressed_size),
            format_percentage(self.compressed_size, self.original_size)
        )
    }
}

pub fn format_size(size: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{:.0} {}", size, UNITS[unit_idx])
    } else {
        format!("{:.1} {}", size, UNITS[unit_idx])
    }
}

pub fn format_percentage(numerator: usize, denominator: usize) -> String {
    if denominator == 0 {
        "N/A".to_string()
    } else {
        let percentage = (numerator as f64 / denominator as f64) * 100.0;
        format!("{:.1}%", percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(50, 100), "50.0%");
        assert_eq!(format_percentage(0, 100), "0.0%");
        assert_eq!(format_percentage(100, 0), "N/A");
    }

    #[test]
    fn test_compression_stats() {
        let stats = CompressionStats::new(2000, 500);
        assert_eq!(stats.ratio, 0.25);
        assert_eq!(stats.summary(), "2.0 KB -> 500 B (25.0% of original)");

        let empty = CompressionStats::new(0, 8);
        assert_eq!(empty.ratio, 0.0);
        assert_eq!(empty.summary(), "0 B -> 8 B (N/A of original)");
    }
}
