//! LZ77 back-reference resolution.

use crate::error::{DecodeError, DecodeResult};

/// Maximum match length
pub const MAX_MATCH_LENGTH: usize = 258;

/// Materialize the `length` bytes that start `distance` bytes before the end
/// of `output`.
///
/// When `length > distance` the run overlaps the bytes it is producing, so
/// the source wraps back to `start` every `distance` bytes.
pub fn resolve(length: usize, distance: usize, output: &[u8]) -> DecodeResult<Vec<u8>> {
    if distance == 0 || distance > output.len() {
        return Err(DecodeError::InvalidBackReference {
            distance,
            available: output.len(),
        });
    }

    let start = output.len() - distance;
    let resolved: Vec<u8> = (0..length)
        .map(|i| {
            let src = start + i % distance;
            debug_assert!(src < output.len());
            output[src]
        })
        .collect();

    Ok(resolved)
}

/// Resolve and append in place.
pub fn copy_match(length: usize, distance: usize, output: &mut Vec<u8>) -> DecodeResult<Vec<u8>> {
    let resolved = resolve(length, distance, output)?;
    output.extend_from_slice(&resolved);
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_overlapping() {
        assert_eq!(resolve(4, 5, b"abcde").unwrap(), b"abcd");
        assert_eq!(resolve(2, 3, b"xyzabc").unwrap(), b"ab");
    }

    #[test]
    fn test_run_length() {
        // distance 1 repeats the last byte
        assert_eq!(resolve(6, 1, b"qa").unwrap(), b"aaaaaa");
    }

    #[test]
    fn test_overlapping_pattern() {
        assert_eq!(resolve(7, 3, b"abc").unwrap(), b"abcabca");
    }

    #[test]
    fn test_zero_length() {
        assert!(resolve(0, 1, b"a").unwrap().is_empty());
    }

    #[test]
    fn test_distance_zero() {
        assert_eq!(
            resolve(3, 0, b"abc"),
            Err(DecodeError::InvalidBackReference {
                distance: 0,
                available: 3
            })
        );
    }

    #[test]
    fn test_distance_past_start() {
        assert_eq!(
            resolve(3, 4, b"abc"),
            Err(DecodeError::InvalidBackReference {
                distance: 4,
                available: 3
            })
        );
        assert!(resolve(1, 1, b"").is_err());
    }

    #[test]
    fn test_copy_match_appends() {
        let mut output = b"hello ".to_vec();
        let resolved = copy_match(MAX_MATCH_LENGTH, 6, &mut output).unwrap();
        assert_eq!(resolved.len(), MAX_MATCH_LENGTH);
        assert_eq!(output.len(), 6 + MAX_MATCH_LENGTH);
        assert!(output.chunks(6).all(|c| b"hello ".starts_with(c)));
    }

    #[test]
    fn test_copy_match_failure_leaves_output() {
        let mut output = b"ab".to_vec();
        assert!(copy_match(3, 32 * 1024, &mut output).is_err());
        assert_eq!(output, b"ab");
    }
}
