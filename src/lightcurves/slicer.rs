//! Per-object slicing of the flat photometry array.
//!
//! Header files store, for every object, the first and last row of its samples in the
//! photometry file as **1-based inclusive** indices (`PTROBS_MIN`, `PTROBS_MAX`).
//! [`slice_object_range`] converts them to the 0-based half-open range `[start - 1, end)`
//! and borrows that window of the photometry array.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SliceError {
    #[error("range [{start}, {end}] (1-based, inclusive) is outside of 1..={len}")]
    OutOfRange { start: i64, end: i64, len: usize },
}

/// Borrow the samples of one object.
///
/// Arguments
/// -----------------
/// * `samples`: the full photometry array of the file.
/// * `start`: first row of the object, 1-based.
/// * `end`: last row of the object, 1-based and inclusive.
///
/// Return
/// ----------
/// * `&samples[start - 1..end]`, of length `end - start + 1`. `end == start - 1` yields
///   an empty slice.
/// * [`SliceError::OutOfRange`] if `start < 1`, `end < start - 1` or `end > samples.len()`.
pub fn slice_object_range<T>(samples: &[T], start: i64, end: i64) -> Result<&[T], SliceError> {
    let out_of_range = || SliceError::OutOfRange {
        start,
        end,
        len: samples.len(),
    };

    if start < 1 || end < start - 1 {
        return Err(out_of_range());
    }
    let lo = usize::try_from(start - 1).map_err(|_| out_of_range())?;
    let hi = usize::try_from(end).map_err(|_| out_of_range())?;

    samples.get(lo..hi).ok_or_else(out_of_range)
}

#[cfg(test)]
mod slicer_test {
    use super::*;

    #[test]
    fn test_slice_matches_header_convention() {
        let raw: Vec<u32> = (0..10).collect();

        let s = slice_object_range(&raw, 4, 6).unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s[0], raw[3]);
        assert_eq!(s, &[3u32, 4, 5]);

        for (start, end) in [(1, 1), (1, 10), (7, 9), (10, 10)] {
            let s = slice_object_range(&raw, start, end).unwrap();
            assert_eq!(s.len() as i64, end - start + 1);
            assert_eq!(s[0], raw[(start - 1) as usize]);
        }
    }

    #[test]
    fn test_empty_range() {
        let raw = [1.0, 2.0];
        assert!(slice_object_range(&raw, 3, 2).unwrap().is_empty());
    }

    #[test]
    fn test_out_of_range() {
        let raw = [0u8; 6];
        let err = SliceError::OutOfRange {
            start: 5,
            end: 7,
            len: 6,
        };
        assert_eq!(slice_object_range(&raw, 5, 7), Err(err));
        assert!(slice_object_range(&raw, 0, 3).is_err());
        assert!(slice_object_range(&raw, 4, 2).is_err());
        assert!(slice_object_range(&raw, -1, 2).is_err());
    }
}
