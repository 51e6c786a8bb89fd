//! Time ranges, caller range normalization and fixed-length window planning

use serde::{Deserialize, Serialize};

/// A `[start, end]` span in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// True for the degenerate `[s, s]` spans normalization can produce
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Clamp caller-supplied ranges into `[0, total_duration]`.
///
/// Start is clamped to `[0, total]`, then end to `[start, total]`. Output has
/// the same length and order as the input; nothing is dropped, so a range
/// lying entirely past the end collapses to `[total, total]`.
pub fn normalize_ranges(ranges: &[TimeRange], total_duration: f64) -> Vec<TimeRange> {
    let total = if total_duration.is_finite() { total_duration.max(0.0) } else { 0.0 };

    ranges
        .iter()
        .map(|range| {
            let start = clamp(range.start, 0.0, total);
            let end = clamp(range.end, start, total);
            TimeRange::new(start, end)
        })
        .collect()
}

/// Consecutive windows of `clip_length` seconds covering `[0, total_duration)`.
///
/// The last window is shortened to end at `total_duration`. A zero clip
/// length or zero duration yields no windows.
pub fn fixed_windows(clip_length: u64, total_duration: u64) -> Vec<TimeRange> {
    if clip_length == 0 {
        return Vec::new();
    }

    (0..total_duration)
        .step_by(clip_length as usize)
        .map(|start| {
            let end = (start + clip_length).min(total_duration);
            TimeRange::new(start as f64, end as f64)
        })
        .collect()
}

// NaN inputs fall to the lower bound
fn clamp(value: f64, low: f64, high: f64) -> f64 {
    if value.is_nan() || value < low {
        low
    } else if value > high {
        high
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(start: f64, end: f64) -> TimeRange {
        TimeRange::new(start, end)
    }

    #[test]
    fn test_in_bounds_ranges_unchanged() {
        let input = vec![r(0.0, 10.0), r(12.5, 40.0), r(80.0, 95.0)];
        assert_eq!(normalize_ranges(&input, 95.0), input);
    }

    #[test]
    fn test_end_past_duration_is_clamped() {
        let out = normalize_ranges(&[r(50.0, 500.0), r(94.0, 96.0)], 95.0);
        assert_eq!(out, vec![r(50.0, 95.0), r(94.0, 95.0)]);
        for range in out {
            assert!(range.start <= range.end);
        }
    }

    #[test]
    fn test_range_beyond_duration_collapses() {
        let out = normalize_ranges(&[r(120.0, 150.0)], 95.0);
        assert_eq!(out, vec![r(95.0, 95.0)]);
        assert!(out[0].is_empty());
    }

    #[test]
    fn test_negative_and_inverted_inputs() {
        let out = normalize_ranges(&[r(-5.0, 10.0), r(30.0, 20.0)], 60.0);
        assert_eq!(out, vec![r(0.0, 10.0), r(30.0, 30.0)]);
    }

    #[test]
    fn test_zero_duration_keeps_length() {
        let out = normalize_ranges(&[r(0.0, 10.0), r(5.0, 6.0)], 0.0);
        assert_eq!(out, vec![r(0.0, 0.0), r(0.0, 0.0)]);
    }

    #[test]
    fn test_duplicates_preserved_in_order() {
        let input = vec![r(10.0, 20.0), r(0.0, 5.0), r(10.0, 20.0)];
        assert_eq!(normalize_ranges(&input, 30.0), input);
    }

    #[test]
    fn test_fixed_windows_95_by_30() {
        let windows = fixed_windows(30, 95);
        assert_eq!(
            windows,
            vec![r(0.0, 30.0), r(30.0, 60.0), r(60.0, 90.0), r(90.0, 95.0)]
        );
    }

    #[test]
    fn test_fixed_windows_exact_multiple() {
        let windows = fixed_windows(30, 90);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows.last(), Some(&r(60.0, 90.0)));
    }

    #[test]
    fn test_fixed_windows_degenerate_inputs() {
        assert!(fixed_windows(30, 0).is_empty());
        assert!(fixed_windows(0, 95).is_empty());
        assert_eq!(fixed_windows(300, 12), vec![r(0.0, 12.0)]);
    }
}
