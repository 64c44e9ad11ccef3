//! Decimation of traces to pixel columns
//!
//! Uniformly sampled data (raw channels) is reduced to one min/max pair per
//! column. Irregular timestamps (source estimates) keep individual samples
//! while they fit, and fall back to per-column min/max when they do not.

use cortex_core::timeline::RawTimebase;

use super::TraceWindow;

/// One sample or decimated column of a trace, in window columns
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracePoint {
    pub x: f32,
    pub min: f32,
    pub max: f32,
}

/// Min/max per window column for a uniformly sampled channel
///
/// Columns with no recording under them are `None`. When a column is
/// narrower than a sample the covering sample is repeated.
pub fn uniform_peaks(samples: &[f32], timebase: RawTimebase, window: &TraceWindow) -> Vec<Option<(f32, f32)>> {
    let len = samples.len().min(timebase.sample_count) as i64;
    let index_of = |t: f64| ((t - timebase.start) * timebase.sample_rate).floor() as i64;

    (0..window.width)
        .map(|col| {
            let (t0, t1) = window.column_bounds(col);
            let begin = index_of(t0);
            let end = index_of(t1).max(begin + 1);

            let begin = begin.clamp(0, len);
            let end = end.clamp(0, len);
            if begin >= end {
                return None;
            }

            let (min, max) = samples[begin as usize..end as usize]
                .iter()
                .filter(|v| v.is_finite())
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            (min <= max).then_some((min, max))
        })
        .collect()
}

/// Decimate an irregularly sampled trace to the window
///
/// One neighbour on each side of the window is included so lines run to the
/// edges. Up to two points per column are kept as-is; denser data becomes one
/// min/max point per non-empty column.
pub fn timed_peaks(timestamps: &[f64], values: &[f32], window: &TraceWindow) -> Vec<TracePoint> {
    let n = timestamps.len().min(values.len());
    let timestamps = &timestamps[..n];
    let lo = timestamps.partition_point(|&t| t < window.start).saturating_sub(1);
    let hi = (timestamps.partition_point(|&t| t <= window.end()) + 1).min(n);
    if lo >= hi {
        return Vec::new();
    }

    if hi - lo <= 2 * window.width {
        return (lo..hi)
            .map(|i| TracePoint {
                x: window.column_of(timestamps[i]),
                min: values[i],
                max: values[i],
            })
            .collect();
    }

    (0..window.width)
        .filter_map(|col| {
            let (t0, t1) = window.column_bounds(col);
            let begin = timestamps.partition_point(|&t| t < t0);
            let end = timestamps.partition_point(|&t| t < t1);
            let (min, max) = values[begin..end]
                .iter()
                .filter(|v| v.is_finite())
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            (min <= max).then_some(TracePoint {
                x: col as f32 + 0.5,
                min,
                max,
            })
        })
        .collect()
}
