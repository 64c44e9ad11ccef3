//! Time axis resolution
//!
//! Maps a virtual time in seconds to per-entity sample positions:
//!
//! - Each hemisphere's source estimate yields the two bracketing time indices
//!   and a blend fraction for linear interpolation.
//! - The raw recording yields a single sample index.
//!
//! ## Canonical domain
//!
//! The canonical domain is the union of every loaded entity's time range. An
//! empty session has the degenerate domain `[0, 0]`. Times outside an entity's
//! own range resolve to [`SourcePosition::NoData`] / [`RawPosition::NoData`];
//! the resolver itself never fails.

use crate::types::Hemisphere;

/// Closed virtual time interval `[t_min, t_max]` in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeDomain {
    pub t_min: f64,
    pub t_max: f64,
}

impl Default for TimeDomain {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl TimeDomain {
    /// Domain of a session with nothing loaded
    pub const EMPTY: TimeDomain = TimeDomain { t_min: 0.0, t_max: 0.0 };

    /// Create a domain, reordering the bounds if needed
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { t_min: a, t_max: b }
        } else {
            Self { t_min: b, t_max: a }
        }
    }

    /// Length of the domain in seconds
    #[inline]
    pub fn duration(&self) -> f64 {
        self.t_max - self.t_min
    }

    #[inline]
    pub fn contains(&self, t: f64) -> bool {
        t >= self.t_min && t <= self.t_max
    }

    /// Clamp a time into the domain
    ///
    /// Non-finite input clamps to the domain start.
    #[inline]
    pub fn clamp(&self, t: f64) -> f64 {
        if t.is_nan() {
            return self.t_min;
        }
        t.clamp(self.t_min, self.t_max)
    }

    /// Smallest domain covering both
    pub fn union(&self, other: &TimeDomain) -> TimeDomain {
        TimeDomain {
            t_min: self.t_min.min(other.t_min),
            t_max: self.t_max.max(other.t_max),
        }
    }
}

/// Sampling description of the raw recording
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawTimebase {
    /// Time of the first sample in seconds
    pub start: f64,
    /// Samples per second (always positive)
    pub sample_rate: f64,
    pub sample_count: usize,
}

impl RawTimebase {
    /// Time range `[start, start + count / rate]`
    pub fn domain(&self) -> TimeDomain {
        TimeDomain::new(self.start, self.start + self.sample_count as f64 / self.sample_rate)
    }

    /// Sample index for a time, clamped to the valid index range
    ///
    /// Returns `None` outside the recording or when it holds no samples.
    pub fn sample_at(&self, t: f64) -> Option<usize> {
        if self.sample_count == 0 || !self.domain().contains(t) {
            return None;
        }
        let idx = ((t - self.start) * self.sample_rate).floor();
        Some((idx.max(0.0) as usize).min(self.sample_count - 1))
    }

    /// Time of a sample index
    pub fn time_of(&self, sample: usize) -> f64 {
        self.start + sample as f64 / self.sample_rate
    }
}

/// Position of a time within a source estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourcePosition {
    /// No estimate loaded or time outside its range
    NoData,
    /// Bracketing time indices and the blend weight of `upper`
    Between {
        lower: usize,
        upper: usize,
        fraction: f64,
    },
}

impl SourcePosition {
    pub fn has_data(&self) -> bool {
        matches!(self, SourcePosition::Between { .. })
    }
}

/// Position of a time within the raw recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawPosition {
    NoData,
    Sample(usize),
}

/// Per-entity positions for one virtual time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub left: SourcePosition,
    pub right: SourcePosition,
    pub raw: RawPosition,
}

impl Resolution {
    pub fn hemisphere(&self, hemisphere: Hemisphere) -> SourcePosition {
        match hemisphere {
            Hemisphere::Left => self.left,
            Hemisphere::Right => self.right,
        }
    }
}

/// Resolver built from the currently loaded entities
///
/// Rebuilt whenever an estimate or recording is replaced; resolution is pure
/// and deterministic for a given axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeAxis {
    timestamps: [Option<Vec<f64>>; 2],
    raw: Option<RawTimebase>,
    domain: TimeDomain,
}

impl TimeAxis {
    /// Build an axis from each hemisphere's timestamps and the raw time base
    ///
    /// Timestamps must be strictly increasing (guaranteed by
    /// [`SourceEstimate`](crate::data::SourceEstimate) construction).
    pub fn new(
        left: Option<&[f64]>,
        right: Option<&[f64]>,
        raw: Option<RawTimebase>,
    ) -> Self {
        let timestamps = [
            left.filter(|ts| !ts.is_empty()).map(<[f64]>::to_vec),
            right.filter(|ts| !ts.is_empty()).map(<[f64]>::to_vec),
        ];

        let domain = timestamps
            .iter()
            .flatten()
            .map(|ts| TimeDomain::new(ts[0], ts[ts.len() - 1]))
            .chain(raw.map(|r| r.domain()))
            .reduce(|a, b| a.union(&b))
            .unwrap_or(TimeDomain::EMPTY);

        Self { timestamps, raw, domain }
    }

    /// Canonical domain (union of all loaded ranges)
    pub fn domain(&self) -> TimeDomain {
        self.domain
    }

    /// Time range of one hemisphere's estimate
    pub fn hemisphere_domain(&self, hemisphere: Hemisphere) -> Option<TimeDomain> {
        self.timestamps[hemisphere.index()]
            .as_ref()
            .map(|ts| TimeDomain::new(ts[0], ts[ts.len() - 1]))
    }

    pub fn raw_timebase(&self) -> Option<RawTimebase> {
        self.raw
    }

    /// Resolve a virtual time for every entity
    pub fn resolve(&self, t: f64) -> Resolution {
        Resolution {
            left: self.resolve_source(Hemisphere::Left, t),
            right: self.resolve_source(Hemisphere::Right, t),
            raw: self
                .raw
                .and_then(|r| r.sample_at(t))
                .map_or(RawPosition::NoData, RawPosition::Sample),
        }
    }

    /// Resolve a virtual time against one hemisphere's timestamps
    pub fn resolve_source(&self, hemisphere: Hemisphere, t: f64) -> SourcePosition {
        match &self.timestamps[hemisphere.index()] {
            Some(ts) => bracket(ts, t),
            None => SourcePosition::NoData,
        }
    }
}

/// Find the bracketing indices of `t` in strictly increasing `timestamps`
pub fn bracket(timestamps: &[f64], t: f64) -> SourcePosition {
    let (Some(&first), Some(&last)) = (timestamps.first(), timestamps.last()) else {
        return SourcePosition::NoData;
    };
    if !(t >= first && t <= last) {
        return SourcePosition::NoData;
    }

    // First index whose timestamp is strictly greater than t
    let upper = timestamps.partition_point(|&x| x <= t);
    if upper == timestamps.len() {
        let last_idx = timestamps.len() - 1;
        return SourcePosition::Between {
            lower: last_idx,
            upper: last_idx,
            fraction: 0.0,
        };
    }

    let lower = upper - 1;
    let span = timestamps[upper] - timestamps[lower];
    let fraction = ((t - timestamps[lower]) / span).clamp(0.0, 1.0);
    SourcePosition::Between { lower, upper, fraction }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_midpoint() {
        let pos = bracket(&[0.0, 1.0], 0.5);
        assert_eq!(pos, SourcePosition::Between { lower: 0, upper: 1, fraction: 0.5 });
    }

    #[test]
    fn test_bracket_exact_hit_has_zero_fraction() {
        let pos = bracket(&[0.0, 0.1, 0.2, 0.3], 0.2);
        assert_eq!(pos, SourcePosition::Between { lower: 2, upper: 3, fraction: 0.0 });
    }

    #[test]
    fn test_bracket_last_sample() {
        let pos = bracket(&[0.0, 0.1, 0.2], 0.2);
        assert_eq!(pos, SourcePosition::Between { lower: 2, upper: 2, fraction: 0.0 });
    }

    #[test]
    fn test_bracket_outside_range() {
        assert_eq!(bracket(&[1.0, 2.0], 0.5), SourcePosition::NoData);
        assert_eq!(bracket(&[1.0, 2.0], 2.5), SourcePosition::NoData);
        assert_eq!(bracket(&[1.0, 2.0], f64::NAN), SourcePosition::NoData);
    }

    #[test]
    fn test_single_sample_estimate() {
        assert_eq!(
            bracket(&[0.3], 0.3),
            SourcePosition::Between { lower: 0, upper: 0, fraction: 0.0 }
        );
        assert_eq!(bracket(&[0.3], 0.31), SourcePosition::NoData);
    }

    #[test]
    fn test_domain_is_union_of_entities() {
        let raw = RawTimebase { start: -0.5, sample_rate: 100.0, sample_count: 100 };
        let axis = TimeAxis::new(Some(&[0.0, 1.0, 2.0][..]), Some(&[1.0, 3.0][..]), Some(raw));
        assert_eq!(axis.domain(), TimeDomain { t_min: -0.5, t_max: 3.0 });

        let res = axis.resolve(2.5);
        assert_eq!(res.left, SourcePosition::NoData);
        assert!(res.right.has_data());
        assert_eq!(res.raw, RawPosition::NoData);
    }

    #[test]
    fn test_empty_axis_domain() {
        let axis = TimeAxis::new(None, None, None);
        assert_eq!(axis.domain(), TimeDomain::EMPTY);
        let res = axis.resolve(0.0);
        assert_eq!(res.left, SourcePosition::NoData);
        assert_eq!(res.raw, RawPosition::NoData);
    }

    #[test]
    fn test_raw_index_is_clamped() {
        let raw = RawTimebase { start: 0.0, sample_rate: 10.0, sample_count: 10 };
        assert_eq!(raw.sample_at(0.0), Some(0));
        assert_eq!(raw.sample_at(0.55), Some(5));
        // t == start + n / rate maps to the last sample, not one past it
        assert_eq!(raw.sample_at(1.0), Some(9));
        assert_eq!(raw.sample_at(1.01), None);
        assert_eq!(raw.sample_at(-0.01), None);
    }

    #[test]
    fn test_empty_recording_has_no_samples() {
        let raw = RawTimebase { start: 0.0, sample_rate: 10.0, sample_count: 0 };
        assert_eq!(raw.sample_at(0.0), None);
    }

    #[test]
    fn test_domain_clamp() {
        let d = TimeDomain::new(2.0, 1.0);
        assert_eq!(d, TimeDomain { t_min: 1.0, t_max: 2.0 });
        assert_eq!(d.clamp(5.0), 2.0);
        assert_eq!(d.clamp(-5.0), 1.0);
        assert_eq!(d.clamp(f64::NAN), 1.0);
        assert_eq!(d.clamp(d.clamp(7.0)), d.clamp(7.0));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let axis = TimeAxis::new(Some(&[0.0, 0.25, 0.5, 1.0][..]), None, None);
        assert_eq!(axis.resolve(0.37), axis.resolve(0.37));
    }
}
