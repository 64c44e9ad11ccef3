//! Per-hemisphere source estimate (activation over time)

use crate::error::DataIntegrityError;

/// Activation matrix for one hemisphere
///
/// Values are stored row-major as `[vertex][time]`, so one vertex's full time
/// course is contiguous. Timestamps are strictly increasing seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEstimate {
    timestamps: Vec<f64>,
    data: Vec<f32>,
    vertex_count: usize,
    /// (min, max) over all finite values, cached for global normalization
    value_range: (f32, f32),
}

impl SourceEstimate {
    /// Build from a flat row-major `[vertex][time]` matrix
    pub fn new(
        timestamps: Vec<f64>,
        data: Vec<f32>,
        vertex_count: usize,
    ) -> Result<Self, DataIntegrityError> {
        validate_timestamps(&timestamps)?;
        let time_count = timestamps.len();
        if data.len() != vertex_count * time_count {
            return Err(DataIntegrityError::MatrixShapeMismatch {
                rows: vertex_count,
                cols: time_count,
                actual: data.len(),
            });
        }

        let value_range = finite_range(&data);
        Ok(Self {
            timestamps,
            data,
            vertex_count,
            value_range,
        })
    }

    /// Build from one time course per vertex
    pub fn from_rows(timestamps: Vec<f64>, rows: Vec<Vec<f32>>) -> Result<Self, DataIntegrityError> {
        let vertex_count = rows.len();
        let time_count = timestamps.len();
        let mut data = Vec::with_capacity(vertex_count * time_count);
        for row in &rows {
            if row.len() != time_count {
                return Err(DataIntegrityError::MatrixShapeMismatch {
                    rows: vertex_count,
                    cols: time_count,
                    actual: rows.iter().map(Vec::len).sum(),
                });
            }
            data.extend_from_slice(row);
        }
        Self::new(timestamps, data, vertex_count)
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn time_count(&self) -> usize {
        self.timestamps.len()
    }

    /// First and last timestamp
    pub fn time_range(&self) -> (f64, f64) {
        // Validation guarantees at least one timestamp
        (self.timestamps[0], self.timestamps[self.timestamps.len() - 1])
    }

    /// Global (min, max) activation, `(0, 0)` when no finite values exist
    pub fn value_range(&self) -> (f32, f32) {
        self.value_range
    }

    /// Full time course of one vertex
    #[inline]
    pub fn row(&self, vertex: usize) -> &[f32] {
        let t = self.time_count();
        &self.data[vertex * t..(vertex + 1) * t]
    }

    /// Activation of `vertex` at time index `time_idx`
    #[inline]
    pub fn value(&self, vertex: usize, time_idx: usize) -> f32 {
        self.data[vertex * self.time_count() + time_idx]
    }

    /// Raw row-major storage
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

fn validate_timestamps(timestamps: &[f64]) -> Result<(), DataIntegrityError> {
    if timestamps.is_empty() {
        return Err(DataIntegrityError::EmptyEstimate);
    }
    for (i, t) in timestamps.iter().enumerate() {
        if !t.is_finite() {
            return Err(DataIntegrityError::NonFiniteTimestamp { index: i });
        }
    }
    if let Some(i) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
        return Err(DataIntegrityError::TimestampsNotIncreasing { index: i + 1 });
    }
    Ok(())
}

fn finite_range(values: &[f32]) -> (f32, f32) {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if min > max {
        (0.0, 0.0)
    } else {
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_layout() {
        let est = SourceEstimate::from_rows(
            vec![0.0, 0.5, 1.0],
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        )
        .unwrap();
        assert_eq!(est.vertex_count(), 2);
        assert_eq!(est.time_count(), 3);
        assert_eq!(est.row(1), &[4.0, 5.0, 6.0]);
        assert_eq!(est.value(0, 2), 3.0);
        assert_eq!(est.value_range(), (1.0, 6.0));
        assert_eq!(est.time_range(), (0.0, 1.0));
    }

    #[test]
    fn test_timestamps_must_increase() {
        let err = SourceEstimate::new(vec![0.0, 1.0, 1.0], vec![0.0; 3], 1).unwrap_err();
        assert_eq!(err, DataIntegrityError::TimestampsNotIncreasing { index: 2 });
    }

    #[test]
    fn test_shape_mismatch() {
        let err = SourceEstimate::new(vec![0.0, 1.0], vec![0.0; 5], 2).unwrap_err();
        assert!(matches!(err, DataIntegrityError::MatrixShapeMismatch { rows: 2, cols: 2, actual: 5 }));
    }

    #[test]
    fn test_empty_estimate_rejected() {
        assert_eq!(
            SourceEstimate::new(Vec::new(), Vec::new(), 0).unwrap_err(),
            DataIntegrityError::EmptyEstimate
        );
    }

    #[test]
    fn test_value_range_ignores_nan() {
        let est = SourceEstimate::new(vec![0.0, 1.0], vec![f32::NAN, -2.0], 1).unwrap();
        assert_eq!(est.value_range(), (-2.0, -2.0));
    }
}
