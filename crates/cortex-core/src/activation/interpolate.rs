//! Per-vertex linear interpolation between two time samples

use rayon::prelude::*;

use crate::data::SourceEstimate;
use crate::timeline::SourcePosition;
use crate::types::NEUTRAL_ACTIVATION;

/// Vertices per rayon work item
const PARALLEL_CHUNK: usize = 4096;

/// Fill `out` with the activation of every vertex at `position`
///
/// `out` must hold one value per estimate vertex. `NoData` fills the neutral
/// value, as do non-finite samples. Meshes with at least `parallel_threshold`
/// vertices are split across the rayon pool.
pub fn interpolate_into(
    estimate: &SourceEstimate,
    position: SourcePosition,
    out: &mut [f32],
    parallel_threshold: usize,
) {
    debug_assert_eq!(out.len(), estimate.vertex_count());

    let (lower, upper, fraction) = match position {
        SourcePosition::NoData => {
            out.fill(NEUTRAL_ACTIVATION);
            return;
        }
        SourcePosition::Between { lower, upper, fraction } => (lower, upper, fraction as f32),
    };

    let sample = |vertex: usize| -> f32 {
        let a = estimate.value(vertex, lower);
        let b = estimate.value(vertex, upper);
        let v = a + (b - a) * fraction;
        if v.is_finite() {
            v
        } else {
            NEUTRAL_ACTIVATION
        }
    };

    if out.len() >= parallel_threshold {
        out.par_chunks_mut(PARALLEL_CHUNK)
            .enumerate()
            .for_each(|(chunk_idx, chunk)| {
                let base = chunk_idx * PARALLEL_CHUNK;
                for (i, slot) in chunk.iter_mut().enumerate() {
                    *slot = sample(base + i);
                }
            });
    } else {
        for (vertex, slot) in out.iter_mut().enumerate() {
            *slot = sample(vertex);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::bracket;

    #[test]
    fn test_midpoint_interpolation() {
        let est = SourceEstimate::from_rows(vec![0.0, 1.0], vec![vec![0.0, 10.0]]).unwrap();
        let mut out = vec![0.0; 1];
        interpolate_into(&est, bracket(est.timestamps(), 0.5), &mut out, usize::MAX);
        assert_eq!(out[0], 5.0);
    }

    #[test]
    fn test_no_data_is_neutral() {
        let est = SourceEstimate::from_rows(vec![0.0, 1.0], vec![vec![3.0, 4.0]; 3]).unwrap();
        let mut out = vec![9.0; 3];
        interpolate_into(&est, SourcePosition::NoData, &mut out, usize::MAX);
        assert!(out.iter().all(|&v| v == NEUTRAL_ACTIVATION));
    }

    #[test]
    fn test_parallel_matches_serial() {
        let n = 10_000;
        let rows: Vec<Vec<f32>> = (0..n).map(|v| vec![v as f32, -(v as f32)]).collect();
        let est = SourceEstimate::from_rows(vec![0.0, 2.0], rows).unwrap();
        let pos = bracket(est.timestamps(), 0.5);

        let mut serial = vec![0.0; n];
        let mut parallel = vec![0.0; n];
        interpolate_into(&est, pos, &mut serial, usize::MAX);
        interpolate_into(&est, pos, &mut parallel, 0);
        assert_eq!(serial, parallel);
        assert_eq!(parallel[100], 50.0);
    }

    #[test]
    fn test_non_finite_sample_is_neutral() {
        let est = SourceEstimate::from_rows(vec![0.0, 1.0], vec![vec![f32::NAN, 1.0]]).unwrap();
        let mut out = vec![1.0; 1];
        interpolate_into(&est, bracket(est.timestamps(), 0.5), &mut out, usize::MAX);
        assert_eq!(out[0], NEUTRAL_ACTIVATION);
    }
}
