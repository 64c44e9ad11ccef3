//! Butterfly aggregate of a source estimate
//!
//! The overlay only needs one value per time sample, so the reduction across
//! vertices runs once per estimate load instead of every frame.

use rayon::prelude::*;

use crate::data::SourceEstimate;
use crate::timeline::{bracket, SourcePosition};
use crate::view::Aggregation;

/// Aggregate time course of one estimate
#[derive(Debug, Clone, PartialEq)]
pub struct ButterflyTrace {
    timestamps: Vec<f64>,
    values: Vec<f32>,
    aggregation: Aggregation,
    range: (f32, f32),
}

impl ButterflyTrace {
    /// Reduce every time sample across vertices (parallel over time)
    pub fn compute(estimate: &SourceEstimate, aggregation: Aggregation) -> Self {
        let vertices = estimate.vertex_count();
        let values: Vec<f32> = (0..estimate.time_count())
            .into_par_iter()
            .map(|t| aggregation.reduce((0..vertices).map(|v| estimate.value(v, t))))
            .collect();

        let range = crate::view::value_range([values.as_slice()]);
        Self {
            timestamps: estimate.timestamps().to_vec(),
            values,
            aggregation,
            range,
        }
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    /// (min, max) of the aggregate
    pub fn range(&self) -> (f32, f32) {
        self.range
    }

    /// Interpolated aggregate at `t`, `None` outside the estimate
    pub fn value_at(&self, t: f64) -> Option<f32> {
        match bracket(&self.timestamps, t) {
            SourcePosition::NoData => None,
            SourcePosition::Between { lower, upper, fraction } => {
                let a = self.values[lower];
                let b = self.values[upper];
                Some(a + (b - a) * fraction as f32)
            }
        }
    }
}
