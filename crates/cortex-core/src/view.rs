//! View configuration polled by the renderers once per frame
//!
//! The host UI owns a [`ViewConfig`] and hands a copy to the session each
//! frame. Mode and overlay toggles therefore take effect on the next frame and
//! a frame is always built for exactly one [`ViewMode`].

use serde::{Deserialize, Serialize};

/// How the cortical surface is coloured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewMode {
    /// Colormap over the interpolated per-vertex activation
    #[default]
    Activation,
    /// Region colour lookup; activation is not sampled
    Atlas,
}

/// How activation values are mapped into the colormap's `[0, 1]` input
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum Normalization {
    /// Min/max over every loaded estimate
    #[default]
    Global,
    /// Min/max of the slices shown in the current frame
    PerFrame,
    /// `[-m, m]` with `m` the largest absolute value over the loaded estimates
    Symmetric,
    /// User supplied range
    Fixed { min: f32, max: f32 },
}

impl Normalization {
    /// Resolve the value range for one frame
    ///
    /// `global` is the union of the loaded estimates' value ranges and
    /// `frame` the min/max of the current slices.
    pub fn range(&self, global: (f32, f32), frame: (f32, f32)) -> (f32, f32) {
        match *self {
            Normalization::Global => global,
            Normalization::PerFrame => frame,
            Normalization::Symmetric => {
                let m = global.0.abs().max(global.1.abs());
                (-m, m)
            }
            Normalization::Fixed { min, max } => (min.min(max), min.max(max)),
        }
    }
}

/// Map a value into `[0, 1]` for a `(min, max)` range
///
/// An empty or non-finite range maps everything to the midpoint, as do
/// non-finite values. Any positive span is usable: source amplitudes in A·m
/// sit around 1e-10.
#[inline]
pub fn normalize(value: f32, (min, max): (f32, f32)) -> f32 {
    let span = max - min;
    if !value.is_finite() || !span.is_finite() || span <= 0.0 {
        return 0.5;
    }
    ((value - min) / span).clamp(0.0, 1.0)
}

/// Min/max over the finite values of several slices, `(0, 0)` if none
pub fn value_range<'a>(slices: impl IntoIterator<Item = &'a [f32]>) -> (f32, f32) {
    let (lo, hi) = slices
        .into_iter()
        .flat_map(|s| s.iter().copied())
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        (0.0, 0.0)
    } else {
        (lo, hi)
    }
}

/// Reduction applied across vertices for the butterfly overlay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregation {
    Mean,
    /// Root mean square
    #[default]
    Rms,
    /// Largest absolute value
    Peak,
    /// Mean of absolute values
    MeanAbs,
}

impl Aggregation {
    /// Reduce one time sample across vertices, skipping non-finite values
    pub fn reduce(&self, values: impl Iterator<Item = f32>) -> f32 {
        let mut count = 0usize;
        let mut acc = 0.0f64;
        for v in values.filter(|v| v.is_finite()) {
            let v = v as f64;
            count += 1;
            match self {
                Aggregation::Mean => acc += v,
                Aggregation::Rms => acc += v * v,
                Aggregation::Peak => acc = acc.max(v.abs()),
                Aggregation::MeanAbs => acc += v.abs(),
            }
        }
        if count == 0 {
            return 0.0;
        }
        let n = count as f64;
        let out = match self {
            Aggregation::Mean | Aggregation::MeanAbs => acc / n,
            Aggregation::Rms => (acc / n).sqrt(),
            Aggregation::Peak => acc,
        };
        out as f32
    }
}

/// Per-frame UI state consumed read-only by the renderers
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub mode: ViewMode,
    /// Composite the butterfly trace over the 3D viewport
    pub traces_overlay: bool,
    pub normalization: Normalization,
    pub aggregation: Aggregation,
}
