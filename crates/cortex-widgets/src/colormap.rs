//! Activation colormaps
//!
//! Each map is a short table of evenly spaced control points; sampling
//! interpolates linearly between neighbours.

use cortex_core::Rgba;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Colormap {
    /// Perceptually uniform dark-blue → yellow
    #[default]
    Viridis,
    /// Diverging blue → white → red, for signed activation
    CoolWarm,
    /// Black → red → yellow → white
    Hot,
}

const VIRIDIS: [[f32; 3]; 9] = [
    [0.267, 0.005, 0.329],
    [0.283, 0.141, 0.458],
    [0.254, 0.265, 0.530],
    [0.207, 0.372, 0.553],
    [0.164, 0.471, 0.558],
    [0.128, 0.567, 0.551],
    [0.135, 0.659, 0.518],
    [0.478, 0.821, 0.318],
    [0.993, 0.906, 0.144],
];

const COOL_WARM: [[f32; 3]; 5] = [
    [0.230, 0.299, 0.754],
    [0.552, 0.690, 0.996],
    [0.865, 0.865, 0.865],
    [0.958, 0.603, 0.482],
    [0.706, 0.016, 0.150],
];

const HOT: [[f32; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [0.9, 0.0, 0.0],
    [1.0, 0.9, 0.0],
    [1.0, 1.0, 1.0],
];

impl Colormap {
    pub const ALL: [Colormap; 3] = [Colormap::Viridis, Colormap::CoolWarm, Colormap::Hot];

    fn stops(&self) -> &'static [[f32; 3]] {
        match self {
            Colormap::Viridis => &VIRIDIS,
            Colormap::CoolWarm => &COOL_WARM,
            Colormap::Hot => &HOT,
        }
    }

    /// Colour for a normalised value; input is clamped to `[0, 1]`
    pub fn sample(&self, x: f32) -> Rgba {
        let stops = self.stops();
        let x = if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.5 };
        let pos = x * (stops.len() - 1) as f32;
        let lower = (pos.floor() as usize).min(stops.len() - 2);
        let frac = pos - lower as f32;
        let (a, b) = (stops[lower], stops[lower + 1]);
        [
            a[0] + (b[0] - a[0]) * frac,
            a[1] + (b[1] - a[1]) * frac,
            a[2] + (b[2] - a[2]) * frac,
            1.0,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Colormap::Viridis => "Viridis",
            Colormap::CoolWarm => "Cool-warm",
            Colormap::Hot => "Hot",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_match_stops() {
        for map in Colormap::ALL {
            let stops = map.stops();
            let first = map.sample(0.0);
            let last = map.sample(1.0);
            assert_eq!(&first[..3], &stops[0][..]);
            for (c, s) in last[..3].iter().zip(stops[stops.len() - 1]) {
                assert!((c - s).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let map = Colormap::Hot;
        assert_eq!(map.sample(-3.0), map.sample(0.0));
        assert_eq!(map.sample(7.0), map.sample(1.0));
        assert_eq!(map.sample(f32::NAN), map.sample(0.5));
    }

    #[test]
    fn test_midpoint_interpolates() {
        // Hot has stops at 0, 1/3, 2/3, 1; halfway between the first two
        let c = Colormap::Hot.sample(1.0 / 6.0);
        assert!((c[0] - 0.45).abs() < 1e-5);
        assert_eq!(c[3], 1.0);
    }
}
