//! Per-vertex colour computation

use rayon::prelude::*;

use cortex_core::data::AtlasLabeling;
use cortex_core::view::normalize;
use cortex_core::Rgba;

use crate::colormap::Colormap;
use crate::theme::NEUTRAL_SURFACE;

/// Meshes at or above this size are coloured in parallel
const PARALLEL_COLOR_THRESHOLD: usize = 16_384;

/// Colour an activation slice through the colormap
pub fn activation_colors(slice: &[f32], range: (f32, f32), colormap: Colormap) -> Vec<Rgba> {
    let color = |&v: &f32| colormap.sample(normalize(v, range));
    if slice.len() >= PARALLEL_COLOR_THRESHOLD {
        slice.par_iter().map(color).collect()
    } else {
        slice.iter().map(color).collect()
    }
}

/// Colour each vertex by its atlas region
///
/// Vertices beyond the labeling fall back to neutral.
pub fn atlas_colors(atlas: &AtlasLabeling, vertex_count: usize) -> Vec<Rgba> {
    (0..vertex_count)
        .map(|v| atlas.color_of(v).unwrap_or(NEUTRAL_SURFACE))
        .collect()
}

pub fn neutral_colors(vertex_count: usize) -> Vec<Rgba> {
    vec![NEUTRAL_SURFACE; vertex_count]
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::data::Region;

    #[test]
    fn test_activation_uses_range_endpoints() {
        let colors = activation_colors(&[0.0, 10.0, 5.0], (0.0, 10.0), Colormap::Hot);
        assert_eq!(colors[0], Colormap::Hot.sample(0.0));
        assert_eq!(colors[1], Colormap::Hot.sample(1.0));
        assert_eq!(colors[2], Colormap::Hot.sample(0.5));
    }

    #[test]
    fn test_degenerate_range_is_midpoint() {
        let colors = activation_colors(&[3.0, 3.0], (3.0, 3.0), Colormap::Viridis);
        assert!(colors.iter().all(|&c| c == Colormap::Viridis.sample(0.5)));
    }

    #[test]
    fn test_parallel_matches_serial() {
        let slice: Vec<f32> = (0..PARALLEL_COLOR_THRESHOLD + 10).map(|i| (i % 100) as f32).collect();
        let parallel = activation_colors(&slice, (0.0, 99.0), Colormap::CoolWarm);
        let serial: Vec<Rgba> = slice
            .iter()
            .map(|&v| Colormap::CoolWarm.sample(normalize(v, (0.0, 99.0))))
            .collect();
        assert_eq!(parallel, serial);
    }

    #[test]
    fn test_atlas_lookup() {
        let atlas = AtlasLabeling::new(
            vec![7, 9],
            vec![
                Region { id: 7, name: "cuneus".into(), color: [1.0, 0.0, 0.0, 1.0] },
                Region { id: 9, name: "insula".into(), color: [0.0, 1.0, 0.0, 1.0] },
            ],
        )
        .unwrap();
        let colors = atlas_colors(&atlas, 3);
        assert_eq!(colors, vec![[1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0], NEUTRAL_SURFACE]);
    }
}
