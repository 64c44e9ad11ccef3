//! Cortical surface rendering
//!
//! [`SurfaceRenderer::build_frame`] turns the session's state for one frame
//! into a [`SurfaceFrame`]: per hemisphere, the geometry and one colour per
//! vertex. The frame is built for exactly one [`ViewMode`]:
//!
//! - **Activation**: `colormap(normalize(value))` over the front slice
//! - **Atlas**: region colour lookup; activation is never read
//!
//! Hemispheres without a mesh are absent from the frame. Hemispheres without
//! an active estimate (or atlas, in atlas mode) render neutral. Colours are
//! only recomputed when their inputs change; each change bumps the colour
//! revision and flips the hemisphere's colour-buffer parity.
//!
//! [`SurfaceViewport`] draws frames through the GPU pipeline in `pipeline`.

mod colors;
mod geometry;
mod pipeline;
mod viewport;

use std::sync::Arc;

use cortex_core::activation::SliceSlot;
use cortex_core::data::{AtlasLabeling, SurfaceMesh};
use cortex_core::view::value_range;
use cortex_core::{Generation, Hemisphere, ResourceExhaustionError, Rgba, Session, ViewConfig, ViewMode};

use crate::colormap::Colormap;
use crate::theme::HOVER_HIGHLIGHT;

pub use colors::{activation_colors, atlas_colors, neutral_colors};
pub use geometry::{check_buffer_limits, GpuVertex, MeshGeometry};
pub use pipeline::SurfacePrimitive;
pub use viewport::{DragKind, SurfaceEvent, SurfaceViewport};

/// Conservative default matching wgpu's baseline `max_buffer_size`
pub const DEFAULT_MAX_BUFFER_SIZE: u64 = 256 << 20;

/// Per-hemisphere state read for one frame
#[derive(Debug, Clone, Copy, Default)]
pub struct HemisphereInput<'a> {
    pub mesh: Option<(&'a SurfaceMesh, Generation)>,
    /// Front slice; `None` when the hemisphere has no active estimate
    pub slice: Option<&'a SliceSlot>,
    pub atlas: Option<(&'a AtlasLabeling, Generation)>,
}

/// Everything the renderer reads for one frame
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceInputs<'a> {
    pub hemispheres: [HemisphereInput<'a>; 2],
    /// Union of the loaded estimates' value ranges
    pub global_range: (f32, f32),
    /// Broadcast time of the frame
    pub time: f64,
}

impl<'a> SurfaceInputs<'a> {
    pub fn from_session(session: &'a Session) -> Self {
        let activation = session.activation();
        let hemispheres = Hemisphere::ALL.map(|h| HemisphereInput {
            mesh: session.mesh(h).map(|m| (&**m, session.mesh_generation(h))),
            slice: activation.estimate(h).map(|_| activation.front(h)),
            atlas: session.atlas(h).map(|a| (&**a, session.atlas_generation(h))),
        });

        Self {
            hemispheres,
            global_range: activation.value_range(),
            time: session.bus().current().time,
        }
    }
}

/// How a hemisphere was coloured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HemisphereFill {
    Activation,
    Atlas,
    Neutral,
}

/// One hemisphere of a frame
#[derive(Debug, Clone)]
pub struct HemisphereFrame {
    pub fill: HemisphereFill,
    pub geometry: Arc<MeshGeometry>,
    pub colors: Arc<Vec<Rgba>>,
    /// Bumped whenever `colors` changes
    pub revision: u64,
    /// Colour buffer holding this revision
    pub parity: usize,
}

/// Colours for one frame, built for exactly one mode
#[derive(Debug, Clone)]
pub struct SurfaceFrame {
    pub mode: ViewMode,
    pub time: f64,
    /// Normalization range in activation mode
    pub range: Option<(f32, f32)>,
    pub hemispheres: [Option<HemisphereFrame>; 2],
}

impl SurfaceFrame {
    pub fn hemisphere(&self, hemisphere: Hemisphere) -> Option<&HemisphereFrame> {
        self.hemispheres[hemisphere.index()].as_ref()
    }

    /// Combined bounds of the drawn hemispheres
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        self.hemispheres
            .iter()
            .flatten()
            .filter_map(|h| h.geometry.bounds)
            .reduce(|(amin, amax), (bmin, bmax)| {
                (
                    [amin[0].min(bmin[0]), amin[1].min(bmin[1]), amin[2].min(bmin[2])],
                    [amax[0].max(bmax[0]), amax[1].max(bmax[1]), amax[2].max(bmax[2])],
                )
            })
    }
}

/// Inputs that produced a hemisphere's current colours
#[derive(Debug, Clone, Copy, PartialEq)]
enum ColorKey {
    Activation {
        generation: Generation,
        time: Option<f64>,
        range: (f32, f32),
        colormap: Colormap,
    },
    Atlas {
        generation: Generation,
        hovered: Option<u32>,
    },
    Neutral,
}

#[derive(Default)]
struct RendererSlot {
    geometry: Option<Arc<MeshGeometry>>,
    colors: Arc<Vec<Rgba>>,
    key: Option<ColorKey>,
    revision: u64,
    parity: usize,
    /// Mesh generation already reported as too large
    reported: Option<Generation>,
}

impl RendererSlot {
    fn geometry(&mut self, mesh: &SurfaceMesh, generation: Generation) -> Arc<MeshGeometry> {
        match &self.geometry {
            Some(g) if g.generation == generation => Arc::clone(g),
            _ => {
                let geometry = Arc::new(MeshGeometry::from_mesh(mesh, generation));
                self.geometry = Some(Arc::clone(&geometry));
                // New geometry invalidates the colours
                self.key = None;
                geometry
            }
        }
    }

    fn set_colors(&mut self, key: ColorKey, colors: Vec<Rgba>) {
        self.colors = Arc::new(colors);
        self.key = Some(key);
        self.revision += 1;
        self.parity ^= 1;
    }
}

/// Builds per-frame surface colours
pub struct SurfaceRenderer {
    colormap: Colormap,
    max_buffer_size: u64,
    /// Hovered atlas region per hemisphere
    hovered: [Option<u32>; 2],
    slots: [RendererSlot; 2],
    errors: Vec<ResourceExhaustionError>,
}

impl Default for SurfaceRenderer {
    fn default() -> Self {
        Self::new(Colormap::default())
    }
}

impl SurfaceRenderer {
    pub fn new(colormap: Colormap) -> Self {
        Self {
            colormap,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            hovered: [None, None],
            slots: [RendererSlot::default(), RendererSlot::default()],
            errors: Vec::new(),
        }
    }

    /// Use the device's actual buffer limit
    pub fn with_max_buffer_size(mut self, max_buffer_size: u64) -> Self {
        self.max_buffer_size = max_buffer_size;
        self
    }

    pub fn colormap(&self) -> Colormap {
        self.colormap
    }

    pub fn set_colormap(&mut self, colormap: Colormap) {
        self.colormap = colormap;
    }

    /// Highlight a region in atlas mode (`None` clears)
    pub fn set_hovered_region(&mut self, hemisphere: Hemisphere, region: Option<u32>) {
        self.hovered[hemisphere.index()] = region;
    }

    /// Resource errors recorded since the last call (each reported once)
    pub fn take_errors(&mut self) -> Vec<ResourceExhaustionError> {
        std::mem::take(&mut self.errors)
    }

    pub fn build_frame(&mut self, view: &ViewConfig, inputs: &SurfaceInputs) -> SurfaceFrame {
        let range = match view.mode {
            ViewMode::Activation => {
                let frame_range = value_range(
                    inputs
                        .hemispheres
                        .iter()
                        .filter_map(|h| h.slice.map(|s| s.values.as_slice())),
                );
                Some(view.normalization.range(inputs.global_range, frame_range))
            }
            ViewMode::Atlas => None,
        };

        let mut hemispheres: [Option<HemisphereFrame>; 2] = [None, None];
        for hemisphere in Hemisphere::ALL {
            hemispheres[hemisphere.index()] = self.build_hemisphere(hemisphere, view.mode, range, inputs);
        }

        SurfaceFrame {
            mode: view.mode,
            time: inputs.time,
            range,
            hemispheres,
        }
    }

    fn build_hemisphere(
        &mut self,
        hemisphere: Hemisphere,
        mode: ViewMode,
        range: Option<(f32, f32)>,
        inputs: &SurfaceInputs,
    ) -> Option<HemisphereFrame> {
        let input = inputs.hemispheres[hemisphere.index()];
        let hovered = self.hovered[hemisphere.index()];
        let colormap = self.colormap;
        let slot = &mut self.slots[hemisphere.index()];

        let Some((mesh, mesh_generation)) = input.mesh else {
            *slot = RendererSlot::default();
            return None;
        };
        let geometry = slot.geometry(mesh, mesh_generation);

        if let Err(e) = check_buffer_limits(hemisphere, &geometry, self.max_buffer_size) {
            if slot.reported != Some(mesh_generation) {
                log::warn!("build_frame: {}, skipping hemisphere", e);
                slot.reported = Some(mesh_generation);
                self.errors.push(e);
            }
            return None;
        }

        let vertex_count = geometry.vertex_count();
        let (fill, key) = match (mode, input.slice, input.atlas, range) {
            (ViewMode::Activation, Some(slice), _, Some(range)) if slice.values.len() == vertex_count => (
                HemisphereFill::Activation,
                ColorKey::Activation {
                    generation: slice.generation,
                    time: slice.time,
                    range,
                    colormap,
                },
            ),
            (ViewMode::Atlas, _, Some((_, generation)), _) => {
                (HemisphereFill::Atlas, ColorKey::Atlas { generation, hovered })
            }
            _ => (HemisphereFill::Neutral, ColorKey::Neutral),
        };

        if slot.key != Some(key) {
            let colors = match (fill, input.slice, input.atlas) {
                (HemisphereFill::Activation, Some(slice), _) => {
                    activation_colors(&slice.values, range.unwrap_or((0.0, 0.0)), colormap)
                }
                (HemisphereFill::Atlas, _, Some((atlas, _))) => {
                    let mut colors = atlas_colors(atlas, vertex_count);
                    if let Some(region) = hovered {
                        highlight_region(&mut colors, atlas, region);
                    }
                    colors
                }
                _ => neutral_colors(vertex_count),
            };
            slot.set_colors(key, colors);
        }

        Some(HemisphereFrame {
            fill,
            geometry,
            colors: Arc::clone(&slot.colors),
            revision: slot.revision,
            parity: slot.parity,
        })
    }
}

/// Blend the hover highlight over every vertex of `region`
fn highlight_region(colors: &mut [Rgba], atlas: &AtlasLabeling, region: u32) {
    let a = HOVER_HIGHLIGHT[3];
    for (color, &label) in colors.iter_mut().zip(atlas.labels()) {
        if label == region {
            for c in 0..3 {
                color[c] = color[c] * (1.0 - a) + HOVER_HIGHLIGHT[c] * a;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::NEUTRAL_SURFACE;
    use cortex_core::config::{EngineConfig, SchedulingMode};
    use cortex_core::data::{Region, SourceEstimate};
    use cortex_core::clock::ClockCommand;
    use cortex_core::Normalization;

    fn mesh(n: usize) -> SurfaceMesh {
        let positions = (0..n).map(|i| [i as f32, (i % 3) as f32, 0.0]).collect();
        let faces = (1..n.saturating_sub(1)).map(|i| [0, i as u32, i as u32 + 1]).collect();
        SurfaceMesh::new(positions, faces, None).unwrap()
    }

    fn atlas(n: usize) -> AtlasLabeling {
        AtlasLabeling::new(
            (0..n as u32).map(|v| v % 2).collect(),
            vec![
                Region { id: 0, name: "unknown".into(), color: [0.1, 0.1, 0.1, 1.0] },
                Region { id: 1, name: "precuneus".into(), color: [0.9, 0.2, 0.2, 1.0] },
            ],
        )
        .unwrap()
    }

    fn session() -> Session {
        let mut config = EngineConfig::default();
        config.activation.scheduling = SchedulingMode::Inline;
        let mut session = Session::new(config);
        session.load_surface(Hemisphere::Left, mesh(4), Some(atlas(4))).unwrap();
        session.load_surface(Hemisphere::Right, mesh(3), None).unwrap();
        let estimate = SourceEstimate::from_rows(vec![0.0, 1.0], vec![vec![0.0, 10.0]; 4]).unwrap();
        session.load_estimate(Hemisphere::Left, estimate).unwrap();
        session.submit(ClockCommand::ScrubTo(0.5));
        session.advance_frame(0.0);
        session
    }

    #[test]
    fn test_activation_frame_colours_and_neutral_rh() {
        let session = session();
        let mut renderer = SurfaceRenderer::new(Colormap::Hot);
        let frame = renderer.build_frame(&session.view(), &SurfaceInputs::from_session(&session));

        assert_eq!(frame.mode, ViewMode::Activation);
        assert_eq!(frame.range, Some((0.0, 10.0)));
        let lh = frame.hemisphere(Hemisphere::Left).unwrap();
        assert_eq!(lh.fill, HemisphereFill::Activation);
        assert!(lh.colors.iter().all(|&c| c == Colormap::Hot.sample(0.5)));

        let rh = frame.hemisphere(Hemisphere::Right).unwrap();
        assert_eq!(rh.fill, HemisphereFill::Neutral);
        assert_eq!(rh.colors.as_slice(), &[NEUTRAL_SURFACE; 3]);
    }

    #[test]
    fn test_atlas_frame_ignores_activation() {
        let session = session();
        let mut renderer = SurfaceRenderer::default();
        let view = ViewConfig { mode: ViewMode::Atlas, ..session.view() };
        let frame = renderer.build_frame(&view, &SurfaceInputs::from_session(&session));

        assert_eq!(frame.mode, ViewMode::Atlas);
        assert_eq!(frame.range, None);
        let lh = frame.hemisphere(Hemisphere::Left).unwrap();
        assert_eq!(lh.fill, HemisphereFill::Atlas);
        assert_eq!(lh.colors[1], [0.9, 0.2, 0.2, 1.0]);
        // RH has no atlas
        assert_eq!(frame.hemisphere(Hemisphere::Right).unwrap().fill, HemisphereFill::Neutral);
    }

    #[test]
    fn test_unchanged_inputs_keep_revision() {
        let session = session();
        let mut renderer = SurfaceRenderer::default();
        let inputs = SurfaceInputs::from_session(&session);
        let first = renderer.build_frame(&session.view(), &inputs);
        let second = renderer.build_frame(&session.view(), &inputs);

        let (a, b) = (first.hemisphere(Hemisphere::Left).unwrap(), second.hemisphere(Hemisphere::Left).unwrap());
        assert_eq!(a.revision, b.revision);
        assert_eq!(a.parity, b.parity);
        assert!(Arc::ptr_eq(&a.colors, &b.colors));
    }

    #[test]
    fn test_mode_switch_flips_parity() {
        let session = session();
        let mut renderer = SurfaceRenderer::default();
        let inputs = SurfaceInputs::from_session(&session);
        let activation = renderer.build_frame(&session.view(), &inputs);
        let atlas = renderer.build_frame(&ViewConfig { mode: ViewMode::Atlas, ..session.view() }, &inputs);

        let (a, b) = (activation.hemisphere(Hemisphere::Left).unwrap(), atlas.hemisphere(Hemisphere::Left).unwrap());
        assert_eq!(b.revision, a.revision + 1);
        assert_ne!(a.parity, b.parity);
    }

    #[test]
    fn test_fixed_normalization() {
        let session = session();
        let mut renderer = SurfaceRenderer::new(Colormap::Viridis);
        let view = ViewConfig {
            normalization: Normalization::Fixed { min: 5.0, max: 15.0 },
            ..session.view()
        };
        let frame = renderer.build_frame(&view, &SurfaceInputs::from_session(&session));
        let lh = frame.hemisphere(Hemisphere::Left).unwrap();
        assert!(lh.colors.iter().all(|&c| c == Colormap::Viridis.sample(0.0)));
    }

    #[test]
    fn test_oversized_hemisphere_skipped_and_reported_once() {
        let session = session();
        let mut renderer = SurfaceRenderer::default().with_max_buffer_size(64);
        let inputs = SurfaceInputs::from_session(&session);
        let frame = renderer.build_frame(&session.view(), &inputs);
        renderer.build_frame(&session.view(), &inputs);

        // LH: 4 vertices * 24 bytes > 64; RH: 3 * 24 = 72 > 64 as well
        assert!(frame.hemisphere(Hemisphere::Left).is_none());
        assert!(frame.hemisphere(Hemisphere::Right).is_none());
        assert_eq!(renderer.take_errors().len(), 2);
        assert!(renderer.take_errors().is_empty());
    }

    #[test]
    fn test_hover_highlights_region() {
        let session = session();
        let mut renderer = SurfaceRenderer::default();
        renderer.set_hovered_region(Hemisphere::Left, Some(1));
        let view = ViewConfig { mode: ViewMode::Atlas, ..session.view() };
        let frame = renderer.build_frame(&view, &SurfaceInputs::from_session(&session));
        let lh = frame.hemisphere(Hemisphere::Left).unwrap();
        assert_eq!(lh.colors[0], [0.1, 0.1, 0.1, 1.0]);
        assert_ne!(lh.colors[1], [0.9, 0.2, 0.2, 1.0]);
    }

    #[test]
    fn test_frame_bounds_union() {
        let session = session();
        let mut renderer = SurfaceRenderer::default();
        let frame = renderer.build_frame(&session.view(), &SurfaceInputs::from_session(&session));
        let (min, max) = frame.bounds().unwrap();
        assert_eq!(min, [0.0, 0.0, 0.0]);
        assert_eq!(max, [3.0, 2.0, 0.0]);
    }
}
