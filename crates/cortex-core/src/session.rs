//! Viewer session
//!
//! Owns every loaded entity, the time axis, the synchronization bus and the
//! activation buffer manager, and runs the per-frame sequence:
//!
//! ```text
//! advance_frame(elapsed)
//!   ├─ bus.pump(elapsed)          apply view commands, tick, broadcast once
//!   ├─ axis.resolve(t)            per-entity positions for the broadcast time
//!   └─ activation.prepare_frame   slices for t (skipped in atlas mode)
//! ```
//!
//! ## Loading and validation
//!
//! Entities arrive complete from loader collaborators. The session performs
//! the cross-entity checks (estimate vs. mesh vertex count, atlas coverage)
//! at load time. A failed check is reported once and suspends only the
//! affected rendering path; the hemisphere then renders neutral until a
//! matching mesh or estimate is loaded. Per-frame calls never fail.
//!
//! Each replacement bumps the slot's generation so renderers holding derived
//! GPU state can tell their copy is out of date.

use basedrop::Shared;

use crate::activation::ActivationManager;
use crate::aggregate::ButterflyTrace;
use crate::clock::{ClockCommand, PlaybackClock};
use crate::config::EngineConfig;
use crate::data::{AtlasLabeling, RawRecording, SourceEstimate, SurfaceMesh};
use crate::error::{DataIntegrityError, EngineError, EngineResult, LoadError};
use crate::gc::gc_handle;
use crate::loader::{LoadResult, LoadedEntity};
use crate::sync::{SyncBus, TimeUpdate};
use crate::timeline::{Resolution, TimeAxis};
use crate::types::{EntityKind, Generation, Hemisphere, NUM_HEMISPHERES};
use crate::view::ViewConfig;

/// What one `advance_frame` produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Frame counter, starting at 1
    pub frame: u64,
    /// Last broadcast state; every view draws from `update.time`
    pub update: TimeUpdate,
    pub resolution: Resolution,
    /// View configuration the frame was prepared for
    pub view: ViewConfig,
    /// Number of bus broadcasts during this frame
    pub broadcasts: usize,
}

#[derive(Default)]
struct HemisphereSlot {
    mesh: Option<Shared<SurfaceMesh>>,
    mesh_generation: Generation,
    atlas: Option<Shared<AtlasLabeling>>,
    atlas_generation: Generation,
    estimate: Option<Shared<SourceEstimate>>,
    butterfly: Option<ButterflyTrace>,
    /// Set while the estimate contradicts the mesh
    suspended: Option<DataIntegrityError>,
}

impl HemisphereSlot {
    /// Estimate usable for rendering
    fn active_estimate(&self) -> Option<&Shared<SourceEstimate>> {
        if self.suspended.is_some() {
            None
        } else {
            self.estimate.as_ref()
        }
    }
}

/// One viewer session
pub struct Session {
    config: EngineConfig,
    hemispheres: [HemisphereSlot; NUM_HEMISPHERES],
    recording: Option<Shared<RawRecording>>,
    recording_generation: Generation,
    axis: TimeAxis,
    bus: SyncBus,
    activation: ActivationManager,
    view: ViewConfig,
    reports: Vec<EngineError>,
    frame: u64,
}

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        let axis = TimeAxis::default();
        let clock = PlaybackClock::new(axis.domain(), config.playback.default_rate, config.playback.loop_mode);
        let activation = ActivationManager::new(config.activation.clone());
        let view = config.display.view_config();

        log::info!(
            "Session::new: scheduling {:?}, budget {:.1} ms, mode {:?}",
            config.activation.scheduling,
            config.activation.frame_budget_ms,
            view.mode
        );

        Self {
            config,
            hemispheres: [HemisphereSlot::default(), HemisphereSlot::default()],
            recording: None,
            recording_generation: Generation::INITIAL,
            axis,
            bus: SyncBus::new(clock),
            activation,
            view,
            reports: Vec::new(),
            frame: 0,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────

    /// Install a hemisphere surface and optional atlas
    ///
    /// An atlas that does not cover the mesh is rejected (reported) while the
    /// mesh is kept. A loaded estimate is re-validated against the new mesh.
    pub fn load_surface(
        &mut self,
        hemisphere: Hemisphere,
        mesh: SurfaceMesh,
        atlas: Option<AtlasLabeling>,
    ) -> EngineResult<()> {
        let vertex_count = mesh.vertex_count();
        let (atlas, atlas_error) = match atlas.map(|a| a.validate_against(vertex_count).map(|()| a)) {
            Some(Ok(atlas)) => (Some(atlas), None),
            Some(Err(e)) => (None, Some(e)),
            None => (None, None),
        };

        let handle = gc_handle();
        let slot = &mut self.hemispheres[hemisphere.index()];
        slot.mesh = Some(Shared::new(&handle, mesh));
        slot.mesh_generation = slot.mesh_generation.next();
        slot.atlas = atlas.map(|atlas| Shared::new(&handle, atlas));
        slot.atlas_generation = slot.atlas_generation.next();
        self.activation.replace_mesh(hemisphere, Some(vertex_count));

        log::info!("load_surface: {} mesh with {} vertices", hemisphere, vertex_count);

        let estimate_check = self.revalidate_estimate(hemisphere);
        if let Some(e) = atlas_error {
            self.report(e.clone().into());
            return Err(e.into());
        }
        estimate_check
    }

    /// Remove a hemisphere's surface and atlas
    pub fn unload_surface(&mut self, hemisphere: Hemisphere) {
        let slot = &mut self.hemispheres[hemisphere.index()];
        slot.mesh = None;
        slot.mesh_generation = slot.mesh_generation.next();
        slot.atlas = None;
        slot.atlas_generation = slot.atlas_generation.next();
        self.activation.replace_mesh(hemisphere, None);
        // Without a mesh there is nothing to contradict
        let _ = self.revalidate_estimate(hemisphere);
    }

    /// Install a hemisphere's source estimate
    ///
    /// Fails with [`DataIntegrityError::VertexCountMismatch`] when the
    /// hemisphere's mesh has a different vertex count; the estimate is then
    /// held but suspended until a matching mesh arrives.
    pub fn load_estimate(&mut self, hemisphere: Hemisphere, estimate: SourceEstimate) -> EngineResult<()> {
        let butterfly = ButterflyTrace::compute(&estimate, self.view.aggregation);
        let slot = &mut self.hemispheres[hemisphere.index()];
        slot.estimate = Some(Shared::new(&gc_handle(), estimate));
        slot.butterfly = Some(butterfly);
        log::info!("load_estimate: {} estimate installed", hemisphere);
        self.revalidate_estimate(hemisphere)
    }

    pub fn unload_estimate(&mut self, hemisphere: Hemisphere) {
        let slot = &mut self.hemispheres[hemisphere.index()];
        slot.estimate = None;
        slot.butterfly = None;
        let _ = self.revalidate_estimate(hemisphere);
    }

    pub fn load_recording(&mut self, recording: RawRecording) {
        log::info!(
            "load_recording: {} channels, {} samples at {} Hz",
            recording.channel_count(),
            recording.sample_count(),
            recording.sample_rate()
        );
        self.recording = Some(Shared::new(&gc_handle(), recording));
        self.recording_generation = self.recording_generation.next();
        self.rebuild_axis();
    }

    pub fn unload_recording(&mut self) {
        self.recording = None;
        self.recording_generation = self.recording_generation.next();
        self.rebuild_axis();
    }

    /// Record a collaborator failure and clear the affected entity
    ///
    /// The entity's views fall back to their empty state.
    pub fn load_failed(&mut self, error: LoadError) {
        match error.entity {
            EntityKind::Recording => self.unload_recording(),
            EntityKind::Surface(h) => self.unload_surface(h),
            EntityKind::Atlas(h) => {
                let slot = &mut self.hemispheres[h.index()];
                slot.atlas = None;
                slot.atlas_generation = slot.atlas_generation.next();
            }
            EntityKind::Estimate(h) => self.unload_estimate(h),
        }
        self.report(error.into());
    }

    /// Apply a result delivered by the background loader
    pub fn apply_load_result(&mut self, result: LoadResult) -> EngineResult<()> {
        let entity = match result.result {
            Ok(entity) => entity,
            Err(e) => {
                self.load_failed(e.clone());
                return Err(e.into());
            }
        };

        match entity {
            LoadedEntity::Recording(recording) => {
                self.load_recording(recording);
                Ok(())
            }
            LoadedEntity::Surface { hemisphere, mesh, atlas } => match atlas {
                Ok(atlas) => self.load_surface(hemisphere, mesh, atlas),
                Err(e) => {
                    let outcome = self.load_surface(hemisphere, mesh, None);
                    self.report(e.clone().into());
                    outcome.and(Err(e.into()))
                }
            },
            LoadedEntity::Estimate { hemisphere, estimate } => self.load_estimate(hemisphere, estimate),
        }
    }

    /// Check the estimate against the mesh and hand the result to the manager
    fn revalidate_estimate(&mut self, hemisphere: Hemisphere) -> EngineResult<()> {
        let slot = &mut self.hemispheres[hemisphere.index()];
        let mismatch = match (&slot.mesh, &slot.estimate) {
            (Some(mesh), Some(estimate)) if mesh.vertex_count() != estimate.vertex_count() => {
                Some(DataIntegrityError::VertexCountMismatch {
                    hemisphere,
                    mesh: mesh.vertex_count(),
                    estimate: estimate.vertex_count(),
                })
            }
            _ => None,
        };

        let was_suspended = slot.suspended.is_some();
        slot.suspended = mismatch.clone();
        let active = slot.active_estimate().cloned();
        self.activation.replace_estimate(hemisphere, active);
        self.rebuild_axis();

        match mismatch {
            Some(e) => {
                self.report(e.clone().into());
                Err(e.into())
            }
            None => {
                if was_suspended {
                    log::info!("revalidate_estimate: {} activation resumed", hemisphere);
                }
                Ok(())
            }
        }
    }

    fn rebuild_axis(&mut self) {
        let left = self.hemispheres[0].active_estimate().map(|e| e.timestamps());
        let right = self.hemispheres[1].active_estimate().map(|e| e.timestamps());
        let raw = self.recording.as_ref().map(|r| r.timebase());
        self.axis = TimeAxis::new(left, right, raw);
        self.bus.set_domain(self.axis.domain());
    }

    fn report(&mut self, error: EngineError) {
        log::warn!("Session: {}", error);
        self.reports.push(error);
    }

    /// Drain errors recorded since the last call
    ///
    /// Every load-time error appears here exactly once.
    pub fn take_reports(&mut self) -> Vec<EngineError> {
        std::mem::take(&mut self.reports)
    }

    // ─────────────────────────────────────────────────────────────
    // Per frame
    // ─────────────────────────────────────────────────────────────

    /// Poll the host's view state (takes effect on the next frame)
    pub fn set_view(&mut self, view: ViewConfig) {
        if view.aggregation != self.view.aggregation {
            for slot in &mut self.hemispheres {
                slot.butterfly = slot
                    .estimate
                    .as_ref()
                    .map(|e| ButterflyTrace::compute(e, view.aggregation));
            }
        }
        self.view = view;
    }

    /// Queue a view-originated time command
    pub fn submit(&mut self, command: ClockCommand) {
        self.bus.submit(command);
    }

    /// Run one frame: pump the bus, resolve the time, prepare slices
    pub fn advance_frame(&mut self, elapsed: f64) -> FrameInfo {
        self.frame += 1;
        let broadcasts = self.bus.pump(elapsed);
        let update = self.bus.current();
        let resolution = self.axis.resolve(update.time);
        self.activation.prepare_frame(update.time, self.view.mode);

        FrameInfo {
            frame: self.frame,
            update,
            resolution,
            view: self.view,
            broadcasts,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn view(&self) -> ViewConfig {
        self.view
    }

    pub fn axis(&self) -> &TimeAxis {
        &self.axis
    }

    pub fn bus(&self) -> &SyncBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SyncBus {
        &mut self.bus
    }

    pub fn activation(&self) -> &ActivationManager {
        &self.activation
    }

    pub fn mesh(&self, hemisphere: Hemisphere) -> Option<&Shared<SurfaceMesh>> {
        self.hemispheres[hemisphere.index()].mesh.as_ref()
    }

    pub fn mesh_generation(&self, hemisphere: Hemisphere) -> Generation {
        self.hemispheres[hemisphere.index()].mesh_generation
    }

    pub fn atlas(&self, hemisphere: Hemisphere) -> Option<&Shared<AtlasLabeling>> {
        self.hemispheres[hemisphere.index()].atlas.as_ref()
    }

    pub fn atlas_generation(&self, hemisphere: Hemisphere) -> Generation {
        self.hemispheres[hemisphere.index()].atlas_generation
    }

    /// Loaded estimate, including a suspended one
    pub fn estimate(&self, hemisphere: Hemisphere) -> Option<&Shared<SourceEstimate>> {
        self.hemispheres[hemisphere.index()].estimate.as_ref()
    }

    /// Butterfly aggregate of the active estimate, `None` while suspended
    pub fn butterfly(&self, hemisphere: Hemisphere) -> Option<&ButterflyTrace> {
        let slot = &self.hemispheres[hemisphere.index()];
        slot.active_estimate().and(slot.butterfly.as_ref())
    }

    /// Integrity error currently suspending the hemisphere's activation
    pub fn suspension(&self, hemisphere: Hemisphere) -> Option<&DataIntegrityError> {
        self.hemispheres[hemisphere.index()].suspended.as_ref()
    }

    pub fn recording(&self) -> Option<&Shared<RawRecording>> {
        self.recording.as_ref()
    }

    pub fn recording_generation(&self) -> Generation {
        self.recording_generation
    }
}
