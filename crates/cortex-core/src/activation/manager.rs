//! Activation buffer manager
//!
//! Owns the per-hemisphere source estimates and their ping-pong slice buffers,
//! and prepares the slice for the broadcast time once per frame.
//!
//! ## Frame contract
//!
//! `prepare_frame(t, mode)` is called once per frame after the bus has
//! broadcast `t`. On return, each hemisphere's front slot holds either the
//! slice for `t` or, when the frame budget ran out, the previous slice
//! (stale-frame policy). It never blocks longer than the configured budget.
//!
//! ## Reload
//!
//! `replace_estimate` / `replace_mesh` bump the hemisphere's generation and
//! reset its buffers to neutral. Queued worker requests for the old
//! generation are cancelled, and results already computed for it are dropped
//! when they arrive. The worker keeps its own `Shared`
//! handle to the old estimate, so an in-flight computation finishes against
//! the data it started with.

use std::time::Instant;

use basedrop::Shared;

use super::buffers::{SliceBuffers, SliceSlot};
use super::interpolate::interpolate_into;
use super::worker::{SliceRequest, SliceResult, SliceWorker};
use crate::config::{ActivationConfig, SchedulingMode};
use crate::data::SourceEstimate;
use crate::timeline::bracket;
use crate::types::{Generation, Hemisphere, NEUTRAL_ACTIVATION, NUM_HEMISPHERES};
use crate::view::ViewMode;

/// Counters for diagnosing frame pacing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Slices computed and published
    pub computed: u64,
    /// Hemisphere-frames whose front slot already matched the time
    pub reused: u64,
    /// Hemisphere-frames that kept the previous slice because the budget ran out
    pub held_stale: u64,
    /// Frames in atlas mode, where no slice work is done
    pub skipped: u64,
    /// Worker results dropped because their generation was superseded
    pub discarded: u64,
}

struct HemisphereState {
    mesh_vertices: Option<usize>,
    estimate: Option<Shared<SourceEstimate>>,
    generation: Generation,
    buffers: SliceBuffers,
    /// Time of the request currently on the worker
    in_flight: Option<f64>,
}

impl HemisphereState {
    fn new() -> Self {
        Self {
            mesh_vertices: None,
            estimate: None,
            generation: Generation::INITIAL,
            buffers: SliceBuffers::new(0, Generation::INITIAL),
            in_flight: None,
        }
    }

    fn slice_len(&self) -> usize {
        match &self.estimate {
            Some(estimate) => estimate.vertex_count(),
            None => self.mesh_vertices.unwrap_or(0),
        }
    }

    fn bump(&mut self) {
        self.generation = self.generation.next();
        self.in_flight = None;
        let len = self.slice_len();
        self.buffers.reset(len, self.generation);
    }

    fn is_current(&self, t: f64) -> bool {
        let front = self.buffers.front();
        front.generation == self.generation && front.time == Some(t)
    }
}

/// Produces per-vertex activation slices for both hemispheres
pub struct ActivationManager {
    hemispheres: [HemisphereState; NUM_HEMISPHERES],
    config: ActivationConfig,
    worker: Option<SliceWorker>,
    stats: FrameStats,
}

impl ActivationManager {
    /// Create a manager, spawning the slice worker in background mode
    ///
    /// If the worker thread cannot be spawned, slices are computed inline.
    pub fn new(config: ActivationConfig) -> Self {
        let worker = match config.scheduling {
            SchedulingMode::Inline => None,
            SchedulingMode::Background => match SliceWorker::spawn() {
                Ok(worker) => Some(worker),
                Err(e) => {
                    log::warn!("ActivationManager::new: slice worker unavailable ({}), computing inline", e);
                    None
                }
            },
        };

        Self {
            hemispheres: [HemisphereState::new(), HemisphereState::new()],
            config,
            worker,
            stats: FrameStats::default(),
        }
    }

    /// Set (or clear) the vertex count of a hemisphere's mesh
    ///
    /// Without an estimate, the hemisphere's slice is neutral of this length.
    pub fn replace_mesh(&mut self, hemisphere: Hemisphere, vertex_count: Option<usize>) {
        let state = &mut self.hemispheres[hemisphere.index()];
        state.mesh_vertices = vertex_count;
        state.bump();
        if let Some(worker) = &self.worker {
            worker.supersede(hemisphere, state.generation);
        }
        log::info!(
            "replace_mesh: {} mesh {:?} vertices, generation {}",
            hemisphere,
            vertex_count,
            state.generation.value()
        );
    }

    /// Install (or clear) a hemisphere's validated estimate
    pub fn replace_estimate(&mut self, hemisphere: Hemisphere, estimate: Option<Shared<SourceEstimate>>) {
        let state = &mut self.hemispheres[hemisphere.index()];
        state.estimate = estimate;
        state.bump();
        if let Some(worker) = &self.worker {
            worker.supersede(hemisphere, state.generation);
        }
        log::info!(
            "replace_estimate: {} estimate {}, generation {}",
            hemisphere,
            if state.estimate.is_some() { "installed" } else { "cleared" },
            state.generation.value()
        );
    }

    /// Compute a slice synchronously
    ///
    /// Sized to the hemisphere's vertex count; all neutral when the hemisphere
    /// has no estimate or `t` is outside its range. Never fails.
    pub fn request_slice(&self, hemisphere: Hemisphere, t: f64) -> Vec<f32> {
        let state = &self.hemispheres[hemisphere.index()];
        let mut out = vec![NEUTRAL_ACTIVATION; state.slice_len()];
        if let Some(estimate) = &state.estimate {
            let position = bracket(estimate.timestamps(), t);
            interpolate_into(estimate, position, &mut out, self.config.parallel_vertex_threshold);
        }
        out
    }

    /// Prepare the front slots for the frame showing time `t`
    pub fn prepare_frame(&mut self, t: f64, mode: ViewMode) {
        if mode == ViewMode::Atlas {
            self.stats.skipped += 1;
            return;
        }

        if self.worker.is_some() {
            self.prepare_background(t);
        } else {
            self.prepare_inline(t);
        }
    }

    fn prepare_inline(&mut self, t: f64) {
        let threshold = self.config.parallel_vertex_threshold;
        for state in &mut self.hemispheres {
            let Some(estimate) = &state.estimate else {
                continue;
            };
            if state.is_current(t) {
                self.stats.reused += 1;
                continue;
            }

            let mut values = std::mem::take(&mut state.buffers.back_mut().values);
            values.resize(estimate.vertex_count(), NEUTRAL_ACTIVATION);
            interpolate_into(estimate, bracket(estimate.timestamps(), t), &mut values, threshold);
            state.buffers.publish(values, state.generation, t);
            self.stats.computed += 1;
        }
    }

    fn prepare_background(&mut self, t: f64) {
        let now = Instant::now();
        let deadline = now.checked_add(self.config.frame_budget()).unwrap_or(now);

        // Results that finished since the last frame
        while let Some(result) = self.worker.as_ref().and_then(SliceWorker::try_recv) {
            self.apply_result(result);
        }

        for hemisphere in Hemisphere::ALL {
            let state = &self.hemispheres[hemisphere.index()];
            if state.estimate.is_some() && state.is_current(t) {
                self.stats.reused += 1;
            }
        }
        self.submit_missing(t);

        loop {
            let waiting = self
                .hemispheres
                .iter()
                .any(|s| s.in_flight.is_some() && !s.is_current(t));
            if !waiting {
                break;
            }
            let Some(result) = self.worker.as_ref().and_then(|w| w.recv_deadline(deadline)) else {
                break;
            };
            self.apply_result(result);
            self.submit_missing(t);
        }

        for state in &self.hemispheres {
            if state.estimate.is_some() && !state.is_current(t) {
                self.stats.held_stale += 1;
            }
        }
    }

    /// Send a request for every hemisphere that needs `t` and has nothing in flight
    fn submit_missing(&mut self, t: f64) {
        let Some(worker) = &self.worker else {
            return;
        };
        let mut disconnected = false;

        for (idx, state) in self.hemispheres.iter_mut().enumerate() {
            if state.in_flight.is_some() || state.is_current(t) {
                continue;
            }
            let Some(estimate) = &state.estimate else {
                continue;
            };
            let Some(hemisphere) = Hemisphere::from_index(idx) else {
                continue;
            };

            let request = SliceRequest {
                hemisphere,
                generation: state.generation,
                time: t,
                position: bracket(estimate.timestamps(), t),
                estimate: estimate.clone(),
                buffer: std::mem::take(&mut state.buffers.back_mut().values),
                parallel_threshold: self.config.parallel_vertex_threshold,
            };
            match worker.submit(request) {
                Ok(()) => state.in_flight = Some(t),
                Err(request) => {
                    state.buffers.back_mut().values = request.buffer;
                    disconnected = true;
                }
            }
        }

        if disconnected {
            log::error!("submit_missing: slice worker gone, switching to inline computation");
            self.worker = None;
            self.prepare_inline(t);
        }
    }

    /// Publish a worker result if it still belongs to the current generation
    fn apply_result(&mut self, result: SliceResult) -> bool {
        let state = &mut self.hemispheres[result.hemisphere.index()];
        if result.generation != state.generation {
            log::debug!(
                "apply_result: dropping {} slice from generation {} (current {})",
                result.hemisphere,
                result.generation.value(),
                state.generation.value()
            );
            self.stats.discarded += 1;
            return false;
        }

        state.in_flight = None;
        // The back storage was lent to the worker; the returned buffer takes its place
        state.buffers.publish(result.values, result.generation, result.time);
        self.stats.computed += 1;
        true
    }

    /// Front slot read by the renderer
    pub fn front(&self, hemisphere: Hemisphere) -> &SliceSlot {
        self.hemispheres[hemisphere.index()].buffers.front()
    }

    /// Current front values of a hemisphere
    pub fn slice(&self, hemisphere: Hemisphere) -> &[f32] {
        &self.front(hemisphere).values
    }

    /// Parity bit of the hemisphere's front slot
    pub fn parity(&self, hemisphere: Hemisphere) -> usize {
        self.hemispheres[hemisphere.index()].buffers.parity()
    }

    pub fn generation(&self, hemisphere: Hemisphere) -> Generation {
        self.hemispheres[hemisphere.index()].generation
    }

    pub fn estimate(&self, hemisphere: Hemisphere) -> Option<&Shared<SourceEstimate>> {
        self.hemispheres[hemisphere.index()].estimate.as_ref()
    }

    /// Union of the loaded estimates' value ranges, `(0, 0)` if none
    pub fn value_range(&self) -> (f32, f32) {
        self.hemispheres
            .iter()
            .filter_map(|s| s.estimate.as_ref().map(|e| e.value_range()))
            .reduce(|a, b| (a.0.min(b.0), a.1.max(b.1)))
            .unwrap_or((0.0, 0.0))
    }

    pub fn is_background(&self) -> bool {
        self.worker.is_some()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gc::gc_handle;
    use std::time::Duration;

    fn inline_config() -> ActivationConfig {
        ActivationConfig {
            scheduling: SchedulingMode::Inline,
            ..ActivationConfig::default()
        }
    }

    fn ramp(vertices: usize) -> Shared<SourceEstimate> {
        let estimate = SourceEstimate::from_rows(vec![0.0, 1.0], vec![vec![0.0, 10.0]; vertices]).unwrap();
        Shared::new(&gc_handle(), estimate)
    }

    #[test]
    fn test_request_slice_interpolates() {
        let mut manager = ActivationManager::new(inline_config());
        manager.replace_mesh(Hemisphere::Left, Some(2));
        manager.replace_estimate(Hemisphere::Left, Some(ramp(2)));
        assert_eq!(manager.request_slice(Hemisphere::Left, 0.5), vec![5.0, 5.0]);
    }

    #[test]
    fn test_missing_hemisphere_is_neutral_of_mesh_size() {
        let mut manager = ActivationManager::new(inline_config());
        manager.replace_mesh(Hemisphere::Left, Some(4));
        manager.replace_mesh(Hemisphere::Right, Some(2));
        manager.replace_estimate(Hemisphere::Right, Some(ramp(2)));

        let left = manager.request_slice(Hemisphere::Left, 0.5);
        assert_eq!(left, vec![NEUTRAL_ACTIVATION; 4]);

        manager.prepare_frame(0.5, ViewMode::Activation);
        assert_eq!(manager.slice(Hemisphere::Left), &[NEUTRAL_ACTIVATION; 4]);
        assert_eq!(manager.slice(Hemisphere::Right), &[5.0, 5.0]);
    }

    #[test]
    fn test_hemisphere_without_anything_is_empty() {
        let manager = ActivationManager::new(inline_config());
        assert!(manager.request_slice(Hemisphere::Right, 0.0).is_empty());
    }

    #[test]
    fn test_inline_frame_swaps_parity() {
        let mut manager = ActivationManager::new(inline_config());
        manager.replace_estimate(Hemisphere::Left, Some(ramp(3)));
        let parity = manager.parity(Hemisphere::Left);

        manager.prepare_frame(0.25, ViewMode::Activation);
        assert_ne!(manager.parity(Hemisphere::Left), parity);
        assert_eq!(manager.front(Hemisphere::Left).time, Some(0.25));
        assert_eq!(manager.slice(Hemisphere::Left), &[2.5; 3]);

        // Same time again reuses the published slice
        manager.prepare_frame(0.25, ViewMode::Activation);
        assert_eq!(manager.stats().computed, 1);
        assert_eq!(manager.stats().reused, 1);
    }

    #[test]
    fn test_atlas_mode_skips_slice_work() {
        let mut manager = ActivationManager::new(inline_config());
        manager.replace_estimate(Hemisphere::Left, Some(ramp(3)));
        manager.prepare_frame(0.5, ViewMode::Atlas);

        let stats = manager.stats();
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.computed, 0);
        assert_eq!(manager.front(Hemisphere::Left).time, None);
    }

    #[test]
    fn test_out_of_range_time_is_neutral() {
        let mut manager = ActivationManager::new(inline_config());
        manager.replace_estimate(Hemisphere::Left, Some(ramp(2)));
        manager.prepare_frame(3.0, ViewMode::Activation);
        assert_eq!(manager.slice(Hemisphere::Left), &[NEUTRAL_ACTIVATION; 2]);
    }

    #[test]
    fn test_superseded_result_is_discarded() {
        let mut manager = ActivationManager::new(inline_config());
        manager.replace_estimate(Hemisphere::Left, Some(ramp(2)));
        let old = manager.generation(Hemisphere::Left);

        // Reload while a result for the old generation is still out
        manager.replace_estimate(Hemisphere::Left, Some(ramp(3)));
        let applied = manager.apply_result(SliceResult {
            hemisphere: Hemisphere::Left,
            generation: old,
            time: 0.5,
            values: vec![5.0, 5.0],
        });

        assert!(!applied);
        assert_eq!(manager.stats().discarded, 1);
        assert_eq!(manager.slice(Hemisphere::Left), &[NEUTRAL_ACTIVATION; 3]);
    }

    #[test]
    fn test_value_range_spans_hemispheres() {
        let mut manager = ActivationManager::new(inline_config());
        let rh = SourceEstimate::from_rows(vec![0.0, 1.0], vec![vec![-4.0, 1.0]]).unwrap();
        manager.replace_estimate(Hemisphere::Left, Some(ramp(1)));
        manager.replace_estimate(Hemisphere::Right, Some(Shared::new(&gc_handle(), rh)));
        assert_eq!(manager.value_range(), (-4.0, 10.0));
    }

    #[test]
    fn test_background_holds_stale_then_catches_up() {
        let config = ActivationConfig {
            scheduling: SchedulingMode::Background,
            frame_budget_ms: 0.0,
            parallel_vertex_threshold: usize::MAX,
        };
        let mut manager = ActivationManager::new(config);
        assert!(manager.is_background());
        manager.replace_estimate(Hemisphere::Left, Some(ramp(200_000)));

        manager.prepare_frame(0.5, ViewMode::Activation);
        let stats = manager.stats();
        assert_eq!(stats.computed + stats.held_stale, 1);
        if stats.held_stale == 1 {
            // Previous (neutral) slice stays visible
            assert_eq!(manager.front(Hemisphere::Left).time, None);
            assert!(manager.slice(Hemisphere::Left).iter().all(|&v| v == NEUTRAL_ACTIVATION));
        }

        let give_up = Instant::now() + Duration::from_secs(10);
        while manager.front(Hemisphere::Left).time != Some(0.5) && Instant::now() < give_up {
            std::thread::sleep(Duration::from_millis(1));
            manager.prepare_frame(0.5, ViewMode::Activation);
        }
        assert_eq!(manager.front(Hemisphere::Left).time, Some(0.5));
        assert_eq!(manager.slice(Hemisphere::Left)[199_999], 5.0);
    }

    #[test]
    fn test_background_reload_drops_in_flight_result() {
        let config = ActivationConfig {
            scheduling: SchedulingMode::Background,
            frame_budget_ms: 0.0,
            parallel_vertex_threshold: usize::MAX,
        };
        let mut manager = ActivationManager::new(config);
        manager.replace_estimate(Hemisphere::Left, Some(ramp(50_000)));
        manager.prepare_frame(0.5, ViewMode::Activation);

        manager.replace_estimate(Hemisphere::Left, Some(ramp(7)));
        let give_up = Instant::now() + Duration::from_secs(10);
        while manager.front(Hemisphere::Left).time != Some(0.5) && Instant::now() < give_up {
            std::thread::sleep(Duration::from_millis(1));
            manager.prepare_frame(0.5, ViewMode::Activation);
        }

        // Only the new generation's slice is ever published
        assert_eq!(manager.slice(Hemisphere::Left), &[5.0; 7]);
        assert_eq!(manager.front(Hemisphere::Left).generation, manager.generation(Hemisphere::Left));
    }
}
