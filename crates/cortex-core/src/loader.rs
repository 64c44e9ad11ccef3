//! Loader collaborators and the background loader thread
//!
//! File formats are owned by the host: it implements the source traits below
//! and the engine only ever receives complete, individually validated
//! entities. [`BackgroundLoader`] runs the sources off the render thread.
//!
//! ## Superseded loads
//!
//! Every request is tagged with a per-slot generation. If a newer request for
//! the same slot (say, the RH estimate) is issued before an older one
//! finishes, the older result is dropped by [`BackgroundLoader::try_recv`]
//! and never reaches the session.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::data::{AtlasLabeling, RawRecording, SourceEstimate, SurfaceMesh};
use crate::error::LoadError;
use crate::types::{EntityKind, Generation, Hemisphere};

/// Supplies the raw sensor recording
pub trait RecordingSource: Send + Sync {
    fn load_recording(&self) -> Result<RawRecording, LoadError>;
}

/// Supplies hemisphere surfaces and their optional atlas
pub trait SurfaceSource: Send + Sync {
    fn load_surface(&self, hemisphere: Hemisphere) -> Result<SurfaceMesh, LoadError>;

    /// `Ok(None)` when no atlas is available for the hemisphere
    fn load_atlas(&self, hemisphere: Hemisphere) -> Result<Option<AtlasLabeling>, LoadError>;
}

/// Supplies per-hemisphere source estimates
pub trait EstimateSource: Send + Sync {
    fn load_estimate(&self, hemisphere: Hemisphere) -> Result<SourceEstimate, LoadError>;
}

/// Independent load slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadSlot {
    Recording,
    /// Mesh and atlas of one hemisphere
    Surface(Hemisphere),
    Estimate(Hemisphere),
}

impl LoadSlot {
    const COUNT: usize = 5;

    fn index(self) -> usize {
        match self {
            LoadSlot::Recording => 0,
            LoadSlot::Surface(h) => 1 + h.index(),
            LoadSlot::Estimate(h) => 3 + h.index(),
        }
    }

    /// Entity reported when the slot fails to load
    pub fn entity(self) -> EntityKind {
        match self {
            LoadSlot::Recording => EntityKind::Recording,
            LoadSlot::Surface(h) => EntityKind::Surface(h),
            LoadSlot::Estimate(h) => EntityKind::Estimate(h),
        }
    }
}

/// A complete entity produced by a source
#[derive(Debug)]
pub enum LoadedEntity {
    Recording(RawRecording),
    Surface {
        hemisphere: Hemisphere,
        mesh: SurfaceMesh,
        /// Atlas failures do not fail the surface; they are reported separately
        atlas: Result<Option<AtlasLabeling>, LoadError>,
    },
    Estimate {
        hemisphere: Hemisphere,
        estimate: SourceEstimate,
    },
}

/// Outcome of one background load
#[derive(Debug)]
pub struct LoadResult {
    pub slot: LoadSlot,
    pub generation: Generation,
    pub result: Result<LoadedEntity, LoadError>,
}

enum LoadJob {
    Recording(Arc<dyn RecordingSource>),
    Surface(Hemisphere, Arc<dyn SurfaceSource>),
    Estimate(Hemisphere, Arc<dyn EstimateSource>),
}

impl LoadJob {
    fn slot(&self) -> LoadSlot {
        match self {
            LoadJob::Recording(_) => LoadSlot::Recording,
            LoadJob::Surface(h, _) => LoadSlot::Surface(*h),
            LoadJob::Estimate(h, _) => LoadSlot::Estimate(*h),
        }
    }

    fn run(self) -> Result<LoadedEntity, LoadError> {
        match self {
            LoadJob::Recording(source) => source.load_recording().map(LoadedEntity::Recording),
            LoadJob::Surface(hemisphere, source) => {
                let mesh = source.load_surface(hemisphere)?;
                let atlas = source.load_atlas(hemisphere);
                Ok(LoadedEntity::Surface { hemisphere, mesh, atlas })
            }
            LoadJob::Estimate(hemisphere, source) => source
                .load_estimate(hemisphere)
                .map(|estimate| LoadedEntity::Estimate { hemisphere, estimate }),
        }
    }
}

/// Handle to the background loader thread
pub struct BackgroundLoader {
    tx: Sender<(Generation, LoadJob)>,
    rx: Receiver<LoadResult>,
    /// Latest generation issued per slot
    latest: [Generation; LoadSlot::COUNT],
    _handle: JoinHandle<()>,
}

impl BackgroundLoader {
    pub fn spawn() -> std::io::Result<Self> {
        let (job_tx, job_rx) = channel::unbounded::<(Generation, LoadJob)>();
        let (result_tx, result_rx) = channel::unbounded::<LoadResult>();

        let handle = thread::Builder::new()
            .name("entity-loader".to_string())
            .spawn(move || loader_thread(job_rx, result_tx))?;

        log::info!("BackgroundLoader::spawn: loader thread started");

        Ok(Self {
            tx: job_tx,
            rx: result_rx,
            latest: [Generation::INITIAL; LoadSlot::COUNT],
            _handle: handle,
        })
    }

    pub fn load_recording(&mut self, source: Arc<dyn RecordingSource>) -> Result<Generation, LoadError> {
        self.submit(LoadJob::Recording(source))
    }

    pub fn load_surface(
        &mut self,
        hemisphere: Hemisphere,
        source: Arc<dyn SurfaceSource>,
    ) -> Result<Generation, LoadError> {
        self.submit(LoadJob::Surface(hemisphere, source))
    }

    pub fn load_estimate(
        &mut self,
        hemisphere: Hemisphere,
        source: Arc<dyn EstimateSource>,
    ) -> Result<Generation, LoadError> {
        self.submit(LoadJob::Estimate(hemisphere, source))
    }

    fn submit(&mut self, job: LoadJob) -> Result<Generation, LoadError> {
        let slot = job.slot();
        let generation = self.latest[slot.index()].next();
        self.tx
            .send((generation, job))
            .map_err(|_| LoadError::new(slot.entity(), "loader thread is not running"))?;
        self.latest[slot.index()] = generation;
        log::debug!("BackgroundLoader::submit: {:?} generation {}", slot, generation.value());
        Ok(generation)
    }

    fn is_current(&self, result: &LoadResult) -> bool {
        self.latest[result.slot.index()] == result.generation
    }

    /// Next current result, skipping superseded ones (non-blocking)
    pub fn try_recv(&self) -> Option<LoadResult> {
        loop {
            match self.rx.try_recv() {
                Ok(result) if self.is_current(&result) => return Some(result),
                Ok(result) => {
                    log::debug!(
                        "BackgroundLoader::try_recv: dropping superseded {:?} generation {}",
                        result.slot,
                        result.generation.value()
                    );
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    log::error!("BackgroundLoader::try_recv: loader thread disconnected");
                    return None;
                }
            }
        }
    }

    /// Wait up to `timeout` for the next current result
    pub fn recv_timeout(&self, timeout: Duration) -> Option<LoadResult> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            match self.rx.recv_deadline(deadline) {
                Ok(result) if self.is_current(&result) => return Some(result),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => {
                    log::error!("BackgroundLoader::recv_timeout: loader thread disconnected");
                    return None;
                }
            }
        }
    }
}

fn loader_thread(rx: Receiver<(Generation, LoadJob)>, tx: Sender<LoadResult>) {
    log::debug!("loader_thread: starting");

    while let Ok((generation, job)) = rx.recv() {
        let slot = job.slot();
        let started = std::time::Instant::now();
        let result = job.run();

        match &result {
            Ok(_) => log::info!("loader_thread: loaded {} in {:?}", slot.entity(), started.elapsed()),
            // The session reports the failure when it is collected
            Err(e) => log::debug!("loader_thread: {}", e),
        }

        if tx.send(LoadResult { slot, generation, result }).is_err() {
            break;
        }
    }

    log::debug!("loader_thread: exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RampEstimates {
        vertices: usize,
        calls: AtomicUsize,
    }

    impl EstimateSource for RampEstimates {
        fn load_estimate(&self, _hemisphere: Hemisphere) -> Result<SourceEstimate, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            SourceEstimate::from_rows(vec![0.0, 1.0], vec![vec![0.0, 1.0]; self.vertices])
                .map_err(|e| LoadError::new(EntityKind::Estimate(Hemisphere::Left), e.to_string()))
        }
    }

    struct MissingRecording;

    impl RecordingSource for MissingRecording {
        fn load_recording(&self) -> Result<RawRecording, LoadError> {
            Err(LoadError::new(EntityKind::Recording, "file not found"))
        }
    }

    #[test]
    fn test_loader_delivers_entity() {
        let mut loader = BackgroundLoader::spawn().unwrap();
        let source = Arc::new(RampEstimates { vertices: 3, calls: AtomicUsize::new(0) });
        loader.load_estimate(Hemisphere::Right, source).unwrap();

        let result = loader.recv_timeout(Duration::from_secs(5)).expect("load result");
        assert_eq!(result.slot, LoadSlot::Estimate(Hemisphere::Right));
        match result.result {
            Ok(LoadedEntity::Estimate { hemisphere, estimate }) => {
                assert_eq!(hemisphere, Hemisphere::Right);
                assert_eq!(estimate.vertex_count(), 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_loader_reports_failure() {
        let mut loader = BackgroundLoader::spawn().unwrap();
        loader.load_recording(Arc::new(MissingRecording)).unwrap();
        let result = loader.recv_timeout(Duration::from_secs(5)).expect("load result");
        let err = result.result.unwrap_err();
        assert_eq!(err.entity, EntityKind::Recording);
    }

    #[test]
    fn test_superseded_load_is_dropped() {
        let mut loader = BackgroundLoader::spawn().unwrap();
        let small = Arc::new(RampEstimates { vertices: 2, calls: AtomicUsize::new(0) });
        let large = Arc::new(RampEstimates { vertices: 9, calls: AtomicUsize::new(0) });
        loader.load_estimate(Hemisphere::Left, small.clone()).unwrap();
        let newest = loader.load_estimate(Hemisphere::Left, large).unwrap();

        let result = loader.recv_timeout(Duration::from_secs(5)).expect("load result");
        assert_eq!(result.generation, newest);
        match result.result {
            Ok(LoadedEntity::Estimate { estimate, .. }) => assert_eq!(estimate.vertex_count(), 9),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(loader.recv_timeout(Duration::from_millis(50)).is_none());
    }
}
