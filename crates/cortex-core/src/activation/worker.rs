//! Background slice computation
//!
//! Interpolating tens of thousands of vertices can exceed the time left in a
//! frame once rendering is accounted for. The `SliceWorker` moves that work
//! off the render thread:
//!
//! 1. The manager sends a `SliceRequest` carrying a `Shared` handle to the
//!    estimate and a recycled output buffer
//! 2. The worker interpolates into the buffer (rayon above the threshold)
//! 3. The manager waits for results up to the frame budget, and otherwise
//!    keeps showing the previous slice
//!
//! Requests and results carry the slot generation. On reload the manager
//! raises the hemisphere's current generation through [`SliceWorker::supersede`];
//! queued requests below it are skipped without being computed, and any
//! result that still slips through is dropped by the manager.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use basedrop::Shared;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};

use super::interpolate::interpolate_into;
use crate::data::SourceEstimate;
use crate::timeline::SourcePosition;
use crate::types::{Generation, Hemisphere, NUM_HEMISPHERES};

/// Slice to compute on the worker thread
pub struct SliceRequest {
    pub hemisphere: Hemisphere,
    pub generation: Generation,
    pub time: f64,
    pub position: SourcePosition,
    pub estimate: Shared<SourceEstimate>,
    /// Output storage, resized by the worker if needed
    pub buffer: Vec<f32>,
    pub parallel_threshold: usize,
}

impl std::fmt::Debug for SliceRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SliceRequest")
            .field("hemisphere", &self.hemisphere)
            .field("generation", &self.generation)
            .field("time", &self.time)
            .field("position", &self.position)
            .field(
                "estimate",
                &format!("<Shared<SourceEstimate> {} vertices>", self.estimate.vertex_count()),
            )
            .field("buffer_len", &self.buffer.len())
            .finish()
    }
}

/// Computed slice returned by the worker
#[derive(Debug, Clone, PartialEq)]
pub struct SliceResult {
    pub hemisphere: Hemisphere,
    pub generation: Generation,
    pub time: f64,
    pub values: Vec<f32>,
}

/// Handle to the slice worker thread
///
/// Dropping the handle closes the request channel and the thread exits after
/// its current request.
pub struct SliceWorker {
    tx: Sender<SliceRequest>,
    rx: Receiver<SliceResult>,
    /// Lowest generation still worth computing, per hemisphere
    current: Arc<[AtomicU64; NUM_HEMISPHERES]>,
    _handle: JoinHandle<()>,
}

impl SliceWorker {
    /// Spawn the worker thread
    pub fn spawn() -> std::io::Result<Self> {
        let (request_tx, request_rx) = channel::unbounded::<SliceRequest>();
        let (result_tx, result_rx) = channel::unbounded::<SliceResult>();
        let current = Arc::new([AtomicU64::new(0), AtomicU64::new(0)]);
        let thread_current = Arc::clone(&current);

        let handle = thread::Builder::new()
            .name("slice-worker".to_string())
            .spawn(move || slice_thread(request_rx, result_tx, thread_current))?;

        log::info!("SliceWorker::spawn: background slice thread started");

        Ok(Self {
            tx: request_tx,
            rx: result_rx,
            current,
            _handle: handle,
        })
    }

    /// Cancel queued requests for `hemisphere` older than `generation`
    pub fn supersede(&self, hemisphere: Hemisphere, generation: Generation) {
        self.current[hemisphere.index()].fetch_max(generation.value(), Ordering::AcqRel);
    }

    /// Queue a request (non-blocking)
    ///
    /// Gives the request back if the worker thread is gone.
    pub fn submit(&self, request: SliceRequest) -> Result<(), SliceRequest> {
        self.tx.send(request).map_err(|e| e.into_inner())
    }

    /// Take a finished result if one is waiting
    pub fn try_recv(&self) -> Option<SliceResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::error!("SliceWorker::try_recv: worker thread disconnected");
                None
            }
        }
    }

    /// Wait for a result until `deadline`
    pub fn recv_deadline(&self, deadline: Instant) -> Option<SliceResult> {
        match self.rx.recv_deadline(deadline) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                log::error!("SliceWorker::recv_deadline: worker thread disconnected");
                None
            }
        }
    }
}

fn slice_thread(rx: Receiver<SliceRequest>, tx: Sender<SliceResult>, current: Arc<[AtomicU64; NUM_HEMISPHERES]>) {
    log::debug!("slice_thread: starting");

    while let Ok(request) = rx.recv() {
        let started = Instant::now();
        let SliceRequest {
            hemisphere,
            generation,
            time,
            position,
            estimate,
            mut buffer,
            parallel_threshold,
        } = request;

        if generation.value() < current[hemisphere.index()].load(Ordering::Acquire) {
            log::debug!(
                "slice_thread: skipping {} request from superseded generation {}",
                hemisphere,
                generation.value()
            );
            continue;
        }

        buffer.resize(estimate.vertex_count(), 0.0);
        interpolate_into(&estimate, position, &mut buffer, parallel_threshold);
        drop(estimate);

        log::debug!(
            "slice_thread: {} t={:.4}s {} vertices in {:?}",
            hemisphere,
            time,
            buffer.len(),
            started.elapsed()
        );

        let result = SliceResult {
            hemisphere,
            generation,
            time,
            values: buffer,
        };
        if tx.send(result).is_err() {
            break;
        }
    }

    log::debug!("slice_thread: exiting");
}
