//! Per-vertex activation slices
//!
//! - `interpolate`: linear blend between two time samples (rayon for large meshes)
//! - `buffers`: ping-pong slot pair indexed by a parity bit
//! - `worker`: background slice thread bounded by the frame budget
//! - `manager`: per-hemisphere ownership, generations and the frame contract

mod buffers;
mod interpolate;
mod manager;
mod worker;

pub use buffers::{SliceBuffers, SliceSlot};
pub use interpolate::interpolate_into;
pub use manager::{ActivationManager, FrameStats};
pub use worker::{SliceRequest, SliceResult, SliceWorker};
