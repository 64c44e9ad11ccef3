//! Immutable data entities handed to the engine by loader collaborators
//!
//! - `SurfaceMesh`: triangulated hemisphere surface
//! - `AtlasLabeling`: vertex → region partition with display colours
//! - `SourceEstimate`: per-vertex activation over time
//! - `RawRecording`: multichannel sensor samples at a fixed rate
//!
//! Constructors validate each entity on its own. Cross-entity checks (estimate
//! vertex count against its mesh, atlas coverage) happen when the session
//! accepts a load.

mod atlas;
mod estimate;
mod mesh;
mod recording;

pub use atlas::{AtlasLabeling, Region};
pub use estimate::SourceEstimate;
pub use mesh::{compute_vertex_normals, SurfaceMesh};
pub use recording::{ChannelInfo, RawRecording};
