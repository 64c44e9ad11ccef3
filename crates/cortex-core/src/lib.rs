//! Cortex Core - time-locked playback engine for cortical views
//!
//! One playback clock drives every view of a session: the 3D surfaces of both
//! hemispheres (activation or atlas colouring), the raw sensor trace browser
//! and the source-estimate trace browser. All of them show the same instant
//! on every frame.
//!
//! ## Frame sequence
//!
//! ```text
//! Session::advance_frame(elapsed)
//!   ├─ SyncBus::pump        view commands → clock → one broadcast per change
//!   ├─ TimeAxis::resolve    virtual time → estimate brackets / raw sample
//!   └─ ActivationManager    interpolated slices, double-buffered per hemisphere
//! ```
//!
//! Renderers then read the front slice buffers and the broadcast time; they
//! never fetch time on their own.

pub mod activation;
pub mod aggregate;
pub mod clock;
pub mod config;
pub mod data;
pub mod error;
pub mod gc;
pub mod loader;
pub mod session;
pub mod sync;
pub mod timeline;
pub mod types;
pub mod view;

pub use types::*;

pub use error::{DataIntegrityError, EngineError, EngineResult, LoadError, ResourceExhaustionError};
pub use session::{FrameInfo, Session};
pub use timeline::{RawPosition, Resolution, SourcePosition, TimeAxis, TimeDomain};
pub use view::{Aggregation, Normalization, ViewConfig, ViewMode};
