//! Render adapters for the cortex playback engine
//!
//! Everything here reads one frame's state from a `cortex_core::Session` and
//! turns it into something iced can draw. Nothing in this crate owns time:
//! seeks and scrubs come back out as messages carrying a time, which the host
//! routes through the session's bus.
//!
//! ## Architecture (iced 0.14 patterns)
//!
//! - **Adapters**: Pure data builders (`SurfaceRenderer`, `RawBrowserAdapter`,
//!   `SourceBrowserAdapter`, `ButterflyOverlay`)
//! - **View functions**: Take a built view + callbacks, return `Element<Message>`
//! - **Programs**: `shader::Program` for the 3D surface, canvas `Program`s for
//!   the 2D traces
//!
//! ## Frame Flow
//!
//! ```ignore
//! let info = session.advance_frame(elapsed);
//! let frame = renderer.build_frame(&info.view, &SurfaceInputs::from_session(&session));
//! let surface = viewport.view(&frame, Message::Surface);
//! let overlay = info.view.traces_overlay.then(|| {
//!     ButterflyOverlay::build(
//!         Hemisphere::ALL.map(|h| session.butterfly(h)),
//!         session.axis().domain(),
//!         info.update.time,
//!         OVERLAY_COLUMNS,
//!     )
//! });
//! ```

pub mod camera;
pub mod colormap;
pub mod overlay;
pub mod picking;
pub mod surface;
pub mod theme;
pub mod traces;

pub use camera::{CameraCommand, OrbitCamera};
pub use colormap::Colormap;
pub use picking::{pick, PickHit, PickedRegion, PICK_THRESHOLD};

// Surface renderer and 3D viewport
pub use surface::{
    HemisphereFill, HemisphereFrame, HemisphereInput, SurfaceEvent, SurfaceFrame, SurfaceInputs,
    SurfaceRenderer, SurfaceViewport, DEFAULT_MAX_BUFFER_SIZE,
};

// Butterfly overlay
pub use overlay::{with_butterfly_overlay, ButterflyOverlay, OverlayCurve, OVERLAY_HEIGHT};

// Trace browsers
pub use traces::{
    raw_trace_browser, source_trace_browser, RawBrowserAdapter, RawTraceView, SourceBrowserAdapter,
    SourceTraceView, TraceWindow,
};
