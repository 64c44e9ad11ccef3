//! Trace browser render adapters
//!
//! Both browsers show a time window of fixed pixel width and a cursor at the
//! broadcast time. Adapters decimate data to at most one min/max pair per
//! pixel column; the canvas programs in `canvas` draw the result and turn
//! clicks into seek times via [`TraceWindow::time_at`].
//!
//! ## Usage
//!
//! ```ignore
//! let window = TraceWindow::centered_on(time, 10.0, 1200);
//! let raw_view = raw_adapter.render(&recording, &window, time);
//! raw_trace_browser(&raw_view, |t| Message::Clock(ClockCommand::ScrubTo(t)))
//! ```
//!
//! A seek never moves the window or the cursor by itself: the host routes it
//! through the session's bus and renders the next frame from the broadcast.

mod canvas;
mod peaks;
mod raw;
mod source;

pub use canvas::{raw_trace_browser, source_trace_browser, SeekInteraction, TraceCanvas, TraceDraw};
pub use peaks::{timed_peaks, uniform_peaks, TracePoint};
pub use raw::{ChannelTrace, RawBrowserAdapter, RawTraceView, DEFAULT_VISIBLE_CHANNELS};
pub use source::{SourceBrowserAdapter, SourceTraceView, TraceLine};

use cortex_core::TimeDomain;

/// Default browser width in pixel columns
pub const DEFAULT_WIDTH: usize = 800;

/// Visible time window of a browser
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceWindow {
    /// Time at the left edge (seconds)
    pub start: f64,
    /// Visible span (seconds)
    pub duration: f64,
    /// Width in pixel columns
    pub width: usize,
}

impl TraceWindow {
    pub fn new(start: f64, duration: f64, width: usize) -> Self {
        Self {
            start,
            duration: if duration.is_finite() && duration > 0.0 { duration } else { 1.0 },
            width: width.max(1),
        }
    }

    /// Window of `duration` seconds with `time` in the middle
    pub fn centered_on(time: f64, duration: f64, width: usize) -> Self {
        let window = Self::new(0.0, duration, width);
        Self {
            start: time - window.duration / 2.0,
            ..window
        }
    }

    /// Window covering a whole domain
    pub fn covering(domain: TimeDomain, width: usize) -> Self {
        Self::new(domain.t_min, domain.duration(), width)
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn seconds_per_column(&self) -> f64 {
        self.duration / self.width as f64
    }

    /// Column position of a time (may lie outside `[0, width]`)
    pub fn column_of(&self, t: f64) -> f32 {
        ((t - self.start) / self.duration * self.width as f64) as f32
    }

    /// Column of a time inside the window, `None` outside
    pub fn x_of(&self, t: f64) -> Option<f32> {
        (t >= self.start && t <= self.end()).then(|| self.column_of(t))
    }

    /// Time under a column position, clamped to the window
    pub fn time_at(&self, x: f32) -> f64 {
        let fraction = (x as f64 / self.width as f64).clamp(0.0, 1.0);
        self.start + fraction * self.duration
    }

    /// Time bounds of one column
    pub fn column_bounds(&self, column: usize) -> (f64, f64) {
        let spc = self.seconds_per_column();
        (self.start + column as f64 * spc, self.start + (column + 1) as f64 * spc)
    }
}

/// Vertical range for drawing a set of `(min, max)` extents
///
/// Any positive span is kept as-is, since sensor data in Tesla spans about
/// 1e-12. A flat trace is padded by its own magnitude (or 1 at zero); no data
/// at all gives `(-1, 1)`.
pub(crate) fn drawable_range(extents: impl IntoIterator<Item = (f32, f32)>) -> (f32, f32) {
    let (min, max) = extents
        .into_iter()
        .filter(|(lo, hi)| lo.is_finite() && hi.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), (a, b)| (lo.min(a), hi.max(b)));
    if min > max {
        return (-1.0, 1.0);
    }
    if max - min > 0.0 {
        return (min, max);
    }
    let pad = if min == 0.0 { 1.0 } else { min.abs() };
    (min - pad, max + pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_at_maps_columns() {
        let window = TraceWindow::new(2.0, 4.0, 400);
        assert_eq!(window.time_at(0.0), 2.0);
        assert_eq!(window.time_at(200.0), 4.0);
        assert_eq!(window.time_at(400.0), 6.0);
        // Clicks past the edges clamp
        assert_eq!(window.time_at(-20.0), 2.0);
        assert_eq!(window.time_at(900.0), 6.0);
    }

    #[test]
    fn test_x_of_inside_only() {
        let window = TraceWindow::new(0.0, 1.0, 100);
        assert_eq!(window.x_of(0.25), Some(25.0));
        assert_eq!(window.x_of(1.5), None);
        assert_eq!(window.column_of(1.5), 150.0);
    }

    #[test]
    fn test_centered_window() {
        let window = TraceWindow::centered_on(10.0, 4.0, 800);
        assert_eq!(window.start, 8.0);
        assert_eq!(window.end(), 12.0);
        assert_eq!(window.x_of(10.0), Some(400.0));
    }

    #[test]
    fn test_degenerate_window_is_sanitized() {
        let window = TraceWindow::new(0.0, 0.0, 0);
        assert_eq!(window.duration, 1.0);
        assert_eq!(window.width, 1);
        assert_eq!(TraceWindow::covering(TimeDomain::EMPTY, 10).duration, 1.0);
    }

    #[test]
    fn test_drawable_range() {
        assert_eq!(drawable_range([(-2.0, 1.0), (0.0, 3.0)]), (-2.0, 3.0));
        assert_eq!(drawable_range([(0.0, 0.0)]), (-1.0, 1.0));
        assert_eq!(drawable_range([(2.0, 2.0)]), (0.0, 4.0));
        assert_eq!(drawable_range(std::iter::empty()), (-1.0, 1.0));
        // Tesla-scale spans are kept
        assert_eq!(drawable_range([(-1e-12, 1e-12)]), (-1e-12, 1e-12));
    }
}
