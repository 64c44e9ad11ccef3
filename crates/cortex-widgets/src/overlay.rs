//! Butterfly overlay composited over the 3D viewport
//!
//! The per-estimate aggregate is computed once at load (see
//! `cortex_core::aggregate`); this module only maps it into a unit square and
//! draws it as a strip along the bottom of the viewport. Both hemispheres
//! share the time axis of the canonical domain, each with its own vertical
//! normalisation.

use cortex_core::aggregate::ButterflyTrace;
use cortex_core::{Hemisphere, TimeDomain, NUM_HEMISPHERES};
use iced::widget::canvas::{self, Event, Frame, Geometry, Path, Program, Stroke};
use iced::widget::{column, stack, Canvas, Space};
use iced::{mouse, Color, Element, Length, Point, Rectangle, Theme};

use crate::theme::{hemisphere_color, CURSOR_COLOR};
use crate::traces::{drawable_range, SeekInteraction};

/// Height of the overlay strip
pub const OVERLAY_HEIGHT: f32 = 120.0;

/// Translucent backing behind the overlay curves
const OVERLAY_BACKING: Color = Color::from_rgba(0.0, 0.0, 0.0, 0.45);

/// One hemisphere's aggregate mapped to the unit square
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayCurve {
    pub hemisphere: Hemisphere,
    /// (x, y) in [0, 1]; y = 1 is the aggregate maximum
    pub points: Vec<(f32, f32)>,
}

/// Overlay geometry for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct ButterflyOverlay {
    pub domain: TimeDomain,
    pub curves: Vec<OverlayCurve>,
    /// Cursor position in [0, 1] along the domain
    pub cursor: f32,
}

impl ButterflyOverlay {
    /// Build the overlay at `width` pixel columns
    ///
    /// Traces denser than the strip are reduced to one point per column
    /// (first sample wins) so per-frame cost follows the strip width.
    pub fn build(
        traces: [Option<&ButterflyTrace>; NUM_HEMISPHERES],
        domain: TimeDomain,
        time: f64,
        width: usize,
    ) -> Self {
        let span = domain.duration();
        let fraction = |t: f64| {
            if span > 0.0 {
                ((t - domain.t_min) / span).clamp(0.0, 1.0) as f32
            } else {
                0.0
            }
        };

        let curves = Hemisphere::ALL
            .into_iter()
            .zip(traces)
            .filter_map(|(hemisphere, trace)| {
                let trace = trace?;
                let (lo, hi) = drawable_range([trace.range()]);
                let height = hi - lo;

                let mut points: Vec<(f32, f32)> = Vec::with_capacity(trace.values().len().min(width.max(1)));
                let mut last_column = None;
                for (&t, &v) in trace.timestamps().iter().zip(trace.values()) {
                    let x = fraction(t);
                    let column = (x * width as f32) as usize;
                    if last_column == Some(column) {
                        continue;
                    }
                    last_column = Some(column);
                    points.push((x, ((v - lo) / height).clamp(0.0, 1.0)));
                }
                Some(OverlayCurve { hemisphere, points })
            })
            .collect();

        Self {
            domain,
            curves,
            cursor: fraction(domain.clamp(time)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Time under a horizontal fraction of the strip
    pub fn time_at(&self, x: f32) -> f64 {
        self.domain.t_min + x.clamp(0.0, 1.0) as f64 * self.domain.duration()
    }
}

/// Overlay canvas with click-to-seek
pub struct OverlayCanvas<'a, F> {
    pub overlay: &'a ButterflyOverlay,
    pub on_seek: F,
}

impl<'a, Message, F> Program<Message> for OverlayCanvas<'a, F>
where
    Message: Clone,
    F: Fn(f64) -> Message,
{
    type State = SeekInteraction;

    fn update(
        &self,
        interaction: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<canvas::Action<Message>> {
        if let Some(position) = cursor.position_in(bounds) {
            let time = self.overlay.time_at(position.x / bounds.width.max(1.0));
            match event {
                Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                    interaction.is_dragging = true;
                    return Some(canvas::Action::publish((self.on_seek)(time)).and_capture());
                }
                Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                    interaction.is_dragging = false;
                }
                Event::Mouse(mouse::Event::CursorMoved { .. }) if interaction.is_dragging => {
                    return Some(canvas::Action::publish((self.on_seek)(time)).and_capture());
                }
                _ => {}
            }
        } else if matches!(event, Event::Mouse(mouse::Event::ButtonReleased(_))) {
            interaction.is_dragging = false;
        }

        None
    }

    fn mouse_interaction(
        &self,
        _interaction: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if cursor.is_over(bounds) {
            mouse::Interaction::Pointer
        } else {
            mouse::Interaction::default()
        }
    }

    fn draw(
        &self,
        _interaction: &Self::State,
        renderer: &iced::Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(Point::ORIGIN, bounds.size(), OVERLAY_BACKING);

        let to_point = |(x, y): (f32, f32)| Point::new(x * bounds.width, (1.0 - y) * bounds.height);
        for curve in &self.overlay.curves {
            let Some((&first, rest)) = curve.points.split_first() else {
                continue;
            };
            let path = Path::new(|builder| {
                builder.move_to(to_point(first));
                for &point in rest {
                    builder.line_to(to_point(point));
                }
            });
            frame.stroke(
                &path,
                Stroke::default()
                    .with_color(hemisphere_color(curve.hemisphere))
                    .with_width(1.5),
            );
        }

        let x = self.overlay.cursor * bounds.width;
        frame.stroke(
            &Path::line(Point::new(x, 0.0), Point::new(x, bounds.height)),
            Stroke::default().with_color(CURSOR_COLOR).with_width(2.0),
        );

        vec![frame.into_geometry()]
    }
}

/// Stack the overlay strip over `base` (normally the surface viewport)
///
/// With `overlay` set to `None` the base is returned unchanged, so the host
/// can pass its `traces_overlay` toggle straight through.
///
/// ```ignore
/// let surface = self.viewport.view(&self.surface_frame, Message::Surface);
/// with_butterfly_overlay(surface, self.overlay.as_ref(), |t| {
///     Message::Clock(ClockCommand::ScrubTo(t))
/// })
/// ```
pub fn with_butterfly_overlay<'a, Message>(
    base: Element<'a, Message>,
    overlay: Option<&'a ButterflyOverlay>,
    on_seek: impl Fn(f64) -> Message + 'a,
) -> Element<'a, Message>
where
    Message: Clone + 'a,
{
    let Some(overlay) = overlay.filter(|o| !o.is_empty()) else {
        return base;
    };

    let strip = Canvas::new(OverlayCanvas { overlay, on_seek })
        .width(Length::Fill)
        .height(Length::Fixed(OVERLAY_HEIGHT));

    stack![base, column![Space::new().height(Length::Fill), strip]].into()
}
