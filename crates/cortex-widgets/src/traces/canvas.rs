//! Canvas programs for the trace browsers
//!
//! Views are plain functions taking a prepared view and an `on_seek`
//! callback, the same shape as the other cortex widgets.

use iced::widget::canvas::{self, Event, Frame, Geometry, Path, Program, Stroke};
use iced::widget::Canvas;
use iced::{mouse, Color, Element, Length, Point, Rectangle, Size, Theme};

use super::peaks::TracePoint;
use super::raw::RawTraceView;
use super::source::SourceTraceView;
use super::TraceWindow;
use crate::theme::{hemisphere_color, CURSOR_COLOR, RAW_TRACE_COLOR, SOURCE_LINE_COLOR, TRACE_BACKGROUND};

/// Height of one raw channel row
pub const CHANNEL_ROW_HEIGHT: f32 = 36.0;

/// Height of the source browser
pub const SOURCE_BROWSER_HEIGHT: f32 = 220.0;

/// Something a [`TraceCanvas`] can draw
pub trait TraceDraw {
    fn window(&self) -> TraceWindow;

    fn cursor_x(&self) -> Option<f32>;

    /// Draw the traces; `scale_x` maps window columns to pixels
    fn draw_traces(&self, frame: &mut Frame, size: Size, scale_x: f32);
}

/// Canvas state for click/drag seeking
#[derive(Debug, Clone, Copy, Default)]
pub struct SeekInteraction {
    pub is_dragging: bool,
}

/// Trace canvas with click-to-seek
///
/// `on_seek` receives the time under the pointer. The canvas never moves its
/// own cursor; the next frame's view carries the broadcast time.
pub struct TraceCanvas<'a, T, F> {
    pub view: &'a T,
    pub on_seek: F,
}

impl<'a, T, F> TraceCanvas<'a, T, F>
where
    T: TraceDraw,
{
    fn seek_time(&self, x: f32, bounds: Rectangle) -> f64 {
        let window = self.view.window();
        let column = x / bounds.width.max(1.0) * window.width as f32;
        window.time_at(column)
    }
}

impl<'a, T, Message, F> Program<Message> for TraceCanvas<'a, T, F>
where
    T: TraceDraw,
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
            match event {
                Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                    interaction.is_dragging = true;
                    let time = self.seek_time(position.x, bounds);
                    return Some(canvas::Action::publish((self.on_seek)(time)));
                }
                Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                    interaction.is_dragging = false;
                }
                Event::Mouse(mouse::Event::CursorMoved { .. }) if interaction.is_dragging => {
                    let time = self.seek_time(position.x, bounds);
                    return Some(canvas::Action::publish((self.on_seek)(time)));
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
        frame.fill_rectangle(Point::ORIGIN, bounds.size(), TRACE_BACKGROUND);

        let scale_x = bounds.width / self.view.window().width as f32;
        self.view.draw_traces(&mut frame, bounds.size(), scale_x);

        if let Some(x) = self.view.cursor_x() {
            draw_cursor(&mut frame, x * scale_x, bounds.height);
        }

        vec![frame.into_geometry()]
    }
}

impl TraceDraw for RawTraceView {
    fn window(&self) -> TraceWindow {
        self.window
    }

    fn cursor_x(&self) -> Option<f32> {
        self.cursor_x
    }

    fn draw_traces(&self, frame: &mut Frame, size: Size, scale_x: f32) {
        if self.channels.is_empty() {
            return;
        }
        let row_height = size.height / self.channels.len() as f32;

        for (row, channel) in self.channels.iter().enumerate() {
            let top = row as f32 * row_height;
            let (lo, hi) = channel.range;
            let y_of = |v: f32| top + row_height * (1.0 - (v - lo) / (hi - lo));

            for (col, peak) in channel.peaks.iter().enumerate() {
                let Some((min, max)) = *peak else {
                    continue;
                };
                let x = (col as f32 + 0.5) * scale_x;
                // Keep flat columns visible as a one-pixel tick
                let (y_min, y_max) = (y_of(min), y_of(max));
                let (y_top, y_bottom) = if (y_min - y_max).abs() < 1.0 {
                    (y_max - 0.5, y_min + 0.5)
                } else {
                    (y_max, y_min)
                };
                frame.stroke(
                    &Path::line(Point::new(x, y_top), Point::new(x, y_bottom)),
                    Stroke::default().with_color(RAW_TRACE_COLOR).with_width(1.0),
                );
            }
        }
    }
}

impl TraceDraw for SourceTraceView {
    fn window(&self) -> TraceWindow {
        self.window
    }

    fn cursor_x(&self) -> Option<f32> {
        self.cursor_x
    }

    fn draw_traces(&self, frame: &mut Frame, size: Size, scale_x: f32) {
        let (lo, hi) = self.range;
        let y_of = |v: f32| size.height * (1.0 - (v - lo) / (hi - lo));

        for line in &self.lines {
            stroke_points(frame, &line.points, scale_x, y_of, SOURCE_LINE_COLOR, 1.0);
        }
        if let Some(aggregate) = &self.aggregate {
            let color = self.hemisphere.map(hemisphere_color).unwrap_or(RAW_TRACE_COLOR);
            stroke_points(frame, &aggregate.points, scale_x, y_of, color, 2.0);
        }
    }
}

/// Stroke a decimated line; min/max columns become vertical spans
pub(crate) fn stroke_points(
    frame: &mut Frame,
    points: &[TracePoint],
    scale_x: f32,
    y_of: impl Fn(f32) -> f32,
    color: Color,
    width: f32,
) {
    if points.is_empty() {
        return;
    }
    let path = Path::new(|builder| {
        for (i, point) in points.iter().enumerate() {
            let x = point.x * scale_x;
            let top = Point::new(x, y_of(point.max));
            if i == 0 {
                builder.move_to(top);
            } else {
                builder.line_to(top);
            }
            if point.min != point.max {
                builder.line_to(Point::new(x, y_of(point.min)));
            }
        }
    });
    frame.stroke(&path, Stroke::default().with_color(color).with_width(width));
}

pub(crate) fn draw_cursor(frame: &mut Frame, x: f32, height: f32) {
    frame.stroke(
        &Path::line(Point::new(x, 0.0), Point::new(x, height)),
        Stroke::default().with_color(CURSOR_COLOR).with_width(2.0),
    );
}

/// Raw channel browser with click-to-seek
///
/// ```ignore
/// raw_trace_browser(&self.raw_view, |t| Message::Clock(ClockCommand::ScrubTo(t)))
/// ```
pub fn raw_trace_browser<'a, Message>(
    view: &'a RawTraceView,
    on_seek: impl Fn(f64) -> Message + 'a,
) -> Element<'a, Message>
where
    Message: Clone + 'a,
{
    let rows = view.channels.len().max(1) as f32;
    Canvas::new(TraceCanvas { view, on_seek })
        .width(Length::Fill)
        .height(Length::Fixed(rows * CHANNEL_ROW_HEIGHT))
        .into()
}

/// Butterfly browser of one estimate with click-to-seek
pub fn source_trace_browser<'a, Message>(
    view: &'a SourceTraceView,
    on_seek: impl Fn(f64) -> Message + 'a,
) -> Element<'a, Message>
where
    Message: Clone + 'a,
{
    Canvas::new(TraceCanvas { view, on_seek })
        .width(Length::Fill)
        .height(Length::Fixed(SOURCE_BROWSER_HEIGHT))
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_time_scales_pixels_to_columns() {
        let view = RawTraceView::empty(TraceWindow::new(1.0, 2.0, 100), 0.0);
        let canvas = TraceCanvas {
            view: &view,
            on_seek: |t: f64| t,
        };
        let bounds = Rectangle::new(Point::ORIGIN, Size::new(400.0, 50.0));
        assert_eq!(canvas.seek_time(200.0, bounds), 2.0);
        assert_eq!(canvas.seek_time(0.0, bounds), 1.0);
        assert_eq!(canvas.seek_time(500.0, bounds), 3.0);
    }
}
