//! 3D viewport widget
//!
//! Holds the orbit camera and drag state; [`SurfaceViewport::view`] wraps the
//! shader widget in a `mouse_area` and reports gestures as [`SurfaceEvent`]s
//! for the host to pass back through [`SurfaceViewport::handle_event`].
//!
//! ```rust,ignore
//! // view
//! self.viewport.view(&self.surface_frame, Message::Surface)
//!
//! // update
//! Message::Surface(event) => {
//!     if self.viewport.handle_event(event).is_none() {
//!         self.hover = self.viewport.pick(&self.session);
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;
use iced::mouse::ScrollDelta;
use iced::widget::{container, mouse_area, shader};
use iced::{Element, Length, Point, Size};

use cortex_core::{Hemisphere, Session};

use super::pipeline::{HemisphereDraw, SurfaceProgram, Uniforms};
use super::SurfaceFrame;
use crate::camera::{CameraCommand, OrbitCamera};
use crate::picking::{pick, PickHit};
use crate::theme::{to_color, VIEWPORT_BACKGROUND};

/// Global counter for generating unique viewport IDs
static VIEWPORT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Pixels per line for line-based wheel deltas
const PIXELS_PER_LINE: f32 = 40.0;

/// Which drag gesture is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    /// Left button
    Rotate,
    /// Right button
    Pan,
}

/// Gestures emitted by the viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceEvent {
    Pressed(DragKind),
    Released,
    Moved(Point),
    Scrolled(ScrollDelta),
}

#[derive(Debug, Clone)]
pub struct SurfaceViewport {
    /// Stable unique ID (never changes after creation)
    id: u64,
    camera: OrbitCamera,
    drag: Option<DragKind>,
    cursor: Option<Point>,
    size: Size,
}

impl Default for SurfaceViewport {
    fn default() -> Self {
        Self::new(Size::new(800.0, 600.0))
    }
}

impl SurfaceViewport {
    pub fn new(size: Size) -> Self {
        let mut camera = OrbitCamera::default();
        camera.set_aspect(size.width, size.height);
        Self {
            id: VIEWPORT_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            camera,
            drag: None,
            cursor: None,
            size,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn set_size(&mut self, size: Size) {
        self.size = size;
        self.camera.set_aspect(size.width, size.height);
    }

    /// Last cursor position inside the viewport
    pub fn cursor(&self) -> Option<Point> {
        self.cursor
    }

    /// Point the camera at everything drawn in `frame`
    pub fn fit_to(&mut self, frame: &SurfaceFrame) {
        if let Some((min, max)) = frame.bounds() {
            self.camera.fit_bounds(Vec3::from_array(min), Vec3::from_array(max));
        }
    }

    /// Apply a gesture; returns the camera command it produced, if any
    pub fn handle_event(&mut self, event: SurfaceEvent) -> Option<CameraCommand> {
        let command = match event {
            SurfaceEvent::Pressed(kind) => {
                self.drag = Some(kind);
                None
            }
            SurfaceEvent::Released => {
                self.drag = None;
                None
            }
            SurfaceEvent::Moved(position) => {
                let previous = self.cursor.replace(position);
                match (self.drag, previous) {
                    (Some(kind), Some(last)) => {
                        let (dx, dy) = (position.x - last.x, position.y - last.y);
                        Some(match kind {
                            DragKind::Rotate => CameraCommand::Rotate { dx, dy },
                            DragKind::Pan => CameraCommand::Pan { dx, dy },
                        })
                    }
                    _ => None,
                }
            }
            SurfaceEvent::Scrolled(delta) => {
                let steps = match delta {
                    ScrollDelta::Lines { y, .. } => y,
                    ScrollDelta::Pixels { y, .. } => y / PIXELS_PER_LINE,
                };
                Some(CameraCommand::Zoom(steps))
            }
        };

        if let Some(command) = command {
            self.camera.apply(command);
        }
        command
    }

    /// Pick the vertex under the cursor
    pub fn pick(&self, session: &Session) -> Option<PickHit> {
        let cursor = self.cursor?;
        let surfaces = Hemisphere::ALL.map(|h| {
            session
                .mesh(h)
                .map(|mesh| (&**mesh, session.atlas(h).map(|a| &**a)))
        });
        pick(self.camera.view_proj(), cursor, self.size, surfaces)
    }

    fn uniforms(&self) -> Uniforms {
        let eye = self.camera.eye();
        // Key light above and behind the camera
        let light = (eye - self.camera.target).normalize_or_zero() + Vec3::Z * 0.5;
        Uniforms {
            view_proj: self.camera.view_proj().to_cols_array_2d(),
            light_dir: light.extend(0.0).to_array(),
            shading: [0.35, 0.65, 0.15, 32.0],
            eye: eye.extend(1.0).to_array(),
        }
    }

    pub fn view<'a, Message: Clone + 'a>(
        &self,
        frame: &SurfaceFrame,
        on_event: impl Fn(SurfaceEvent) -> Message + 'a,
    ) -> Element<'a, Message> {
        let hemispheres = frame.hemispheres.clone().map(|h| {
            h.map(|h| HemisphereDraw {
                geometry: h.geometry,
                colors: h.colors,
                revision: h.revision,
                parity: h.parity,
            })
        });
        let program = SurfaceProgram {
            id: self.id,
            uniforms: self.uniforms(),
            hemispheres,
        };

        let shader_widget = shader(program)
            .width(Length::Fixed(self.size.width))
            .height(Length::Fixed(self.size.height));

        // Map shader messages (never emitted) to our Message type
        let fallback = on_event(SurfaceEvent::Released);
        let shader_element: Element<'a, ()> = shader_widget.into();
        let mapped: Element<'a, Message> = shader_element.map(move |()| fallback.clone());

        let background = to_color(VIEWPORT_BACKGROUND);
        let framed = container(mapped).style(move |_theme| container::Style {
            background: Some(background.into()),
            ..container::Style::default()
        });

        let on_event = std::rc::Rc::new(on_event);
        let (move_event, scroll_event) = (on_event.clone(), on_event.clone());
        mouse_area(framed)
            .on_press(on_event(SurfaceEvent::Pressed(DragKind::Rotate)))
            .on_release(on_event(SurfaceEvent::Released))
            .on_right_press(on_event(SurfaceEvent::Pressed(DragKind::Pan)))
            .on_right_release(on_event(SurfaceEvent::Released))
            .on_move(move |p| move_event(SurfaceEvent::Moved(p)))
            .on_scroll(move |delta| scroll_event(SurfaceEvent::Scrolled(delta)))
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_drag_rotates() {
        let mut viewport = SurfaceViewport::default();
        let before = viewport.camera().azimuth;
        viewport.handle_event(SurfaceEvent::Moved(Point::new(10.0, 10.0)));
        viewport.handle_event(SurfaceEvent::Pressed(DragKind::Rotate));
        let command = viewport.handle_event(SurfaceEvent::Moved(Point::new(30.0, 10.0)));
        assert_eq!(command, Some(CameraCommand::Rotate { dx: 20.0, dy: 0.0 }));
        assert_ne!(viewport.camera().azimuth, before);
    }

    #[test]
    fn test_move_without_drag_only_tracks_cursor() {
        let mut viewport = SurfaceViewport::default();
        assert_eq!(viewport.handle_event(SurfaceEvent::Moved(Point::new(5.0, 6.0))), None);
        assert_eq!(viewport.cursor(), Some(Point::new(5.0, 6.0)));
    }

    #[test]
    fn test_release_ends_drag() {
        let mut viewport = SurfaceViewport::default();
        viewport.handle_event(SurfaceEvent::Moved(Point::ORIGIN));
        viewport.handle_event(SurfaceEvent::Pressed(DragKind::Pan));
        viewport.handle_event(SurfaceEvent::Released);
        assert_eq!(viewport.handle_event(SurfaceEvent::Moved(Point::new(9.0, 9.0))), None);
    }

    #[test]
    fn test_scroll_zooms() {
        let mut viewport = SurfaceViewport::default();
        let command = viewport.handle_event(SurfaceEvent::Scrolled(ScrollDelta::Pixels { x: 0.0, y: 80.0 }));
        assert_eq!(command, Some(CameraCommand::Zoom(2.0)));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(SurfaceViewport::default().id(), SurfaceViewport::default().id());
    }
}
