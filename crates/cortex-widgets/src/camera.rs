//! Orbit camera for the 3D viewport
//!
//! Surfaces are in RAS coordinates (z up). The camera orbits a target point
//! at a given distance; gestures arrive as [`CameraCommand`] deltas in
//! logical pixels (rotate, pan) or wheel steps (zoom).

use glam::{Mat4, Vec3};

/// Radians of orbit per pixel of drag
const ROTATE_SENSITIVITY: f32 = 0.008;

/// Fraction of the orbit distance panned per pixel of drag
const PAN_SENSITIVITY: f32 = 0.0015;

/// Distance factor per wheel step
const ZOOM_STEP: f32 = 1.1;

/// Keeps the camera off the poles where `look_at` degenerates
const MAX_ELEVATION: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Gesture input for the 3D viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraCommand {
    /// Orbit by a drag delta
    Rotate { dx: f32, dy: f32 },
    /// Move the target in the view plane by a drag delta
    Pan { dx: f32, dy: f32 },
    /// Wheel steps; positive zooms in
    Zoom(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    /// Angle around the z axis (radians)
    pub azimuth: f32,
    /// Angle above the xy plane (radians)
    pub elevation: f32,
    /// Vertical field of view (radians)
    pub fov_y: f32,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 400.0,
            // Lateral view of the left hemisphere
            azimuth: std::f32::consts::PI,
            elevation: 0.2,
            fov_y: 35f32.to_radians(),
            aspect: 4.0 / 3.0,
            znear: 1.0,
            zfar: 4000.0,
        }
    }
}

impl OrbitCamera {
    pub fn eye(&self) -> Vec3 {
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        let (sin_el, cos_el) = self.elevation.sin_cos();
        self.target + self.distance * Vec3::new(cos_el * cos_az, cos_el * sin_az, sin_el)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Z)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect.max(1e-3), self.znear, self.zfar)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }

    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.aspect = width / height;
        }
    }

    /// Frame an axis-aligned box so it fills the vertical field of view
    pub fn fit_bounds(&mut self, min: Vec3, max: Vec3) {
        let radius = ((max - min).length() * 0.5).max(1e-3);
        self.target = (min + max) * 0.5;
        self.distance = radius / (self.fov_y * 0.5).sin();
        self.znear = (self.distance - radius * 2.0).max(self.distance * 0.01);
        self.zfar = self.distance + radius * 4.0;
    }

    pub fn apply(&mut self, command: CameraCommand) {
        match command {
            CameraCommand::Rotate { dx, dy } => {
                self.azimuth = (self.azimuth - dx * ROTATE_SENSITIVITY).rem_euclid(std::f32::consts::TAU);
                self.elevation = (self.elevation + dy * ROTATE_SENSITIVITY).clamp(-MAX_ELEVATION, MAX_ELEVATION);
            }
            CameraCommand::Pan { dx, dy } => {
                let forward = (self.target - self.eye()).normalize_or_zero();
                let right = forward.cross(Vec3::Z).normalize_or_zero();
                let up = right.cross(forward);
                let scale = self.distance * PAN_SENSITIVITY;
                self.target += (-dx * right + dy * up) * scale;
            }
            CameraCommand::Zoom(steps) => {
                self.distance = (self.distance / ZOOM_STEP.powf(steps)).clamp(self.znear * 1.5, self.zfar * 0.5);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_projects_to_center() {
        let camera = OrbitCamera::default();
        let clip = camera.view_proj() * camera.target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn test_rotate_keeps_distance() {
        let mut camera = OrbitCamera::default();
        camera.apply(CameraCommand::Rotate { dx: 120.0, dy: -40.0 });
        assert!(((camera.eye() - camera.target).length() - camera.distance).abs() < 1e-2);
    }

    #[test]
    fn test_elevation_is_clamped() {
        let mut camera = OrbitCamera::default();
        camera.apply(CameraCommand::Rotate { dx: 0.0, dy: 10_000.0 });
        assert!(camera.elevation <= MAX_ELEVATION);
    }

    #[test]
    fn test_zoom_in_reduces_distance() {
        let mut camera = OrbitCamera::default();
        let before = camera.distance;
        camera.apply(CameraCommand::Zoom(2.0));
        assert!((camera.distance - before / 1.21).abs() < 1e-2);
    }

    #[test]
    fn test_pan_moves_target_in_view_plane() {
        let mut camera = OrbitCamera::default();
        let forward = (camera.target - camera.eye()).normalize();
        camera.apply(CameraCommand::Pan { dx: 50.0, dy: 0.0 });
        assert!(camera.target.length() > 0.0);
        assert!(camera.target.dot(forward).abs() < 1e-3);
    }

    #[test]
    fn test_fit_bounds_centres_target() {
        let mut camera = OrbitCamera::default();
        camera.fit_bounds(Vec3::new(-70.0, -100.0, -40.0), Vec3::new(0.0, 60.0, 80.0));
        assert_eq!(camera.target, Vec3::new(-35.0, -20.0, 20.0));
        assert!(camera.znear > 0.0 && camera.znear < camera.distance);
    }
}
