//! Hover picking on the 3D viewport
//!
//! The cursor is converted to normalized device coordinates and compared
//! against every projected vertex. The hit is the front-most vertex within
//! [`PICK_THRESHOLD`] (NDC units) of the cursor.

use glam::{Mat4, Vec2, Vec3};
use iced::{Point, Size};

use cortex_core::data::SurfaceMesh;
use cortex_core::data::AtlasLabeling;
use cortex_core::Hemisphere;

/// Maximum NDC distance between cursor and vertex
pub const PICK_THRESHOLD: f32 = 0.05;

/// Result of a hover pick
#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    pub hemisphere: Hemisphere,
    pub vertex: usize,
    /// NDC depth of the picked vertex
    pub depth: f32,
    /// Region under the cursor when an atlas is loaded
    pub region: Option<PickedRegion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickedRegion {
    pub id: u32,
    pub name: String,
}

/// Widget-relative cursor position to NDC (y up)
pub fn screen_to_ndc(cursor: Point, size: Size) -> Option<Vec2> {
    if size.width <= 0.0 || size.height <= 0.0 {
        return None;
    }
    Some(Vec2::new(
        cursor.x / size.width * 2.0 - 1.0,
        -(cursor.y / size.height * 2.0 - 1.0),
    ))
}

/// Front-most vertex within the threshold of `cursor_ndc`
///
/// Returns `(vertex, depth)`. Vertices behind the camera or outside the depth
/// range are ignored.
pub fn pick_vertex(view_proj: Mat4, cursor_ndc: Vec2, positions: &[[f32; 3]]) -> Option<(usize, f32)> {
    let threshold_sq = PICK_THRESHOLD * PICK_THRESHOLD;
    positions
        .iter()
        .enumerate()
        .filter_map(|(i, p)| {
            let clip = view_proj * Vec3::from_array(*p).extend(1.0);
            if clip.w <= 0.0 {
                return None;
            }
            let ndc = clip.truncate() / clip.w;
            if !(0.0..=1.0).contains(&ndc.z) {
                return None;
            }
            let dist_sq = (ndc.truncate() - cursor_ndc).length_squared();
            (dist_sq < threshold_sq).then_some((i, ndc.z))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Pick across both hemispheres
pub fn pick(
    view_proj: Mat4,
    cursor: Point,
    size: Size,
    surfaces: [Option<(&SurfaceMesh, Option<&AtlasLabeling>)>; 2],
) -> Option<PickHit> {
    let cursor_ndc = screen_to_ndc(cursor, size)?;

    let hit = Hemisphere::ALL
        .iter()
        .zip(surfaces.iter())
        .filter_map(|(&hemisphere, surface)| {
            let (mesh, atlas) = (*surface)?;
            let (vertex, depth) = pick_vertex(view_proj, cursor_ndc, mesh.positions())?;
            Some((hemisphere, vertex, depth, atlas))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2))?;

    let (hemisphere, vertex, depth, atlas) = hit;
    let region = atlas.and_then(|a| a.region_of(vertex)).map(|r| PickedRegion {
        id: r.id,
        name: r.name.clone(),
    });

    log::debug!("pick: {} vertex {} region {:?}", hemisphere, vertex, region);

    Some(PickHit {
        hemisphere,
        vertex,
        depth,
        region,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::OrbitCamera;
    use cortex_core::data::Region;

    #[test]
    fn test_screen_to_ndc_corners() {
        let size = Size::new(800.0, 600.0);
        assert_eq!(screen_to_ndc(Point::new(400.0, 300.0), size), Some(Vec2::ZERO));
        assert_eq!(screen_to_ndc(Point::new(0.0, 0.0), size), Some(Vec2::new(-1.0, 1.0)));
        assert_eq!(screen_to_ndc(Point::new(800.0, 600.0), size), Some(Vec2::new(1.0, -1.0)));
        assert_eq!(screen_to_ndc(Point::ORIGIN, Size::ZERO), None);
    }

    #[test]
    fn test_front_most_vertex_wins() {
        let camera = OrbitCamera::default();
        let eye = camera.eye();
        let toward_eye = (eye - camera.target).normalize();
        // Two vertices on the line of sight through the centre, one nearer
        let far = camera.target;
        let near = camera.target + toward_eye * 50.0;
        let positions = [far.to_array(), near.to_array()];

        let (vertex, _) = pick_vertex(camera.view_proj(), Vec2::ZERO, &positions).unwrap();
        assert_eq!(vertex, 1);
    }

    #[test]
    fn test_miss_outside_threshold() {
        let camera = OrbitCamera::default();
        let positions = [camera.target.to_array()];
        assert!(pick_vertex(camera.view_proj(), Vec2::new(0.2, 0.0), &positions).is_none());
        assert!(pick_vertex(camera.view_proj(), Vec2::new(0.04, 0.0), &positions).is_some());
    }

    #[test]
    fn test_pick_reports_region() {
        let camera = OrbitCamera::default();
        let mesh = SurfaceMesh::new(vec![camera.target.to_array()], Vec::new(), None).unwrap();
        let atlas = AtlasLabeling::new(
            vec![42],
            vec![Region { id: 42, name: "G_front_sup".into(), color: [0.5, 0.5, 0.5, 1.0] }],
        )
        .unwrap();

        let hit = pick(
            camera.view_proj(),
            Point::new(400.0, 300.0),
            Size::new(800.0, 600.0),
            [Some((&mesh, Some(&atlas))), None],
        )
        .unwrap();
        assert_eq!(hit.hemisphere, Hemisphere::Left);
        assert_eq!(hit.region, Some(PickedRegion { id: 42, name: "G_front_sup".into() }));
    }
}
