//! Solid builders on top of truck's sweep API, plus conversions between
//! truck's cgmath types and the workspace's geometry types.
//!
//! truck has no built-in box or prism; everything is successive sweeps.

use truck_modeling::builder;
use truck_modeling::topology::{Edge, Solid, Wire};
use truck_modeling::{Point3, Vector3};

use crate::types::{KernelError, Point3d, Vec3};

pub(crate) fn to_point3(p: Point3d) -> Point3 {
    Point3::new(p.x, p.y, p.z)
}

pub(crate) fn to_vector3(v: Vec3) -> Vector3 {
    Vector3::new(v.x, v.y, v.z)
}

pub(crate) fn from_point3(p: Point3) -> Point3d {
    Point3d::new(p.x, p.y, p.z)
}

pub(crate) fn from_vector3(v: Vector3) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

/// Box spanned by three edge vectors from a corner.
/// `l`, `w`, `h` must form a right-handed frame for outward-facing normals.
pub fn oriented_box(corner: Point3d, l: Vec3, w: Vec3, h: Vec3) -> Solid {
    let v = builder::vertex(to_point3(corner));
    let edge = builder::tsweep(&v, to_vector3(l));
    let face = builder::tsweep(&edge, to_vector3(w));
    builder::tsweep(&face, to_vector3(h))
}

/// Prism from a planar polygon swept along `sweep`.
///
/// The polygon must be counter-clockwise about `sweep` so the swept solid
/// faces outward.
pub fn prism(polygon: &[Point3d], sweep: Vec3) -> Result<Solid, KernelError> {
    if polygon.len() < 3 {
        return Err(KernelError::Other {
            message: "prism profile has fewer than 3 points".to_string(),
        });
    }
    let vertices: Vec<_> = polygon
        .iter()
        .map(|p| builder::vertex(to_point3(*p)))
        .collect();
    let n = vertices.len();
    let edges: Vec<Edge> = (0..n)
        .map(|i| builder::line(&vertices[i], &vertices[(i + 1) % n]))
        .collect();
    let wire = Wire::from_iter(edges);
    let face = builder::try_attach_plane(&[wire]).map_err(|e| KernelError::Other {
        message: format!("failed to create planar face: {}", e),
    })?;
    Ok(builder::tsweep(&face, to_vector3(sweep)))
}

/// Outward wall strips around a counter-clockwise rectangle.
///
/// Each strip runs along one side and reaches `wall` past its far corner, so
/// the four strips close the corners without overlapping.
pub fn wall_strips(rect: &[Point3d; 4], normal: Vec3, wall: f64) -> Vec<[Point3d; 4]> {
    (0..4)
        .filter_map(|i| {
            let a = rect[i];
            let b = rect[(i + 1) % 4];
            let d = a.vector_to(&b).normalized()?;
            let out = d.cross(&normal) * wall;
            let tip = b + d * wall;
            Some([a, a + out, tip + out, tip])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_oriented_box_topology() {
        let solid = oriented_box(
            Point3d::ORIGIN,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(0.0, 0.0, 3.0),
        );

        let boundaries = solid.boundaries();
        assert_eq!(boundaries.len(), 1, "Box should have 1 shell");

        let shell = &boundaries[0];
        let faces = shell.face_iter().count();
        let edges: HashSet<_> = shell.edge_iter().map(|e| e.id()).collect();
        let verts: HashSet<_> = shell.vertex_iter().map(|v| v.id()).collect();

        assert_eq!(faces, 6);
        assert_eq!(edges.len(), 12);
        assert_eq!(verts.len(), 8);
        assert_eq!(verts.len() as i64 - edges.len() as i64 + faces as i64, 2);
    }

    #[test]
    fn test_rotated_box_extents() {
        let solid = oriented_box(
            Point3d::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(-3.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 4.0),
        );
        let mut min = [f64::MAX; 3];
        let mut max = [f64::MIN; 3];
        for v in solid.boundaries()[0].vertex_iter() {
            let p = v.point();
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        let eps = 1e-10;
        assert!((max[0] - min[0] - 3.0).abs() < eps);
        assert!((max[1] - min[1] - 2.0).abs() < eps);
        assert!((max[2] - min[2] - 4.0).abs() < eps);
    }

    #[test]
    fn test_prism_from_square() {
        let square = [
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(1.0, 1.0, 0.0),
            Point3d::new(0.0, 1.0, 0.0),
        ];
        let solid = prism(&square, Vec3::new(0.0, 0.0, 0.5)).unwrap();
        assert_eq!(solid.boundaries()[0].face_iter().count(), 6);
        assert!(prism(&square[..2], Vec3::Z).is_err());
    }

    #[test]
    fn test_wall_strips_sit_outside_the_rectangle() {
        let rect = [
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(2.0, 0.0, 0.0),
            Point3d::new(2.0, 1.0, 0.0),
            Point3d::new(0.0, 1.0, 0.0),
        ];
        let strips = wall_strips(&rect, Vec3::Z, 0.1);
        assert_eq!(strips.len(), 4);
        // bottom side strip lies below y = 0
        assert!(strips[0].iter().all(|p| p.y <= 1e-12));
        assert!((strips[0][1].y + 0.1).abs() < 1e-12);
        // strips keep the rectangle's winding
        for s in &strips {
            let turn = s[0].vector_to(&s[1]).cross(&s[1].vector_to(&s[2]));
            assert!(turn.z > 0.0);
        }
    }
}
