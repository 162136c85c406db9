//! KernelIntrospect for TruckKernel: topology walks and planar-face geometry
//! over the stored truck solids.

use std::collections::HashSet;

use truck_modeling::geometry::Surface;
use truck_modeling::topology::{Edge, Face, Solid};
use truck_modeling::InnerSpace;

use crate::primitives::{from_point3, from_vector3};
use crate::traits::KernelIntrospect;
use crate::truck_kernel::{TruckKernel, BODY_SHIFT, EDGE_ID_FLAG};
use crate::types::*;

/// Distance within which a point counts as lying on a face.
const CONTAINMENT_TOLERANCE: f64 = 1e-7;

/// Skewed direction for parity rays, chosen to avoid grazing axis-aligned
/// edges.
const PARITY_RAY: Vec3 = Vec3 {
    x: 0.312_5,
    y: 0.591_7,
    z: 0.742_9,
};

fn face_id(body: BodyHandle, index: usize) -> KernelId {
    KernelId((body.0 << BODY_SHIFT) | index as u64)
}

fn edge_id(body: BodyHandle, index: usize) -> KernelId {
    KernelId((body.0 << BODY_SHIFT) | EDGE_ID_FLAG | index as u64)
}

fn split_id(id: KernelId) -> (BodyHandle, bool, usize) {
    let body = BodyHandle(id.0 >> BODY_SHIFT);
    let low = id.0 & ((1u64 << BODY_SHIFT) - 1);
    let is_edge = low & EDGE_ID_FLAG != 0;
    (body, is_edge, (low & !EDGE_ID_FLAG) as usize)
}

fn faces_of(solid: &Solid) -> Vec<Face> {
    solid
        .boundaries()
        .iter()
        .flat_map(|shell| shell.face_iter().cloned())
        .collect()
}

/// Unique edges in shell order.
fn edges_of(solid: &Solid) -> Vec<Edge> {
    let mut seen = HashSet::new();
    solid
        .boundaries()
        .iter()
        .flat_map(|shell| shell.edge_iter())
        .filter(|e| seen.insert(e.id()))
        .map(|e| e.clone())
        .collect()
}

/// Outward unit normal of a planar face.
pub(crate) fn planar_normal(face: &Face) -> Option<Vec3> {
    match face.oriented_surface() {
        Surface::Plane(plane) => from_vector3(plane.normal().normalize()).normalized(),
        _ => None,
    }
}

fn plane_point(face: &Face) -> Option<Point3d> {
    match face.oriented_surface() {
        Surface::Plane(plane) => Some(from_point3(plane.origin())),
        _ => None,
    }
}

fn wire_polygons(face: &Face) -> Vec<Vec<Point3d>> {
    face.boundaries()
        .iter()
        .map(|w| w.vertex_iter().map(|v| from_point3(v.point())).collect())
        .collect()
}

/// Crossing-number test in the plane, after dropping the normal's dominant axis.
fn polygon_contains(polygon: &[Point3d], normal: Vec3, p: Point3d) -> bool {
    let (ax, ay) = if normal.x.abs() >= normal.y.abs() && normal.x.abs() >= normal.z.abs() {
        (1, 2)
    } else if normal.y.abs() >= normal.z.abs() {
        (0, 2)
    } else {
        (0, 1)
    };
    let flat = |q: &Point3d| {
        let a = q.to_array();
        (a[ax], a[ay])
    };
    let (px, py) = flat(&p);
    let mut inside = false;
    for (i, a) in polygon.iter().enumerate() {
        let (x0, y0) = flat(a);
        let (x1, y1) = flat(&polygon[(i + 1) % polygon.len()]);
        if (y0 > py) != (y1 > py) {
            let x_at = x0 + (py - y0) / (y1 - y0) * (x1 - x0);
            if px < x_at {
                inside = !inside;
            }
        }
    }
    inside
}

/// Whether a point of the face's plane lies within its trimmed region.
fn face_contains(face: &Face, normal: Vec3, p: Point3d) -> bool {
    let polygons = wire_polygons(face);
    let Some((outer, holes)) = polygons.split_first() else {
        return false;
    };
    polygon_contains(outer, normal, p) && !holes.iter().any(|h| polygon_contains(h, normal, p))
}

impl TruckKernel {
    pub(crate) fn resolve_face(&self, face: KernelId) -> Result<(BodyHandle, Face), KernelError> {
        let (body, is_edge, index) = split_id(face);
        if is_edge {
            return Err(KernelError::EntityNotFound { id: face });
        }
        let solid = &self.body_ref(body)?.solid;
        faces_of(solid)
            .into_iter()
            .nth(index)
            .map(|f| (body, f))
            .ok_or(KernelError::EntityNotFound { id: face })
    }

    fn resolve_edge(&self, edge: KernelId) -> Result<(BodyHandle, Edge), KernelError> {
        let (body, is_edge, index) = split_id(edge);
        if !is_edge {
            return Err(KernelError::EntityNotFound { id: edge });
        }
        let solid = &self.body_ref(body)?.solid;
        edges_of(solid)
            .into_iter()
            .nth(index)
            .map(|e| (body, e))
            .ok_or(KernelError::EntityNotFound { id: edge })
    }
}

/// Parity-ray containment of `point` in a solid with planar faces.
pub(crate) fn solid_containment(solid: &Solid, point: Point3d) -> Result<Containment, KernelError> {
    let faces = faces_of(solid);
    let mut crossings = 0usize;
    for f in &faces {
        let (Some(normal), Some(on_plane)) = (planar_normal(f), plane_point(f)) else {
            return Err(KernelError::NotSupported {
                operation: "containment test against a non-planar face".to_string(),
            });
        };
        let height = on_plane.vector_to(&point).dot(&normal);
        if height.abs() <= CONTAINMENT_TOLERANCE && face_contains(f, normal, point) {
            return Ok(Containment::On);
        }
        let denom = PARITY_RAY.dot(&normal);
        if denom.abs() < 1e-12 {
            continue;
        }
        let t = -height / denom;
        if t > CONTAINMENT_TOLERANCE && face_contains(f, normal, point + PARITY_RAY * t) {
            crossings += 1;
        }
    }
    Ok(if crossings % 2 == 1 {
        Containment::Inside
    } else {
        Containment::Outside
    })
}

impl KernelIntrospect for TruckKernel {
    fn face_body(&self, face: KernelId) -> Result<BodyHandle, KernelError> {
        self.resolve_face(face).map(|(body, _)| body)
    }

    fn body_faces(&self, body: BodyHandle) -> Result<Vec<KernelId>, KernelError> {
        let count = faces_of(&self.body_ref(body)?.solid).len();
        Ok((0..count).map(|i| face_id(body, i)).collect())
    }

    fn body_edges(&self, body: BodyHandle) -> Result<Vec<KernelId>, KernelError> {
        let count = edges_of(&self.body_ref(body)?.solid).len();
        Ok((0..count).map(|i| edge_id(body, i)).collect())
    }

    fn face_normal_at(&self, face: KernelId, _point: Point3d) -> Result<Vec3, KernelError> {
        let (_, f) = self.resolve_face(face)?;
        planar_normal(&f).ok_or_else(|| KernelError::NotSupported {
            operation: "normal of a non-planar face".to_string(),
        })
    }

    fn face_loops(&self, face: KernelId) -> Result<Vec<FaceLoop>, KernelError> {
        let (body, f) = self.resolve_face(face)?;
        let index: Vec<_> = edges_of(&self.body_ref(body)?.solid)
            .iter()
            .map(|e| e.id())
            .collect();
        let mut loops = Vec::new();
        for (i, wire) in f.boundaries().iter().enumerate() {
            let mut co_edges = Vec::new();
            for e in wire.edge_iter() {
                let position = index.iter().position(|id| *id == e.id()).ok_or_else(|| {
                    KernelError::Other {
                        message: "face boundary edge missing from its shell".to_string(),
                    }
                })?;
                co_edges.push(CoEdge {
                    edge: edge_id(body, position),
                    opposed_to_edge: !e.orientation(),
                });
            }
            loops.push(FaceLoop {
                co_edges,
                is_outer: i == 0,
            });
        }
        Ok(loops)
    }

    fn edge_endpoints(&self, edge: KernelId) -> Result<(Point3d, Point3d), KernelError> {
        let (_, e) = self.resolve_edge(edge)?;
        Ok((
            from_point3(e.absolute_front().point()),
            from_point3(e.absolute_back().point()),
        ))
    }

    fn edge_faces(&self, edge: KernelId) -> Result<Vec<KernelId>, KernelError> {
        let (body, e) = self.resolve_edge(edge)?;
        let target = e.id();
        Ok(faces_of(&self.body_ref(body)?.solid)
            .iter()
            .enumerate()
            .filter(|(_, f)| {
                f.boundaries()
                    .iter()
                    .flat_map(|w| w.edge_iter())
                    .any(|x| x.id() == target)
            })
            .map(|(i, _)| face_id(body, i))
            .collect())
    }

    fn intersect_line_with_face(
        &self,
        face: KernelId,
        origin: Point3d,
        direction: Vec3,
    ) -> Result<Vec<Point3d>, KernelError> {
        let (_, f) = self.resolve_face(face)?;
        let (Some(normal), Some(on_plane)) = (planar_normal(&f), plane_point(&f)) else {
            tracing::trace!(face = face.0, "skipping non-planar face in line intersection");
            return Ok(Vec::new());
        };
        let denom = direction.dot(&normal);
        if denom.abs() < 1e-12 {
            return Ok(Vec::new());
        }
        let t = origin.vector_to(&on_plane).dot(&normal) / denom;
        Ok(vec![origin + direction * t])
    }

    fn point_containment(
        &self,
        body: BodyHandle,
        point: Point3d,
    ) -> Result<Containment, KernelError> {
        solid_containment(&self.body_ref(body)?.solid, point)
    }

    fn feature_health(&self, feature: KernelId) -> Result<FeatureHealth, KernelError> {
        self.features
            .get(&feature)
            .map(|f| f.health)
            .ok_or(KernelError::EntityNotFound { id: feature })
    }
}
