//! MockKernel: deterministic test double implementing Kernel + KernelIntrospect.
//!
//! Bodies are convex polyhedra with planar faces and counter-clockwise face
//! loops. Extrude and boolean calls do not reshape the topology; each call is
//! appended to an operation log and its swept volume is booked against the
//! bodies it touches, which is what pipeline tests assert on.

use std::collections::{BTreeSet, HashMap};

use crate::arrangement;
use crate::traits::{Kernel, KernelIntrospect};
use crate::types::*;

/// Distance below which two positions are treated as equal.
pub const MOCK_TOLERANCE: f64 = 1e-9;

/// One recorded kernel mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOp {
    Sketch {
        sketch: KernelId,
        face: KernelId,
    },
    Extrude {
        feature: KernelId,
        operation: FeatureOperation,
        profiles: usize,
        interval: (f64, f64),
        thin: bool,
        bodies: Vec<BodyHandle>,
    },
    DeleteFeature {
        feature: KernelId,
    },
    CopyBody {
        source: BodyHandle,
        copy: BodyHandle,
    },
    MakeBox {
        body: BodyHandle,
        spec: OrientedBox,
    },
    Pattern {
        seed: BodyHandle,
        result: BodyHandle,
        copies: usize,
    },
    Subtract {
        target: BodyHandle,
        tool: BodyHandle,
    },
    Commit {
        body: BodyHandle,
        name: String,
    },
    SetVisible {
        body: BodyHandle,
        visible: bool,
    },
}

#[derive(Debug, Clone)]
struct MockEdge {
    body: BodyHandle,
    start: Point3d,
    end: Point3d,
}

#[derive(Debug, Clone)]
struct MockFace {
    body: BodyHandle,
    normal: Vec3,
    points: Vec<Point3d>,
    co_edges: Vec<CoEdge>,
}

#[derive(Debug, Clone)]
struct MockBody {
    faces: Vec<KernelId>,
    edges: Vec<KernelId>,
    volume: f64,
    instances: usize,
    removed_volume: f64,
    added_volume: f64,
    tools_applied: usize,
    name: Option<String>,
    visible: bool,
    in_design: bool,
}

#[derive(Debug, Clone)]
struct MockSketch {
    body: BodyHandle,
    origin: Point3d,
    normal: Vec3,
    lines: Vec<(Point3d, Point3d)>,
    profiles: Option<Vec<ProfileRegion>>,
    visible: bool,
}

#[derive(Debug, Clone)]
struct MockFeature {
    operation: FeatureOperation,
    bodies: Vec<BodyHandle>,
    volume: f64,
    health: FeatureHealth,
    deleted: bool,
}

/// Deterministic test double for the modeling kernel.
pub struct MockKernel {
    next_id: u64,
    next_handle: u64,
    bodies: HashMap<u64, MockBody>,
    faces: HashMap<KernelId, MockFace>,
    edges: HashMap<KernelId, MockEdge>,
    sketches: HashMap<KernelId, MockSketch>,
    features: HashMap<KernelId, MockFeature>,
    ops: Vec<MockOp>,
    extrude_calls: usize,
    boolean_calls: usize,
    warn_on_extrude: BTreeSet<usize>,
    fail_on_extrude: Option<usize>,
    fail_on_boolean: Option<usize>,
}

impl MockKernel {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            next_handle: 1,
            bodies: HashMap::new(),
            faces: HashMap::new(),
            edges: HashMap::new(),
            sketches: HashMap::new(),
            features: HashMap::new(),
            ops: Vec::new(),
            extrude_calls: 0,
            boolean_calls: 0,
            warn_on_extrude: BTreeSet::new(),
            fail_on_extrude: None,
            fail_on_boolean: None,
        }
    }

    fn alloc_id(&mut self) -> KernelId {
        let id = KernelId(self.next_id);
        self.next_id += 1;
        id
    }

    fn alloc_handle(&mut self) -> BodyHandle {
        let h = BodyHandle(self.next_handle);
        self.next_handle += 1;
        h
    }

    /// Add a design body spanned by three edge vectors from `origin`.
    /// The vectors must form a right-handed frame.
    pub fn add_box_body(&mut self, origin: Point3d, x: Vec3, y: Vec3, z: Vec3) -> BodyHandle {
        let body = self.build_box(origin, x, y, z);
        if let Some(b) = self.bodies.get_mut(&body.0) {
            b.in_design = true;
        }
        body
    }

    /// Add a design body from outward-facing, counter-clockwise face loops.
    pub fn add_polyhedron(&mut self, loops: &[Vec<Point3d>]) -> BodyHandle {
        let body = self.build_polyhedron(loops);
        if let Some(b) = self.bodies.get_mut(&body.0) {
            b.in_design = true;
        }
        body
    }

    fn build_box(&mut self, origin: Point3d, x: Vec3, y: Vec3, z: Vec3) -> BodyHandle {
        let p = |i: f64, j: f64, k: f64| origin + x * i + y * j + z * k;
        let (p000, p100, p010, p110) = (p(0., 0., 0.), p(1., 0., 0.), p(0., 1., 0.), p(1., 1., 0.));
        let (p001, p101, p011, p111) = (p(0., 0., 1.), p(1., 0., 1.), p(0., 1., 1.), p(1., 1., 1.));
        let loops = vec![
            vec![p000, p010, p110, p100],
            vec![p001, p101, p111, p011],
            vec![p000, p100, p101, p001],
            vec![p010, p011, p111, p110],
            vec![p000, p001, p011, p010],
            vec![p100, p110, p111, p101],
        ];
        self.build_polyhedron(&loops)
    }

    fn build_polyhedron(&mut self, loops: &[Vec<Point3d>]) -> BodyHandle {
        let body = self.alloc_handle();
        let mut face_ids = Vec::new();
        let mut edge_ids: Vec<KernelId> = Vec::new();
        let mut volume = 0.0;

        for points in loops {
            let newell = newell_vector(points);
            let normal = newell.normalized().unwrap_or(Vec3::Z);
            if let Some(first) = points.first() {
                volume += Point3d::ORIGIN.vector_to(first).dot(&newell) / 6.0;
            }

            let mut co_edges = Vec::with_capacity(points.len());
            for (i, a) in points.iter().enumerate() {
                let b = points[(i + 1) % points.len()];
                let existing = edge_ids.iter().find_map(|id| {
                    let e = &self.edges[id];
                    if same_point(&e.start, a) && same_point(&e.end, &b) {
                        Some((*id, false))
                    } else if same_point(&e.start, &b) && same_point(&e.end, a) {
                        Some((*id, true))
                    } else {
                        None
                    }
                });
                let (edge, opposed_to_edge) = match existing {
                    Some(found) => found,
                    None => {
                        let id = self.alloc_id();
                        self.edges.insert(
                            id,
                            MockEdge {
                                body,
                                start: *a,
                                end: b,
                            },
                        );
                        edge_ids.push(id);
                        (id, false)
                    }
                };
                co_edges.push(CoEdge {
                    edge,
                    opposed_to_edge,
                });
            }

            let face_id = self.alloc_id();
            self.faces.insert(
                face_id,
                MockFace {
                    body,
                    normal,
                    points: points.clone(),
                    co_edges,
                },
            );
            face_ids.push(face_id);
        }

        self.bodies.insert(
            body.0,
            MockBody {
                faces: face_ids,
                edges: edge_ids,
                volume: volume.abs(),
                instances: 1,
                removed_volume: 0.0,
                added_volume: 0.0,
                tools_applied: 0,
                name: None,
                visible: true,
                in_design: false,
            },
        );
        body
    }

    fn drop_body(&mut self, handle: BodyHandle) {
        if let Some(body) = self.bodies.remove(&handle.0) {
            for f in body.faces {
                self.faces.remove(&f);
            }
            for e in body.edges {
                self.edges.remove(&e);
            }
        }
    }

    fn body(&self, handle: BodyHandle) -> Result<&MockBody, KernelError> {
        self.bodies
            .get(&handle.0)
            .ok_or(KernelError::BodyNotFound { handle })
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut MockBody, KernelError> {
        self.bodies
            .get_mut(&handle.0)
            .ok_or(KernelError::BodyNotFound { handle })
    }

    fn face(&self, face: KernelId) -> Result<&MockFace, KernelError> {
        self.faces
            .get(&face)
            .ok_or(KernelError::EntityNotFound { id: face })
    }

    fn sketch_mut(&mut self, sketch: KernelId) -> Result<&mut MockSketch, KernelError> {
        self.sketches
            .get_mut(&sketch)
            .ok_or(KernelError::EntityNotFound { id: sketch })
    }

    fn book_volume(&mut self, bodies: &[BodyHandle], operation: FeatureOperation, volume: f64) {
        for handle in bodies {
            if let Some(body) = self.bodies.get_mut(&handle.0) {
                match operation {
                    FeatureOperation::Cut => body.removed_volume += volume,
                    FeatureOperation::Join => body.added_volume += volume,
                }
            }
        }
    }

    // ── Test inspection and fault injection ────────────────────────────────

    /// Every mutation in call order.
    pub fn ops(&self) -> &[MockOp] {
        &self.ops
    }

    /// Extrude features that were created and not deleted.
    pub fn live_features(&self) -> usize {
        self.features.values().filter(|f| !f.deleted).count()
    }

    pub fn removed_volume(&self, body: BodyHandle) -> Option<f64> {
        self.bodies.get(&body.0).map(|b| b.removed_volume)
    }

    pub fn added_volume(&self, body: BodyHandle) -> Option<f64> {
        self.bodies.get(&body.0).map(|b| b.added_volume)
    }

    /// Number of tool instances subtracted from a body.
    pub fn tools_applied(&self, body: BodyHandle) -> Option<usize> {
        self.bodies.get(&body.0).map(|b| b.tools_applied)
    }

    pub fn body_volume(&self, body: BodyHandle) -> Option<f64> {
        self.bodies.get(&body.0).map(|b| b.volume)
    }

    pub fn body_name(&self, body: BodyHandle) -> Option<&str> {
        self.bodies.get(&body.0).and_then(|b| b.name.as_deref())
    }

    pub fn is_body_visible(&self, body: BodyHandle) -> Option<bool> {
        self.bodies.get(&body.0).map(|b| b.visible)
    }

    pub fn is_in_design(&self, body: BodyHandle) -> Option<bool> {
        self.bodies.get(&body.0).map(|b| b.in_design)
    }

    /// Bodies currently alive, design and transient.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn sketch_lines(&self, sketch: KernelId) -> Option<&[(Point3d, Point3d)]> {
        self.sketches.get(&sketch).map(|s| s.lines.as_slice())
    }

    pub fn is_sketch_visible(&self, sketch: KernelId) -> Option<bool> {
        self.sketches.get(&sketch).map(|s| s.visible)
    }

    /// Face of a body whose outward normal matches `normal`.
    pub fn face_with_normal(&self, body: BodyHandle, normal: Vec3) -> Option<KernelId> {
        let b = self.bodies.get(&body.0)?;
        b.faces.iter().copied().find(|id| {
            self.faces
                .get(id)
                .is_some_and(|f| f.normal.dot(&normal) > 1.0 - MOCK_TOLERANCE)
        })
    }

    /// Edge joining two vertex positions, in either direction.
    pub fn edge_between(&self, body: BodyHandle, a: Point3d, b: Point3d) -> Option<KernelId> {
        let bd = self.bodies.get(&body.0)?;
        bd.edges.iter().copied().find(|id| {
            self.edges.get(id).is_some_and(|e| {
                (same_point(&e.start, &a) && same_point(&e.end, &b))
                    || (same_point(&e.start, &b) && same_point(&e.end, &a))
            })
        })
    }

    /// Make the `nth` extrude call (0-based) report [`FeatureHealth::Warning`].
    pub fn warn_on_extrude(&mut self, nth: usize) {
        self.warn_on_extrude.insert(nth);
    }

    /// Make the `nth` extrude call (0-based) fail.
    pub fn fail_on_extrude(&mut self, nth: usize) {
        self.fail_on_extrude = Some(nth);
    }

    /// Make the `nth` boolean subtraction (0-based) fail.
    pub fn fail_on_boolean(&mut self, nth: usize) {
        self.fail_on_boolean = Some(nth);
    }
}

impl Default for MockKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn same_point(a: &Point3d, b: &Point3d) -> bool {
    a.distance_to(b) <= MOCK_TOLERANCE
}

/// Twice the signed vector area of a polygon.
fn newell_vector(points: &[Point3d]) -> Vec3 {
    let mut n = Vec3::ZERO;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        n = n + Point3d::ORIGIN
            .vector_to(a)
            .cross(&Point3d::ORIGIN.vector_to(&b));
    }
    n
}

fn region_perimeter(region: &ProfileRegion) -> f64 {
    match region.patches.as_slice() {
        [single] => (0..4)
            .map(|i| single[i].distance_to(&single[(i + 1) % 4]))
            .sum(),
        // merged regions are booked by their bounding box
        _ => {
            let d = region.bbox_min.vector_to(&region.bbox_max);
            2.0 * (d.x.abs() + d.y.abs() + d.z.abs())
        }
    }
}

impl Kernel for MockKernel {
    fn create_sketch(&mut self, face: KernelId) -> Result<KernelId, KernelError> {
        let f = self.face(face)?;
        let (body, normal) = (f.body, f.normal);
        let origin = f
            .points
            .first()
            .copied()
            .ok_or(KernelError::EntityNotFound { id: face })?;
        let sketch = self.alloc_id();
        self.sketches.insert(
            sketch,
            MockSketch {
                body,
                origin,
                normal,
                lines: Vec::new(),
                profiles: None,
                visible: true,
            },
        );
        self.ops.push(MockOp::Sketch { sketch, face });
        Ok(sketch)
    }

    fn add_sketch_line(
        &mut self,
        sketch: KernelId,
        start: Point3d,
        end: Point3d,
    ) -> Result<KernelId, KernelError> {
        let s = self.sketch_mut(sketch)?;
        for p in [start, end] {
            if s.origin.vector_to(&p).dot(&s.normal).abs() > MOCK_TOLERANCE * 1e3 {
                return Err(KernelError::SketchFailed {
                    reason: format!("point {:?} is off the sketch plane", p),
                });
            }
        }
        s.lines.push((start, end));
        s.profiles = None;
        Ok(self.alloc_id())
    }

    fn sketch_profiles(&mut self, sketch: KernelId) -> Result<Vec<ProfileRegion>, KernelError> {
        let s = self.sketch_mut(sketch)?;
        if let Some(profiles) = &s.profiles {
            return Ok(profiles.clone());
        }
        let regions =
            arrangement::closed_regions(s.origin, s.normal, &s.lines, MOCK_TOLERANCE * 1e3)?;
        let profiles: Vec<ProfileRegion> = regions
            .into_iter()
            .map(|r| {
                let id = self.alloc_id();
                r.into_profile(id)
            })
            .collect();
        self.sketch_mut(sketch)?.profiles = Some(profiles.clone());
        Ok(profiles)
    }

    fn set_sketch_visible(&mut self, sketch: KernelId, visible: bool) -> Result<(), KernelError> {
        self.sketch_mut(sketch)?.visible = visible;
        Ok(())
    }

    fn extrude(&mut self, spec: &ExtrudeSpec) -> Result<KernelId, KernelError> {
        if !(spec.distance > 0.0) || !spec.distance.is_finite() {
            return Err(KernelError::ExtrudeFailed {
                reason: format!("extent distance must be positive (got {})", spec.distance),
            });
        }
        if spec.profiles.is_empty() {
            return Err(KernelError::ExtrudeFailed {
                reason: "no profiles selected".to_string(),
            });
        }
        let all_profiles = self.sketch_profiles(spec.sketch)?;
        let sketch_body = self.sketches[&spec.sketch].body;

        let mut swept = 0.0;
        for id in &spec.profiles {
            let region = all_profiles
                .iter()
                .find(|p| p.id == *id)
                .ok_or(KernelError::EntityNotFound { id: *id })?;
            swept += match spec.thin_wall {
                Some(wall) => region_perimeter(region) * wall * spec.distance,
                None => region.area() * spec.distance,
            };
        }

        let bodies = match &spec.participants {
            Participants::Auto => vec![sketch_body],
            Participants::Bodies(list) => list.clone(),
        };
        for b in &bodies {
            self.body(*b)?;
        }

        let call = self.extrude_calls;
        self.extrude_calls += 1;
        if self.fail_on_extrude == Some(call) {
            return Err(KernelError::ExtrudeFailed {
                reason: format!("injected failure on extrude #{call}"),
            });
        }
        let health = if self.warn_on_extrude.contains(&call) {
            FeatureHealth::Warning
        } else {
            FeatureHealth::Healthy
        };

        self.book_volume(&bodies, spec.operation, swept);
        let feature = self.alloc_id();
        self.features.insert(
            feature,
            MockFeature {
                operation: spec.operation,
                bodies: bodies.clone(),
                volume: swept,
                health,
                deleted: false,
            },
        );
        self.ops.push(MockOp::Extrude {
            feature,
            operation: spec.operation,
            profiles: spec.profiles.len(),
            interval: spec.interval(),
            thin: spec.thin_wall.is_some(),
            bodies,
        });
        Ok(feature)
    }

    fn delete_feature(&mut self, feature: KernelId) -> Result<(), KernelError> {
        let f = self
            .features
            .get_mut(&feature)
            .filter(|f| !f.deleted)
            .ok_or(KernelError::EntityNotFound { id: feature })?;
        f.deleted = true;
        let (bodies, operation, volume) = (f.bodies.clone(), f.operation, f.volume);
        self.book_volume(&bodies, operation, -volume);
        self.ops.push(MockOp::DeleteFeature { feature });
        Ok(())
    }

    fn copy_body(&mut self, source: BodyHandle) -> Result<BodyHandle, KernelError> {
        let src = self.body(source)?.clone();
        let loops: Vec<Vec<Point3d>> = src
            .faces
            .iter()
            .filter_map(|f| self.faces.get(f).map(|face| face.points.clone()))
            .collect();
        let copy = self.build_polyhedron(&loops);
        let c = self.body_mut(copy)?;
        c.removed_volume = src.removed_volume;
        c.added_volume = src.added_volume;
        c.tools_applied = src.tools_applied;
        self.ops.push(MockOp::CopyBody { source, copy });
        Ok(copy)
    }

    fn make_box(&mut self, spec: &OrientedBox) -> Result<BodyHandle, KernelError> {
        if !(spec.length > 0.0 && spec.width > 0.0 && spec.height > 0.0) {
            return Err(KernelError::Other {
                message: format!(
                    "box extents must be positive ({} x {} x {})",
                    spec.length, spec.width, spec.height
                ),
            });
        }
        let (corner, l, w, h) = spec.corner_and_axes();
        let body = self.build_box(corner, l, w, h);
        self.ops.push(MockOp::MakeBox { body, spec: *spec });
        Ok(body)
    }

    fn pattern_body(
        &mut self,
        seed: BodyHandle,
        offsets: &[Vec3],
    ) -> Result<BodyHandle, KernelError> {
        let Some(first) = offsets.first() else {
            return Err(KernelError::Other {
                message: "pattern needs at least one offset".to_string(),
            });
        };
        let src = self.body(seed)?.clone();
        // A patterned body keeps the topology of its first instance only.
        let loops: Vec<Vec<Point3d>> = src
            .faces
            .iter()
            .filter_map(|f| self.faces.get(f))
            .map(|face| face.points.iter().map(|p| *p + *first).collect())
            .collect();
        let result = self.build_polyhedron(&loops);
        let r = self.body_mut(result)?;
        r.volume = src.volume * offsets.len() as f64;
        r.instances = src.instances * offsets.len();
        self.drop_body(seed);
        self.ops.push(MockOp::Pattern {
            seed,
            result,
            copies: offsets.len(),
        });
        Ok(result)
    }

    fn boolean_subtract(
        &mut self,
        target: BodyHandle,
        tool: BodyHandle,
    ) -> Result<(), KernelError> {
        if target == tool {
            return Err(KernelError::BooleanFailed {
                reason: "target and tool are the same body".to_string(),
            });
        }
        self.body(target)?;
        let (tool_volume, instances) = {
            let t = self.body(tool)?;
            (t.volume, t.instances)
        };
        let call = self.boolean_calls;
        self.boolean_calls += 1;
        if self.fail_on_boolean == Some(call) {
            return Err(KernelError::BooleanFailed {
                reason: format!("injected failure on boolean #{call}"),
            });
        }
        let t = self.body_mut(target)?;
        t.removed_volume += tool_volume;
        t.tools_applied += instances;
        self.drop_body(tool);
        self.ops.push(MockOp::Subtract { target, tool });
        Ok(())
    }

    fn commit_body(&mut self, body: BodyHandle, name: &str) -> Result<(), KernelError> {
        let b = self.body_mut(body)?;
        b.in_design = true;
        b.name = Some(name.to_string());
        self.ops.push(MockOp::Commit {
            body,
            name: name.to_string(),
        });
        Ok(())
    }

    fn set_body_visible(&mut self, body: BodyHandle, visible: bool) -> Result<(), KernelError> {
        self.body_mut(body)?.visible = visible;
        self.ops.push(MockOp::SetVisible { body, visible });
        Ok(())
    }
}

impl KernelIntrospect for MockKernel {
    fn face_body(&self, face: KernelId) -> Result<BodyHandle, KernelError> {
        Ok(self.face(face)?.body)
    }

    fn body_faces(&self, body: BodyHandle) -> Result<Vec<KernelId>, KernelError> {
        Ok(self.body(body)?.faces.clone())
    }

    fn body_edges(&self, body: BodyHandle) -> Result<Vec<KernelId>, KernelError> {
        Ok(self.body(body)?.edges.clone())
    }

    fn face_normal_at(&self, face: KernelId, _point: Point3d) -> Result<Vec3, KernelError> {
        Ok(self.face(face)?.normal)
    }

    fn face_loops(&self, face: KernelId) -> Result<Vec<FaceLoop>, KernelError> {
        Ok(vec![FaceLoop {
            co_edges: self.face(face)?.co_edges.clone(),
            is_outer: true,
        }])
    }

    fn edge_endpoints(&self, edge: KernelId) -> Result<(Point3d, Point3d), KernelError> {
        self.edges
            .get(&edge)
            .map(|e| (e.start, e.end))
            .ok_or(KernelError::EntityNotFound { id: edge })
    }

    fn edge_faces(&self, edge: KernelId) -> Result<Vec<KernelId>, KernelError> {
        let e = self
            .edges
            .get(&edge)
            .ok_or(KernelError::EntityNotFound { id: edge })?;
        Ok(self
            .body(e.body)?
            .faces
            .iter()
            .copied()
            .filter(|f| {
                self.faces
                    .get(f)
                    .is_some_and(|face| face.co_edges.iter().any(|c| c.edge == edge))
            })
            .collect())
    }

    fn intersect_line_with_face(
        &self,
        face: KernelId,
        origin: Point3d,
        direction: Vec3,
    ) -> Result<Vec<Point3d>, KernelError> {
        let f = self.face(face)?;
        let Some(on_plane) = f.points.first() else {
            return Ok(Vec::new());
        };
        let denom = direction.dot(&f.normal);
        if denom.abs() < MOCK_TOLERANCE {
            return Ok(Vec::new());
        }
        let t = origin.vector_to(on_plane).dot(&f.normal) / denom;
        Ok(vec![origin + direction * t])
    }

    fn point_containment(
        &self,
        body: BodyHandle,
        point: Point3d,
    ) -> Result<Containment, KernelError> {
        let tol = MOCK_TOLERANCE * 1e3;
        let mut on_boundary = false;
        for id in &self.body(body)?.faces {
            let f = self.face(*id)?;
            let Some(on_plane) = f.points.first() else {
                continue;
            };
            let signed = on_plane.vector_to(&point).dot(&f.normal);
            if signed > tol {
                return Ok(Containment::Outside);
            }
            if signed.abs() <= tol {
                on_boundary = true;
            }
        }
        Ok(if on_boundary {
            Containment::On
        } else {
            Containment::Inside
        })
    }

    fn feature_health(&self, feature: KernelId) -> Result<FeatureHealth, KernelError> {
        self.features
            .get(&feature)
            .filter(|f| !f.deleted)
            .map(|f| f.health)
            .ok_or(KernelError::EntityNotFound { id: feature })
    }
}
