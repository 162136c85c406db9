//! TruckKernel: modeling kernel backed by the truck B-rep crates.
//!
//! Face and edge ids are positional: the high 32 bits hold the body handle and
//! the low bits the index of the face (or unique edge, offset by
//! [`EDGE_ID_FLAG`]) in shell order. Any change to a body renumbers them.
//! Sketch, profile and feature ids come from a separate counter.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, instrument, warn};
use truck_modeling::topology::Solid;

use crate::arrangement;
use crate::primitives;
use crate::traits::Kernel;
use crate::truck_introspect::solid_containment;
use crate::types::*;

pub(crate) const BODY_SHIFT: u32 = 32;
pub(crate) const EDGE_ID_FLAG: u64 = 1 << 31;

/// Tolerance used to check sketch geometry against its plane.
pub const SKETCH_TOLERANCE: f64 = 1e-7;

/// Default tolerance handed to truck-shapeops.
pub const DEFAULT_BOOLEAN_TOLERANCE: f64 = 0.05;

pub(crate) struct TruckBody {
    pub(crate) solid: Solid,
    /// Boxes the solid was built from, when it came from make_box or a
    /// pattern of one. Subtraction rebuilds them with clearance.
    boxes: Vec<OrientedBox>,
    name: Option<String>,
    visible: bool,
    in_design: bool,
}

struct TruckSketch {
    body: BodyHandle,
    origin: Point3d,
    normal: Vec3,
    lines: Vec<(Point3d, Point3d)>,
    profiles: Option<Vec<ProfileRegion>>,
    visible: bool,
}

pub(crate) struct TruckFeature {
    /// Bodies as they were before the feature, restored on delete.
    snapshots: Vec<(BodyHandle, Solid)>,
    pub(crate) health: FeatureHealth,
}

/// Fraction of a tool's height at which side clearance is sampled. Air columns
/// grow down from the face, so air near the floor means air all the way up.
const SIDE_SAMPLE_HEIGHT: f64 = 0.01;

/// Prism tool: a counter-clockwise base quad swept along `normal` from
/// `low` to `high`.
#[derive(Debug, Clone, Copy)]
struct ToolBlock {
    quad: [Point3d; 4],
    normal: Vec3,
    low: f64,
    high: f64,
}

impl ToolBlock {
    fn from_box(b: &OrientedBox) -> Self {
        let (corner, l, w, _) = b.corner_and_axes();
        Self {
            quad: [corner, corner + l, corner + l + w, corner + w],
            normal: b.height_dir(),
            low: 0.0,
            high: b.height,
        }
    }

    fn center(&self) -> Point3d {
        let sum = self
            .quad
            .iter()
            .fold(Vec3::ZERO, |acc, p| acc + Point3d::ORIGIN.vector_to(p));
        Point3d::ORIGIN + sum * 0.25 + self.normal * ((self.low + self.high) * 0.5)
    }

    fn solid(&self) -> Result<Solid, KernelError> {
        let base: Vec<Point3d> = self.quad.iter().map(|p| *p + self.normal * self.low).collect();
        primitives::prism(&base, self.normal * (self.high - self.low))
    }

    /// Grow every face of the block that borders air in `target` by
    /// `clearance`, so the tool does not share a plane with the body.
    /// Faces backed by material stay put.
    fn with_clearance(&self, target: &Solid, clearance: f64) -> ToolBlock {
        let air = |p: Point3d| matches!(solid_containment(target, p), Ok(Containment::Outside));
        let n = self.normal;
        let sample_height = self.low + (self.high - self.low) * SIDE_SAMPLE_HEIGHT;
        let mut shifts = [Vec3::ZERO; 4];
        for i in 0..4 {
            let a = self.quad[i];
            let b = self.quad[(i + 1) % 4];
            let Some(dir) = a.vector_to(&b).normalized() else {
                continue;
            };
            let out = dir.cross(&n) * clearance;
            if air(a.midpoint(&b) + out + n * sample_height) {
                shifts[i] = out;
            }
        }

        let mut grown = *self;
        for i in 0..4 {
            grown.quad[i] = self.quad[i] + shifts[(i + 3) % 4] + shifts[i];
        }
        let center = self.center();
        let half = (self.high - self.low) * 0.5;
        if air(center + n * (half + clearance)) {
            grown.high += clearance;
        }
        if air(center - n * (half + clearance)) {
            grown.low -= clearance;
        }
        grown
    }

    /// Whether the block lies wholly inside `target`, judged at its center
    /// and at its corners pulled slightly inward.
    fn is_inside(&self, target: &Solid) -> bool {
        let center = self.center();
        let inside = |p: Point3d| matches!(solid_containment(target, p), Ok(Containment::Inside));
        inside(center)
            && [self.low, self.high].iter().all(|h| {
                self.quad.iter().all(|q| {
                    let corner = *q + self.normal * *h;
                    inside(corner + corner.vector_to(&center) * 0.01)
                })
            })
    }
}

/// Run a truck-shapeops boolean, turning a `None` result or a panic inside
/// the library into [`KernelError::BooleanFailed`].
fn guarded_boolean<F>(name: &str, op: F) -> Result<Solid, KernelError>
where
    F: FnOnce() -> Option<Solid>,
{
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(Some(solid)) => Ok(solid),
        Ok(None) => Err(KernelError::BooleanFailed {
            reason: format!("truck {name}() returned None"),
        }),
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(operation = name, %detail, "truck boolean panicked");
            Err(KernelError::BooleanFailed {
                reason: format!("truck {name}() panicked: {detail}"),
            })
        }
    }
}

/// Modeling kernel backed by the truck B-rep library.
pub struct TruckKernel {
    next_handle: u64,
    next_id: u64,
    boolean_tolerance: f64,
    pub(crate) bodies: HashMap<u64, TruckBody>,
    sketches: HashMap<KernelId, TruckSketch>,
    pub(crate) features: HashMap<KernelId, TruckFeature>,
}

impl TruckKernel {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            next_id: 1,
            boolean_tolerance: DEFAULT_BOOLEAN_TOLERANCE,
            bodies: HashMap::new(),
            sketches: HashMap::new(),
            features: HashMap::new(),
        }
    }

    /// Use a finer boolean tolerance, needed when pixels are small relative
    /// to the default.
    pub fn with_boolean_tolerance(mut self, tolerance: f64) -> Self {
        self.boolean_tolerance = tolerance;
        self
    }

    fn alloc_handle(&mut self) -> BodyHandle {
        let h = BodyHandle(self.next_handle);
        self.next_handle += 1;
        h
    }

    fn alloc_id(&mut self) -> KernelId {
        let id = KernelId(self.next_id);
        self.next_id += 1;
        id
    }

    fn store(&mut self, solid: Solid, in_design: bool) -> BodyHandle {
        let handle = self.alloc_handle();
        self.bodies.insert(
            handle.0,
            TruckBody {
                solid,
                boxes: Vec::new(),
                name: None,
                visible: true,
                in_design,
            },
        );
        handle
    }

    /// Add an existing truck solid to the design.
    pub fn add_design_body(&mut self, solid: Solid) -> BodyHandle {
        self.store(solid, true)
    }

    pub fn solid(&self, body: BodyHandle) -> Option<&Solid> {
        self.bodies.get(&body.0).map(|b| &b.solid)
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

    pub fn is_sketch_visible(&self, sketch: KernelId) -> Option<bool> {
        self.sketches.get(&sketch).map(|s| s.visible)
    }

    pub(crate) fn body_ref(&self, handle: BodyHandle) -> Result<&TruckBody, KernelError> {
        self.bodies
            .get(&handle.0)
            .ok_or(KernelError::BodyNotFound { handle })
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut TruckBody, KernelError> {
        self.bodies
            .get_mut(&handle.0)
            .ok_or(KernelError::BodyNotFound { handle })
    }

    fn sketch_mut(&mut self, sketch: KernelId) -> Result<&mut TruckSketch, KernelError> {
        self.sketches
            .get_mut(&sketch)
            .ok_or(KernelError::EntityNotFound { id: sketch })
    }

    /// Distance cut tools are grown into neighbouring air.
    fn clearance(&self) -> f64 {
        self.boolean_tolerance * 2.0
    }

    fn subtract(&self, target: &Solid, tool: &Solid) -> Result<Solid, KernelError> {
        let mut inverted = tool.clone();
        // subtraction is A ∩ ¬B; not() flips in place
        inverted.not();
        let tol = self.boolean_tolerance;
        guarded_boolean("and", || truck_shapeops::and(target, &inverted, tol))
    }

    fn union(&self, target: &Solid, tool: &Solid) -> Result<Solid, KernelError> {
        let tol = self.boolean_tolerance;
        guarded_boolean("or", || truck_shapeops::or(target, tool, tol))
    }

    /// Cut one block out of `target`, grown clear of coplanar faces first.
    fn cut_block(&self, target: &Solid, block: &ToolBlock) -> Result<Solid, KernelError> {
        let tool = block.with_clearance(target, self.clearance()).solid()?;
        self.subtract(target, &tool)
    }

    /// Tool blocks for one extrude request.
    fn extrude_tools(
        &self,
        sketch: &TruckSketch,
        spec: &ExtrudeSpec,
        profiles: &[ProfileRegion],
    ) -> Result<Vec<ToolBlock>, KernelError> {
        let (low, high) = spec.interval();
        let n = sketch.normal;

        let mut tools = Vec::new();
        for id in &spec.profiles {
            let region = profiles
                .iter()
                .find(|p| p.id == *id)
                .ok_or(KernelError::EntityNotFound { id: *id })?;
            for patch in &region.patches {
                let base: Vec<[Point3d; 4]> = match spec.thin_wall {
                    Some(wall) => primitives::wall_strips(patch, n, wall),
                    None => vec![*patch],
                };
                tools.extend(base.into_iter().map(|quad| ToolBlock {
                    quad,
                    normal: n,
                    low,
                    high,
                }));
            }
        }
        Ok(tools)
    }
}

impl Default for TruckKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel for TruckKernel {
    fn create_sketch(&mut self, face: KernelId) -> Result<KernelId, KernelError> {
        let (body, truck_face) = self.resolve_face(face)?;
        let normal = crate::truck_introspect::planar_normal(&truck_face)
            .ok_or_else(|| KernelError::NotSupported {
                operation: "sketch on a non-planar face".to_string(),
            })?;
        let origin = truck_face
            .boundaries()
            .first()
            .and_then(|w| w.vertex_iter().next())
            .map(|v| primitives::from_point3(v.point()))
            .ok_or(KernelError::EntityNotFound { id: face })?;
        let sketch = self.alloc_id();
        self.sketches.insert(
            sketch,
            TruckSketch {
                body,
                origin,
                normal,
                lines: Vec::new(),
                profiles: None,
                visible: true,
            },
        );
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
            if s.origin.vector_to(&p).dot(&s.normal).abs() > SKETCH_TOLERANCE {
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
        let regions = arrangement::closed_regions(s.origin, s.normal, &s.lines, SKETCH_TOLERANCE)?;
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

    #[instrument(skip(self, spec), fields(sketch = spec.sketch.0, profiles = spec.profiles.len()))]
    fn extrude(&mut self, spec: &ExtrudeSpec) -> Result<KernelId, KernelError> {
        if !(spec.distance > 0.0) || !spec.distance.is_finite() {
            return Err(KernelError::ExtrudeFailed {
                reason: format!("extent distance must be positive (got {})", spec.distance),
            });
        }
        let profiles = self.sketch_profiles(spec.sketch)?;
        let sketch = self
            .sketches
            .get(&spec.sketch)
            .ok_or(KernelError::EntityNotFound { id: spec.sketch })?;
        let tools = self.extrude_tools(sketch, spec, &profiles)?;
        if tools.is_empty() {
            return Err(KernelError::ExtrudeFailed {
                reason: "no profiles selected".to_string(),
            });
        }
        let targets = match &spec.participants {
            Participants::Auto => vec![sketch.body],
            Participants::Bodies(list) => list.clone(),
        };

        let mut snapshots = Vec::with_capacity(targets.len());
        let mut results = Vec::with_capacity(targets.len());
        for target in &targets {
            let before = self.body_ref(*target)?.solid.clone();
            let mut current = before.clone();
            for block in &tools {
                current = match spec.operation {
                    FeatureOperation::Cut => self.cut_block(&current, block)?,
                    // nothing to add where the body is already solid
                    FeatureOperation::Join if block.is_inside(&current) => continue,
                    FeatureOperation::Join => self.union(&current, &block.solid()?)?,
                };
            }
            snapshots.push((*target, before));
            results.push((*target, current));
        }
        for (target, solid) in results {
            self.body_mut(target)?.solid = solid;
        }

        let feature = self.alloc_id();
        debug!(feature = feature.0, tools = tools.len(), "extrude applied");
        self.features.insert(
            feature,
            TruckFeature {
                snapshots,
                health: FeatureHealth::Healthy,
            },
        );
        Ok(feature)
    }

    /// Restores the bodies to their state before the feature. Only exact when
    /// the feature is the latest change to those bodies.
    fn delete_feature(&mut self, feature: KernelId) -> Result<(), KernelError> {
        let record = self
            .features
            .remove(&feature)
            .ok_or(KernelError::EntityNotFound { id: feature })?;
        if record.health != FeatureHealth::Healthy {
            debug!(feature = feature.0, "removing unhealthy feature");
        }
        for (body, solid) in record.snapshots {
            match self.bodies.get_mut(&body.0) {
                Some(b) => b.solid = solid,
                None => warn!(body = body.0, "body vanished before feature delete"),
            }
        }
        Ok(())
    }

    fn copy_body(&mut self, body: BodyHandle) -> Result<BodyHandle, KernelError> {
        let solid = self.body_ref(body)?.solid.clone();
        Ok(self.store(solid, false))
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
        let solid = primitives::oriented_box(corner, l, w, h);
        let handle = self.store(solid, false);
        self.body_mut(handle)?.boxes = vec![*spec];
        Ok(handle)
    }

    fn pattern_body(
        &mut self,
        seed: BodyHandle,
        offsets: &[Vec3],
    ) -> Result<BodyHandle, KernelError> {
        if offsets.is_empty() {
            return Err(KernelError::Other {
                message: "pattern needs at least one offset".to_string(),
            });
        }
        let seed_body = self.body_ref(seed)?;
        let seed_solid = seed_body.solid.clone();
        let boxes: Vec<OrientedBox> = offsets
            .iter()
            .flat_map(|offset| {
                seed_body.boxes.iter().map(move |b| OrientedBox {
                    center: b.center + *offset,
                    ..*b
                })
            })
            .collect();
        let shells: Vec<_> = offsets
            .iter()
            .flat_map(|offset| {
                let moved = truck_modeling::builder::translated(
                    &seed_solid,
                    primitives::to_vector3(*offset),
                );
                moved.boundaries().clone()
            })
            .collect();
        let solid = Solid::try_new(shells).map_err(|e| KernelError::Other {
            message: format!("pattern produced an invalid solid: {}", e),
        })?;
        self.bodies.remove(&seed.0);
        let handle = self.store(solid, false);
        self.body_mut(handle)?.boxes = boxes;
        Ok(handle)
    }

    fn boolean_subtract(
        &mut self,
        target: BodyHandle,
        tool: BodyHandle,
    ) -> Result<(), KernelError> {
        let (tool_solid, boxes) = {
            let t = self.body_ref(tool)?;
            (t.solid.clone(), t.boxes.clone())
        };
        let mut current = self.body_ref(target)?.solid.clone();
        if boxes.is_empty() {
            current = self.subtract(&current, &tool_solid)?;
        } else {
            // pattern copies go one at a time so each sees the cuts before it
            for b in &boxes {
                current = self.cut_block(&current, &ToolBlock::from_box(b))?;
            }
        }
        self.body_mut(target)?.solid = current;
        self.bodies.remove(&tool.0);
        Ok(())
    }

    fn commit_body(&mut self, body: BodyHandle, name: &str) -> Result<(), KernelError> {
        let b = self.body_mut(body)?;
        b.in_design = true;
        b.name = Some(name.to_string());
        Ok(())
    }

    fn set_body_visible(&mut self, body: BodyHandle, visible: bool) -> Result<(), KernelError> {
        self.body_mut(body)?.visible = visible;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::KernelIntrospect;

    fn slab(kernel: &mut TruckKernel) -> BodyHandle {
        let solid = primitives::oriented_box(
            Point3d::ORIGIN,
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        kernel.add_design_body(solid)
    }

    #[test]
    fn test_sketch_on_top_face_finds_profiles() {
        let mut kernel = TruckKernel::new();
        let body = slab(&mut kernel);
        let top = kernel
            .body_faces(body)
            .unwrap()
            .into_iter()
            .find(|f| {
                kernel
                    .face_normal_at(*f, Point3d::ORIGIN)
                    .is_ok_and(|n| n.dot(&Vec3::Z) > 0.99)
            })
            .unwrap();
        let sketch = kernel.create_sketch(top).unwrap();
        let z = 1.0;
        let pts = [
            Point3d::new(0.0, 0.0, z),
            Point3d::new(1.0, 0.0, z),
            Point3d::new(1.0, 1.0, z),
            Point3d::new(0.0, 1.0, z),
        ];
        for i in 0..4 {
            kernel.add_sketch_line(sketch, pts[i], pts[(i + 1) % 4]).unwrap();
        }
        let profiles = kernel.sketch_profiles(sketch).unwrap();
        assert_eq!(profiles.len(), 1);
        kernel.set_sketch_visible(sketch, false).unwrap();
        assert_eq!(kernel.is_sketch_visible(sketch), Some(false));
        assert!(kernel
            .add_sketch_line(sketch, Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0))
            .is_err());
    }

    #[test]
    fn test_copy_commit_and_hide() {
        let mut kernel = TruckKernel::new();
        let body = slab(&mut kernel);
        let copy = kernel.copy_body(body).unwrap();
        assert_eq!(kernel.is_in_design(copy), Some(false));
        kernel.commit_body(copy, "Image Relief").unwrap();
        kernel.set_body_visible(body, false).unwrap();
        assert_eq!(kernel.body_name(copy), Some("Image Relief"));
        assert_eq!(kernel.is_body_visible(body), Some(false));
        assert_eq!(kernel.is_in_design(copy), Some(true));
    }

    #[test]
    fn test_panicking_boolean_becomes_error() {
        let result = guarded_boolean("and", || -> Option<Solid> {
            panic!("This wire is not simple")
        });
        match result {
            Err(KernelError::BooleanFailed { reason }) => assert!(reason.contains("not simple")),
            other => panic!("expected BooleanFailed, got {:?}", other.map(|_| ())),
        }
        assert!(matches!(
            guarded_boolean("or", || None),
            Err(KernelError::BooleanFailed { .. })
        ));
    }

    fn cell_block(x: f64, y: f64) -> ToolBlock {
        ToolBlock {
            quad: [
                Point3d::new(x, y, 1.0),
                Point3d::new(x + 1.0, y, 1.0),
                Point3d::new(x + 1.0, y + 1.0, 1.0),
                Point3d::new(x, y + 1.0, 1.0),
            ],
            normal: Vec3::Z,
            low: -0.5,
            high: 0.0,
        }
    }

    #[test]
    fn test_clearance_grows_only_into_air() {
        let mut kernel = TruckKernel::new();
        let body = slab(&mut kernel);
        let solid = kernel.solid(body).unwrap().clone();
        let c = kernel.clearance();

        // interior cell: walls backed by material, only the cap reaches air
        let inner = cell_block(1.5, 0.5);
        let grown = inner.with_clearance(&solid, c);
        assert_eq!(grown.quad, inner.quad);
        assert!((grown.high - c).abs() < 1e-12);
        assert!((grown.low + 0.5).abs() < 1e-12);

        // corner cell: the two outer walls move out, the inner ones stay
        let corner = cell_block(0.0, 0.0);
        let grown = corner.with_clearance(&solid, c);
        assert!((grown.quad[0].x + c).abs() < 1e-12);
        assert!((grown.quad[0].y + c).abs() < 1e-12);
        assert!((grown.quad[2].x - 1.0).abs() < 1e-12);
        assert!((grown.quad[2].y - 1.0).abs() < 1e-12);
        assert!((grown.quad[1].x - 1.0).abs() < 1e-12);
        assert!((grown.quad[1].y + c).abs() < 1e-12);
    }

    #[test]
    fn test_block_inside_check() {
        let mut kernel = TruckKernel::new();
        let body = slab(&mut kernel);
        let solid = kernel.solid(body).unwrap().clone();
        assert!(cell_block(1.5, 0.5).is_inside(&solid));

        let mut poking = cell_block(1.5, 0.5);
        poking.high = 0.5;
        assert!(!poking.is_inside(&solid));
        assert!(!cell_block(3.5, 0.5).is_inside(&solid));
    }

    #[test]
    fn test_box_tools_remember_their_boxes() {
        let mut kernel = TruckKernel::new();
        let spec = OrientedBox {
            center: Point3d::new(0.5, 0.5, 0.75),
            length_dir: Vec3::X,
            width_dir: Vec3::Y,
            length: 1.0,
            width: 1.0,
            height: 0.5,
        };
        let seed = kernel.make_box(&spec).unwrap();
        let offsets = [Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)];
        let pattern = kernel.pattern_body(seed, &offsets).unwrap();
        let boxes = &kernel.body_ref(pattern).unwrap().boxes;
        assert_eq!(boxes.len(), 2);
        assert!((boxes[1].center.x - 2.5).abs() < 1e-12);
        assert!(kernel.body_ref(seed).is_err());

        let block = ToolBlock::from_box(&boxes[1]);
        let center = block.center();
        assert!((center.x - 2.5).abs() < 1e-12);
        assert!((center.z - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_requests() {
        let mut kernel = TruckKernel::new();
        let body = slab(&mut kernel);
        let flat = OrientedBox {
            center: Point3d::ORIGIN,
            length_dir: Vec3::X,
            width_dir: Vec3::Y,
            length: 1.0,
            width: 1.0,
            height: 0.0,
        };
        assert!(kernel.make_box(&flat).is_err());
        assert!(kernel.pattern_body(body, &[]).is_err());
        assert!(matches!(
            kernel.delete_feature(KernelId(999)),
            Err(KernelError::EntityNotFound { .. })
        ));
    }
}
