use serde::{Deserialize, Serialize};

pub use relief_types::{Point3d, Vec3};

/// Opaque handle to a body in the modeling kernel.
/// Valid only for the current kernel session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub(crate) u64);

impl BodyHandle {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Transient kernel entity identifier (face, edge, sketch, profile, feature).
/// Stable within a single kernel session only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KernelId(pub u64);

/// Errors from kernel operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KernelError {
    #[error("boolean operation failed: {reason}")]
    BooleanFailed { reason: String },

    #[error("extrude failed: {reason}")]
    ExtrudeFailed { reason: String },

    #[error("sketch failed: {reason}")]
    SketchFailed { reason: String },

    #[error("entity not found: {id:?}")]
    EntityNotFound { id: KernelId },

    #[error("body not found: {handle:?}")]
    BodyNotFound { handle: BodyHandle },

    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },

    #[error("kernel error: {message}")]
    Other { message: String },
}

/// Where a point lies relative to a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Containment {
    Inside,
    On,
    Outside,
}

impl Containment {
    pub fn is_on_or_inside(self) -> bool {
        matches!(self, Containment::Inside | Containment::On)
    }
}

/// One use of an edge by a face boundary loop.
///
/// Loops run counter-clockwise about the face's outward normal. When
/// `opposed_to_edge` is set, the loop walks the edge from its end to its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoEdge {
    pub edge: KernelId,
    pub opposed_to_edge: bool,
}

/// A closed boundary loop of a face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceLoop {
    pub co_edges: Vec<CoEdge>,
    pub is_outer: bool,
}

/// A closed region the kernel tiled out of a sketch's lines.
///
/// `patches` are the axis-aligned rectangles (in sketch axes) that make up the
/// region, each listed counter-clockwise about the sketch normal.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRegion {
    pub id: KernelId,
    pub bbox_min: Point3d,
    pub bbox_max: Point3d,
    pub patches: Vec<[Point3d; 4]>,
}

impl ProfileRegion {
    pub fn bbox_midpoint(&self) -> Point3d {
        self.bbox_min.midpoint(&self.bbox_max)
    }

    /// Planar area of the region.
    pub fn area(&self) -> f64 {
        self.patches
            .iter()
            .map(|p| p[0].distance_to(&p[1]) * p[1].distance_to(&p[2]))
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureOperation {
    Cut,
    Join,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtentDirection {
    /// Along the sketch normal.
    Positive,
    /// Against the sketch normal.
    Negative,
}

impl ExtentDirection {
    /// `(low, high)` along the normal for `distance` swept from `start`.
    pub fn span(self, start: f64, distance: f64) -> (f64, f64) {
        match self {
            ExtentDirection::Positive => (start, start + distance),
            ExtentDirection::Negative => (start - distance, start),
        }
    }
}

/// Bodies an extrude feature acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Participants {
    /// The body owning the sketch's face.
    Auto,
    Bodies(Vec<BodyHandle>),
}

/// One extrude feature request.
///
/// The swept interval along the sketch normal starts at `start_offset` and
/// runs `distance` in `direction`. With `thin_wall` set, only a wall of that
/// thickness is swept along the outside of each profile boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrudeSpec {
    pub sketch: KernelId,
    pub profiles: Vec<KernelId>,
    pub operation: FeatureOperation,
    pub participants: Participants,
    pub start_offset: f64,
    pub distance: f64,
    pub direction: ExtentDirection,
    pub thin_wall: Option<f64>,
}

impl ExtrudeSpec {
    /// Swept interval `(low, high)` measured along the sketch normal.
    pub fn interval(&self) -> (f64, f64) {
        self.direction.span(self.start_offset, self.distance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureHealth {
    Healthy,
    Warning,
    Error,
}

/// Box given by its center, two in-plane axes and extents.
/// The third axis is `length_dir × width_dir`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    pub center: Point3d,
    pub length_dir: Vec3,
    pub width_dir: Vec3,
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl OrientedBox {
    pub fn height_dir(&self) -> Vec3 {
        self.length_dir.cross(&self.width_dir)
    }

    pub fn volume(&self) -> f64 {
        self.length * self.width * self.height
    }

    /// Minimum corner and the three full edge vectors spanning the box.
    pub fn corner_and_axes(&self) -> (Point3d, Vec3, Vec3, Vec3) {
        let l = self.length_dir * self.length;
        let w = self.width_dir * self.width;
        let h = self.height_dir() * self.height;
        let corner = self.center - l * 0.5 - w * 0.5 - h * 0.5;
        (corner, l, w, h)
    }
}
