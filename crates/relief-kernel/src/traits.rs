use crate::types::*;

/// Core modeling trait: every geometry-creating or geometry-changing call.
/// Implemented by TruckKernel (wraps truck) and MockKernel (deterministic test double).
pub trait Kernel {
    /// Create an empty sketch on the plane of a planar face.
    fn create_sketch(&mut self, face: KernelId) -> Result<KernelId, KernelError>;

    /// Add a line segment to a sketch. Points are in model space and must
    /// lie in the sketch plane.
    fn add_sketch_line(
        &mut self,
        sketch: KernelId,
        start: Point3d,
        end: Point3d,
    ) -> Result<KernelId, KernelError>;

    /// Closed regions formed by the sketch's lines. Ids stay stable until the
    /// next line is added to the sketch.
    fn sketch_profiles(&mut self, sketch: KernelId) -> Result<Vec<ProfileRegion>, KernelError>;

    fn set_sketch_visible(&mut self, sketch: KernelId, visible: bool) -> Result<(), KernelError>;

    /// Create an extrude feature. Returns the feature id; check its health
    /// with [`KernelIntrospect::feature_health`].
    fn extrude(&mut self, spec: &ExtrudeSpec) -> Result<KernelId, KernelError>;

    /// Remove a feature and undo its effect on the bodies it touched.
    fn delete_feature(&mut self, feature: KernelId) -> Result<(), KernelError>;

    /// Copy a body into a transient body that is not part of the design.
    fn copy_body(&mut self, body: BodyHandle) -> Result<BodyHandle, KernelError>;

    /// Create a transient box body.
    fn make_box(&mut self, spec: &OrientedBox) -> Result<BodyHandle, KernelError>;

    /// Replace `seed` with a transient body holding one translated copy of it
    /// per offset. The seed itself is consumed.
    fn pattern_body(
        &mut self,
        seed: BodyHandle,
        offsets: &[Vec3],
    ) -> Result<BodyHandle, KernelError>;

    /// Subtract `tool` from `target` in place. The tool is consumed.
    fn boolean_subtract(&mut self, target: BodyHandle, tool: BodyHandle)
        -> Result<(), KernelError>;

    /// Add a transient body to the design under a name.
    fn commit_body(&mut self, body: BodyHandle, name: &str) -> Result<(), KernelError>;

    fn set_body_visible(&mut self, body: BodyHandle, visible: bool) -> Result<(), KernelError>;
}

/// Read-only topology and geometry queries.
pub trait KernelIntrospect {
    /// Body owning a face.
    fn face_body(&self, face: KernelId) -> Result<BodyHandle, KernelError>;

    fn body_faces(&self, body: BodyHandle) -> Result<Vec<KernelId>, KernelError>;

    fn body_edges(&self, body: BodyHandle) -> Result<Vec<KernelId>, KernelError>;

    /// Unit outward normal of a face at (or nearest to) a point.
    fn face_normal_at(&self, face: KernelId, point: Point3d) -> Result<Vec3, KernelError>;

    /// Boundary loops of a face, outer loop first.
    fn face_loops(&self, face: KernelId) -> Result<Vec<FaceLoop>, KernelError>;

    /// Start and end of an edge in the edge's own direction.
    fn edge_endpoints(&self, edge: KernelId) -> Result<(Point3d, Point3d), KernelError>;

    /// Straight-line length between the edge's endpoints.
    fn edge_length(&self, edge: KernelId) -> Result<f64, KernelError> {
        let (start, end) = self.edge_endpoints(edge)?;
        Ok(start.distance_to(&end))
    }

    /// Faces whose boundary uses an edge.
    fn edge_faces(&self, edge: KernelId) -> Result<Vec<KernelId>, KernelError>;

    /// Intersections of the infinite line through `origin` along `direction`
    /// with the face's underlying (untrimmed) surface.
    fn intersect_line_with_face(
        &self,
        face: KernelId,
        origin: Point3d,
        direction: Vec3,
    ) -> Result<Vec<Point3d>, KernelError>;

    fn point_containment(
        &self,
        body: BodyHandle,
        point: Point3d,
    ) -> Result<Containment, KernelError>;

    fn feature_health(&self, feature: KernelId) -> Result<FeatureHealth, KernelError>;
}
