//! Frame Builder: lays a pixel-pitch coordinate frame on the target face.

use relief_kernel::{CoEdge, KernelId, KernelIntrospect};
use relief_types::{Frame, HeightMode, LENGTH_EPSILON};
use tracing::{debug, info, instrument};

use crate::types::ReliefError;

/// Face, reference edge and optional height edge picked by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSelection {
    pub face: KernelId,
    pub base_edge: KernelId,
    pub height_edge: Option<KernelId>,
}

/// The co-edge through which `face` uses `edge`.
///
/// Outer loops are searched first, so an edge shared by the outer loop and a
/// hole resolves to the outer use.
pub fn find_co_edge(
    kernel: &dyn KernelIntrospect,
    face: KernelId,
    edge: KernelId,
) -> Result<CoEdge, ReliefError> {
    let mut loops = kernel.face_loops(face)?;
    loops.sort_by_key(|l| !l.is_outer);
    loops
        .iter()
        .flat_map(|l| l.co_edges.iter())
        .find(|c| c.edge == edge)
        .copied()
        .ok_or(ReliefError::FrameResolution { face, edge })
}

/// Build the frame for an image of `columns` x `rows` pixels.
///
/// The origin is the reference edge's start as the face's loop traverses it,
/// so the width axis runs along the loop and the height axis (`normal x width`)
/// points into the face.
#[instrument(skip(kernel))]
pub fn build_frame(
    kernel: &dyn KernelIntrospect,
    selection: FrameSelection,
    columns: u32,
    rows: u32,
    height: HeightMode,
) -> Result<Frame, ReliefError> {
    if columns == 0 || rows == 0 {
        return Err(ReliefError::InvalidParameter {
            reason: format!("image must have pixels (got {columns}x{rows})"),
        });
    }
    let FrameSelection {
        face,
        base_edge,
        height_edge,
    } = selection;

    let co_edge = find_co_edge(kernel, face, base_edge)?;
    let (mut origin, mut far) = kernel.edge_endpoints(base_edge)?;
    if co_edge.opposed_to_edge {
        std::mem::swap(&mut origin, &mut far);
    }

    let base = origin.vector_to(&far);
    let base_length = base.length();
    let width_dir = base
        .normalized()
        .ok_or_else(|| ReliefError::InvalidParameter {
            reason: "reference edge has zero length".to_string(),
        })?;

    let normal = kernel
        .face_normal_at(face, origin.midpoint(&far))?
        .normalized()
        .ok_or_else(|| ReliefError::InvalidParameter {
            reason: "face normal is degenerate".to_string(),
        })?;
    // project out any tilt so the frame stays orthonormal
    let height_dir = normal
        .cross(&width_dir)
        .normalized()
        .ok_or_else(|| ReliefError::InvalidParameter {
            reason: "reference edge is parallel to the face normal".to_string(),
        })?;
    let width_dir = height_dir.cross(&normal);

    let pitch_w = base_length / columns as f64;
    let total_height = match height {
        HeightMode::Auto => pitch_w * rows as f64,
        HeightMode::Distance { value } => value,
        HeightMode::Edge => {
            let edge = height_edge.ok_or_else(|| ReliefError::MissingSelection {
                what: "height edge".to_string(),
            })?;
            kernel.edge_length(edge)?
        }
    };
    if !(total_height > LENGTH_EPSILON) || !total_height.is_finite() {
        return Err(ReliefError::InvalidParameter {
            reason: format!("image height must be positive (got {total_height})"),
        });
    }
    let pitch_h = total_height / rows as f64;
    debug!(pitch_w, pitch_h, opposed = co_edge.opposed_to_edge, "pixel pitch");

    let frame = Frame {
        origin,
        width_vec: width_dir * pitch_w,
        height_vec: height_dir * pitch_h,
        normal,
        columns,
        rows,
    };
    info!(
        width = base_length,
        height = total_height,
        "frame on face {:?}",
        face
    );
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relief_kernel::MockKernel;
    use relief_types::{Point3d, Vec3};

    fn slab(k: &mut MockKernel) -> relief_kernel::BodyHandle {
        k.add_box_body(
            Point3d::ORIGIN,
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(0.0, 3.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
        )
    }

    #[test]
    fn test_frame_on_top_face() {
        let mut k = MockKernel::new();
        let body = slab(&mut k);
        let face = k.face_with_normal(body, Vec3::Z).unwrap();
        let base_edge = k
            .edge_between(body, Point3d::new(0.0, 0.0, 2.0), Point3d::new(4.0, 0.0, 2.0))
            .unwrap();
        let selection = FrameSelection {
            face,
            base_edge,
            height_edge: None,
        };
        let frame = build_frame(&k, selection, 8, 4, HeightMode::Auto).unwrap();
        assert_eq!(frame.origin, Point3d::new(0.0, 0.0, 2.0));
        assert!((frame.pitch_w() - 0.5).abs() < 1e-12);
        assert!((frame.pitch_h() - 0.5).abs() < 1e-12);
        assert!(frame.height_dir().dot(&Vec3::Y) > 1.0 - 1e-12);
        assert!(frame.is_orthogonal(1e-9));
    }

    #[test]
    fn test_opposed_co_edge_swaps_origin() {
        let mut k = MockKernel::new();
        let body = slab(&mut k);
        // the front face walks the top-front edge from +x back to the origin
        let face = k.face_with_normal(body, -Vec3::Y).unwrap();
        let base_edge = k
            .edge_between(body, Point3d::new(0.0, 0.0, 2.0), Point3d::new(4.0, 0.0, 2.0))
            .unwrap();
        let selection = FrameSelection {
            face,
            base_edge,
            height_edge: None,
        };
        let frame = build_frame(&k, selection, 4, 1, HeightMode::Auto).unwrap();
        assert_eq!(frame.origin, Point3d::new(4.0, 0.0, 2.0));
        assert!(frame.width_dir().dot(&-Vec3::X) > 1.0 - 1e-12);
        // into the face, i.e. downward
        assert!(frame.height_dir().dot(&-Vec3::Z) > 1.0 - 1e-12);
    }

    #[test]
    fn test_explicit_and_edge_heights() {
        let mut k = MockKernel::new();
        let body = slab(&mut k);
        let face = k.face_with_normal(body, Vec3::Z).unwrap();
        let base_edge = k
            .edge_between(body, Point3d::new(0.0, 0.0, 2.0), Point3d::new(4.0, 0.0, 2.0))
            .unwrap();
        let height_edge = k
            .edge_between(body, Point3d::new(0.0, 0.0, 2.0), Point3d::new(0.0, 3.0, 2.0))
            .unwrap();
        let mut selection = FrameSelection {
            face,
            base_edge,
            height_edge: None,
        };

        let frame = build_frame(&k, selection, 4, 2, HeightMode::Distance { value: 1.0 }).unwrap();
        assert!((frame.pitch_h() - 0.5).abs() < 1e-12);

        assert!(matches!(
            build_frame(&k, selection, 4, 2, HeightMode::Edge),
            Err(ReliefError::MissingSelection { .. })
        ));
        selection.height_edge = Some(height_edge);
        let frame = build_frame(&k, selection, 4, 2, HeightMode::Edge).unwrap();
        assert!((frame.full_height().length() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_edge_not_on_face_is_rejected() {
        let mut k = MockKernel::new();
        let body = slab(&mut k);
        let face = k.face_with_normal(body, Vec3::Z).unwrap();
        let bottom_edge = k
            .edge_between(body, Point3d::ORIGIN, Point3d::new(4.0, 0.0, 0.0))
            .unwrap();
        let selection = FrameSelection {
            face,
            base_edge: bottom_edge,
            height_edge: None,
        };
        assert!(matches!(
            build_frame(&k, selection, 2, 2, HeightMode::Auto),
            Err(ReliefError::FrameResolution { .. })
        ));
        assert!(matches!(
            build_frame(&k, selection, 0, 2, HeightMode::Auto),
            Err(ReliefError::InvalidParameter { .. })
        ));
    }
}
