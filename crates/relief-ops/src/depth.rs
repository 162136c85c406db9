//! Depth Estimator: how deep the relief may cut below the face.

use relief_kernel::{KernelId, KernelIntrospect};
use relief_types::{DepthBudget, DepthPolicy, DepthSource, Frame};
use tracing::{debug, info, instrument, warn};

use crate::types::ReliefError;

/// Depth added to the minimum when the probe ray finds nothing.
pub const FALLBACK_MARGIN: f64 = 0.1;

/// Angle within which an edge counts as parallel to the face normal.
pub const PARALLEL_TOLERANCE: f64 = 1e-6;

/// Distance within which an edge end counts as touching the reference edge.
pub const TOUCH_TOLERANCE: f64 = 1e-7;

/// Measure the usable depth range for one execution.
///
/// Fails with [`ReliefError::MinimumDepthExceeded`] when `min_depth` leaves no
/// room to cut, before any geometry is created.
#[instrument(skip(kernel, frame))]
pub fn estimate_depth(
    kernel: &dyn KernelIntrospect,
    face: KernelId,
    frame: &Frame,
    policy: DepthPolicy,
    min_depth: f64,
) -> Result<DepthBudget, ReliefError> {
    let (max_depth, source) = match policy {
        DepthPolicy::RayProbe => match probe_depth(kernel, face, frame)? {
            Some(depth) => (depth, DepthSource::Probe),
            None => {
                warn!(min_depth, "probe ray found no depth, using fallback");
                (min_depth + FALLBACK_MARGIN, DepthSource::Fallback)
            }
        },
        DepthPolicy::DepthEdge => {
            let depth =
                depth_edge_length(kernel, face, frame)?.ok_or(ReliefError::NoDepthEdgeFound)?;
            (depth, DepthSource::Edge)
        }
    };
    info!(max_depth, ?source, "depth estimated");

    if min_depth >= max_depth {
        return Err(ReliefError::MinimumDepthExceeded {
            min_depth,
            depth: max_depth,
        });
    }
    Ok(DepthBudget {
        max_depth,
        min_depth,
        source,
    })
}

/// Cast a line along the face normal through the frame's sample point and
/// return the distance to the farthest on-or-inside hit behind the face.
///
/// Hits in front of the face are ignored. A plain farthest-hit rule would
/// also count material the normal runs into above the face, such as the
/// overhang of a C-shaped body, and report more depth than there is to cut.
pub fn probe_depth(
    kernel: &dyn KernelIntrospect,
    face: KernelId,
    frame: &Frame,
) -> Result<Option<f64>, ReliefError> {
    let body = kernel.face_body(face)?;
    let sample = frame.sample_point();
    let normal = kernel.face_normal_at(face, sample)?;

    let mut deepest: Option<f64> = None;
    for other in kernel.body_faces(body)? {
        if other == face {
            continue;
        }
        for hit in kernel.intersect_line_with_face(other, sample, normal)? {
            // material above the face is not ours to cut
            if sample.vector_to(&hit).dot(&normal) > TOUCH_TOLERANCE {
                continue;
            }
            if !kernel.point_containment(body, hit)?.is_on_or_inside() {
                continue;
            }
            let distance = sample.distance_to(&hit);
            debug!(face = other.0, distance, "probe hit");
            if deepest.map_or(true, |d| distance > d) {
                deepest = Some(distance);
            }
        }
    }
    Ok(deepest.filter(|d| *d > TOUCH_TOLERANCE))
}

/// Length of the first body edge that runs along the face normal and touches
/// an end of the reference edge.
pub fn depth_edge_length(
    kernel: &dyn KernelIntrospect,
    face: KernelId,
    frame: &Frame,
) -> Result<Option<f64>, ReliefError> {
    let body = kernel.face_body(face)?;
    let ends = [frame.origin, frame.width_end()];
    for edge in kernel.body_edges(body)? {
        let (start, end) = kernel.edge_endpoints(edge)?;
        let dir = start.vector_to(&end);
        if !dir.is_parallel_to(&frame.normal, PARALLEL_TOLERANCE) {
            continue;
        }
        let touches = ends.iter().any(|p| {
            p.distance_to(&start) <= TOUCH_TOLERANCE || p.distance_to(&end) <= TOUCH_TOLERANCE
        });
        if touches {
            return Ok(Some(dir.length()));
        }
    }
    Ok(None)
}
