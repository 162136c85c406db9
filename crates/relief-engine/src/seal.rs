//! Boundary sketch and the steps that seal the image region: the fix-broken
//! prism before cutting and the flush outline wall after it.

use relief_kernel::{
    ExtentDirection, ExtrudeSpec, FeatureHealth, FeatureOperation, KernelError, KernelId,
    Participants,
};
use relief_ops::{KernelBundle, ReliefError};
use relief_types::{DepthBudget, Frame};
use tracing::{debug, warn};

/// Sketch holding only the image rectangle. Created before any geometry
/// changes so it stays on the original face plane.
pub fn boundary_sketch(
    kb: &mut dyn KernelBundle,
    face: KernelId,
    frame: &Frame,
) -> Result<KernelId, ReliefError> {
    let sketch = kb.create_sketch(face)?;
    let corners = frame.outline_corners();
    for i in 0..4 {
        kb.add_sketch_line(sketch, corners[i], corners[(i + 1) % 4])?;
    }
    kb.set_sketch_visible(sketch, false)?;
    Ok(sketch)
}

fn boundary_profiles(
    kb: &mut dyn KernelBundle,
    sketch: KernelId,
) -> Result<Vec<KernelId>, ReliefError> {
    let profiles: Vec<KernelId> = kb.sketch_profiles(sketch)?.iter().map(|p| p.id).collect();
    if profiles.is_empty() {
        return Err(KernelError::SketchFailed {
            reason: "image outline does not close".to_string(),
        }
        .into());
    }
    Ok(profiles)
}

/// Delete a feature that came out with warning or error health.
/// Returns whether the feature was kept.
pub fn keep_if_healthy(kb: &mut dyn KernelBundle, feature: KernelId) -> Result<bool, ReliefError> {
    match kb.feature_health(feature)? {
        FeatureHealth::Healthy => Ok(true),
        health => {
            warn!(feature = feature.0, ?health, "deleting unhealthy feature");
            kb.delete_feature(feature)?;
            Ok(false)
        }
    }
}

/// Join a full-depth prism of the image rectangle to the face's body, so a
/// hollow or broken region is solid before cutting.
pub fn fix_broken(
    kb: &mut dyn KernelBundle,
    boundary: KernelId,
    budget: &DepthBudget,
) -> Result<bool, ReliefError> {
    let spec = ExtrudeSpec {
        sketch: boundary,
        profiles: boundary_profiles(kb, boundary)?,
        operation: FeatureOperation::Join,
        participants: Participants::Auto,
        start_offset: 0.0,
        distance: budget.max_depth,
        direction: ExtentDirection::Negative,
        thin_wall: None,
    };
    let feature = kb.extrude(&spec)?;
    debug!(feature = feature.0, "fix-broken prism joined");
    keep_if_healthy(kb, feature)
}

/// Join a thin wall of `pitch_w / outline_factor` around the image region,
/// full depth, closing the flush relief's sides.
pub fn outline(
    kb: &mut dyn KernelBundle,
    boundary: KernelId,
    frame: &Frame,
    budget: &DepthBudget,
    outline_factor: f64,
    participants: Participants,
) -> Result<bool, ReliefError> {
    if !(outline_factor > 0.0) {
        return Err(ReliefError::InvalidParameter {
            reason: format!("outline factor must be positive (got {outline_factor})"),
        });
    }
    let wall = frame.pitch_w() / outline_factor;
    let spec = ExtrudeSpec {
        sketch: boundary,
        profiles: boundary_profiles(kb, boundary)?,
        operation: FeatureOperation::Join,
        participants,
        start_offset: 0.0,
        distance: budget.max_depth,
        direction: ExtentDirection::Negative,
        thin_wall: Some(wall),
    };
    let feature = kb.extrude(&spec)?;
    debug!(feature = feature.0, wall, "outline joined");
    keep_if_healthy(kb, feature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relief_kernel::{BodyHandle, MockKernel, MockOp};
    use relief_types::{DepthSource, Point3d, Vec3};

    fn setup() -> (MockKernel, BodyHandle, KernelId, Frame) {
        let mut k = MockKernel::new();
        let body = k.add_box_body(
            Point3d::ORIGIN,
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(0.0, 4.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
        );
        let face = k.face_with_normal(body, Vec3::Z).unwrap();
        let frame = Frame {
            origin: Point3d::new(1.0, 1.0, 2.0),
            width_vec: Vec3::new(0.5, 0.0, 0.0),
            height_vec: Vec3::new(0.0, 0.5, 0.0),
            normal: Vec3::Z,
            columns: 4,
            rows: 2,
        };
        (k, body, face, frame)
    }

    fn budget() -> DepthBudget {
        DepthBudget {
            max_depth: 2.0,
            min_depth: 0.5,
            source: DepthSource::Probe,
        }
    }

    #[test]
    fn test_fix_broken_joins_full_depth_prism() {
        let (mut k, body, face, frame) = setup();
        let sketch = boundary_sketch(&mut k, face, &frame).unwrap();
        assert_eq!(k.is_sketch_visible(sketch), Some(false));
        assert!(fix_broken(&mut k, sketch, &budget()).unwrap());
        // 2 x 1 rectangle, 2 deep
        assert!((k.added_volume(body).unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_outline_is_thin_and_full_depth() {
        let (mut k, body, face, frame) = setup();
        let sketch = boundary_sketch(&mut k, face, &frame).unwrap();
        outline(&mut k, sketch, &frame, &budget(), 2.0, Participants::Auto).unwrap();
        let thin = k.ops().iter().find_map(|op| match op {
            MockOp::Extrude { thin, interval, .. } => Some((*thin, *interval)),
            _ => None,
        });
        assert_eq!(thin, Some((true, (-2.0, 0.0))));
        // perimeter 6, wall 0.25, depth 2
        assert!((k.added_volume(body).unwrap() - 3.0).abs() < 1e-9);
        assert!(outline(&mut k, sketch, &frame, &budget(), 0.0, Participants::Auto).is_err());
    }

    #[test]
    fn test_unhealthy_seal_is_deleted() {
        let (mut k, body, face, frame) = setup();
        let sketch = boundary_sketch(&mut k, face, &frame).unwrap();
        k.warn_on_extrude(0);
        assert!(!fix_broken(&mut k, sketch, &budget()).unwrap());
        assert_eq!(k.live_features(), 0);
        assert!(k.added_volume(body).unwrap().abs() < 1e-9);
    }
}
