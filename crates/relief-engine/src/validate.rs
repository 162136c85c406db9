//! Dialog-side checks: selection filters, input validation and preview.

use relief_kernel::{KernelId, KernelIntrospect};
use relief_ops::{build_frame, estimate_depth, FrameSelection, ReliefError};
use relief_types::{DepthBudget, Frame, HeightMode, IntensityImage, Point3d};
use tracing::instrument;

use crate::types::ReliefInputs;

/// Angle within which a height edge counts as perpendicular to the base edge.
pub const PERPENDICULAR_TOLERANCE: f64 = 1e-6;

/// A base edge must bound the selected face.
pub fn is_selectable_base_edge(
    kernel: &dyn KernelIntrospect,
    face: KernelId,
    edge: KernelId,
) -> bool {
    kernel
        .edge_faces(edge)
        .is_ok_and(|faces| faces.contains(&face))
}

/// A height edge must bound the face and run perpendicular to the base edge.
pub fn is_selectable_height_edge(
    kernel: &dyn KernelIntrospect,
    face: KernelId,
    base_edge: KernelId,
    edge: KernelId,
) -> bool {
    if !is_selectable_base_edge(kernel, face, edge) {
        return false;
    }
    match (kernel.edge_endpoints(base_edge), kernel.edge_endpoints(edge)) {
        (Ok((a0, a1)), Ok((b0, b1))) => a0
            .vector_to(&a1)
            .is_perpendicular_to(&b0.vector_to(&b1), PERPENDICULAR_TOLERANCE),
        _ => false,
    }
}

/// Check that everything needed to run is present and in range.
pub fn validate_inputs(
    kernel: &dyn KernelIntrospect,
    image: Option<&IntensityImage>,
    inputs: &ReliefInputs,
) -> Result<FrameSelection, ReliefError> {
    if image.is_none() {
        return Err(missing("image"));
    }
    let face = inputs.face.ok_or_else(|| missing("face"))?;
    let base_edge = inputs.base_edge.ok_or_else(|| missing("base edge"))?;
    inputs.params.validate()?;

    if !is_selectable_base_edge(kernel, face, base_edge) {
        return Err(ReliefError::FrameResolution {
            face,
            edge: base_edge,
        });
    }
    let height_edge = match inputs.params.height {
        HeightMode::Edge => {
            let edge = inputs.height_edge.ok_or_else(|| missing("height edge"))?;
            if !is_selectable_height_edge(kernel, face, base_edge, edge) {
                return Err(ReliefError::InvalidParameter {
                    reason: "height edge must bound the face and be perpendicular to the base edge"
                        .to_string(),
                });
            }
            Some(edge)
        }
        _ => None,
    };

    Ok(FrameSelection {
        face,
        base_edge,
        height_edge,
    })
}

fn missing(what: &str) -> ReliefError {
    ReliefError::MissingSelection {
        what: what.to_string(),
    }
}

/// What the dialog draws before the user commits.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub frame: Frame,
    pub budget: DepthBudget,
    /// Image region corners, counter-clockwise about the face normal.
    pub outline: [Point3d; 4],
    /// `(pitch_w, pitch_h)`.
    pub pixel_pitch: (f64, f64),
    pub pixel_count: usize,
}

/// Frame the image and estimate depth without touching geometry.
#[instrument(skip(kernel, image, inputs))]
pub fn preview(
    kernel: &dyn KernelIntrospect,
    image: Option<&IntensityImage>,
    inputs: &ReliefInputs,
) -> Result<Preview, ReliefError> {
    let selection = validate_inputs(kernel, image, inputs)?;
    let image = image.ok_or_else(|| missing("image"))?;
    let params = &inputs.params;
    let frame = build_frame(kernel, selection, image.width(), image.height(), params.height)?;
    let budget = estimate_depth(
        kernel,
        selection.face,
        &frame,
        params.depth_policy,
        params.min_depth,
    )?;
    Ok(Preview {
        frame,
        budget,
        outline: frame.outline_corners(),
        pixel_pitch: (frame.pitch_w(), frame.pitch_h()),
        pixel_count: image.pixel_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use relief_kernel::{BodyHandle, MockKernel};
    use relief_types::{ReliefParams, Vec3};

    fn slab(k: &mut MockKernel) -> BodyHandle {
        k.add_box_body(
            Point3d::ORIGIN,
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        )
    }

    fn top_inputs(k: &MockKernel, body: BodyHandle) -> ReliefInputs {
        ReliefInputs {
            face: k.face_with_normal(body, Vec3::Z),
            base_edge: k.edge_between(
                body,
                Point3d::new(0.0, 0.0, 1.0),
                Point3d::new(4.0, 0.0, 1.0),
            ),
            height_edge: None,
            params: ReliefParams::default(),
        }
    }

    #[test]
    fn test_selection_filters() {
        let mut k = MockKernel::new();
        let body = slab(&mut k);
        let inputs = top_inputs(&k, body);
        let (face, base) = (inputs.face.unwrap(), inputs.base_edge.unwrap());
        let left = k
            .edge_between(body, Point3d::new(0.0, 0.0, 1.0), Point3d::new(0.0, 2.0, 1.0))
            .unwrap();
        let back = k
            .edge_between(body, Point3d::new(0.0, 2.0, 1.0), Point3d::new(4.0, 2.0, 1.0))
            .unwrap();
        let bottom = k
            .edge_between(body, Point3d::ORIGIN, Point3d::new(4.0, 0.0, 0.0))
            .unwrap();

        assert!(is_selectable_base_edge(&k, face, base));
        assert!(!is_selectable_base_edge(&k, face, bottom));
        assert!(is_selectable_height_edge(&k, face, base, left));
        assert!(!is_selectable_height_edge(&k, face, base, back));
    }

    #[test]
    fn test_validate_reports_first_missing_input() {
        let mut k = MockKernel::new();
        let body = slab(&mut k);
        let image = IntensityImage::from_raw(2, 1, vec![0, 255]).unwrap();
        let mut inputs = top_inputs(&k, body);

        assert!(matches!(
            validate_inputs(&k, None, &inputs),
            Err(ReliefError::MissingSelection { what }) if what == "image"
        ));
        assert!(validate_inputs(&k, Some(&image), &inputs).is_ok());

        inputs.params.height = HeightMode::Edge;
        assert!(matches!(
            validate_inputs(&k, Some(&image), &inputs),
            Err(ReliefError::MissingSelection { what }) if what == "height edge"
        ));

        inputs.params.height = HeightMode::Auto;
        inputs.params.outline_factor = -1.0;
        assert!(matches!(
            validate_inputs(&k, Some(&image), &inputs),
            Err(ReliefError::Param(_))
        ));

        inputs.base_edge = None;
        assert!(matches!(
            validate_inputs(&k, Some(&image), &inputs),
            Err(ReliefError::MissingSelection { what }) if what == "base edge"
        ));
    }

    #[test]
    fn test_preview_does_not_touch_geometry() {
        let mut k = MockKernel::new();
        let body = slab(&mut k);
        let image = IntensityImage::from_raw(4, 2, vec![0; 8]).unwrap();
        let inputs = top_inputs(&k, body);
        let p = preview(&k, Some(&image), &inputs).unwrap();
        assert_eq!(p.pixel_pitch, (1.0, 1.0));
        assert_eq!(p.pixel_count, 8);
        assert!((p.budget.max_depth - 1.0).abs() < 1e-9);
        assert_eq!(p.outline[2], Point3d::new(4.0, 2.0, 1.0));
        assert!(k.ops().is_empty());
    }
}
