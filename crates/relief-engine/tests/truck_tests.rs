//! Whole runs against the truck-backed kernel.

use relief_engine::*;
use relief_kernel::primitives::oriented_box;
use relief_kernel::{BodyHandle, KernelError, KernelIntrospect, TruckKernel};
use relief_ops::{FrameSelection, NoProgress, ReliefError};
use relief_types::{GridStrategy, IntensityImage, Point3d, ReliefParams, Vec3};
use uuid::Uuid;

fn same_point(a: Point3d, b: Point3d) -> bool {
    a.distance_to(&b) < 1e-9
}

/// 2 x 4 x 10 block at the origin, relief on the top face.
fn block(k: &mut TruckKernel) -> (BodyHandle, FrameSelection) {
    let body = k.add_design_body(oriented_box(
        Point3d::ORIGIN,
        Vec3::new(2.0, 0.0, 0.0),
        Vec3::new(0.0, 4.0, 0.0),
        Vec3::new(0.0, 0.0, 10.0),
    ));
    let face = k
        .body_faces(body)
        .unwrap()
        .into_iter()
        .find(|f| {
            k.face_normal_at(*f, Point3d::new(1.0, 2.0, 10.0))
                .is_ok_and(|n| n.dot(&Vec3::Z) > 0.99)
        })
        .unwrap();
    let (a, b) = (Point3d::new(0.0, 0.0, 10.0), Point3d::new(2.0, 0.0, 10.0));
    let base_edge = k
        .body_edges(body)
        .unwrap()
        .into_iter()
        .find(|e| {
            k.edge_endpoints(*e).is_ok_and(|(s, t)| {
                (same_point(s, a) && same_point(t, b)) || (same_point(s, b) && same_point(t, a))
            })
        })
        .unwrap();
    (
        body,
        FrameSelection {
            face,
            base_edge,
            height_edge: None,
        },
    )
}

/// A run either finishes or reports a failed boolean; it never unwinds.
fn assert_settles(strategy: GridStrategy, flush: bool, fix_broken: bool) {
    let mut k = TruckKernel::new();
    let (_, selection) = block(&mut k);
    let image = IntensityImage::from_raw(2, 2, vec![0, 128, 255, 64]).unwrap();
    let params = ReliefParams {
        min_depth: 1.0,
        flush,
        fix_broken,
        strategy,
        ..Default::default()
    };
    let result = run_relief(
        &mut k,
        &mut NoProgress,
        &image,
        selection,
        &params,
        Uuid::new_v4(),
    );
    match result {
        Ok(outcome) => {
            assert_eq!(outcome.completion, Completion::Done);
            if let Some(body) = outcome.result_body {
                assert_eq!(k.body_name(body), Some(RESULT_BODY_NAME));
            }
        }
        Err(failure) => {
            assert!(
                matches!(
                    failure.error,
                    ReliefError::Kernel(KernelError::BooleanFailed { .. })
                ),
                "{strategy:?} flush={flush} fix={fix_broken}: {failure}"
            );
            assert!(failure.context.is_some());
        }
    }
}

#[test]
fn raster_runs_settle_on_truck() {
    for (flush, fix) in [(false, false), (true, false), (false, true), (true, true)] {
        assert_settles(GridStrategy::RasterLine, flush, fix);
    }
}

#[test]
fn direct_volume_run_settles_on_truck() {
    assert_settles(GridStrategy::DirectVolume, false, false);
    assert_settles(GridStrategy::DirectVolume, true, true);
}

#[test]
fn pattern_run_settles_on_truck() {
    assert_settles(GridStrategy::PatternReplicated, false, false);
    assert_settles(GridStrategy::PatternReplicated, true, true);
}
