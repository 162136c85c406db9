use proptest::prelude::*;

use relief_kernel::{Kernel, MockKernel};
use relief_ops::{
    bucket_cells, build_frame, cutting_levels, estimate_depth, level_depth, shifted_intensity,
    FrameSelection, PixelGrid, RegionAssignment, ReliefError, ReliefMode,
};
use relief_types::{
    DepthBudget, DepthPolicy, DepthSource, Frame, HeightMode, IntensityImage, PixelCell, Point3d,
    Vec3,
};

fn budget(max_depth: f64, min_depth: f64) -> DepthBudget {
    DepthBudget {
        max_depth,
        min_depth,
        source: DepthSource::Probe,
    }
}

fn unit_frame(columns: u32, rows: u32) -> Frame {
    Frame {
        origin: Point3d::ORIGIN,
        width_vec: Vec3::X,
        height_vec: Vec3::Y,
        normal: Vec3::Z,
        columns,
        rows,
    }
}

// ── Mapping ────────────────────────────────────────────────────────────────

#[test]
fn two_by_two_scenario() {
    let image = IntensityImage::from_raw(2, 2, vec![0, 128, 255, 64]).unwrap();
    let grid = PixelGrid::new(unit_frame(2, 2));
    let buckets = bucket_cells(&image, grid.cells());

    assert_eq!(buckets.get(0), Some(&[PixelCell::new(0, 0)][..]));
    assert_eq!(buckets.get(128), Some(&[PixelCell::new(1, 0)][..]));
    assert_eq!(buckets.get(255), Some(&[PixelCell::new(0, 1)][..]));
    assert_eq!(buckets.get(64), Some(&[PixelCell::new(1, 1)][..]));

    let b = budget(10.0, 0.0);
    assert!((level_depth(128, 0, &b) - 5.0196).abs() < 1e-4);
    assert!((level_depth(255, 0, &b) - 10.0).abs() < 1e-12);
    assert!((level_depth(64, 0, &b) - 2.5098).abs() < 1e-4);

    let cuts = cutting_levels(&buckets, 0, &b, ReliefMode::Cut);
    let levels: Vec<u8> = cuts.iter().map(|c| c.level).collect();
    assert_eq!(levels, vec![64, 128, 255]);
}

#[test]
fn mapping_is_repeatable() {
    let samples: Vec<u8> = (0..64u32).map(|i| (i * 37 % 256) as u8).collect();
    let image = IntensityImage::from_raw(8, 8, samples).unwrap();
    let grid = PixelGrid::new(unit_frame(8, 8));
    let first = bucket_cells(&image, grid.cells());
    let second = bucket_cells(&image, grid.cells());
    assert_eq!(first, second);
    assert_eq!(first.item_count(), 64);
}

proptest! {
    #[test]
    fn shift_is_monotonic(v in any::<u8>(), s1 in -100i32..=100, s2 in -100i32..=100) {
        let (lo, hi) = if s1 <= s2 { (s1, s2) } else { (s2, s1) };
        prop_assert!(shifted_intensity(v, lo) <= shifted_intensity(v, hi));
    }

    #[test]
    fn depth_is_linear_in_intensity(v in 0u8..=127, max in 1.0f64..100.0) {
        let b = budget(max, 0.5);
        let single = level_depth(v, 0, &b);
        let double = level_depth(v * 2, 0, &b);
        prop_assert!((double - 2.0 * single).abs() < 1e-9);
    }

    #[test]
    fn every_pixel_gets_one_cell(w in 1u32..40, h in 1u32..40) {
        let grid = PixelGrid::new(unit_frame(w, h));
        let cells: std::collections::HashSet<_> = grid.cells().collect();
        prop_assert_eq!(cells.len(), (w * h) as usize);
        let (fw, fh) = grid.footprint();
        prop_assert!((fw - w as f64).abs() < 1e-9);
        prop_assert!((fh - h as f64).abs() < 1e-9);
    }

    #[test]
    fn cell_centers_map_back_to_their_cell(w in 1u32..30, h in 1u32..30, pw in 0.1f64..5.0, ph in 0.1f64..5.0) {
        let frame = Frame {
            width_vec: Vec3::X * pw,
            height_vec: Vec3::Y * ph,
            ..unit_frame(w, h)
        };
        let grid = PixelGrid::new(frame);
        for cell in grid.cells() {
            prop_assert_eq!(grid.assign_region(frame.cell_center(cell)), RegionAssignment::Cell(cell));
        }
    }
}

// ── Kernel-backed stages ───────────────────────────────────────────────────

#[test]
fn raster_lines_tile_one_profile_per_pixel() {
    let mut k = MockKernel::new();
    let body = k.add_box_body(
        Point3d::ORIGIN,
        Vec3::new(6.0, 0.0, 0.0),
        Vec3::new(0.0, 6.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
    );
    let face = k.face_with_normal(body, Vec3::Z).unwrap();
    let base_edge = k
        .edge_between(body, Point3d::new(0.0, 0.0, 1.0), Point3d::new(6.0, 0.0, 1.0))
        .unwrap();
    let selection = FrameSelection {
        face,
        base_edge,
        height_edge: None,
    };
    let frame = build_frame(&k, selection, 3, 2, HeightMode::Auto).unwrap();
    let grid = PixelGrid::new(frame);

    let sketch = k.create_sketch(face).unwrap();
    for line in grid.raster_lines() {
        k.add_sketch_line(sketch, line.start, line.end).unwrap();
    }
    let profiles = k.sketch_profiles(sketch).unwrap();
    assert_eq!(profiles.len(), 6);

    let mut seen = std::collections::HashSet::new();
    for p in &profiles {
        match grid.assign_region(p.bbox_midpoint()) {
            RegionAssignment::Cell(cell) => assert!(seen.insert(cell)),
            other => panic!("unexpected {:?}", other),
        }
    }
    assert_eq!(seen.len(), 6);
}

#[test]
fn min_depth_equal_to_estimate_fails() {
    let mut k = MockKernel::new();
    let body = k.add_box_body(
        Point3d::ORIGIN,
        Vec3::new(2.0, 0.0, 0.0),
        Vec3::new(0.0, 2.0, 0.0),
        Vec3::new(0.0, 0.0, 0.75),
    );
    let face = k.face_with_normal(body, Vec3::Z).unwrap();
    let base_edge = k
        .edge_between(body, Point3d::new(0.0, 0.0, 0.75), Point3d::new(2.0, 0.0, 0.75))
        .unwrap();
    let selection = FrameSelection {
        face,
        base_edge,
        height_edge: None,
    };
    let frame = build_frame(&k, selection, 4, 4, HeightMode::Auto).unwrap();
    let estimated = estimate_depth(&k, face, &frame, DepthPolicy::RayProbe, 0.1)
        .unwrap()
        .max_depth;

    assert!(matches!(
        estimate_depth(&k, face, &frame, DepthPolicy::RayProbe, estimated),
        Err(ReliefError::MinimumDepthExceeded { .. })
    ));
    assert!(estimate_depth(&k, face, &frame, DepthPolicy::RayProbe, estimated - 0.001).is_ok());
}
