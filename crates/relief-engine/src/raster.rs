//! Raster-line strategy: sketch full-span lines, let the kernel tile them into
//! one region per pixel, then cut every level's regions with one extrude.

use relief_kernel::{
    BodyHandle, ExtrudeSpec, FeatureOperation, KernelError, KernelId, Participants,
};
use relief_ops::{
    IntensityBuckets, KernelBundle, LevelCut, PixelGrid, RegionAssignment, ReliefError,
};
use relief_types::IntensityImage;
use tracing::{debug, info, instrument, warn};

use crate::seal;
use crate::sequencer::{CellStrategy, RunContext, PHASE_MAPPING, PHASE_SKETCHING};

#[derive(Debug, Default)]
pub struct RasterStrategy {
    sketch: Option<KernelId>,
    body: Option<BodyHandle>,
}

impl RasterStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    fn sketch(&self) -> Result<KernelId, ReliefError> {
        self.sketch.ok_or_else(|| {
            KernelError::SketchFailed {
                reason: "raster sketch was not created".to_string(),
            }
            .into()
        })
    }
}

impl CellStrategy for RasterStrategy {
    type Item = KernelId;

    #[instrument(skip_all)]
    fn grid(
        &mut self,
        kb: &mut dyn KernelBundle,
        ctx: &mut RunContext<'_>,
        grid: &PixelGrid,
        face: KernelId,
    ) -> Result<(), ReliefError> {
        let sketch = kb.create_sketch(face)?;
        self.sketch = Some(sketch);

        let lines = grid.raster_lines();
        ctx.begin(PHASE_SKETCHING, lines.len());
        for line in &lines {
            if ctx.stop_requested() {
                break;
            }
            kb.add_sketch_line(sketch, line.start, line.end)?;
            ctx.report.lines_sketched += 1;
            ctx.tick();
        }
        kb.set_sketch_visible(sketch, false)?;
        debug!(lines = ctx.report.lines_sketched, "raster sketched");
        Ok(())
    }

    fn prepare(
        &mut self,
        _kb: &mut dyn KernelBundle,
        source: BodyHandle,
    ) -> Result<(), ReliefError> {
        self.body = Some(source);
        Ok(())
    }

    #[instrument(skip_all)]
    fn map(
        &mut self,
        kb: &mut dyn KernelBundle,
        ctx: &mut RunContext<'_>,
        grid: &PixelGrid,
        image: &IntensityImage,
    ) -> Result<IntensityBuckets<KernelId>, ReliefError> {
        let profiles = kb.sketch_profiles(self.sketch()?)?;
        ctx.begin(PHASE_MAPPING, profiles.len());

        let mut buckets = IntensityBuckets::new();
        for profile in &profiles {
            if ctx.stop_requested() {
                break;
            }
            match grid.assign_region(profile.bbox_midpoint()) {
                RegionAssignment::Cell(cell) => match image.intensity(cell) {
                    Some(v) => {
                        buckets.push(v, profile.id);
                        ctx.report.cells_mapped += 1;
                    }
                    None => {
                        warn!(profile = profile.id.0, ?cell, "cell outside image, skipped");
                        ctx.report.regions_skipped += 1;
                    }
                },
                RegionAssignment::OutOfRange { col, row } => {
                    warn!(profile = profile.id.0, col, row, "region outside image, skipped");
                    ctx.report.regions_skipped += 1;
                }
            }
            ctx.tick();
        }
        info!(
            regions = profiles.len(),
            levels = buckets.len(),
            skipped = ctx.report.regions_skipped,
            "regions mapped"
        );
        Ok(buckets)
    }

    fn work_units(&self, _items: &[KernelId]) -> usize {
        1
    }

    fn extrude_level(
        &mut self,
        kb: &mut dyn KernelBundle,
        ctx: &mut RunContext<'_>,
        _grid: &PixelGrid,
        cut: &LevelCut,
        items: &[KernelId],
    ) -> Result<bool, ReliefError> {
        let participants = match self.body {
            Some(body) => Participants::Bodies(vec![body]),
            None => Participants::Auto,
        };
        let spec = ExtrudeSpec {
            sketch: self.sketch()?,
            profiles: items.to_vec(),
            operation: FeatureOperation::Cut,
            participants,
            start_offset: cut.start_offset,
            distance: cut.depth,
            direction: cut.direction,
            thin_wall: None,
        };
        let feature = kb.extrude(&spec)?;
        if seal::keep_if_healthy(kb, feature)? {
            ctx.report.features_created += 1;
        } else {
            ctx.report.features_deleted += 1;
        }
        ctx.tick();
        Ok(true)
    }

    fn finish(
        &mut self,
        _kb: &mut dyn KernelBundle,
        _source: BodyHandle,
    ) -> Result<Option<BodyHandle>, ReliefError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relief_kernel::{Kernel, MockKernel};
    use relief_ops::NoProgress;
    use relief_types::{Frame, Point3d, Vec3};

    #[test]
    fn test_regions_off_the_image_are_skipped() {
        let mut k = MockKernel::new();
        let body = k.add_box_body(
            Point3d::ORIGIN,
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(0.0, 4.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
        );
        let face = k.face_with_normal(body, Vec3::Z).unwrap();
        let grid = PixelGrid::new(Frame {
            origin: Point3d::new(0.0, 0.0, 2.0),
            width_vec: Vec3::new(1.0, 0.0, 0.0),
            height_vec: Vec3::new(0.0, 1.0, 0.0),
            normal: Vec3::Z,
            columns: 2,
            rows: 2,
        });
        let mut progress = NoProgress;
        let mut ctx = RunContext::new(&mut progress);
        let mut strategy = RasterStrategy::new();
        strategy.grid(&mut k, &mut ctx, &grid, face).unwrap();

        // one extra region beyond the last column
        let sketch = strategy.sketch().unwrap();
        let z = 2.0;
        for (a, b) in [
            ((2.0, 0.0), (3.0, 0.0)),
            ((3.0, 0.0), (3.0, 1.0)),
            ((3.0, 1.0), (2.0, 1.0)),
        ] {
            k.add_sketch_line(sketch, Point3d::new(a.0, a.1, z), Point3d::new(b.0, b.1, z))
                .unwrap();
        }

        // image narrower than the grid: the second column has no samples
        let image = IntensityImage::from_raw(1, 2, vec![40, 80]).unwrap();
        let buckets = strategy.map(&mut k, &mut ctx, &grid, &image).unwrap();
        assert_eq!(buckets.item_count(), 2);
        assert_eq!(ctx.report.cells_mapped, 2);
        assert_eq!(ctx.report.regions_skipped, 3);
    }
}
