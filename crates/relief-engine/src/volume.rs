//! Volume strategies: cut pixel boxes out of a copy of the body, then commit
//! the copy as a new body and hide the source.

use relief_kernel::{BodyHandle, KernelError, KernelId};
use relief_ops::{bucket_cells, IntensityBuckets, KernelBundle, LevelCut, PixelGrid, ReliefError};
use relief_types::{IntensityImage, PixelCell, Vec3};
use tracing::{debug, info, instrument};

use crate::sequencer::{CellStrategy, RunContext, PHASE_INDEXING};

/// Name the result body is committed under.
pub const RESULT_BODY_NAME: &str = "Image Relief";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// One box and one boolean per cell.
    Direct,
    /// One seed box per level, patterned onto every cell of that level.
    Patterned,
}

#[derive(Debug)]
pub struct VolumeStrategy {
    placement: Placement,
    target: Option<BodyHandle>,
}

impl VolumeStrategy {
    pub fn direct() -> Self {
        Self {
            placement: Placement::Direct,
            target: None,
        }
    }

    pub fn patterned() -> Self {
        Self {
            placement: Placement::Patterned,
            target: None,
        }
    }

    fn target(&self) -> Result<BodyHandle, ReliefError> {
        self.target.ok_or_else(|| {
            KernelError::Other {
                message: "relief body was not copied".to_string(),
            }
            .into()
        })
    }

    fn subtract_cells(
        &self,
        kb: &mut dyn KernelBundle,
        ctx: &mut RunContext<'_>,
        grid: &PixelGrid,
        cut: &LevelCut,
        cells: &[PixelCell],
    ) -> Result<bool, ReliefError> {
        let target = self.target()?;
        let interval = cut.interval();
        for cell in cells {
            if ctx.stop_requested() {
                return Ok(false);
            }
            let tool = kb.make_box(&grid.cell_box(*cell, interval))?;
            kb.boolean_subtract(target, tool)?;
            ctx.report.booleans_applied += 1;
            ctx.tick();
        }
        Ok(true)
    }

    fn subtract_pattern(
        &self,
        kb: &mut dyn KernelBundle,
        ctx: &mut RunContext<'_>,
        grid: &PixelGrid,
        cut: &LevelCut,
        cells: &[PixelCell],
    ) -> Result<bool, ReliefError> {
        let target = self.target()?;
        let Some(first) = cells.first() else {
            return Ok(false);
        };
        let frame = grid.frame();
        let anchor = frame.cell_center(*first);
        let offsets: Vec<Vec3> = cells
            .iter()
            .map(|c| anchor.vector_to(&frame.cell_center(*c)))
            .collect();

        let seed = kb.make_box(&grid.cell_box(*first, cut.interval()))?;
        let tool = kb.pattern_body(seed, &offsets)?;
        kb.boolean_subtract(target, tool)?;
        ctx.report.booleans_applied += 1;
        ctx.tick();
        Ok(true)
    }
}

impl CellStrategy for VolumeStrategy {
    type Item = PixelCell;

    fn grid(
        &mut self,
        _kb: &mut dyn KernelBundle,
        _ctx: &mut RunContext<'_>,
        grid: &PixelGrid,
        _face: KernelId,
    ) -> Result<(), ReliefError> {
        debug!(cells = grid.cell_count(), "volume grid laid out");
        Ok(())
    }

    fn prepare(
        &mut self,
        kb: &mut dyn KernelBundle,
        source: BodyHandle,
    ) -> Result<(), ReliefError> {
        self.target = Some(kb.copy_body(source)?);
        Ok(())
    }

    #[instrument(skip_all)]
    fn map(
        &mut self,
        _kb: &mut dyn KernelBundle,
        ctx: &mut RunContext<'_>,
        grid: &PixelGrid,
        image: &IntensityImage,
    ) -> Result<IntensityBuckets<PixelCell>, ReliefError> {
        ctx.begin(PHASE_INDEXING, grid.cell_count());
        let mut indexed = Vec::with_capacity(grid.cell_count());
        for cell in grid.cells() {
            if ctx.stop_requested() {
                break;
            }
            indexed.push(cell);
            ctx.tick();
        }
        let buckets = bucket_cells(image, indexed);
        ctx.report.cells_mapped = buckets.item_count();
        info!(
            cells = ctx.report.cells_mapped,
            levels = buckets.len(),
            "cells indexed"
        );
        Ok(buckets)
    }

    fn work_units(&self, items: &[PixelCell]) -> usize {
        match self.placement {
            Placement::Direct => items.len(),
            Placement::Patterned => 1,
        }
    }

    fn extrude_level(
        &mut self,
        kb: &mut dyn KernelBundle,
        ctx: &mut RunContext<'_>,
        grid: &PixelGrid,
        cut: &LevelCut,
        items: &[PixelCell],
    ) -> Result<bool, ReliefError> {
        match self.placement {
            Placement::Direct => self.subtract_cells(kb, ctx, grid, cut, items),
            Placement::Patterned => self.subtract_pattern(kb, ctx, grid, cut, items),
        }
    }

    fn finish(
        &mut self,
        kb: &mut dyn KernelBundle,
        source: BodyHandle,
    ) -> Result<Option<BodyHandle>, ReliefError> {
        let Some(target) = self.target else {
            return Ok(None);
        };
        kb.commit_body(target, RESULT_BODY_NAME)?;
        kb.set_body_visible(source, false)?;
        info!(body = target.raw(), "relief body committed");
        Ok(Some(target))
    }
}
