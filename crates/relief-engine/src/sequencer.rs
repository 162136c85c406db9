//! Relief Sequencer: drives one execution through its states.
//!
//! ```text
//! Init -> Framing -> Estimating -> Gridding -> Mapping -> Extruding[level]*
//!      -> Finalizing -> Done | Cancelled
//! ```
//!
//! Any error moves the run to `Failed`. The grid strategies plug in through
//! [`CellStrategy`]; everything else is shared.

use relief_kernel::{BodyHandle, KernelId, Participants};
use relief_ops::{
    build_frame, cutting_levels, estimate_depth, FrameSelection, IntensityBuckets, KernelBundle,
    LevelCut, PixelGrid, Progress, ReliefError, ReliefMode,
};
use relief_types::{DepthBudget, GridStrategy, IntensityImage, ReliefParams};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::raster::RasterStrategy;
use crate::seal;
use crate::types::{
    Completion, FailureContext, ReliefFailure, ReliefOutcome, ReliefReport, SequencerState,
};
use crate::volume::VolumeStrategy;

pub const PHASE_SKETCHING: &str = "Sketching";
pub const PHASE_MAPPING: &str = "Mapping pixels";
pub const PHASE_INDEXING: &str = "Indexing pixels";
pub const PHASE_EXTRUDING: &str = "Extruding";

/// Progress, cancellation and counters shared by the sequencer and its strategy.
pub struct RunContext<'p> {
    progress: &'p mut dyn Progress,
    pub report: ReliefReport,
    cancelled: bool,
    done: usize,
}

impl<'p> RunContext<'p> {
    pub fn new(progress: &'p mut dyn Progress) -> Self {
        Self {
            progress,
            report: ReliefReport::default(),
            cancelled: false,
            done: 0,
        }
    }

    /// Poll for cancellation. Once tripped it stays tripped.
    pub fn stop_requested(&mut self) -> bool {
        if !self.cancelled && self.progress.is_cancelled() {
            info!("cancellation requested");
            self.cancelled = true;
        }
        self.cancelled
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn begin(&mut self, label: &str, total: usize) {
        self.done = 0;
        self.progress.begin(label, total);
    }

    /// One unit of the current phase is done.
    pub fn tick(&mut self) {
        self.done += 1;
        self.progress.advance(self.done);
    }
}

/// How pixel cells become geometry.
pub trait CellStrategy {
    /// What a bucket holds for each pixel: a profile id or a cell.
    type Item;

    /// Lay out per-pixel scaffolding on the face. Runs before any geometry
    /// is changed.
    fn grid(
        &mut self,
        kb: &mut dyn KernelBundle,
        ctx: &mut RunContext<'_>,
        grid: &PixelGrid,
        face: KernelId,
    ) -> Result<(), ReliefError>;

    /// Pick the body the levels are cut from. Runs after the fix-broken seal.
    fn prepare(
        &mut self,
        kb: &mut dyn KernelBundle,
        source: BodyHandle,
    ) -> Result<(), ReliefError>;

    /// Bucket the strategy's items by raw intensity.
    fn map(
        &mut self,
        kb: &mut dyn KernelBundle,
        ctx: &mut RunContext<'_>,
        grid: &PixelGrid,
        image: &IntensityImage,
    ) -> Result<IntensityBuckets<Self::Item>, ReliefError>;

    /// Progress units one level takes.
    fn work_units(&self, items: &[Self::Item]) -> usize;

    /// Cut one level. Returns `false` when cancellation stopped it before
    /// every item was cut.
    fn extrude_level(
        &mut self,
        kb: &mut dyn KernelBundle,
        ctx: &mut RunContext<'_>,
        grid: &PixelGrid,
        cut: &LevelCut,
        items: &[Self::Item],
    ) -> Result<bool, ReliefError>;

    /// Commit whatever was built. Returns the body added to the design, if
    /// the strategy makes one.
    fn finish(
        &mut self,
        kb: &mut dyn KernelBundle,
        source: BodyHandle,
    ) -> Result<Option<BodyHandle>, ReliefError>;
}

/// Run one relief execution with the strategy named in `params`.
///
/// `image` is in decoded order (top row first); it is flipped here.
pub fn run_relief(
    kb: &mut dyn KernelBundle,
    progress: &mut dyn Progress,
    image: &IntensityImage,
    selection: FrameSelection,
    params: &ReliefParams,
    session: Uuid,
) -> Result<ReliefOutcome, ReliefFailure> {
    let span = info_span!("relief", session = %session, strategy = ?params.strategy);
    let _guard = span.enter();

    let sequencer = Sequencer {
        kb,
        ctx: RunContext::new(progress),
        selection,
        params,
        session,
        state: SequencerState::Init,
        transitions: Vec::new(),
        context: FailureContext {
            image_width: image.width(),
            image_height: image.height(),
            strategy: params.strategy,
            params: params.clone(),
        },
    };
    match params.strategy {
        GridStrategy::RasterLine => sequencer.run(image, RasterStrategy::new()),
        GridStrategy::DirectVolume => sequencer.run(image, VolumeStrategy::direct()),
        GridStrategy::PatternReplicated => sequencer.run(image, VolumeStrategy::patterned()),
    }
}

struct Sequencer<'a> {
    kb: &'a mut dyn KernelBundle,
    ctx: RunContext<'a>,
    selection: FrameSelection,
    params: &'a ReliefParams,
    session: Uuid,
    state: SequencerState,
    transitions: Vec<SequencerState>,
    context: FailureContext,
}

impl<'a> Sequencer<'a> {
    fn enter(&mut self, state: SequencerState) {
        debug!(?state, "sequencer state");
        self.state = state;
        self.transitions.push(state);
    }

    fn run<S: CellStrategy>(
        mut self,
        image: &IntensityImage,
        mut strategy: S,
    ) -> Result<ReliefOutcome, ReliefFailure> {
        match self.sequence(image, &mut strategy) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                let stage = self.state;
                error!(?stage, error = %err, "relief failed");
                self.enter(SequencerState::Failed);
                Err(ReliefFailure {
                    stage,
                    error: err,
                    context: Some(self.context),
                    transitions: self.transitions,
                })
            }
        }
    }

    /// Run a best-effort seal step: errors are logged and counted.
    fn seal_step(
        &mut self,
        name: &str,
        step: impl FnOnce(&mut dyn KernelBundle) -> Result<bool, ReliefError>,
    ) {
        match step(&mut *self.kb) {
            Ok(true) => self.ctx.report.features_created += 1,
            Ok(false) => self.ctx.report.features_deleted += 1,
            Err(err) => {
                warn!(step = name, error = %err, "seal step failed");
                self.ctx.report.seal_failures += 1;
            }
        }
    }

    fn sequence<S: CellStrategy>(
        &mut self,
        image: &IntensityImage,
        strategy: &mut S,
    ) -> Result<ReliefOutcome, ReliefError> {
        self.enter(SequencerState::Init);
        self.params.validate()?;
        let image = image.flipped_vertically();
        let face = self.selection.face;

        self.enter(SequencerState::Framing);
        let frame = build_frame(
            self.kb.as_introspect(),
            self.selection,
            image.width(),
            image.height(),
            self.params.height,
        )?;

        self.enter(SequencerState::Estimating);
        let budget = estimate_depth(
            self.kb.as_introspect(),
            face,
            &frame,
            self.params.depth_policy,
            self.params.min_depth,
        )?;
        let body = self.kb.face_body(face)?;
        let grid = PixelGrid::new(frame);

        self.enter(SequencerState::Gridding);
        let boundary = seal::boundary_sketch(self.kb, face, &frame)?;
        strategy.grid(self.kb, &mut self.ctx, &grid, face)?;
        if self.params.fix_broken && !self.ctx.stop_requested() {
            self.seal_step("fix broken body", |kb| seal::fix_broken(kb, boundary, &budget));
        }
        strategy.prepare(self.kb, body)?;

        if !self.ctx.stop_requested() {
            self.enter(SequencerState::Mapping);
            let buckets = strategy.map(self.kb, &mut self.ctx, &grid, &image)?;
            if !self.ctx.stop_requested() {
                self.extrude_levels(strategy, &grid, buckets, &budget)?;
            }
        }

        self.enter(SequencerState::Finalizing);
        let result_body = strategy.finish(self.kb, body)?;
        let cancelled = self.ctx.was_cancelled();
        if !cancelled && self.params.wants_outline() {
            let participants =
                result_body.map_or(Participants::Auto, |b| Participants::Bodies(vec![b]));
            let factor = self.params.outline_factor;
            self.seal_step("outline", |kb| {
                seal::outline(kb, boundary, &frame, &budget, factor, participants)
            });
        }

        let completion = if cancelled {
            self.enter(SequencerState::Cancelled);
            Completion::Cancelled
        } else {
            self.enter(SequencerState::Done);
            Completion::Done
        };
        info!(?completion, report = ?self.ctx.report, "relief finished");

        Ok(ReliefOutcome {
            session: self.session,
            completion,
            transitions: std::mem::take(&mut self.transitions),
            report: self.ctx.report.clone(),
            frame,
            budget,
            result_body,
        })
    }

    fn extrude_levels<S: CellStrategy>(
        &mut self,
        strategy: &mut S,
        grid: &PixelGrid,
        mut buckets: IntensityBuckets<S::Item>,
        budget: &DepthBudget,
    ) -> Result<(), ReliefError> {
        let shift = self.params.contrast_shift;
        let mode = ReliefMode::from_flush(self.params.flush);
        self.ctx.report.zero_levels = buckets.retain_cutting(shift, budget);
        let cuts = cutting_levels(&buckets, shift, budget, mode);
        info!(
            levels = cuts.len(),
            zero_levels = self.ctx.report.zero_levels,
            "levels planned"
        );

        let total = cuts
            .iter()
            .map(|c| strategy.work_units(buckets.get(c.level).unwrap_or_default()))
            .sum();
        self.ctx.begin(PHASE_EXTRUDING, total);

        for cut in &cuts {
            if self.ctx.stop_requested() {
                break;
            }
            let Some(items) = buckets.take(cut.level) else {
                continue;
            };
            self.enter(SequencerState::Extruding { level: cut.level });
            debug!(
                level = cut.level,
                depth = cut.depth,
                items = items.len(),
                "extruding level"
            );
            if strategy.extrude_level(self.kb, &mut self.ctx, grid, cut, &items)? {
                self.ctx.report.levels_cut += 1;
            }
        }
        Ok(())
    }
}
