use relief_kernel::{BodyHandle, KernelId};
use relief_ops::ReliefError;
use relief_types::{DepthBudget, Frame, GridStrategy, ReliefParams};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything the shell hands over for one relief: selections and parameters.
///
/// Selections are optional because the dialog may not have them yet;
/// [`crate::validate::validate_inputs`] rejects the missing ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReliefInputs {
    pub face: Option<KernelId>,
    pub base_edge: Option<KernelId>,
    /// Only used with [`relief_types::HeightMode::Edge`].
    pub height_edge: Option<KernelId>,
    pub params: ReliefParams,
}

/// Sequencer states in visiting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SequencerState {
    Init,
    Framing,
    Estimating,
    Gridding,
    Mapping,
    Extruding { level: u8 },
    Finalizing,
    Done,
    Cancelled,
    Failed,
}

/// How a run that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completion {
    Done,
    Cancelled,
}

/// Counters collected during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReliefReport {
    /// Raster lines added to the sketch.
    pub lines_sketched: usize,
    /// Regions or cells placed in an intensity bucket.
    pub cells_mapped: usize,
    /// Regions whose midpoint fell outside the image.
    pub regions_skipped: usize,
    /// Levels dropped because their depth is zero.
    pub zero_levels: usize,
    /// Levels that emitted geometry.
    pub levels_cut: usize,
    /// Extrude features kept in the design.
    pub features_created: usize,
    /// Extrude features deleted for reporting warning or error health.
    pub features_deleted: usize,
    /// Boolean subtractions applied to the result body.
    pub booleans_applied: usize,
    /// Fix-broken and outline steps that failed.
    pub seal_failures: usize,
}

/// Result of a run that reached `Done` or `Cancelled`.
#[derive(Debug, Clone)]
pub struct ReliefOutcome {
    pub session: Uuid,
    pub completion: Completion,
    pub transitions: Vec<SequencerState>,
    pub report: ReliefReport,
    pub frame: Frame,
    pub budget: DepthBudget,
    /// Body committed to the design by the volume strategies.
    pub result_body: Option<BodyHandle>,
}

impl ReliefOutcome {
    pub fn final_state(&self) -> SequencerState {
        match self.completion {
            Completion::Done => SequencerState::Done,
            Completion::Cancelled => SequencerState::Cancelled,
        }
    }
}

/// Parameters and image size a failure happened with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureContext {
    pub image_width: u32,
    pub image_height: u32,
    pub strategy: GridStrategy,
    pub params: ReliefParams,
}

/// A run that ended in `Failed`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("relief failed while {stage:?}: {error}")]
pub struct ReliefFailure {
    /// The state the run was in when the error surfaced.
    pub stage: SequencerState,
    #[source]
    pub error: ReliefError,
    pub context: Option<FailureContext>,
    pub transitions: Vec<SequencerState>,
}

impl ReliefFailure {
    /// Failure before the sequencer started, e.g. during input checks.
    pub fn before_start(error: impl Into<ReliefError>) -> Self {
        Self {
            stage: SequencerState::Init,
            error: error.into(),
            context: None,
            transitions: Vec::new(),
        }
    }
}

/// What executing the command produced.
#[derive(Debug, Clone)]
pub enum CommandResult {
    /// The user refused the large-image confirmation; nothing was touched.
    Declined { pixels: usize, threshold: usize },
    Completed(ReliefOutcome),
}

/// The surrounding application, as far as the command needs to talk to it.
pub trait CommandShell {
    /// Ask whether to go on with an image of `pixels` pixels, which is above
    /// `threshold`.
    fn confirm_large_image(&mut self, pixels: usize, threshold: usize) -> bool;
}

/// Shell that accepts every confirmation.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl CommandShell for AutoConfirm {
    fn confirm_large_image(&mut self, _pixels: usize, _threshold: usize) -> bool {
        true
    }
}
