use relief_kernel::{KernelError, KernelId};
use relief_types::ParamError;

/// Errors from the relief stages.
///
/// Everything except `Kernel` is raised before the first geometry change.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReliefError {
    #[error("reference edge {edge:?} is not on the boundary of face {face:?}")]
    FrameResolution { face: KernelId, edge: KernelId },

    #[error("no edge parallel to the face normal touches the reference edge")]
    NoDepthEdgeFound,

    #[error("minimum depth {min_depth} must be less than the available depth {depth}")]
    MinimumDepthExceeded { min_depth: f64, depth: f64 },

    #[error("missing selection: {what}")]
    MissingSelection { what: String },

    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    #[error("could not decode image '{source_name}': {reason}")]
    ImageDecode { source_name: String, reason: String },

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("invalid parameters: {0}")]
    Param(#[from] ParamError),
}

