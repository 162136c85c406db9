pub mod depth;
pub mod frame;
pub mod grid;
pub mod kernel_ext;
pub mod mapper;
pub mod progress;
pub mod types;

pub use depth::{depth_edge_length, estimate_depth, probe_depth};
pub use frame::{build_frame, find_co_edge, FrameSelection};
pub use grid::{PixelGrid, RasterLine, RegionAssignment};
pub use kernel_ext::KernelBundle;
pub use mapper::{
    bucket_cells, cutting_levels, level_depth, shifted_intensity, IntensityBuckets, LevelCut,
    ReliefMode,
};
pub use progress::{CancelToken, NoProgress, Progress, TokenProgress};
pub use types::*;
