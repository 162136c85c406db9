use serde::{Deserialize, Serialize};

/// Contrast shift is an integer percentage of the full 0..=255 range.
pub const CONTRAST_SHIFT_RANGE: std::ops::RangeInclusive<i32> = -100..=100;

/// Pixel counts above this ask the user before a raster-line run.
pub const RASTER_CONFIRM_THRESHOLD: usize = 2_500;

/// Pixel counts above this ask the user before a volume run.
pub const VOLUME_CONFIRM_THRESHOLD: usize = 50_000;

/// How the image region's height is derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum HeightMode {
    /// Keep square pixels: height pitch equals width pitch.
    #[default]
    Auto,
    /// Explicit total height of the image region.
    Distance { value: f64 },
    /// Total height is the length of a selected height edge.
    Edge,
}

/// How the maximum extrusion depth is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum DepthPolicy {
    /// Cast a ray along the face normal through the body.
    #[default]
    RayProbe,
    /// Use an edge parallel to the face normal at the reference edge.
    DepthEdge,
}

/// How pixel cells become geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum GridStrategy {
    /// Sketch full-span raster lines and cut the resulting profiles per level.
    #[default]
    RasterLine,
    /// Subtract one box per pixel from a copy of the body.
    DirectVolume,
    /// Replicate one seed box per level and subtract once per level.
    PatternReplicated,
}

impl GridStrategy {
    /// Pixel count above which the shell must confirm before running.
    pub fn default_confirm_threshold(self) -> usize {
        match self {
            GridStrategy::RasterLine => RASTER_CONFIRM_THRESHOLD,
            GridStrategy::DirectVolume | GridStrategy::PatternReplicated => {
                VOLUME_CONFIRM_THRESHOLD
            }
        }
    }
}

/// User-tunable relief parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliefParams {
    /// Material left under the deepest cut. Must be positive.
    pub min_depth: f64,
    /// Black/white distribution shift in percent, -100..=100.
    pub contrast_shift: i32,
    /// Keep the relief surface flush with an offset mid-plane.
    pub flush: bool,
    /// Outline wall thickness divisor for flush mode. 0 disables the outline.
    pub outline_factor: f64,
    /// Close the image region into a solid before cutting.
    pub fix_broken: bool,
    pub height: HeightMode,
    pub depth_policy: DepthPolicy,
    pub strategy: GridStrategy,
    /// Overrides the strategy's confirmation threshold.
    pub large_image_threshold: Option<usize>,
}

impl Default for ReliefParams {
    fn default() -> Self {
        Self {
            min_depth: 0.1,
            contrast_shift: 0,
            flush: true,
            outline_factor: 2.0,
            fix_broken: true,
            height: HeightMode::Auto,
            depth_policy: DepthPolicy::RayProbe,
            strategy: GridStrategy::RasterLine,
            large_image_threshold: None,
        }
    }
}

impl ReliefParams {
    /// Check every numeric parameter against its allowed range.
    pub fn validate(&self) -> Result<(), ParamError> {
        if !(self.min_depth > 0.0) || !self.min_depth.is_finite() {
            return Err(ParamError::MinDepthNotPositive {
                value: self.min_depth,
            });
        }
        if !CONTRAST_SHIFT_RANGE.contains(&self.contrast_shift) {
            return Err(ParamError::ContrastShiftOutOfRange {
                value: self.contrast_shift,
            });
        }
        if !(self.outline_factor >= 0.0) || !self.outline_factor.is_finite() {
            return Err(ParamError::NegativeOutlineFactor {
                value: self.outline_factor,
            });
        }
        if let HeightMode::Distance { value } = self.height {
            if !(value > 0.0) || !value.is_finite() {
                return Err(ParamError::HeightNotPositive { value });
            }
        }
        Ok(())
    }

    pub fn confirm_threshold(&self) -> usize {
        self.large_image_threshold
            .unwrap_or_else(|| self.strategy.default_confirm_threshold())
    }

    /// The flush outline is only built when a positive factor is set.
    pub fn wants_outline(&self) -> bool {
        self.flush && self.outline_factor > 0.0
    }
}

/// Errors from constructing or validating shared data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("image must not be empty (got {width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("image sample count mismatch: expected {expected}, got {actual}")]
    SampleCountMismatch { expected: usize, actual: usize },

    #[error("minimum depth must be positive (got {value})")]
    MinDepthNotPositive { value: f64 },

    #[error("contrast shift {value} outside -100..=100")]
    ContrastShiftOutOfRange { value: i32 },

    #[error("outline factor must be >= 0 (got {value})")]
    NegativeOutlineFactor { value: f64 },

    #[error("image height must be positive (got {value})")]
    HeightNotPositive { value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = ReliefParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.confirm_threshold(), RASTER_CONFIRM_THRESHOLD);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut params = ReliefParams {
            min_depth: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ParamError::MinDepthNotPositive { .. })
        ));

        params.min_depth = 0.5;
        params.contrast_shift = 101;
        assert!(matches!(
            params.validate(),
            Err(ParamError::ContrastShiftOutOfRange { value: 101 })
        ));

        params.contrast_shift = -100;
        params.outline_factor = -1.0;
        assert!(matches!(
            params.validate(),
            Err(ParamError::NegativeOutlineFactor { .. })
        ));

        params.outline_factor = 0.0;
        params.height = HeightMode::Distance { value: 0.0 };
        assert!(matches!(
            params.validate(),
            Err(ParamError::HeightNotPositive { .. })
        ));
    }

    #[test]
    fn test_threshold_follows_strategy_unless_overridden() {
        let mut params = ReliefParams {
            strategy: GridStrategy::DirectVolume,
            ..Default::default()
        };
        assert_eq!(params.confirm_threshold(), VOLUME_CONFIRM_THRESHOLD);
        params.large_image_threshold = Some(10);
        assert_eq!(params.confirm_threshold(), 10);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let params: ReliefParams = serde_json::from_str(
            r#"{ "min_depth": 0.5, "height": { "type": "Distance", "value": 12.0 } }"#,
        )
        .unwrap();
        assert_eq!(params.min_depth, 0.5);
        assert_eq!(params.height, HeightMode::Distance { value: 12.0 });
        assert_eq!(params.strategy, GridStrategy::RasterLine);
        assert!(params.flush);
    }

    #[test]
    fn test_outline_requires_flush_and_factor() {
        let mut params = ReliefParams::default();
        assert!(params.wants_outline());
        params.outline_factor = 0.0;
        assert!(!params.wants_outline());
        params.outline_factor = 2.0;
        params.flush = false;
        assert!(!params.wants_outline());
    }
}
