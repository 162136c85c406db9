//! Intensity-to-Depth Mapper.
//!
//! A raw intensity `v` is shifted by `s` percent of the full range and clamped,
//! then scaled linearly onto the usable depth:
//!
//! ```text
//! shifted = clamp(v + s * 0.01 * 255, 0, 255)
//! depth   = (max - min) / 255 * shifted
//! ```
//!
//! Cells are bucketed by their raw (unshifted) intensity so one feature can be
//! emitted per level.

use std::collections::BTreeMap;

use relief_kernel::ExtentDirection;
use relief_types::{DepthBudget, IntensityImage, PixelCell};
use tracing::debug;

/// Shifted intensity on the 0..=255 scale.
pub fn shifted_intensity(value: u8, contrast_shift: i32) -> f64 {
    (value as f64 + contrast_shift as f64 * 0.01 * 255.0).clamp(0.0, 255.0)
}

/// Cut depth for one raw intensity level.
pub fn level_depth(value: u8, contrast_shift: i32, budget: &DepthBudget) -> f64 {
    budget.usable_depth() / 255.0 * shifted_intensity(value, contrast_shift)
}

/// Items grouped by raw intensity level, iterated from 0 to 255.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityBuckets<T> {
    levels: BTreeMap<u8, Vec<T>>,
}

impl<T> Default for IntensityBuckets<T> {
    fn default() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }
}

impl<T> IntensityBuckets<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: u8, item: T) {
        self.levels.entry(level).or_default().push(item);
    }

    pub fn get(&self, level: u8) -> Option<&[T]> {
        self.levels.get(&level).map(Vec::as_slice)
    }

    pub fn levels(&self) -> impl Iterator<Item = u8> + '_ {
        self.levels.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &[T])> + '_ {
        self.levels.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Number of non-empty levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Total items over all levels.
    pub fn item_count(&self) -> usize {
        self.levels.values().map(Vec::len).sum()
    }

    pub fn take(&mut self, level: u8) -> Option<Vec<T>> {
        self.levels.remove(&level)
    }

    /// Drop levels whose depth is zero. Returns how many levels were dropped.
    pub fn retain_cutting(&mut self, contrast_shift: i32, budget: &DepthBudget) -> usize {
        let before = self.levels.len();
        self.levels
            .retain(|level, _| level_depth(*level, contrast_shift, budget) != 0.0);
        before - self.levels.len()
    }
}

impl<T> IntoIterator for IntensityBuckets<T> {
    type Item = (u8, Vec<T>);
    type IntoIter = std::collections::btree_map::IntoIter<u8, Vec<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.levels.into_iter()
    }
}

impl<T> FromIterator<(u8, T)> for IntensityBuckets<T> {
    fn from_iter<I: IntoIterator<Item = (u8, T)>>(iter: I) -> Self {
        let mut buckets = Self::new();
        for (level, item) in iter {
            buckets.push(level, item);
        }
        buckets
    }
}

/// Bucket cells by the image intensity at each cell. Cells outside the image
/// are ignored.
pub fn bucket_cells(
    image: &IntensityImage,
    cells: impl IntoIterator<Item = PixelCell>,
) -> IntensityBuckets<PixelCell> {
    let buckets: IntensityBuckets<PixelCell> = cells
        .into_iter()
        .filter_map(|cell| image.intensity(cell).map(|v| (v, cell)))
        .collect();
    debug!(
        levels = buckets.len(),
        cells = buckets.item_count(),
        "cells bucketed"
    );
    buckets
}

/// Whether the relief is cut down from the face or kept flush with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReliefMode {
    /// Each level is cut `depth` down from the face.
    Cut,
    /// Each level grows `depth` up from an offset plane inside the body, so
    /// the face itself stays intact.
    Flush,
}

impl ReliefMode {
    pub fn from_flush(flush: bool) -> Self {
        if flush {
            ReliefMode::Flush
        } else {
            ReliefMode::Cut
        }
    }
}

/// One planned feature: a level's depth placed along the face normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelCut {
    pub level: u8,
    pub depth: f64,
    pub start_offset: f64,
    pub direction: ExtentDirection,
}

impl LevelCut {
    /// Plan the cut for one level, or `None` when its depth is zero.
    pub fn plan(
        level: u8,
        contrast_shift: i32,
        budget: &DepthBudget,
        mode: ReliefMode,
    ) -> Option<Self> {
        let depth = level_depth(level, contrast_shift, budget);
        if depth == 0.0 {
            return None;
        }
        let (start_offset, direction) = match mode {
            ReliefMode::Cut => (0.0, ExtentDirection::Negative),
            ReliefMode::Flush => (
                -(budget.max_depth - budget.min_depth / 2.0),
                ExtentDirection::Positive,
            ),
        };
        Some(Self {
            level,
            depth,
            start_offset,
            direction,
        })
    }

    /// `(low, high)` along the outward normal, measured from the face.
    pub fn interval(&self) -> (f64, f64) {
        self.direction.span(self.start_offset, self.depth)
    }
}

/// Cuts for every level present in `buckets` that has a non-zero depth,
/// ordered from level 0 up.
pub fn cutting_levels<T>(
    buckets: &IntensityBuckets<T>,
    contrast_shift: i32,
    budget: &DepthBudget,
    mode: ReliefMode,
) -> Vec<LevelCut> {
    buckets
        .levels()
        .filter_map(|level| LevelCut::plan(level, contrast_shift, budget, mode))
        .collect()
}
