use serde::{Deserialize, Serialize};

use crate::geom::{Point3d, Vec3};

/// One image pixel's position in the grid. Row 0 is the bottom image row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PixelCell {
    pub col: u32,
    pub row: u32,
}

impl PixelCell {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

/// 2D coordinate frame laid on the target face.
///
/// `width_vec` and `height_vec` are one pixel long each, so a cell's corner is
/// `origin + col * width_vec + row * height_vec`. `normal` is the unit outward
/// face normal; cuts go along `-normal`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub origin: Point3d,
    pub width_vec: Vec3,
    pub height_vec: Vec3,
    pub normal: Vec3,
    pub columns: u32,
    pub rows: u32,
}

impl Frame {
    /// Real-world width of one pixel.
    pub fn pitch_w(&self) -> f64 {
        self.width_vec.length()
    }

    /// Real-world height of one pixel.
    pub fn pitch_h(&self) -> f64 {
        self.height_vec.length()
    }

    pub fn width_dir(&self) -> Vec3 {
        self.width_vec.normalized().unwrap_or(Vec3::ZERO)
    }

    pub fn height_dir(&self) -> Vec3 {
        self.height_vec.normalized().unwrap_or(Vec3::ZERO)
    }

    pub fn full_width(&self) -> Vec3 {
        self.width_vec * self.columns as f64
    }

    pub fn full_height(&self) -> Vec3 {
        self.height_vec * self.rows as f64
    }

    /// Point at fractional cell coordinates `(u, v)` measured in pixels.
    pub fn point_at(&self, u: f64, v: f64) -> Point3d {
        self.origin + self.width_vec * u + self.height_vec * v
    }

    /// Far end of the reference edge.
    pub fn width_end(&self) -> Point3d {
        self.origin + self.full_width()
    }

    /// Top-left corner of the image region (end of the height line).
    pub fn height_end(&self) -> Point3d {
        self.origin + self.full_height()
    }

    pub fn cell_origin(&self, cell: PixelCell) -> Point3d {
        self.point_at(cell.col as f64, cell.row as f64)
    }

    pub fn cell_center(&self, cell: PixelCell) -> Point3d {
        self.point_at(cell.col as f64 + 0.5, cell.row as f64 + 0.5)
    }

    /// Cell corners, counter-clockwise about the normal.
    pub fn cell_corners(&self, cell: PixelCell) -> [Point3d; 4] {
        let (u, v) = (cell.col as f64, cell.row as f64);
        [
            self.point_at(u, v),
            self.point_at(u + 1.0, v),
            self.point_at(u + 1.0, v + 1.0),
            self.point_at(u, v + 1.0),
        ]
    }

    /// Corners of the whole image region, counter-clockwise about the normal.
    pub fn outline_corners(&self) -> [Point3d; 4] {
        let (w, h) = (self.columns as f64, self.rows as f64);
        [
            self.point_at(0.0, 0.0),
            self.point_at(w, 0.0),
            self.point_at(w, h),
            self.point_at(0.0, h),
        ]
    }

    /// Probe sample one cell inward from the origin.
    pub fn sample_point(&self) -> Point3d {
        self.point_at(1.0, 1.0)
    }

    /// True when width, height and normal are mutually perpendicular within
    /// `tol` (cosine of the angle between each pair).
    pub fn is_orthogonal(&self, tol: f64) -> bool {
        let (w, h, n) = (self.width_dir(), self.height_dir(), self.normal);
        w.dot(&h).abs() < tol && w.dot(&n).abs() < tol && h.dot(&n).abs() < tol
    }
}

/// Where the maximum extrusion depth came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepthSource {
    /// Farthest on-or-inside hit of the probe ray.
    Probe,
    /// No probe hit; `min_depth` plus a fixed margin was used.
    Fallback,
    /// Length of an edge parallel to the face normal.
    Edge,
}

/// Usable extrusion depth range for one execution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthBudget {
    pub max_depth: f64,
    pub min_depth: f64,
    pub source: DepthSource,
}

impl DepthBudget {
    /// Depth range a full-white pixel spans.
    pub fn usable_depth(&self) -> f64 {
        self.max_depth - self.min_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_frame() -> Frame {
        Frame {
            origin: Point3d::new(1.0, 1.0, 0.0),
            width_vec: Vec3::new(0.5, 0.0, 0.0),
            height_vec: Vec3::new(0.0, 0.25, 0.0),
            normal: Vec3::Z,
            columns: 4,
            rows: 8,
        }
    }

    #[test]
    fn test_cell_center_uses_half_offsets() {
        let frame = unit_frame();
        let c = frame.cell_center(PixelCell::new(1, 2));
        assert!((c.x - 1.75).abs() < 1e-12);
        assert!((c.y - 1.625).abs() < 1e-12);
    }

    #[test]
    fn test_outline_matches_full_vectors() {
        let frame = unit_frame();
        let corners = frame.outline_corners();
        assert_eq!(corners[1], frame.width_end());
        assert_eq!(corners[3], frame.height_end());
        assert!((corners[2].x - 3.0).abs() < 1e-12);
        assert!((corners[2].y - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_orthogonality_check() {
        let mut frame = unit_frame();
        assert!(frame.is_orthogonal(1e-9));
        frame.height_vec = Vec3::new(0.1, 0.25, 0.0);
        assert!(!frame.is_orthogonal(1e-9));
    }
}
