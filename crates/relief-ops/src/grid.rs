//! Pixel Grid Generator: cells, raster lines and region-to-pixel matching.

use relief_kernel::OrientedBox;
use relief_types::{Frame, PixelCell, Point3d};

/// A sketch line segment in model space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterLine {
    pub start: Point3d,
    pub end: Point3d,
}

/// Which pixel a tiled region belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionAssignment {
    Cell(PixelCell),
    /// The region's midpoint maps outside the image.
    OutOfRange { col: i64, row: i64 },
}

/// One cell per image pixel, laid on a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelGrid {
    frame: Frame,
}

impl PixelGrid {
    pub fn new(frame: Frame) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn columns(&self) -> u32 {
        self.frame.columns
    }

    pub fn rows(&self) -> u32 {
        self.frame.rows
    }

    pub fn cell_count(&self) -> usize {
        self.frame.columns as usize * self.frame.rows as usize
    }

    /// Real-world size of the whole grid: `(W * pitch_w, H * pitch_h)`.
    pub fn footprint(&self) -> (f64, f64) {
        (
            self.frame.full_width().length(),
            self.frame.full_height().length(),
        )
    }

    /// Cells in row-major order, bottom row first.
    pub fn cells(&self) -> impl Iterator<Item = PixelCell> + '_ {
        let columns = self.frame.columns;
        (0..self.frame.rows).flat_map(move |row| (0..columns).map(move |col| PixelCell::new(col, row)))
    }

    /// The base line along the reference edge.
    pub fn base_line(&self) -> RasterLine {
        RasterLine {
            start: self.frame.origin,
            end: self.frame.width_end(),
        }
    }

    /// The height line from the origin across the image.
    pub fn height_line(&self) -> RasterLine {
        RasterLine {
            start: self.frame.origin,
            end: self.frame.height_end(),
        }
    }

    /// Lines that tile the image region into one closed region per pixel.
    ///
    /// The base and height lines come first. Then the two full-span families
    /// follow, each stepping one pitch at a time up to the far boundary. The
    /// family stepping across the longer image dimension goes first.
    pub fn raster_lines(&self) -> Vec<RasterLine> {
        let f = &self.frame;
        let mut lines = Vec::with_capacity(2 + (f.columns + f.rows) as usize);
        lines.push(self.base_line());
        lines.push(self.height_line());

        let columns_first = f.columns > f.rows;
        for pass in 0..2 {
            if (pass == 0) == columns_first {
                for k in 1..=f.columns {
                    let start = f.point_at(k as f64, 0.0);
                    lines.push(RasterLine {
                        start,
                        end: start + f.full_height(),
                    });
                }
            } else {
                for k in 1..=f.rows {
                    let start = f.point_at(0.0, k as f64);
                    lines.push(RasterLine {
                        start,
                        end: start + f.full_width(),
                    });
                }
            }
        }
        lines
    }

    /// Match a tiled region back to its pixel by the region's midpoint.
    ///
    /// The row is the midpoint's distance to the base line over `pitch_h` and
    /// the column its distance to the height line over `pitch_w`, floored.
    pub fn assign_region(&self, midpoint: Point3d) -> RegionAssignment {
        let f = &self.frame;
        let base = self.base_line();
        let height = self.height_line();
        let row = (midpoint.distance_to_line(&base.start, &base.end) / f.pitch_h()).floor() as i64;
        let col =
            (midpoint.distance_to_line(&height.start, &height.end) / f.pitch_w()).floor() as i64;
        if (0..f.columns as i64).contains(&col) && (0..f.rows as i64).contains(&row) {
            RegionAssignment::Cell(PixelCell::new(col as u32, row as u32))
        } else {
            RegionAssignment::OutOfRange { col, row }
        }
    }

    /// Box covering one cell between `low` and `high` along the face normal.
    pub fn cell_box(&self, cell: PixelCell, (low, high): (f64, f64)) -> OrientedBox {
        let f = &self.frame;
        OrientedBox {
            center: f.cell_center(cell) + f.normal * ((low + high) * 0.5),
            length_dir: f.width_dir(),
            width_dir: f.height_dir(),
            length: f.pitch_w(),
            width: f.pitch_h(),
            height: high - low,
        }
    }
}
