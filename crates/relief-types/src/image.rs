use serde::{Deserialize, Serialize};

use crate::cell::PixelCell;
use crate::params::ParamError;

/// An 8-bit grayscale raster, row-major, 0 = black and 255 = white.
///
/// Decoded images arrive top-row-first. The relief pipeline works with the
/// bottom row first, so each execution calls [`IntensityImage::flipped_vertically`]
/// exactly once before looking up cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawImage")]
pub struct IntensityImage {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

/// Wire shape of [`IntensityImage`]; checked through `from_raw` on the way in.
#[derive(Deserialize)]
struct RawImage {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl TryFrom<RawImage> for IntensityImage {
    type Error = ParamError;

    fn try_from(raw: RawImage) -> Result<Self, Self::Error> {
        IntensityImage::from_raw(raw.width, raw.height, raw.samples)
    }
}

impl IntensityImage {
    /// Wrap raw row-major samples. Fails if the sample count does not match
    /// the dimensions or either dimension is zero.
    pub fn from_raw(width: u32, height: u32, samples: Vec<u8>) -> Result<Self, ParamError> {
        if width == 0 || height == 0 {
            return Err(ParamError::EmptyImage { width, height });
        }
        let expected = width as usize * height as usize;
        if samples.len() != expected {
            return Err(ParamError::SampleCountMismatch {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Row-major index of a cell: `row * width + col`.
    pub fn index_of(&self, cell: PixelCell) -> usize {
        cell.row as usize * self.width as usize + cell.col as usize
    }

    /// Intensity at a cell, or `None` when the cell lies outside the image.
    pub fn intensity(&self, cell: PixelCell) -> Option<u8> {
        if cell.col >= self.width || cell.row >= self.height {
            return None;
        }
        self.samples.get(self.index_of(cell)).copied()
    }

    /// Copy of the image with the row order reversed.
    pub fn flipped_vertically(&self) -> Self {
        let stride = self.width as usize;
        let samples = self
            .samples
            .chunks_exact(stride)
            .rev()
            .flatten()
            .copied()
            .collect();
        Self {
            width: self.width,
            height: self.height,
            samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_by_two() -> IntensityImage {
        IntensityImage::from_raw(3, 2, vec![1, 2, 3, 4, 5, 6]).unwrap()
    }

    #[test]
    fn test_flip_reverses_rows() {
        let flipped = three_by_two().flipped_vertically();
        assert_eq!(flipped.samples(), &[4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn test_flip_twice_restores_original() {
        let image = three_by_two();
        assert_eq!(image.flipped_vertically().flipped_vertically(), image);
    }

    #[test]
    fn test_intensity_lookup_is_row_major() {
        let image = three_by_two();
        assert_eq!(image.intensity(PixelCell::new(2, 0)), Some(3));
        assert_eq!(image.intensity(PixelCell::new(0, 1)), Some(4));
        assert_eq!(image.intensity(PixelCell::new(3, 0)), None);
        assert_eq!(image.intensity(PixelCell::new(0, 2)), None);
    }

    #[test]
    fn test_from_raw_rejects_bad_dimensions() {
        assert!(matches!(
            IntensityImage::from_raw(0, 4, Vec::new()),
            Err(ParamError::EmptyImage { .. })
        ));
        assert!(matches!(
            IntensityImage::from_raw(2, 2, vec![0; 3]),
            Err(ParamError::SampleCountMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_deserialize_checks_dimensions() {
        let image: IntensityImage =
            serde_json::from_str(r#"{"width":2,"height":1,"samples":[7,9]}"#).unwrap();
        assert_eq!(image.intensity(PixelCell::new(1, 0)), Some(9));
        assert_eq!(serde_json::to_string(&image).unwrap(), r#"{"width":2,"height":1,"samples":[7,9]}"#);

        let empty = serde_json::from_str::<IntensityImage>(r#"{"width":0,"height":3,"samples":[]}"#);
        assert!(empty.unwrap_err().to_string().contains("0x3"), "zero width must not load");
        assert!(
            serde_json::from_str::<IntensityImage>(r#"{"width":2,"height":2,"samples":[1]}"#)
                .is_err()
        );
    }
}
