use image::{GrayImage, RgbImage, RgbaImage};
use ndarray::Array2;
use tracing::{debug, warn};

use super::grabcut::{Rect, foreground_mask, grabcut};
use super::{Cutout, SegmentError, Segmenter, apply_mask};
use crate::core::params::{GRABCUT_ITERATIONS, PipelineParams};
use crate::core::processing::resize::{calculate_fit_dimensions, resize_mask, resize_rgb_image};
use crate::types::SegmentationSource;

/// Local GrabCut segmentation seeded with the whole image inset by one pixel.
/// Never returns `Err`: a failed run yields the input with a fully opaque alpha
/// and source `Passthrough`.
#[derive(Debug, Clone)]
pub struct LocalSegmenter {
    pub iterations: usize,
    /// Long side cap of the working copy; None runs at full resolution
    pub max_side: Option<u32>,
}

impl Default for LocalSegmenter {
    fn default() -> Self {
        Self {
            iterations: GRABCUT_ITERATIONS,
            max_side: Some(512),
        }
    }
}

impl LocalSegmenter {
    pub fn from_params(params: &PipelineParams) -> Self {
        Self {
            iterations: params.grabcut_iterations,
            max_side: params.segmentation_max_side,
        }
    }

    /// Binary mask on the full-resolution grid of `image`.
    pub fn mask(&self, image: &RgbaImage) -> Result<Array2<u8>, SegmentError> {
        let (cols, rows) = image.dimensions();
        let rgb = RgbImage::from_fn(cols, rows, |x, y| {
            let p = image.get_pixel(x, y);
            image::Rgb([p[0], p[1], p[2]])
        });

        let (work_cols, work_rows) = match self.max_side {
            Some(side) => calculate_fit_dimensions(cols, rows, side),
            None => (cols, rows),
        };
        let work = resize_rgb_image(&rgb, work_cols, work_rows)
            .map_err(|e| SegmentError::Resize(e.to_string()))?;
        debug!(
            "GrabCut on {}x{} working copy of {}x{}",
            work_cols, work_rows, cols, rows
        );

        let labels = grabcut(&work, Rect::inset(work_cols, work_rows, 1), self.iterations)?;
        let mask = foreground_mask(&labels);
        if (work_cols, work_rows) == (cols, rows) {
            return Ok(mask);
        }

        let small = GrayImage::from_raw(work_cols, work_rows, mask.into_raw_vec())
            .ok_or_else(|| SegmentError::Resize("mask buffer has wrong length".to_string()))?;
        let full =
            resize_mask(&small, cols, rows).map_err(|e| SegmentError::Resize(e.to_string()))?;
        Array2::from_shape_vec((rows as usize, cols as usize), full.into_raw())
            .map_err(|e| SegmentError::Resize(e.to_string()))
    }
}

impl Segmenter for LocalSegmenter {
    fn segment(&self, image: &RgbaImage) -> Result<Cutout, SegmentError> {
        match self.mask(image) {
            Ok(mask) => Ok(Cutout {
                image: apply_mask(image, &mask),
                source: SegmentationSource::Local,
            }),
            Err(e) => {
                warn!("Local segmentation failed, keeping every pixel: {}", e);
                let (cols, rows) = image.dimensions();
                let opaque = Array2::from_elem((rows as usize, cols as usize), 255u8);
                Ok(Cutout {
                    image: apply_mask(image, &opaque),
                    source: SegmentationSource::Passthrough,
                })
            }
        }
    }
}
