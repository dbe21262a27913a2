//! Canvas standardization: fit, center on a transparent square, pad, and
//! resize to a fixed output side.
use image::RgbaImage;
use tracing::debug;

use crate::core::params::{BORDER_RATIO, MAX_SIZE};
use crate::core::processing::padding::{border_for_side, expand_with_border, pad_to_square};
use crate::core::processing::resize::{calculate_fit_dimensions, resize_rgba_image};
use crate::error::{Error, Result};

/// Geometry of one standardization run, useful for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasLayout {
    /// Content size after the downscale-to-fit step
    pub content_width: u32,
    pub content_height: u32,
    /// Side of the square canvas before the border is added
    pub canvas_side: u32,
    pub border: u32,
    pub output_side: u32,
}

impl CanvasLayout {
    pub fn compute(width: u32, height: u32, output_side: u32, border_ratio: f64) -> Self {
        let (content_width, content_height) = calculate_fit_dimensions(width, height, output_side);
        let canvas_side = content_width.max(content_height);
        Self {
            content_width,
            content_height,
            canvas_side,
            border: border_for_side(canvas_side, border_ratio),
            output_side,
        }
    }

    pub fn padded_side(&self) -> u32 {
        self.canvas_side + 2 * self.border
    }
}

/// Standardize with the default 1024 px side and 2% border.
pub fn standardize(image: &RgbaImage) -> Result<RgbaImage> {
    standardize_with(image, MAX_SIZE, BORDER_RATIO)
}

/// Produce an exactly `output_side x output_side` RGBA image with the content
/// scaled to fit (never upscaled before padding), centered, and surrounded by
/// a transparent border of `border_ratio` of the square canvas side.
pub fn standardize_with(image: &RgbaImage, output_side: u32, border_ratio: f64) -> Result<RgbaImage> {
    if output_side == 0 {
        return Err(Error::ZeroSize { size: output_side });
    }
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::Processing(format!(
            "cannot standardize an empty {}x{} image",
            width, height
        )));
    }

    let layout = CanvasLayout::compute(width, height, output_side, border_ratio);
    debug!("Canvas layout for {}x{}: {:?}", width, height, layout);

    let fitted = resize_rgba_image(image, layout.content_width, layout.content_height)?;
    let square = pad_to_square(&fitted);
    let padded = expand_with_border(&square, layout.border);
    resize_rgba_image(&padded, output_side, output_side)
}
