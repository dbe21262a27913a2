use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use image::{GrayImage, RgbImage, RgbaImage};
use tracing::debug;

use crate::error::{Error, Result};

/// Dimensions that fit `original` inside a `max_side` square without upscaling.
/// The long side becomes `max_side`, the short side is rounded and never drops below 1.
pub fn calculate_fit_dimensions(original_cols: u32, original_rows: u32, max_side: u32) -> (u32, u32) {
    let long_side = original_rows.max(original_cols);
    let short_side = original_rows.min(original_cols);

    if long_side <= max_side {
        return (original_cols, original_rows);
    }

    let scale_factor = max_side as f64 / long_side as f64;
    let new_short_side = ((short_side as f64 * scale_factor).round() as u32).max(1);

    if original_cols >= original_rows {
        (max_side, new_short_side)
    } else {
        (new_short_side, max_side)
    }
}

fn resize_pixels(
    data: Vec<u8>,
    original_cols: u32,
    original_rows: u32,
    target_cols: u32,
    target_rows: u32,
    pixel_type: PixelType,
    alg: ResizeAlg,
) -> Result<Vec<u8>> {
    let resize_options = ResizeOptions::new().resize_alg(alg);
    let mut resizer = Resizer::new();

    let src_image =
        Image::from_vec_u8(original_cols, original_rows, data, pixel_type).map_err(Error::resize)?;
    let mut dst_image = Image::new(target_cols, target_rows, pixel_type);
    resizer
        .resize(&src_image, &mut dst_image, &resize_options)
        .map_err(Error::resize)?;

    Ok(dst_image.into_vec())
}

/// Lanczos3 resize of an RGBA image. Alpha is premultiplied during filtering so
/// transparent pixels do not bleed their colour into the content edge.
pub fn resize_rgba_image(image: &RgbaImage, target_cols: u32, target_rows: u32) -> Result<RgbaImage> {
    let (cols, rows) = image.dimensions();
    if (cols, rows) == (target_cols, target_rows) {
        return Ok(image.clone());
    }
    debug!("Resizing RGBA {}x{} -> {}x{}", cols, rows, target_cols, target_rows);

    let out = resize_pixels(
        image.as_raw().clone(),
        cols,
        rows,
        target_cols,
        target_rows,
        PixelType::U8x4,
        ResizeAlg::Convolution(FilterType::Lanczos3),
    )?;
    RgbaImage::from_raw(target_cols, target_rows, out)
        .ok_or_else(|| Error::Processing("resized RGBA buffer has wrong length".to_string()))
}

/// Bilinear resize of an RGB image, used to build the segmentation working copy.
pub fn resize_rgb_image(image: &RgbImage, target_cols: u32, target_rows: u32) -> Result<RgbImage> {
    let (cols, rows) = image.dimensions();
    if (cols, rows) == (target_cols, target_rows) {
        return Ok(image.clone());
    }

    let out = resize_pixels(
        image.as_raw().clone(),
        cols,
        rows,
        target_cols,
        target_rows,
        PixelType::U8x3,
        ResizeAlg::Convolution(FilterType::Bilinear),
    )?;
    RgbImage::from_raw(target_cols, target_rows, out)
        .ok_or_else(|| Error::Processing("resized RGB buffer has wrong length".to_string()))
}

/// Nearest-neighbour resize of a binary mask; keeps values strictly 0 or 255.
pub fn resize_mask(mask: &GrayImage, target_cols: u32, target_rows: u32) -> Result<GrayImage> {
    let (cols, rows) = mask.dimensions();
    if (cols, rows) == (target_cols, target_rows) {
        return Ok(mask.clone());
    }

    let out = resize_pixels(
        mask.as_raw().clone(),
        cols,
        rows,
        target_cols,
        target_rows,
        PixelType::U8,
        ResizeAlg::Nearest,
    )?;
    GrayImage::from_raw(target_cols, target_rows, out)
        .ok_or_else(|| Error::Processing("resized mask buffer has wrong length".to_string()))
}
