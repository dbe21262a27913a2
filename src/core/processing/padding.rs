use image::RgbaImage;
use tracing::debug;

const CHANNELS: usize = 4;

/// Copy `src` into a fully transparent `side x side` canvas at (`left`, `top`).
fn blit_onto_transparent(src: &RgbaImage, side: u32, left: u32, top: u32) -> RgbaImage {
    let (cols, rows) = (src.width() as usize, src.height() as usize);
    let side_us = side as usize;
    let mut padded = vec![0u8; side_us * side_us * CHANNELS];
    let data = src.as_raw();
    let row_bytes = cols * CHANNELS;

    // Copy per row using slice copies to minimize per-pixel indexing
    for row in 0..rows {
        let src_offset = row * row_bytes;
        let dst_offset = ((row + top as usize) * side_us + left as usize) * CHANNELS;
        padded[dst_offset..dst_offset + row_bytes]
            .copy_from_slice(&data[src_offset..src_offset + row_bytes]);
    }

    // Buffer length is side*side*4 by construction
    RgbaImage::from_raw(side, side, padded).unwrap_or_else(|| RgbaImage::new(side, side))
}

/// Center the image on a transparent square canvas whose side is the larger
/// dimension. Offsets use floor division, so odd slack leaves the extra
/// pixel on the right/bottom.
pub fn pad_to_square(image: &RgbaImage) -> RgbaImage {
    let (cols, rows) = image.dimensions();
    let side = cols.max(rows);
    let pad_cols = (side - cols) / 2;
    let pad_rows = (side - rows) / 2;

    debug!(
        "Padding to square: cols={}, rows={}, pad_cols={}, pad_rows={}, side={}",
        cols, rows, pad_cols, pad_rows, side
    );

    blit_onto_transparent(image, side, pad_cols, pad_rows)
}

/// Border width for a canvas side: `floor(side * ratio)`.
pub fn border_for_side(side: u32, ratio: f64) -> u32 {
    (side as f64 * ratio).floor() as u32
}

/// Grow a square canvas by a transparent border of `border` pixels on every edge.
pub fn expand_with_border(canvas: &RgbaImage, border: u32) -> RgbaImage {
    if border == 0 {
        return canvas.clone();
    }
    let side = canvas.width().max(canvas.height()) + 2 * border;
    debug!("Expanding canvas by {} px border -> {}x{}", border, side, side);
    blit_onto_transparent(canvas, side, border, border)
}
