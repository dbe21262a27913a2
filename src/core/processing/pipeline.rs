use image::RgbaImage;
use tracing::debug;

use crate::core::params::PipelineParams;
use crate::core::processing::canvas::standardize_with;
use crate::core::segmentation::{Segmenter, segment_or_passthrough};
use crate::error::Result;
use crate::types::SegmentationSource;

/// Segment one decoded image and standardize the cutout onto the output canvas.
/// Segmentation never fails; only standardization errors are returned.
pub fn cutout_and_standardize<S: Segmenter + ?Sized>(
    image: &RgbaImage,
    segmenter: &S,
    params: &PipelineParams,
) -> Result<(RgbaImage, SegmentationSource)> {
    let cutout = segment_or_passthrough(segmenter, image);
    debug!(
        "Segmented {}x{} via {}",
        image.width(),
        image.height(),
        cutout.source
    );
    let standardized = standardize_with(&cutout.image, params.max_size, params.border_ratio)?;
    Ok((standardized, cutout.source))
}
