//! Background segmentation: a remote background-removal service first, local
//! GrabCut as the fallback. Errors raised here never leave the module through
//! `segment_or_passthrough`; the worst case is the untouched, fully opaque input.
pub mod grabcut;
pub mod local;
pub mod remote;

use image::RgbaImage;
use ndarray::Array2;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::params::PipelineParams;
use crate::types::SegmentationSource;

pub use grabcut::GrabCutError;
pub use local::LocalSegmenter;
pub use remote::{BackgroundRemovalService, RemoteError, RemoteSegmenter, RemoveBgClient};

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("Remote segmentation failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("Local segmentation failed: {0}")]
    GrabCut(#[from] GrabCutError),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Resize error: {0}")]
    Resize(String),
}

/// RGBA cutout plus the tier that produced it.
#[derive(Debug, Clone)]
pub struct Cutout {
    pub image: RgbaImage,
    pub source: SegmentationSource,
}

/// Turns an opaque RGBA image into a cutout of identical dimensions where
/// background pixels have alpha 0.
pub trait Segmenter: Send + Sync {
    fn segment(&self, image: &RgbaImage) -> Result<Cutout, SegmentError>;
}

impl<T: Segmenter + ?Sized> Segmenter for Box<T> {
    fn segment(&self, image: &RgbaImage) -> Result<Cutout, SegmentError> {
        (**self).segment(image)
    }
}

impl<T: Segmenter + ?Sized> Segmenter for &T {
    fn segment(&self, image: &RgbaImage) -> Result<Cutout, SegmentError> {
        (**self).segment(image)
    }
}

/// Runs `primary`; on any error logs it and runs `fallback` instead.
#[derive(Debug, Clone)]
pub struct FallbackSegmenter<P, F> {
    primary: P,
    fallback: F,
}

impl<P: Segmenter, F: Segmenter> FallbackSegmenter<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: Segmenter, F: Segmenter> Segmenter for FallbackSegmenter<P, F> {
    fn segment(&self, image: &RgbaImage) -> Result<Cutout, SegmentError> {
        match self.primary.segment(image) {
            Ok(cutout) => Ok(cutout),
            Err(e) => {
                warn!("Primary segmentation failed, falling back: {}", e);
                self.fallback.segment(image)
            }
        }
    }
}

/// The configured segmentation chain: local GrabCut alone without a credential,
/// remote-then-local otherwise.
pub fn build_segmenter(params: &PipelineParams) -> crate::Result<Box<dyn Segmenter>> {
    let local = LocalSegmenter::from_params(params);
    if !params.remote.has_credential() {
        debug!("No remote credential configured, using local segmentation only");
        return Ok(Box::new(local));
    }
    let client = RemoveBgClient::new(&params.remote).map_err(crate::Error::external)?;
    debug!("Remote segmentation enabled at {}", params.remote.endpoint);
    Ok(Box::new(FallbackSegmenter::new(
        RemoteSegmenter::new(client),
        local,
    )))
}

/// Segment `image`, never failing: if the whole chain errors the input comes
/// back unchanged with source `Passthrough`.
pub fn segment_or_passthrough<S: Segmenter + ?Sized>(segmenter: &S, image: &RgbaImage) -> Cutout {
    match segmenter.segment(image) {
        Ok(cutout) => cutout,
        Err(e) => {
            warn!("Segmentation failed, keeping the full image: {}", e);
            Cutout {
                image: image.clone(),
                source: SegmentationSource::Passthrough,
            }
        }
    }
}

/// Copy of `image` whose alpha channel is replaced by `mask` (row-major, rows x cols).
pub fn apply_mask(image: &RgbaImage, mask: &Array2<u8>) -> RgbaImage {
    let mut out = image.clone();
    for (pixel, &alpha) in out.pixels_mut().zip(mask.iter()) {
        pixel[3] = alpha;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    struct Failing;

    impl Segmenter for Failing {
        fn segment(&self, _image: &RgbaImage) -> Result<Cutout, SegmentError> {
            Err(SegmentError::Resize("boom".to_string()))
        }
    }

    struct Fixed(SegmentationSource);

    impl Segmenter for Fixed {
        fn segment(&self, image: &RgbaImage) -> Result<Cutout, SegmentError> {
            Ok(Cutout {
                image: image.clone(),
                source: self.0,
            })
        }
    }

    fn red_on_white() -> RgbaImage {
        RgbaImage::from_fn(40, 50, |x, y| {
            if (10..30).contains(&x) && (12..38).contains(&y) {
                Rgba([200, 30, 30, 255])
            } else {
                Rgba([250, 250, 250, 255])
            }
        })
    }

    #[test]
    fn test_fallback_used_on_primary_error() {
        let seg = FallbackSegmenter::new(Failing, Fixed(SegmentationSource::Local));
        let cutout = seg.segment(&red_on_white()).unwrap();
        assert_eq!(cutout.source, SegmentationSource::Local);
    }

    #[test]
    fn test_primary_result_wins() {
        let seg = FallbackSegmenter::new(
            Fixed(SegmentationSource::Remote),
            Fixed(SegmentationSource::Local),
        );
        let cutout = seg.segment(&red_on_white()).unwrap();
        assert_eq!(cutout.source, SegmentationSource::Remote);
    }

    #[test]
    fn test_passthrough_when_everything_fails() {
        let img = red_on_white();
        let cutout = segment_or_passthrough(&FallbackSegmenter::new(Failing, Failing), &img);
        assert_eq!(cutout.source, SegmentationSource::Passthrough);
        assert_eq!(cutout.image, img);
    }

    #[test]
    fn test_apply_mask_replaces_alpha() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]));
        let mut mask = Array2::<u8>::zeros((2, 3));
        mask[[1, 2]] = 255;
        let out = apply_mask(&img, &mask);
        assert_eq!(out.get_pixel(2, 1), &Rgba([1, 2, 3, 255]));
        assert_eq!(out.get_pixel(0, 0), &Rgba([1, 2, 3, 0]));
        assert_eq!(out.get_pixel(2, 0)[3], 0);
    }

    #[test]
    fn test_build_without_credential_is_local() {
        let seg = build_segmenter(&PipelineParams::default()).unwrap();
        let img = red_on_white();
        let cutout = seg.segment(&img).unwrap();
        assert_eq!(cutout.source, SegmentationSource::Local);
        assert_eq!(cutout.image.dimensions(), img.dimensions());
        assert_eq!(cutout.image.get_pixel(0, 0)[3], 0);
        assert_eq!(cutout.image.get_pixel(20, 25)[3], 255);
    }
}
