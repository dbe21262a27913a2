use std::time::Duration;

use image::RgbaImage;
use reqwest::blocking::{Client, multipart};
use thiserror::Error;
use tracing::debug;

use super::{Cutout, SegmentError, Segmenter};
use crate::core::params::SegmenterConfig;
use crate::core::processing::resize::resize_rgba_image;
use crate::io::writers::png::encode_png;
use crate::types::SegmentationSource;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote service has no API key configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote service returned status {status}")]
    Status { status: u16 },

    #[error("remote service returned an undecodable image: {0}")]
    Decode(#[source] image::ImageError),
}

/// Remote capability: PNG bytes in, cutout image bytes out.
pub trait BackgroundRemovalService: Send + Sync {
    /// True when a credential is configured.
    fn available(&self) -> bool;

    fn remove(&self, png: &[u8]) -> Result<Vec<u8>, RemoteError>;
}

/// remove.bg HTTP client: multipart upload with `size=auto`, `type=auto`
/// and the key in `X-Api-Key`.
#[derive(Clone)]
pub struct RemoveBgClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl RemoveBgClient {
    pub fn new(config: &SegmenterConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
        })
    }
}

impl std::fmt::Debug for RemoveBgClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoveBgClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl BackgroundRemovalService for RemoveBgClient {
    fn available(&self) -> bool {
        self.api_key.is_some()
    }

    fn remove(&self, png: &[u8]) -> Result<Vec<u8>, RemoteError> {
        let api_key = self.api_key.as_deref().ok_or(RemoteError::NotConfigured)?;

        let part = multipart::Part::bytes(png.to_vec())
            .file_name("image.png")
            .mime_str("image/png")?;
        let form = multipart::Form::new()
            .part("image_file", part)
            .text("size", "auto")
            .text("type", "auto");

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Api-Key", api_key)
            .multipart(form)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// Tier 1: delegate to a [`BackgroundRemovalService`]. Any failure is an `Err`,
/// left for the caller to recover from.
#[derive(Debug, Clone)]
pub struct RemoteSegmenter<S> {
    service: S,
}

impl<S: BackgroundRemovalService> RemoteSegmenter<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

impl<S: BackgroundRemovalService> Segmenter for RemoteSegmenter<S> {
    fn segment(&self, image: &RgbaImage) -> Result<Cutout, SegmentError> {
        if !self.service.available() {
            return Err(RemoteError::NotConfigured.into());
        }

        let png = encode_png(image).map_err(|e| SegmentError::Encode(e.to_string()))?;
        let body = self.service.remove(&png)?;
        let mut result = image::load_from_memory(&body)
            .map_err(RemoteError::Decode)?
            .to_rgba8();

        let (cols, rows) = image.dimensions();
        if result.dimensions() != (cols, rows) {
            debug!(
                "Remote cutout is {}x{}, resizing back to {}x{}",
                result.width(),
                result.height(),
                cols,
                rows
            );
            result = resize_rgba_image(&result, cols, rows)
                .map_err(|e| SegmentError::Resize(e.to_string()))?;
        }

        Ok(Cutout {
            image: result,
            source: SegmentationSource::Remote,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    enum Reply {
        Image(RgbaImage),
        Status(u16),
        Garbage,
    }

    struct FakeService {
        available: bool,
        reply: Reply,
    }

    impl BackgroundRemovalService for FakeService {
        fn available(&self) -> bool {
            self.available
        }

        fn remove(&self, png: &[u8]) -> Result<Vec<u8>, RemoteError> {
            assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
            match &self.reply {
                Reply::Image(img) => Ok(encode_png(img).unwrap()),
                Reply::Status(status) => Err(RemoteError::Status { status: *status }),
                Reply::Garbage => Ok(b"<html>oops</html>".to_vec()),
            }
        }
    }

    fn input() -> RgbaImage {
        RgbaImage::from_pixel(16, 12, Rgba([120, 80, 40, 255]))
    }

    #[test]
    fn test_unavailable_service_is_an_error() {
        let seg = RemoteSegmenter::new(FakeService {
            available: false,
            reply: Reply::Garbage,
        });
        assert!(matches!(
            seg.segment(&input()),
            Err(SegmentError::Remote(RemoteError::NotConfigured))
        ));
    }

    #[test]
    fn test_error_status_is_reported() {
        let seg = RemoteSegmenter::new(FakeService {
            available: true,
            reply: Reply::Status(402),
        });
        assert!(matches!(
            seg.segment(&input()),
            Err(SegmentError::Remote(RemoteError::Status { status: 402 }))
        ));
    }

    #[test]
    fn test_malformed_body_is_reported() {
        let seg = RemoteSegmenter::new(FakeService {
            available: true,
            reply: Reply::Garbage,
        });
        assert!(matches!(
            seg.segment(&input()),
            Err(SegmentError::Remote(RemoteError::Decode(_)))
        ));
    }

    #[test]
    fn test_successful_cutout() {
        let mut cut = input();
        cut.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        let seg = RemoteSegmenter::new(FakeService {
            available: true,
            reply: Reply::Image(cut.clone()),
        });
        let out = seg.segment(&input()).unwrap();
        assert_eq!(out.source, SegmentationSource::Remote);
        assert_eq!(out.image, cut);
    }

    #[test]
    fn test_smaller_reply_is_resized_to_input() {
        let seg = RemoteSegmenter::new(FakeService {
            available: true,
            reply: Reply::Image(RgbaImage::from_pixel(8, 6, Rgba([1, 2, 3, 255]))),
        });
        let out = seg.segment(&input()).unwrap();
        assert_eq!(out.image.dimensions(), (16, 12));
    }

    #[test]
    fn test_client_without_key_is_unavailable() {
        let client = RemoveBgClient::new(&SegmenterConfig::with_api_key(" ")).unwrap();
        assert!(!client.available());
        assert!(matches!(
            client.remove(&[]),
            Err(RemoteError::NotConfigured)
        ));
        let client = RemoveBgClient::new(&SegmenterConfig::with_api_key("sekrit-token")).unwrap();
        assert!(client.available());
        assert!(!format!("{:?}", client).contains("sekrit"));
    }
}
