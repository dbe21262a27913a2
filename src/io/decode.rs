use image::RgbaImage;
use tracing::debug;

use crate::error::{Error, Result};

/// Decode any format the `image` crate understands into RGBA8.
/// Images without an alpha channel come out fully opaque.
pub fn decode_rgba(name: &str, bytes: &[u8]) -> Result<RgbaImage> {
    let decoded = image::load_from_memory(bytes).map_err(|source| Error::Decode {
        name: name.to_string(),
        source,
    })?;
    debug!(
        "Decoded {}: {}x{} {:?}",
        name,
        decoded.width(),
        decoded.height(),
        decoded.color()
    );
    Ok(decoded.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_rgb_input_becomes_opaque() {
        let rgb = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        rgb.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let rgba = decode_rgba("x.png", &bytes).unwrap();
        assert_eq!(rgba.dimensions(), (3, 2));
        assert!(rgba.pixels().all(|p| p.0 == [10, 20, 30, 255]));
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let err = decode_rgba("notes.txt", b"definitely not an image").unwrap_err();
        match err {
            Error::Decode { name, .. } => assert_eq!(name, "notes.txt"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
