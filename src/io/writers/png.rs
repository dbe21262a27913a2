use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use tracing::warn;
use uuid::Uuid;

use crate::error::{Error, Result};

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(Error::Encode)?;
    Ok(buf)
}

/// Encode and write an RGBA PNG, creating parent directories as needed.
pub fn write_png(output: &Path, image: &RgbaImage) -> Result<()> {
    let bytes = encode_png(image)?;
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, bytes)?;
    Ok(())
}

/// A PNG written next to its target under a hidden `.part` name. Nothing is
/// visible at the target until [`StagedPng::commit`]; dropping an uncommitted
/// stage removes the file.
#[derive(Debug)]
pub struct StagedPng {
    staged: PathBuf,
    target: PathBuf,
}

/// Encode `image` and write it beside `target` without touching `target` itself.
pub fn stage_png(target: &Path, image: &RgbaImage) -> Result<StagedPng> {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image.png".to_string());
    let staged = target.with_file_name(format!(
        ".{}-{}.part",
        Uuid::new_v4().simple(),
        file_name
    ));
    write_png(&staged, image)?;
    Ok(StagedPng {
        staged,
        target: target.to_path_buf(),
    })
}

impl StagedPng {
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Move the staged file onto its target, replacing whatever is there.
    pub fn commit(mut self) -> Result<PathBuf> {
        std::fs::rename(&self.staged, &self.target)?;
        self.staged = PathBuf::new();
        Ok(std::mem::take(&mut self.target))
    }
}

impl Drop for StagedPng {
    fn drop(&mut self) {
        if self.staged.as_os_str().is_empty() {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.staged) {
            warn!("Could not remove staged file {:?}: {}", self.staged, e);
        }
    }
}
