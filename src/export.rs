//! Save frames as grayscale PNG files, for checking a pattern without a
//! projector.

use crate::error::FrameError;
use crate::frames::FrameBuffer;
use image::{GrayImage, ImageFormat};
use std::fs;
use std::path::{Path, PathBuf};

/// Copy one frame into an 8-bit grayscale image.
pub fn frame_image(buffer: &FrameBuffer, frame: usize) -> Result<GrayImage, FrameError> {
    let pixels = buffer.frame(frame)?.to_vec();
    let too_large = || FrameError::invalid_argument("frame too large for an image");

    let width = u32::try_from(buffer.width()).map_err(|_| too_large())?;
    let height = u32::try_from(buffer.height()).map_err(|_| too_large())?;
    GrayImage::from_raw(width, height, pixels).ok_or_else(too_large)
}

/// Write one frame to `path` as PNG.
pub fn save_frame_png(
    buffer: &FrameBuffer,
    frame: usize,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    frame_image(buffer, frame)?.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Write every frame to `dir` as `{stem}_0000.png`, `{stem}_0001.png`, ...
/// creating the directory if needed. Returns the written paths in order.
pub fn save_sequence_png(
    buffer: &FrameBuffer,
    dir: &Path,
    stem: &str,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)?;

    let mut paths = Vec::with_capacity(buffer.frame_count());
    for frame in 0..buffer.frame_count() {
        let path = dir.join(format!("{stem}_{frame:04}.png"));
        save_frame_png(buffer, frame, &path)?;
        paths.push(path);
    }

    tracing::info!("Exported {} frame(s) to {}", paths.len(), dir.display());
    Ok(paths)
}
