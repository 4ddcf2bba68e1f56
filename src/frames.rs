//! Frame buffer: a flat, zero-initialised byte raster holding a sequence of
//! equally sized monochrome frames.
//!
//! The byte layout is exactly what the projector expects for upload: frames
//! are concatenated in order, each frame is row-major (`width` bytes per row,
//! `height` rows), one byte per pixel (0 = off, 255 = on).
//!
//! ## Rust concepts
//! - A single owned `Vec<u8>` replaces manual allocation; it is freed on drop
//! - `Result` for every fallible accessor instead of debug-only asserts
//! - `chunks_exact` for iterating frames without index arithmetic
//! - `slice::fill` for one contiguous write per row

use crate::error::FrameError;

/// Pixel value for a fully lit micromirror.
pub const PIXEL_ON: u8 = 255;
/// Pixel value for a dark micromirror.
pub const PIXEL_OFF: u8 = 0;

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub left: usize,
    pub top: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(left: usize, top: usize, width: usize, height: usize) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// True when the rectangle covers at least one pixel and lies entirely
    /// inside a `frame_width x frame_height` frame.
    pub fn fits_within(&self, frame_width: usize, frame_height: usize) -> bool {
        let right = self.left.checked_add(self.width);
        let bottom = self.top.checked_add(self.height);
        self.width > 0
            && self.height > 0
            && right.is_some_and(|r| r <= frame_width)
            && bottom.is_some_and(|b| b <= frame_height)
    }
}

/// One or more monochrome frames stored back to back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    frame_count: usize,
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Allocate `frame_count` black frames of `width x height` pixels.
    pub fn new(frame_count: usize, width: usize, height: usize) -> Result<Self, FrameError> {
        let invalid = || FrameError::InvalidDimension {
            frame_count,
            width,
            height,
        };

        if frame_count == 0 || width == 0 || height == 0 {
            return Err(invalid());
        }

        let len = frame_count
            .checked_mul(width)
            .and_then(|n| n.checked_mul(height))
            .ok_or_else(invalid)?;

        Ok(Self {
            frame_count,
            width,
            height,
            data: vec![PIXEL_OFF; len],
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of bytes in one frame.
    pub fn frame_len(&self) -> usize {
        self.width * self.height
    }

    /// The whole sequence as one contiguous block, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Byte offset of the first pixel of `frame` within [`as_bytes`](Self::as_bytes).
    pub fn frame_offset(&self, frame: usize) -> Result<usize, FrameError> {
        self.check_frame(frame)?;
        Ok(frame * self.frame_len())
    }

    /// Read-only view of one frame's row-major pixel data.
    pub fn frame(&self, frame: usize) -> Result<&[u8], FrameError> {
        let start = self.frame_offset(frame)?;
        Ok(&self.data[start..start + self.frame_len()])
    }

    /// Mutable view of one frame's row-major pixel data.
    pub fn frame_mut(&mut self, frame: usize) -> Result<&mut [u8], FrameError> {
        let start = self.frame_offset(frame)?;
        let len = self.frame_len();
        Ok(&mut self.data[start..start + len])
    }

    /// Iterate over all frames in display order.
    pub fn frames(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.frame_len())
    }

    /// Read the pixel at column `x`, row `y` of `frame`.
    pub fn pixel(&self, frame: usize, x: usize, y: usize) -> Result<u8, FrameError> {
        let index = self.pixel_index(frame, x, y)?;
        Ok(self.data[index])
    }

    /// Mutable access to the pixel at column `x`, row `y` of `frame`.
    pub fn pixel_mut(&mut self, frame: usize, x: usize, y: usize) -> Result<&mut u8, FrameError> {
        let index = self.pixel_index(frame, x, y)?;
        Ok(&mut self.data[index])
    }

    pub fn set_pixel(
        &mut self,
        frame: usize,
        x: usize,
        y: usize,
        value: u8,
    ) -> Result<(), FrameError> {
        *self.pixel_mut(frame, x, y)? = value;
        Ok(())
    }

    /// Set every pixel of `[left, left + width) x [top, top + height)` in
    /// `frame` to `value`.
    ///
    /// The rectangle must be non-empty and lie entirely inside the frame.
    /// Each row is a contiguous run, so this is one slice fill per row.
    pub fn fill_rect(
        &mut self,
        frame: usize,
        left: usize,
        top: usize,
        width: usize,
        height: usize,
        value: u8,
    ) -> Result<(), FrameError> {
        self.fill(frame, Rect::new(left, top, width, height), value)
    }

    /// [`fill_rect`](Self::fill_rect) taking a [`Rect`].
    pub fn fill(&mut self, frame: usize, rect: Rect, value: u8) -> Result<(), FrameError> {
        self.check_rect(frame, rect)?;

        let stride = self.width;
        let base = frame * self.frame_len();
        for y in rect.top..rect.top + rect.height {
            let start = base + y * stride + rect.left;
            self.data[start..start + rect.width].fill(value);
        }
        Ok(())
    }

    /// Reset every frame to black.
    pub fn clear(&mut self) {
        self.data.fill(PIXEL_OFF);
    }

    /// Validate `frame` and `rect` without writing anything.
    pub(crate) fn check_rect(&self, frame: usize, rect: Rect) -> Result<(), FrameError> {
        self.check_frame(frame)?;
        if !rect.fits_within(self.width, self.height) {
            return Err(FrameError::OutOfBounds {
                rect,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    fn check_frame(&self, frame: usize) -> Result<(), FrameError> {
        check_index("frame", frame, self.frame_count)
    }

    fn pixel_index(&self, frame: usize, x: usize, y: usize) -> Result<usize, FrameError> {
        self.check_frame(frame)?;
        check_index("column", x, self.width)?;
        check_index("row", y, self.height)?;
        Ok(frame * self.frame_len() + y * self.width + x)
    }
}

fn check_index(what: &'static str, index: usize, limit: usize) -> Result<(), FrameError> {
    if index < limit {
        Ok(())
    } else {
        Err(FrameError::IndexOutOfRange { what, index, limit })
    }
}
