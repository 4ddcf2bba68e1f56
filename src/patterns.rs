//! Test patterns drawn onto a [`FrameBuffer`] with rectangle fills.
//!
//! Every routine validates all of its rectangles before writing the first
//! pixel, so a failed call never leaves a half-drawn pattern behind.

use crate::error::FrameError;
use crate::frames::{FrameBuffer, PIXEL_ON, Rect};

/// Direction in which stripes run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// Vertical lines, laid out left to right.
    Vertical,
    /// Horizontal lines, laid out top to bottom.
    Horizontal,
}

impl Axis {
    /// Rectangle of a stripe starting `start` pixels along the axis.
    fn stripe(self, start: usize, thickness: usize, span: usize) -> Rect {
        match self {
            Axis::Vertical => Rect::new(start, 0, thickness, span),
            Axis::Horizontal => Rect::new(0, start, span, thickness),
        }
    }
}

impl FrameBuffer {
    /// Move a square from the top-left to the bottom-right corner across all
    /// frames. This also makes flipped projection optics easy to spot.
    ///
    /// The square's side is `height / 5`. Frame `f` of `n` places its
    /// top-left corner at `(f * (width - side) / (n - 1), f * (height - side) / (n - 1))`.
    pub fn draw_moving_square(&mut self) -> Result<(), FrameError> {
        let frames = self.frame_count();
        if frames < 2 {
            return Err(FrameError::invalid_argument(format!(
                "moving square needs at least 2 frames, got {frames}"
            )));
        }

        let side = self.height() / 5;
        self.check_rect(0, Rect::new(0, 0, side, side))?;

        let dx = self.width() - side;
        let dy = self.height() - side;
        for f in 0..frames {
            let left = f * dx / (frames - 1);
            let top = f * dy / (frames - 1);
            self.fill(f, Rect::new(left, top, side, side), PIXEL_ON)?;
        }
        Ok(())
    }

    /// Fill a `size x size` square centred on a `canvas_width x canvas_height`
    /// canvas. Single-frame buffers only.
    pub fn draw_centered_square(
        &mut self,
        frame: usize,
        canvas_width: usize,
        canvas_height: usize,
        size: usize,
    ) -> Result<(), FrameError> {
        self.require_single_frame("centered square")?;

        let out_of_bounds = || FrameError::OutOfBounds {
            rect: Rect::new(0, 0, size, size),
            width: self.width(),
            height: self.height(),
        };
        let left = (canvas_width / 2)
            .checked_sub(size / 2)
            .ok_or_else(out_of_bounds)?;
        let top = (canvas_height / 2)
            .checked_sub(size / 2)
            .ok_or_else(out_of_bounds)?;

        self.fill(frame, Rect::new(left, top, size, size), PIXEL_ON)
    }

    /// Fill parallel stripes `line_width` pixels thick. The k-th stripe starts
    /// at `padding + k * (line_width + spacing)` along the axis and spans the
    /// whole frame in the other direction. Stripes that would cross the frame
    /// edge are not drawn. Single-frame buffers only.
    pub fn draw_stripes(
        &mut self,
        frame: usize,
        axis: Axis,
        padding: usize,
        spacing: usize,
        line_width: usize,
    ) -> Result<(), FrameError> {
        self.require_single_frame("stripes")?;
        let rects = self.stripe_rects(axis, padding, spacing, line_width)?;
        self.fill_all(frame, &rects)
    }

    /// Vertical and horizontal stripes together. `h_padding` and `h_spacing`
    /// place the vertical lines along x; `v_padding` and `v_spacing` place the
    /// horizontal lines along y.
    pub fn draw_grid(
        &mut self,
        frame: usize,
        v_padding: usize,
        h_padding: usize,
        v_spacing: usize,
        h_spacing: usize,
        line_width: usize,
    ) -> Result<(), FrameError> {
        self.require_single_frame("grid")?;
        let mut rects = self.stripe_rects(Axis::Vertical, h_padding, h_spacing, line_width)?;
        rects.extend(self.stripe_rects(Axis::Horizontal, v_padding, v_spacing, line_width)?);
        self.fill_all(frame, &rects)
    }

    /// Tile the frame with `square_size` squares starting at
    /// `(padding, padding)`, lighting tile `(i, j)` when `i + j` is even.
    /// Tiles on the right and bottom edges are clipped to the frame.
    pub fn draw_checkerboard(
        &mut self,
        frame: usize,
        padding: usize,
        square_size: usize,
    ) -> Result<(), FrameError> {
        if square_size == 0 {
            return Err(FrameError::invalid_argument("checkerboard square size is 0"));
        }
        if padding >= self.width() || padding >= self.height() {
            return Err(FrameError::OutOfBounds {
                rect: Rect::new(padding, padding, square_size, square_size),
                width: self.width(),
                height: self.height(),
            });
        }

        let mut rects = Vec::new();
        for (row, top) in (padding..self.height()).step_by(square_size).enumerate() {
            let tile_height = square_size.min(self.height() - top);
            for (col, left) in (padding..self.width()).step_by(square_size).enumerate() {
                if (row + col) % 2 == 0 {
                    let tile_width = square_size.min(self.width() - left);
                    rects.push(Rect::new(left, top, tile_width, tile_height));
                }
            }
        }
        self.fill_all(frame, &rects)
    }

    fn stripe_rects(
        &self,
        axis: Axis,
        padding: usize,
        spacing: usize,
        line_width: usize,
    ) -> Result<Vec<Rect>, FrameError> {
        if line_width == 0 {
            return Err(FrameError::invalid_argument("stripe line width is 0"));
        }

        let (extent, span) = match axis {
            Axis::Vertical => (self.width(), self.height()),
            Axis::Horizontal => (self.height(), self.width()),
        };
        let fits = |start: usize| start.checked_add(line_width).is_some_and(|end| end <= extent);

        if !fits(padding) {
            return Err(FrameError::OutOfBounds {
                rect: axis.stripe(padding, line_width, span),
                width: self.width(),
                height: self.height(),
            });
        }

        let step = line_width.saturating_add(spacing);
        let mut rects = Vec::new();
        let mut start = Some(padding);
        while let Some(s) = start.filter(|&s| fits(s)) {
            rects.push(axis.stripe(s, line_width, span));
            start = s.checked_add(step);
        }
        Ok(rects)
    }

    /// Validate every rectangle, then fill them all.
    fn fill_all(&mut self, frame: usize, rects: &[Rect]) -> Result<(), FrameError> {
        for &rect in rects {
            self.check_rect(frame, rect)?;
        }
        for &rect in rects {
            self.fill(frame, rect, PIXEL_ON)?;
        }
        Ok(())
    }

    fn require_single_frame(&self, routine: &str) -> Result<(), FrameError> {
        match self.frame_count() {
            1 => Ok(()),
            n => Err(FrameError::invalid_argument(format!(
                "{routine} needs a single-frame buffer, got {n} frames"
            ))),
        }
    }
}

// ── Pattern descriptions ─────────────────────────────────────────────

/// A complete test pattern, ready to render into a fresh buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pattern {
    /// Square sliding from the top-left to the bottom-right corner.
    MovingSquare,
    /// Single square in the middle of the frame.
    CenteredSquare { size: usize },
    /// Parallel lines along one axis.
    Stripes {
        axis: Axis,
        padding: usize,
        spacing: usize,
        line_width: usize,
    },
    /// Lines along both axes with the same padding and spacing.
    Grid {
        padding: usize,
        spacing: usize,
        line_width: usize,
    },
    Checkerboard { padding: usize, square_size: usize },
}

impl Pattern {
    pub fn name(&self) -> &'static str {
        match self {
            Pattern::MovingSquare => "moving square",
            Pattern::CenteredSquare { .. } => "centered square",
            Pattern::Stripes {
                axis: Axis::Vertical,
                ..
            } => "vertical lines",
            Pattern::Stripes {
                axis: Axis::Horizontal,
                ..
            } => "horizontal lines",
            Pattern::Grid { .. } => "grid",
            Pattern::Checkerboard { .. } => "checkerboard",
        }
    }

    /// Allocate a `frame_count x width x height` buffer and draw this pattern
    /// into it. The checkerboard is drawn into every frame; the other static
    /// patterns require a single frame.
    pub fn render(
        &self,
        frame_count: usize,
        width: usize,
        height: usize,
    ) -> Result<FrameBuffer, FrameError> {
        let mut buffer = FrameBuffer::new(frame_count, width, height)?;

        match *self {
            Pattern::MovingSquare => buffer.draw_moving_square()?,
            Pattern::CenteredSquare { size } => {
                buffer.draw_centered_square(0, width, height, size)?
            }
            Pattern::Stripes {
                axis,
                padding,
                spacing,
                line_width,
            } => buffer.draw_stripes(0, axis, padding, spacing, line_width)?,
            Pattern::Grid {
                padding,
                spacing,
                line_width,
            } => buffer.draw_grid(0, padding, padding, spacing, spacing, line_width)?,
            Pattern::Checkerboard {
                padding,
                square_size,
            } => {
                for frame in 0..frame_count {
                    buffer.draw_checkerboard(frame, padding, square_size)?;
                }
            }
        }

        tracing::debug!(
            "Rendered {} into {} frame(s) of {}x{}",
            self.name(),
            frame_count,
            width,
            height
        );
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// Lit pixels of one frame, as (x, y) pairs in row-major order.
    fn lit(buf: &FrameBuffer, frame: usize) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for y in 0..buf.height() {
            for x in 0..buf.width() {
                if buf.pixel(frame, x, y).unwrap() == PIXEL_ON {
                    out.push((x, y));
                }
            }
        }
        out
    }

    fn rect_pixels(left: usize, top: usize, width: usize, height: usize) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for y in top..top + height {
            for x in left..left + width {
                out.push((x, y));
            }
        }
        out
    }

    /// Columns (for vertical stripes) that are lit in row 0.
    fn lit_columns(buf: &FrameBuffer) -> Vec<usize> {
        (0..buf.width())
            .filter(|&x| buf.pixel(0, x, 0).unwrap() == PIXEL_ON)
            .collect()
    }

    // ── Moving square ──────────────────────────────────────────────

    #[test]
    fn moving_square_needs_two_frames() {
        let mut buf = FrameBuffer::new(1, 50, 50).unwrap();
        let err = buf.draw_moving_square().unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(buf.as_bytes().iter().all(|&p| p == 0));
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 10)]
    #[case(2, 20)]
    #[case(3, 30)]
    #[case(4, 40)]
    fn moving_square_interpolates_corner(#[case] frame: usize, #[case] corner: usize) {
        let mut buf = FrameBuffer::new(5, 50, 50).unwrap();
        buf.draw_moving_square().unwrap();
        assert_eq!(lit(&buf, frame), rect_pixels(corner, corner, 10, 10));
    }

    #[test]
    fn moving_square_on_wide_frame() {
        let mut buf = FrameBuffer::new(3, 40, 10).unwrap();
        buf.draw_moving_square().unwrap();
        // side 2, dx 38, dy 8
        assert_eq!(lit(&buf, 0), rect_pixels(0, 0, 2, 2));
        assert_eq!(lit(&buf, 1), rect_pixels(19, 4, 2, 2));
        assert_eq!(lit(&buf, 2), rect_pixels(38, 8, 2, 2));
    }

    #[test]
    fn moving_square_rejects_frames_too_short_for_a_square() {
        let mut buf = FrameBuffer::new(2, 10, 4).unwrap();
        assert!(buf.draw_moving_square().unwrap_err().is_out_of_bounds());
    }

    // ── Centered square ────────────────────────────────────────────

    #[test]
    fn centered_square_sits_in_the_middle() {
        let mut buf = FrameBuffer::new(1, 20, 10).unwrap();
        buf.draw_centered_square(0, 20, 10, 4).unwrap();
        assert_eq!(lit(&buf, 0), rect_pixels(8, 3, 4, 4));
    }

    #[test]
    fn centered_square_requires_one_frame() {
        let mut buf = FrameBuffer::new(2, 20, 10).unwrap();
        let err = buf.draw_centered_square(0, 20, 10, 4).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[rstest]
    #[case(12)]
    #[case(21)]
    fn centered_square_larger_than_frame_is_out_of_bounds(#[case] size: usize) {
        let mut buf = FrameBuffer::new(1, 20, 10).unwrap();
        let err = buf.draw_centered_square(0, 20, 10, size).unwrap_err();
        assert!(err.is_out_of_bounds());
        assert!(lit(&buf, 0).is_empty());
    }

    // ── Stripes ────────────────────────────────────────────────────

    #[rstest]
    #[case(0, 2, 1, vec![0, 3, 6, 9])]
    #[case(1, 1, 2, vec![1, 2, 4, 5, 7, 8])]
    #[case(4, 0, 3, vec![4, 5, 6, 7, 8, 9])]
    #[case(0, 3, 4, vec![0, 1, 2, 3])]
    fn vertical_stripes_follow_step_rule(
        #[case] padding: usize,
        #[case] spacing: usize,
        #[case] line_width: usize,
        #[case] expected: Vec<usize>,
    ) {
        let mut buf = FrameBuffer::new(1, 10, 3).unwrap();
        buf.draw_stripes(0, Axis::Vertical, padding, spacing, line_width)
            .unwrap();

        assert_eq!(lit_columns(&buf), expected);
        // Every lit column spans the full height.
        let lit_count = lit(&buf, 0).len();
        assert_eq!(lit_count, expected.len() * 3);
    }

    #[test]
    fn horizontal_stripes_span_full_width() {
        let mut buf = FrameBuffer::new(1, 4, 8).unwrap();
        buf.draw_stripes(0, Axis::Horizontal, 1, 2, 2).unwrap();

        let mut expected = rect_pixels(0, 1, 4, 2);
        expected.extend(rect_pixels(0, 5, 4, 2));
        assert_eq!(lit(&buf, 0), expected);
    }

    #[test]
    fn stripes_reject_zero_width_and_bad_padding() {
        let mut buf = FrameBuffer::new(1, 10, 10).unwrap();
        assert!(
            buf.draw_stripes(0, Axis::Vertical, 0, 1, 0)
                .unwrap_err()
                .is_invalid_argument()
        );
        assert!(
            buf.draw_stripes(0, Axis::Horizontal, 9, 1, 2)
                .unwrap_err()
                .is_out_of_bounds()
        );
    }

    #[test]
    fn stripes_require_one_frame() {
        let mut buf = FrameBuffer::new(3, 10, 10).unwrap();
        assert!(
            buf.draw_stripes(0, Axis::Vertical, 0, 1, 1)
                .unwrap_err()
                .is_invalid_argument()
        );
    }

    #[test]
    fn stripes_reject_bad_frame_index_without_writing() {
        let mut buf = FrameBuffer::new(1, 10, 10).unwrap();
        let err = buf.draw_stripes(1, Axis::Vertical, 0, 1, 1).unwrap_err();
        assert!(err.is_index_out_of_range());
        assert!(lit(&buf, 0).is_empty());
    }

    // ── Grid ───────────────────────────────────────────────────────

    #[test]
    fn grid_combines_both_axes() {
        let mut buf = FrameBuffer::new(1, 6, 6).unwrap();
        buf.draw_grid(0, 0, 0, 2, 2, 1).unwrap();

        for y in 0..6 {
            for x in 0..6 {
                let expected = if x % 3 == 0 || y % 3 == 0 { PIXEL_ON } else { 0 };
                assert_eq!(buf.pixel(0, x, y).unwrap(), expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn grid_with_bad_horizontal_part_writes_nothing() {
        let mut buf = FrameBuffer::new(1, 10, 4).unwrap();
        // Vertical lines fit; horizontal padding 4 does not.
        let err = buf.draw_grid(0, 4, 0, 1, 1, 1).unwrap_err();
        assert!(err.is_out_of_bounds());
        assert!(lit(&buf, 0).is_empty());
    }

    // ── Checkerboard ───────────────────────────────────────────────

    #[test]
    fn checkerboard_uses_standard_parity() {
        let mut buf = FrameBuffer::new(1, 4, 4).unwrap();
        buf.draw_checkerboard(0, 0, 2).unwrap();

        let mut expected = rect_pixels(0, 0, 2, 2);
        expected.extend(rect_pixels(2, 2, 2, 2));
        expected.sort_by_key(|&(x, y)| (y, x));
        assert_eq!(lit(&buf, 0), expected);
    }

    #[test]
    fn checkerboard_clips_edge_tiles_and_honours_padding() {
        let mut buf = FrameBuffer::new(1, 7, 5).unwrap();
        buf.draw_checkerboard(0, 1, 3).unwrap();

        // Tiles start at 1 and 4; (0,0) full, (1,1) clipped to 3x1.
        let mut expected = rect_pixels(1, 1, 3, 3);
        expected.extend(rect_pixels(4, 4, 3, 1));
        expected.sort_by_key(|&(x, y)| (y, x));
        assert_eq!(lit(&buf, 0), expected);
    }

    #[test]
    fn checkerboard_works_on_any_frame() {
        let mut buf = FrameBuffer::new(2, 4, 4).unwrap();
        buf.draw_checkerboard(1, 0, 1).unwrap();
        assert!(lit(&buf, 0).is_empty());
        assert_eq!(lit(&buf, 1).len(), 8);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(4, 2)]
    #[case(9, 2)]
    fn checkerboard_rejects_bad_arguments(#[case] padding: usize, #[case] size: usize) {
        let mut buf = FrameBuffer::new(1, 8, 4).unwrap();
        assert!(buf.draw_checkerboard(0, padding, size).is_err());
        assert!(lit(&buf, 0).is_empty());
    }

    // ── Pattern::render ────────────────────────────────────────────

    #[test]
    fn render_builds_fresh_buffer() {
        let buf = Pattern::CenteredSquare { size: 2 }.render(1, 4, 4).unwrap();
        assert_eq!(lit(&buf, 0), rect_pixels(1, 1, 2, 2));
    }

    #[test]
    fn render_checkerboard_fills_every_frame() {
        let pattern = Pattern::Checkerboard {
            padding: 0,
            square_size: 2,
        };
        let buf = pattern.render(3, 4, 4).unwrap();
        for f in 0..3 {
            assert_eq!(lit(&buf, f).len(), 8);
        }
    }

    #[test]
    fn render_propagates_errors() {
        let err = Pattern::MovingSquare.render(1, 50, 50).unwrap_err();
        assert!(err.is_invalid_argument());

        let err = Pattern::MovingSquare.render(0, 50, 50).unwrap_err();
        assert!(err.is_invalid_dimension());
    }

    #[rstest]
    #[case(Pattern::MovingSquare, "moving square")]
    #[case(Pattern::Grid { padding: 0, spacing: 1, line_width: 1 }, "grid")]
    #[case(
        Pattern::Stripes { axis: Axis::Horizontal, padding: 0, spacing: 1, line_width: 1 },
        "horizontal lines"
    )]
    fn pattern_names(#[case] pattern: Pattern, #[case] name: &str) {
        assert_eq!(pattern.name(), name);
    }
}
