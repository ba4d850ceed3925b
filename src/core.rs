use crate::error::{SpinrigError, SpinrigResult};

pub use kurbo::{Point, Rect, Vec2};

/// Grid geometry of a turntable sprite sheet. Frames are laid out row-major:
/// left to right, then top to bottom. Trailing cells past `total_frames` are
/// unused padding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SpriteSheet {
    pub cols: u32,
    pub rows: u32,
    pub total_frames: u32, // <= cols * rows
}

impl SpriteSheet {
    pub fn new(cols: u32, rows: u32, total_frames: u32) -> SpinrigResult<Self> {
        if cols == 0 || rows == 0 {
            return Err(SpinrigError::validation(
                "SpriteSheet cols and rows must be > 0",
            ));
        }
        if total_frames == 0 {
            return Err(SpinrigError::validation(
                "SpriteSheet total_frames must be > 0",
            ));
        }
        if u64::from(total_frames) > u64::from(cols) * u64::from(rows) {
            return Err(SpinrigError::validation(
                "SpriteSheet total_frames must be <= cols * rows",
            ));
        }
        Ok(Self {
            cols,
            rows,
            total_frames,
        })
    }

    /// Grid cell (col, row) holding `frame`.
    pub fn cell_of(self, frame: u32) -> SpinrigResult<(u32, u32)> {
        if frame >= self.total_frames {
            return Err(SpinrigError::validation(format!(
                "frame {frame} out of range for sheet with {} frames",
                self.total_frames
            )));
        }
        Ok((frame % self.cols, frame / self.cols))
    }
}

/// Logical view size plus the display's device pixel ratio. The compositor
/// allocates its backing store at `logical * pixel_ratio` so output stays
/// sharp on high-density displays while the embedder lays out in logical
/// units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewBox {
    pub width: f64,
    pub height: f64,
    pub pixel_ratio: f64,
}

impl ViewBox {
    pub fn new(width: f64, height: f64, pixel_ratio: f64) -> SpinrigResult<Self> {
        if !width.is_finite() || width <= 0.0 || !height.is_finite() || height <= 0.0 {
            return Err(SpinrigError::validation("ViewBox size must be > 0"));
        }
        if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 {
            return Err(SpinrigError::validation("ViewBox pixel_ratio must be > 0"));
        }
        Ok(Self {
            width,
            height,
            pixel_ratio,
        })
    }

    /// Backing-store size in device pixels, never zero.
    pub fn backing_size(self) -> (u32, u32) {
        let w = (self.width * self.pixel_ratio).round().max(1.0) as u32;
        let h = (self.height * self.pixel_ratio).round().max(1.0) as u32;
        (w, h)
    }
}

/// Maps an accumulated pointer displacement onto the frame circle:
/// `(start + delta_px * sensitivity) mod total`, normalized into
/// `[0, total)` for displacements of any sign and magnitude.
/// `total` must be > 0.
pub fn wrap_frame(start: f64, delta_px: f64, sensitivity: f64, total: u32) -> f64 {
    let total = f64::from(total);
    let frame = (start + delta_px * sensitivity).rem_euclid(total);
    // rem_euclid can land on exactly `total` for tiny negative inputs
    if frame >= total { 0.0 } else { frame }
}

/// Nearest whole frame for display, wrapped into `[0, total)`.
/// `total` must be > 0.
pub fn snap_frame(frame: f64, total: u32) -> u32 {
    let total_f = f64::from(total);
    let snapped = frame.round().rem_euclid(total_f);
    if snapped >= total_f { 0 } else { snapped as u32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_many_revolutions_lands_on_start() {
        // 7200 px at 0.1 frames/px over 72 frames is exactly 10 revolutions.
        assert_eq!(wrap_frame(0.0, 7200.0, 0.1, 72), 0.0);
    }

    #[test]
    fn wrap_negative_displacement() {
        assert_eq!(wrap_frame(0.0, -10.0, 0.1, 72), 71.0);
        assert_eq!(wrap_frame(5.0, -72000.0, 0.1, 72), 5.0);
    }

    #[test]
    fn wrap_stays_in_range() {
        for delta in [-1e9, -3601.0, -1.0, 0.0, 0.5, 3599.0, 1e9] {
            let f = wrap_frame(12.3, delta, 0.2, 72);
            assert!((0.0..72.0).contains(&f), "delta {delta} gave {f}");
        }
    }

    #[test]
    fn snap_rounds_and_wraps() {
        assert_eq!(snap_frame(71.7, 72), 0);
        assert_eq!(snap_frame(-0.4, 72), 0);
        assert_eq!(snap_frame(35.5, 72), 36);
        assert_eq!(snap_frame(0.49, 72), 0);
    }

    #[test]
    fn sheet_validates_capacity() {
        assert!(SpriteSheet::new(12, 6, 72).is_ok());
        assert!(SpriteSheet::new(12, 6, 73).is_err());
        assert!(SpriteSheet::new(0, 6, 1).is_err());
        assert!(SpriteSheet::new(12, 6, 0).is_err());
    }

    #[test]
    fn cells_are_row_major() {
        let sheet = SpriteSheet::new(12, 12, 144).unwrap();
        assert_eq!(sheet.cell_of(0).unwrap(), (0, 0));
        assert_eq!(sheet.cell_of(11).unwrap(), (11, 0));
        assert_eq!(sheet.cell_of(13).unwrap(), (1, 1));
        assert_eq!(sheet.cell_of(143).unwrap(), (11, 11));
        assert!(sheet.cell_of(144).is_err());
    }

    #[test]
    fn view_box_backing_size_scales_by_pixel_ratio() {
        let vb = ViewBox::new(300.0, 150.0, 2.0).unwrap();
        assert_eq!(vb.backing_size(), (600, 300));

        let vb = ViewBox::new(333.0, 111.0, 1.5).unwrap();
        assert_eq!(vb.backing_size(), (500, 167));

        assert!(ViewBox::new(0.0, 100.0, 1.0).is_err());
        assert!(ViewBox::new(100.0, 100.0, 0.0).is_err());
    }
}
