use kurbo::Rect;

use crate::asset::SpriteImage;
use crate::core::{SpriteSheet, ViewBox};
use crate::error::{SpinrigError, SpinrigResult};

/// Integer pixel rectangle, origin inclusive, extent exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Compositor settings.
#[derive(Clone, Debug, Default)]
pub struct CompositorSettings {
    /// Straight-alpha clear color for the surface and letterbox margins.
    /// `None` clears to transparent.
    pub clear_rgba: Option<[u8; 4]>,
}

/// Pixel-exact source rectangle of `frame` within a sheet image.
///
/// Cell edges are the rounded fractional boundaries `i * size / n`, so the
/// cells partition the image exactly: adjacent cells share edges, nothing
/// bleeds across, and every rect stays in bounds for any image size and any
/// grid.
pub fn source_rect(
    sheet: SpriteSheet,
    image_w: u32,
    image_h: u32,
    frame: u32,
) -> SpinrigResult<PixelRect> {
    let (col, row) = sheet.cell_of(frame)?;
    let x0 = cell_edge(col, sheet.cols, image_w);
    let x1 = cell_edge(col + 1, sheet.cols, image_w);
    let y0 = cell_edge(row, sheet.rows, image_h);
    let y1 = cell_edge(row + 1, sheet.rows, image_h);
    Ok(PixelRect {
        x: x0,
        y: y0,
        w: x1 - x0,
        h: y1 - y0,
    })
}

// round-half-up of i * size / n, in integers
fn cell_edge(i: u32, n: u32, size: u32) -> u32 {
    ((2 * u64::from(i) * u64::from(size) + u64::from(n)) / (2 * u64::from(n))) as u32
}

/// Destination rectangle for a frame on a `target_w` x `target_h` surface:
/// contain-fit, scaled by `zoom`, centered. The short axis gets letterbox
/// margins; zoom above 1 may overflow the surface and the blit clips.
pub fn dest_rect(frame_w: u32, frame_h: u32, target_w: u32, target_h: u32, zoom: f64) -> Rect {
    if frame_w == 0 || frame_h == 0 || target_w == 0 || target_h == 0 {
        return Rect::ZERO;
    }
    let fw = f64::from(frame_w);
    let fh = f64::from(frame_h);
    let tw = f64::from(target_w);
    let th = f64::from(target_h);

    let scale = (tw / fw).min(th / fh) * zoom;
    let w = fw * scale;
    let h = fh * scale;
    let x = (tw - w) / 2.0;
    let y = (th - h) / 2.0;
    Rect::new(x, y, x + w, y + h)
}

/// Owned display backing store: premultiplied RGBA8, row-major, tightly
/// packed. Size it from a [`ViewBox`] to stay sharp on high-density
/// displays.
#[derive(Clone, Debug)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> SpinrigResult<Self> {
        if width == 0 || height == 0 {
            return Err(SpinrigError::validation("Surface size must be > 0"));
        }
        let len = (width as usize) * (height as usize) * 4;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    pub fn from_view_box(view: ViewBox) -> SpinrigResult<Self> {
        let (w, h) = view.backing_size();
        Self::new(w, h)
    }

    pub fn clear(&mut self, rgba: Option<[u8; 4]>) {
        match rgba {
            None | Some([_, _, _, 0]) => self.data.fill(0),
            Some([r, g, b, a]) => {
                let px = [
                    mul_div255(u16::from(r), u16::from(a)),
                    mul_div255(u16::from(g), u16::from(a)),
                    mul_div255(u16::from(b), u16::from(a)),
                    a,
                ];
                for chunk in self.data.chunks_exact_mut(4) {
                    chunk.copy_from_slice(&px);
                }
            }
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Un-premultiplied copy of the pixels, for export paths that expect
    /// straight alpha (PNG encoders and the like).
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(4) {
            let a = px[3] as u32;
            if a == 0 {
                px[0] = 0;
                px[1] = 0;
                px[2] = 0;
                continue;
            }
            px[0] = ((px[0] as u32 * 255 + a / 2) / a).min(255) as u8;
            px[1] = ((px[1] as u32 * 255 + a / 2) / a).min(255) as u8;
            px[2] = ((px[2] as u32 * 255 + a / 2) / a).min(255) as u8;
        }
        out
    }
}

/// Clears the surface and draws one sheet frame, letterboxed and zoomed.
pub fn draw_frame(
    surface: &mut Surface,
    image: &SpriteImage,
    sheet: SpriteSheet,
    frame: u32,
    zoom: f64,
    settings: &CompositorSettings,
) -> SpinrigResult<()> {
    let src = source_rect(sheet, image.width, image.height, frame)?;
    surface.clear(settings.clear_rgba);
    let dest = dest_rect(src.w, src.h, surface.width, surface.height, zoom);
    blit_nearest(surface, image, src, dest, 1.0);
    Ok(())
}

/// Clears, draws `frame` at full opacity, then `next_frame` over it at
/// `blend` opacity. With premultiplied sources the pair reads as a smooth
/// cross-fade between neighboring turntable positions.
pub fn draw_crossfade(
    surface: &mut Surface,
    image: &SpriteImage,
    sheet: SpriteSheet,
    frame: u32,
    next_frame: u32,
    blend: f64,
    zoom: f64,
    settings: &CompositorSettings,
) -> SpinrigResult<()> {
    let src_a = source_rect(sheet, image.width, image.height, frame)?;
    let src_b = source_rect(sheet, image.width, image.height, next_frame)?;
    surface.clear(settings.clear_rgba);

    let dest_a = dest_rect(src_a.w, src_a.h, surface.width, surface.height, zoom);
    blit_nearest(surface, image, src_a, dest_a, 1.0);
    let dest_b = dest_rect(src_b.w, src_b.h, surface.width, surface.height, zoom);
    blit_nearest(surface, image, src_b, dest_b, blend.clamp(0.0, 1.0) as f32);
    Ok(())
}

/// Clipped nearest-neighbor blit of `src` into `dest`, compositing each
/// sample over the surface at `opacity`. Work is bounded by the clipped
/// destination area regardless of sprite-sheet size.
fn blit_nearest(
    surface: &mut Surface,
    image: &SpriteImage,
    src: PixelRect,
    dest: Rect,
    opacity: f32,
) {
    if src.w == 0 || src.h == 0 || dest.width() <= 0.0 || dest.height() <= 0.0 {
        return;
    }

    // pixels whose centers fall inside the clipped dest rect
    let x_start = ((dest.x0 - 0.5).ceil() as i64).max(0);
    let x_end = ((dest.x1 - 0.5).ceil() as i64).min(i64::from(surface.width));
    let y_start = ((dest.y0 - 0.5).ceil() as i64).max(0);
    let y_end = ((dest.y1 - 0.5).ceil() as i64).min(i64::from(surface.height));

    let stride = surface.width as usize * 4;
    let src_stride = image.width as usize * 4;
    let pixels = image.rgba8_premul.as_slice();

    for dy in y_start..y_end {
        let v = (dy as f64 + 0.5 - dest.y0) / dest.height();
        let sy = src.y + ((v * f64::from(src.h)) as u32).min(src.h - 1);
        let src_row = (sy as usize) * src_stride;
        let dst_row = (dy as usize) * stride;

        for dx in x_start..x_end {
            let u = (dx as f64 + 0.5 - dest.x0) / dest.width();
            let sx = src.x + ((u * f64::from(src.w)) as u32).min(src.w - 1);

            let si = src_row + (sx as usize) * 4;
            let di = dst_row + (dx as usize) * 4;
            let s = [pixels[si], pixels[si + 1], pixels[si + 2], pixels[si + 3]];
            let d = [
                surface.data[di],
                surface.data[di + 1],
                surface.data[di + 2],
                surface.data[di + 3],
            ];
            let out = over(d, s, opacity);
            surface.data[di..di + 4].copy_from_slice(&out);
        }
    }
}

/// Premultiplied source-over at an extra opacity.
fn over(dst: [u8; 4], src: [u8; 4], opacity: f32) -> [u8; 4] {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}
