//! Software compositing of the viewport frame handed to the UI as RGBA.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::geometry::{PixelRect, Point, Size, ViewTransform};
use crate::raster::RasterImage;
use crate::viewport::Overlay;

pub const BACKGROUND: Rgba<u8> = Rgba([30, 30, 30, 255]);
const SELECTION: Rgba<u8> = Rgba([230, 40, 40, 255]);
const OVERLAY_BORDER: Rgba<u8> = Rgba([240, 240, 240, 255]);
const DASH: u32 = 4;

pub struct FrameInput<'a> {
    pub image: &'a RasterImage,
    /// Changes whenever the image content changes.
    pub generation: u64,
    pub transform: ViewTransform,
    pub view_size: Size,
    pub selection: Option<PixelRect>,
    pub overlay: Option<Overlay>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct BaseKey {
    generation: u64,
    transform: ViewTransform,
    width: u32,
    height: u32,
}

/// Keeps the last image layer so pointer-only changes (selection, overlays)
/// don't resample the whole picture.
#[derive(Default)]
pub struct FrameRenderer {
    base: Option<(BaseKey, RgbaImage)>,
    shrunk: Option<((u64, u32, u32), RgbaImage)>,
    full: Option<(u64, RgbaImage)>,
}

impl FrameRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, input: &FrameInput<'_>) -> RgbaImage {
        let width = input.view_size.width.max(0.0).round() as u32;
        let height = input.view_size.height.max(0.0).round() as u32;
        let key = BaseKey {
            generation: input.generation,
            transform: input.transform,
            width,
            height,
        };

        let mut frame = match &self.base {
            Some((cached, frame)) if *cached == key => frame.clone(),
            _ => {
                let frame = self.compose_base(input, width, height);
                self.base = Some((key, frame.clone()));
                frame
            }
        };

        if let Some(rect) = input.selection {
            draw_selection(&mut frame, &input.transform, rect);
        }
        if let Some(overlay) = &input.overlay {
            draw_overlay(&mut frame, input.image, overlay);
        }
        frame
    }

    fn compose_base(&mut self, input: &FrameInput<'_>, width: u32, height: u32) -> RgbaImage {
        let mut frame = RgbaImage::from_pixel(width.max(1), height.max(1), BACKGROUND);
        let t = input.transform;
        let (iw, ih) = input.image.dimensions();
        if t.scale <= 0.0 || iw == 0 || ih == 0 {
            return frame;
        }

        // Below 100% sample from a filtered copy at the display size.
        // `scale` is view pixels per source pixel.
        let (source, scale) = if t.scale < 1.0 {
            let sw = ((iw as f64 * t.scale).round() as u32).max(1);
            let sh = ((ih as f64 * t.scale).round() as u32).max(1);
            let key = (input.generation, sw, sh);
            if !matches!(&self.shrunk, Some((k, _)) if *k == key) {
                let rgba = input.image.to_rgba8();
                let shrunk = imageops::resize(&rgba, sw, sh, FilterType::Triangle);
                self.shrunk = Some((key, shrunk));
            }
            match &self.shrunk {
                Some((_, img)) => (img, t.scale * iw as f64 / sw as f64),
                None => return frame,
            }
        } else {
            if !matches!(&self.full, Some((g, _)) if *g == input.generation) {
                self.full = Some((input.generation, input.image.to_rgba8()));
            }
            match &self.full {
                Some((_, img)) => (img, t.scale),
                None => return frame,
            }
        };

        let (sw, sh) = source.dimensions();
        let left = t.dx.max(0.0).floor() as u32;
        let top = t.dy.max(0.0).floor() as u32;
        let right = (t.dx + sw as f64 * scale).clamp(0.0, width as f64).ceil() as u32;
        let bottom = (t.dy + sh as f64 * scale).clamp(0.0, height as f64).ceil() as u32;

        for y in top..bottom.min(frame.height()) {
            let sy = ((y as f64 + 0.5 - t.dy) / scale).floor();
            if sy < 0.0 || sy >= sh as f64 {
                continue;
            }
            for x in left..right.min(frame.width()) {
                let sx = ((x as f64 + 0.5 - t.dx) / scale).floor();
                if sx < 0.0 || sx >= sw as f64 {
                    continue;
                }
                let px = source.get_pixel(sx as u32, sy as u32);
                frame.put_pixel(x, y, blend(*px, BACKGROUND));
            }
        }
        frame
    }
}

fn blend(top: Rgba<u8>, bottom: Rgba<u8>) -> Rgba<u8> {
    let a = top[3] as u32;
    if a == 255 {
        return top;
    }
    let mix = |t: u8, b: u8| ((t as u32 * a + b as u32 * (255 - a)) / 255) as u8;
    Rgba([mix(top[0], bottom[0]), mix(top[1], bottom[1]), mix(top[2], bottom[2]), 255])
}

fn put(frame: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < frame.width() && (y as u32) < frame.height() {
        frame.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_selection(frame: &mut RgbaImage, t: &ViewTransform, rect: PixelRect) {
    if rect.is_empty() {
        return;
    }
    let a = t.map_to_view(Point::new(rect.x as f64, rect.y as f64));
    let b = t.map_to_view(Point::new(rect.right() as f64, rect.bottom() as f64));
    let (x0, y0) = (a.x.round() as i64, a.y.round() as i64);
    let (x1, y1) = ((b.x.round() as i64 - 1).max(x0), (b.y.round() as i64 - 1).max(y0));

    let dashed = |i: i64| (i.unsigned_abs() / DASH as u64) % 2 == 0;
    for x in x0..=x1 {
        if dashed(x - x0) {
            put(frame, x, y0, SELECTION);
            put(frame, x, y1, SELECTION);
        }
    }
    for y in y0..=y1 {
        if dashed(y - y0) {
            put(frame, x0, y, SELECTION);
            put(frame, x1, y, SELECTION);
        }
    }
}

fn draw_overlay(frame: &mut RgbaImage, image: &RasterImage, overlay: &Overlay) {
    let Some(region) = image.cropped(overlay.source) else {
        return;
    };
    let factor = overlay.factor.max(1);
    let (w, h) = region.dimensions();
    let zoomed = if factor == 1 {
        region.to_rgba8()
    } else {
        imageops::resize(&region.to_rgba8(), w * factor, h * factor, FilterType::Nearest)
    };
    let x0 = overlay.position.x.round() as i64;
    let y0 = overlay.position.y.round() as i64;
    for (x, y, px) in zoomed.enumerate_pixels() {
        put(frame, x0 + x as i64, y0 + y as i64, blend(*px, BACKGROUND));
    }

    let (zw, zh) = (zoomed.width() as i64, zoomed.height() as i64);
    for x in -1..=zw {
        put(frame, x0 + x, y0 - 1, OVERLAY_BORDER);
        put(frame, x0 + x, y0 + zh, OVERLAY_BORDER);
    }
    for y in -1..=zh {
        put(frame, x0 - 1, y0 + y, OVERLAY_BORDER);
        put(frame, x0 + zw, y0 + y, OVERLAY_BORDER);
    }
}
