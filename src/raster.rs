//! Owned pixel buffers and the pure transforms applied to them.
//!
//! Every transform borrows its input and returns a new [`RasterImage`]; nothing
//! here mutates a buffer another owner can still see.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

use crate::geometry::PixelRect;

/// White-balance gains are clamped into this range.
pub const MIN_GAIN: f64 = 0.25;
pub const MAX_GAIN: f64 = 4.0;

/// Decoded 8-bit image, always stored as RGB or RGBA.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pixels: DynamicImage,
}

impl From<DynamicImage> for RasterImage {
    fn from(img: DynamicImage) -> Self {
        let pixels = match img {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
            other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        };
        Self { pixels }
    }
}

impl RasterImage {
    pub fn from_rgba(width: u32, height: u32, bytes: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, bytes)
            .map(|buf| Self::from(DynamicImage::ImageRgba8(buf)))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn has_alpha(&self) -> bool {
        self.pixels.color().has_alpha()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn to_rgba8(&self) -> RgbaImage {
        self.pixels.to_rgba8()
    }

    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let Rgba([r, g, b, _]) = self.pixels.get_pixel(x, y);
        [r, g, b]
    }

    pub fn rotate_90_clockwise(&self) -> RasterImage {
        Self::from(self.pixels.rotate90())
    }

    pub fn rotate_90_counterclockwise(&self) -> RasterImage {
        Self::from(self.pixels.rotate270())
    }

    pub fn flip_horizontal(&self) -> RasterImage {
        Self::from(self.pixels.fliph())
    }

    pub fn flip_vertical(&self) -> RasterImage {
        Self::from(self.pixels.flipv())
    }

    /// Rotate clockwise by `degrees` onto a canvas grown to the rotated bounds.
    /// Quarter turns take the exact path; other angles are resampled bicubically
    /// with transparent corners.
    pub fn rotated(&self, degrees: f64) -> RasterImage {
        let degrees = degrees.rem_euclid(360.0);
        let quarter = degrees / 90.0;
        if (quarter - quarter.round()).abs() < 1e-9 {
            return match quarter.round() as u32 % 4 {
                0 => self.clone(),
                1 => self.rotate_90_clockwise(),
                2 => Self::from(self.pixels.rotate180()),
                _ => self.rotate_90_counterclockwise(),
            };
        }

        let src = self.pixels.to_rgba8();
        let (w, h) = src.dimensions();
        let theta = degrees.to_radians();
        let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
        let bound_w = (w as f64 * cos + h as f64 * sin).ceil() as u32;
        let bound_h = (w as f64 * sin + h as f64 * cos).ceil() as u32;

        // The canvas must hold both the unrotated source and the rotated bounds.
        let canvas_w = bound_w.max(w);
        let canvas_h = bound_h.max(h);
        let clear = Rgba([0, 0, 0, 0]);
        let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, clear);
        imageops::overlay(
            &mut canvas,
            &src,
            ((canvas_w - w) / 2) as i64,
            ((canvas_h - h) / 2) as i64,
        );

        let rotated = rotate_about_center(&canvas, theta as f32, Interpolation::Bicubic, clear);
        let trimmed = imageops::crop_imm(
            &rotated,
            (canvas_w - bound_w) / 2,
            (canvas_h - bound_h) / 2,
            bound_w,
            bound_h,
        )
        .to_image();
        Self::from(DynamicImage::ImageRgba8(trimmed))
    }

    /// Lanczos resample to exactly `width` x `height`.
    pub fn resized(&self, width: u32, height: u32) -> RasterImage {
        if width == 0 || height == 0 {
            return self.clone();
        }
        Self::from(self.pixels.resize_exact(width, height, FilterType::Lanczos3))
    }

    /// Sub-image for `rect` after clipping it to the image. `None` when nothing is left.
    pub fn cropped(&self, rect: PixelRect) -> Option<RasterImage> {
        let rect = rect.clamp_to(self.width(), self.height());
        if rect.is_empty() {
            return None;
        }
        Some(Self::from(self.pixels.crop_imm(
            rect.x as u32,
            rect.y as u32,
            rect.width,
            rect.height,
        )))
    }

    /// Fit inside a `max_size` box, keeping the aspect ratio. Never upscales.
    pub fn thumbnail(&self, max_size: u32) -> RasterImage {
        let (w, h) = self.dimensions();
        if w <= max_size && h <= max_size {
            return self.clone();
        }
        Self::from(self.pixels.resize(max_size, max_size, FilterType::Triangle))
    }

    /// Multiply R, G and B by `2^ev`, saturating at 255. Alpha is untouched.
    pub fn with_exposure(&self, ev: f64) -> RasterImage {
        if ev == 0.0 {
            return self.clone();
        }
        let gain = 2f64.powf(ev);
        self.map_rgb(|px| {
            for c in px.iter_mut() {
                *c = scale_channel(*c, gain);
            }
        })
    }

    /// Multiply red and blue by their gains; green is the reference and stays put.
    pub fn with_channel_gains(&self, gain_r: f64, gain_b: f64) -> RasterImage {
        self.map_rgb(|px| {
            px[0] = scale_channel(px[0], gain_r);
            px[2] = scale_channel(px[2], gain_b);
        })
    }

    /// Mean R, G, B over `rect` (clipped to the image).
    pub fn window_mean(&self, rect: PixelRect) -> Option<[f64; 3]> {
        let rect = rect.clamp_to(self.width(), self.height());
        if rect.is_empty() {
            return None;
        }
        let mut sum = [0f64; 3];
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                let px = self.rgb_at(x as u32, y as u32);
                for (acc, c) in sum.iter_mut().zip(px) {
                    *acc += c as f64;
                }
            }
        }
        let n = rect.width as f64 * rect.height as f64;
        Some(sum.map(|s| s / n))
    }

    fn map_rgb(&self, mut f: impl FnMut(&mut [u8])) -> RasterImage {
        let mut out = self.pixels.clone();
        if let Some(buf) = out.as_mut_rgb8() {
            for px in buf.pixels_mut() {
                f(&mut px.0);
            }
        } else if let Some(buf) = out.as_mut_rgba8() {
            for px in buf.pixels_mut() {
                f(&mut px.0[..3]);
            }
        }
        Self { pixels: out }
    }
}

fn scale_channel(value: u8, gain: f64) -> u8 {
    (value as f64 * gain).round().clamp(0.0, 255.0) as u8
}

/// Gains that neutralise the sampled mean colour against its green channel.
/// `None` when green is zero (black sample), since there is nothing to balance.
pub fn white_balance_gains(mean: [f64; 3]) -> Option<(f64, f64)> {
    let [r, g, b] = mean;
    if g <= 0.0 {
        return None;
    }
    let gain_r = if r > 0.0 { g / r } else { 1.0 };
    let gain_b = if b > 0.0 { g / b } else { 1.0 };
    Some((
        gain_r.clamp(MIN_GAIN, MAX_GAIN),
        gain_b.clamp(MIN_GAIN, MAX_GAIN),
    ))
}

/// Half size of the square sampling window: proportional to the short side,
/// at least 1, at most `max_half`.
pub fn sample_half_size(width: u32, height: u32, max_half: u32, min_divisor: u32) -> u32 {
    let short = width.min(height);
    (short / min_divisor.max(1)).max(1).min(max_half)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn gradient(w: u32, h: u32) -> RasterImage {
        let buf = RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 7) as u8, (y * 11) as u8, (x + y) as u8])
        });
        RasterImage::from(DynamicImage::ImageRgb8(buf))
    }

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> RasterImage {
        RasterImage::from(DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(rgb))))
    }

    #[test]
    fn quarter_turns_are_lossless() {
        let img = gradient(13, 7);
        let cw = img.rotate_90_clockwise();
        assert_eq!(cw.dimensions(), (7, 13));
        assert_eq!(cw.rotate_90_counterclockwise(), img);
    }

    #[test]
    fn flips_are_involutions() {
        let img = gradient(9, 4);
        assert_eq!(img.flip_horizontal().flip_horizontal(), img);
        assert_eq!(img.flip_vertical().flip_vertical(), img);
        assert_ne!(img.flip_horizontal(), img);
    }

    #[test]
    fn rotated_by_right_angle_takes_exact_path() {
        let img = gradient(10, 6);
        assert_eq!(img.rotated(90.0), img.rotate_90_clockwise());
        assert_eq!(img.rotated(-90.0), img.rotate_90_counterclockwise());
        assert_eq!(img.rotated(360.0), img);
    }

    #[test]
    fn arbitrary_rotation_grows_canvas() {
        let img = gradient(100, 50);
        let out = img.rotated(30.0);
        assert!(out.has_alpha());
        assert!(out.width() > 100);
        assert!(out.height() > 50);
        // Corners fall outside the rotated source.
        assert_eq!(out.to_rgba8().get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn crop_is_clipped_to_bounds() {
        let img = gradient(20, 20);
        let out = img.cropped(PixelRect::new(15, 15, 10, 10)).unwrap();
        assert_eq!(out.dimensions(), (5, 5));
        assert_eq!(out.rgb_at(0, 0), img.rgb_at(15, 15));
        assert!(img.cropped(PixelRect::new(30, 30, 5, 5)).is_none());
    }

    #[test]
    fn thumbnail_keeps_aspect_and_never_upscales() {
        let big = gradient(1000, 500);
        assert_eq!(big.thumbnail(256).dimensions(), (256, 128));
        let small = gradient(40, 30);
        assert_eq!(small.thumbnail(256).dimensions(), (40, 30));
    }

    #[test]
    fn exposure_saturates() {
        let img = solid(2, 2, [100, 200, 10]);
        let out = img.with_exposure(1.0);
        assert_eq!(out.rgb_at(0, 0), [200, 255, 20]);
    }

    #[test]
    fn exposure_leaves_alpha_alone() {
        let img = RasterImage::from_rgba(1, 1, vec![50, 50, 50, 77]).unwrap();
        let out = img.with_exposure(1.0).to_rgba8();
        assert_eq!(out.get_pixel(0, 0).0, [100, 100, 100, 77]);
    }

    #[test]
    fn gains_are_clamped() {
        let (r, b) = white_balance_gains([1.0, 255.0, 255.0]).unwrap();
        assert_eq!(r, MAX_GAIN);
        assert_eq!(b, 1.0);
        let (r, b) = white_balance_gains([255.0, 1.0, 255.0]).unwrap();
        assert_eq!((r, b), (MIN_GAIN, MIN_GAIN));
    }

    #[test]
    fn black_sample_has_no_gains() {
        assert!(white_balance_gains([0.0, 0.0, 0.0]).is_none());
        assert!(white_balance_gains([40.0, 0.0, 10.0]).is_none());
    }

    #[test]
    fn zero_red_or_blue_defaults_to_unity_gain() {
        assert_eq!(white_balance_gains([0.0, 100.0, 0.0]), Some((1.0, 1.0)));
    }

    #[test]
    fn channel_gains_touch_red_and_blue_only() {
        let img = solid(3, 3, [100, 120, 60]);
        let out = img.with_channel_gains(1.2, 2.0);
        assert_eq!(out.rgb_at(1, 1), [120, 120, 120]);
    }

    #[test]
    fn window_mean_averages_clipped_window() {
        let img = solid(4, 4, [10, 20, 30]);
        let mean = img.window_mean(PixelRect::new(-2, -2, 5, 5)).unwrap();
        assert_eq!(mean, [10.0, 20.0, 30.0]);
    }

    #[test]
    fn half_size_is_adaptive() {
        assert_eq!(sample_half_size(4000, 3000, 10, 200), 10);
        assert_eq!(sample_half_size(800, 600, 10, 200), 3);
        assert_eq!(sample_half_size(5, 5, 10, 200), 1);
    }
}
