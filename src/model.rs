//! The image being edited and every edit operation on it.
//!
//! `original` is the baseline for recomputable edits (rotation, exposure and,
//! when not baked, white balance): `current` is always re-rendered from it
//! with the accumulated parameters, so repeated tweaks never compound
//! resampling or rounding error. Crop, resize and baked white balance commit
//! their result as the new baseline and reset the accumulators.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::codec::{Codec, SaveFormat, clamp_quality};
use crate::error::{Error, Result};
use crate::geometry::PixelRect;
use crate::platform::Clipboard;
use crate::raster::{self, MAX_GAIN, MIN_GAIN, RasterImage};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditOptions {
    /// White balance replaces the baseline and resets rotation/exposure.
    pub bake_white_balance: bool,
    pub sample_max_half: u32,
    pub sample_min_divisor: u32,
    pub undo_depth: usize,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            bake_white_balance: true,
            sample_max_half: 10,
            sample_min_divisor: 200,
            undo_depth: 5,
        }
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    current: RasterImage,
    original: RasterImage,
    rotation_angle: f64,
    exposure_ev: f64,
    wb_gains: Option<(f64, f64)>,
}

pub struct ImageModel {
    path: Option<PathBuf>,
    current: Option<RasterImage>,
    original: Option<RasterImage>,
    rotation_angle: f64,
    exposure_ev: f64,
    wb_gains: Option<(f64, f64)>,
    options: EditOptions,
    history: VecDeque<Snapshot>,
    future: Vec<Snapshot>,
}

impl Default for ImageModel {
    fn default() -> Self {
        Self::new(EditOptions::default())
    }
}

impl ImageModel {
    pub fn new(options: EditOptions) -> Self {
        Self {
            path: None,
            current: None,
            original: None,
            rotation_angle: 0.0,
            exposure_ev: 0.0,
            wb_gains: None,
            options,
            history: VecDeque::new(),
            future: Vec::new(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn current(&self) -> Option<&RasterImage> {
        self.current.as_ref()
    }

    pub fn original(&self) -> Option<&RasterImage> {
        self.original.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.current.as_ref().map(RasterImage::dimensions)
    }

    pub fn rotation_angle(&self) -> f64 {
        self.rotation_angle
    }

    pub fn exposure_ev(&self) -> f64 {
        self.exposure_ev
    }

    /// Decode `path` and make it current. On failure the previous image stays.
    pub fn load_from_path(&mut self, path: &Path, codec: &dyn Codec) -> Result<()> {
        let image = codec.decode(path)?;
        log::info!(
            "Loaded {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        self.set_image(image, Some(path.to_path_buf()));
        Ok(())
    }

    pub fn reload(&mut self, codec: &dyn Codec) -> Result<()> {
        let path = self.path.clone().ok_or(Error::NoImage)?;
        self.load_from_path(&path, codec)
    }

    /// Replace the model with the clipboard image. `Ok(false)` when the clipboard has none.
    pub fn load_from_clipboard(&mut self, clipboard: &mut dyn Clipboard) -> Result<bool> {
        match clipboard.get_image()? {
            Some(image) => {
                self.set_image(image, None);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop the image entirely, e.g. after its file was trashed.
    pub fn clear(&mut self) {
        *self = Self::new(self.options);
    }

    /// Make an already decoded image current, dropping every edit and the history.
    pub fn set_image(&mut self, image: RasterImage, path: Option<PathBuf>) {
        self.path = path;
        self.original = Some(image.clone());
        self.current = Some(image);
        self.rotation_angle = 0.0;
        self.exposure_ev = 0.0;
        self.wb_gains = None;
        self.history.clear();
        self.future.clear();
    }

    pub fn rotate_90_clockwise(&mut self) {
        self.rotate_arbitrary(90.0);
    }

    pub fn rotate_90_counterclockwise(&mut self) {
        self.rotate_arbitrary(-90.0);
    }

    /// Add `delta_degrees` to the running angle and re-render from the baseline.
    pub fn rotate_arbitrary(&mut self, delta_degrees: f64) {
        if !self.is_loaded() {
            return;
        }
        self.checkpoint();
        self.rotation_angle = snap((self.rotation_angle + delta_degrees).rem_euclid(360.0));
        self.refresh();
    }

    pub fn adjust_exposure(&mut self, delta_ev: f64) {
        if !self.is_loaded() {
            return;
        }
        self.checkpoint();
        self.exposure_ev = snap(self.exposure_ev + delta_ev);
        self.refresh();
    }

    pub fn flip_horizontal(&mut self) {
        self.flip(RasterImage::flip_horizontal);
    }

    pub fn flip_vertical(&mut self) {
        self.flip(RasterImage::flip_vertical);
    }

    // Mirroring the baseline reverses the rotation sense, so the angle is
    // negated and `current` re-rendered from the mirrored baseline.
    fn flip(&mut self, op: fn(&RasterImage) -> RasterImage) {
        let Some(original) = &self.original else {
            return;
        };
        let original = op(original);
        self.checkpoint();
        self.original = Some(original);
        self.rotation_angle = snap((-self.rotation_angle).rem_euclid(360.0));
        self.refresh();
    }

    /// Sample a window around `(x, y)` on the current image and neutralise
    /// its colour cast. Returns the gains applied, `None` when nothing changed.
    pub fn apply_white_balance_from_point(&mut self, x: i64, y: i64) -> Option<(f64, f64)> {
        let current = self.current.as_ref()?;
        let (w, h) = current.dimensions();
        let half = raster::sample_half_size(
            w,
            h,
            self.options.sample_max_half,
            self.options.sample_min_divisor,
        );
        let cx = x.clamp(0, w as i64 - 1);
        let cy = y.clamp(0, h as i64 - 1);
        let window = PixelRect::square_around(cx, cy, half, w, h);
        let mean = current.window_mean(window)?;
        let (gain_r, gain_b) = raster::white_balance_gains(mean)?;
        log::debug!(
            "White balance at ({}, {}) half={} gains r={:.3} b={:.3}",
            cx,
            cy,
            half,
            gain_r,
            gain_b
        );

        if self.options.bake_white_balance {
            let balanced = current.with_channel_gains(gain_r, gain_b);
            self.checkpoint();
            self.commit_baseline(balanced);
        } else {
            self.checkpoint();
            let (old_r, old_b) = self.wb_gains.unwrap_or((1.0, 1.0));
            self.wb_gains = Some((
                (old_r * gain_r).clamp(MIN_GAIN, MAX_GAIN),
                (old_b * gain_b).clamp(MIN_GAIN, MAX_GAIN),
            ));
            self.refresh();
        }
        Some((gain_r, gain_b))
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        let Some(current) = &self.current else {
            return;
        };
        if width == 0 || height == 0 {
            return;
        }
        let resized = current.resized(width, height);
        self.checkpoint();
        self.commit_baseline(resized);
    }

    /// Crop to `rect` (image pixels, clipped to bounds). `false` when the
    /// clipped rect is empty or nothing is loaded.
    pub fn apply_crop(&mut self, rect: PixelRect) -> bool {
        let Some(cropped) = self.current.as_ref().and_then(|c| c.cropped(rect)) else {
            return false;
        };
        self.checkpoint();
        self.commit_baseline(cropped);
        true
    }

    /// Copy of the selected region, or the whole image when `rect` is `None`.
    pub fn region(&self, rect: Option<PixelRect>) -> Option<RasterImage> {
        let current = self.current.as_ref()?;
        match rect {
            Some(rect) => current.cropped(rect),
            None => Some(current.clone()),
        }
    }

    /// Encode and write the current image. Lossless formats ignore `quality`.
    /// The target is written through a sibling temp file so a failed save
    /// leaves any existing file untouched.
    pub fn save(
        &mut self,
        path: &Path,
        format: SaveFormat,
        quality: u8,
        codec: &dyn Codec,
    ) -> Result<()> {
        let current = self.current.as_ref().ok_or(Error::NoImage)?;
        let quality = if format.is_lossy() {
            clamp_quality(quality)
        } else {
            0
        };
        let bytes = codec.encode(current, format, quality)?;

        let tmp = path.with_extension(format!("{}.part", format.extension()));
        if let Err(e) = std::fs::write(&tmp, &bytes) {
            let _ = std::fs::remove_file(&tmp);
            return Err(Error::io(path, e));
        }
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(Error::io(path, e));
        }
        log::info!("Saved {} as {}", path.display(), format);
        if self.path.is_none() {
            self.path = Some(path.to_path_buf());
        }
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.pop_back() else {
            return false;
        };
        if let Some(now) = self.snapshot() {
            self.future.push(now);
        }
        self.restore(previous);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.future.pop() else {
            return false;
        };
        if let Some(now) = self.snapshot() {
            self.history.push_back(now);
        }
        self.restore(next);
        true
    }

    fn snapshot(&self) -> Option<Snapshot> {
        Some(Snapshot {
            current: self.current.clone()?,
            original: self.original.clone()?,
            rotation_angle: self.rotation_angle,
            exposure_ev: self.exposure_ev,
            wb_gains: self.wb_gains,
        })
    }

    fn restore(&mut self, s: Snapshot) {
        self.current = Some(s.current);
        self.original = Some(s.original);
        self.rotation_angle = s.rotation_angle;
        self.exposure_ev = s.exposure_ev;
        self.wb_gains = s.wb_gains;
    }

    fn checkpoint(&mut self) {
        if self.options.undo_depth == 0 {
            return;
        }
        if let Some(s) = self.snapshot() {
            if self.history.len() == self.options.undo_depth {
                self.history.pop_front();
            }
            self.history.push_back(s);
            self.future.clear();
        }
    }

    fn commit_baseline(&mut self, image: RasterImage) {
        self.original = Some(image.clone());
        self.current = Some(image);
        self.rotation_angle = 0.0;
        self.exposure_ev = 0.0;
        self.wb_gains = None;
    }

    fn refresh(&mut self) {
        if let Some(rendered) = self.render() {
            self.current = Some(rendered);
        }
    }

    fn render(&self) -> Option<RasterImage> {
        let original = self.original.as_ref()?;
        let mut out = original.rotated(self.rotation_angle);
        if self.exposure_ev != 0.0 {
            out = out.with_exposure(self.exposure_ev);
        }
        if let Some((r, b)) = self.wb_gains {
            out = out.with_channel_gains(r, b);
        }
        Some(out)
    }
}

/// Drop floating point noise so `+d` then `-d` lands exactly on the start value.
fn snap(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Width(u32),
    Height(u32),
}

/// Target size keeping the `orig_w:orig_h` aspect ratio for one given side.
pub fn aspect_dimensions(orig_w: u32, orig_h: u32, given: Dimension) -> (u32, u32) {
    let aspect = orig_w as f64 / orig_h.max(1) as f64;
    match given {
        Dimension::Width(w) => (w.max(1), ((w as f64 / aspect) as u32).max(1)),
        Dimension::Height(h) => (((h as f64 * aspect) as u32).max(1), h.max(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ImageCodec;
    use image::{DynamicImage, Rgb, RgbImage};
    use tempfile::TempDir;

    fn image(w: u32, h: u32) -> RasterImage {
        RasterImage::from(DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x % 200) as u8 + 20, (y % 200) as u8 + 10, 90])
        })))
    }

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> RasterImage {
        RasterImage::from(DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(rgb))))
    }

    struct FakeClipboard(Option<RasterImage>);

    impl Clipboard for FakeClipboard {
        fn get_image(&mut self) -> Result<Option<RasterImage>> {
            Ok(self.0.clone())
        }

        fn set_image(&mut self, image: &RasterImage) -> Result<()> {
            self.0 = Some(image.clone());
            Ok(())
        }
    }

    fn loaded(img: RasterImage) -> ImageModel {
        let mut model = ImageModel::default();
        assert!(model.load_from_clipboard(&mut FakeClipboard(Some(img))).unwrap());
        model
    }

    #[test]
    fn edits_without_image_are_noops() {
        let mut model = ImageModel::default();
        model.rotate_90_clockwise();
        model.flip_horizontal();
        model.rotate_arbitrary(10.0);
        model.adjust_exposure(1.0);
        model.resize(10, 10);
        assert!(!model.apply_crop(PixelRect::new(0, 0, 5, 5)));
        assert!(model.apply_white_balance_from_point(1, 1).is_none());
        assert!(!model.is_loaded());
        assert_eq!(model.rotation_angle(), 0.0);
    }

    #[test]
    fn quarter_turn_and_back_is_exact() {
        let img = image(30, 20);
        let mut model = loaded(img.clone());
        model.rotate_90_clockwise();
        assert_eq!(model.dimensions(), Some((20, 30)));
        model.rotate_90_counterclockwise();
        assert_eq!(model.current(), Some(&img));
        assert_eq!(model.rotation_angle(), 0.0);
    }

    #[test]
    fn double_flip_is_identity() {
        let img = image(17, 9);
        let mut model = loaded(img.clone());
        model.flip_horizontal();
        model.flip_horizontal();
        model.flip_vertical();
        model.flip_vertical();
        assert_eq!(model.current(), Some(&img));
    }

    #[test]
    fn arbitrary_rotation_renders_once_from_original() {
        let img = image(120, 90);
        let mut model = loaded(img.clone());
        model.rotate_arbitrary(10.0);
        model.rotate_arbitrary(5.0);
        assert_eq!(model.rotation_angle(), 15.0);
        assert_eq!(model.original(), Some(&img));
        assert_eq!(model.current(), Some(&img.rotated(15.0)));
    }

    #[test]
    fn rotation_angle_wraps() {
        let mut model = loaded(image(10, 10));
        model.rotate_90_counterclockwise();
        assert_eq!(model.rotation_angle(), 270.0);
        model.rotate_arbitrary(100.0);
        assert_eq!(model.rotation_angle(), 10.0);
    }

    #[test]
    fn flip_keeps_rotation_consistent() {
        let img = image(41, 30);
        let mut model = loaded(img.clone());
        model.rotate_arbitrary(20.0);
        model.flip_horizontal();
        assert_eq!(model.rotation_angle(), 340.0);
        let flipped = model.current().unwrap().clone();
        assert_eq!(flipped, img.flip_horizontal().rotated(340.0));

        model.adjust_exposure(0.0);
        assert_eq!(model.current(), Some(&flipped));
        model.rotate_arbitrary(10.0);
        model.rotate_arbitrary(-10.0);
        assert_eq!(model.current(), Some(&flipped));
    }

    #[test]
    fn flip_keeps_exposure() {
        let img = solid(6, 4, [100, 50, 25]);
        let mut model = loaded(img);
        model.adjust_exposure(1.0);
        model.flip_vertical();
        assert_eq!(model.exposure_ev(), 1.0);
        assert_eq!(model.current().unwrap().rgb_at(0, 0), [200, 100, 50]);
    }

    #[test]
    fn exposure_up_then_down_restores_render() {
        let img = image(50, 40);
        let mut model = loaded(img.clone());
        model.adjust_exposure(0.3);
        assert_ne!(model.current(), Some(&img));
        model.adjust_exposure(-0.3);
        assert_eq!(model.exposure_ev(), 0.0);
        assert_eq!(model.current(), Some(&img));
    }

    #[test]
    fn exposure_is_computed_from_original() {
        let img = solid(4, 4, [200, 100, 50]);
        let mut model = loaded(img);
        model.adjust_exposure(1.0);
        assert_eq!(model.current().unwrap().rgb_at(0, 0), [255, 200, 100]);
        model.adjust_exposure(-1.0);
        // Clipping at +1 EV is not carried into the -1 EV render.
        assert_eq!(model.current().unwrap().rgb_at(0, 0), [200, 100, 50]);
    }

    #[test]
    fn white_balance_neutralises_cast_and_bakes() {
        let mut model = loaded(solid(40, 40, [100, 200, 50]));
        model.rotate_arbitrary(90.0);
        model.adjust_exposure(0.0);
        let (gr, gb) = model.apply_white_balance_from_point(20, 20).unwrap();
        assert_eq!((gr, gb), (2.0, 4.0));
        assert_eq!(model.current().unwrap().rgb_at(5, 5), [200, 200, 200]);
        assert_eq!(model.original(), model.current());
        assert_eq!(model.rotation_angle(), 0.0);
    }

    #[test]
    fn white_balance_without_baking_keeps_accumulators() {
        let options = EditOptions {
            bake_white_balance: false,
            ..EditOptions::default()
        };
        let mut model = ImageModel::new(options);
        let img = solid(30, 20, [100, 200, 50]);
        model
            .load_from_clipboard(&mut FakeClipboard(Some(img.clone())))
            .unwrap();
        model.rotate_90_clockwise();
        model.apply_white_balance_from_point(3, 3).unwrap();
        assert_eq!(model.rotation_angle(), 90.0);
        assert_eq!(model.original(), Some(&img));
        assert_eq!(model.current().unwrap().rgb_at(0, 0), [200, 200, 200]);
        assert_eq!(model.dimensions(), Some((20, 30)));
    }

    #[test]
    fn white_balance_on_black_is_noop() {
        let img = solid(10, 10, [0, 0, 0]);
        let mut model = loaded(img.clone());
        assert!(model.apply_white_balance_from_point(5, 5).is_none());
        assert_eq!(model.current(), Some(&img));
        assert!(!model.can_undo());
    }

    #[test]
    fn white_balance_point_is_clamped() {
        let mut model = loaded(solid(10, 10, [100, 100, 100]));
        assert_eq!(model.apply_white_balance_from_point(-50, 900), Some((1.0, 1.0)));
    }

    #[test]
    fn crop_replaces_baseline_and_is_clipped() {
        let img = image(50, 50);
        let mut model = loaded(img.clone());
        model.adjust_exposure(0.5);
        assert!(model.apply_crop(PixelRect::new(40, 40, 30, 30)));
        assert_eq!(model.dimensions(), Some((10, 10)));
        assert_eq!(model.original(), model.current());
        assert_eq!(model.exposure_ev(), 0.0);
        assert!(!model.apply_crop(PixelRect::new(100, 100, 5, 5)));
    }

    #[test]
    fn resize_is_exact() {
        let mut model = loaded(image(64, 48));
        model.resize(32, 10);
        assert_eq!(model.dimensions(), Some((32, 10)));
    }

    #[test]
    fn undo_and_redo_walk_history() {
        let img = image(20, 10);
        let mut model = loaded(img.clone());
        model.rotate_90_clockwise();
        model.flip_vertical();
        assert!(model.undo());
        assert!(model.undo());
        assert_eq!(model.current(), Some(&img));
        assert!(!model.undo());
        assert!(model.redo());
        assert_eq!(model.dimensions(), Some((10, 20)));
    }

    #[test]
    fn history_is_bounded() {
        let mut model = loaded(image(8, 8));
        for _ in 0..12 {
            model.adjust_exposure(0.1);
        }
        let mut steps = 0;
        while model.undo() {
            steps += 1;
        }
        assert_eq!(steps, EditOptions::default().undo_depth);
    }

    #[test]
    fn failed_load_keeps_previous_image() {
        let dir = TempDir::new().unwrap();
        let img = image(12, 12);
        let mut model = loaded(img.clone());
        let missing = dir.path().join("missing.png");
        assert!(model.load_from_path(&missing, &ImageCodec).is_err());
        assert_eq!(model.current(), Some(&img));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("saved.png");
        let img = image(25, 15);
        let mut model = loaded(img.clone());
        model.save(&path, SaveFormat::Png, 95, &ImageCodec).unwrap();
        assert_eq!(model.path(), Some(path.as_path()));

        let mut other = ImageModel::default();
        other.load_from_path(&path, &ImageCodec).unwrap();
        assert_eq!(other.current(), Some(&img));
        assert!(!dir.path().join("saved.png.part").exists());
    }

    #[test]
    fn save_without_image_fails() {
        let dir = TempDir::new().unwrap();
        let mut model = ImageModel::default();
        let result = model.save(&dir.path().join("x.png"), SaveFormat::Png, 0, &ImageCodec);
        assert!(matches!(result, Err(Error::NoImage)));
    }

    #[test]
    fn save_into_missing_directory_reports_error() {
        let dir = TempDir::new().unwrap();
        let mut model = loaded(image(4, 4));
        let target = dir.path().join("nope").join("x.jpg");
        let result = model.save(&target, SaveFormat::Jpeg, 90, &ImageCodec);
        assert!(matches!(result, Err(Error::Io { .. })));
        assert!(!target.exists());
    }

    #[test]
    fn empty_clipboard_leaves_model_alone() {
        let mut model = ImageModel::default();
        assert!(!model.load_from_clipboard(&mut FakeClipboard(None)).unwrap());
        assert!(!model.is_loaded());
    }

    #[test]
    fn aspect_dimensions_follow_given_side() {
        assert_eq!(aspect_dimensions(4000, 3000, Dimension::Width(800)), (800, 600));
        assert_eq!(aspect_dimensions(4000, 3000, Dimension::Height(300)), (400, 300));
        assert_eq!(aspect_dimensions(10, 1000, Dimension::Width(1)), (1, 100));
    }
}
