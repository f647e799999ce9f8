//! Interactive viewport: pan/zoom transform plus the tool-mode state machine
//! that turns pointer and key input into selections and edit requests.
//!
//! The viewport knows image dimensions only, never pixels. Anything that
//! has to touch the image model leaves through [`ViewportHost`].

use crate::geometry::{PixelRect, Point, Size, ViewTransform};
use crate::raster::sample_half_size;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    #[default]
    None,
    Crop,
    WhiteBalance,
    Loupe,
}

impl ToolMode {
    fn glyph(self) -> CursorGlyph {
        match self {
            ToolMode::None => CursorGlyph::Arrow,
            ToolMode::Crop | ToolMode::WhiteBalance | ToolMode::Loupe => CursorGlyph::Crosshair,
        }
    }

    fn hint(self) -> &'static str {
        match self {
            ToolMode::None => "",
            ToolMode::Crop => "Crop: drag to select, Enter to apply, Esc to cancel",
            ToolMode::WhiteBalance => "White balance: click a neutral grey point",
            ToolMode::Loupe => "Loupe: click to change size, Esc to exit",
        }
    }
}

/// `active` holds exactly when `rect` has a non-zero area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionRect {
    pub rect: PixelRect,
    pub active: bool,
}

impl SelectionRect {
    fn set(&mut self, rect: PixelRect) {
        self.rect = rect;
        self.active = !rect.is_empty();
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Enter,
}

/// Input in viewport coordinates (origin at the top-left of the image area).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Pressed { button: MouseButton, pos: Point },
    Released { button: MouseButton, pos: Point },
    Moved(Point),
    DoubleClicked(Point),
    /// Positive `delta` zooms in, in wheel notches.
    Wheel { delta: f64, pos: Point },
    Key(Key),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorGlyph {
    #[default]
    Arrow,
    Crosshair,
    Grabbing,
}

/// Callbacks out of the viewport.
pub trait ViewportHost {
    fn status(&mut self, message: &str);
    fn crop_committed(&mut self, rect: PixelRect);
    fn white_balance_picked(&mut self, x: i64, y: i64);
    fn zoom_changed(&mut self, percent: u32);
    fn cursor_changed(&mut self, cursor: CursorGlyph);
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewportEffect {
    Status(String),
    CropCommitted(PixelRect),
    WhiteBalancePicked { x: i64, y: i64 },
    ZoomChanged(u32),
    CursorChanged(CursorGlyph),
}

/// [`ViewportHost`] that records callbacks for the caller to apply afterwards.
#[derive(Debug, Default)]
pub struct Effects(pub Vec<ViewportEffect>);

impl ViewportHost for Effects {
    fn status(&mut self, message: &str) {
        self.0.push(ViewportEffect::Status(message.to_string()));
    }

    fn crop_committed(&mut self, rect: PixelRect) {
        self.0.push(ViewportEffect::CropCommitted(rect));
    }

    fn white_balance_picked(&mut self, x: i64, y: i64) {
        self.0.push(ViewportEffect::WhiteBalancePicked { x, y });
    }

    fn zoom_changed(&mut self, percent: u32) {
        self.0.push(ViewportEffect::ZoomChanged(percent));
    }

    fn cursor_changed(&mut self, cursor: CursorGlyph) {
        self.0.push(ViewportEffect::CursorChanged(cursor));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewportOptions {
    pub zoom_step: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub magnifier_factor: u32,
    pub sample_max_half: u32,
    pub sample_min_divisor: u32,
    pub loupe_sizes: Vec<u32>,
    /// Gap between the pointer and a floating overlay.
    pub overlay_offset: f64,
}

impl Default for ViewportOptions {
    fn default() -> Self {
        Self {
            zoom_step: 1.25,
            min_scale: 0.02,
            max_scale: 40.0,
            magnifier_factor: 6,
            sample_max_half: 10,
            sample_min_divisor: 200,
            loupe_sizes: vec![100, 200, 300],
            overlay_offset: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Magnifier,
    Loupe,
}

/// Floating preview drawn near the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlay {
    pub kind: OverlayKind,
    /// Image pixels shown, already clipped to the image.
    pub source: PixelRect,
    /// Display magnification of `source`.
    pub factor: u32,
    /// Top-left corner in viewport coordinates.
    pub position: Point,
    pub size: Size,
}

pub struct Viewport {
    options: ViewportOptions,
    image_size: Option<(u32, u32)>,
    view_size: Size,
    transform: ViewTransform,
    auto_fit: bool,
    mode: ToolMode,
    selection: SelectionRect,
    crop_anchor: Option<Point>,
    pan_from: Option<Point>,
    pointer: Option<Point>,
    focus: Option<Point>,
    loupe_index: usize,
}

impl Viewport {
    pub fn new(options: ViewportOptions) -> Self {
        Self {
            options,
            image_size: None,
            view_size: Size::default(),
            transform: ViewTransform::default(),
            auto_fit: true,
            mode: ToolMode::None,
            selection: SelectionRect::default(),
            crop_anchor: None,
            pan_from: None,
            pointer: None,
            focus: None,
            loupe_index: 0,
        }
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn selection(&self) -> SelectionRect {
        self.selection
    }

    /// Active selection clipped to the image.
    pub fn clamped_selection(&self) -> Option<PixelRect> {
        let (w, h) = self.image_size?;
        if !self.selection.active {
            return None;
        }
        Some(self.selection.rect.clamp_to(w, h)).filter(|r| !r.is_empty())
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn view_size(&self) -> Size {
        self.view_size
    }

    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.image_size
    }

    pub fn auto_fit(&self) -> bool {
        self.auto_fit
    }

    pub fn zoom_percent(&self) -> u32 {
        self.transform.percent()
    }

    pub fn loupe_size(&self) -> u32 {
        self.options
            .loupe_sizes
            .get(self.loupe_index)
            .copied()
            .unwrap_or(100)
    }

    /// A different image was opened: leave any tool, drop the selection and fit.
    pub fn load_image(&mut self, size: Option<(u32, u32)>, host: &mut dyn ViewportHost) {
        self.set_mode(ToolMode::None, host);
        self.image_size = size.filter(|(w, h)| *w > 0 && *h > 0);
        self.focus = None;
        self.auto_fit = true;
        self.fit(host);
    }

    /// The current image was edited in place. The view is kept unless the
    /// dimensions changed; the selection no longer refers to valid pixels.
    pub fn update_image(&mut self, size: (u32, u32), host: &mut dyn ViewportHost) {
        self.selection.clear();
        self.crop_anchor = None;
        let changed = self.image_size != Some(size);
        self.image_size = Some(size).filter(|(w, h)| *w > 0 && *h > 0);
        if self.image_size.is_none() {
            self.set_mode(ToolMode::None, host);
            return;
        }
        if changed {
            self.focus = None;
            if self.auto_fit {
                self.fit(host);
            } else {
                self.constrain();
            }
        }
    }

    /// Viewport widget resized.
    pub fn resize(&mut self, size: Size, host: &mut dyn ViewportHost) {
        if size == self.view_size {
            return;
        }
        self.view_size = size;
        if self.auto_fit {
            self.fit(host);
        } else {
            self.constrain();
        }
    }

    /// Switch tools. The old mode's exit actions always run first.
    pub fn set_mode(&mut self, mode: ToolMode, host: &mut dyn ViewportHost) {
        let mode = if self.image_size.is_none() {
            ToolMode::None
        } else {
            mode
        };
        self.exit_mode(host);
        self.mode = mode;
        if mode != ToolMode::None {
            host.cursor_changed(mode.glyph());
            host.status(mode.hint());
        }
    }

    fn exit_mode(&mut self, host: &mut dyn ViewportHost) {
        let was = self.mode;
        self.selection.clear();
        self.crop_anchor = None;
        self.mode = ToolMode::None;
        if was != ToolMode::None {
            host.cursor_changed(CursorGlyph::Arrow);
        }
    }

    /// Feed one input event. Returns whether the viewport consumed it.
    pub fn handle(&mut self, event: InputEvent, host: &mut dyn ViewportHost) -> bool {
        if let InputEvent::Key(Key::Escape) = event {
            self.set_mode(ToolMode::None, host);
            host.status("Cancelled");
            return true;
        }
        if self.image_size.is_none() {
            return false;
        }

        match (self.mode, event) {
            (_, InputEvent::Pressed { button: MouseButton::Middle, pos }) => {
                self.pan_from = Some(pos);
                host.cursor_changed(CursorGlyph::Grabbing);
                true
            }
            (mode, InputEvent::Released { button: MouseButton::Middle, .. }) => {
                if self.pan_from.take().is_some() {
                    host.cursor_changed(mode.glyph());
                }
                true
            }
            (_, InputEvent::Wheel { delta, pos }) => {
                let factor = self.options.zoom_step.powf(delta);
                self.focus = Some(self.transform.map_to_scene(pos));
                self.zoom_about(factor, pos, host);
                true
            }
            (mode, InputEvent::Moved(pos)) => {
                self.pointer = Some(pos);
                if let Some(from) = self.pan_from {
                    self.transform.dx += pos.x - from.x;
                    self.transform.dy += pos.y - from.y;
                    self.pan_from = Some(pos);
                    self.constrain();
                }
                if mode == ToolMode::Crop {
                    if let Some(anchor) = self.crop_anchor {
                        let here = self.scene_clamped(pos);
                        self.selection.set(PixelRect::from_corners(anchor, here));
                    }
                }
                true
            }

            (ToolMode::None, InputEvent::Pressed { button: MouseButton::Right, .. }) => {
                self.fit_to_window(host);
                true
            }
            (_, InputEvent::Pressed { button: MouseButton::Right, .. }) => {
                self.set_mode(ToolMode::None, host);
                host.status("Cancelled");
                true
            }
            (ToolMode::None, InputEvent::DoubleClicked(_)) => {
                self.reset_zoom(host);
                true
            }
            (_, InputEvent::DoubleClicked(_)) => false,
            (_, InputEvent::Released { button: MouseButton::Right, .. }) => false,

            (ToolMode::None, InputEvent::Pressed { button: MouseButton::Left, .. })
            | (ToolMode::None, InputEvent::Released { button: MouseButton::Left, .. }) => false,

            (ToolMode::Crop, InputEvent::Pressed { button: MouseButton::Left, pos }) => {
                let anchor = self.scene_clamped(pos);
                self.crop_anchor = Some(anchor);
                self.selection.set(PixelRect::from_corners(anchor, anchor));
                true
            }
            (ToolMode::Crop, InputEvent::Released { button: MouseButton::Left, pos }) => {
                let Some(anchor) = self.crop_anchor.take() else {
                    return false;
                };
                let here = self.scene_clamped(pos);
                self.selection.set(PixelRect::from_corners(anchor, here));
                if self.selection.active {
                    let r = self.selection.rect;
                    host.status(&format!(
                        "Selection {}x{} at ({}, {})",
                        r.width, r.height, r.x, r.y
                    ));
                }
                true
            }
            (ToolMode::Crop, InputEvent::Key(Key::Enter)) => {
                match self.clamped_selection() {
                    Some(rect) => host.crop_committed(rect),
                    None => host.status("Crop cancelled: empty selection"),
                }
                self.set_mode(ToolMode::None, host);
                true
            }

            (ToolMode::WhiteBalance, InputEvent::Pressed { button: MouseButton::Left, pos }) => {
                let (x, y) = self.pixel_at(pos);
                host.white_balance_picked(x, y);
                self.set_mode(ToolMode::None, host);
                true
            }
            (ToolMode::WhiteBalance, InputEvent::Released { button: MouseButton::Left, .. }) => {
                false
            }

            (ToolMode::Loupe, InputEvent::Pressed { button: MouseButton::Left, .. }) => {
                let count = self.options.loupe_sizes.len().max(1);
                self.loupe_index = (self.loupe_index + 1) % count;
                host.status(&format!("Loupe size: {} px", self.loupe_size()));
                true
            }
            (ToolMode::Loupe, InputEvent::Released { button: MouseButton::Left, .. }) => false,

            (ToolMode::None | ToolMode::WhiteBalance | ToolMode::Loupe, InputEvent::Key(_)) => {
                false
            }
            (ToolMode::Crop, InputEvent::Key(Key::Escape)) => false,
        }
    }

    pub fn zoom_in(&mut self, host: &mut dyn ViewportHost) {
        self.zoom_step(self.options.zoom_step, host);
    }

    pub fn zoom_out(&mut self, host: &mut dyn ViewportHost) {
        self.zoom_step(1.0 / self.options.zoom_step, host);
    }

    // Keyboard zoom keeps an active selection in the middle of the view.
    fn zoom_step(&mut self, factor: f64, host: &mut dyn ViewportHost) {
        if self.image_size.is_none() {
            return;
        }
        let center = self.view_size.center();
        let target = self
            .clamped_selection()
            .map(|r| r.center())
            .unwrap_or_else(|| self.transform.map_to_scene(center));
        self.set_scale(self.transform.scale * factor);
        self.transform.center_on(target, center);
        self.constrain();
        self.auto_fit = false;
        host.zoom_changed(self.zoom_percent());
    }

    /// 100% zoom, centred on the selection, else the last wheel position,
    /// else whatever is in the middle of the view now.
    pub fn reset_zoom(&mut self, host: &mut dyn ViewportHost) {
        if self.image_size.is_none() {
            return;
        }
        let center = self.view_size.center();
        let target = self
            .clamped_selection()
            .map(|r| r.center())
            .or(self.focus)
            .unwrap_or_else(|| self.transform.map_to_scene(center));
        self.transform.scale = 1.0;
        self.transform.center_on(target, center);
        self.constrain();
        self.auto_fit = false;
        host.zoom_changed(self.zoom_percent());
    }

    pub fn fit_to_window(&mut self, host: &mut dyn ViewportHost) {
        self.auto_fit = true;
        self.fit(host);
    }

    fn fit(&mut self, host: &mut dyn ViewportHost) {
        let Some((w, h)) = self.image_size else {
            self.transform = ViewTransform::default();
            return;
        };
        let scale = if self.view_size.is_empty() {
            1.0
        } else {
            (self.view_size.width / w as f64)
                .min(self.view_size.height / h as f64)
                .min(1.0)
        };
        self.transform.scale = scale;
        self.constrain();
        host.zoom_changed(self.zoom_percent());
    }

    fn zoom_about(&mut self, factor: f64, pos: Point, host: &mut dyn ViewportHost) {
        let anchor = self.transform.map_to_scene(pos);
        self.set_scale(self.transform.scale * factor);
        self.transform.center_on(anchor, pos);
        self.constrain();
        self.auto_fit = false;
        host.zoom_changed(self.zoom_percent());
    }

    fn set_scale(&mut self, scale: f64) {
        self.transform.scale = scale.clamp(self.options.min_scale, self.options.max_scale);
    }

    /// Center an axis whose content is smaller than the view, otherwise keep
    /// the image edge from leaving the view edge.
    fn constrain(&mut self) {
        let Some((w, h)) = self.image_size else {
            return;
        };
        let s = self.transform.scale;
        self.transform.dx = constrain_axis(self.transform.dx, w as f64 * s, self.view_size.width);
        self.transform.dy = constrain_axis(self.transform.dy, h as f64 * s, self.view_size.height);
    }

    fn scene_clamped(&self, pos: Point) -> Point {
        let p = self.transform.map_to_scene(pos);
        let (w, h) = self.image_size.unwrap_or((0, 0));
        Point::new(p.x.clamp(0.0, w as f64), p.y.clamp(0.0, h as f64))
    }

    fn pixel_at(&self, pos: Point) -> (i64, i64) {
        let p = self.transform.map_to_scene(pos);
        let (w, h) = self.image_size.unwrap_or((1, 1));
        (
            (p.x.floor() as i64).clamp(0, w as i64 - 1),
            (p.y.floor() as i64).clamp(0, h as i64 - 1),
        )
    }

    /// Floating preview for the current tool, if it shows one.
    pub fn overlay(&self) -> Option<Overlay> {
        let (w, h) = self.image_size?;
        let pointer = self.pointer?;
        let (cx, cy) = self.pixel_at(pointer);

        let (kind, source, factor) = match self.mode {
            ToolMode::WhiteBalance => {
                let half = sample_half_size(
                    w,
                    h,
                    self.options.sample_max_half,
                    self.options.sample_min_divisor,
                );
                let source = PixelRect::square_around(cx, cy, half, w, h);
                (OverlayKind::Magnifier, source, self.options.magnifier_factor)
            }
            ToolMode::Loupe => {
                let size = self.loupe_size();
                let sw = size.min(w);
                let sh = size.min(h);
                let x = (cx - sw as i64 / 2).clamp(0, (w - sw) as i64);
                let y = (cy - sh as i64 / 2).clamp(0, (h - sh) as i64);
                (OverlayKind::Loupe, PixelRect::new(x, y, sw, sh), 1)
            }
            ToolMode::None | ToolMode::Crop => return None,
        };
        if source.is_empty() {
            return None;
        }

        let size = Size::new(
            (source.width * factor) as f64,
            (source.height * factor) as f64,
        );
        Some(Overlay {
            kind,
            source,
            factor,
            position: self.overlay_position(pointer, size),
            size,
        })
    }

    // Down-right of the pointer, flipped to the other side near the far edges.
    fn overlay_position(&self, pointer: Point, size: Size) -> Point {
        let offset = self.options.overlay_offset;
        let mut x = pointer.x + offset;
        let mut y = pointer.y + offset;
        if x + size.width > self.view_size.width {
            x = pointer.x - offset - size.width;
        }
        if y + size.height > self.view_size.height {
            y = pointer.y - offset - size.height;
        }
        Point::new(x.max(0.0), y.max(0.0))
    }
}

fn constrain_axis(offset: f64, content: f64, view: f64) -> f64 {
    if content <= view {
        (view - content) / 2.0
    } else {
        offset.clamp(view - content, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(image: (u32, u32), view: (f64, f64)) -> (Viewport, Effects) {
        let mut fx = Effects::default();
        let mut vp = Viewport::new(ViewportOptions::default());
        vp.resize(Size::new(view.0, view.1), &mut fx);
        vp.load_image(Some(image), &mut fx);
        fx.0.clear();
        (vp, fx)
    }

    fn press(pos: (f64, f64)) -> InputEvent {
        InputEvent::Pressed {
            button: MouseButton::Left,
            pos: Point::new(pos.0, pos.1),
        }
    }

    fn release(pos: (f64, f64)) -> InputEvent {
        InputEvent::Released {
            button: MouseButton::Left,
            pos: Point::new(pos.0, pos.1),
        }
    }

    fn moved(pos: (f64, f64)) -> InputEvent {
        InputEvent::Moved(Point::new(pos.0, pos.1))
    }

    fn statuses(fx: &Effects) -> Vec<&str> {
        fx.0.iter()
            .filter_map(|e| match e {
                ViewportEffect::Status(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn small_image_is_centered_at_full_size() {
        let (vp, _) = viewport((100, 50), (800.0, 600.0));
        let t = vp.transform();
        assert_eq!(t.scale, 1.0);
        assert_eq!((t.dx, t.dy), (350.0, 275.0));
    }

    #[test]
    fn large_image_is_shrunk_to_fit() {
        let (vp, _) = viewport((1600, 600), (800.0, 600.0));
        let t = vp.transform();
        assert_eq!(t.scale, 0.5);
        assert_eq!((t.dx, t.dy), (0.0, 150.0));
        assert_eq!(vp.zoom_percent(), 50);
    }

    #[test]
    fn auto_fit_follows_resize_until_manual_zoom() {
        let (mut vp, mut fx) = viewport((1000, 1000), (500.0, 500.0));
        vp.resize(Size::new(250.0, 250.0), &mut fx);
        assert_eq!(vp.transform().scale, 0.25);

        vp.zoom_in(&mut fx);
        assert!(!vp.auto_fit());
        let scale = vp.transform().scale;
        vp.resize(Size::new(400.0, 400.0), &mut fx);
        assert_eq!(vp.transform().scale, scale);

        vp.fit_to_window(&mut fx);
        assert!(vp.auto_fit());
        assert_eq!(vp.transform().scale, 0.4);
    }

    #[test]
    fn wheel_zoom_keeps_point_under_cursor() {
        let (mut vp, mut fx) = viewport((2000, 2000), (400.0, 400.0));
        let cursor = Point::new(100.0, 300.0);
        let before = vp.transform().map_to_scene(cursor);
        vp.handle(InputEvent::Wheel { delta: 2.0, pos: cursor }, &mut fx);
        let after = vp.transform().map_to_scene(cursor);
        assert!((before.x - after.x).abs() < 1e-6 && (before.y - after.y).abs() < 1e-6);
        assert!((vp.transform().scale - 0.2 * 1.25 * 1.25).abs() < 1e-9);
        assert!(fx.0.contains(&ViewportEffect::ZoomChanged(31)));
    }

    #[test]
    fn zoom_is_limited() {
        let (mut vp, mut fx) = viewport((10, 10), (100.0, 100.0));
        for _ in 0..100 {
            vp.zoom_in(&mut fx);
        }
        assert_eq!(vp.transform().scale, 40.0);
        for _ in 0..200 {
            vp.zoom_out(&mut fx);
        }
        assert_eq!(vp.transform().scale, 0.02);
    }

    #[test]
    fn zero_area_crop_is_cancelled_on_enter() {
        let (mut vp, mut fx) = viewport((100, 100), (100.0, 100.0));
        vp.set_mode(ToolMode::Crop, &mut fx);
        vp.handle(press((10.0, 10.0)), &mut fx);
        vp.handle(release((10.0, 10.0)), &mut fx);
        assert!(!vp.selection().active);
        vp.handle(InputEvent::Key(Key::Enter), &mut fx);
        assert_eq!(vp.mode(), ToolMode::None);
        assert!(!fx.0.iter().any(|e| matches!(e, ViewportEffect::CropCommitted(_))));
    }

    #[test]
    fn crop_uses_scene_coordinates() {
        // 400x400 image in a 200x200 view: scale 0.5, no offset.
        let (mut vp, mut fx) = viewport((400, 400), (200.0, 200.0));
        vp.set_mode(ToolMode::Crop, &mut fx);
        vp.handle(press((60.0, 20.0)), &mut fx);
        vp.handle(moved((30.0, 70.0)), &mut fx);
        assert_eq!(vp.selection().rect, PixelRect::new(60, 40, 60, 100));
        vp.handle(release((10.0, 80.0)), &mut fx);
        assert!(vp.selection().active);
        vp.handle(InputEvent::Key(Key::Enter), &mut fx);
        assert!(fx.0.contains(&ViewportEffect::CropCommitted(PixelRect::new(20, 40, 100, 120))));
        assert_eq!(vp.mode(), ToolMode::None);
        assert!(!vp.selection().active);
    }

    #[test]
    fn crop_drag_is_clamped_to_image() {
        let (mut vp, mut fx) = viewport((100, 50), (300.0, 300.0));
        // Image sits at (100, 125) in the view.
        vp.set_mode(ToolMode::Crop, &mut fx);
        vp.handle(press((50.0, 100.0)), &mut fx);
        vp.handle(release((150.0, 400.0)), &mut fx);
        assert_eq!(vp.selection().rect, PixelRect::new(0, 0, 50, 50));
    }

    #[test]
    fn escape_and_right_click_cancel_crop() {
        let (mut vp, mut fx) = viewport((100, 100), (100.0, 100.0));
        vp.set_mode(ToolMode::Crop, &mut fx);
        vp.handle(press((10.0, 10.0)), &mut fx);
        vp.handle(release((50.0, 50.0)), &mut fx);
        vp.handle(InputEvent::Key(Key::Escape), &mut fx);
        assert_eq!(vp.mode(), ToolMode::None);
        assert!(!vp.selection().active);
        assert_eq!(statuses(&fx).last(), Some(&"Cancelled"));

        vp.set_mode(ToolMode::Crop, &mut fx);
        vp.handle(press((10.0, 10.0)), &mut fx);
        vp.handle(release((50.0, 50.0)), &mut fx);
        vp.handle(
            InputEvent::Pressed {
                button: MouseButton::Right,
                pos: Point::new(5.0, 5.0),
            },
            &mut fx,
        );
        assert_eq!(vp.mode(), ToolMode::None);
        assert!(!vp.selection().active);
    }

    #[test]
    fn escape_in_idle_mode_still_reports_cancel() {
        let (mut vp, mut fx) = viewport((10, 10), (10.0, 10.0));
        assert!(vp.handle(InputEvent::Key(Key::Escape), &mut fx));
        assert_eq!(statuses(&fx), ["Cancelled"]);
    }

    #[test]
    fn switching_tools_runs_exit_actions() {
        let (mut vp, mut fx) = viewport((100, 100), (100.0, 100.0));
        vp.set_mode(ToolMode::Crop, &mut fx);
        vp.handle(press((10.0, 10.0)), &mut fx);
        vp.handle(release((40.0, 40.0)), &mut fx);
        assert!(vp.selection().active);
        fx.0.clear();

        vp.set_mode(ToolMode::WhiteBalance, &mut fx);
        assert!(!vp.selection().active);
        assert_eq!(
            fx.0[..2],
            [
                ViewportEffect::CursorChanged(CursorGlyph::Arrow),
                ViewportEffect::CursorChanged(CursorGlyph::Crosshair),
            ]
        );
    }

    #[test]
    fn white_balance_click_picks_clamped_pixel() {
        let (mut vp, mut fx) = viewport((100, 50), (300.0, 300.0));
        vp.set_mode(ToolMode::WhiteBalance, &mut fx);
        vp.handle(press((500.0, 0.0)), &mut fx);
        assert!(fx.0.contains(&ViewportEffect::WhiteBalancePicked { x: 99, y: 0 }));
        assert_eq!(vp.mode(), ToolMode::None);
    }

    #[test]
    fn loupe_click_cycles_sizes() {
        let (mut vp, mut fx) = viewport((1000, 1000), (500.0, 500.0));
        vp.set_mode(ToolMode::Loupe, &mut fx);
        assert_eq!(vp.loupe_size(), 100);
        vp.handle(press((10.0, 10.0)), &mut fx);
        assert_eq!(vp.loupe_size(), 200);
        vp.handle(press((10.0, 10.0)), &mut fx);
        vp.handle(press((10.0, 10.0)), &mut fx);
        assert_eq!(vp.loupe_size(), 100);
        assert_eq!(vp.mode(), ToolMode::Loupe);
    }

    #[test]
    fn magnifier_samples_adaptive_window() {
        // 4000x3000: half = min(10, max(1, 3000 / 200)) = 10.
        let (mut vp, mut fx) = viewport((4000, 3000), (800.0, 600.0));
        vp.set_mode(ToolMode::WhiteBalance, &mut fx);
        vp.handle(moved((400.0, 300.0)), &mut fx);
        let o = vp.overlay().unwrap();
        assert_eq!(o.kind, OverlayKind::Magnifier);
        assert_eq!(o.source, PixelRect::new(1990, 1490, 21, 21));
        assert_eq!(o.size, Size::new(126.0, 126.0));
        assert_eq!(o.position, Point::new(420.0, 320.0));
    }

    #[test]
    fn magnifier_near_corner_is_clipped_and_flipped() {
        let (mut vp, mut fx) = viewport((50, 50), (50.0, 50.0));
        vp.set_mode(ToolMode::WhiteBalance, &mut fx);
        vp.handle(moved((49.0, 49.0)), &mut fx);
        let o = vp.overlay().unwrap();
        // Tiny image: half is 1, window clipped at the corner.
        assert_eq!(o.source, PixelRect::new(48, 48, 2, 2));
        assert_eq!(o.position, Point::new(17.0, 17.0));
    }

    #[test]
    fn loupe_window_stays_inside_image() {
        let (mut vp, mut fx) = viewport((150, 80), (150.0, 80.0));
        vp.set_mode(ToolMode::Loupe, &mut fx);
        vp.handle(moved((149.0, 1.0)), &mut fx);
        let o = vp.overlay().unwrap();
        assert_eq!(o.source, PixelRect::new(50, 0, 100, 80));
        assert_eq!(o.factor, 1);
    }

    #[test]
    fn no_overlay_outside_tools() {
        let (mut vp, mut fx) = viewport((50, 50), (50.0, 50.0));
        vp.handle(moved((10.0, 10.0)), &mut fx);
        assert!(vp.overlay().is_none());
    }

    #[test]
    fn middle_drag_pans_within_bounds() {
        let (mut vp, mut fx) = viewport((1000, 1000), (200.0, 200.0));
        vp.reset_zoom(&mut fx);
        let start = vp.transform();
        vp.handle(
            InputEvent::Pressed {
                button: MouseButton::Middle,
                pos: Point::new(100.0, 100.0),
            },
            &mut fx,
        );
        vp.handle(moved((130.0, 90.0)), &mut fx);
        assert_eq!(vp.transform().dx, start.dx + 30.0);
        assert_eq!(vp.transform().dy, start.dy - 10.0);

        vp.handle(moved((5000.0, 90.0)), &mut fx);
        assert_eq!(vp.transform().dx, 0.0);
        vp.handle(
            InputEvent::Released {
                button: MouseButton::Middle,
                pos: Point::new(0.0, 0.0),
            },
            &mut fx,
        );
        assert_eq!(fx.0.last(), Some(&ViewportEffect::CursorChanged(CursorGlyph::Arrow)));
    }

    #[test]
    fn double_click_goes_to_full_size_at_wheel_focus() {
        let (mut vp, mut fx) = viewport((1000, 1000), (100.0, 100.0));
        vp.handle(
            InputEvent::Wheel {
                delta: 1.0,
                pos: Point::new(25.0, 75.0),
            },
            &mut fx,
        );
        let focus = vp.transform().map_to_scene(Point::new(25.0, 75.0));
        vp.handle(InputEvent::DoubleClicked(Point::new(0.0, 0.0)), &mut fx);
        let t = vp.transform();
        assert_eq!(t.scale, 1.0);
        let centre = t.map_to_scene(Point::new(50.0, 50.0));
        assert!((centre.x - focus.x).abs() < 1e-6 && (centre.y - focus.y).abs() < 1e-6);
    }

    #[test]
    fn reset_zoom_centres_on_selection() {
        let (mut vp, mut fx) = viewport((1000, 1000), (100.0, 100.0));
        vp.set_mode(ToolMode::Crop, &mut fx);
        vp.handle(press((60.0, 60.0)), &mut fx);
        vp.handle(release((80.0, 80.0)), &mut fx);
        vp.reset_zoom(&mut fx);
        let centre = vp.transform().map_to_scene(Point::new(50.0, 50.0));
        assert_eq!(centre, Point::new(700.0, 700.0));
    }

    #[test]
    fn nothing_happens_without_image() {
        let mut fx = Effects::default();
        let mut vp = Viewport::new(ViewportOptions::default());
        vp.resize(Size::new(100.0, 100.0), &mut fx);
        vp.set_mode(ToolMode::Crop, &mut fx);
        assert_eq!(vp.mode(), ToolMode::None);
        assert!(!vp.handle(press((1.0, 1.0)), &mut fx));
        assert!(!vp.handle(InputEvent::Wheel { delta: 1.0, pos: Point::new(1.0, 1.0) }, &mut fx));
        vp.zoom_in(&mut fx);
        vp.reset_zoom(&mut fx);
        assert!(vp.overlay().is_none());
        assert!(vp.clamped_selection().is_none());
        assert!(fx.0.is_empty());
    }

    #[test]
    fn edit_that_changes_size_refits_and_clears_selection() {
        let (mut vp, mut fx) = viewport((400, 200), (200.0, 200.0));
        vp.set_mode(ToolMode::Crop, &mut fx);
        vp.handle(press((10.0, 60.0)), &mut fx);
        vp.handle(release((60.0, 120.0)), &mut fx);
        vp.update_image((200, 400), &mut fx);
        assert!(!vp.selection().active);
        assert_eq!(vp.transform().scale, 0.5);
        assert_eq!(vp.transform().dx, 50.0);
    }
}
