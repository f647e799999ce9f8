//! Plain value types shared by the viewport, the renderer and the image model.
//!
//! Scene coordinates are image pixels. View coordinates are pixels of the
//! on-screen viewport. [`ViewTransform`] maps one onto the other.

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Integer rectangle in image space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalized bounding box of two corner points, rounded to whole pixels.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let left = a.x.min(b.x).round() as i64;
        let top = a.y.min(b.y).round() as i64;
        let right = a.x.max(b.x).round() as i64;
        let bottom = a.y.max(b.y).round() as i64;
        Self {
            x: left,
            y: top,
            width: (right - left).max(0) as u32,
            height: (bottom - top).max(0) as u32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> i64 {
        self.x + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.height as i64
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Intersection with `0..width` x `0..height`. May come back empty.
    pub fn clamp_to(&self, width: u32, height: u32) -> PixelRect {
        let left = self.x.clamp(0, width as i64);
        let top = self.y.clamp(0, height as i64);
        let right = self.right().clamp(0, width as i64);
        let bottom = self.bottom().clamp(0, height as i64);
        PixelRect {
            x: left,
            y: top,
            width: (right - left).max(0) as u32,
            height: (bottom - top).max(0) as u32,
        }
    }

    /// Square of side `2 * half + 1` centred on `(cx, cy)`, clipped to the image.
    pub fn square_around(cx: i64, cy: i64, half: u32, width: u32, height: u32) -> PixelRect {
        let half = half as i64;
        PixelRect {
            x: cx - half,
            y: cy - half,
            width: (2 * half + 1) as u32,
            height: (2 * half + 1) as u32,
        }
        .clamp_to(width, height)
    }
}

/// Uniform scale followed by a translation: `view = scene * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub dx: f64,
    pub dy: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            dx: 0.0,
            dy: 0.0,
        }
    }
}

impl ViewTransform {
    pub fn map_to_view(&self, p: Point) -> Point {
        Point::new(p.x * self.scale + self.dx, p.y * self.scale + self.dy)
    }

    pub fn map_to_scene(&self, p: Point) -> Point {
        Point::new((p.x - self.dx) / self.scale, (p.y - self.dy) / self.scale)
    }

    /// Translate so `scene` lands on `view`.
    pub fn center_on(&mut self, scene: Point, view: Point) {
        self.dx = view.x - scene.x * self.scale;
        self.dy = view.y - scene.y * self.scale;
    }

    pub fn percent(&self) -> u32 {
        (self.scale * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_normalized() {
        let r = PixelRect::from_corners(Point::new(30.0, 40.0), Point::new(10.0, 15.0));
        assert_eq!(r, PixelRect::new(10, 15, 20, 25));
    }

    #[test]
    fn same_corner_gives_empty_rect() {
        let r = PixelRect::from_corners(Point::new(10.0, 10.0), Point::new(10.0, 10.0));
        assert!(r.is_empty());
    }

    #[test]
    fn clamp_clips_to_image() {
        let r = PixelRect::new(-5, 90, 20, 20).clamp_to(100, 100);
        assert_eq!(r, PixelRect::new(0, 90, 15, 10));
        assert!(PixelRect::new(200, 200, 5, 5).clamp_to(100, 100).is_empty());
    }

    #[test]
    fn square_around_edge_is_clipped() {
        let r = PixelRect::square_around(0, 0, 3, 50, 50);
        assert_eq!(r, PixelRect::new(0, 0, 4, 4));
    }

    #[test]
    fn transform_round_trips_points() {
        let t = ViewTransform {
            scale: 2.5,
            dx: -40.0,
            dy: 12.0,
        };
        let p = Point::new(13.0, 7.0);
        let back = t.map_to_scene(t.map_to_view(p));
        assert!((back.x - p.x).abs() < 1e-9 && (back.y - p.y).abs() < 1e-9);
    }
}
