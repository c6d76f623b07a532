use serde::{Deserialize, Serialize};

/// Tolerance used for containment checks and degenerate-size detection.
pub const EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }

    /// Angle from `self` towards `other` in screen space (y grows downwards),
    /// normalized to `[0, 2π)`: 0 is east, π/2 south, π west, 3π/2 north.
    pub fn angle_to(self, other: Point) -> f32 {
        let angle = (other.y - self.y).atan2(other.x - self.x);
        if angle < 0.0 {
            angle + std::f32::consts::TAU
        } else {
            angle
        }
    }

    pub fn approx_eq(self, other: Point) -> bool {
        (self.x - other.x).abs() <= EPSILON && (self.y - other.y).abs() <= EPSILON
    }

    pub fn translate(self, dx: f32, dy: f32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned rectangle. `top < bottom` in screen orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Bounds {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn unit() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    pub fn from_center(center: Point, width: f32, height: f32) -> Self {
        let hw = width.max(0.0) / 2.0;
        let hh = height.max(0.0) / 2.0;
        Self::new(center.x - hw, center.y - hh, center.x + hw, center.y + hh)
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Self::new(first.x, first.y, first.x, first.y);
        for point in &points[1..] {
            bounds.left = bounds.left.min(point.x);
            bounds.top = bounds.top.min(point.y);
            bounds.right = bounds.right.max(point.x);
            bounds.bottom = bounds.bottom.max(point.y);
        }
        Some(bounds)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() <= EPSILON || self.height() <= EPSILON
    }

    /// Shrinks the rectangle by `dx` on the left and right and `dy` on the
    /// top and bottom. When the padding would invert it the result collapses
    /// to the center point.
    pub fn deflate(&self, dx: f32, dy: f32) -> Bounds {
        if dx * 2.0 > self.width() || dy * 2.0 > self.height() {
            let center = self.center();
            return Bounds::new(center.x, center.y, center.x, center.y);
        }
        Bounds::new(
            self.left + dx,
            self.top + dy,
            self.right - dx,
            self.bottom - dy,
        )
    }

    pub fn inflate(&self, dx: f32, dy: f32) -> Bounds {
        Bounds::new(
            self.left - dx,
            self.top - dy,
            self.right + dx,
            self.bottom + dy,
        )
    }

    /// Strict interior intersection; rectangles that only share an edge do
    /// not intersect.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        other.left >= self.left - EPSILON
            && other.top >= self.top - EPSILON
            && other.right <= self.right + EPSILON
            && other.bottom <= self.bottom + EPSILON
    }

    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.left - EPSILON
            && point.x <= self.right + EPSILON
            && point.y >= self.top - EPSILON
            && point.y <= self.bottom + EPSILON
    }

    /// True when `point` lies on the rectangle's outline.
    pub fn on_boundary(&self, point: Point) -> bool {
        if !self.contains_point(point) {
            return false;
        }
        (point.x - self.left).abs() <= EPSILON
            || (point.x - self.right).abs() <= EPSILON
            || (point.y - self.top).abs() <= EPSILON
            || (point.y - self.bottom).abs() <= EPSILON
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Bounds {
        Bounds::new(
            self.left + dx,
            self.top + dy,
            self.right + dx,
            self.bottom + dy,
        )
    }

    pub fn scale_about_center(&self, fx: f32, fy: f32) -> Bounds {
        Bounds::from_center(self.center(), self.width() * fx, self.height() * fy)
    }

    /// Overlap lengths along x and y; both are positive only when the
    /// rectangles intersect.
    pub fn overlap_extent(&self, other: &Bounds) -> (f32, f32) {
        let ox = self.right.min(other.right) - self.left.max(other.left);
        let oy = self.bottom.min(other.bottom) - self.top.max(other.top);
        (ox, oy)
    }

    /// Moves the rectangle by the smallest translation that puts it inside
    /// `outer`. A rectangle wider or taller than `outer` is centered on that
    /// axis instead.
    pub fn clamp_within(&self, outer: &Bounds) -> Bounds {
        let dx = if self.width() >= outer.width() {
            outer.center().x - self.center().x
        } else if self.left < outer.left {
            outer.left - self.left
        } else if self.right > outer.right {
            outer.right - self.right
        } else {
            0.0
        };
        let dy = if self.height() >= outer.height() {
            outer.center().y - self.center().y
        } else if self.top < outer.top {
            outer.top - self.top
        } else if self.bottom > outer.bottom {
            outer.bottom - self.bottom
        } else {
            0.0
        };
        self.translate(dx, dy)
    }

    /// Clips the segment `a`-`b` against the rectangle interior
    /// (Liang–Barsky). Returns true when a non-trivial part of the segment lies
    /// strictly inside.
    pub fn segment_crosses(&self, a: Point, b: Point) -> bool {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let mut t0 = 0.0f32;
        let mut t1 = 1.0f32;
        let checks = [
            (-dx, a.x - self.left),
            (dx, self.right - a.x),
            (-dy, a.y - self.top),
            (dy, self.bottom - a.y),
        ];
        for (p, q) in checks {
            if p.abs() <= EPSILON {
                if q <= EPSILON {
                    return false;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return false;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return false;
                }
                t1 = t1.min(r);
            }
        }
        t1 - t0 > EPSILON
    }
}

/// Axis-separable affine map `p' = (sx * x + tx, sy * y + ty)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineMap {
    pub sx: f32,
    pub sy: f32,
    pub tx: f32,
    pub ty: f32,
}

impl AffineMap {
    pub fn identity() -> Self {
        Self {
            sx: 1.0,
            sy: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    pub fn translation(dx: f32, dy: f32) -> Self {
        Self {
            sx: 1.0,
            sy: 1.0,
            tx: dx,
            ty: dy,
        }
    }

    /// Maps `from` onto `to`. Degenerate source axes collapse onto the
    /// target's center on that axis.
    pub fn between(from: &Bounds, to: &Bounds) -> Self {
        let (sx, tx) = axis_map(from.left, from.right, to.left, to.right);
        let (sy, ty) = axis_map(from.top, from.bottom, to.top, to.bottom);
        Self { sx, sy, tx, ty }
    }

    pub fn apply(&self, point: Point) -> Point {
        Point::new(point.x * self.sx + self.tx, point.y * self.sy + self.ty)
    }

    pub fn apply_bounds(&self, bounds: &Bounds) -> Bounds {
        let a = self.apply(Point::new(bounds.left, bounds.top));
        let b = self.apply(Point::new(bounds.right, bounds.bottom));
        Bounds::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
    }
}

fn axis_map(from_lo: f32, from_hi: f32, to_lo: f32, to_hi: f32) -> (f32, f32) {
    let span = from_hi - from_lo;
    if span.abs() <= EPSILON {
        return (0.0, (to_lo + to_hi) / 2.0);
    }
    let scale = (to_hi - to_lo) / span;
    (scale, to_lo - from_lo * scale)
}

/// World size (layout pixels) represented by the unit square.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitScale {
    pub width: f32,
    pub height: f32,
}

impl UnitScale {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    pub fn to_unit_x(&self, px: f32) -> f32 {
        px / self.width
    }

    pub fn to_unit_y(&self, px: f32) -> f32 {
        px / self.height
    }

    pub fn to_world(&self, point: Point) -> Point {
        Point::new(point.x * self.width, point.y * self.height)
    }

    pub fn bounds_to_world(&self, bounds: &Bounds) -> Bounds {
        Bounds::new(
            bounds.left * self.width,
            bounds.top * self.height,
            bounds.right * self.width,
            bounds.bottom * self.height,
        )
    }
}

impl Default for UnitScale {
    fn default() -> Self {
        Self::new(1200.0, 800.0)
    }
}
