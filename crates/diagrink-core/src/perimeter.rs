//! Perimeter projection.
//!
//! Each function snaps `next` onto the outline of a shape inscribed in
//! `bounds`, along the ray from the center towards `next`. With `orthogonal`
//! set, points that lie within the horizontal or vertical extent of the
//! bounds are projected straight across instead.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Outline used when snapping connection points to a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerimeterKind {
    #[default]
    Rectangle,
    Ellipse,
    Rhombus,
    /// No outline: connections go to the center.
    None,
}

impl PerimeterKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "rectangle" => Some(PerimeterKind::Rectangle),
            "ellipse" => Some(PerimeterKind::Ellipse),
            "rhombus" => Some(PerimeterKind::Rhombus),
            "none" => Some(PerimeterKind::None),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PerimeterKind::Rectangle => "rectangle",
            PerimeterKind::Ellipse => "ellipse",
            PerimeterKind::Rhombus => "rhombus",
            PerimeterKind::None => "none",
        }
    }

    /// Project `next` onto this outline. `None` when there is no outline.
    pub fn project(self, bounds: Rect, next: Point, orthogonal: bool) -> Option<Point> {
        match self {
            PerimeterKind::Rectangle => Some(rectangle(bounds, next, orthogonal)),
            PerimeterKind::Ellipse => Some(ellipse(bounds, next, orthogonal)),
            PerimeterKind::Rhombus => Some(rhombus(bounds, next, orthogonal)),
            PerimeterKind::None => None,
        }
    }
}

/// Scale factor that takes the ray `(dx, dy)` from the center to an outline
/// described by `norm`, or 0 if the outline is degenerate along the ray.
fn ray_factor(norm: f64) -> f64 {
    if norm.is_finite() && norm > 0.0 {
        1.0 / norm
    } else {
        0.0
    }
}

fn axis_ratio(delta: f64, half: f64) -> f64 {
    if half > 0.0 {
        delta.abs() / half
    } else if delta != 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Rectangle outline.
pub fn rectangle(bounds: Rect, next: Point, orthogonal: bool) -> Point {
    let center = bounds.center();
    let dx = next.x - center.x;
    let dy = next.y - center.y;

    let mut p = if dx == 0.0 && dy == 0.0 {
        Point::new(bounds.x1, center.y)
    } else {
        let a = bounds.width() / 2.0;
        let b = bounds.height() / 2.0;
        let t = ray_factor(axis_ratio(dx, a).max(axis_ratio(dy, b)));
        Point::new(center.x + dx * t, center.y + dy * t)
    };

    if orthogonal {
        if next.x >= bounds.x0 && next.x <= bounds.x1 {
            p.x = next.x;
        } else if next.y >= bounds.y0 && next.y <= bounds.y1 {
            p.y = next.y;
        }
        if next.x < bounds.x0 {
            p.x = bounds.x0;
        } else if next.x > bounds.x1 {
            p.x = bounds.x1;
        }
        if next.y < bounds.y0 {
            p.y = bounds.y0;
        } else if next.y > bounds.y1 {
            p.y = bounds.y1;
        }
    }
    p
}

/// Ellipse inscribed in the bounds.
pub fn ellipse(bounds: Rect, next: Point, orthogonal: bool) -> Point {
    let center = bounds.center();
    let a = bounds.width() / 2.0;
    let b = bounds.height() / 2.0;
    let dx = next.x - center.x;
    let dy = next.y - center.y;

    if dx == 0.0 && dy == 0.0 {
        return next;
    }

    if orthogonal {
        if next.y >= bounds.y0 && next.y <= bounds.y1 && b > 0.0 {
            let tx = (a * a * (1.0 - (dy * dy) / (b * b))).max(0.0).sqrt();
            let tx = if next.x <= bounds.x0 { -tx } else { tx };
            return Point::new(center.x + tx, next.y);
        }
        if next.x >= bounds.x0 && next.x <= bounds.x1 && a > 0.0 {
            let ty = (b * b * (1.0 - (dx * dx) / (a * a))).max(0.0).sqrt();
            let ty = if next.y <= bounds.y0 { -ty } else { ty };
            return Point::new(next.x, center.y + ty);
        }
    }

    let rx = if a > 0.0 { dx / a } else if dx != 0.0 { f64::INFINITY } else { 0.0 };
    let ry = if b > 0.0 { dy / b } else if dy != 0.0 { f64::INFINITY } else { 0.0 };
    let t = ray_factor((rx * rx + ry * ry).sqrt());
    Point::new(center.x + dx * t, center.y + dy * t)
}

/// Diamond touching the middle of each side of the bounds.
pub fn rhombus(bounds: Rect, next: Point, orthogonal: bool) -> Point {
    let center = bounds.center();
    let a = bounds.width() / 2.0;
    let b = bounds.height() / 2.0;
    let dx = next.x - center.x;
    let dy = next.y - center.y;

    if dx == 0.0 {
        return if dy < 0.0 {
            Point::new(center.x, bounds.y0)
        } else {
            Point::new(center.x, bounds.y1)
        };
    }
    if dy == 0.0 {
        return if dx < 0.0 {
            Point::new(bounds.x0, center.y)
        } else {
            Point::new(bounds.x1, center.y)
        };
    }

    if orthogonal {
        if next.x >= bounds.x0 && next.x <= bounds.x1 && a > 0.0 {
            let ty = b * (1.0 - dx.abs() / a);
            return Point::new(next.x, center.y + ty.copysign(dy));
        }
        if next.y >= bounds.y0 && next.y <= bounds.y1 && b > 0.0 {
            let tx = a * (1.0 - dy.abs() / b);
            return Point::new(center.x + tx.copysign(dx), next.y);
        }
    }

    let t = ray_factor(axis_ratio(dx, a) + axis_ratio(dy, b));
    Point::new(center.x + dx * t, center.y + dy * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_point(p: Point, x: f64, y: f64) {
        assert!((p.x - x).abs() < EPS, "x: {} != {}", p.x, x);
        assert!((p.y - y).abs() < EPS, "y: {} != {}", p.y, y);
    }

    #[test]
    fn test_rectangle_cardinal_rays() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert_point(rectangle(bounds, Point::new(500.0, 25.0), false), 100.0, 25.0);
        assert_point(rectangle(bounds, Point::new(-500.0, 25.0), false), 0.0, 25.0);
        assert_point(rectangle(bounds, Point::new(50.0, -500.0), false), 50.0, 0.0);
        assert_point(rectangle(bounds, Point::new(50.0, 500.0), false), 50.0, 50.0);
    }

    #[test]
    fn test_rectangle_interior_point_is_pushed_out() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert_point(rectangle(bounds, Point::new(75.0, 25.0), false), 100.0, 25.0);
    }

    #[test]
    fn test_rectangle_center_falls_back_to_right_side() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert_point(rectangle(bounds, Point::new(50.0, 25.0), false), 100.0, 25.0);
    }

    #[test]
    fn test_rectangle_orthogonal() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert_point(rectangle(bounds, Point::new(80.0, -40.0), true), 80.0, 0.0);
    }

    #[test]
    fn test_ellipse_rays() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert_point(ellipse(bounds, Point::new(200.0, 25.0), false), 100.0, 25.0);
        assert_point(ellipse(bounds, Point::new(50.0, -10.0), false), 50.0, 0.0);

        let diag = ellipse(Rect::new(-10.0, -10.0, 10.0, 10.0), Point::new(10.0, 10.0), false);
        let r = (diag.x * diag.x + diag.y * diag.y).sqrt();
        assert!((r - 10.0).abs() < EPS);
    }

    #[test]
    fn test_rhombus_rays() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert_point(rhombus(bounds, Point::new(120.0, 25.0), false), 100.0, 25.0);
        assert_point(rhombus(bounds, Point::new(50.0, 60.0), false), 50.0, 50.0);
        // Diagonal ray lands on the edge between (100,25) and (50,50).
        let p = rhombus(bounds, Point::new(100.0, 50.0), false);
        assert!(((p.x - 50.0) / 50.0 + (p.y - 25.0) / 25.0 - 1.0).abs() < EPS);
    }

    #[test]
    fn test_none_has_no_projection() {
        let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(PerimeterKind::None.project(bounds, Point::ZERO, false).is_none());
    }
}
