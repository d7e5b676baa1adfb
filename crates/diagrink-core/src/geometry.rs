//! Rotation, flip and axis-swap helpers shared by the resolver and the view.

use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Logical facing of a shape.
///
/// East is the natural frame: a north or south facing shape has its bounding
/// box axes swapped before any anchor math is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    East,
    South,
    West,
    North,
}

impl Direction {
    /// Parse a style value (`"north"`, `"south"`, `"east"`, `"west"`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "east" => Some(Direction::East),
            "south" => Some(Direction::South),
            "west" => Some(Direction::West),
            "north" => Some(Direction::North),
            _ => None,
        }
    }

    /// Style value for this direction.
    pub fn name(self) -> &'static str {
        match self {
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
            Direction::North => "north",
        }
    }

    /// North and south reinterpret the bounding box with swapped axes.
    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::North | Direction::South)
    }

    /// Quarter-turn rotation, in degrees, from the east frame to this direction.
    pub fn rotation(self) -> f64 {
        match self {
            Direction::East => 0.0,
            Direction::South => 90.0,
            Direction::West => 180.0,
            Direction::North => 270.0,
        }
    }

    /// Horizontal and vertical flips trade places for north/south shapes.
    ///
    /// Both the outline constraint and the connection point go through this
    /// so the two stay inverse to each other.
    pub fn swap_flips(self, flip_h: bool, flip_v: bool) -> (bool, bool) {
        if self.is_vertical() {
            (flip_v, flip_h)
        } else {
            (flip_h, flip_v)
        }
    }
}

/// Degrees to radians.
pub fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

/// Rotate `point` about `center` given the cosine and sine of the angle.
pub fn rotate_point(point: Point, cos: f64, sin: f64, center: Point) -> Point {
    let x = point.x - center.x;
    let y = point.y - center.y;
    Point::new(x * cos - y * sin + center.x, y * cos + x * sin + center.y)
}

/// Rotate `point` about `center` by `degrees`.
pub fn rotate_point_degrees(point: Point, degrees: f64, center: Point) -> Point {
    if degrees == 0.0 {
        return point;
    }
    let rad = to_radians(degrees);
    rotate_point(point, rad.cos(), rad.sin(), center)
}

/// Exact cosine and sine for multiples of 90 degrees.
///
/// Anything that is not a quarter turn maps to the identity.
pub fn quarter_turn(degrees: f64) -> (f64, f64) {
    match degrees.rem_euclid(360.0) {
        d if d == 90.0 => (0.0, 1.0),
        d if d == 180.0 => (-1.0, 0.0),
        d if d == 270.0 => (0.0, -1.0),
        _ => (1.0, 0.0),
    }
}

/// Swap width and height while keeping the center in place.
pub fn rotate_rect_90(rect: Rect) -> Rect {
    Rect::from_center_size(rect.center(), Size::new(rect.height(), rect.width()))
}

/// Mirror `point` about `center` on the requested axes.
pub fn mirror(point: Point, center: Point, flip_h: bool, flip_v: bool) -> Point {
    Point::new(
        if flip_h { 2.0 * center.x - point.x } else { point.x },
        if flip_v { 2.0 * center.y - point.y } else { point.y },
    )
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Whether every coordinate of the rectangle is a finite number.
pub fn is_finite_rect(rect: Rect) -> bool {
    rect.x0.is_finite() && rect.y0.is_finite() && rect.x1.is_finite() && rect.y1.is_finite()
}

/// Strict overlap test; touching edges do not count.
pub fn intersects(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
}

/// Map a logical point into a view with the given translate and scale.
pub fn to_view(point: Point, translate: Vec2, scale: f64) -> Point {
    Point::new((point.x + translate.x) * scale, (point.y + translate.y) * scale)
}
