//! Typed cell style.
//!
//! Styles travel as string key-value maps at the edges of the system (see
//! [`keys`]); inside the crate they are a record of optional fields with
//! explicit default resolution.

use crate::geometry::Direction;
use crate::model::CellId;
use crate::perimeter::PerimeterKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Style map keys.
pub mod keys {
    pub const SHAPE: &str = "shape";
    pub const PERIMETER: &str = "perimeter";
    pub const PERIMETER_SPACING: &str = "perimeterSpacing";
    pub const DIRECTION: &str = "direction";
    pub const ROTATION: &str = "rotation";
    pub const FLIP_H: &str = "flipH";
    pub const FLIP_V: &str = "flipV";
    pub const ANCHOR_POINT_DIRECTION: &str = "anchorPointDirection";
    pub const LOCKED: &str = "locked";
    pub const SELECTABLE: &str = "selectable";

    pub const EXIT_X: &str = "exitX";
    pub const EXIT_Y: &str = "exitY";
    pub const EXIT_DX: &str = "exitDx";
    pub const EXIT_DY: &str = "exitDy";
    pub const EXIT_PERIMETER: &str = "exitPerimeter";
    pub const ENTRY_X: &str = "entryX";
    pub const ENTRY_Y: &str = "entryY";
    pub const ENTRY_DX: &str = "entryDx";
    pub const ENTRY_DY: &str = "entryDy";
    pub const ENTRY_PERIMETER: &str = "entryPerimeter";
    pub const SOURCE_PORT: &str = "sourcePort";
    pub const TARGET_PORT: &str = "targetPort";
}

/// Stored anchor of one edge end (`exit*` for the source, `entry*` for the
/// target). Values are kept as written; resolution happens on read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TerminalAnchor {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub dx: Option<f64>,
    pub dy: Option<f64>,
    /// Absent means true.
    pub perimeter: Option<bool>,
}

/// Style of a vertex, port or edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CellStyle {
    /// Stencil name.
    pub shape: Option<String>,
    pub perimeter: Option<PerimeterKind>,
    pub perimeter_spacing: Option<f64>,
    pub direction: Option<Direction>,
    /// Degrees, clockwise.
    pub rotation: Option<f64>,
    pub flip_h: Option<bool>,
    pub flip_v: Option<bool>,
    pub anchor_point_direction: Option<bool>,
    pub locked: Option<bool>,
    pub selectable: Option<bool>,

    pub exit_x: Option<f64>,
    pub exit_y: Option<f64>,
    pub exit_dx: Option<f64>,
    pub exit_dy: Option<f64>,
    pub exit_perimeter: Option<bool>,
    pub entry_x: Option<f64>,
    pub entry_y: Option<f64>,
    pub entry_dx: Option<f64>,
    pub entry_dy: Option<f64>,
    pub entry_perimeter: Option<bool>,
    pub source_port: Option<CellId>,
    pub target_port: Option<CellId>,
}

/// Finite value or zero.
pub(crate) fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

impl CellStyle {
    pub fn direction(&self) -> Direction {
        self.direction.unwrap_or_default()
    }

    /// Rotation in degrees; non-finite values read as 0.
    pub fn rotation(&self) -> f64 {
        finite_or_zero(self.rotation)
    }

    pub fn flip_h(&self) -> bool {
        self.flip_h.unwrap_or(false)
    }

    pub fn flip_v(&self) -> bool {
        self.flip_v.unwrap_or(false)
    }

    /// Whether anchors follow the direction's quarter turn. Defaults to true.
    pub fn anchor_point_direction(&self) -> bool {
        self.anchor_point_direction.unwrap_or(true)
    }

    pub fn perimeter_kind(&self) -> PerimeterKind {
        self.perimeter.unwrap_or_default()
    }

    pub fn perimeter_spacing(&self) -> f64 {
        finite_or_zero(self.perimeter_spacing)
    }

    pub fn is_locked(&self) -> bool {
        self.locked.unwrap_or(false)
    }

    pub fn is_selectable(&self) -> bool {
        self.selectable.unwrap_or(true)
    }

    /// Anchor stored for the source (`exit*`) or target (`entry*`) end.
    pub fn anchor(&self, is_source: bool) -> TerminalAnchor {
        if is_source {
            TerminalAnchor {
                x: self.exit_x,
                y: self.exit_y,
                dx: self.exit_dx,
                dy: self.exit_dy,
                perimeter: self.exit_perimeter,
            }
        } else {
            TerminalAnchor {
                x: self.entry_x,
                y: self.entry_y,
                dx: self.entry_dx,
                dy: self.entry_dy,
                perimeter: self.entry_perimeter,
            }
        }
    }

    /// Replace the anchor of one end.
    pub fn set_anchor(&mut self, is_source: bool, anchor: TerminalAnchor) {
        if is_source {
            self.exit_x = anchor.x;
            self.exit_y = anchor.y;
            self.exit_dx = anchor.dx;
            self.exit_dy = anchor.dy;
            self.exit_perimeter = anchor.perimeter;
        } else {
            self.entry_x = anchor.x;
            self.entry_y = anchor.y;
            self.entry_dx = anchor.dx;
            self.entry_dy = anchor.dy;
            self.entry_perimeter = anchor.perimeter;
        }
    }

    pub fn port(&self, is_source: bool) -> Option<CellId> {
        if is_source {
            self.source_port
        } else {
            self.target_port
        }
    }

    pub fn set_port(&mut self, is_source: bool, port: Option<CellId>) {
        if is_source {
            self.source_port = port;
        } else {
            self.target_port = port;
        }
    }

    /// Flatten into the string map form. Absent fields produce no key.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                map.insert(key.to_string(), value);
            }
        };
        let num = |v: Option<f64>| v.map(|v| v.to_string());
        let flag = |v: Option<bool>| v.map(|v| if v { "1" } else { "0" }.to_string());

        put(keys::SHAPE, self.shape.clone());
        put(keys::PERIMETER, self.perimeter.map(|p| p.name().to_string()));
        put(keys::PERIMETER_SPACING, num(self.perimeter_spacing));
        put(keys::DIRECTION, self.direction.map(|d| d.name().to_string()));
        put(keys::ROTATION, num(self.rotation));
        put(keys::FLIP_H, flag(self.flip_h));
        put(keys::FLIP_V, flag(self.flip_v));
        put(keys::ANCHOR_POINT_DIRECTION, flag(self.anchor_point_direction));
        put(keys::LOCKED, flag(self.locked));
        put(keys::SELECTABLE, flag(self.selectable));

        put(keys::EXIT_X, num(self.exit_x));
        put(keys::EXIT_Y, num(self.exit_y));
        put(keys::EXIT_DX, num(self.exit_dx));
        put(keys::EXIT_DY, num(self.exit_dy));
        put(keys::EXIT_PERIMETER, flag(self.exit_perimeter));
        put(keys::ENTRY_X, num(self.entry_x));
        put(keys::ENTRY_Y, num(self.entry_y));
        put(keys::ENTRY_DX, num(self.entry_dx));
        put(keys::ENTRY_DY, num(self.entry_dy));
        put(keys::ENTRY_PERIMETER, flag(self.entry_perimeter));
        put(keys::SOURCE_PORT, self.source_port.map(|id| id.to_string()));
        put(keys::TARGET_PORT, self.target_port.map(|id| id.to_string()));
        map
    }

    /// Build a style from the string map form. Unknown keys are ignored and
    /// unparseable values are treated as absent, except numbers, which keep
    /// whatever `f64` parsing produced (so `"NaN"` is stored and resolves to 0).
    pub fn from_map<'a>(map: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut style = CellStyle::default();
        for (key, value) in map {
            let num = || value.trim().parse::<f64>().ok();
            let flag = || match value.trim() {
                "1" | "true" => Some(true),
                "0" | "false" => Some(false),
                _ => None,
            };
            match key {
                keys::SHAPE => style.shape = Some(value.to_string()),
                keys::PERIMETER => style.perimeter = PerimeterKind::from_name(value),
                keys::PERIMETER_SPACING => style.perimeter_spacing = num(),
                keys::DIRECTION => style.direction = Direction::from_name(value),
                keys::ROTATION => style.rotation = num(),
                keys::FLIP_H => style.flip_h = flag(),
                keys::FLIP_V => style.flip_v = flag(),
                keys::ANCHOR_POINT_DIRECTION => style.anchor_point_direction = flag(),
                keys::LOCKED => style.locked = flag(),
                keys::SELECTABLE => style.selectable = flag(),
                keys::EXIT_X => style.exit_x = num(),
                keys::EXIT_Y => style.exit_y = num(),
                keys::EXIT_DX => style.exit_dx = num(),
                keys::EXIT_DY => style.exit_dy = num(),
                keys::EXIT_PERIMETER => style.exit_perimeter = flag(),
                keys::ENTRY_X => style.entry_x = num(),
                keys::ENTRY_Y => style.entry_y = num(),
                keys::ENTRY_DX => style.entry_dx = num(),
                keys::ENTRY_DY => style.entry_dy = num(),
                keys::ENTRY_PERIMETER => style.entry_perimeter = flag(),
                keys::SOURCE_PORT => style.source_port = value.parse().ok(),
                keys::TARGET_PORT => style.target_port = value.parse().ok(),
                _ => log::trace!("ignoring style key {key}"),
            }
        }
        style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let style = CellStyle::default();
        assert_eq!(style.direction(), Direction::East);
        assert_eq!(style.rotation(), 0.0);
        assert!(!style.flip_h());
        assert!(style.anchor_point_direction());
        assert_eq!(style.perimeter_kind(), PerimeterKind::Rectangle);
        assert!(style.is_selectable());
        assert!(!style.is_locked());
    }

    #[test]
    fn test_non_finite_rotation_reads_as_zero() {
        let style = CellStyle {
            rotation: Some(f64::NAN),
            ..Default::default()
        };
        assert_eq!(style.rotation(), 0.0);
    }

    #[test]
    fn test_anchor_sides_are_independent() {
        let mut style = CellStyle::default();
        style.set_anchor(
            true,
            TerminalAnchor {
                x: Some(1.0),
                y: Some(0.5),
                ..Default::default()
            },
        );
        assert_eq!(style.exit_x, Some(1.0));
        assert_eq!(style.entry_x, None);
        assert_eq!(style.anchor(false), TerminalAnchor::default());
    }

    #[test]
    fn test_map_keys() {
        let style = CellStyle {
            exit_x: Some(0.5),
            exit_perimeter: Some(false),
            direction: Some(Direction::North),
            ..Default::default()
        };
        let map = style.to_map();
        assert_eq!(map.get(keys::EXIT_X).map(String::as_str), Some("0.5"));
        assert_eq!(map.get(keys::EXIT_PERIMETER).map(String::as_str), Some("0"));
        assert_eq!(map.get(keys::DIRECTION).map(String::as_str), Some("north"));
        assert!(!map.contains_key(keys::ENTRY_PERIMETER));
    }

    #[test]
    fn test_from_map() {
        let style = CellStyle::from_map([
            ("entryX", "0.25"),
            ("entryDx", "NaN"),
            ("flipH", "1"),
            ("perimeter", "ellipse"),
            ("fillColor", "#fff"),
        ]);
        assert_eq!(style.entry_x, Some(0.25));
        assert!(style.entry_dx.is_some_and(f64::is_nan));
        assert!(style.flip_h());
        assert_eq!(style.perimeter_kind(), PerimeterKind::Ellipse);
    }

    #[test]
    fn test_json_uses_wire_names() {
        let style = CellStyle {
            exit_dx: Some(3.0),
            ..Default::default()
        };
        let json = serde_json::to_value(&style).unwrap();
        assert_eq!(json["exitDx"], serde_json::json!(3.0));
    }
}
