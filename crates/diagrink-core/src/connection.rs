//! Connection constraints: where an edge end attaches to a shape.
//!
//! A constraint stores a fractional point inside the terminal's bounding box
//! plus a pixel offset. [`outline_constraint`] derives one from an absolute
//! point, [`connection_point`] resolves one back, and the [`Graph`] methods
//! persist them in the edge style and drive the connect/disconnect
//! transactions.

use crate::geometry::{
    mirror, quarter_turn, rotate_point, rotate_point_degrees, rotate_rect_90, round_to,
};
use crate::error::GraphResult;
use crate::graph::{Graph, GraphEvent};
use crate::model::CellId;
use crate::style::{CellStyle, TerminalAnchor, finite_or_zero};
use crate::view::{CellState, GraphView};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Attachment of one edge end to a terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConstraint {
    /// Fraction of the terminal's bounding box (not clamped to 0..1).
    /// `None` floats the end along the perimeter.
    pub point: Option<Point>,
    /// Project the resolved point onto the terminal's perimeter.
    pub perimeter: bool,
    pub port_id: Option<String>,
    /// Offset in unscaled pixels.
    pub dx: f64,
    pub dy: f64,
}

impl Default for ConnectionConstraint {
    fn default() -> Self {
        Self {
            point: None,
            perimeter: true,
            port_id: None,
            dx: 0.0,
            dy: 0.0,
        }
    }
}

impl ConnectionConstraint {
    pub fn new(point: Option<Point>, perimeter: bool) -> Self {
        Self {
            point,
            perimeter,
            ..Default::default()
        }
    }

    pub fn with_offset(mut self, dx: f64, dy: f64) -> Self {
        self.dx = dx;
        self.dy = dy;
        self
    }

    pub fn with_port_id(mut self, port_id: impl Into<String>) -> Self {
        self.port_id = Some(port_id.into());
        self
    }

    /// Whether this pins the end to a point rather than letting it float.
    pub fn is_fixed(&self) -> bool {
        self.point.is_some()
    }
}

/// Describe `point` (view coordinates) as a fraction of the terminal's box.
///
/// The point is taken into the shape's unrotated, unflipped east-facing frame
/// first. Edges use the box around their points. Returns `None` for states
/// without finite bounds.
pub fn outline_constraint(view: &GraphView, point: Point, state: &CellState) -> Option<ConnectionConstraint> {
    let mut bounds = view.perimeter_bounds(state);
    if !crate::geometry::is_finite_rect(bounds) {
        return None;
    }

    let style = &state.style;
    let direction = style.direction();
    if direction.is_vertical() {
        bounds = rotate_rect_90(bounds);
    }

    let point = rotate_point_degrees(point, -state.shape_rotation(), bounds.center());

    let (flip_h, flip_v) = direction.swap_flips(style.flip_h(), style.flip_v());
    let (sx, dx) = if flip_h { (-1.0, -bounds.width()) } else { (1.0, 0.0) };
    let (sy, dy) = if flip_v { (-1.0, -bounds.height()) } else { (1.0, 0.0) };
    let local = Point::new(
        (point.x - bounds.x0) * sx - dx + bounds.x0,
        (point.y - bounds.y0) * sy - dy + bounds.y0,
    );

    let fraction = |offset: f64, size: f64| {
        if size == 0.0 { 0.0 } else { round_to(offset / size, 3) }
    };
    let x = fraction(local.x - bounds.x0, bounds.width());
    let y = fraction(local.y - bounds.y0, bounds.height());

    Some(ConnectionConstraint::new(Some(Point::new(x, y)), false))
}

/// Resolve a constraint into a view coordinate on `state`.
///
/// The direction's quarter turn (`r1`) is applied before perimeter projection;
/// the shape's own rotation (`r2`) is applied once at the end.
pub fn connection_point(
    view: &GraphView,
    state: &CellState,
    constraint: &ConnectionConstraint,
    round: bool,
) -> Option<Point> {
    let fraction = constraint.point?;
    let mut bounds = view.perimeter_bounds(state);
    let center = bounds.center();
    let style = &state.style;
    let direction = style.direction();

    let mut r1 = 0.0;
    if style.anchor_point_direction() {
        r1 = direction.rotation();
        if direction.is_vertical() {
            bounds = rotate_rect_90(bounds);
        }
    }

    let scale = view.scale();
    let mut point = Point::new(
        bounds.x0 + fraction.x * bounds.width() + constraint.dx * scale,
        bounds.y0 + fraction.y * bounds.height() + constraint.dy * scale,
    );
    let mut r2 = style.rotation();

    if constraint.perimeter {
        if r1 != 0.0 {
            let (cos, sin) = quarter_turn(r1);
            point = rotate_point(point, cos, sin, center);
        }
        point = view.perimeter_point(state, point, false);
    } else {
        r2 += r1;
        if state.is_vertex() {
            let (flip_h, flip_v) = direction.swap_flips(style.flip_h(), style.flip_v());
            point = mirror(point, center, flip_h, flip_v);
        }
    }

    if r2 != 0.0 {
        point = rotate_point_degrees(point, r2, center);
    }
    if round {
        point = Point::new(point.x.round(), point.y.round());
    }
    Some(point)
}

/// Read the constraint stored in an edge style for one end.
///
/// Offsets and the perimeter flag are read even when no point is stored.
pub fn constraint_from_style(style: &CellStyle, is_source: bool) -> ConnectionConstraint {
    let anchor = style.anchor(is_source);
    let point = match (anchor.x, anchor.y) {
        (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(Point::new(x, y)),
        _ => None,
    };
    ConnectionConstraint {
        point,
        perimeter: anchor.perimeter.unwrap_or(true),
        port_id: None,
        dx: finite_or_zero(anchor.dx),
        dy: finite_or_zero(anchor.dy),
    }
}

impl Graph {
    /// Constraint describing `point` on `terminal`, if it has a state.
    pub fn get_outline_constraint(&self, point: Point, terminal: CellId) -> Option<ConnectionConstraint> {
        let state = self.view.state(terminal)?;
        outline_constraint(&self.view, point, state)
    }

    /// Predefined anchors of a stencil-backed terminal.
    pub fn get_all_connection_constraints(&self, terminal: CellId) -> Option<&[ConnectionConstraint]> {
        let name = self.model.style(terminal)?.shape.as_deref()?;
        self.stencils.get(name).map(|s| s.constraints.as_slice())
    }

    /// Constraint stored on `edge` for one end.
    pub fn get_connection_constraint(&self, edge: CellId, is_source: bool) -> ConnectionConstraint {
        self.model
            .style(edge)
            .map(|style| constraint_from_style(style, is_source))
            .unwrap_or_default()
    }

    /// Store (or with `None`/no point, clear) the constraint of one end.
    pub fn set_connection_constraint(
        &mut self,
        edge: CellId,
        is_source: bool,
        constraint: Option<&ConnectionConstraint>,
    ) -> GraphResult<()> {
        let anchor = match constraint {
            Some(ConnectionConstraint {
                point: Some(point),
                perimeter,
                dx,
                dy,
                ..
            }) => TerminalAnchor {
                x: Some(point.x),
                y: Some(point.y),
                dx: Some(*dx),
                dy: Some(*dy),
                perimeter: if *perimeter { None } else { Some(false) },
            },
            _ => TerminalAnchor::default(),
        };
        self.batch_update(|graph| {
            graph
                .model
                .update_style(edge, |style| style.set_anchor(is_source, anchor))
        })
    }

    /// Resolve a constraint on `vertex`.
    pub fn get_connection_point(&self, vertex: CellId, constraint: &ConnectionConstraint, round: bool) -> Option<Point> {
        let state = self.view.state(vertex)?;
        connection_point(&self.view, state, constraint, round)
    }

    /// Connect one end of `edge` to `terminal` (or disconnect with `None`).
    pub fn connect_cell(
        &mut self,
        edge: CellId,
        terminal: Option<CellId>,
        is_source: bool,
        constraint: Option<&ConnectionConstraint>,
    ) -> GraphResult<CellId> {
        self.model.require_edge(edge)?;
        self.batch_update(|graph| {
            let previous = graph.model.terminal(edge, is_source);
            graph.cell_connected(edge, terminal, is_source, constraint)?;
            graph.events.emit(&GraphEvent::ConnectCell {
                edge,
                terminal,
                is_source,
                previous,
            });
            Ok(edge)
        })
    }

    /// Apply a new connection in one transaction: constraint, port, terminal
    /// link, waypoint reset, then the `CellConnected` notification.
    pub fn cell_connected(
        &mut self,
        edge: CellId,
        terminal: Option<CellId>,
        is_source: bool,
        constraint: Option<&ConnectionConstraint>,
    ) -> GraphResult<()> {
        self.model.require_edge(edge)?;
        self.batch_update(|graph| {
            let previous = graph.model.terminal(edge, is_source);
            graph.set_connection_constraint(edge, is_source, constraint)?;

            let mut terminal = terminal;
            if graph.config.ports_enabled {
                let mut port = None;
                if let Some(t) = terminal {
                    if graph.is_port(t) {
                        port = Some(t);
                        terminal = graph.terminal_for_port(t);
                    }
                }
                graph.model.update_style(edge, |style| style.set_port(is_source, port))?;
            }

            graph.model.set_terminal(edge, terminal, is_source)?;

            if graph.config.reset_edges_on_connect {
                graph.reset_edge(edge)?;
            }

            log::debug!("connected {edge} ({}) to {terminal:?}", if is_source { "source" } else { "target" });
            graph.events.emit(&GraphEvent::CellConnected {
                edge,
                terminal,
                is_source,
                previous,
            });
            Ok(())
        })
    }

    /// Disconnect the edges in `cells` from terminals outside the set, pinning
    /// each freed end where it is currently drawn.
    pub fn disconnect_graph(&mut self, cells: &[CellId]) -> GraphResult<()> {
        let set: HashSet<CellId> = cells.iter().copied().collect();
        self.batch_update(|graph| {
            let scale = graph.view.scale();
            let translate = graph.view.translate();

            for &cell in cells {
                if !graph.model.is_edge(cell) {
                    continue;
                }
                let Some(mut geometry) = graph.model.geometry(cell).cloned() else {
                    continue;
                };
                let Some(state) = graph.view.state(cell) else {
                    continue;
                };
                let ends = [
                    (true, state.absolute_points.first().copied()),
                    (false, state.absolute_points.last().copied()),
                ];
                let origin = graph
                    .model
                    .parent(cell)
                    .map(|p| graph.model.origin(p))
                    .unwrap_or(Point::ZERO);

                let mut freed = Vec::new();
                for (is_source, rendered) in ends {
                    let Some(terminal) = graph.model.terminal(cell, is_source) else {
                        continue;
                    };
                    if !graph.is_cell_disconnectable(cell) {
                        continue;
                    }
                    let inside = std::iter::once(terminal)
                        .chain(graph.model.ancestors(terminal))
                        .any(|c| set.contains(&c));
                    let Some(rendered) = rendered else {
                        continue;
                    };
                    if !inside {
                        let fixed = Point::new(
                            rendered.x / scale - translate.x - origin.x,
                            rendered.y / scale - translate.y - origin.y,
                        );
                        geometry.set_terminal_point(is_source, Some(fixed));
                        freed.push(is_source);
                    }
                }

                for is_source in freed {
                    graph.model.set_terminal(cell, None, is_source)?;
                }
                graph.model.set_geometry(cell, geometry)?;
            }
            Ok(())
        })
    }

    /// Whether `cell` is kept inside its parent's bounds.
    pub fn is_constrain_child(&self, cell: CellId) -> bool {
        self.config.constrain_children
            && self
                .model
                .parent(cell)
                .is_some_and(|parent| !self.model.is_edge(parent))
    }

    /// Shrink and move `cell` so it fits inside its parent vertex.
    pub fn constrain_child(&mut self, cell: CellId) -> GraphResult<()> {
        if !self.is_constrain_child(cell) {
            return Ok(());
        }
        let Some(parent) = self.model.parent(cell).filter(|&p| self.model.is_vertex(p)) else {
            return Ok(());
        };
        let (Some(parent_geo), Some(geo)) = (self.model.geometry(parent), self.model.geometry(cell)) else {
            return Ok(());
        };

        let area = Rect::from_origin_size(Point::ZERO, parent_geo.bounds.size());
        let width = geo.bounds.width().min(area.width());
        let height = geo.bounds.height().min(area.height());
        let x = geo.bounds.x0.clamp(0.0, area.width() - width);
        let y = geo.bounds.y0.clamp(0.0, area.height() - height);

        let mut geometry = geo.clone();
        geometry.bounds = Rect::new(x, y, x + width, y + height);
        self.batch_update(|graph| graph.model.set_geometry(cell, geometry))
    }

    /// Drop the waypoints of `edge`.
    pub fn reset_edge(&mut self, edge: CellId) -> GraphResult<()> {
        let Some(geo) = self.model.geometry(edge) else {
            return Ok(());
        };
        if geo.points.is_empty() {
            return Ok(());
        }
        let mut geometry = geo.clone();
        geometry.points.clear();
        self.batch_update(|graph| graph.model.set_geometry(edge, geometry))
    }

    /// Rounded view coordinate of the stored constraint of one end, resolved
    /// on the terminal (or its port) as currently drawn.
    pub fn resolve_connection_point(&self, edge: CellId, is_source: bool) -> Option<Point> {
        let style = self.model.style(edge)?;
        let terminal = style
            .port(is_source)
            .filter(|&port| self.view.state(port).is_some())
            .or_else(|| self.model.terminal(edge, is_source))?;
        let constraint = constraint_from_style(style, is_source);
        self.get_connection_point(terminal, &constraint, true)
    }
}
