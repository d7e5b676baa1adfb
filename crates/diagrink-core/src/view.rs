//! Resolved view of a model: scale, translate and per-cell states.

use crate::connection::{connection_point, constraint_from_style};
use crate::events::EventBus;
use crate::geometry::{mirror, rotate_point_degrees, to_view};
use crate::model::{CellId, CellKind, GraphModel};
use crate::perimeter::PerimeterKind;
use crate::style::CellStyle;
use indexmap::IndexMap;
use kurbo::{Point, Rect, Size, Vec2};

/// Snapshot of a cell as drawn in one view.
#[derive(Debug, Clone, PartialEq)]
pub struct CellState {
    pub cell: CellId,
    pub kind: CellKind,
    /// Unscaled absolute origin. For edges, the origin of the parent.
    pub origin: Point,
    /// Bounds in view coordinates.
    pub bounds: Rect,
    /// Resolved edge points in view coordinates, ends included.
    pub absolute_points: Vec<Point>,
    pub style: CellStyle,
}

impl CellState {
    pub fn center(&self) -> Point {
        self.bounds.center()
    }

    pub fn is_edge(&self) -> bool {
        self.kind == CellKind::Edge
    }

    pub fn is_vertex(&self) -> bool {
        matches!(self.kind, CellKind::Vertex | CellKind::Port)
    }

    /// Visual rotation in degrees, including the direction's quarter turn.
    pub fn shape_rotation(&self) -> f64 {
        self.style.rotation() + self.style.direction().rotation()
    }
}

/// Notifications from a view. Emitted only when a value actually changes.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Scale { scale: f64, previous: f64 },
    Translate { translate: Vec2, previous: Vec2 },
    ScaleAndTranslate { scale: f64, translate: Vec2 },
    Root { root: Option<CellId>, previous: Option<CellId> },
}

/// Scale, translate and cell states of one rendering of a model.
#[derive(Debug)]
pub struct GraphView {
    scale: f64,
    translate: Vec2,
    current_root: Option<CellId>,
    states: IndexMap<CellId, CellState>,
    graph_bounds: Rect,
    pub events: EventBus<ViewEvent>,
}

impl Default for GraphView {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphView {
    pub fn new() -> Self {
        Self {
            scale: 1.0,
            translate: Vec2::ZERO,
            current_root: None,
            states: IndexMap::new(),
            graph_bounds: Rect::ZERO,
            events: EventBus::new(),
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn translate(&self) -> Vec2 {
        self.translate
    }

    /// Root of the displayed subtree; `None` shows the whole model.
    pub fn current_root(&self) -> Option<CellId> {
        self.current_root
    }

    pub fn set_scale(&mut self, scale: f64) {
        if scale != self.scale {
            let previous = self.scale;
            self.scale = scale;
            self.events.emit(&ViewEvent::Scale { scale, previous });
        }
    }

    pub fn set_translate(&mut self, translate: Vec2) {
        if translate != self.translate {
            let previous = self.translate;
            self.translate = translate;
            self.events.emit(&ViewEvent::Translate { translate, previous });
        }
    }

    pub fn scale_and_translate(&mut self, scale: f64, translate: Vec2) {
        if scale != self.scale || translate != self.translate {
            self.scale = scale;
            self.translate = translate;
            self.events.emit(&ViewEvent::ScaleAndTranslate { scale, translate });
        }
    }

    pub fn set_current_root(&mut self, root: Option<CellId>) {
        if root != self.current_root {
            let previous = self.current_root;
            self.current_root = root;
            self.events.emit(&ViewEvent::Root { root, previous });
        }
    }

    pub fn state(&self, cell: CellId) -> Option<&CellState> {
        self.states.get(&cell)
    }

    pub fn states(&self) -> impl Iterator<Item = &CellState> {
        self.states.values()
    }

    /// Union of all state bounds, from the last [`validate`](Self::validate).
    pub fn graph_bounds(&self) -> Rect {
        self.graph_bounds
    }

    /// Map an unscaled absolute point into view coordinates.
    pub fn to_view(&self, point: Point) -> Point {
        to_view(point, self.translate, self.scale)
    }

    /// Drop all states.
    pub fn clear(&mut self) {
        self.states.clear();
        self.graph_bounds = Rect::ZERO;
    }

    /// Recompute every state beneath the current root.
    pub fn validate(&mut self, model: &GraphModel) {
        self.states.clear();
        let root = self
            .current_root
            .filter(|&r| model.contains(r))
            .unwrap_or_else(|| model.root());

        let mut edges = Vec::new();
        for &child in model.children(root) {
            self.validate_cell(model, child, &mut edges);
        }
        for edge in edges {
            if let Some(state) = self.edge_state(model, edge) {
                self.states.insert(edge, state);
            }
        }

        self.graph_bounds = self
            .states
            .values()
            .map(|s| s.bounds)
            .reduce(|a, b| a.union(b))
            .unwrap_or_else(|| Rect::from_origin_size(self.to_view(Point::ZERO), Size::ZERO));
        log::trace!("validated {} state(s), bounds {:?}", self.states.len(), self.graph_bounds);
    }

    fn validate_cell(&mut self, model: &GraphModel, cell: CellId, edges: &mut Vec<CellId>) {
        let Some(c) = model.cell(cell) else {
            return;
        };
        match c.kind {
            CellKind::Vertex | CellKind::Port => {
                if let Some(geo) = &c.geometry {
                    let origin = model.origin(cell);
                    let top_left = self.to_view(origin);
                    let size = geo.bounds.size() * self.scale;
                    self.states.insert(
                        cell,
                        CellState {
                            cell,
                            kind: c.kind,
                            origin,
                            bounds: Rect::from_origin_size(top_left, size),
                            absolute_points: Vec::new(),
                            style: c.style.clone(),
                        },
                    );
                }
            }
            CellKind::Edge => edges.push(cell),
            CellKind::Root | CellKind::Layer => {}
        }
        for &child in &c.children {
            self.validate_cell(model, child, edges);
        }
    }

    /// State an edge end is drawn against: the port named in the edge style,
    /// else the terminal itself.
    fn terminal_state(&self, style: &CellStyle, terminal: Option<CellId>, is_source: bool) -> Option<&CellState> {
        let terminal = terminal?;
        style
            .port(is_source)
            .and_then(|port| self.states.get(&port))
            .or_else(|| self.states.get(&terminal))
    }

    fn edge_state(&self, model: &GraphModel, edge: CellId) -> Option<CellState> {
        let cell = model.cell(edge)?;
        let geo = cell.geometry.clone().unwrap_or_default();
        let origin = cell.parent.map(|p| model.origin(p)).unwrap_or(Point::ZERO);
        let waypoints: Vec<Point> = geo
            .points
            .iter()
            .map(|p| self.to_view(*p + origin.to_vec2()))
            .collect();

        let source = self.terminal_state(&cell.style, cell.source, true);
        let target = self.terminal_state(&cell.style, cell.target, false);

        let fixed_end = |terminal: Option<&CellState>, is_source: bool| match terminal {
            Some(state) => {
                let constraint = constraint_from_style(&cell.style, is_source);
                connection_point(self, state, &constraint, false)
            }
            None => geo
                .terminal_point(is_source)
                .map(|p| self.to_view(p + origin.to_vec2())),
        };
        let source_fixed = fixed_end(source, true);
        let target_fixed = fixed_end(target, false);

        let target_end = target_fixed.or_else(|| {
            let state = target?;
            let next = waypoints
                .last()
                .copied()
                .or(source_fixed)
                .or_else(|| source.map(CellState::center))
                .unwrap_or_else(|| state.center());
            Some(self.floating_terminal_point(state, next))
        });
        let source_end = source_fixed.or_else(|| {
            let state = source?;
            let next = waypoints
                .first()
                .copied()
                .or(target_end)
                .unwrap_or_else(|| state.center());
            Some(self.floating_terminal_point(state, next))
        });

        let (Some(start), Some(end)) = (source_end, target_end) else {
            log::trace!("edge {edge} has an unresolved end");
            return None;
        };
        let mut points = Vec::with_capacity(waypoints.len() + 2);
        points.push(start);
        points.extend(waypoints);
        points.push(end);

        let bounds = points
            .iter()
            .skip(1)
            .fold(Rect::from_points(start, start), |acc, p| acc.union_pt(*p));

        Some(CellState {
            cell: edge,
            kind: CellKind::Edge,
            origin,
            bounds,
            absolute_points: points,
            style: cell.style.clone(),
        })
    }

    /// Point where a floating end meets a possibly rotated terminal.
    fn floating_terminal_point(&self, state: &CellState, next: Point) -> Point {
        let rotation = state.style.rotation();
        let center = state.center();
        let next = rotate_point_degrees(next, -rotation, center);
        let point = self.perimeter_point(state, next, false);
        rotate_point_degrees(point, rotation, center)
    }

    /// Bounds used for perimeter math: the state bounds grown by the style's
    /// perimeter spacing.
    pub fn perimeter_bounds(&self, state: &CellState) -> Rect {
        let border = state.style.perimeter_spacing() * self.scale;
        state.bounds.inflate(border, border)
    }

    /// Project `next` onto the terminal's outline, honouring flips.
    ///
    /// Falls back to the center when the terminal has no perimeter or its
    /// bounds have no area.
    pub fn perimeter_point(&self, state: &CellState, next: Point, orthogonal: bool) -> Point {
        let kind = state.style.perimeter_kind();
        let bounds = self.perimeter_bounds(state);
        if kind == PerimeterKind::None || (bounds.width() <= 0.0 && bounds.height() <= 0.0) {
            return state.center();
        }

        let (flip_h, flip_v) = if state.is_vertex() {
            (state.style.flip_h(), state.style.flip_v())
        } else {
            (false, false)
        };
        let center = bounds.center();
        let next = mirror(next, center, flip_h, flip_v);
        match kind.project(bounds, next, orthogonal) {
            Some(point) => mirror(point, center, flip_h, flip_v),
            None => state.center(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Geometry;
    use std::cell::RefCell;
    use std::rc::Rc;

    const EPS: f64 = 1e-9;

    fn two_boxes() -> (GraphModel, CellId, CellId, CellId) {
        let mut model = GraphModel::new();
        let layer = model.default_parent();
        let a = model
            .add_vertex(layer, Rect::new(0.0, 0.0, 100.0, 50.0), CellStyle::default())
            .unwrap();
        let b = model
            .add_vertex(layer, Rect::new(300.0, 0.0, 400.0, 50.0), CellStyle::default())
            .unwrap();
        let e = model.add_edge(layer, Some(a), Some(b), CellStyle::default()).unwrap();
        (model, a, b, e)
    }

    #[test]
    fn test_vertex_state_is_scaled_and_translated() {
        let (model, a, _, _) = two_boxes();
        let mut view = GraphView::new();
        view.scale_and_translate(2.0, Vec2::new(10.0, 5.0));
        view.validate(&model);
        let state = view.state(a).unwrap();
        assert_eq!(state.bounds, Rect::new(20.0, 10.0, 220.0, 110.0));
        assert_eq!(state.origin, Point::ZERO);
    }

    #[test]
    fn test_floating_edge_meets_both_perimeters() {
        let (model, _, _, e) = two_boxes();
        let mut view = GraphView::new();
        view.validate(&model);
        let state = view.state(e).unwrap();
        assert_eq!(state.absolute_points, vec![Point::new(100.0, 25.0), Point::new(300.0, 25.0)]);
    }

    #[test]
    fn test_fixed_constraint_end() {
        let (mut model, _, _, e) = two_boxes();
        model
            .update_style(e, |s| {
                s.exit_x = Some(0.5);
                s.exit_y = Some(1.0);
                s.exit_perimeter = Some(false);
            })
            .unwrap();
        let mut view = GraphView::new();
        view.validate(&model);
        let state = view.state(e).unwrap();
        assert_eq!(state.absolute_points[0], Point::new(50.0, 50.0));
    }

    #[test]
    fn test_unconnected_end_uses_terminal_point() {
        let (mut model, _, _, e) = two_boxes();
        model.set_terminal(e, None, false).unwrap();
        let mut geo = model.geometry(e).cloned().unwrap();
        geo.target_point = Some(Point::new(200.0, 200.0));
        model.set_geometry(e, geo).unwrap();

        let mut view = GraphView::new();
        view.validate(&model);
        let points = &view.state(e).unwrap().absolute_points;
        assert_eq!(points.last(), Some(&Point::new(200.0, 200.0)));
    }

    #[test]
    fn test_edge_without_ends_has_no_state() {
        let mut model = GraphModel::new();
        let layer = model.default_parent();
        let e = model.add_edge(layer, None, None, CellStyle::default()).unwrap();
        let mut view = GraphView::new();
        view.validate(&model);
        assert!(view.state(e).is_none());
    }

    #[test]
    fn test_waypoints_follow_parent_origin() {
        let mut model = GraphModel::new();
        let layer = model.default_parent();
        let group = model
            .add_vertex(layer, Rect::new(100.0, 100.0, 300.0, 300.0), CellStyle::default())
            .unwrap();
        let e = model.add_edge(group, None, None, CellStyle::default()).unwrap();
        model
            .set_geometry(
                e,
                Geometry {
                    points: vec![Point::new(50.0, 50.0)],
                    source_point: Some(Point::new(0.0, 0.0)),
                    target_point: Some(Point::new(100.0, 0.0)),
                    ..Default::default()
                },
            )
            .unwrap();
        let mut view = GraphView::new();
        view.validate(&model);
        let state = view.state(e).unwrap();
        assert_eq!(state.absolute_points[1], Point::new(150.0, 150.0));
        assert_eq!(state.bounds, Rect::new(100.0, 100.0, 200.0, 150.0));
    }

    #[test]
    fn test_graph_bounds() {
        let (model, _, _, _) = two_boxes();
        let mut view = GraphView::new();
        view.validate(&model);
        assert_eq!(view.graph_bounds(), Rect::new(0.0, 0.0, 400.0, 50.0));

        let empty = GraphModel::new();
        view.set_translate(Vec2::new(5.0, 7.0));
        view.validate(&empty);
        assert_eq!(view.graph_bounds(), Rect::new(5.0, 7.0, 5.0, 7.0));
    }

    #[test]
    fn test_current_root_limits_states() {
        let mut model = GraphModel::new();
        let layer = model.default_parent();
        let group = model
            .add_vertex(layer, Rect::new(0.0, 0.0, 100.0, 100.0), CellStyle::default())
            .unwrap();
        let inner = model
            .add_vertex(group, Rect::new(10.0, 10.0, 20.0, 20.0), CellStyle::default())
            .unwrap();
        let other = model
            .add_vertex(layer, Rect::new(200.0, 0.0, 210.0, 10.0), CellStyle::default())
            .unwrap();

        let mut view = GraphView::new();
        view.set_current_root(Some(group));
        view.validate(&model);
        assert!(view.state(inner).is_some());
        assert!(view.state(other).is_none());
    }

    #[test]
    fn test_perimeter_point_respects_flip_and_spacing() {
        let mut model = GraphModel::new();
        let layer = model.default_parent();
        let v = model
            .add_vertex(
                layer,
                Rect::new(0.0, 0.0, 100.0, 50.0),
                CellStyle {
                    perimeter_spacing: Some(5.0),
                    ..Default::default()
                },
            )
            .unwrap();
        let mut view = GraphView::new();
        view.validate(&model);
        let state = view.state(v).unwrap();
        let p = view.perimeter_point(state, Point::new(500.0, 25.0), false);
        assert!((p.x - 105.0).abs() < EPS);
        assert!((p.y - 25.0).abs() < EPS);
    }

    #[test]
    fn test_no_perimeter_returns_center() {
        let mut model = GraphModel::new();
        let layer = model.default_parent();
        let v = model
            .add_vertex(
                layer,
                Rect::new(0.0, 0.0, 100.0, 50.0),
                CellStyle {
                    perimeter: Some(PerimeterKind::None),
                    ..Default::default()
                },
            )
            .unwrap();
        let mut view = GraphView::new();
        view.validate(&model);
        let state = view.state(v).unwrap();
        assert_eq!(view.perimeter_point(state, Point::new(500.0, 0.0), false), Point::new(50.0, 25.0));
    }

    #[test]
    fn test_events_only_on_change() {
        let mut view = GraphView::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        view.events.subscribe(move |e: &ViewEvent| sink.borrow_mut().push(e.clone()));

        view.set_scale(1.0);
        view.set_scale(2.0);
        view.set_translate(Vec2::ZERO);
        view.set_current_root(None);
        assert_eq!(*seen.borrow(), vec![ViewEvent::Scale { scale: 2.0, previous: 1.0 }]);
    }
}
