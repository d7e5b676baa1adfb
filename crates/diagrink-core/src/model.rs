//! Graph model: the cell tree, terminals, geometry and style, with nestable
//! transactions and reversible change records.

use crate::error::{GraphError, GraphResult};
use crate::events::EventBus;
use crate::style::CellStyle;
use crate::undo::{Reversible, UndoableEdit};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;
use uuid::Uuid;

/// Unique identifier for cells.
pub type CellId = Uuid;

/// What a cell is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    Root,
    Layer,
    Vertex,
    Edge,
    /// A connectable child of a vertex.
    Port,
}

/// Geometry of a cell, relative to its parent's origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Vertex bounds. Unused for edges.
    pub bounds: Rect,
    /// Edge waypoints.
    #[serde(default)]
    pub points: Vec<Point>,
    /// Fixed source end for an unconnected edge.
    pub source_point: Option<Point>,
    /// Fixed target end for an unconnected edge.
    pub target_point: Option<Point>,
}

impl Geometry {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            ..Default::default()
        }
    }

    pub fn terminal_point(&self, is_source: bool) -> Option<Point> {
        if is_source {
            self.source_point
        } else {
            self.target_point
        }
    }

    pub fn set_terminal_point(&mut self, is_source: bool, point: Option<Point>) {
        if is_source {
            self.source_point = point;
        } else {
            self.target_point = point;
        }
    }
}

/// A node of the cell tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub id: CellId,
    pub kind: CellKind,
    pub parent: Option<CellId>,
    pub children: Vec<CellId>,
    pub source: Option<CellId>,
    pub target: Option<CellId>,
    pub geometry: Option<Geometry>,
    pub style: CellStyle,
}

impl Cell {
    fn new(kind: CellKind, geometry: Option<Geometry>, style: CellStyle) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            parent: None,
            children: Vec::new(),
            source: None,
            target: None,
            geometry,
            style,
        }
    }

    pub fn terminal(&self, is_source: bool) -> Option<CellId> {
        if is_source { self.source } else { self.target }
    }
}

/// A reversible mutation of the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelChange {
    /// Cell attached to, moved between or detached from parents.
    Child {
        cell: CellId,
        previous: Option<CellId>,
        parent: Option<CellId>,
    },
    Terminal {
        edge: CellId,
        is_source: bool,
        previous: Option<CellId>,
        terminal: Option<CellId>,
    },
    Geometry {
        cell: CellId,
        previous: Option<Geometry>,
        geometry: Option<Geometry>,
    },
    Style {
        cell: CellId,
        previous: CellStyle,
        style: CellStyle,
    },
}

impl Reversible<GraphModel> for ModelChange {
    fn apply(&self, model: &mut GraphModel) {
        match self {
            ModelChange::Child { cell, parent, .. } => model.set_parent_raw(*cell, *parent),
            ModelChange::Terminal {
                edge,
                is_source,
                terminal,
                ..
            } => model.set_terminal_raw(*edge, *terminal, *is_source),
            ModelChange::Geometry { cell, geometry, .. } => {
                model.set_geometry_raw(*cell, geometry.clone())
            }
            ModelChange::Style { cell, style, .. } => model.set_style_raw(*cell, style.clone()),
        }
    }

    fn revert(&self, model: &mut GraphModel) {
        match self {
            ModelChange::Child { cell, previous, .. } => model.set_parent_raw(*cell, *previous),
            ModelChange::Terminal {
                edge,
                is_source,
                previous,
                ..
            } => model.set_terminal_raw(*edge, *previous, *is_source),
            ModelChange::Geometry { cell, previous, .. } => {
                model.set_geometry_raw(*cell, previous.clone())
            }
            ModelChange::Style { cell, previous, .. } => {
                model.set_style_raw(*cell, previous.clone())
            }
        }
    }
}

/// Notifications from the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// Emitted once when the outermost transaction that recorded changes closes.
    Change { edit: UndoableEdit<ModelChange> },
}

/// Scoped transaction marker.
///
/// The depth counter is shared with the model; dropping the guard closes the
/// scope on every exit path, unwinding included.
#[derive(Debug)]
pub struct UpdateGuard {
    depth: Rc<std::cell::Cell<usize>>,
}

impl UpdateGuard {
    fn enter(depth: &Rc<std::cell::Cell<usize>>) -> Self {
        depth.set(depth.get() + 1);
        Self {
            depth: Rc::clone(depth),
        }
    }

    /// True when no other transaction encloses this one.
    pub fn is_outermost(&self) -> bool {
        self.depth.get() == 1
    }
}

impl Drop for UpdateGuard {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// The cell tree and its connections.
///
/// The model knows nothing about views. When it is owned by a
/// [`Graph`](crate::Graph), write through [`Graph::batch_update`](crate::Graph::batch_update)
/// (or call [`Graph::validate`](crate::Graph::validate) afterwards) so the
/// primary view is rebuilt before anyone reads its states or bounds.
#[derive(Debug)]
pub struct GraphModel {
    cells: HashMap<CellId, Cell>,
    root: CellId,
    default_parent: CellId,
    depth: Rc<std::cell::Cell<usize>>,
    pending: UndoableEdit<ModelChange>,
    /// Model notifications.
    pub events: EventBus<ModelEvent>,
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphModel {
    /// Create a model holding a root and one layer.
    pub fn new() -> Self {
        let root = Cell::new(CellKind::Root, None, CellStyle::default());
        let mut layer = Cell::new(CellKind::Layer, None, CellStyle::default());
        layer.parent = Some(root.id);

        let mut root = root;
        root.children.push(layer.id);

        let (root_id, layer_id) = (root.id, layer.id);
        let mut cells = HashMap::new();
        cells.insert(root_id, root);
        cells.insert(layer_id, layer);

        Self {
            cells,
            root: root_id,
            default_parent: layer_id,
            depth: Rc::new(std::cell::Cell::new(0)),
            pending: UndoableEdit::new(true),
            events: EventBus::new(),
        }
    }

    pub fn root(&self) -> CellId {
        self.root
    }

    /// The first layer; new top-level cells go here.
    pub fn default_parent(&self) -> CellId {
        self.default_parent
    }

    // --- transactions ---

    /// Open a transaction scope.
    pub fn begin_update(&self) -> UpdateGuard {
        UpdateGuard::enter(&self.depth)
    }

    /// Current nesting depth.
    pub fn update_level(&self) -> usize {
        self.depth.get()
    }

    pub fn is_updating(&self) -> bool {
        self.depth.get() > 0
    }

    /// Run `f` inside a transaction. When the outermost scope closes, the
    /// recorded changes are announced as a single [`ModelEvent::Change`].
    pub fn batch_update<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let guard = self.begin_update();
        let result = f(self);
        let outermost = guard.is_outermost();
        drop(guard);
        if outermost {
            self.flush_changes();
        }
        result
    }

    /// Announce pending changes. Returns true if there were any.
    pub(crate) fn flush_changes(&mut self) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        let edit = std::mem::replace(&mut self.pending, UndoableEdit::new(true));
        log::debug!("model change: {} change(s)", edit.changes().len());
        self.events.emit(&ModelEvent::Change { edit });
        true
    }

    fn execute(&mut self, change: ModelChange) {
        self.batch_update(|model| {
            change.apply(model);
            model.pending.add(change);
        });
    }

    // --- construction ---

    fn insert(&mut self, parent: CellId, cell: Cell) -> GraphResult<CellId> {
        let parent_kind = self.kind(parent).ok_or(GraphError::UnknownCell(parent))?;
        let allowed = match cell.kind {
            CellKind::Layer => parent_kind == CellKind::Root,
            CellKind::Port => parent_kind == CellKind::Vertex,
            _ => parent_kind != CellKind::Root,
        };
        if !allowed {
            return Err(GraphError::InvalidParent(parent));
        }
        let id = cell.id;
        self.cells.insert(id, cell);
        self.execute(ModelChange::Child {
            cell: id,
            previous: None,
            parent: Some(parent),
        });
        Ok(id)
    }

    /// Add a layer under the root.
    pub fn add_layer(&mut self) -> CellId {
        let root = self.root;
        let layer = Cell::new(CellKind::Layer, None, CellStyle::default());
        // The root always accepts layers.
        self.insert(root, layer).unwrap_or(root)
    }

    /// Add a vertex with bounds relative to its parent.
    pub fn add_vertex(&mut self, parent: CellId, bounds: Rect, style: CellStyle) -> GraphResult<CellId> {
        self.insert(parent, Cell::new(CellKind::Vertex, Some(Geometry::new(bounds)), style))
    }

    /// Add a port to a vertex, with bounds relative to the vertex.
    pub fn add_port(&mut self, vertex: CellId, bounds: Rect, style: CellStyle) -> GraphResult<CellId> {
        self.insert(vertex, Cell::new(CellKind::Port, Some(Geometry::new(bounds)), style))
    }

    /// Add an edge and connect its ends.
    pub fn add_edge(
        &mut self,
        parent: CellId,
        source: Option<CellId>,
        target: Option<CellId>,
        style: CellStyle,
    ) -> GraphResult<CellId> {
        for terminal in [source, target].into_iter().flatten() {
            if !self.contains(terminal) {
                return Err(GraphError::UnknownCell(terminal));
            }
        }
        self.batch_update(|model| {
            let id = model.insert(parent, Cell::new(CellKind::Edge, Some(Geometry::default()), style))?;
            model.set_terminal(id, source, true)?;
            model.set_terminal(id, target, false)?;
            Ok(id)
        })
    }

    /// Detach a cell (and with it its subtree) from the tree.
    pub fn remove_cell(&mut self, cell: CellId) -> GraphResult<()> {
        let previous = self.parent(cell);
        if !self.contains(cell) {
            return Err(GraphError::UnknownCell(cell));
        }
        if cell == self.root || previous.is_none() {
            return Ok(());
        }
        self.execute(ModelChange::Child {
            cell,
            previous,
            parent: None,
        });
        Ok(())
    }

    // --- queries ---

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(&id)
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.cells.contains_key(&id)
    }

    pub fn kind(&self, id: CellId) -> Option<CellKind> {
        self.cells.get(&id).map(|c| c.kind)
    }

    pub fn is_edge(&self, id: CellId) -> bool {
        self.kind(id) == Some(CellKind::Edge)
    }

    /// Vertices and ports.
    pub fn is_vertex(&self, id: CellId) -> bool {
        matches!(self.kind(id), Some(CellKind::Vertex | CellKind::Port))
    }

    pub fn is_port(&self, id: CellId) -> bool {
        self.kind(id) == Some(CellKind::Port)
    }

    pub fn parent(&self, id: CellId) -> Option<CellId> {
        self.cells.get(&id).and_then(|c| c.parent)
    }

    pub fn children(&self, id: CellId) -> &[CellId] {
        self.cells.get(&id).map(|c| c.children.as_slice()).unwrap_or(&[])
    }

    /// Parent chain, nearest first, excluding the cell itself.
    pub fn ancestors(&self, id: CellId) -> impl Iterator<Item = CellId> + '_ {
        std::iter::successors(self.parent(id), move |&c| self.parent(c))
    }

    /// Whether `ancestor` is `cell` or one of its ancestors.
    pub fn is_ancestor(&self, ancestor: CellId, cell: CellId) -> bool {
        cell == ancestor || self.ancestors(cell).any(|c| c == ancestor)
    }

    pub fn terminal(&self, edge: CellId, is_source: bool) -> Option<CellId> {
        self.cells.get(&edge).and_then(|c| c.terminal(is_source))
    }

    pub fn geometry(&self, id: CellId) -> Option<&Geometry> {
        self.cells.get(&id).and_then(|c| c.geometry.as_ref())
    }

    pub fn style(&self, id: CellId) -> Option<&CellStyle> {
        self.cells.get(&id).map(|c| &c.style)
    }

    /// Unscaled absolute origin of a cell's coordinate space, i.e. the sum of
    /// the positions of its vertex ancestors.
    pub fn origin(&self, id: CellId) -> Point {
        let mut origin = Point::ZERO;
        for ancestor in std::iter::once(id).chain(self.ancestors(id)) {
            if !self.is_vertex(ancestor) {
                continue;
            }
            if let Some(geo) = self.geometry(ancestor) {
                origin.x += geo.bounds.x0;
                origin.y += geo.bounds.y0;
            }
        }
        origin
    }

    pub fn require_edge(&self, id: CellId) -> GraphResult<()> {
        match self.kind(id) {
            Some(CellKind::Edge) => Ok(()),
            Some(_) => Err(GraphError::NotAnEdge(id)),
            None => Err(GraphError::UnknownCell(id)),
        }
    }

    // --- mutators ---

    /// Connect or disconnect one end of an edge.
    pub fn set_terminal(&mut self, edge: CellId, terminal: Option<CellId>, is_source: bool) -> GraphResult<()> {
        self.require_edge(edge)?;
        if let Some(t) = terminal {
            if !self.contains(t) {
                return Err(GraphError::UnknownCell(t));
            }
        }
        let previous = self.terminal(edge, is_source);
        if previous != terminal {
            self.execute(ModelChange::Terminal {
                edge,
                is_source,
                previous,
                terminal,
            });
        }
        Ok(())
    }

    pub fn set_geometry(&mut self, cell: CellId, geometry: Geometry) -> GraphResult<()> {
        let previous = self
            .cells
            .get(&cell)
            .ok_or(GraphError::UnknownCell(cell))?
            .geometry
            .clone();
        if previous.as_ref() != Some(&geometry) {
            self.execute(ModelChange::Geometry {
                cell,
                previous,
                geometry: Some(geometry),
            });
        }
        Ok(())
    }

    pub fn set_style(&mut self, cell: CellId, style: CellStyle) -> GraphResult<()> {
        let previous = self
            .cells
            .get(&cell)
            .ok_or(GraphError::UnknownCell(cell))?
            .style
            .clone();
        if previous != style {
            self.execute(ModelChange::Style { cell, previous, style });
        }
        Ok(())
    }

    /// Edit a copy of the style and store it if anything changed.
    pub fn update_style(&mut self, cell: CellId, f: impl FnOnce(&mut CellStyle)) -> GraphResult<()> {
        let mut style = self.style(cell).ok_or(GraphError::UnknownCell(cell))?.clone();
        f(&mut style);
        self.set_style(cell, style)
    }

    // --- raw writes used by ModelChange ---

    fn set_parent_raw(&mut self, cell: CellId, parent: Option<CellId>) {
        if let Some(old_parent) = self.parent(cell).and_then(|old| self.cells.get_mut(&old)) {
            old_parent.children.retain(|&c| c != cell);
        }
        if let Some(new_parent) = parent.and_then(|new| self.cells.get_mut(&new)) {
            new_parent.children.push(cell);
        }
        if let Some(c) = self.cells.get_mut(&cell) {
            c.parent = parent;
        }
    }

    fn set_terminal_raw(&mut self, edge: CellId, terminal: Option<CellId>, is_source: bool) {
        if let Some(c) = self.cells.get_mut(&edge) {
            if is_source {
                c.source = terminal;
            } else {
                c.target = terminal;
            }
        }
    }

    fn set_geometry_raw(&mut self, cell: CellId, geometry: Option<Geometry>) {
        if let Some(c) = self.cells.get_mut(&cell) {
            c.geometry = geometry;
        }
    }

    fn set_style_raw(&mut self, cell: CellId, style: CellStyle) {
        if let Some(c) = self.cells.get_mut(&cell) {
            c.style = style;
        }
    }
}
