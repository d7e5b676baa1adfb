//! Graph facade: one model, its primary view, the selection and the
//! container the view is shown in.

use crate::config::GraphConfig;
use crate::error::GraphResult;
use crate::events::EventBus;
use crate::model::{CellId, CellKind, GraphModel};
use crate::selection::{SelectionChange, SelectionModel};
use crate::stencil::StencilRegistry;
use crate::style::CellStyle;
use crate::undo::UndoableEdit;
use crate::view::GraphView;
use kurbo::{Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Geometry of the scrollable element hosting the primary view.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Container {
    pub client_width: f64,
    pub client_height: f64,
    pub scroll_left: f64,
    pub scroll_top: f64,
    /// Size of the scrollable content; equals the client size when nothing
    /// overflows.
    pub scroll_width: f64,
    pub scroll_height: f64,
}

impl Container {
    /// A container whose content fits exactly.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            client_width: width,
            client_height: height,
            scroll_left: 0.0,
            scroll_top: 0.0,
            scroll_width: width,
            scroll_height: height,
        }
    }

    pub fn client_size(&self) -> Size {
        Size::new(self.client_width, self.client_height)
    }

    pub fn scroll_size(&self) -> Size {
        Size::new(self.scroll_width, self.scroll_height)
    }

    pub fn has_scrollbars(&self) -> bool {
        self.scroll_width > self.client_width || self.scroll_height > self.client_height
    }

    /// Largest scroll offsets.
    pub fn max_scroll(&self) -> Vec2 {
        Vec2::new(
            (self.scroll_width - self.client_width).max(0.0),
            (self.scroll_height - self.client_height).max(0.0),
        )
    }
}

/// Graph-level notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    /// A connect request completed. `terminal` is the cell that was asked for.
    ConnectCell {
        edge: CellId,
        terminal: Option<CellId>,
        is_source: bool,
        previous: Option<CellId>,
    },
    /// An edge end was linked. `terminal` is the resolved cell (a port's owner).
    CellConnected {
        edge: CellId,
        terminal: Option<CellId>,
        is_source: bool,
        previous: Option<CellId>,
    },
    /// Live pan preview offset changed.
    Pan { dx: f64, dy: f64 },
    /// The view was rebuilt.
    Refresh,
    /// The container was scrolled.
    Scroll { left: f64, top: f64 },
}

/// A diagram with its primary view.
#[derive(Debug)]
pub struct Graph {
    /// Mutate through [`Graph::batch_update`] so the view follows.
    pub model: GraphModel,
    pub view: GraphView,
    pub selection: SelectionModel,
    pub stencils: StencilRegistry,
    pub config: GraphConfig,
    pub container: Container,
    pan: Vec2,
    pub events: EventBus<GraphEvent>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        let mut selection = SelectionModel::new();
        selection.set_single_selection(config.single_selection);
        let mut graph = Self {
            model: GraphModel::new(),
            view: GraphView::new(),
            selection,
            stencils: StencilRegistry::new(),
            config,
            container: Container::default(),
            pan: Vec2::ZERO,
            events: EventBus::new(),
        };
        graph.validate();
        graph
    }

    /// Run `f` as one transaction. When the outermost transaction closes with
    /// recorded changes, the model notifies once and the view is rebuilt.
    ///
    /// This is the write path for `self.model`: model mutators called outside
    /// it still notify, but leave the view stale until [`Graph::validate`].
    pub fn batch_update<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let guard = self.model.begin_update();
        let result = f(self);
        let outermost = guard.is_outermost();
        drop(guard);
        if outermost && self.model.flush_changes() {
            self.view.validate(&self.model);
        }
        result
    }

    // --- cells ---

    pub fn add_layer(&mut self) -> CellId {
        self.batch_update(|graph| graph.model.add_layer())
    }

    pub fn add_vertex(&mut self, parent: CellId, bounds: Rect, style: CellStyle) -> GraphResult<CellId> {
        self.batch_update(|graph| graph.model.add_vertex(parent, bounds, style))
    }

    pub fn add_port(&mut self, vertex: CellId, bounds: Rect, style: CellStyle) -> GraphResult<CellId> {
        self.batch_update(|graph| graph.model.add_port(vertex, bounds, style))
    }

    pub fn add_edge(
        &mut self,
        parent: CellId,
        source: Option<CellId>,
        target: Option<CellId>,
        style: CellStyle,
    ) -> GraphResult<CellId> {
        self.batch_update(|graph| graph.model.add_edge(parent, source, target, style))
    }

    // --- view ---

    pub fn validate(&mut self) {
        self.view.validate(&self.model);
    }

    /// Rebuild the view and tell listeners.
    pub fn refresh(&mut self) {
        self.validate();
        self.events.emit(&GraphEvent::Refresh);
    }

    pub fn graph_bounds(&self) -> Rect {
        self.view.graph_bounds()
    }

    /// Current live pan offset.
    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    /// Shift the visible area by `(dx, dy)`: by scrolling when the container
    /// scrolls, else as a live pan offset.
    pub fn pan_graph(&mut self, dx: f64, dy: f64) {
        if self.config.use_scrollbars_for_panning && self.container.has_scrollbars() {
            self.set_scroll(-dx, -dy);
        } else {
            self.pan = Vec2::new(dx, dy);
            self.events.emit(&GraphEvent::Pan { dx, dy });
        }
    }

    /// Scroll the container, clamped to its scrollable range.
    pub fn set_scroll(&mut self, left: f64, top: f64) {
        let max = self.container.max_scroll();
        let left = left.clamp(0.0, max.x);
        let top = top.clamp(0.0, max.y);
        if left != self.container.scroll_left || top != self.container.scroll_top {
            self.container.scroll_left = left;
            self.container.scroll_top = top;
            self.events.emit(&GraphEvent::Scroll { left, top });
        }
    }

    pub fn zoom_to(&mut self, scale: f64) {
        if !scale.is_finite() || scale <= 0.0 {
            log::warn!("ignoring zoom to {scale}");
            return;
        }
        self.view.set_scale(scale);
        self.validate();
    }

    pub fn set_translate(&mut self, translate: Vec2) {
        self.view.set_translate(translate);
        self.validate();
    }

    pub fn set_current_root(&mut self, root: Option<CellId>) {
        self.view.set_current_root(root);
        self.validate();
    }

    // --- predicates ---

    pub fn is_cell_selectable(&self, cell: CellId) -> bool {
        cell_selectable(&self.model, &self.config, cell)
    }

    pub fn is_cell_locked(&self, cell: CellId) -> bool {
        self.config.cells_locked || self.model.style(cell).is_some_and(CellStyle::is_locked)
    }

    pub fn is_cell_disconnectable(&self, cell: CellId) -> bool {
        self.config.cells_disconnectable && !self.is_cell_locked(cell)
    }

    pub fn is_port(&self, cell: CellId) -> bool {
        self.model.is_port(cell)
    }

    /// Cell an edge actually connects to when attached to `port`.
    pub fn terminal_for_port(&self, port: CellId) -> Option<CellId> {
        self.model.parent(port)
    }

    // --- selection ---

    pub fn set_single_selection(&mut self, single: bool) {
        self.config.single_selection = single;
        self.selection.set_single_selection(single);
    }

    pub fn set_selection_cells(&mut self, cells: &[CellId]) -> Option<UndoableEdit<SelectionChange>> {
        let (model, config) = (&self.model, &self.config);
        self.selection.set_cells(cells, |c| cell_selectable(model, config, c))
    }

    pub fn add_selection_cells(&mut self, cells: &[CellId]) -> Option<UndoableEdit<SelectionChange>> {
        let (model, config) = (&self.model, &self.config);
        self.selection.add_cells(cells, |c| cell_selectable(model, config, c))
    }

    pub fn remove_selection_cells(&mut self, cells: &[CellId]) -> Option<UndoableEdit<SelectionChange>> {
        self.selection.remove_cells(cells)
    }

    pub fn clear_selection(&mut self) -> Option<UndoableEdit<SelectionChange>> {
        self.selection.clear()
    }

    /// Select every selectable child of `parent` (default: the default layer).
    pub fn select_all(&mut self, parent: Option<CellId>) -> Option<UndoableEdit<SelectionChange>> {
        let parent = parent.unwrap_or_else(|| self.model.default_parent());
        let children = self.model.children(parent).to_vec();
        self.set_selection_cells(&children)
    }
}

fn cell_selectable(model: &GraphModel, config: &GraphConfig, cell: CellId) -> bool {
    config.cells_selectable
        && matches!(
            model.kind(cell),
            Some(CellKind::Vertex | CellKind::Edge | CellKind::Port)
        )
        && model.style(cell).is_some_and(CellStyle::is_selectable)
}
