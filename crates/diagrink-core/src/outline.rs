//! Outline: a miniature view of a graph with a viewport indicator.
//!
//! The outline keeps its own [`GraphView`] over the graph's model, fitted into
//! the outline container. The viewport indicator shows the primary view's
//! visible area; dragging it pans the primary view and dragging the zoom
//! handle at its bottom-right corner zooms it.
//!
//! Listeners registered on the graph only record that work is pending;
//! [`Outline::sync`] performs it.

use crate::config::OutlineConfig;
use crate::error::GraphResult;
use crate::events::Subscription;
use crate::geometry::intersects;
use crate::graph::{Graph, GraphEvent};
use crate::view::GraphView;
use kurbo::{Point, Rect, Size, Vec2};
use std::cell::Cell;
use std::rc::Rc;

/// A rectangle drawn on top of the outline.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayShape {
    pub bounds: Rect,
    pub visible: bool,
    /// Number of times the shape was redrawn.
    pub redraws: usize,
}

impl OverlayShape {
    fn new(bounds: Rect, visible: bool) -> Self {
        Self {
            bounds,
            visible,
            redraws: 0,
        }
    }

    /// Move the shape, redrawing only if the bounds changed.
    fn set_bounds(&mut self, bounds: Rect) -> bool {
        if bounds == self.bounds {
            return false;
        }
        self.bounds = bounds;
        if self.visible {
            self.redraws += 1;
        }
        true
    }
}

/// Kind of pointer behind an outline gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
    Pen,
}

/// Pointer press in outline container coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlinePointer {
    pub position: Point,
    pub kind: PointerKind,
}

impl OutlinePointer {
    pub fn mouse(x: f64, y: f64) -> Self {
        Self {
            position: Point::new(x, y),
            kind: PointerKind::Mouse,
        }
    }

    pub fn touch(x: f64, y: f64) -> Self {
        Self {
            position: Point::new(x, y),
            kind: PointerKind::Touch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Pan,
    Zoom,
}

/// Work requested by graph notifications, strongest last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum PendingUpdate {
    #[default]
    None,
    Update,
    Revalidate,
}

/// State shared with the listeners registered on the graph.
#[derive(Debug, Default)]
struct Signals {
    pending: Cell<PendingUpdate>,
    update_on_pan: Cell<bool>,
}

impl Signals {
    fn request(&self, update: PendingUpdate) {
        self.pending.set(self.pending.get().max(update));
    }
}

#[derive(Debug, Clone, Copy)]
struct Subscriptions {
    model: Subscription,
    view: Subscription,
    graph: Subscription,
}

/// Overview of a [`Graph`] kept in sync with its primary view.
#[derive(Debug)]
pub struct Outline {
    config: OutlineConfig,
    view: GraphView,
    container: Size,
    bounds: Rect,
    viewport: Option<OverlayShape>,
    sizer: Option<OverlayShape>,
    gesture: Gesture,
    start: Point,
    scroll_baseline: Vec2,
    suspended: bool,
    destroyed: bool,
    signals: Rc<Signals>,
    subscriptions: Option<Subscriptions>,
    revalidations: usize,
}

impl Outline {
    /// Attach an outline of `container` size to `graph`.
    pub fn new(graph: &mut Graph, container: Size, config: OutlineConfig) -> GraphResult<Self> {
        let config = config.validate()?;
        let signals = Rc::new(Signals::default());
        signals.update_on_pan.set(config.update_on_pan);

        let s = Rc::clone(&signals);
        let model = graph.model.events.subscribe(move |_| s.request(PendingUpdate::Update));
        let s = Rc::clone(&signals);
        let view = graph.view.events.subscribe(move |_| s.request(PendingUpdate::Update));
        let s = Rc::clone(&signals);
        let graph_sub = graph.events.subscribe(move |event| match event {
            GraphEvent::Pan { .. } => {
                if s.update_on_pan.get() {
                    s.request(PendingUpdate::Update);
                }
            }
            GraphEvent::Refresh => s.request(PendingUpdate::Revalidate),
            GraphEvent::Scroll { .. } => s.request(PendingUpdate::Update),
            GraphEvent::ConnectCell { .. } | GraphEvent::CellConnected { .. } => {}
        });

        let sizer = Rect::from_origin_size(Point::ZERO, Size::new(config.sizer_size, config.sizer_size));
        let mut outline = Self {
            viewport: Some(OverlayShape::new(Rect::ZERO, config.show_viewport)),
            sizer: Some(OverlayShape::new(sizer, config.show_viewport && config.zoom_enabled)),
            config,
            view: GraphView::new(),
            container,
            bounds: Rect::ZERO,
            gesture: Gesture::Idle,
            start: Point::ZERO,
            scroll_baseline: Vec2::ZERO,
            suspended: false,
            destroyed: false,
            signals,
            subscriptions: Some(Subscriptions {
                model,
                view,
                graph: graph_sub,
            }),
            revalidations: 0,
        };
        outline.update(graph, true);
        log::debug!("outline attached, scale {:.4}", outline.scale());
        Ok(outline)
    }

    // --- accessors ---

    /// Primary viewport in outline coordinates.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn scale(&self) -> f64 {
        self.view.scale()
    }

    pub fn translate(&self) -> Vec2 {
        self.view.translate()
    }

    pub fn view(&self) -> &GraphView {
        &self.view
    }

    pub fn config(&self) -> &OutlineConfig {
        &self.config
    }

    pub fn container(&self) -> Size {
        self.container
    }

    /// The viewport indicator, until destroyed.
    pub fn viewport(&self) -> Option<&OverlayShape> {
        self.viewport.as_ref()
    }

    /// The zoom handle, until destroyed.
    pub fn sizer(&self) -> Option<&OverlayShape> {
        self.sizer.as_ref()
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub fn is_active(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    pub fn pending(&self) -> PendingUpdate {
        self.signals.pending.get()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Number of times the outline view was rebuilt.
    pub fn revalidations(&self) -> usize {
        self.revalidations
    }

    // --- settings ---

    pub fn set_zoom_enabled(&mut self, enabled: bool) {
        self.config.zoom_enabled = enabled;
        if let Some(sizer) = &mut self.sizer {
            sizer.visible = enabled && self.config.show_viewport;
        }
    }

    pub fn set_show_viewport(&mut self, show: bool) {
        self.config.show_viewport = show;
        if let Some(viewport) = &mut self.viewport {
            viewport.visible = show;
        }
        if let Some(sizer) = &mut self.sizer {
            sizer.visible = show && self.config.zoom_enabled;
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    pub fn set_update_on_pan(&mut self, update_on_pan: bool) {
        self.config.update_on_pan = update_on_pan;
        self.signals.update_on_pan.set(update_on_pan);
    }

    /// Suspended outlines ignore automatic updates from the graph.
    pub fn set_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
    }

    // --- updates ---

    /// Perform the work requested by graph notifications since the last
    /// update. Returns true if an update ran.
    ///
    /// Plain updates are dropped while suspended and held back during a
    /// gesture; revalidation requests always run.
    pub fn sync(&mut self, graph: &Graph) -> bool {
        if self.destroyed {
            return false;
        }
        match self.signals.pending.get() {
            PendingUpdate::None => false,
            PendingUpdate::Revalidate => {
                self.update(graph, true);
                true
            }
            PendingUpdate::Update if self.suspended => {
                self.signals.pending.set(PendingUpdate::None);
                false
            }
            PendingUpdate::Update if self.is_active() => false,
            PendingUpdate::Update => {
                self.update(graph, false);
                true
            }
        }
    }

    /// Update and rebuild the outline view.
    pub fn refresh(&mut self, graph: &Graph) {
        self.update(graph, true);
    }

    /// Resize the outline container.
    pub fn resize(&mut self, graph: &Graph, container: Size) {
        self.container = container;
        self.update(graph, false);
    }

    /// Refit the outline to the graph and move the viewport indicator.
    pub fn update(&mut self, graph: &Graph, revalidate: bool) {
        if self.destroyed {
            return;
        }
        self.signals.pending.set(PendingUpdate::None);
        let mut revalidate = revalidate;

        let source_scale = graph.view.scale();
        let pan = graph.pan();
        let scaled = graph.graph_bounds();
        let unscaled = Rect::from_origin_size(
            Point::new(scaled.x0 / source_scale + pan.x, scaled.y0 / source_scale + pan.y),
            scaled.size() / source_scale,
        );
        let finder = Rect::from_origin_size(Point::ZERO, graph.container.client_size() / source_scale);
        let union = unscaled.union(finder);

        let scroll = graph.container.scroll_size();
        let complete_width = (scroll.width / source_scale).max(union.width());
        let complete_height = (scroll.height / source_scale).max(union.height());
        let available_width = (self.container.width - self.config.border).max(0.0);
        let available_height = (self.container.height - self.config.border).max(0.0);

        let rx = available_width / complete_width;
        let ry = available_height / complete_height;
        let ratio = if rx.is_nan() || ry.is_nan() { f64::NAN } else { rx.min(ry) };
        let scale = if ratio.is_finite() {
            ratio.max(self.config.min_scale)
        } else {
            self.config.min_scale
        };

        if self.view.scale() != scale {
            self.view.set_scale(scale);
            revalidate = true;
        }
        if self.view.current_root() != graph.view.current_root() {
            self.view.set_current_root(graph.view.current_root());
            revalidate = true;
        }

        let t = graph.view.translate();
        let mut nav_translate = t + pan;
        if unscaled.x0 < 0.0 {
            nav_translate.x -= unscaled.x0;
        }
        if unscaled.y0 < 0.0 {
            nav_translate.y -= unscaled.y0;
        }
        if self.view.translate() != nav_translate {
            self.view.set_translate(nav_translate);
            revalidate = true;
        }

        let nav_scale = self.view.scale();
        let view_ratio = source_scale / nav_scale;
        let client = graph.container.client_size();
        let offset = (nav_translate - t - pan) * nav_scale;
        let scroll_offset = Vec2::new(graph.container.scroll_left, graph.container.scroll_top) * (nav_scale / source_scale);
        let size = Size::new(
            (client.width / view_ratio).max(0.0),
            (client.height / view_ratio).max(0.0),
        );
        self.bounds = Rect::from_origin_size((offset + scroll_offset).to_point(), size);

        if let Some(viewport) = &mut self.viewport {
            viewport.set_bounds(self.bounds);
        }
        self.place_sizer(self.bounds);

        if revalidate {
            self.view.validate(&graph.model);
            self.revalidations += 1;
        }
    }

    /// Center the zoom handle on the bottom-right corner of `bounds`.
    fn place_sizer(&mut self, bounds: Rect) {
        if let Some(sizer) = &mut self.sizer {
            let size = sizer.bounds.size();
            let origin = Point::new(bounds.x1 - size.width / 2.0, bounds.y1 - size.height / 2.0);
            sizer.set_bounds(Rect::from_origin_size(origin, size));
        }
    }

    // --- gestures ---

    /// Start a pan, or a zoom when the press hits the zoom handle.
    /// Returns false if the outline does not take the gesture.
    pub fn mouse_down(&mut self, graph: &Graph, pointer: OutlinePointer) -> bool {
        if self.destroyed || !self.config.enabled || !self.config.show_viewport {
            return false;
        }
        let tolerance = match pointer.kind {
            PointerKind::Mouse => 0.0,
            PointerKind::Touch | PointerKind::Pen => graph.config.tolerance,
        };
        let hit = Rect::from_center_size(pointer.position, Size::new(2.0 * tolerance, 2.0 * tolerance));
        let zoom = self.sizer.as_ref().is_some_and(|sizer| {
            sizer.visible
                && (sizer.bounds.contains(pointer.position) || (tolerance > 0.0 && intersects(sizer.bounds, hit)))
        });

        self.gesture = if zoom { Gesture::Zoom } else { Gesture::Pan };
        self.start = pointer.position;
        self.scroll_baseline = if graph.config.use_scrollbars_for_panning && graph.container.has_scrollbars() {
            Vec2::new(graph.container.scroll_left, graph.container.scroll_top)
        } else {
            Vec2::ZERO
        };
        log::trace!("outline {:?} started at {:?}", self.gesture, self.start);
        true
    }

    /// Preview the gesture. Pans are previewed on the graph as well; zooms
    /// only resize the indicator.
    pub fn mouse_move(&mut self, graph: &mut Graph, position: Point) -> bool {
        let delta = position - self.start;
        let preview = match self.gesture {
            Gesture::Idle => return false,
            Gesture::Pan => {
                let ratio = graph.view.scale() / self.view.scale();
                graph.pan_graph(
                    -delta.x * ratio - self.scroll_baseline.x,
                    -delta.y * ratio - self.scroll_baseline.y,
                );
                self.bounds + delta
            }
            Gesture::Zoom => {
                let client = graph.container.client_size();
                let aspect = client.width / client.height;
                let dy = if aspect.is_finite() && aspect > 0.0 { delta.x / aspect } else { delta.x };
                Rect::from_origin_size(
                    self.bounds.origin(),
                    Size::new((self.bounds.width() + delta.x).max(1.0), (self.bounds.height() + dy).max(1.0)),
                )
            }
        };

        if let Some(viewport) = &mut self.viewport {
            viewport.set_bounds(preview);
        }
        self.place_sizer(preview);
        true
    }

    /// Commit the gesture if the pointer moved, then return to idle.
    pub fn mouse_up(&mut self, graph: &mut Graph, position: Point) -> bool {
        let gesture = self.gesture;
        if gesture == Gesture::Idle {
            return false;
        }
        self.gesture = Gesture::Idle;

        let delta = position - self.start;
        if delta.x == 0.0 && delta.y == 0.0 {
            return true;
        }
        match gesture {
            Gesture::Pan => {
                if !(graph.config.use_scrollbars_for_panning && graph.container.has_scrollbars()) {
                    graph.pan_graph(0.0, 0.0);
                    let t = graph.view.translate();
                    graph.set_translate(t - delta / self.view.scale());
                }
            }
            Gesture::Zoom => {
                let width = self.viewport.as_ref().map_or(self.bounds.width(), |v| v.bounds.width());
                if width > 0.0 {
                    let scale = graph.view.scale();
                    graph.zoom_to(self.config.min_scale.max(scale - delta.x * scale / width));
                }
            }
            Gesture::Idle => {}
        }
        log::debug!("outline {gesture:?} committed, delta {delta:?}");
        self.update(graph, false);
        true
    }

    /// Detach from the graph and release the overlay shapes. Safe to call
    /// more than once.
    pub fn destroy(&mut self, graph: &mut Graph) {
        if let Some(subs) = self.subscriptions.take() {
            graph.model.events.unsubscribe(subs.model);
            graph.view.events.unsubscribe(subs.view);
            graph.events.unsubscribe(subs.graph);
        }
        self.viewport = None;
        self.sizer = None;
        self.view.clear();
        self.gesture = Gesture::Idle;
        self.signals.pending.set(PendingUpdate::None);
        self.destroyed = true;
    }
}
