//! Diagrink Core Library
//!
//! Interaction core of the diagrink diagram canvas: connection constraints,
//! the outline view and the selection model, over a small cell model.

pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod geometry;
pub mod graph;
pub mod model;
pub mod outline;
pub mod perimeter;
pub mod selection;
pub mod stencil;
pub mod style;
pub mod undo;
pub mod view;

pub use config::{GraphConfig, OutlineConfig};
pub use connection::{ConnectionConstraint, connection_point, constraint_from_style, outline_constraint};
pub use error::{GraphError, GraphResult};
pub use events::{EventBus, Subscription};
pub use geometry::Direction;
pub use graph::{Container, Graph, GraphEvent};
pub use model::{Cell, CellId, CellKind, Geometry, GraphModel, ModelChange, ModelEvent, UpdateGuard};
pub use outline::{Gesture, Outline, OutlinePointer, OverlayShape, PendingUpdate, PointerKind};
pub use perimeter::PerimeterKind;
pub use selection::{SelectionChange, SelectionEvent, SelectionModel};
pub use stencil::{Stencil, StencilRegistry};
pub use style::{CellStyle, TerminalAnchor};
pub use undo::{History, Reversible, UndoableEdit, MAX_UNDO_HISTORY};
pub use view::{CellState, GraphView, ViewEvent};
