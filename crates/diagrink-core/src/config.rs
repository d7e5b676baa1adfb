//! Configuration passed explicitly into [`Graph`](crate::Graph) and
//! [`Outline`](crate::Outline).

use crate::error::{GraphError, GraphResult};
use serde::{Deserialize, Serialize};

/// Default hit tolerance for touch and pen input, in pixels.
pub const DEFAULT_TOLERANCE: f64 = 4.0;

/// Behaviour switches of a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Connecting to a port connects to its owner and records the port id.
    pub ports_enabled: bool,
    /// Drop waypoints when an edge end is reconnected.
    pub reset_edges_on_connect: bool,
    pub constrain_children: bool,
    pub cells_selectable: bool,
    pub cells_locked: bool,
    pub cells_disconnectable: bool,
    pub single_selection: bool,
    /// Pan by scrolling the container when it has scrollbars.
    pub use_scrollbars_for_panning: bool,
    pub tolerance: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            ports_enabled: true,
            reset_edges_on_connect: true,
            constrain_children: true,
            cells_selectable: true,
            cells_locked: false,
            cells_disconnectable: true,
            single_selection: false,
            use_scrollbars_for_panning: true,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl GraphConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> GraphResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| GraphError::InvalidConfig(e.to_string()))?;
        config.validate()
    }

    pub fn validate(self) -> GraphResult<Self> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(GraphError::InvalidConfig(format!("tolerance must be >= 0, got {}", self.tolerance)));
        }
        Ok(self)
    }
}

/// Settings of an [`Outline`](crate::Outline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    /// Lower bound for the outline scale and for zooms committed from it.
    pub min_scale: f64,
    /// Margin subtracted from the outline container before fitting.
    pub border: f64,
    /// Edge length of the zoom handle.
    pub sizer_size: f64,
    /// Accept pointer gestures.
    pub enabled: bool,
    pub show_viewport: bool,
    pub zoom_enabled: bool,
    /// Follow live pan previews of the primary view.
    pub update_on_pan: bool,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.0001,
            border: 10.0,
            sizer_size: 8.0,
            enabled: true,
            show_viewport: true,
            zoom_enabled: true,
            update_on_pan: false,
        }
    }
}

impl OutlineConfig {
    pub fn validate(self) -> GraphResult<Self> {
        if !self.min_scale.is_finite() || self.min_scale <= 0.0 {
            return Err(GraphError::InvalidConfig(format!("min_scale must be > 0, got {}", self.min_scale)));
        }
        if !self.border.is_finite() || self.border < 0.0 {
            return Err(GraphError::InvalidConfig(format!("border must be >= 0, got {}", self.border)));
        }
        if !self.sizer_size.is_finite() || self.sizer_size < 0.0 {
            return Err(GraphError::InvalidConfig(format!("sizer_size must be >= 0, got {}", self.sizer_size)));
        }
        Ok(self)
    }
}
