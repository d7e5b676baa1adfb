//! Named shapes with predefined connection points.

use crate::connection::ConnectionConstraint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A shape definition that offers fixed anchor points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stencil {
    pub name: String,
    #[serde(default)]
    pub constraints: Vec<ConnectionConstraint>,
}

impl Stencil {
    pub fn new(name: impl Into<String>, constraints: Vec<ConnectionConstraint>) -> Self {
        Self {
            name: name.into(),
            constraints,
        }
    }
}

/// Stencils keyed by the style's `shape` name.
#[derive(Debug, Clone, Default)]
pub struct StencilRegistry {
    stencils: HashMap<String, Stencil>,
}

impl StencilRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stencil, replacing any previous one with the same name.
    pub fn register(&mut self, stencil: Stencil) -> Option<Stencil> {
        log::debug!("registering stencil {}", stencil.name);
        self.stencils.insert(stencil.name.clone(), stencil)
    }

    pub fn get(&self, name: &str) -> Option<&Stencil> {
        self.stencils.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stencils.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.stencils.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stencils.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = StencilRegistry::new();
        let stencil = Stencil::new(
            "gate",
            vec![
                ConnectionConstraint::new(Some(Point::new(0.0, 0.5)), false),
                ConnectionConstraint::new(Some(Point::new(1.0, 0.5)), false),
            ],
        );
        assert!(registry.register(stencil).is_none());
        assert!(registry.contains("gate"));
        assert_eq!(registry.get("gate").map(|s| s.constraints.len()), Some(2));
        assert!(registry.get("cloud").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = StencilRegistry::new();
        registry.register(Stencil::new("gate", Vec::new()));
        let previous = registry.register(Stencil::new("gate", vec![ConnectionConstraint::default()]));
        assert!(previous.is_some_and(|s| s.constraints.is_empty()));
        assert_eq!(registry.len(), 1);
    }
}
