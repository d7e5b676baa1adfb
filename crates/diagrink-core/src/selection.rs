//! Selection model.
//!
//! Every public mutation goes through [`SelectionModel::change_selection`],
//! which applies one [`SelectionChange`], wraps it in an insignificant
//! [`UndoableEdit`] and emits exactly one [`SelectionEvent`].

use crate::events::EventBus;
use crate::model::CellId;
use crate::undo::{Reversible, UndoableEdit};
use indexmap::IndexSet;

/// Delta between two selections.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionChange {
    pub added: Vec<CellId>,
    pub removed: Vec<CellId>,
}

impl Reversible<SelectionModel> for SelectionChange {
    fn apply(&self, selection: &mut SelectionModel) {
        for &cell in &self.removed {
            selection.cell_removed(cell);
        }
        for &cell in &self.added {
            selection.cell_added(cell);
        }
    }

    fn revert(&self, selection: &mut SelectionModel) {
        for &cell in &self.added {
            selection.cell_removed(cell);
        }
        for &cell in &self.removed {
            selection.cell_added(cell);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    Change { edit: UndoableEdit<SelectionChange> },
}

/// Ordered set of selected cells.
#[derive(Debug, Default)]
pub struct SelectionModel {
    cells: IndexSet<CellId>,
    single_selection: bool,
    pub events: EventBus<SelectionEvent>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_single_selection(&self) -> bool {
        self.single_selection
    }

    pub fn set_single_selection(&mut self, single: bool) {
        self.single_selection = single;
    }

    pub fn is_selected(&self, cell: CellId) -> bool {
        self.cells.contains(&cell)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Selected cells in selection order.
    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.cells.iter().copied()
    }

    pub fn first(&self) -> Option<CellId> {
        self.cells.first().copied()
    }

    /// Replace the selection with the selectable cells of `cells`.
    pub fn set_cells(
        &mut self,
        cells: &[CellId],
        selectable: impl Fn(CellId) -> bool,
    ) -> Option<UndoableEdit<SelectionChange>> {
        let added: Vec<CellId> = if self.single_selection {
            cells.iter().copied().find(|&c| selectable(c)).into_iter().collect()
        } else {
            unique(cells.iter().copied().filter(|&c| selectable(c)))
        };
        let removed: Vec<CellId> = self.cells.iter().copied().collect();
        self.change_selection(added, removed)
    }

    pub fn set_cell(
        &mut self,
        cell: Option<CellId>,
        selectable: impl Fn(CellId) -> bool,
    ) -> Option<UndoableEdit<SelectionChange>> {
        match cell {
            Some(cell) => self.set_cells(&[cell], selectable),
            None => self.clear(),
        }
    }

    /// Add the selectable, not yet selected cells of `cells`. In single
    /// selection mode the first selectable cell replaces the selection, and
    /// the prior selection is dropped even when nothing is selectable.
    pub fn add_cells(
        &mut self,
        cells: &[CellId],
        selectable: impl Fn(CellId) -> bool,
    ) -> Option<UndoableEdit<SelectionChange>> {
        if self.single_selection {
            let candidate = cells.iter().copied().find(|&c| selectable(c));
            let removed: Vec<CellId> = self.cells.iter().copied().filter(|&c| Some(c) != candidate).collect();
            let added: Vec<CellId> = candidate.filter(|&c| !self.is_selected(c)).into_iter().collect();
            return self.change_selection(added, removed);
        }

        let added = unique(
            cells
                .iter()
                .copied()
                .filter(|&c| !self.is_selected(c) && selectable(c)),
        );
        self.change_selection(added, Vec::new())
    }

    pub fn add_cell(
        &mut self,
        cell: CellId,
        selectable: impl Fn(CellId) -> bool,
    ) -> Option<UndoableEdit<SelectionChange>> {
        self.add_cells(&[cell], selectable)
    }

    /// Remove those of `cells` that are selected.
    pub fn remove_cells(&mut self, cells: &[CellId]) -> Option<UndoableEdit<SelectionChange>> {
        let removed = unique(cells.iter().copied().filter(|&c| self.is_selected(c)));
        self.change_selection(Vec::new(), removed)
    }

    pub fn remove_cell(&mut self, cell: CellId) -> Option<UndoableEdit<SelectionChange>> {
        self.remove_cells(&[cell])
    }

    pub fn clear(&mut self) -> Option<UndoableEdit<SelectionChange>> {
        let removed: Vec<CellId> = self.cells.iter().copied().collect();
        self.change_selection(Vec::new(), removed)
    }

    /// Apply a pre-filtered delta as one undoable step.
    ///
    /// Returns the edit, or `None` when both lists are empty (nothing is
    /// applied or emitted then).
    pub fn change_selection(
        &mut self,
        added: Vec<CellId>,
        removed: Vec<CellId>,
    ) -> Option<UndoableEdit<SelectionChange>> {
        if added.is_empty() && removed.is_empty() {
            return None;
        }
        let change = SelectionChange { added, removed };
        change.apply(self);
        log::debug!(
            "selection changed: +{} -{} (now {})",
            change.added.len(),
            change.removed.len(),
            self.cells.len()
        );

        let mut edit = UndoableEdit::new(false);
        edit.add(change);
        self.events.emit(&SelectionEvent::Change { edit: edit.clone() });
        Some(edit)
    }

    /// Insert without notifying. Idempotent.
    pub fn cell_added(&mut self, cell: CellId) {
        self.cells.insert(cell);
    }

    /// Remove without notifying. Idempotent.
    pub fn cell_removed(&mut self, cell: CellId) {
        self.cells.shift_remove(&cell);
    }
}

fn unique(cells: impl Iterator<Item = CellId>) -> Vec<CellId> {
    cells.collect::<IndexSet<_>>().into_iter().collect()
}
