//! Reversible changes, undoable edits and a bounded history.

/// Maximum number of edits kept on the undo stack.
pub const MAX_UNDO_HISTORY: usize = 50;

/// A change that can be applied to, and taken back from, its target.
pub trait Reversible<T> {
    /// Apply the change.
    fn apply(&self, target: &mut T);
    /// Take the change back.
    fn revert(&self, target: &mut T);
}

/// An ordered record of the changes one user action produced.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoableEdit<C> {
    changes: Vec<C>,
    significant: bool,
}

impl<C> Default for UndoableEdit<C> {
    fn default() -> Self {
        Self::new(true)
    }
}

impl<C> UndoableEdit<C> {
    /// Create an empty edit. Insignificant edits are undone together with the
    /// next significant one below them on the stack.
    pub fn new(significant: bool) -> Self {
        Self {
            changes: Vec::new(),
            significant,
        }
    }

    /// Append a change.
    pub fn add(&mut self, change: C) {
        self.changes.push(change);
    }

    pub fn changes(&self) -> &[C] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn is_significant(&self) -> bool {
        self.significant
    }

    /// Revert every change, last first.
    pub fn undo<T>(&self, target: &mut T)
    where
        C: Reversible<T>,
    {
        for change in self.changes.iter().rev() {
            change.revert(target);
        }
    }

    /// Re-apply every change in order.
    pub fn redo<T>(&self, target: &mut T)
    where
        C: Reversible<T>,
    {
        for change in &self.changes {
            change.apply(target);
        }
    }
}

/// Undo/redo stacks of edits.
#[derive(Debug, Clone)]
pub struct History<C> {
    undo_stack: Vec<UndoableEdit<C>>,
    redo_stack: Vec<UndoableEdit<C>>,
    limit: usize,
}

impl<C> Default for History<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> History<C> {
    pub fn new() -> Self {
        Self::with_limit(MAX_UNDO_HISTORY)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record an edit that has already been executed.
    pub fn push(&mut self, edit: UndoableEdit<C>) {
        if edit.is_empty() {
            return;
        }
        self.undo_stack.push(edit);
        self.redo_stack.clear();

        if self.undo_stack.len() > self.limit {
            self.undo_stack.remove(0);
        }
    }

    /// Undo edits until a significant one has been undone.
    /// Returns false if there was nothing to undo.
    pub fn undo<T>(&mut self, target: &mut T) -> bool
    where
        C: Reversible<T>,
    {
        let mut undone = false;
        while let Some(edit) = self.undo_stack.pop() {
            edit.undo(target);
            undone = true;
            let significant = edit.is_significant();
            self.redo_stack.push(edit);
            if significant {
                break;
            }
        }
        undone
    }

    /// Redo edits until a significant one has been redone.
    pub fn redo<T>(&mut self, target: &mut T) -> bool
    where
        C: Reversible<T>,
    {
        let mut redone = false;
        while let Some(edit) = self.redo_stack.pop() {
            edit.redo(target);
            redone = true;
            let significant = edit.is_significant();
            self.undo_stack.push(edit);
            if significant {
                break;
            }
        }
        redone
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
