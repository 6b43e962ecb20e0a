//! Selection module - autobet / bulk-reveal cell selection
//!
//! A parallel sequence to the grid where each cell is either unselected or
//! holds its own index. The number of selected cells is bounded by the
//! rule-bounded hit maximum (`diamonds_max`).

use arrayvec::ArrayVec;

use crate::types::{DeskSize, MAX_DEFAULT_PATTERN};

/// Outcome of [`Selection::toggle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Selected,
    Deselected,
    /// Limit reached or index off the board.
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    cells: Vec<Option<usize>>,
    count: u32,
}

impl Selection {
    pub fn new(desk: DeskSize) -> Self {
        Self {
            cells: vec![None; desk.cells()],
            count: 0,
        }
    }

    pub fn cells(&self) -> &[Option<usize>] {
        &self.cells
    }

    /// Running count of selected cells
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_selected(&self, index: usize) -> bool {
        matches!(self.cells.get(index), Some(Some(_)))
    }

    /// Selected indices in board order
    pub fn indexes(&self) -> Vec<usize> {
        self.cells.iter().filter_map(|c| *c).collect()
    }

    /// Clear all cells and adopt the given desk size.
    pub fn resize(&mut self, desk: DeskSize) {
        self.cells = vec![None; desk.cells()];
        self.count = 0;
    }

    pub fn clear(&mut self) {
        self.cells.fill(None);
        self.count = 0;
    }

    /// Flip a cell between selected and unselected.
    ///
    /// Selecting is allowed only while fewer than `limit` cells are selected.
    pub fn toggle(&mut self, index: usize, limit: u32) -> Toggle {
        let allow_increment = self.count < limit;
        let Some(cell) = self.cells.get_mut(index) else {
            return Toggle::Rejected;
        };
        match cell {
            Some(_) => {
                *cell = None;
                self.count -= 1;
                Toggle::Deselected
            }
            None if allow_increment => {
                *cell = Some(index);
                self.count += 1;
                Toggle::Selected
            }
            None => Toggle::Rejected,
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::new(DeskSize::default())
    }
}

/// Default selection for a desk, truncated to `limit` cells.
pub fn default_pattern(desk: DeskSize, limit: u32) -> ArrayVec<usize, MAX_DEFAULT_PATTERN> {
    desk.autobet_pattern()
        .iter()
        .copied()
        .take(limit as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_selects_and_deselects() {
        let mut sel = Selection::new(DeskSize::Five);
        assert_eq!(sel.toggle(3, 5), Toggle::Selected);
        assert!(sel.is_selected(3));
        assert_eq!(sel.cells()[3], Some(3));
        assert_eq!(sel.count(), 1);
        assert_eq!(sel.toggle(3, 5), Toggle::Deselected);
        assert_eq!(sel.count(), 0);
        assert!(sel.is_empty());
    }

    #[test]
    fn toggle_respects_limit() {
        let mut sel = Selection::new(DeskSize::Five);
        assert_eq!(sel.toggle(0, 2), Toggle::Selected);
        assert_eq!(sel.toggle(1, 2), Toggle::Selected);
        assert_eq!(sel.toggle(2, 2), Toggle::Rejected);
        assert_eq!(sel.count(), 2);
        // Deselecting is always allowed.
        assert_eq!(sel.toggle(0, 2), Toggle::Deselected);
        assert_eq!(sel.toggle(2, 2), Toggle::Selected);
        assert_eq!(sel.indexes(), vec![1, 2]);
    }

    #[test]
    fn toggle_off_board_rejected() {
        let mut sel = Selection::new(DeskSize::Three);
        assert_eq!(sel.toggle(9, 5), Toggle::Rejected);
    }

    #[test]
    fn resize_clears() {
        let mut sel = Selection::new(DeskSize::Five);
        sel.toggle(4, 5);
        sel.resize(DeskSize::Nine);
        assert_eq!(sel.cells().len(), 81);
        assert_eq!(sel.count(), 0);
    }

    #[test]
    fn default_pattern_truncates() {
        assert_eq!(default_pattern(DeskSize::Five, 3).as_slice(), &[10, 11, 12]);
        assert_eq!(default_pattern(DeskSize::Five, 22).as_slice(), &[10, 11, 12, 13, 14]);
        assert!(default_pattern(DeskSize::Nine, 0).is_empty());
    }
}
