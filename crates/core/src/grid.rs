//! Grid module - board tiles and hit progression
//!
//! Fixed-size ordered sequence of tile states. The grid is resized only when
//! the desk size changes and never holds more diamonds than there are safe
//! cells for the configured mine count.

use tracing::warn;

use crate::types::{DeskSize, Tile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    desk: DeskSize,
    mines: u32,
    tiles: Vec<Tile>,
    hit: u32,
}

impl Grid {
    pub fn new(desk: DeskSize) -> Self {
        Self {
            desk,
            mines: desk.default_mines(),
            tiles: vec![Tile::Hidden; desk.cells()],
            hit: 0,
        }
    }

    pub fn desk(&self) -> DeskSize {
        self.desk
    }

    pub fn mines(&self) -> u32 {
        self.mines
    }

    pub fn set_mines(&mut self, mines: u32) {
        self.mines = mines;
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn get(&self, index: usize) -> Option<Tile> {
        self.tiles.get(index).copied()
    }

    pub fn hit(&self) -> u32 {
        self.hit
    }

    pub fn set_hit(&mut self, hit: u32) {
        self.hit = hit.min(self.safe_cells());
    }

    /// Number of non-mine cells for the current mine count
    pub fn safe_cells(&self) -> u32 {
        (self.desk.cells() as u32).saturating_sub(self.mines)
    }

    /// Reinitialise for a new desk size: all cells hidden, hit cleared.
    pub fn resize(&mut self, desk: DeskSize) {
        self.desk = desk;
        self.tiles = vec![Tile::Hidden; desk.cells()];
        self.hit = 0;
    }

    /// Hide every cell and clear the hit counter, keeping the desk size.
    pub fn clear(&mut self) {
        self.tiles.fill(Tile::Hidden);
        self.hit = 0;
    }

    /// Record a single reveal.
    ///
    /// A newly revealed diamond counts as a hit, capped at the number of safe
    /// cells. Returns `false` (and leaves the grid untouched) when `index` is
    /// off the board.
    pub fn reveal(&mut self, index: usize, outcome: Tile) -> bool {
        let Some(cell) = self.tiles.get_mut(index) else {
            warn!(index, cells = self.desk.cells(), "reveal outside the board ignored");
            return false;
        };
        let was_hidden = *cell == Tile::Hidden;
        *cell = outcome;
        if was_hidden && outcome == Tile::Diamond && self.hit < self.safe_cells() {
            self.hit += 1;
        }
        true
    }

    /// Show the full board once a round settles.
    ///
    /// Every index in `mines` becomes a mine, every other hidden cell a
    /// diamond. Returns the indices that were already revealed beforehand.
    pub fn reveal_all(&mut self, mines: &[usize]) -> Vec<usize> {
        let opened = self.revealed_indices();
        for (i, tile) in self.tiles.iter_mut().enumerate() {
            if mines.contains(&i) {
                *tile = Tile::Mine;
            } else if *tile == Tile::Hidden {
                *tile = Tile::Diamond;
            }
        }
        for &m in mines {
            if m >= self.tiles.len() {
                warn!(index = m, "settlement mine outside the board ignored");
            }
        }
        opened
    }

    /// Mark previously opened cells as diamonds (session recovery).
    pub fn restore(&mut self, opened: &[usize]) {
        self.tiles.fill(Tile::Hidden);
        for &i in opened {
            if let Some(cell) = self.tiles.get_mut(i) {
                *cell = Tile::Diamond;
            }
        }
        let restored = self.tiles.iter().filter(|t| **t == Tile::Diamond).count() as u32;
        self.set_hit(restored);
    }

    pub fn revealed_indices(&self) -> Vec<usize> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_revealed())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn revealed_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_revealed()).count()
    }

    /// True when no cell is hidden.
    pub fn is_fully_revealed(&self) -> bool {
        self.tiles.iter().all(|t| t.is_revealed())
    }

    pub fn is_touched(&self) -> bool {
        self.tiles.iter().any(|t| t.is_revealed())
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(DeskSize::default())
    }
}
