//! FILENAME: core/hypercube/src/page.rs
//! Page windows over the virtual result grid, and the data they yield.
//!
//! A `Page` addresses rows [top, top+height) and columns [left, left+width).
//! The grid itself is never materialized client side.

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::error::{HyperCubeError, HyperCubeResult};

// ============================================================================
// PAGE (REQUEST)
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Page {
    pub top: usize,
    pub left: usize,
    pub width: usize,
    pub height: usize,
}

impl Page {
    pub fn new(top: usize, left: usize, width: usize, height: usize) -> Self {
        Page {
            top,
            left,
            width,
            height,
        }
    }

    /// A window anchored at the grid origin.
    pub fn with_size(width: usize, height: usize) -> Self {
        Page::new(0, 0, width, height)
    }

    /// First row below the window.
    pub fn bottom(&self) -> usize {
        self.top.saturating_add(self.height)
    }

    /// First column right of the window.
    pub fn right(&self) -> usize {
        self.left.saturating_add(self.width)
    }

    pub fn cell_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    pub fn validate(&self) -> HyperCubeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(HyperCubeError::validation(format!(
                "page {}x{} at ({}, {}) has no area",
                self.width, self.height, self.top, self.left
            )));
        }
        Ok(())
    }

    /// The same window moved to start at `top`.
    pub fn at_top(&self, top: usize) -> Page {
        Page { top, ..*self }
    }

    /// The window directly below this one.
    pub fn next_down(&self) -> Page {
        self.at_top(self.bottom())
    }

    /// The window directly above this one, clamped at row 0.
    pub fn previous_up(&self) -> Page {
        self.at_top(self.top.saturating_sub(self.height))
    }
}

// ============================================================================
// GRID SIZE / EDGES
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: usize,
    pub columns: usize,
}

impl GridSize {
    pub fn new(rows: usize, columns: usize) -> Self {
        GridSize { rows, columns }
    }

    /// Whether `page` reaches or crosses the bottom and right edges.
    pub fn edges_of(&self, page: &Page) -> EdgeFlags {
        EdgeFlags {
            rows: page.bottom() >= self.rows,
            columns: page.right() >= self.columns,
        }
    }
}

/// Edge flags of the most recent fetch of a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeFlags {
    /// No rows exist below the window.
    pub rows: bool,
    /// No columns exist right of the window.
    pub columns: bool,
}

// ============================================================================
// DATA PAGE (RESPONSE)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPage {
    /// The requested window, echoed back.
    pub area: Page,
    /// Rows of cells. May hold fewer rows or columns than `area` at the edges.
    pub matrix: Vec<Vec<Cell>>,
    pub outside_edge: EdgeFlags,
}

impl DataPage {
    pub fn new(area: Page, matrix: Vec<Vec<Cell>>, outside_edge: EdgeFlags) -> Self {
        DataPage {
            area,
            matrix,
            outside_edge,
        }
    }

    /// The result of paging beyond an edge: no cells, no round trip.
    pub fn past_edge(area: Page, outside_edge: EdgeFlags) -> Self {
        DataPage::new(area, Vec::new(), outside_edge)
    }

    pub fn row_count(&self) -> usize {
        self.matrix.len()
    }

    pub fn column_count(&self) -> usize {
        self.matrix.first().map_or(0, |row| row.len())
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.matrix.get(row).and_then(|r| r.get(col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_moves() {
        let page = Page::new(5, 0, 2, 5);
        assert_eq!(page.next_down(), Page::new(10, 0, 2, 5));
        assert_eq!(page.previous_up(), Page::new(0, 0, 2, 5));
        assert_eq!(Page::new(3, 1, 2, 5).previous_up(), Page::new(0, 1, 2, 5));
    }

    #[test]
    fn test_zero_area_rejected() {
        assert!(Page::with_size(0, 10).validate().is_err());
        assert!(Page::with_size(2, 0).validate().is_err());
        assert!(Page::with_size(2, 10).validate().is_ok());
    }

    #[test]
    fn test_edges() {
        let grid = GridSize::new(12, 2);
        assert_eq!(
            grid.edges_of(&Page::new(5, 0, 2, 5)),
            EdgeFlags { rows: false, columns: true }
        );
        assert!(grid.edges_of(&Page::new(10, 0, 2, 5)).rows);
        assert!(grid.edges_of(&Page::new(7, 0, 2, 5)).rows);
        assert!(!grid.edges_of(&Page::new(0, 0, 1, 5)).columns);
    }

    #[test]
    fn test_empty_grid_is_always_at_edge() {
        let grid = GridSize::new(0, 0);
        let flags = grid.edges_of(&Page::with_size(1, 10));
        assert!(flags.rows && flags.columns);
    }
}
