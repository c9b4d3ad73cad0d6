// THEORY:
// The `Grid` is a row-major window onto the padded world. The full world is
// (S+2)x(S+2) cells: the logical S x S automaton surrounded by a frame of cells
// that are permanently dead, so edge cells can be evolved with the same
// neighbour arithmetic as interior ones (no wraparound).
//
// A worker never holds the whole world. It holds a horizontal slice of it:
// every column, but only the rows of its band plus the halo rows it borrows
// from neighbours. `first_row` records where that slice sits in the padded
// world, and every accessor takes *global* padded row numbers so band and halo
// arithmetic never has to translate between local and global coordinates.
//
// Evolution reads one grid and writes another (double buffering): every cell
// of generation g+1 is computed from an untouched snapshot of generation g.

use crate::core_modules::cell::cell::Cell;
use crate::error::{Result, SetlError};
use std::ops::Range;

/// A contiguous block of full-width rows of the padded world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    /// Global padded row number of local row 0.
    first_row: usize,
    /// Number of rows held.
    rows: usize,
    /// Row stride; always S+2 for world slices.
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Allocates an all-dead slice covering global rows `first_row..first_row + rows`.
    pub fn try_new(first_row: usize, rows: usize, cols: usize) -> Result<Self> {
        let len = rows.checked_mul(cols).ok_or(SetlError::Allocation {
            cells: usize::MAX,
            context: "sizing a grid buffer",
        })?;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| SetlError::Allocation {
                cells: len,
                context: "allocating a grid buffer",
            })?;
        cells.resize(len, Cell::Dead);
        Ok(Self {
            first_row,
            rows,
            cols,
            cells,
        })
    }

    /// A whole padded world for a logical `size` x `size` automaton.
    pub fn padded(size: usize) -> Result<Self> {
        let side = size.checked_add(2).ok_or(SetlError::Allocation {
            cells: usize::MAX,
            context: "sizing a padded world",
        })?;
        Self::try_new(0, side, side)
    }

    /// A fallibly allocated copy, for spare buffers of the same shape.
    pub fn try_clone(&self) -> Result<Self> {
        self.window(self.row_span())
    }

    pub fn first_row(&self) -> usize {
        self.first_row
    }

    pub fn height(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.cols
    }

    /// Global padded rows covered by this slice.
    pub fn row_span(&self) -> Range<usize> {
        self.first_row..self.first_row + self.rows
    }

    /// Logical edge length S, assuming a padded width of S+2.
    pub fn logical_size(&self) -> usize {
        self.cols.saturating_sub(2)
    }

    fn offset(&self, row: usize, col: usize) -> usize {
        debug_assert!(self.row_span().contains(&row), "row {row} outside {:?}", self.row_span());
        debug_assert!(col < self.cols);
        (row - self.first_row) * self.cols + col
    }

    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[self.offset(row, col)]
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        let idx = self.offset(row, col);
        self.cells[idx] = cell;
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        let start = self.offset(row, 0);
        &self.cells[start..start + self.cols]
    }

    /// The cells of a contiguous run of global rows, row-major.
    pub fn rows_slice(&self, rows: Range<usize>) -> &[Cell] {
        if rows.is_empty() {
            return &[];
        }
        let start = self.offset(rows.start, 0);
        &self.cells[start..start + rows.len() * self.cols]
    }

    /// Overwrites rows starting at global row `first` with `cells`.
    ///
    /// Returns `false` without touching anything if the rows do not fit.
    pub fn write_rows(&mut self, first: usize, cells: &[Cell]) -> bool {
        if self.cols == 0 || cells.len() % self.cols != 0 {
            return false;
        }
        let count = cells.len() / self.cols;
        let span = self.row_span();
        if first < span.start || first + count > span.end {
            return false;
        }
        let start = (first - self.first_row) * self.cols;
        self.cells[start..start + cells.len()].copy_from_slice(cells);
        true
    }

    /// Copies global rows `rows` out into a new slice.
    pub fn window(&self, rows: Range<usize>) -> Result<Grid> {
        let mut out = Grid::try_new(rows.start, rows.len(), self.cols)?;
        out.cells.copy_from_slice(self.rows_slice(rows));
        Ok(out)
    }

    /// Live cells among the 8 Moore neighbours of an interior position.
    pub fn count_neighbours(&self, row: usize, col: usize) -> u8 {
        let mut count = 0;
        for r in row - 1..=row + 1 {
            let line = self.row(r);
            for c in col - 1..=col + 1 {
                count += line[c] as u8;
            }
        }
        count - self.get(row, col) as u8
    }

    /// Writes generation g+1 of global rows `rows` into `next`.
    ///
    /// Only the logical columns `1..=S` are written, so the frame columns of
    /// `next` stay dead. Rows outside `rows` are left untouched.
    pub fn evolve_into(&self, next: &mut Grid, rows: Range<usize>) {
        debug_assert_eq!(self.cols, next.cols);
        for row in rows {
            for col in 1..self.cols.saturating_sub(1) {
                let cell = next_state(self.get(row, col), self.count_neighbours(row, col));
                next.set(row, col, cell);
            }
        }
    }

    /// Renders the logical cells of the held rows, one text line per row.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.rows * self.cols);
        for row in self.row_span() {
            let line = self.row(row);
            out.extend(line[1..self.cols - 1].iter().map(|c| c.to_char()));
            out.push('\n');
        }
        out
    }
}

/// Conway's rule: survive on 2 or 3, birth on exactly 3.
pub fn next_state(cell: Cell, live_neighbours: u8) -> Cell {
    match (cell, live_neighbours) {
        (Cell::Alive, 2) | (Cell::Alive, 3) => Cell::Alive,
        (Cell::Dead, 3) => Cell::Alive,
        _ => Cell::Dead,
    }
}
