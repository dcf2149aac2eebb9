//! Fixed-size 2-D grid with bounds-checked access.
//!
//! Both engines sit on top of [`Grid`]. Coordinates are signed so that
//! neighbour arithmetic can step off the board and simply come back as
//! `None` from the accessors.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::GridError;

/// Direction - used for guard facing and neighbour ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// `(row, col)` offset of a single step in this direction.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

/// Position on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// One cell over. Saturates at the ends of the `i32` range.
    pub fn step(self, direction: Direction) -> Self {
        let (dr, dc) = direction.delta();
        self.offset(dr, dc)
    }

    fn offset(self, dr: i32, dc: i32) -> Self {
        Self::new(self.row.saturating_add(dr), self.col.saturating_add(dc))
    }

    /// The eight surrounding positions, unclipped, in row-major order.
    ///
    /// Coordinates saturate, so at the ends of the `i32` range some entries
    /// repeat or equal `self`.
    pub fn surrounding(self) -> [Position; 8] {
        [
            self.offset(-1, -1),
            self.offset(-1, 0),
            self.offset(-1, 1),
            self.offset(0, -1),
            self.offset(0, 1),
            self.offset(1, -1),
            self.offset(1, 0),
            self.offset(1, 1),
        ]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Row-major `rows x cols` array. Never empty.
///
/// Deserialization goes through the same shape checks as the constructors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid<T>")]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

/// Unchecked serialized form of a [`Grid`].
#[derive(Deserialize)]
struct RawGrid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T> TryFrom<RawGrid<T>> for Grid<T> {
    type Error = GridError;

    fn try_from(raw: RawGrid<T>) -> Result<Self, Self::Error> {
        let RawGrid { rows, cols, cells } = raw;
        if rows == 0 || cols == 0 {
            return Err(GridError::Empty { rows, cols });
        }
        if rows.checked_mul(cols) != Some(cells.len()) {
            return Err(GridError::Size {
                rows,
                cols,
                found: cells.len(),
            });
        }
        Ok(Self { rows, cols, cells })
    }
}

impl<T> Grid<T> {
    /// Build a grid by calling `init` for every position.
    pub fn from_fn(
        rows: usize,
        cols: usize,
        mut init: impl FnMut(Position) -> T,
    ) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::Empty { rows, cols });
        }
        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                cells.push(init(Position::new(row as i32, col as i32)));
            }
        }
        Ok(Self { rows, cols, cells })
    }

    /// Build a grid from nested rows; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if height == 0 || width == 0 {
            return Err(GridError::Empty {
                rows: height,
                cols: width,
            });
        }
        let mut cells = Vec::with_capacity(height * width);
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(GridError::Ragged {
                    row: index,
                    expected: width,
                    found: row.len(),
                });
            }
            cells.extend(row);
        }
        Ok(Self {
            rows: height,
            cols: width,
            cells,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.index_of(pos).is_some()
    }

    fn index_of(&self, pos: Position) -> Option<usize> {
        if pos.row < 0 || pos.col < 0 {
            return None;
        }
        let (row, col) = (pos.row as usize, pos.col as usize);
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(row * self.cols + col)
    }

    /// Get the cell at a position (bounds-checked)
    pub fn get(&self, pos: Position) -> Option<&T> {
        self.index_of(pos).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut T> {
        self.index_of(pos).map(move |i| &mut self.cells[i])
    }

    /// In-bounds members of the 8-neighbourhood of `pos`. Empty when `pos`
    /// itself is off the grid.
    pub fn neighbors(&self, pos: Position) -> SmallVec<[Position; 8]> {
        if !self.contains(pos) {
            return SmallVec::new();
        }
        pos.surrounding()
            .into_iter()
            .filter(|p| self.contains(*p))
            .collect()
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cells.len())
            .map(move |i| Position::new((i / self.cols) as i32, (i % self.cols) as i32))
    }

    /// Cells paired with their positions, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &T)> + '_ {
        self.positions().zip(self.cells.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.cells.iter_mut()
    }

    /// Rows as slices, top to bottom.
    pub fn row_slices(&self) -> impl Iterator<Item = &[T]> + '_ {
        self.cells.chunks(self.cols)
    }

    /// Same-shaped grid built from each cell and its position.
    pub fn map_with_position<U>(&self, mut f: impl FnMut(Position, &T) -> U) -> Grid<U> {
        Grid {
            rows: self.rows,
            cols: self.cols,
            cells: self.iter().map(|(pos, cell)| f(pos, cell)).collect(),
        }
    }
}
