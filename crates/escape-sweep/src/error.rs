//! Error types shared by the grid, the maze solver and the minesweeper engine.

use thiserror::Error;

use crate::grid::Position;
use crate::maze::Endpoint;

/// Errors raised while building a [`Grid`](crate::grid::Grid).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid must have at least one row and one column (got {rows}x{cols})")]
    Empty { rows: usize, cols: usize },
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("{rows}x{cols} grid does not match {found} cells")]
    Size {
        rows: usize,
        cols: usize,
        found: usize,
    },
}

/// Errors raised while parsing a maze board from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardParseError {
    #[error("unknown board character {ch:?} at row {row}, col {col}")]
    UnknownChar { ch: char, row: usize, col: usize },
    #[error("second {endpoint} cell at {second}, first was at {first}")]
    DuplicateEndpoint {
        endpoint: Endpoint,
        first: Position,
        second: Position,
    },
    #[error(transparent)]
    Shape(#[from] GridError),
}

/// Errors raised by [`MazeSolver::solve`](crate::solver::MazeSolver::solve).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error("board has no {missing} cell")]
    MissingEndpoint { missing: Endpoint },
}

/// Invalid engine configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("mine probability must be within [0, 1], got {0}")]
    Probability(f64),
    #[error(transparent)]
    Shape(#[from] GridError),
}
