//! Grid game engines: an escape-route solver and a minesweeper board.
//!
//! The escape solver finds a way from `A` to `B` on a board patrolled by
//! laser guards whose rays block every open cell in their line of sight.
//! The minesweeper engine tracks sweeps and flags, flood-fills empty
//! regions and flags cells whose status follows from neighbouring counts.
//!
//! Both are plain state machines with no I/O; a host UI feeds them input
//! and reads their state back.

pub mod error;
pub mod grid;
pub mod maze;
pub mod minefield;
pub mod solver;
pub mod sweeper;

// Re-export main types
pub use error::{BoardParseError, ConfigError, GridError, SolveError};
pub use grid::{Direction, Grid, Position};
pub use maze::{Endpoint, MazeBoard, Terrain};
pub use minefield::{MineCell, Minefield, SweeperConfig};
pub use solver::{MazeSolver, SolveHandle, SolveReport, SolverConfig, Strategy};
pub use sweeper::{FloodStep, GameOutcome, Minesweeper, SweepEffect};
