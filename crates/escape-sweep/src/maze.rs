//! Escape board representation and laser-guard line of sight.
//!
//! Boards are written one string per row:
//!
//! | char | terrain            |
//! |------|--------------------|
//! | `.`  | open floor         |
//! | `x`  | wall               |
//! | `^` `v` `<` `>` | guard facing up / down / left / right |
//! | `A`  | start              |
//! | `B`  | goal               |

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::BoardParseError;
use crate::grid::{Direction, Grid, Position};

/// What occupies a single board cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    Open,
    Wall,
    Guard(Direction),
    Start,
    Goal,
}

impl Terrain {
    pub fn from_char(ch: char) -> Option<Terrain> {
        Some(match ch {
            '.' => Terrain::Open,
            'x' | 'X' => Terrain::Wall,
            '^' => Terrain::Guard(Direction::Up),
            'v' => Terrain::Guard(Direction::Down),
            '<' => Terrain::Guard(Direction::Left),
            '>' => Terrain::Guard(Direction::Right),
            'A' => Terrain::Start,
            'B' => Terrain::Goal,
            _ => return None,
        })
    }

    pub fn to_char(self) -> char {
        match self {
            Terrain::Open => '.',
            Terrain::Wall => 'x',
            Terrain::Guard(Direction::Up) => '^',
            Terrain::Guard(Direction::Down) => 'v',
            Terrain::Guard(Direction::Left) => '<',
            Terrain::Guard(Direction::Right) => '>',
            Terrain::Start => 'A',
            Terrain::Goal => 'B',
        }
    }

    /// Can the escapee stand here (ignoring laser fire)?
    pub fn is_passable(self) -> bool {
        matches!(self, Terrain::Open | Terrain::Start | Terrain::Goal)
    }

    pub fn guard_facing(self) -> Option<Direction> {
        match self {
            Terrain::Guard(direction) => Some(direction),
            _ => None,
        }
    }
}

/// Which end of the escape route is absent from a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Start,
    Goal,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Start => f.write_str("start"),
            Endpoint::Goal => f.write_str("goal"),
        }
    }
}

/// The original escape layout: sixteen rows of ten, exit in the bottom-right corner.
const ESCAPE_DEMO: [&str; 16] = [
    "..........",
    ".>...x..x.",
    "...x....<.",
    ".....^....",
    ".....v.>..",
    "...>.x..x.",
    "...>..x...",
    ".>....xxx.",
    ".....^..x.",
    ".x.<....x.",
    "..x...<x..",
    "....x...^.",
    "....x.....",
    "....x.....",
    ".A..x.x.<x",
    "....x....B",
];

/// Static board layout handed to the solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct MazeBoard {
    grid: Grid<Terrain>,
}

impl MazeBoard {
    pub fn new(grid: Grid<Terrain>) -> Self {
        Self { grid }
    }

    /// Parse a board from one string per row.
    pub fn parse_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, BoardParseError> {
        let mut parsed = Vec::with_capacity(rows.len());
        for (row, line) in rows.iter().enumerate() {
            let mut cells = Vec::new();
            for (col, ch) in line.as_ref().chars().enumerate() {
                let terrain =
                    Terrain::from_char(ch).ok_or(BoardParseError::UnknownChar { ch, row, col })?;
                cells.push(terrain);
            }
            parsed.push(cells);
        }
        let board = Self::new(Grid::from_rows(parsed)?);
        board.check_unique_endpoints()?;
        Ok(board)
    }

    fn check_unique_endpoints(&self) -> Result<(), BoardParseError> {
        let mut first_start = None;
        let mut first_goal = None;
        for (pos, terrain) in self.grid.iter() {
            let (endpoint, first) = match terrain {
                Terrain::Start => (Endpoint::Start, &mut first_start),
                Terrain::Goal => (Endpoint::Goal, &mut first_goal),
                _ => continue,
            };
            if let Some(earlier) = *first {
                return Err(BoardParseError::DuplicateEndpoint {
                    endpoint,
                    first: earlier,
                    second: pos,
                });
            }
            *first = Some(pos);
        }
        Ok(())
    }

    pub fn escape_demo() -> Self {
        // The layout is a checked-in constant; a parse failure here is a typo in the table.
        Self::parse_rows(&ESCAPE_DEMO).expect("escape demo layout is well formed")
    }

    pub fn grid(&self) -> &Grid<Terrain> {
        &self.grid
    }

    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols()
    }

    /// Terrain at a position (bounds-checked)
    pub fn terrain(&self, pos: Position) -> Option<Terrain> {
        self.grid.get(pos).copied()
    }

    pub fn set_terrain(&mut self, pos: Position, terrain: Terrain) -> bool {
        match self.grid.get_mut(pos) {
            Some(cell) => {
                *cell = terrain;
                true
            }
            None => false,
        }
    }

    /// First cell carrying `terrain`, scanning row-major.
    pub fn find(&self, terrain: Terrain) -> Option<Position> {
        self.grid
            .iter()
            .find(|(_, t)| **t == terrain)
            .map(|(pos, _)| pos)
    }

    /// The `A` cell. Parsed boards hold at most one; on a board built with
    /// [`MazeBoard::new`] or edited afterwards the first in row-major order wins.
    pub fn start(&self) -> Option<Position> {
        self.find(Terrain::Start)
    }

    /// The `B` cell, first in row-major order like [`start`](Self::start).
    pub fn goal(&self) -> Option<Position> {
        self.find(Terrain::Goal)
    }

    /// Cells under laser fire.
    ///
    /// Each guard's ray walks away from the guard and marks every open cell
    /// until it meets a non-open cell or the edge. The blocking cell is not
    /// marked. Overlapping rays collapse into one set.
    #[instrument(skip(self), fields(rows = self.rows(), cols = self.cols()))]
    pub fn guarded_cells(&self) -> HashSet<Position> {
        let mut guarded = HashSet::new();
        for (origin, terrain) in self.grid.iter() {
            let Some(facing) = terrain.guard_facing() else {
                continue;
            };
            let mut cursor = origin.step(facing);
            while self.terrain(cursor) == Some(Terrain::Open) {
                guarded.insert(cursor);
                cursor = cursor.step(facing);
            }
        }
        debug!(guarded = guarded.len(), "computed guard rays");
        guarded
    }
}

impl FromStr for MazeBoard {
    type Err = BoardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rows: Vec<&str> = s
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        Self::parse_rows(&rows)
    }
}

impl TryFrom<Vec<String>> for MazeBoard {
    type Error = BoardParseError;

    fn try_from(rows: Vec<String>) -> Result<Self, Self::Error> {
        Self::parse_rows(&rows)
    }
}

impl From<MazeBoard> for Vec<String> {
    fn from(board: MazeBoard) -> Self {
        board
            .grid
            .row_slices()
            .map(|row| row.iter().map(|t| t.to_char()).collect())
            .collect()
    }
}

impl fmt::Display for MazeBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.grid.row_slices() {
            let line: String = row.iter().map(|t| t.to_char()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(rows: &[&str]) -> MazeBoard {
        MazeBoard::parse_rows(rows).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let text = "A.x\n.>.\nv.B\n";
        let parsed: MazeBoard = text.parse().unwrap();
        assert_eq!(parsed.start(), Some(Position::new(0, 0)));
        assert_eq!(parsed.goal(), Some(Position::new(2, 2)));
        assert_eq!(
            parsed.terrain(Position::new(1, 1)),
            Some(Terrain::Guard(Direction::Right))
        );
        assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn test_parse_rejects_unknown_char() {
        let err = MazeBoard::parse_rows(&["..", ".?"]).unwrap_err();
        assert_eq!(
            err,
            BoardParseError::UnknownChar {
                ch: '?',
                row: 1,
                col: 1
            }
        );
    }

    #[test]
    fn test_parse_rejects_ragged_rows() {
        assert!(matches!(
            MazeBoard::parse_rows(&["...", ".."]),
            Err(BoardParseError::Shape(_))
        ));
    }

    #[test]
    fn test_parse_rejects_second_endpoint() {
        assert_eq!(
            MazeBoard::parse_rows(&["A.B", "..A"]).unwrap_err(),
            BoardParseError::DuplicateEndpoint {
                endpoint: Endpoint::Start,
                first: Position::new(0, 0),
                second: Position::new(1, 2),
            }
        );
        assert!(matches!(
            "B..\n.AB".parse::<MazeBoard>(),
            Err(BoardParseError::DuplicateEndpoint {
                endpoint: Endpoint::Goal,
                ..
            })
        ));
        assert!(serde_json::from_str::<MazeBoard>(r#"["AA","BB"]"#).is_err());
    }

    #[test]
    fn test_unchecked_board_uses_first_endpoint() {
        let mut b = board(&["A..", "..B"]);
        assert!(b.set_terrain(Position::new(1, 0), Terrain::Start));
        assert_eq!(b.start(), Some(Position::new(0, 0)));
    }

    #[test]
    fn test_ray_stops_before_blocking_cell() {
        let b = board(&[">..x.."]);
        let guarded = b.guarded_cells();
        assert_eq!(
            guarded,
            HashSet::from([Position::new(0, 1), Position::new(0, 2)])
        );
    }

    #[test]
    fn test_ray_reaches_edge() {
        let b = board(&["...", "...", "..^"]);
        let guarded = b.guarded_cells();
        assert_eq!(
            guarded,
            HashSet::from([Position::new(1, 2), Position::new(0, 2)])
        );
    }

    #[test]
    fn test_ray_stopped_by_start_and_goal() {
        let b = board(&["<.A.", "...B", "...^"]);
        let guarded = b.guarded_cells();
        // `<` at the left edge projects nothing; `^` stops at the goal.
        assert!(guarded.is_empty());
    }

    #[test]
    fn test_overlapping_rays_union() {
        let b = board(&["v..", "...", "^.."]);
        let guarded = b.guarded_cells();
        assert_eq!(guarded, HashSet::from([Position::new(1, 0)]));
    }

    #[test]
    fn test_guard_computation_idempotent() {
        let b = MazeBoard::escape_demo();
        assert_eq!(b.guarded_cells(), b.guarded_cells());
    }

    #[test]
    fn test_escape_demo_shape() {
        let b = MazeBoard::escape_demo();
        assert_eq!((b.rows(), b.cols()), (16, 10));
        assert_eq!(b.start(), Some(Position::new(14, 1)));
        assert_eq!(b.goal(), Some(Position::new(15, 9)));
    }

    #[test]
    fn test_json_round_trip_as_row_strings() {
        let b = board(&["A.", "xB"]);
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, r#"["A.","xB"]"#);
        let back: MazeBoard = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }
}
