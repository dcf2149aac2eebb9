//! Mine layout and per-cell play state.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, GridError};
use crate::grid::{Grid, Position};

/// Configuration for a minesweeper game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweeperConfig {
    pub rows: usize,
    pub cols: usize,
    /// Independent chance that any one cell holds a mine
    pub mine_probability: f64,
    /// Fixed seed for reproducible boards; fresh entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SweeperConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(GridError::Empty {
                rows: self.rows,
                cols: self.cols,
            }
            .into());
        }
        if !(0.0..=1.0).contains(&self.mine_probability) {
            return Err(ConfigError::Probability(self.mine_probability));
        }
        Ok(())
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            rows: 15,
            cols: 8,
            mine_probability: 0.1,
            seed: None,
        }
    }
}

/// A single minesweeper cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MineCell {
    position: Position,
    is_mine: bool,
    flagged: bool,
    swept: bool,
    revealed: bool,
    adjacent_count: Option<u8>,
}

impl MineCell {
    fn new(position: Position, is_mine: bool) -> Self {
        Self {
            position,
            is_mine,
            flagged: false,
            swept: false,
            revealed: false,
            adjacent_count: None,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_mine(&self) -> bool {
        self.is_mine
    }

    pub fn is_flagged(&self) -> bool {
        self.flagged
    }

    pub fn is_swept(&self) -> bool {
        self.swept
    }

    /// Mine shown after the game was lost.
    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Mines among the eight neighbours; `None` until swept.
    pub fn adjacent_count(&self) -> Option<u8> {
        self.adjacent_count
    }

    /// Flagged or swept.
    pub fn is_processed(&self) -> bool {
        self.flagged || self.swept
    }

    pub(crate) fn set_flagged(&mut self, flagged: bool) {
        self.flagged = flagged;
    }

    pub(crate) fn mark_swept(&mut self, count: u8) {
        self.adjacent_count = Some(count);
        self.swept = true;
    }

    pub(crate) fn reveal(&mut self) {
        self.revealed = true;
    }

    fn symbol(&self) -> char {
        if self.revealed && self.is_mine {
            '*'
        } else if self.flagged {
            'F'
        } else {
            match self.adjacent_count {
                Some(0) => ' ',
                Some(n) => char::from(b'0' + n),
                None => '#',
            }
        }
    }
}

/// Grid of mine cells. Mine placement never changes once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Minefield {
    cells: Grid<MineCell>,
}

impl Minefield {
    /// Independent draw per cell with probability `mine_probability`.
    pub fn generate<R: Rng>(
        rows: usize,
        cols: usize,
        mine_probability: f64,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&mine_probability) {
            return Err(ConfigError::Probability(mine_probability));
        }
        let cells = Grid::from_fn(rows, cols, |pos| {
            MineCell::new(pos, rng.gen_bool(mine_probability))
        })?;
        Ok(Self { cells })
    }

    /// Field with a fixed layout, `true` marking a mine.
    pub fn from_layout(mines: &Grid<bool>) -> Self {
        Self {
            cells: mines.map_with_position(|pos, &is_mine| MineCell::new(pos, is_mine)),
        }
    }

    /// Same-shaped field with a fresh independent draw per cell.
    ///
    /// `mine_probability` must already be validated.
    pub(crate) fn redraw<R: Rng>(&self, mine_probability: f64, rng: &mut R) -> Self {
        Self {
            cells: self
                .cells
                .map_with_position(|pos, _| MineCell::new(pos, rng.gen_bool(mine_probability))),
        }
    }

    pub fn rows(&self) -> usize {
        self.cells.rows()
    }

    pub fn cols(&self) -> usize {
        self.cells.cols()
    }

    pub fn cells(&self) -> &Grid<MineCell> {
        &self.cells
    }

    pub fn get(&self, pos: Position) -> Option<&MineCell> {
        self.cells.get(pos)
    }

    pub(crate) fn get_mut(&mut self, pos: Position) -> Option<&mut MineCell> {
        self.cells.get_mut(pos)
    }

    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = &MineCell> + '_ {
        self.cells
            .neighbors(pos)
            .into_iter()
            .filter_map(move |p| self.cells.get(p))
    }

    /// Mines among the (edge-clipped) eight neighbours of `pos`.
    pub fn mines_around(&self, pos: Position) -> u8 {
        self.neighbors(pos).filter(|c| c.is_mine()).count() as u8
    }

    pub fn total_mines(&self) -> usize {
        self.count(MineCell::is_mine)
    }

    pub fn total_flagged(&self) -> usize {
        self.count(MineCell::is_flagged)
    }

    pub fn total_swept(&self) -> usize {
        self.count(MineCell::is_swept)
    }

    fn count(&self, predicate: impl Fn(&MineCell) -> bool) -> usize {
        self.cells.iter().filter(|(_, c)| predicate(*c)).count()
    }

    /// Every mine flagged and every cell processed.
    ///
    /// A safe cell left flagged still counts as processed.
    pub fn is_cleared(&self) -> bool {
        self.cells
            .iter()
            .all(|(_, c)| c.is_processed() && (!c.is_mine() || c.is_flagged()))
    }

    pub(crate) fn reveal_mines(&mut self) {
        for cell in self.cells.iter_mut() {
            if cell.is_mine {
                cell.reveal();
            }
        }
    }
}

impl fmt::Display for Minefield {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.row_slices() {
            let line: String = row.iter().map(MineCell::symbol).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn layout(rows: &[&str]) -> Minefield {
        let mines: Vec<Vec<bool>> = rows
            .iter()
            .map(|r| r.chars().map(|c| c == '*').collect())
            .collect();
        Minefield::from_layout(&Grid::from_rows(mines).unwrap())
    }

    #[test]
    fn test_mines_around() {
        let field = layout(&["*..", "**.", "..."]);
        assert_eq!(field.mines_around(Position::new(0, 1)), 3);
        assert_eq!(field.mines_around(Position::new(2, 2)), 1);
        assert_eq!(field.mines_around(Position::new(1, 1)), 2);
        assert_eq!(field.mines_around(Position::new(0, 2)), 1);
    }

    #[test]
    fn test_off_grid_queries_are_empty() {
        let field = layout(&["**", "**"]);
        assert_eq!(field.mines_around(Position::new(i32::MAX, 0)), 0);
        assert_eq!(field.mines_around(Position::new(2, 2)), 0);
        assert_eq!(field.neighbors(Position::new(0, i32::MIN)).count(), 0);
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(serde_json::from_str::<Minefield>(r#"{"cells":{"rows":0,"cols":0,"cells":[]}}"#).is_err());

        let field = layout(&["*.", ".."]);
        let json = serde_json::to_string(&field).unwrap();
        let back: Minefield = serde_json::from_str(&json).unwrap();
        assert_eq!(back, field);
    }

    #[test]
    fn test_generate_extremes() {
        let mut rng = StdRng::seed_from_u64(7);
        let empty = Minefield::generate(4, 5, 0.0, &mut rng).unwrap();
        assert_eq!(empty.total_mines(), 0);
        let full = Minefield::generate(4, 5, 1.0, &mut rng).unwrap();
        assert_eq!(full.total_mines(), 20);
    }

    #[test]
    fn test_generate_seeded_is_reproducible() {
        let a = Minefield::generate(10, 10, 0.3, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = Minefield::generate(10, 10, 0.3, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_generate_rejects_bad_input() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            Minefield::generate(3, 3, 1.5, &mut rng).unwrap_err(),
            ConfigError::Probability(1.5)
        );
        assert!(matches!(
            Minefield::generate(0, 3, 0.1, &mut rng),
            Err(ConfigError::Shape(_))
        ));
    }

    #[test]
    fn test_config_validate() {
        assert!(SweeperConfig::default().validate().is_ok());
        let bad = SweeperConfig {
            mine_probability: -0.1,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let flat = SweeperConfig {
            rows: 0,
            ..Default::default()
        };
        assert!(flat.validate().is_err());
    }

    #[test]
    fn test_display_symbols() {
        let mut field = layout(&["*.", ".."]);
        field.get_mut(Position::new(1, 1)).unwrap().mark_swept(1);
        field.get_mut(Position::new(0, 1)).unwrap().set_flagged(true);
        assert_eq!(field.to_string(), "#F\n#1\n");
        field.reveal_mines();
        assert_eq!(field.to_string(), "*F\n#1\n");
    }
}
