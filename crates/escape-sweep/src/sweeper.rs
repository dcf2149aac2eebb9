//! Minesweeper game engine.
//!
//! The engine owns one [`Minefield`] and moves it through sweeps and flags.
//! A sweep that lands on a zero cell starts a flood-fill. Hosts that want to
//! animate the reveal call [`Minesweeper::begin_sweep`] and drain it with
//! [`Minesweeper::advance`]; everyone else calls [`Minesweeper::sweep`],
//! which runs the flood-fill to completion. While a flood-fill is pending
//! the engine is busy and ignores further sweeps and flags.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, instrument, trace};

use crate::error::ConfigError;
use crate::grid::{Grid, Position};
use crate::minefield::{MineCell, Minefield, SweeperConfig};

/// State of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameOutcome {
    InProgress,
    Won,
    Lost,
}

impl GameOutcome {
    pub fn is_over(self) -> bool {
        self != GameOutcome::InProgress
    }
}

/// What a sweep did to the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepEffect {
    /// Off the board, flagged, game over, or a flood-fill is running
    Ignored,
    /// Hit a mine; the game is lost
    Exploded,
    /// Cells swept by this action, including any flood-fill, and cells
    /// flagged by the follow-up deduction pass
    Swept {
        revealed: Vec<Position>,
        auto_flagged: Vec<Position>,
    },
    /// Only returned by `begin_sweep`: a zero cell was swept and a
    /// flood-fill is now pending
    Flooding { revealed: Vec<Position> },
}

/// Progress made by one call to [`Minesweeper::advance`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FloodStep {
    pub revealed: Vec<Position>,
    /// `Some` once the flood-fill has finished and auto-flagging ran
    pub auto_flagged: Option<Vec<Position>>,
}

/// Pending flood-fill. The seen set lives only as long as one flood-fill.
#[derive(Debug)]
struct FloodFill {
    frontier: VecDeque<Position>,
    seen: HashSet<Position>,
}

impl FloodFill {
    fn new(origin: Position) -> Self {
        Self {
            frontier: VecDeque::from([origin]),
            seen: HashSet::from([origin]),
        }
    }
}

/// A minesweeper game
#[derive(Debug)]
pub struct Minesweeper {
    config: SweeperConfig,
    rng: StdRng,
    field: Minefield,
    outcome: GameOutcome,
    flood: Option<FloodFill>,
}

impl Minesweeper {
    pub fn new(config: SweeperConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let field = Minefield::generate(config.rows, config.cols, config.mine_probability, &mut rng)?;
        debug!(
            rows = config.rows,
            cols = config.cols,
            mines = field.total_mines(),
            "new minesweeper game"
        );
        Ok(Self {
            config,
            rng,
            field,
            outcome: GameOutcome::InProgress,
            flood: None,
        })
    }

    /// Game on a fixed layout. Restarting it draws a random board of the
    /// same size with the default mine probability.
    pub fn from_layout(mines: &Grid<bool>) -> Self {
        let config = SweeperConfig {
            rows: mines.rows(),
            cols: mines.cols(),
            ..SweeperConfig::default()
        };
        Self {
            config,
            rng: StdRng::from_entropy(),
            field: Minefield::from_layout(mines),
            outcome: GameOutcome::InProgress,
            flood: None,
        }
    }

    /// Throw the board away and deal a new one.
    #[instrument(skip(self))]
    pub fn restart(&mut self) {
        self.field = self.field.redraw(self.config.mine_probability, &mut self.rng);
        self.outcome = GameOutcome::InProgress;
        self.flood = None;
        debug!(mines = self.field.total_mines(), "board redrawn");
    }

    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    pub fn field(&self) -> &Minefield {
        &self.field
    }

    pub fn cell(&self, x: i32, y: i32) -> Option<&MineCell> {
        self.field.get(Position::new(x, y))
    }

    pub fn outcome(&self) -> GameOutcome {
        self.outcome
    }

    /// A flood-fill is pending.
    pub fn is_busy(&self) -> bool {
        self.flood.is_some()
    }

    pub fn total_mines(&self) -> usize {
        self.field.total_mines()
    }

    pub fn total_flagged(&self) -> usize {
        self.field.total_flagged()
    }

    pub fn total_swept(&self) -> usize {
        self.field.total_swept()
    }

    /// Mines minus flags. Negative when the player over-flags.
    pub fn mines_left(&self) -> i64 {
        self.total_mines() as i64 - self.total_flagged() as i64
    }

    fn accepts_input(&self) -> bool {
        if self.is_busy() {
            trace!("input ignored: flood-fill in progress");
            return false;
        }
        if self.outcome.is_over() {
            trace!(outcome = ?self.outcome, "input ignored: game over");
            return false;
        }
        true
    }

    /// Sweep a cell and run any resulting flood-fill to completion.
    pub fn sweep(&mut self, x: i32, y: i32) -> SweepEffect {
        match self.begin_sweep(x, y) {
            SweepEffect::Flooding { mut revealed } => {
                let rest = self.finish_pending().unwrap_or_default();
                revealed.extend(rest.revealed);
                SweepEffect::Swept {
                    revealed,
                    auto_flagged: rest.auto_flagged.unwrap_or_default(),
                }
            }
            other => other,
        }
    }

    /// Sweep a cell, leaving any flood-fill pending for [`advance`](Self::advance).
    #[instrument(skip(self))]
    pub fn begin_sweep(&mut self, x: i32, y: i32) -> SweepEffect {
        if !self.accepts_input() {
            return SweepEffect::Ignored;
        }
        let pos = Position::new(x, y);
        let Some(cell) = self.field.get(pos) else {
            return SweepEffect::Ignored;
        };
        if cell.is_flagged() {
            return SweepEffect::Ignored;
        }
        if cell.is_mine() {
            self.outcome = GameOutcome::Lost;
            self.field.reveal_mines();
            debug!(%pos, "mine hit, game lost");
            return SweepEffect::Exploded;
        }

        let count = self.sweep_cell(pos);
        if count == 0 {
            self.flood = Some(FloodFill::new(pos));
            SweepEffect::Flooding {
                revealed: vec![pos],
            }
        } else {
            self.check_win();
            SweepEffect::Swept {
                revealed: vec![pos],
                auto_flagged: Vec::new(),
            }
        }
    }

    /// Expand the pending flood-fill by one cell's neighbourhood.
    ///
    /// Returns `None` when nothing is pending. When the frontier runs dry
    /// the flood-fill ends, auto-flagging runs and the win is re-checked.
    pub fn advance(&mut self) -> Option<FloodStep> {
        let mut flood = self.flood.take()?;
        let mut step = FloodStep::default();

        if let Some(origin) = flood.frontier.pop_front() {
            for neighbor in self.field.cells().neighbors(origin) {
                let Some(cell) = self.field.get(neighbor) else {
                    continue;
                };
                if cell.is_flagged() || !flood.seen.insert(neighbor) {
                    continue;
                }
                // Mines stay hidden; swept cells were handled by an earlier sweep.
                if cell.is_mine() || cell.is_swept() {
                    continue;
                }
                if self.sweep_cell(neighbor) == 0 {
                    flood.frontier.push_back(neighbor);
                }
                step.revealed.push(neighbor);
            }
        }

        if flood.frontier.is_empty() {
            debug!(seen = flood.seen.len(), "flood-fill finished");
            step.auto_flagged = Some(self.auto_flag());
            self.check_win();
        } else {
            self.flood = Some(flood);
        }
        Some(step)
    }

    /// Drain the pending flood-fill, if any.
    pub fn finish_pending(&mut self) -> Option<FloodStep> {
        let mut total = FloodStep::default();
        let mut ran = false;
        while let Some(step) = self.advance() {
            ran = true;
            total.revealed.extend(step.revealed);
            if step.auto_flagged.is_some() {
                total.auto_flagged = step.auto_flagged;
            }
        }
        ran.then_some(total)
    }

    /// Toggle the flag on a cell. Returns whether anything changed.
    #[instrument(skip(self))]
    pub fn flag(&mut self, x: i32, y: i32) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let Some(cell) = self.field.get_mut(Position::new(x, y)) else {
            return false;
        };
        cell.set_flagged(!cell.is_flagged());
        self.check_win();
        true
    }

    fn sweep_cell(&mut self, pos: Position) -> u8 {
        let count = self.field.mines_around(pos);
        if let Some(cell) = self.field.get_mut(pos) {
            cell.mark_swept(count);
        }
        count
    }

    /// Flag every unswept neighbour of a numbered cell whose unswept
    /// neighbour count equals its number. Trusts the arithmetic; the
    /// flagged cells are not checked against the mine layout.
    fn auto_flag(&mut self) -> Vec<Position> {
        let mut deduced = Vec::new();
        for (pos, cell) in self.field.cells().iter() {
            let Some(count) = cell.adjacent_count().filter(|&c| c > 0) else {
                continue;
            };
            let unswept: SmallVec<[Position; 8]> = self
                .field
                .neighbors(pos)
                .filter(|n| !n.is_swept())
                .map(MineCell::position)
                .collect();
            if unswept.len() == usize::from(count) {
                deduced.extend(unswept);
            }
        }
        deduced.sort();
        deduced.dedup();

        let mut flagged = Vec::new();
        for pos in deduced {
            if let Some(cell) = self.field.get_mut(pos) {
                if !cell.is_flagged() {
                    cell.set_flagged(true);
                    flagged.push(pos);
                }
            }
        }
        if !flagged.is_empty() {
            debug!(count = flagged.len(), "auto-flagged cells");
        }
        flagged
    }

    fn check_win(&mut self) {
        if self.outcome == GameOutcome::InProgress && self.field.is_cleared() {
            self.outcome = GameOutcome::Won;
            debug!("board cleared, game won");
        }
    }
}

impl fmt::Display for Minesweeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.field, f)
    }
}
