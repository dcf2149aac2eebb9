//! Escape-route search over a [`MazeBoard`].
//!
//! Two strategies are offered. They agree on *whether* the goal can be
//! reached, not on the route or the order cells are visited in:
//!
//! - [`Strategy::Recursive`] is a depth-first search trying neighbours in the
//!   order up, down, left, right. It keeps its own frame stack instead of
//!   recursing on the thread stack, so depth is bounded by the cell count.
//! - [`Strategy::Backtrack`] walks forward along the first free neighbour in
//!   the order down, right, left, up and pops one cell whenever it hits a
//!   dead end.
//!
//! Every solve recomputes the guarded cells and starts with an empty
//! visited set; nothing carries over between calls.

use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::error::SolveError;
use crate::grid::{Direction, Position};
use crate::maze::{Endpoint, MazeBoard};

/// Neighbour priority for [`Strategy::Recursive`].
const RECURSIVE_ORDER: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

/// Neighbour priority for [`Strategy::Backtrack`].
const BACKTRACK_ORDER: [Direction; 4] = [
    Direction::Down,
    Direction::Right,
    Direction::Left,
    Direction::Up,
];

/// Search strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Recursive,
    Backtrack,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dfs" | "recursive" => Ok(Strategy::Recursive),
            "backtrack" | "stack" => Ok(Strategy::Backtrack),
            other => Err(format!(
                "unknown strategy {other:?} (expected dfs or backtrack)"
            )),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Recursive => f.write_str("dfs"),
            Strategy::Backtrack => f.write_str("backtrack"),
        }
    }
}

/// Configuration for the solver
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Pause before every step so a host can animate the walk
    pub step_delay: Duration,
}

impl SolverConfig {
    /// No pacing at all; what tests and batch callers want.
    pub fn instant() -> Self {
        Self {
            step_delay: Duration::ZERO,
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(200),
        }
    }
}

/// Result of a single solve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveReport {
    pub strategy: Strategy,
    /// Whether the goal was reached
    pub reached: bool,
    /// Start to goal inclusive when reached, empty otherwise
    pub path: Vec<Position>,
    /// Every cell entered, in the order it was first entered
    pub visit_order: Vec<Position>,
    /// Number of step notifications emitted
    pub steps: usize,
    /// Cells under laser fire during this solve, sorted
    pub guarded: Vec<Position>,
    /// The step callback asked the search to stop early
    pub abandoned: bool,
}

/// Per-solve mutable state. Built fresh by every call to `solve`.
struct Traversal<'a, F> {
    board: &'a MazeBoard,
    goal: Position,
    guarded: HashSet<Position>,
    visited: HashSet<Position>,
    visit_order: Vec<Position>,
    steps: usize,
    step_delay: Duration,
    on_step: F,
}

impl<F> Traversal<'_, F>
where
    F: FnMut(Position) -> ControlFlow<()>,
{
    /// In bounds, passable, not yet visited and not under fire.
    fn can_enter(&self, pos: Position) -> bool {
        self.board.terrain(pos).is_some_and(|t| t.is_passable())
            && !self.visited.contains(&pos)
            && !self.guarded.contains(&pos)
    }

    fn enter(&mut self, pos: Position) {
        self.visited.insert(pos);
        self.visit_order.push(pos);
    }

    fn notify(&mut self, pos: Position) -> ControlFlow<()> {
        if !self.step_delay.is_zero() {
            thread::sleep(self.step_delay);
        }
        self.steps += 1;
        trace!(%pos, step = self.steps, "step");
        (self.on_step)(pos)
    }

    /// Returns the route to the goal, or `Err(abandoned)` when no route was produced.
    fn recursive(&mut self, start: Position) -> Result<Vec<Position>, bool> {
        struct Frame {
            pos: Position,
            next: usize,
        }

        self.enter(start);
        if start == self.goal {
            return Ok(vec![start]);
        }
        let mut stack = vec![Frame {
            pos: start,
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(&direction) = RECURSIVE_ORDER.get(frame.next) else {
                stack.pop();
                continue;
            };
            frame.next += 1;
            let candidate = frame.pos.step(direction);
            if !self.can_enter(candidate) {
                continue;
            }

            self.enter(candidate);
            if self.notify(candidate).is_break() {
                return Err(true);
            }
            stack.push(Frame {
                pos: candidate,
                next: 0,
            });
            if candidate == self.goal {
                return Ok(stack.iter().map(|f| f.pos).collect());
            }
        }
        Err(false)
    }

    fn backtrack(&mut self, start: Position) -> Result<Vec<Position>, bool> {
        self.enter(start);
        let mut path = vec![start];

        while let Some(&current) = path.last() {
            if current == self.goal {
                return Ok(path);
            }

            let next = BACKTRACK_ORDER
                .iter()
                .map(|&d| current.step(d))
                .find(|&p| self.can_enter(p));

            let flow = match next {
                Some(next) => {
                    self.enter(next);
                    path.push(next);
                    self.notify(next)
                }
                None => {
                    // Dead end: fall back to the previous cell.
                    path.pop();
                    match path.last() {
                        Some(&back) => self.notify(back),
                        None => ControlFlow::Continue(()),
                    }
                }
            };
            if flow.is_break() {
                return Err(true);
            }
        }
        Err(false)
    }
}

/// Solver for one static board layout.
#[derive(Debug, Clone)]
pub struct MazeSolver {
    board: MazeBoard,
    config: SolverConfig,
    start: Option<Position>,
    goal: Option<Position>,
}

impl MazeSolver {
    /// Solver whose endpoints are the board's `A` and `B` cells.
    pub fn new(board: MazeBoard, config: SolverConfig) -> Self {
        let start = board.start();
        let goal = board.goal();
        Self {
            board,
            config,
            start,
            goal,
        }
    }

    /// Solver with explicit endpoints, ignoring any `A`/`B` tags.
    ///
    /// Endpoints outside the board are treated as missing.
    pub fn with_endpoints(
        board: MazeBoard,
        config: SolverConfig,
        start: Position,
        goal: Position,
    ) -> Self {
        let start = board.grid().contains(start).then_some(start);
        let goal = board.grid().contains(goal).then_some(goal);
        Self {
            board,
            config,
            start,
            goal,
        }
    }

    pub fn board(&self) -> &MazeBoard {
        &self.board
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn start(&self) -> Option<Position> {
        self.start
    }

    pub fn goal(&self) -> Option<Position> {
        self.goal
    }

    /// Run a solve, reporting every step to `on_step`.
    pub fn solve(
        &self,
        strategy: Strategy,
        mut on_step: impl FnMut(Position),
    ) -> Result<SolveReport, SolveError> {
        self.solve_with(strategy, |pos| {
            on_step(pos);
            ControlFlow::Continue(())
        })
    }

    /// Run a solve whose step callback may abandon it by returning `Break`.
    #[instrument(skip(self, on_step), fields(rows = self.board.rows(), cols = self.board.cols()))]
    pub fn solve_with(
        &self,
        strategy: Strategy,
        on_step: impl FnMut(Position) -> ControlFlow<()>,
    ) -> Result<SolveReport, SolveError> {
        let start = self.start.ok_or(SolveError::MissingEndpoint {
            missing: Endpoint::Start,
        })?;
        let goal = self.goal.ok_or(SolveError::MissingEndpoint {
            missing: Endpoint::Goal,
        })?;

        let mut traversal = Traversal {
            board: &self.board,
            goal,
            guarded: self.board.guarded_cells(),
            visited: HashSet::new(),
            visit_order: Vec::new(),
            steps: 0,
            step_delay: self.config.step_delay,
            on_step,
        };

        let outcome = match strategy {
            Strategy::Recursive => traversal.recursive(start),
            Strategy::Backtrack => traversal.backtrack(start),
        };

        let mut guarded: Vec<Position> = traversal.guarded.into_iter().collect();
        guarded.sort();

        let (reached, path, abandoned) = match outcome {
            Ok(path) => (true, path, false),
            Err(abandoned) => (false, Vec::new(), abandoned),
        };
        debug!(
            %strategy,
            reached,
            abandoned,
            steps = traversal.steps,
            visited = traversal.visit_order.len(),
            "solve finished"
        );

        Ok(SolveReport {
            strategy,
            reached,
            path,
            visit_order: traversal.visit_order,
            steps: traversal.steps,
            guarded,
            abandoned,
        })
    }

    /// Run the solve on a worker thread, streaming step positions back.
    ///
    /// The channel has no buffer: the worker waits at every step until the
    /// position is received, so a host reading `steps()` paces the walk.
    /// Dropping the returned handle abandons the solve at its next step.
    pub fn spawn(self, strategy: Strategy) -> SolveHandle {
        let (sender, steps) = mpsc::sync_channel(0);
        let worker = thread::spawn(move || {
            self.solve_with(strategy, |pos| match sender.send(pos) {
                Ok(()) => ControlFlow::Continue(()),
                Err(_) => ControlFlow::Break(()),
            })
        });
        SolveHandle { steps, worker }
    }
}

/// A solve running on a worker thread.
#[derive(Debug)]
pub struct SolveHandle {
    steps: Receiver<Position>,
    worker: JoinHandle<Result<SolveReport, SolveError>>,
}

impl SolveHandle {
    /// Step positions as the worker produces them.
    pub fn steps(&self) -> &Receiver<Position> {
        &self.steps
    }

    /// Let the worker run to completion and return its report. Unread steps
    /// are discarded.
    pub fn join(self) -> Result<SolveReport, SolveError> {
        let SolveHandle { steps, worker } = self;
        // Ends once the worker drops its sender.
        for _ in steps.iter() {}
        wait(worker)
    }

    /// Abandon the solve at its next step and return the partial report.
    pub fn cancel(self) -> Result<SolveReport, SolveError> {
        let SolveHandle { steps, worker } = self;
        drop(steps);
        wait(worker)
    }
}

fn wait(
    worker: JoinHandle<Result<SolveReport, SolveError>>,
) -> Result<SolveReport, SolveError> {
    match worker.join() {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
