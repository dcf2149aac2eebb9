//! Randomised checks of the solver and the minesweeper engine against
//! small independent oracles.

use std::collections::{HashSet, VecDeque};

use proptest::prelude::*;

use escape_sweep::{
    Direction, Grid, MazeBoard, MazeSolver, Minesweeper, Position, SolverConfig,
    Strategy as Search, SweepEffect, SweeperConfig, Terrain,
};

fn terrain() -> impl Strategy<Value = Terrain> {
    prop_oneof![
        6 => Just(Terrain::Open),
        2 => Just(Terrain::Wall),
        1 => prop_oneof![
            Just(Direction::Up),
            Just(Direction::Down),
            Just(Direction::Left),
            Just(Direction::Right),
        ]
        .prop_map(Terrain::Guard),
    ]
}

/// Boards of at least two cells with exactly one start and one goal.
fn board() -> impl Strategy<Value = MazeBoard> {
    (1usize..8, 2usize..8)
        .prop_flat_map(|(rows, cols)| {
            let n = rows * cols;
            (
                Just(rows),
                Just(cols),
                prop::collection::vec(terrain(), n),
                0..n,
                1..n,
            )
        })
        .prop_map(|(rows, cols, mut cells, start, offset)| {
            let n = rows * cols;
            cells[start] = Terrain::Start;
            cells[(start + offset) % n] = Terrain::Goal;
            let grid = Grid::from_fn(rows, cols, |p| cells[p.row as usize * cols + p.col as usize])
                .unwrap();
            MazeBoard::new(grid)
        })
}

/// Guard rays walked cell by cell, independent of the library.
fn oracle_guarded(board: &MazeBoard) -> HashSet<Position> {
    let mut guarded = HashSet::new();
    for row in 0..board.rows() as i32 {
        for col in 0..board.cols() as i32 {
            let Some(Terrain::Guard(dir)) = board.terrain(Position::new(row, col)) else {
                continue;
            };
            let (dr, dc) = dir.delta();
            let (mut r, mut c) = (row + dr, col + dc);
            while board.terrain(Position::new(r, c)) == Some(Terrain::Open) {
                guarded.insert(Position::new(r, c));
                r += dr;
                c += dc;
            }
        }
    }
    guarded
}

/// Breadth-first reachability over passable, unguarded cells.
fn oracle_reachable(board: &MazeBoard) -> bool {
    let (Some(start), Some(goal)) = (board.start(), board.goal()) else {
        return false;
    };
    let guarded = oracle_guarded(board);
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(pos) = queue.pop_front() {
        if pos == goal {
            return true;
        }
        for dir in [Direction::Up, Direction::Down, Direction::Left, Direction::Right] {
            let next = pos.step(dir);
            let passable = board.terrain(next).is_some_and(|t| t.is_passable());
            if passable && !guarded.contains(&next) && seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    false
}

proptest! {
    #[test]
    fn strategies_agree_with_oracle(board in board()) {
        let expected = oracle_reachable(&board);
        let solver = MazeSolver::new(board, SolverConfig::instant());
        for strategy in [Search::Recursive, Search::Backtrack] {
            let report = solver.solve(strategy, |_| {}).unwrap();
            prop_assert_eq!(report.reached, expected, "strategy {}", strategy);
            if report.reached {
                prop_assert_eq!(report.path.first().copied(), solver.start());
                prop_assert_eq!(report.path.last().copied(), solver.goal());
                for pos in &report.path {
                    let terrain = solver.board().terrain(*pos).unwrap();
                    prop_assert!(terrain.is_passable());
                    prop_assert!(!report.guarded.contains(pos));
                }
            } else {
                prop_assert!(report.path.is_empty());
            }
            let unique: HashSet<_> = report.visit_order.iter().collect();
            prop_assert_eq!(unique.len(), report.visit_order.len());
        }
    }

    #[test]
    fn guard_rays_match_oracle_and_are_idempotent(board in board()) {
        let first = board.guarded_cells();
        prop_assert_eq!(&first, &board.guarded_cells());
        prop_assert_eq!(first, oracle_guarded(&board));
    }

    #[test]
    fn swept_counts_match_layout(
        rows in 1usize..12,
        cols in 1usize..12,
        probability in 0.0f64..0.35,
        seed in any::<u64>(),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut game = Minesweeper::new(SweeperConfig {
            rows,
            cols,
            mine_probability: probability,
            seed: Some(seed),
        })
        .unwrap();

        let safe: Vec<Position> = game
            .field()
            .cells()
            .iter()
            .filter(|(_, c)| !c.is_mine())
            .map(|(p, _)| p)
            .collect();
        prop_assume!(!safe.is_empty());
        let target = safe[pick.index(safe.len())];

        let effect = game.sweep(target.row, target.col);
        prop_assert!(matches!(effect, SweepEffect::Swept { .. }), "got {:?}", effect);
        prop_assert!(!game.is_busy());

        let field = game.field();
        for (pos, cell) in field.cells().iter() {
            if !cell.is_swept() {
                prop_assert_eq!(cell.adjacent_count(), None);
                continue;
            }
            prop_assert!(!cell.is_mine());
            let mut mines = 0u8;
            for dr in -1..=1 {
                for dc in -1..=1 {
                    if (dr, dc) == (0, 0) {
                        continue;
                    }
                    let neighbour = Position::new(pos.row + dr, pos.col + dc);
                    if field.get(neighbour).is_some_and(|n| n.is_mine()) {
                        mines += 1;
                    }
                }
            }
            prop_assert_eq!(cell.adjacent_count(), Some(mines));
        }
    }
}
