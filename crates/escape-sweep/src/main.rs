//! CLI entry point.
//!
//! Usage:
//!   escape-sweep solve <board.txt> [options]
//!   escape-sweep solve --stdin [options]
//!   escape-sweep solve --demo [options]
//!   escape-sweep sweep [options]
//!
//! Solve options:
//!   --strategy <dfs|backtrack>  Search strategy (default: dfs)
//!   --delay-ms <n>              Pause before every step (default: 0)
//!   --show-steps                Print each step to stderr
//!
//! Sweep options:
//!   --rows <n>          Board rows (default: 15)
//!   --cols <n>          Board columns (default: 8)
//!   --probability <f>   Chance of a mine per cell (default: 0.1)
//!   --seed <n>          Seed for a reproducible board
//!
//! The sweep subcommand reads one command per line from stdin:
//! `s X Y` sweeps, `f X Y` toggles a flag, `r` restarts, `q` quits.

use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use escape_sweep::{
    GameOutcome, MazeBoard, MazeSolver, Minesweeper, Position, SolveError, SolverConfig,
    Strategy, SweepEffect, SweeperConfig,
};

#[derive(Parser)]
#[command(name = "escape-sweep")]
#[command(about = "Laser-guard escape solver and minesweeper engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search a board for an escape route from A to B
    Solve {
        /// Path to a board file, text rows or a JSON array of row strings
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Read the board from stdin instead of a file
        #[arg(long)]
        stdin: bool,

        /// Use the built-in 16x10 escape board
        #[arg(long, conflicts_with_all = ["file", "stdin"])]
        demo: bool,

        /// Search strategy: dfs or backtrack
        #[arg(long, default_value = "dfs")]
        strategy: Strategy,

        /// Pause before every step, in milliseconds
        #[arg(long, default_value = "0")]
        delay_ms: u64,

        /// Print every step to stderr
        #[arg(long)]
        show_steps: bool,
    },
    /// Play minesweeper with commands read from stdin
    Sweep {
        #[arg(long, default_value = "15")]
        rows: usize,

        #[arg(long, default_value = "8")]
        cols: usize,

        /// Independent chance that a cell holds a mine
        #[arg(long, default_value = "0.1")]
        probability: f64,

        /// Seed for a reproducible board
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Output format for a solve
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveOutput {
    reached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    strategy: Option<Strategy>,
    steps: usize,
    path: Vec<Position>,
    visited: usize,
    guarded: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Solve {
            file,
            stdin,
            demo,
            strategy,
            delay_ms,
            show_steps,
        } => run_solve(file, stdin, demo, strategy, delay_ms, show_steps),
        Commands::Sweep {
            rows,
            cols,
            probability,
            seed,
        } => run_sweep(SweeperConfig {
            rows,
            cols,
            mine_probability: probability,
            seed,
        }),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn load_board(file: Option<PathBuf>, stdin: bool, demo: bool) -> Result<MazeBoard> {
    if demo {
        return Ok(MazeBoard::escape_demo());
    }
    let content = if stdin {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read board from stdin")?;
        buffer
    } else if let Some(path) = file {
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?
    } else {
        bail!("must provide a board file, --stdin or --demo");
    };

    let board: MazeBoard = if content.trim_start().starts_with('[') {
        serde_json::from_str(&content).context("failed to parse board JSON")?
    } else {
        content.parse().context("failed to parse board")?
    };
    Ok(board)
}

fn run_solve(
    file: Option<PathBuf>,
    stdin: bool,
    demo: bool,
    strategy: Strategy,
    delay_ms: u64,
    show_steps: bool,
) -> Result<ExitCode> {
    let board = load_board(file, stdin, demo)?;
    info!(rows = board.rows(), cols = board.cols(), %strategy, "solving board");

    let config = SolverConfig {
        step_delay: Duration::from_millis(delay_ms),
    };
    let solver = MazeSolver::new(board, config);
    let result = solver.solve(strategy, |pos| {
        if show_steps {
            eprintln!("step {pos}");
        }
    });

    let (output, code) = match result {
        Ok(report) => {
            let code = if report.reached {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
            let output = SolveOutput {
                reached: report.reached,
                reason: (!report.reached).then(|| "no_route".to_string()),
                strategy: Some(report.strategy),
                steps: report.steps,
                visited: report.visit_order.len(),
                guarded: report.guarded.len(),
                path: report.path,
            };
            (output, code)
        }
        Err(err @ SolveError::MissingEndpoint { .. }) => (
            SolveOutput {
                reached: false,
                reason: Some(err.to_string()),
                strategy: None,
                steps: 0,
                path: Vec::new(),
                visited: 0,
                guarded: 0,
            },
            ExitCode::from(2),
        ),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(code)
}

/// One line of sweep input
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Sweep(i32, i32),
    Flag(i32, i32),
    Restart,
    Quit,
}

fn parse_command(line: &str) -> Result<Command> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        bail!("empty command");
    };
    let mut coord = |name: &str| -> Result<i32> {
        parts
            .next()
            .with_context(|| format!("missing {name}"))?
            .parse::<i32>()
            .with_context(|| format!("invalid {name}"))
    };
    Ok(match verb {
        "s" | "sweep" => Command::Sweep(coord("x")?, coord("y")?),
        "f" | "flag" => Command::Flag(coord("x")?, coord("y")?),
        "r" | "restart" => Command::Restart,
        "q" | "quit" => Command::Quit,
        other => bail!("unknown command {other:?}"),
    })
}

fn print_game(out: &mut impl Write, game: &Minesweeper) -> io::Result<()> {
    write!(out, "{game}")?;
    let status = match game.outcome() {
        GameOutcome::InProgress => "in progress",
        GameOutcome::Won => "you win",
        GameOutcome::Lost => "you lose",
    };
    writeln!(out, "mines left: {}  status: {status}", game.mines_left())?;
    out.flush()
}

fn run_sweep(config: SweeperConfig) -> Result<ExitCode> {
    let mut game = Minesweeper::new(config).context("invalid minesweeper configuration")?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    print_game(&mut out, &game)?;

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read command")?;
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(err) => {
                eprintln!("{err:#}");
                continue;
            }
        };
        match command {
            Command::Sweep(x, y) => {
                if game.sweep(x, y) == SweepEffect::Ignored {
                    eprintln!("sweep ignored");
                }
            }
            Command::Flag(x, y) => {
                if !game.flag(x, y) {
                    eprintln!("flag ignored");
                }
            }
            Command::Restart => game.restart(),
            Command::Quit => break,
        }
        print_game(&mut out, &game)?;
    }

    Ok(match game.outcome() {
        GameOutcome::Won => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}
