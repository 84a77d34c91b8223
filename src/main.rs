//! Bamboo-Go command line.
//!
//! ## Usage
//!
//! - `bamboo-go` - Show a demo
//! - `bamboo-go demo --moves 6` - Let the engine play a few moves
//! - `bamboo-go selfplay --games 2` - Play complete games against itself
//!
//! Pattern tables and policy weights are optional; without them the engine
//! falls back to generated tables and uniform policies. Add `-v` (repeat for
//! more) or set `RUST_LOG` for search logs.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use bamboo_go::board::Color;
use bamboo_go::config::{PatternFiles, SearchConfig};
use bamboo_go::constants::{DEFAULT_BOARD_SIZE, KOMI, PLAYOUT_LIMIT, max_records};
use bamboo_go::engine::Engine;
use bamboo_go::mcts::Decision;

/// Bamboo-Go: a Go engine with pattern rollouts and parallel MCTS
#[derive(Parser)]
#[command(name = "bamboo-go")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct EngineArgs {
    /// Board size
    #[arg(long, default_value_t = DEFAULT_BOARD_SIZE, global = true)]
    size: usize,

    #[arg(long, default_value_t = KOMI, global = true)]
    komi: f32,

    /// Search threads
    #[arg(long, default_value_t = 1, global = true)]
    threads: usize,

    /// Playouts per move
    #[arg(long, default_value_t = PLAYOUT_LIMIT, global = true)]
    playouts: usize,

    /// Seconds per move (overrides the playout limit)
    #[arg(long, global = true)]
    time: Option<f64>,

    #[arg(long, default_value_t = 0, global = true)]
    seed: u64,

    /// Mersenne-twister random numbers for pattern hashing
    #[arg(long, global = true)]
    rands: Option<PathBuf>,

    /// `hash,id` table of 3x3 patterns
    #[arg(long, global = true)]
    x33: Option<PathBuf>,

    /// `hash,id` table of 12-point diamond response patterns
    #[arg(long, global = true)]
    d12: Option<PathBuf>,

    /// `hash,id` table of 12-point diamond non-response patterns
    #[arg(long, global = true)]
    nonres_d12: Option<PathBuf>,

    #[arg(long, global = true)]
    rollout_weights: Option<PathBuf>,

    #[arg(long, global = true)]
    tree_weights: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Let the engine play a few moves and show the result
    Demo {
        #[arg(long, default_value_t = 6)]
        moves: usize,
    },
    /// Play complete games against itself
    Selfplay {
        #[arg(long, default_value_t = 1)]
        games: usize,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn build_engine(args: &EngineArgs) -> anyhow::Result<Engine> {
    let config = SearchConfig {
        threads: args.threads,
        playout_limit: args.playouts,
        time_limit: args.time.map(Duration::from_secs_f64),
        seed: args.seed,
        ..SearchConfig::default()
    };
    let files = PatternFiles {
        rands: args.rands.clone(),
        x33: args.x33.clone(),
        d12: args.d12.clone(),
        nonres_d12: args.nonres_d12.clone(),
        rollout_weights: args.rollout_weights.clone(),
        tree_weights: args.tree_weights.clone(),
    };
    let mut engine = Engine::load(config, args.size, &files, None)
        .with_context(|| format!("failed to start a {0}x{0} engine", args.size))?;
    engine.set_komi(args.komi);
    Ok(engine)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let mut engine = build_engine(&cli.engine)?;

    match cli.command.unwrap_or(Commands::Demo { moves: 6 }) {
        Commands::Demo { moves } => run_demo(&mut engine, moves),
        Commands::Selfplay { games } => run_selfplay(&mut engine, games),
    }
    Ok(())
}

fn run_demo(engine: &mut Engine, moves: usize) {
    println!("Bamboo-Go demo\n");
    for _ in 0..moves {
        let color = engine.game().to_move();
        match engine.genmove(color) {
            Decision::Play(pos) => {
                println!("{color} plays {}", engine.game().board().vertex(pos));
            }
            Decision::Resign => {
                println!("{color} resigns");
                break;
            }
        }
        if engine.game().is_over() {
            break;
        }
    }
    println!("\n{}", engine.showboard());
    println!("Estimated score: {}", engine.final_score());
}

fn run_selfplay(engine: &mut Engine, games: usize) {
    let mut wins = [0usize; 2];
    for game in 1..=games {
        engine.clear();
        let limit = max_records(engine.game().size());
        let mut resigned = None;
        while !engine.game().is_over() && engine.game().records().len() < limit {
            let color = engine.game().to_move();
            if engine.genmove(color) == Decision::Resign {
                resigned = Some(color);
                break;
            }
        }

        let winner = match resigned {
            Some(loser) => {
                println!("game {game}: {} wins by resignation", loser.opposite());
                Some(loser.opposite())
            }
            None => {
                let score = engine.final_score();
                println!(
                    "game {game}: {score} after {} moves",
                    engine.game().records().len()
                );
                if score.0 > 0.0 {
                    Some(Color::Black)
                } else if score.0 < 0.0 {
                    Some(Color::White)
                } else {
                    None
                }
            }
        };
        if let Some(color) = winner {
            wins[color.index()] += 1;
        }
        log::info!("final position of game {game}:\n{}", engine.showboard());
    }
    println!("Black {} - White {}", wins[0], wins[1]);
}
