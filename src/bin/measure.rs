use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use emm_2048::expectimax::{ExpectimaxConfig, DEFAULT_DEPTH};
use emm_2048::policy::Algorithm;
use emm_2048::stats::{run_single_game, BatchReport, GameSummary};
use flexi_logger::Logger;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

/// Play many games without output and report aggregate statistics.
#[derive(Parser, Debug)]
#[command(name = "measure", about = "Measure AI performance over many 2048 games")]
struct Args {
    /// Number of games to play
    #[arg(long, short = 'n', default_value_t = 100)]
    games: usize,

    #[arg(long, value_enum, default_value_t = Algorithm::Expectiminimax)]
    algorithm: Algorithm,

    /// Search depth in plies
    #[arg(long, default_value_t = DEFAULT_DEPTH)]
    depth: u32,

    /// Base seed; game i uses seed + i
    #[arg(long)]
    seed: Option<u64>,

    /// Play games concurrently on the rayon pool
    #[arg(long)]
    parallel: bool,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Hide the progress bar
    #[arg(long, short)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let _logger = Logger::try_with_env_or_str("warn")?.start()?;
    let args = Args::parse();
    anyhow::ensure!(args.games > 0, "--games must be at least 1");

    let cfg = ExpectimaxConfig { depth: args.depth, ..Default::default() };
    cfg.validate().context("evaluation weights")?;
    log::info!("measuring {} over {} games at depth {}", args.algorithm, args.games, args.depth);

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(args.games as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner} {elapsed_precise} [{bar:40}] {pos}/{len} games | {msg}")
                .context("building progress style")?
                .tick_chars("⠁⠃⠇⠧⠷⠿⠻⠟⠯⠷⠧⠇⠃")
                .progress_chars("=> "),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    };

    let start = Instant::now();
    let play = |i: usize| {
        let seed = args.seed.map(|s| s.wrapping_add(i as u64));
        let summary = run_single_game(args.algorithm, &cfg, seed, false);
        log::debug!("game {i}: {summary:?}");
        pb.inc(1);
        pb.set_message(format!("last: {} moves, max tile {}", summary.moves, summary.max_tile));
        summary
    };
    let games: Vec<GameSummary> = if args.parallel {
        (0..args.games).into_par_iter().map(play).collect()
    } else {
        (0..args.games).map(play).collect()
    };
    pb.finish_and_clear();

    let report = BatchReport::from_games(&games, start.elapsed());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report).context("serializing report")?);
    } else {
        println!("Algorithm: {} (depth {})", args.algorithm, args.depth);
        print!("{report}");
    }
    Ok(())
}
