use std::io::{self, BufRead, Write};

use anyhow::Context;
use clap::Parser;
use emm_2048::expectimax::{ExpectimaxConfig, DEFAULT_DEPTH};
use emm_2048::game::GameState;
use emm_2048::policy::{Algorithm, Player};
use flexi_logger::Logger;

/// Play a game of 2048, either yourself or by watching the AI.
#[derive(Parser, Debug)]
#[command(name = "play", about = "Play 2048 in the terminal")]
struct Args {
    /// Move selection used in AI mode
    #[arg(long, value_enum, default_value_t = Algorithm::Expectiminimax)]
    algorithm: Algorithm,

    /// Play yourself with w/a/s/d instead of watching the AI
    #[arg(long)]
    human: bool,

    /// Search depth in plies (player and chance plies both count)
    #[arg(long, default_value_t = DEFAULT_DEPTH)]
    depth: u32,

    /// Seed for tile spawns and search sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Search root directions on the rayon pool
    #[arg(long)]
    parallel: bool,

    /// Stop after this many valid moves
    #[arg(long)]
    max_moves: Option<u32>,

    /// Keep playing after the win tile appears
    #[arg(long)]
    keep_going: bool,

    /// Only print the final board
    #[arg(long, short)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let _logger = Logger::try_with_env_or_str("warn")?.start()?;
    let args = Args::parse();

    let mut game = match args.seed {
        Some(seed) => GameState::from_seed(seed),
        None => GameState::new(),
    };
    if args.human {
        play_human(&mut game)
    } else {
        play_ai(&mut game, &args)
    }
}

fn play_ai(game: &mut GameState, args: &Args) -> anyhow::Result<()> {
    let cfg = ExpectimaxConfig { depth: args.depth, seed: args.seed, ..Default::default() };
    cfg.validate()?;
    let mut player = Player::new(args.algorithm, cfg, args.parallel);
    log::info!("playing with {} at depth {}", args.algorithm, args.depth);

    if !args.quiet {
        println!("{}", game.board());
    }
    let mut announced = false;
    while !game.is_game_over() {
        if args.max_moves.is_some_and(|limit| game.moves() >= limit) {
            break;
        }
        let dir = player.next_move(game);
        if !game.apply_move(dir) {
            log::warn!("{dir} does not change the board; stopping");
            break;
        }
        if !args.quiet {
            println!("AI chooses: {dir}");
            println!("{}", game.board());
        }
        if let Some(stats) = player.last_stats() {
            log::debug!("move {}: {} nodes", game.moves(), stats.nodes);
        }
        if game.has_reached_win_tile() && !announced {
            announced = true;
            println!("Won in {} moves!", game.moves());
            if !args.keep_going {
                break;
            }
        }
    }
    if args.quiet {
        println!("{}", game.board());
    }
    if game.is_game_over() {
        println!("Game over after {} moves!", game.moves());
    }
    println!("Score: {} | Max tile: {}", game.score(), game.board().highest_tile());
    Ok(())
}

fn play_human(game: &mut GameState) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut announced = false;
    println!("{}", game.board());
    while !game.is_game_over() {
        print!("Move (w/a/s/d, q to quit): ");
        io::stdout().flush().context("flushing prompt")?;
        let Some(line) = lines.next() else { break };
        let line = line.context("reading move from stdin")?;
        if line.trim().eq_ignore_ascii_case("q") {
            break;
        }
        if !game.apply_input(&line) {
            println!("Invalid move! Try again.");
            continue;
        }
        println!("{}", game.board());
        if game.has_reached_win_tile() && !announced {
            announced = true;
            println!("Won in {} moves!", game.moves());
        }
    }
    if game.is_game_over() {
        println!("Game over after {} moves!", game.moves());
    }
    println!("Score: {}", game.score());
    Ok(())
}
