//! Terminal player: `wordplay chain|spell|puzzle [difficulty|age]`.
//!
//! Lines typed on stdin become intents; clock ticks and server replies are
//! handled by the same loop.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordplay::api::HttpApi;
use wordplay::config::EngineConfig;
use wordplay::driver::GameDriver;
use wordplay::games::puzzle::PuzzleMode;
use wordplay::games::{ChainGame, Game, PuzzleGame, SpellGame};
use wordplay::protocol::{SessionView, UiMessage};
use wordplay::types::{Difficulty, IntentError, Phase};

const USAGE: &str = "usage: wordplay <chain|spell|puzzle> [easy|medium|hard|<age>]";

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Logs go to stderr so they do not interleave with the game on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordplay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(game) = args.next() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };
    let option = args.next();

    let config = EngineConfig::from_env();
    let api = match HttpApi::new(&config.api) {
        Ok(api) => Arc::new(api),
        Err(e) => {
            tracing::error!("Failed to initialize HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Using game server at {}", api.base_url());

    let difficulty = option
        .as_deref()
        .and_then(Difficulty::parse)
        .unwrap_or_default();

    match game.as_str() {
        "chain" => {
            let mut driver = GameDriver::new(config.tick, |submitter| {
                ChainGame::new(api, config.chain_turn_seconds, submitter)
            });
            println!("Word chain. Type a word, /restart or /quit.");
            let _ = driver.act("start", |game| game.start(difficulty));
            play(&mut driver, |driver, line| match line {
                "/restart" => driver.act("restart", |game| game.restart()).map(drop),
                word => driver.act("submit", |game| game.submit(word)).map(drop),
            })
            .await;
        }
        "spell" => {
            let mut driver = GameDriver::new(config.tick, |submitter| {
                SpellGame::new(
                    api,
                    config.spell_turn_seconds,
                    config.spell_total_questions,
                    submitter,
                )
            });
            println!("Initial-consonant quiz. Type an answer, /restart or /quit.");
            let _ = driver.act("start", |game| game.start(difficulty));
            play(&mut driver, |driver, line| match line {
                "/restart" => driver.act("restart", |game| game.restart()).map(drop),
                answer => driver.act("submit", |game| game.submit(answer)).map(drop),
            })
            .await;
        }
        "puzzle" => {
            let mode = PuzzleMode {
                start_age: option
                    .as_deref()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(config.puzzle_start_age),
                user_id: config.puzzle_user_id,
            };
            let mut driver = GameDriver::new(config.tick, |submitter| {
                PuzzleGame::new(
                    api,
                    config.puzzle_turn_seconds,
                    config.puzzle_total_questions,
                    config.puzzle_max_attempts,
                    submitter,
                )
            });
            println!(
                "Sentence puzzle. Commands: <n> place pool piece n, -<n> remove answer slot n, \
                 /clear, /submit, /hint, /skip, /next, /restart, /quit."
            );
            let _ = driver.act("start", |game| game.start(mode));
            play(&mut driver, puzzle_command).await;
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

fn puzzle_command(driver: &mut GameDriver<PuzzleGame>, line: &str) -> Result<(), IntentError> {
    match line {
        "/clear" => driver.act("clear", |game| game.clear()),
        "/submit" => driver.act("submit", |game| game.submit()).map(drop),
        "/hint" => driver.act("hint", |game| game.hint()).map(drop),
        "/skip" => driver.act("skip", |game| game.skip()).map(drop),
        "/next" => driver.act("next", |game| game.next()).map(drop),
        "/restart" => driver.act("restart", |game| game.restart()).map(drop),
        other => {
            if let Some(slot) = other.strip_prefix('-').and_then(|n| n.parse::<usize>().ok()) {
                return driver.act("remove", |game| game.unplace(slot.saturating_sub(1)));
            }
            let Some(index) = other.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) else {
                println!("? unknown command: {}", other);
                return Ok(());
            };
            let id = driver
                .game()
                .board()
                .pool()
                .get(index)
                .map(|piece| piece.id.clone())
                .unwrap_or_default();
            driver.act("place", |game| game.place(&id))
        }
    }
}

/// Drive one game until the user quits or stdin closes
async fn play<G, F>(driver: &mut GameDriver<G>, mut command: F)
where
    G: Game,
    F: FnMut(&mut GameDriver<G>, &str) -> Result<(), IntentError>,
{
    let mut updates = driver.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last: Option<SessionView> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!("Failed to read stdin: {}", e);
                        break;
                    }
                };
                let line = line.trim();
                if line == "/quit" {
                    break;
                }
                if let Err(e) = command(driver, line) {
                    println!("! {}", e);
                }
            }
            Some(event) = driver.next_event() => {
                driver.handle(event);
            }
        }

        while let Ok(message) = updates.try_recv() {
            if let UiMessage::Session { view } = message {
                render(&view, last.as_ref());
                last = Some(view);
            }
        }
    }

    driver.leave();
    tracing::info!("Bye");
}

/// Print what changed since the previous snapshot
fn render(view: &SessionView, previous: Option<&SessionView>) {
    let changed = |f: fn(&SessionView) -> String| previous.map(f) != Some(f(view));

    if view.timed
        && view.phase == Phase::AwaitingMove
        && view.remaining <= 5
        && changed(|v| v.remaining.to_string())
    {
        println!("  [{}s]", view.remaining);
    }
    if let Some(notice) = &view.notice {
        if changed(|v| format!("{:?}", v.notice)) {
            println!("{:?}: {}", notice.kind, notice.text);
        }
    }
    if view.phase == Phase::AwaitingMove
        && changed(|v| format!("{}{}{}", v.prompt, v.extras, v.phase))
    {
        println!("> {}  (score {})", view.prompt, view.score);
        if let Some(board) = view.extras.get("board") {
            println!("  pieces: {}", board);
        }
    }
    if let Some(outcome) = &view.outcome {
        if changed(|v| format!("{:?}", v.outcome)) {
            println!(
                "Game over ({:?}, winner {:?}): {}  final score {}",
                outcome.cause, outcome.winner, outcome.reason, view.score
            );
        }
    }
}
