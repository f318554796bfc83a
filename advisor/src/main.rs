use std::path::{Path, PathBuf};

use advisor::{Advisor, CancelToken, EngineConfig, EnginePool, Recorder};
use anyhow::Context;
use backgammon::{
    read_board, visualize_positions, AdviceRequest, BoxRect, DiceEntry, DiceRoll, Detection,
    GameData, JsonlStore, Player, PositionArray, Reconciler, SessionRegistry, VisionConfig,
};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// RNG seed, used for dice that weren't detected
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// A log level among "off", "error", "warn", "info", "debug", "trace"
    #[arg(short, long, default_value = "info", global = true)]
    log_level: LevelFilter,
}

#[derive(clap::Args)]
struct StoreArgs {
    /// Directory holding one game history per session
    #[arg(long)]
    store: PathBuf,

    /// The game session
    #[arg(long, default_value = "default")]
    session: String,
}

#[derive(Subcommand)]
enum Command {
    /// Read the board from the detections of one frame and print it
    Read {
        /// JSON file with a list of detections
        detections: PathBuf,

        /// Template, class map and confidence threshold
        #[arg(long)]
        vision_config: Option<PathBuf>,

        /// Also store the board in this directory's history
        #[arg(long)]
        store: Option<PathBuf>,

        #[arg(long, default_value = "default")]
        session: String,
    },
    /// Store a board given as game data JSON
    Ingest {
        game: PathBuf,

        #[command(flatten)]
        store: StoreArgs,
    },
    /// Store a board given as 26 signed checker counts
    Update {
        /// Comma separated, bar slots first and last
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        positions: Vec<i32>,

        /// The two dice values; random if left out
        #[arg(long, num_args = 2, value_parser = clap::value_parser!(u8).range(1..=6))]
        dice: Option<Vec<u8>>,

        /// Whose turn it is; derived from the last move if left out
        #[arg(long)]
        player: Option<Player>,

        #[command(flatten)]
        store: StoreArgs,
    },
    /// Print the latest stored state
    State {
        #[command(flatten)]
        store: StoreArgs,

        /// Draw the board instead of printing JSON
        #[arg(long, default_value_t = false)]
        show: bool,
    },
    /// Drop the latest state and start over from the opening position
    Reset {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Ask the analysis engine for move suggestions
    Hint {
        /// Game data JSON; the latest stored state is used if left out
        #[arg(long, conflicts_with = "store")]
        game: Option<PathBuf>,

        #[arg(long)]
        store: Option<PathBuf>,

        #[arg(long, default_value = "default")]
        session: String,

        /// Ask for this player's moves instead of the current player's
        #[arg(long)]
        player: Option<Player>,

        #[arg(long)]
        engine_config: Option<PathBuf>,

        /// Record the engine's interactions as JSON files into this directory
        #[arg(short, long)]
        record_transcripts_to: Option<PathBuf>,
    },
}

/// A detection as written by the detector; the center defaults to the box center.
#[derive(Deserialize)]
struct DetectionInput {
    class: u32,
    confidence: f32,
    bbox: BoxRect,
}

/// Game data with an optional board, as sent along with hint requests.
#[derive(Deserialize)]
struct HintInput {
    #[serde(flatten)]
    request: AdviceRequest,
    #[serde(default, rename = "currentPlayer")]
    current_player: Option<Player>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    initialize_logging(args.log_level);

    // Get a random seed
    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed);
    let mut rng = StdRng::seed_from_u64(seed);

    match args.command {
        Command::Read {
            detections,
            vision_config,
            store,
            session,
        } => {
            let config = match vision_config {
                Some(path) => VisionConfig::load(&path)?,
                None => VisionConfig::default(),
            };
            let detections: Vec<DetectionInput> = load_json(&detections)?;
            let detections: Vec<Detection> = detections
                .into_iter()
                .map(|det| Detection::from_box(det.class, det.confidence, det.bbox))
                .collect();
            let reading = read_board(&detections, &config)?;
            info!(stats = ?reading.stats, "Read board");
            match store {
                Some(dir) => {
                    let snapshot = with_session(&dir, &session, seed, |reconciler| {
                        reconciler.ingest(&reading.game, &mut rng)
                    })?;
                    print_json(&GameData {
                        current_player: Some(snapshot.current_player),
                        ..reading.game
                    })?;
                }
                None => print_json(&reading.game)?,
            }
        }
        Command::Ingest { game, store } => {
            let game: GameData = load_json(&game)?;
            let snapshot = with_session(&store.store, &store.session, seed, |reconciler| {
                reconciler.ingest(&game, &mut rng)
            })?;
            info!(current_player = %snapshot.current_player, "Stored board");
            print_json(&snapshot)?;
        }
        Command::Update {
            positions,
            dice,
            player,
            store,
        } => {
            let dice = match dice.as_deref() {
                Some(&[d1, d2]) => DiceRoll([d1, d2].map(|value| DiceEntry::Detected {
                    value,
                    confidence: 1.0,
                })),
                _ => DiceRoll::random(&mut rng),
            };
            let snapshot = with_session(&store.store, &store.session, seed, |reconciler| {
                reconciler.update(&positions, dice, player)
            })?;
            print_json(&snapshot)?;
        }
        Command::State { store, show } => {
            let state = with_session(&store.store, &store.session, seed, |reconciler| {
                reconciler.get()
            })?;
            let game = state.to_game_data();
            if show {
                println!("{}", visualize_positions(&PositionArray::convert(&game.checker_positions)));
                println!("Dice: {:?}, to move: {}", state.dice.values(), state.current_player);
            } else {
                print_json(&game)?;
            }
        }
        Command::Reset { store } => {
            with_session(&store.store, &store.session, seed, |reconciler| {
                reconciler.delete(&mut rng)
            })?;
        }
        Command::Hint {
            game,
            store,
            session,
            player,
            engine_config,
            record_transcripts_to,
        } => {
            let (request, current_player) = match (game, store) {
                (Some(path), _) => {
                    let input: HintInput = load_json(&path)?;
                    (input.request, input.current_player)
                }
                (None, Some(dir)) => {
                    let state = with_session(&dir, &session, seed, |reconciler| reconciler.get())?;
                    let game = state.to_game_data();
                    let request = AdviceRequest {
                        checker_positions: Some(game.checker_positions),
                        dices: game.dices,
                    };
                    (request, Some(state.current_player))
                }
                (None, None) => anyhow::bail!("Either --game or --store is needed"),
            };
            let player = player.or(current_player).unwrap_or(Player::One);

            let mut config = match engine_config {
                Some(path) => EngineConfig::load(&path)?,
                None => EngineConfig::default(),
            };
            if record_transcripts_to.is_some() {
                config.record_transcripts_to = record_transcripts_to;
            }
            let recorder = match &config.record_transcripts_to {
                Some(dir_path) => Some(Recorder::new(dir_path.clone())?),
                None => None,
            };
            debug!(engine = &config.nick, %player, "Asking for hints");
            let advisor = Advisor::new(EnginePool::new(config, recorder));
            let hints = advisor.hints(&request, player, &CancelToken::new())?;
            print_json(&hints)?;
        }
    }

    Ok(())
}

/// Runs `f` on the reconciler of one session, stored in a subdirectory of `dir`.
fn with_session<T>(
    dir: &Path,
    session: &str,
    seed: u64,
    f: impl FnOnce(&mut Reconciler<JsonlStore>) -> Result<T, backgammon::StoreError>,
) -> anyhow::Result<T> {
    if session.is_empty() || session.starts_with('.') || session.contains(['/', '\\']) {
        anyhow::bail!("Invalid session name '{}'", session);
    }
    let dir = dir.to_path_buf();
    let sessions = SessionRegistry::new(move |key| {
        let store = JsonlStore::open(dir.join(key))?;
        Reconciler::open(store, &mut StdRng::seed_from_u64(seed))
    });
    sessions
        .with_session(session, f)
        .with_context(|| format!("Could not access the history of session '{}'", session))
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read '{}'", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid JSON in '{}'", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn initialize_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(format)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
